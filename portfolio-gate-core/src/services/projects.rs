//! Project catalog and its admin editor.
//!
//! The portfolio lists a fixed set of projects whose repository and demo links
//! the admin can change, plus projects added through the editor. New projects
//! start as a [`ProjectForm`] on a [`ProjectDraft`] and only become a
//! [`Project`] when the draft is saved with every form valid.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    Error,
    clock::Clock,
    error::{StorageError, ValidationError},
    events::Event,
    services::gate::AdminSessionGate,
    storage::KeyValueStore,
    validation::{validate_optional_url, validate_required, validate_url},
};

/// Skills a single project may list.
pub const MAX_PROJECT_SKILLS: usize = 5;

/// Longest accepted project description, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 2000;

/// Repository links of the projects the portfolio ships with.
pub const DEFAULT_PROJECT_LINKS: &[(&str, &str)] = &[
    ("face-detection", "https://github.com/peddishiva/py.projects"),
    ("jarvis-ai", "https://github.com/peddishiva/JARVIS"),
    ("js-projects", "https://github.com/peddishiva/Projects"),
    ("email-spam", "https://github.com/peddishiva/py.projects"),
];

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum ProjectCategory {
    #[default]
    #[serde(rename = "Web App")]
    WebApp,
    #[serde(rename = "Full Stack")]
    FullStack,
    #[serde(rename = "Machine Learning")]
    MachineLearning,
    #[serde(rename = "AI/NLP")]
    AiNlp,
    #[serde(rename = "Mobile App")]
    MobileApp,
    #[serde(rename = "Desktop App")]
    DesktopApp,
    #[serde(rename = "Other")]
    Other,
}

impl ProjectCategory {
    pub const ALL: [ProjectCategory; 7] = [
        ProjectCategory::WebApp,
        ProjectCategory::FullStack,
        ProjectCategory::MachineLearning,
        ProjectCategory::AiNlp,
        ProjectCategory::MobileApp,
        ProjectCategory::DesktopApp,
        ProjectCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectCategory::WebApp => "Web App",
            ProjectCategory::FullStack => "Full Stack",
            ProjectCategory::MachineLearning => "Machine Learning",
            ProjectCategory::AiNlp => "AI/NLP",
            ProjectCategory::MobileApp => "Mobile App",
            ProjectCategory::DesktopApp => "Desktop App",
            ProjectCategory::Other => "Other",
        }
    }
}

impl fmt::Display for ProjectCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectCategory {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        ProjectCategory::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ValidationError::InvalidCategory(s.to_string()))
    }
}

/// Links of a shipped project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectLinks {
    pub github_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live_url: Option<String>,
}

/// A project added through the editor, as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub title: String,
    pub description: String,
    pub github_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live_url: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    #[serde(default)]
    pub category: ProjectCategory,
    #[serde(default)]
    pub featured: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectCatalog {
    /// Shipped project id to its links.
    pub links: BTreeMap<String, ProjectLinks>,
    pub projects: Vec<Project>,
}

impl Default for ProjectCatalog {
    fn default() -> Self {
        Self {
            links: DEFAULT_PROJECT_LINKS
                .iter()
                .map(|(id, github_url)| {
                    (
                        id.to_string(),
                        ProjectLinks {
                            github_url: github_url.to_string(),
                            live_url: None,
                        },
                    )
                })
                .collect(),
            projects: Vec::new(),
        }
    }
}

impl ProjectCatalog {
    pub fn links_for(&self, id: &str) -> Option<&ProjectLinks> {
        self.links.get(id)
    }

    pub fn project(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn featured(&self) -> impl Iterator<Item = &Project> {
        self.projects.iter().filter(|p| p.featured)
    }
}

/// A new project as typed into the editor. Checked only on save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectForm {
    id: String,
    pub title: String,
    pub description: String,
    pub github_url: String,
    pub live_url: String,
    pub media_url: String,
    pub category: ProjectCategory,
    pub featured: bool,
    skills: Vec<String>,
}

impl ProjectForm {
    fn blank(id: String) -> Self {
        Self {
            id,
            title: String::new(),
            description: String::new(),
            github_url: String::new(),
            live_url: String::new(),
            media_url: String::new(),
            category: ProjectCategory::default(),
            featured: false,
            skills: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn skills(&self) -> &[String] {
        &self.skills
    }

    /// Add a trimmed skill. Blank, repeated and sixth skills are refused.
    pub fn add_skill(&mut self, skill: &str) -> Result<(), ValidationError> {
        let skill = validate_required("skill", skill)?;
        if self.skills.iter().any(|s| s == skill) {
            return Err(ValidationError::DuplicateSkill(skill.to_string()));
        }
        if self.skills.len() >= MAX_PROJECT_SKILLS {
            return Err(ValidationError::TooManySkills {
                max: MAX_PROJECT_SKILLS,
            });
        }
        self.skills.push(skill.to_string());
        Ok(())
    }

    pub fn remove_skill(&mut self, skill: &str) -> Result<(), ValidationError> {
        let skill = skill.trim();
        let index = self
            .skills
            .iter()
            .position(|s| s == skill)
            .ok_or_else(|| ValidationError::UnknownSkill(skill.to_string()))?;
        self.skills.remove(index);
        Ok(())
    }

    /// Every problem with the form, in the order the editor lists them.
    pub fn errors(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        for (field, value) in [
            ("title", &self.title),
            ("description", &self.description),
            ("github_url", &self.github_url),
        ] {
            if let Err(e) = validate_required(field, value) {
                errors.push(e);
            }
        }
        if self.description.chars().count() > MAX_DESCRIPTION_CHARS {
            errors.push(ValidationError::TooLong {
                field: "description".to_string(),
                max: MAX_DESCRIPTION_CHARS,
            });
        }
        if !self.github_url.trim().is_empty() {
            if let Err(e) = validate_url(&self.github_url) {
                errors.push(e);
            }
        }
        for value in [&self.live_url, &self.media_url] {
            if let Err(e) = validate_optional_url(Some(value.as_str())) {
                errors.push(e);
            }
        }

        errors
    }

    pub fn is_valid(&self) -> bool {
        self.errors().is_empty()
    }

    /// Convert into a [`Project`], failing with the first problem found.
    pub fn validate(&self) -> Result<Project, ValidationError> {
        if let Some(error) = self.errors().into_iter().next() {
            return Err(error);
        }

        let live_url = validate_optional_url(Some(self.live_url.as_str()))?;
        let media_url = validate_optional_url(Some(self.media_url.as_str()))?;
        Ok(Project {
            id: self.id.clone(),
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            github_url: validate_url(&self.github_url)?.to_string(),
            live_url: live_url.map(|u| u.to_string()),
            skills: self.skills.clone(),
            media_url: media_url.map(|u| u.to_string()),
            category: self.category,
            featured: self.featured,
        })
    }
}

/// Working copy of the project catalog plus the projects being added.
#[derive(Debug, Clone)]
pub struct ProjectDraft {
    original: ProjectCatalog,
    working: ProjectCatalog,
    pending: Vec<ProjectForm>,
    clock: Arc<dyn Clock>,
}

impl ProjectDraft {
    fn new(catalog: ProjectCatalog, clock: Arc<dyn Clock>) -> Self {
        Self {
            original: catalog.clone(),
            working: catalog,
            pending: Vec::new(),
            clock,
        }
    }

    pub fn catalog(&self) -> &ProjectCatalog {
        &self.working
    }

    /// Projects added in this draft and not yet saved.
    pub fn pending(&self) -> &[ProjectForm] {
        &self.pending
    }

    pub fn is_dirty(&self) -> bool {
        self.original != self.working || !self.pending.is_empty()
    }

    pub fn set_github_url(&mut self, project_id: &str, url: &str) -> Result<(), ValidationError> {
        let url = validate_url(validate_required("github_url", url)?)?;
        self.links_mut(project_id)?.github_url = url.to_string();
        Ok(())
    }

    /// Set or, with a blank value, clear the live demo link.
    pub fn set_live_url(&mut self, project_id: &str, url: &str) -> Result<(), ValidationError> {
        let url = validate_optional_url(Some(url))?;
        self.links_mut(project_id)?.live_url = url.map(|u| u.to_string());
        Ok(())
    }

    fn links_mut(&mut self, project_id: &str) -> Result<&mut ProjectLinks, ValidationError> {
        self.working
            .links
            .get_mut(project_id)
            .ok_or_else(|| ValidationError::UnknownProject(project_id.to_string()))
    }

    /// Start a blank project and return its `new-project-<millis>` id.
    pub fn add_project(&mut self) -> String {
        let mut millis = self.clock.now().timestamp_millis();
        let id = loop {
            let candidate = format!("new-project-{millis}");
            if !self.contains(&candidate) {
                break candidate;
            }
            millis += 1;
        };

        self.pending.push(ProjectForm::blank(id.clone()));
        id
    }

    fn contains(&self, id: &str) -> bool {
        self.pending.iter().any(|p| p.id == id) || self.working.project(id).is_some()
    }

    pub fn project_mut(&mut self, id: &str) -> Result<&mut ProjectForm, ValidationError> {
        self.pending
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| ValidationError::UnknownProject(id.to_string()))
    }

    /// Drop a pending project, or remove a saved one from the catalog.
    pub fn remove_project(&mut self, id: &str) -> Result<(), ValidationError> {
        if let Some(index) = self.pending.iter().position(|p| p.id == id) {
            self.pending.remove(index);
            return Ok(());
        }
        let index = self
            .working
            .projects
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| ValidationError::UnknownProject(id.to_string()))?;
        self.working.projects.remove(index);
        Ok(())
    }

    /// The catalog this draft would save, or the first invalid pending project.
    pub fn validate(&self) -> Result<ProjectCatalog, ValidationError> {
        let mut catalog = self.working.clone();
        for form in &self.pending {
            catalog.projects.push(form.validate()?);
        }
        Ok(catalog)
    }

    /// Discard the edits and return the catalog as it was loaded.
    pub fn cancel(self) -> ProjectCatalog {
        self.original
    }
}

/// Loads and saves the project catalog. Editing requires an admin session.
pub struct ProjectCatalogService<S: KeyValueStore> {
    gate: Arc<AdminSessionGate<S>>,
}

impl<S: KeyValueStore> ProjectCatalogService<S> {
    pub fn new(gate: Arc<AdminSessionGate<S>>) -> Self {
        Self { gate }
    }

    fn key(&self) -> &str {
        &self.gate.limiter().keys().project_catalog
    }

    /// Read the persisted catalog. Missing or unreadable data yields the default one.
    pub async fn load(&self) -> Result<ProjectCatalog, Error> {
        let store = self.gate.limiter().store();
        let Some(raw) = store.get(self.key()).await? else {
            return Ok(ProjectCatalog::default());
        };

        match serde_json::from_str(&raw) {
            Ok(catalog) => Ok(catalog),
            Err(e) => {
                let error = StorageError::MalformedPersistedState {
                    key: self.key().to_string(),
                    value: e.to_string(),
                };
                tracing::warn!(error = %error, "Ignoring unreadable project catalog");
                Ok(ProjectCatalog::default())
            }
        }
    }

    pub async fn begin_edit(&self) -> Result<ProjectDraft, Error> {
        self.gate.require_admin()?;
        Ok(ProjectDraft::new(
            self.load().await?,
            self.gate.limiter().clock().clone(),
        ))
    }

    /// Persist the draft and return the saved catalog.
    ///
    /// Nothing is written if any pending project is invalid; the draft stays
    /// with the caller so it can be corrected.
    pub async fn save(&self, draft: &ProjectDraft) -> Result<ProjectCatalog, Error> {
        self.gate.require_admin()?;

        let catalog = draft.validate()?;
        let raw = serde_json::to_string(&catalog).map_err(StorageError::from)?;
        self.gate.limiter().store().set(self.key(), &raw).await?;

        tracing::info!(
            links = catalog.links.len(),
            projects = catalog.projects.len(),
            "Project catalog saved"
        );
        self.gate
            .limiter()
            .events()
            .publish(Event::ProjectsSaved {
                links: catalog.links.len(),
                projects: catalog.projects.len(),
                timestamp: self.gate.limiter().clock().now(),
            })
            .await;

        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::LimiterConfig;
    use crate::crypto::AdminCredential;
    use crate::error::AuthError;
    use crate::services::limiter::LoginAttemptLimiter;
    use crate::storage::MemoryStore;

    const SECRET: &str = "s3cret";
    const START_MS: i64 = 1_700_000_000_000;

    async fn admin_service() -> (Arc<MemoryStore>, ProjectCatalogService<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let limiter = Arc::new(
            LoginAttemptLimiter::new(store.clone(), LimiterConfig::default())
                .with_clock(Arc::new(ManualClock::at_millis(START_MS))),
        );
        let gate = Arc::new(AdminSessionGate::new(
            limiter,
            AdminCredential::from_plaintext(SECRET),
        ));
        assert!(gate.submit(SECRET).await.unwrap().is_accepted());
        (store, ProjectCatalogService::new(gate))
    }

    fn fill(form: &mut ProjectForm) {
        form.title = " Lockout Dashboard ".to_string();
        form.description = "Tracks failed logins.".to_string();
        form.github_url = "https://github.com/example/dashboard".to_string();
    }

    #[tokio::test]
    async fn test_edit_requires_admin() {
        let store = Arc::new(MemoryStore::new());
        let limiter = Arc::new(LoginAttemptLimiter::new(store, LimiterConfig::default()));
        let gate = Arc::new(AdminSessionGate::new(
            limiter,
            AdminCredential::from_plaintext(SECRET),
        ));
        let service = ProjectCatalogService::new(gate);

        assert!(matches!(
            service.begin_edit().await,
            Err(Error::Auth(AuthError::NotAdmin))
        ));
        assert_eq!(service.load().await.unwrap(), ProjectCatalog::default());
    }

    #[tokio::test]
    async fn test_shipped_links_can_be_changed() {
        let (store, service) = admin_service().await;
        let mut draft = service.begin_edit().await.unwrap();

        draft
            .set_github_url("jarvis-ai", "https://github.com/example/jarvis")
            .unwrap();
        draft
            .set_live_url("jarvis-ai", "https://jarvis.example")
            .unwrap();
        assert!(matches!(
            draft.set_github_url("jarvis-ai", "   "),
            Err(ValidationError::MissingField(_))
        ));
        assert!(matches!(
            draft.set_live_url("unknown", "https://x.example"),
            Err(ValidationError::UnknownProject(_))
        ));

        let saved = service.save(&draft).await.unwrap();
        let links = saved.links_for("jarvis-ai").unwrap();
        assert_eq!(links.github_url, "https://github.com/example/jarvis");
        assert_eq!(links.live_url.as_deref(), Some("https://jarvis.example/"));
        assert!(store.get("portfolio_project_catalog").await.unwrap().is_some());

        // A blank live URL clears it again.
        let mut draft = service.begin_edit().await.unwrap();
        draft.set_live_url("jarvis-ai", "").unwrap();
        let saved = service.save(&draft).await.unwrap();
        assert_eq!(saved.links_for("jarvis-ai").unwrap().live_url, None);
    }

    #[tokio::test]
    async fn test_add_and_save_project() {
        let (_store, service) = admin_service().await;
        let mut draft = service.begin_edit().await.unwrap();

        let id = draft.add_project();
        assert_eq!(id, format!("new-project-{START_MS}"));
        let second = draft.add_project();
        assert_ne!(id, second);
        draft.remove_project(&second).unwrap();

        let form = draft.project_mut(&id).unwrap();
        fill(form);
        form.media_url = "https://cdn.example/shot.png".to_string();
        form.category = "full stack".parse().unwrap();
        form.featured = true;
        form.add_skill(" Rust ").unwrap();

        let saved = service.save(&draft).await.unwrap();
        let project = saved.project(&id).unwrap();
        assert_eq!(project.title, "Lockout Dashboard");
        assert_eq!(project.skills, vec!["Rust"]);
        assert_eq!(project.category, ProjectCategory::FullStack);
        assert_eq!(project.live_url, None);
        assert_eq!(saved.featured().count(), 1);
        assert_eq!(service.load().await.unwrap(), saved);

        // Saved projects can be removed in a later draft.
        let mut draft = service.begin_edit().await.unwrap();
        draft.remove_project(&id).unwrap();
        assert!(draft.is_dirty());
        assert!(service.save(&draft).await.unwrap().projects.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_project_blocks_save() {
        let (store, service) = admin_service().await;
        let mut draft = service.begin_edit().await.unwrap();
        let id = draft.add_project();

        let err = service.save(&draft).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::MissingField(f)) if f == "title"
        ));
        assert_eq!(store.get("portfolio_project_catalog").await.unwrap(), None);

        fill(draft.project_mut(&id).unwrap());
        assert!(service.save(&draft).await.is_ok());
    }

    #[test]
    fn test_form_errors() {
        let mut form = ProjectForm::blank("new-project-1".to_string());
        let errors = form.errors();
        assert_eq!(errors.len(), 3);
        assert!(
            errors
                .iter()
                .all(|e| matches!(e, ValidationError::MissingField(_)))
        );

        fill(&mut form);
        assert!(form.is_valid());

        form.description = "x".repeat(MAX_DESCRIPTION_CHARS);
        assert!(form.is_valid());
        form.description.push('x');
        assert!(matches!(
            form.validate(),
            Err(ValidationError::TooLong { max: 2000, .. })
        ));

        fill(&mut form);
        form.github_url = "github.com/example".to_string();
        form.live_url = "demo".to_string();
        form.media_url = "shot.png".to_string();
        let errors = form.errors();
        assert_eq!(errors.len(), 3);
        assert!(
            errors
                .iter()
                .all(|e| matches!(e, ValidationError::InvalidUrl(_)))
        );
    }

    #[test]
    fn test_skill_limits() {
        let mut form = ProjectForm::blank("new-project-1".to_string());

        for skill in ["Rust", "Tokio", "SQLite", "Serde", "Tracing"] {
            form.add_skill(skill).unwrap();
        }
        assert!(matches!(
            form.add_skill("Axum"),
            Err(ValidationError::TooManySkills { max: 5 })
        ));

        form.remove_skill("Serde").unwrap();
        assert!(matches!(
            form.add_skill(" Rust "),
            Err(ValidationError::DuplicateSkill(_))
        ));
        assert!(matches!(
            form.add_skill("  "),
            Err(ValidationError::MissingField(_))
        ));
        assert!(matches!(
            form.remove_skill("Cobol"),
            Err(ValidationError::UnknownSkill(_))
        ));
        form.add_skill("Axum").unwrap();
        assert_eq!(form.skills().len(), 5);
    }

    #[tokio::test]
    async fn test_cancel_discards_pending_projects() {
        let (store, service) = admin_service().await;
        let mut draft = service.begin_edit().await.unwrap();
        draft.add_project();
        assert!(draft.is_dirty());

        assert_eq!(draft.cancel(), ProjectCatalog::default());
        assert_eq!(store.get("portfolio_project_catalog").await.unwrap(), None);
    }

    #[test]
    fn test_category_names() {
        assert_eq!(
            serde_json::to_string(&ProjectCategory::AiNlp).unwrap(),
            "\"AI/NLP\""
        );
        assert_eq!(ProjectCategory::default(), ProjectCategory::WebApp);
        assert!("Game".parse::<ProjectCategory>().is_err());
    }
}
