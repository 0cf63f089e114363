//! Skill link catalog and its admin editor.
//!
//! The catalog is what the admin mode exists to change: the link behind each
//! listed skill plus any custom skills the owner has added. Edits happen on a
//! [`CatalogDraft`] that is either saved back to the store or discarded.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    Error,
    error::{StorageError, ValidationError},
    events::Event,
    services::gate::AdminSessionGate,
    storage::KeyValueStore,
    validation::{validate_optional_url, validate_required, validate_url},
};

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum SkillCategory {
    #[default]
    #[serde(rename = "Languages")]
    Languages,
    #[serde(rename = "Web Development")]
    WebDevelopment,
    #[serde(rename = "Databases")]
    Databases,
    #[serde(rename = "Tools & Frameworks")]
    ToolsAndFrameworks,
    #[serde(rename = "Areas of Interest")]
    AreasOfInterest,
}

impl SkillCategory {
    pub const ALL: [SkillCategory; 5] = [
        SkillCategory::Languages,
        SkillCategory::WebDevelopment,
        SkillCategory::Databases,
        SkillCategory::ToolsAndFrameworks,
        SkillCategory::AreasOfInterest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SkillCategory::Languages => "Languages",
            SkillCategory::WebDevelopment => "Web Development",
            SkillCategory::Databases => "Databases",
            SkillCategory::ToolsAndFrameworks => "Tools & Frameworks",
            SkillCategory::AreasOfInterest => "Areas of Interest",
        }
    }
}

impl fmt::Display for SkillCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SkillCategory {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        SkillCategory::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ValidationError::InvalidCategory(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomSkill {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    pub certification_url: String,
    pub category: SkillCategory,
}

/// Input for [`CatalogDraft::add_custom_skill`], as typed into the form.
#[derive(Debug, Clone, Default)]
pub struct NewCustomSkill {
    pub name: String,
    pub icon_url: Option<String>,
    pub certification_url: String,
    pub category: String,
}

/// Links the portfolio ships with, keyed by skill.
pub const DEFAULT_SKILL_LINKS: &[(&str, &str)] = &[
    ("javascript", "https://developer.mozilla.org/en-US/docs/Web/JavaScript"),
    ("python", "https://python.org"),
    ("typescript", "https://typescriptlang.org"),
    ("c", "https://en.wikipedia.org/wiki/C_(programming_language)"),
    ("java", "https://oracle.com/java"),
    ("react", "https://reactjs.org"),
    ("nextjs", "https://nextjs.org"),
    ("nodejs", "https://nodejs.org"),
    ("express", "https://expressjs.com"),
    ("angular", "https://angular.io"),
    ("aitools", "https://openai.com"),
    ("html5", "https://developer.mozilla.org/en-US/docs/Web/HTML"),
    ("css3", "https://developer.mozilla.org/en-US/docs/Web/CSS"),
    ("mongodb", "https://mongodb.com"),
    ("postgresql", "https://postgresql.org"),
    ("mysql", "https://mysql.com"),
    ("git", "https://git-scm.com"),
    ("docker", "https://docker.com"),
    ("vscode", "https://code.visualstudio.com"),
    ("tensorflow", "https://tensorflow.org"),
    ("pandas", "https://pandas.pydata.org"),
    ("numpy", "https://numpy.org"),
    ("aws", "https://aws.amazon.com"),
    ("gitlab", "https://gitlab.com"),
    ("n8n", "https://n8n.io"),
    ("cursorai", "https://cursor.sh"),
    ("autocad", "https://www.autodesk.com/products/autocad"),
    ("androidstudio", "https://developer.android.com/studio"),
    ("machinelearning", "https://scikit-learn.org"),
    ("automation", "https://github.com/shivapeddi"),
    ("api", "https://restfulapi.net"),
    ("datascience", "https://kaggle.com"),
];

/// Link map plus custom skills.
///
/// [`SkillCatalog::default`] is the shipped catalog; [`SkillCatalog::empty`]
/// has no links at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillCatalog {
    /// Skill key (e.g. `"react"`) to the page the skill links to.
    pub links: BTreeMap<String, String>,
    pub custom_skills: Vec<CustomSkill>,
}

impl Default for SkillCatalog {
    fn default() -> Self {
        Self::with_links(DEFAULT_SKILL_LINKS.iter().copied())
    }
}

impl SkillCatalog {
    pub fn empty() -> Self {
        Self {
            links: BTreeMap::new(),
            custom_skills: Vec::new(),
        }
    }

    pub fn with_links<I, K, V>(links: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            links: links
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            custom_skills: Vec::new(),
        }
    }

    pub fn link(&self, key: &str) -> Option<&str> {
        self.links.get(key).map(String::as_str)
    }

    pub fn custom_skills_in(&self, category: SkillCategory) -> impl Iterator<Item = &CustomSkill> {
        self.custom_skills
            .iter()
            .filter(move |s| s.category == category)
    }
}

/// Working copy of the catalog. Nothing is persisted until it is saved.
#[derive(Debug, Clone)]
pub struct CatalogDraft {
    original: SkillCatalog,
    working: SkillCatalog,
}

impl CatalogDraft {
    fn new(catalog: SkillCatalog) -> Self {
        Self {
            original: catalog.clone(),
            working: catalog,
        }
    }

    pub fn catalog(&self) -> &SkillCatalog {
        &self.working
    }

    pub fn is_dirty(&self) -> bool {
        self.original != self.working
    }

    /// Point `key` at a new URL.
    pub fn set_link(&mut self, key: &str, url: &str) -> Result<(), ValidationError> {
        let key = validate_required("key", key)?;
        let url = validate_url(url)?;
        self.working.links.insert(key.to_string(), url.to_string());
        Ok(())
    }

    /// Validate and add a custom skill, returning its generated id.
    pub fn add_custom_skill(&mut self, skill: NewCustomSkill) -> Result<String, ValidationError> {
        let name = validate_required("name", &skill.name)?;
        let certification_url = validate_required("certification_url", &skill.certification_url)?;
        let certification_url = validate_url(certification_url)?;
        let icon_url = validate_optional_url(skill.icon_url.as_deref())?;
        let category = skill.category.parse::<SkillCategory>()?;

        let id = format!("custom-{}", Uuid::new_v4());
        self.working.custom_skills.push(CustomSkill {
            id: id.clone(),
            name: name.to_string(),
            icon_url: icon_url.map(|u| u.to_string()),
            certification_url: certification_url.to_string(),
            category,
        });
        Ok(id)
    }

    pub fn remove_custom_skill(&mut self, id: &str) -> Result<CustomSkill, ValidationError> {
        let index = self
            .working
            .custom_skills
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| ValidationError::UnknownSkill(id.to_string()))?;
        Ok(self.working.custom_skills.remove(index))
    }

    pub fn custom_skills_in(&self, category: SkillCategory) -> impl Iterator<Item = &CustomSkill> {
        self.working.custom_skills_in(category)
    }

    /// Discard the edits and return the catalog as it was loaded.
    pub fn cancel(self) -> SkillCatalog {
        self.original
    }
}

/// Loads and saves the catalog. Editing requires an admin session.
pub struct SkillCatalogService<S: KeyValueStore> {
    gate: Arc<AdminSessionGate<S>>,
}

impl<S: KeyValueStore> SkillCatalogService<S> {
    pub fn new(gate: Arc<AdminSessionGate<S>>) -> Self {
        Self { gate }
    }

    pub fn gate(&self) -> &Arc<AdminSessionGate<S>> {
        &self.gate
    }

    fn key(&self) -> &str {
        &self.gate.limiter().keys().skill_catalog
    }

    /// Read the persisted catalog. Missing or unreadable data yields the default one.
    pub async fn load(&self) -> Result<SkillCatalog, Error> {
        let store = self.gate.limiter().store();
        let Some(raw) = store.get(self.key()).await? else {
            return Ok(SkillCatalog::default());
        };

        match serde_json::from_str(&raw) {
            Ok(catalog) => Ok(catalog),
            Err(e) => {
                let error = StorageError::MalformedPersistedState {
                    key: self.key().to_string(),
                    value: e.to_string(),
                };
                tracing::warn!(error = %error, "Ignoring unreadable skill catalog");
                Ok(SkillCatalog::default())
            }
        }
    }

    pub async fn begin_edit(&self) -> Result<CatalogDraft, Error> {
        self.gate.require_admin()?;
        Ok(CatalogDraft::new(self.load().await?))
    }

    /// Persist the draft and return the saved catalog.
    pub async fn save(&self, draft: CatalogDraft) -> Result<SkillCatalog, Error> {
        self.gate.require_admin()?;

        let catalog = draft.working;
        let raw = serde_json::to_string(&catalog).map_err(StorageError::from)?;
        self.gate.limiter().store().set(self.key(), &raw).await?;

        tracing::info!(
            links = catalog.links.len(),
            custom_skills = catalog.custom_skills.len(),
            "Skill catalog saved"
        );
        self.gate
            .limiter()
            .events()
            .publish(Event::CatalogSaved {
                links: catalog.links.len(),
                custom_skills: catalog.custom_skills.len(),
                timestamp: self.gate.limiter().clock().now(),
            })
            .await;

        Ok(catalog)
    }
}
