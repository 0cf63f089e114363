//! # portfolio-gate
//!
//! The admin gate of a personal portfolio site: a password prompt guarded by
//! an attempt counter with a timed lockout, the admin session flag it unlocks,
//! and the skill and project catalogs that the admin mode edits.
//!
//! All state is kept in a key-value store. SQLite is the default backend; any
//! [`KeyValueStore`] works.
//!
//! ## Warning
//!
//! This is a demo gate, not an authentication system. The credential check
//! and the lockout run wherever the gate runs, and wiping the store lifts any
//! lockout. Never put it in front of anything that matters.
//!
//! ## Example
//!
//! ```rust,no_run
//! use portfolio_gate::{CredentialConfig, PortfolioGateBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gate = PortfolioGateBuilder::new()
//!         .with_sqlite("sqlite://portfolio-gate.db")
//!         .await?
//!         .apply_migrations()
//!         .await?
//!         .with_credential(CredentialConfig::Plaintext("hunter2".to_string()))
//!         .build()
//!         .await?;
//!
//!     let outcome = gate.submit("wrong").await?;
//!     println!("{}", outcome.message().unwrap_or_default());
//!     Ok(())
//! }
//! ```
pub mod builder;

use std::sync::Arc;

use portfolio_gate_core::{
    Error,
    error::{AuthError, ConfigError, EventError, StorageError, ValidationError},
    events::EventBus,
    services::{ProjectCatalogService, SkillCatalogService},
};
use url::Url;

pub use builder::{NoStore, PortfolioGateBuilder, PortfolioGateBuilderError, WithStore};

/// Re-export core types from portfolio_gate_core
pub use portfolio_gate_core::{
    AdminCredential, AdminSessionGate, Clock, CountdownState, CredentialConfig, GateConfig,
    KeyValueStore, LimiterConfig, LockoutCountdown, LockoutStatus, LoginAttemptLimiter,
    LoginOutcome, LoginRejection, ManualClock, MemoryStore, StorageKeys, SystemClock,
    events::{Event, EventHandler, UnlockReason},
    services::{
        CatalogDraft, CustomSkill, NewCustomSkill, Project, ProjectCatalog, ProjectCategory,
        ProjectDraft, ProjectForm, ProjectLinks, SkillCatalog, SkillCategory,
    },
};

#[cfg(feature = "sqlite")]
pub use portfolio_gate_storage_sqlite::SqliteKeyValueStore;

/// Errors returned by [`PortfolioGate`].
#[derive(Debug, thiserror::Error)]
pub enum PortfolioGateError {
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("Event error: {0}")]
    Event(#[from] EventError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl From<Error> for PortfolioGateError {
    fn from(value: Error) -> Self {
        match value {
            Error::Auth(e) => Self::Auth(e),
            Error::Storage(e) => Self::Storage(e),
            Error::Validation(e) => Self::Validation(e),
            Error::Event(e) => Self::Event(e),
            Error::Config(e) => Self::Config(e),
        }
    }
}

impl PortfolioGateError {
    pub fn is_not_admin(&self) -> bool {
        matches!(self, Self::Auth(AuthError::NotAdmin))
    }
}

/// The assembled gate: limiter, admin session and catalog editors over one store.
///
/// Use [`PortfolioGateBuilder`] to create one; it restores persisted state
/// before handing the gate out.
pub struct PortfolioGate<S: KeyValueStore> {
    store: Arc<S>,
    limiter: Arc<LoginAttemptLimiter<S>>,
    gate: Arc<AdminSessionGate<S>>,
    catalog: SkillCatalogService<S>,
    projects: ProjectCatalogService<S>,
    events: EventBus,
}

impl<S: KeyValueStore> PortfolioGate<S> {
    pub(crate) fn new(
        store: Arc<S>,
        limiter: Arc<LoginAttemptLimiter<S>>,
        gate: Arc<AdminSessionGate<S>>,
        events: EventBus,
    ) -> Self {
        let catalog = SkillCatalogService::new(gate.clone());
        let projects = ProjectCatalogService::new(gate.clone());
        Self {
            store,
            limiter,
            gate,
            catalog,
            projects,
            events,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn limiter(&self) -> &Arc<LoginAttemptLimiter<S>> {
        &self.limiter
    }

    pub fn session(&self) -> &Arc<AdminSessionGate<S>> {
        &self.gate
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn is_admin(&self) -> bool {
        self.gate.is_admin()
    }

    /// Reload limiter state and re-derive the admin flag from `location`.
    pub async fn restore(&self, location: Option<&Url>) -> Result<bool, PortfolioGateError> {
        self.limiter.restore().await?;
        Ok(self.gate.restore_session(location).await?)
    }

    pub async fn status(&self) -> Result<LockoutStatus, PortfolioGateError> {
        Ok(self.limiter.status().await?)
    }

    /// Check a candidate credential. See [`AdminSessionGate::submit`].
    pub async fn submit(&self, candidate: &str) -> Result<LoginOutcome, PortfolioGateError> {
        Ok(self.gate.submit(candidate).await?)
    }

    /// Leave admin mode and return `location` without its `admin` parameter.
    pub async fn logout(&self, location: Option<&Url>) -> Result<Option<Url>, PortfolioGateError> {
        Ok(self.gate.logout(location).await?)
    }

    /// Clear the attempt counter and any lockout.
    pub async fn reset_attempts(&self) -> Result<(), PortfolioGateError> {
        Ok(self.limiter.reset_attempts().await?)
    }

    /// Start a countdown that follows the current lockout.
    pub async fn countdown(&self) -> Result<LockoutCountdown, PortfolioGateError> {
        Ok(LockoutCountdown::start(self.limiter.clone()).await?)
    }

    pub async fn catalog(&self) -> Result<SkillCatalog, PortfolioGateError> {
        Ok(self.catalog.load().await?)
    }

    /// Open the catalog for editing. Requires admin mode.
    pub async fn edit_catalog(&self) -> Result<CatalogDraft, PortfolioGateError> {
        Ok(self.catalog.begin_edit().await?)
    }

    pub async fn save_catalog(&self, draft: CatalogDraft) -> Result<SkillCatalog, PortfolioGateError> {
        Ok(self.catalog.save(draft).await?)
    }

    pub async fn projects(&self) -> Result<ProjectCatalog, PortfolioGateError> {
        Ok(self.projects.load().await?)
    }

    /// Open the project catalog for editing. Requires admin mode.
    pub async fn edit_projects(&self) -> Result<ProjectDraft, PortfolioGateError> {
        Ok(self.projects.begin_edit().await?)
    }

    /// Save the draft. An invalid pending project fails the save and leaves
    /// the stored catalog untouched.
    pub async fn save_projects(
        &self,
        draft: &ProjectDraft,
    ) -> Result<ProjectCatalog, PortfolioGateError> {
        Ok(self.projects.save(draft).await?)
    }
}

#[cfg(feature = "sqlite")]
impl PortfolioGate<SqliteKeyValueStore> {
    /// Apply pending schema migrations.
    pub async fn migrate(&self) -> Result<usize, PortfolioGateError> {
        Ok(self.store.migrate().await?)
    }
}
