//! Key-value persistence for limiter, session and catalog state.
//!
//! Every piece of durable state is a plain string stored under a well-known
//! key. The [`KeyValueStore`] trait is the only seam between the services and
//! whatever backs it (SQLite, memory, a browser's local storage).

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Error;

pub use memory::MemoryStore;

/// A durable string-to-string store.
///
/// Implementations need not be transactional. Callers do read-then-write
/// and accept last-write-wins when several instances share one store.
#[async_trait]
pub trait KeyValueStore: Send + Sync + 'static {
    /// Fetch the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>, Error>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<(), Error>;

    /// Remove `key`. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<(), Error>;
}

/// Names of the persisted entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageKeys {
    pub attempts: String,
    pub lockout_time: String,
    pub admin_session: String,
    pub skill_catalog: String,
    pub project_catalog: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            attempts: "portfolio_login_attempts".to_string(),
            lockout_time: "portfolio_lockout_time".to_string(),
            admin_session: "portfolio_admin_session".to_string(),
            skill_catalog: "portfolio_skill_catalog".to_string(),
            project_catalog: "portfolio_project_catalog".to_string(),
        }
    }
}

/// Marker value written under [`StorageKeys::admin_session`].
pub const ADMIN_SESSION_MARKER: &str = "authenticated";
