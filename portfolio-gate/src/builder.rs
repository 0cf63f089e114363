//! Builder pattern for constructing [`PortfolioGate`] instances
//!
//! The builder tracks in its type whether a store has been configured, so a
//! gate can only be built once it has somewhere to keep its state.
//!
//! # Example
//!
//! ```rust,no_run
//! use portfolio_gate::{CredentialConfig, PortfolioGateBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gate = PortfolioGateBuilder::new()
//!         .with_sqlite("sqlite::memory:")
//!         .await?
//!         .apply_migrations()
//!         .await?
//!         .with_credential(CredentialConfig::Plaintext("hunter2".to_string()))
//!         .build()
//!         .await?;
//!
//!     assert!(!gate.is_admin());
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use portfolio_gate_core::{
    AdminSessionGate, Clock, CredentialConfig, GateConfig, KeyValueStore, LimiterConfig,
    LoginAttemptLimiter, MemoryStore, StorageKeys, SystemClock, events::EventBus,
};
use url::Url;

use crate::PortfolioGate;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur when building a [`PortfolioGate`].
#[derive(Debug, thiserror::Error)]
pub enum PortfolioGateBuilderError {
    /// Failed to connect to storage backend
    #[error("Storage connection failed: {0}")]
    StorageConnection(String),

    /// Failed to run database migrations
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Invalid configuration provided
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Persisted state could not be read back
    #[error("Failed to restore state: {0}")]
    Restore(String),
}

// ============================================================================
// Type-State Markers
// ============================================================================

/// Marker type indicating no store has been configured yet.
///
/// This is the initial state of [`PortfolioGateBuilder`].
pub struct NoStore;

/// Marker type indicating a store has been configured.
pub struct WithStore<S: KeyValueStore> {
    store: Arc<S>,
}

// ============================================================================
// Builder Implementation
// ============================================================================

/// A type-safe builder for [`PortfolioGate`].
///
/// # Type States
///
/// - [`NoStore`]: Initial state, a store must be configured
/// - [`WithStore<S>`]: Store configured, ready to build
///
/// Configuration methods are available in either state.
pub struct PortfolioGateBuilder<Store> {
    store: Store,
    config: GateConfig,
    clock: Arc<dyn Clock>,
    events: EventBus,
    location: Option<Url>,
}

impl Default for PortfolioGateBuilder<NoStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl PortfolioGateBuilder<NoStore> {
    /// Create a new builder with default configuration.
    ///
    /// # Defaults
    ///
    /// - Lockout after 5 failed attempts, lasting 24 hours
    /// - Countdown ticks once per second
    /// - Default storage key names
    /// - System clock
    /// - No credential (must be supplied before [`build`](PortfolioGateBuilder::build))
    pub fn new() -> Self {
        Self {
            store: NoStore,
            config: GateConfig::default(),
            clock: Arc::new(SystemClock),
            events: EventBus::default(),
            location: None,
        }
    }

    /// Use an existing store.
    pub fn with_store<S: KeyValueStore>(self, store: Arc<S>) -> PortfolioGateBuilder<WithStore<S>> {
        self.into_store(store)
    }

    /// Keep state in memory only. Nothing survives the process.
    pub fn with_memory_store(self) -> PortfolioGateBuilder<WithStore<MemoryStore>> {
        self.into_store(Arc::new(MemoryStore::new()))
    }

    fn into_store<S: KeyValueStore>(self, store: Arc<S>) -> PortfolioGateBuilder<WithStore<S>> {
        PortfolioGateBuilder {
            store: WithStore { store },
            config: self.config,
            clock: self.clock,
            events: self.events,
            location: self.location,
        }
    }
}

// ============================================================================
// Storage Configuration Methods (NoStore -> WithStore)
// ============================================================================

#[cfg(feature = "sqlite")]
impl PortfolioGateBuilder<NoStore> {
    /// Configure SQLite storage by connecting to the given URL.
    ///
    /// # Arguments
    ///
    /// * `url` - SQLite connection URL (e.g., "sqlite::memory:" or "sqlite://path/to/gate.db")
    pub async fn with_sqlite(
        self,
        url: &str,
    ) -> Result<PortfolioGateBuilder<WithStore<crate::SqliteKeyValueStore>>, PortfolioGateBuilderError>
    {
        let store = crate::SqliteKeyValueStore::connect(url)
            .await
            .map_err(|e| PortfolioGateBuilderError::StorageConnection(e.to_string()))?;

        Ok(self.into_store(Arc::new(store)))
    }

    /// Configure SQLite storage with an existing connection pool.
    pub fn with_sqlite_pool(
        self,
        pool: sqlx::SqlitePool,
    ) -> PortfolioGateBuilder<WithStore<crate::SqliteKeyValueStore>> {
        self.into_store(Arc::new(crate::SqliteKeyValueStore::new(pool)))
    }
}

#[cfg(feature = "sqlite")]
impl PortfolioGateBuilder<WithStore<crate::SqliteKeyValueStore>> {
    /// Apply pending schema migrations now.
    pub async fn apply_migrations(self) -> Result<Self, PortfolioGateBuilderError> {
        let applied = self
            .store
            .store
            .migrate()
            .await
            .map_err(|e| PortfolioGateBuilderError::Migration(e.to_string()))?;
        tracing::debug!(applied, "Applied migrations while building");
        Ok(self)
    }
}

// ============================================================================
// Configuration Methods
// ============================================================================

impl<Store> PortfolioGateBuilder<Store> {
    /// Replace the whole configuration.
    pub fn with_config(mut self, config: GateConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_credential(mut self, credential: CredentialConfig) -> Self {
        self.config.credential = Some(credential);
        self
    }

    pub fn with_limiter_config(mut self, limiter: LimiterConfig) -> Self {
        self.config.limiter = limiter;
        self
    }

    pub fn with_storage_keys(mut self, keys: StorageKeys) -> Self {
        self.config.keys = keys;
        self
    }

    /// Override the time source. Mostly useful in tests.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Share an event bus, typically one with handlers already registered.
    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    /// Page location used to derive the admin flag on build.
    ///
    /// `?admin=true` on it enters admin mode.
    pub fn with_location(mut self, location: Url) -> Self {
        self.location = Some(location);
        self
    }
}

impl<S: KeyValueStore> PortfolioGateBuilder<WithStore<S>> {
    /// Build the gate and restore its persisted state.
    ///
    /// # Errors
    ///
    /// - [`PortfolioGateBuilderError::InvalidConfiguration`] if no credential
    ///   is configured or the limiter settings are invalid
    /// - [`PortfolioGateBuilderError::Restore`] if the store cannot be read
    pub async fn build(self) -> Result<PortfolioGate<S>, PortfolioGateBuilderError> {
        self.config
            .limiter
            .validate()
            .map_err(|e| PortfolioGateBuilderError::InvalidConfiguration(e.to_string()))?;
        let credential = self
            .config
            .credential()
            .map_err(|e| PortfolioGateBuilderError::InvalidConfiguration(e.to_string()))?;

        let store = self.store.store;
        let limiter = Arc::new(
            LoginAttemptLimiter::new(store.clone(), self.config.limiter)
                .with_clock(self.clock)
                .with_keys(self.config.keys)
                .with_event_bus(self.events.clone()),
        );
        let status = limiter
            .restore()
            .await
            .map_err(|e| PortfolioGateBuilderError::Restore(e.to_string()))?;

        let gate = Arc::new(AdminSessionGate::new(limiter.clone(), credential));
        let is_admin = gate
            .restore_session(self.location.as_ref())
            .await
            .map_err(|e| PortfolioGateBuilderError::Restore(e.to_string()))?;

        tracing::debug!(
            failed_attempts = status.failed_attempts,
            locked = status.is_locked(),
            is_admin,
            "Portfolio gate ready"
        );

        Ok(PortfolioGate::new(store, limiter, gate, self.events))
    }
}
