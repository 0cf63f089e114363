//! SQLite backend for portfolio-gate.
//!
//! State lives in a single `kv_entries` table keyed by entry name. Use
//! [`SqliteKeyValueStore::connect`] with a `sqlite:` URL, then call
//! [`SqliteKeyValueStore::migrate`] before handing the store to the services.
//!
//! ```rust,no_run
//! # async fn run() -> Result<(), portfolio_gate_core::Error> {
//! use portfolio_gate_core::KeyValueStore;
//! use portfolio_gate_storage_sqlite::SqliteKeyValueStore;
//!
//! let store = SqliteKeyValueStore::connect("sqlite://gate.db?mode=rwc").await?;
//! store.migrate().await?;
//! store.set("portfolio_login_attempts", "2").await?;
//! # Ok(())
//! # }
//! ```
pub mod migrations;

use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use portfolio_gate_core::{Error, KeyValueStore, error::StorageError};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::migrations::{MigrationRecord, SqliteMigrationManager};

pub struct SqliteKeyValueStore {
    pool: SqlitePool,
}

impl SqliteKeyValueStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open a pool for `database_url`, creating the database file if needed.
    ///
    /// In-memory databases get a single long-lived connection, since every
    /// new connection to `sqlite::memory:` would see an empty database.
    pub async fn connect(database_url: &str) -> Result<Self, Error> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| {
                tracing::error!(error = %e, database_url, "Invalid SQLite URL");
                StorageError::Connection(format!("Invalid SQLite URL: {e}"))
            })?
            .create_if_missing(true);

        let pool_options = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
        };

        let pool = pool_options.connect_with(options).await.map_err(|e| {
            tracing::error!(error = %e, database_url, "Failed to connect to SQLite");
            StorageError::Connection(format!("Failed to connect to SQLite: {e}"))
        })?;

        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Apply pending migrations. Returns how many ran.
    pub async fn migrate(&self) -> Result<usize, Error> {
        let manager = SqliteMigrationManager::new(self.pool.clone());
        manager.initialize().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to initialize migrations");
            StorageError::Migration("Failed to initialize migrations".to_string())
        })?;

        let applied = manager.up(&migrations::all()).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to run migrations");
            StorageError::Migration("Failed to run migrations".to_string())
        })?;

        tracing::debug!(applied, "Migrations complete");
        Ok(applied)
    }

    /// Migrations recorded as applied, oldest first.
    pub async fn applied_migrations(&self) -> Result<Vec<MigrationRecord>, Error> {
        let manager = SqliteMigrationManager::new(self.pool.clone());
        manager.initialize().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to initialize migrations");
            StorageError::Migration("Failed to initialize migrations".to_string())
        })?;
        Ok(manager.applied_migrations().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to list applied migrations");
            StorageError::Migration("Failed to list applied migrations".to_string())
        })?)
    }
}

#[async_trait]
impl KeyValueStore for SqliteKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM kv_entries WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, key, "Failed to read entry");
                    StorageError::Database("Failed to read entry".to_string())
                })?;

        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO kv_entries (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, key, "Failed to write entry");
            StorageError::Database("Failed to write entry".to_string())
        })?;

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), Error> {
        sqlx::query("DELETE FROM kv_entries WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, key, "Failed to remove entry");
                StorageError::Database("Failed to remove entry".to_string())
            })?;

        Ok(())
    }
}
