use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::EventError;

/// Why a lockout (or a partial attempt count) was cleared.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum UnlockReason {
    /// The lockout deadline passed
    LockoutExpired,
    /// The correct credential was submitted
    SuccessfulLogin,
    /// Someone called `reset_attempts` directly
    ManualReset,
}

/// Events emitted by the limiter, the gate and the catalog editor.
///
/// Nothing here is an audit trail: events never leave the process unless a
/// registered handler sends them somewhere.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Emitted when a submitted credential did not match.
    LoginFailed {
        /// Failures counted so far, including this one
        failed_attempts: u32,
        timestamp: DateTime<Utc>,
    },

    /// Emitted when the failure threshold is reached.
    LockoutStarted {
        failed_attempts: u32,
        locked_until: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    },

    /// Emitted when a non-zero attempt count or a lockout is cleared.
    LockoutCleared {
        reason: UnlockReason,
        timestamp: DateTime<Utc>,
    },

    AdminLoggedIn {
        timestamp: DateTime<Utc>,
    },

    AdminLoggedOut {
        timestamp: DateTime<Utc>,
    },

    /// Emitted when the skill catalog draft is committed.
    CatalogSaved {
        links: usize,
        custom_skills: usize,
        timestamp: DateTime<Utc>,
    },

    ProjectsSaved {
        links: usize,
        projects: usize,
        timestamp: DateTime<Utc>,
    },
}

/// A trait for handling events emitted by the event bus
///
/// Implementors of this trait can be registered with the [`EventBus`] to receive and process events.
///
/// # Examples
///
/// ```
/// # use portfolio_gate_core::events::{Event, EventHandler};
/// # use portfolio_gate_core::error::EventError;
/// # use async_trait::async_trait;
/// struct MyHandler;
///
/// #[async_trait]
/// impl EventHandler for MyHandler {
///     async fn handle_event(&self, event: &Event) -> Result<(), EventError> {
///         // Handle the event...
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    async fn handle_event(&self, event: &Event) -> Result<(), EventError>;
}

/// Event bus that can emit events and register event handlers
#[derive(Clone)]
pub struct EventBus {
    handlers: Arc<RwLock<Vec<Arc<dyn EventHandler>>>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus").finish_non_exhaustive()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn register(&self, handler: Arc<dyn EventHandler>) {
        self.handlers.write().await.push(handler);
    }

    /// Emit an event to all registered handlers, stopping at the first error.
    pub async fn emit(&self, event: &Event) -> Result<(), EventError> {
        for handler in self.handlers.read().await.iter() {
            handler.handle_event(event).await?;
        }

        Ok(())
    }

    /// Emit an event and log handler failures instead of returning them.
    pub async fn publish(&self, event: Event) {
        if let Err(e) = self.emit(&event).await {
            tracing::warn!(error = %e, ?event, "Event handler failed");
        }
    }
}
