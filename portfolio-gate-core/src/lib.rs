//! Core functionality for portfolio-gate
//!
//! This crate holds the client-side admin gate of a personal portfolio page:
//! a login attempt limiter with a timed lockout, the password-gated admin
//! session built on it, and the skill and project catalogs that the admin mode
//! edits.
//!
//! All durable state goes through the [`KeyValueStore`] trait, so the same
//! services run against SQLite, memory, or anything else that can store
//! strings by key.
//!
//! See [`LoginAttemptLimiter`] for the lockout state machine and
//! [`AdminSessionGate`] for credential submission.
//!
//! The gate is not an authentication system. The credential comparison and
//! the lockout both run wherever the gate runs, and clearing the store lifts
//! any lockout.
pub mod clock;
pub mod config;
pub mod crypto;
pub mod error;
pub mod events;
pub mod services;
pub mod session;
pub mod storage;
pub mod validation;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CredentialConfig, GateConfig, LimiterConfig};
pub use crypto::AdminCredential;
pub use error::Error;
pub use services::{
    AdminSessionGate, CountdownState, LockoutCountdown, LockoutStatus, LoginAttemptLimiter,
    LoginOutcome, LoginRejection, ProjectCatalog, ProjectCatalogService, SkillCatalog,
    SkillCatalogService,
};
pub use storage::{KeyValueStore, MemoryStore, StorageKeys};
