//! Service layer
//!
//! The limiter owns attempt counting and lockout; the gate owns the admin
//! flag and consults the limiter; the skill and project catalog services edit
//! what the admin mode exists to edit; the countdown refreshes lockout status
//! for display.

pub mod catalog;
pub mod countdown;
pub mod gate;
pub mod limiter;
pub mod projects;

pub use catalog::{
    CatalogDraft, CustomSkill, NewCustomSkill, SkillCatalog, SkillCatalogService, SkillCategory,
};
pub use countdown::{CountdownState, LockoutCountdown};
pub use gate::{AdminSessionGate, LoginOutcome, LoginRejection};
pub use limiter::{LockoutStatus, LoginAttemptLimiter, describe_period, format_remaining};
pub use projects::{
    Project, ProjectCatalog, ProjectCatalogService, ProjectCategory, ProjectDraft, ProjectForm,
    ProjectLinks,
};
