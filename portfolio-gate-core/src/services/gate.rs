//! Password-gated admin session.
//!
//! The gate sits in front of the portfolio's admin mode. A submitted
//! candidate is checked against one configured [`AdminCredential`]; the
//! [`LoginAttemptLimiter`] decides whether the check may run at all.
//!
//! This is a demo gate. The credential check runs wherever the gate runs and
//! the lockout lives in a store the user controls, so it must never guard
//! anything reachable over a network.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Duration;
use url::Url;

use crate::{
    Error,
    crypto::AdminCredential,
    error::AuthError,
    events::{Event, UnlockReason},
    services::limiter::{LoginAttemptLimiter, describe_period, format_remaining},
    session::{admin_requested, strip_admin_param},
    storage::{ADMIN_SESSION_MARKER, KeyValueStore},
};

/// Result of a credential submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Accepted,
    Rejected(LoginRejection),
}

/// Why a submission was refused. `Display` gives the inline status message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginRejection {
    /// Wrong credential, more attempts allowed.
    InvalidCredential { remaining_attempts: u32 },
    /// Refused because of a lockout. `just_triggered` is set when this very
    /// submission was the one that reached the threshold.
    LockedOut {
        remaining: Duration,
        period: Duration,
        just_triggered: bool,
    },
}

impl fmt::Display for LoginRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoginRejection::InvalidCredential { remaining_attempts } => write!(
                f,
                "Incorrect password. {remaining_attempts} attempt{} remaining.",
                if *remaining_attempts == 1 { "" } else { "s" }
            ),
            LoginRejection::LockedOut {
                period,
                just_triggered: true,
                ..
            } => write!(
                f,
                "Too many failed login attempts. Try again after {}.",
                describe_period(*period)
            ),
            LoginRejection::LockedOut {
                remaining,
                period,
                just_triggered: false,
            } => write!(
                f,
                "Too many failed login attempts. Try again after {}. Time remaining: {}",
                describe_period(*period),
                format_remaining(*remaining)
            ),
        }
    }
}

impl LoginOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, LoginOutcome::Accepted)
    }

    /// Status message to show next to the login form, if any.
    pub fn message(&self) -> Option<String> {
        match self {
            LoginOutcome::Accepted => None,
            LoginOutcome::Rejected(rejection) => Some(rejection.to_string()),
        }
    }

    pub fn into_result(self) -> Result<(), AuthError> {
        match self {
            LoginOutcome::Accepted => Ok(()),
            LoginOutcome::Rejected(LoginRejection::InvalidCredential { .. }) => {
                Err(AuthError::InvalidCredential)
            }
            LoginOutcome::Rejected(LoginRejection::LockedOut { remaining, .. }) => {
                Err(AuthError::LockedOut {
                    remaining_seconds: remaining.num_seconds(),
                })
            }
        }
    }
}

/// Holds the `isAdmin` flag and mediates every change to it.
pub struct AdminSessionGate<S: KeyValueStore> {
    limiter: Arc<LoginAttemptLimiter<S>>,
    credential: AdminCredential,
    is_admin: AtomicBool,
}

impl<S: KeyValueStore> AdminSessionGate<S> {
    pub fn new(limiter: Arc<LoginAttemptLimiter<S>>, credential: AdminCredential) -> Self {
        Self {
            limiter,
            credential,
            is_admin: AtomicBool::new(false),
        }
    }

    pub fn limiter(&self) -> &Arc<LoginAttemptLimiter<S>> {
        &self.limiter
    }

    pub fn is_admin(&self) -> bool {
        self.is_admin.load(Ordering::SeqCst)
    }

    /// Fail with [`AuthError::NotAdmin`] unless the admin flag is set.
    pub fn require_admin(&self) -> Result<(), Error> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AuthError::NotAdmin.into())
        }
    }

    /// Derive the admin flag at page load.
    ///
    /// `admin=true` on `location` switches admin mode on and writes the
    /// session marker. Otherwise the persisted marker decides.
    pub async fn restore_session(&self, location: Option<&Url>) -> Result<bool, Error> {
        let store = self.limiter.store();
        let key = &self.limiter.keys().admin_session;

        let requested = location.is_some_and(admin_requested);
        let is_admin = if requested {
            store.set(key, ADMIN_SESSION_MARKER).await?;
            tracing::info!("Admin mode entered via query parameter");
            true
        } else {
            store.get(key).await?.as_deref() == Some(ADMIN_SESSION_MARKER)
        };

        self.is_admin.store(is_admin, Ordering::SeqCst);
        Ok(is_admin)
    }

    /// Check a candidate credential.
    ///
    /// Only storage failures are returned as `Err`; a wrong credential or a
    /// lockout is a [`LoginOutcome::Rejected`].
    pub async fn submit(&self, candidate: &str) -> Result<LoginOutcome, Error> {
        let period = self.limiter.config().lockout_period();

        let status = self.limiter.status().await?;
        if let Some(remaining) = status.remaining {
            tracing::info!(
                retry_after_seconds = remaining.num_seconds(),
                "Admin login refused while locked out"
            );
            return Ok(LoginOutcome::Rejected(LoginRejection::LockedOut {
                remaining,
                period,
                just_triggered: false,
            }));
        }

        if self.credential.verify(candidate) {
            self.limiter
                .reset_with_reason(UnlockReason::SuccessfulLogin)
                .await?;
            self.limiter
                .store()
                .set(&self.limiter.keys().admin_session, ADMIN_SESSION_MARKER)
                .await?;
            self.is_admin.store(true, Ordering::SeqCst);

            tracing::info!("Admin login accepted");
            self.limiter
                .events()
                .publish(Event::AdminLoggedIn {
                    timestamp: self.limiter.clock().now(),
                })
                .await;
            return Ok(LoginOutcome::Accepted);
        }

        let rejection = match self.limiter.record_failed_attempt().await {
            Ok(status) => match status.remaining {
                Some(remaining) => LoginRejection::LockedOut {
                    remaining,
                    period,
                    just_triggered: true,
                },
                None => LoginRejection::InvalidCredential {
                    remaining_attempts: status.remaining_attempts,
                },
            },
            // Another task locked the limiter between the status check and now.
            Err(Error::Auth(AuthError::LockedOut { remaining_seconds })) => {
                LoginRejection::LockedOut {
                    remaining: Duration::seconds(remaining_seconds),
                    period,
                    just_triggered: false,
                }
            }
            Err(e) => return Err(e),
        };

        Ok(LoginOutcome::Rejected(rejection))
    }

    /// Leave admin mode.
    ///
    /// Clears the flag and the persisted marker and returns `location` with
    /// the `admin` query parameter stripped. Attempt counter and lockout are
    /// left alone.
    pub async fn logout(&self, location: Option<&Url>) -> Result<Option<Url>, Error> {
        self.is_admin.store(false, Ordering::SeqCst);
        self.limiter
            .store()
            .remove(&self.limiter.keys().admin_session)
            .await?;

        tracing::info!("Admin logged out");
        self.limiter
            .events()
            .publish(Event::AdminLoggedOut {
                timestamp: self.limiter.clock().now(),
            })
            .await;

        Ok(location.map(strip_admin_param))
    }
}
