//! Login attempt limiter with timed lockout.
//!
//! The limiter counts consecutive failed admin logins. When the count reaches
//! the configured threshold it records a lockout deadline; until that deadline
//! passes every further attempt is refused without being counted. Both values
//! are persisted so a reload (a new process, a new page) restores them.
//!
//! # States
//!
//! - **Open**: fewer than `max_failed_attempts` failures, no deadline.
//! - **LockedOut**: a deadline is set and has not passed.
//! - An elapsed deadline is noticed on the next observation (`status`,
//!   `restore`, `record_failed_attempt`), which resets the limiter to Open.
//!
//! # Example
//!
//! ```rust,ignore
//! use portfolio_gate_core::services::LoginAttemptLimiter;
//!
//! let limiter = LoginAttemptLimiter::load(store, LimiterConfig::default()).await?;
//!
//! let status = limiter.status().await?;
//! if status.is_locked() {
//!     println!("Locked, {} left", status.time_remaining_display().unwrap_or_default());
//! }
//! ```

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use crate::{
    Error,
    clock::{Clock, SystemClock},
    config::LimiterConfig,
    error::{AuthError, ConfigError, StorageError},
    events::{Event, EventBus, UnlockReason},
    storage::{KeyValueStore, StorageKeys},
};

/// Snapshot of the limiter, suitable for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockoutStatus {
    /// Consecutive failed attempts counted so far.
    pub failed_attempts: u32,
    /// Attempts left before a lockout, `0` while locked.
    pub remaining_attempts: u32,
    /// Deadline of the active lockout, if any.
    pub locked_until: Option<DateTime<Utc>>,
    /// Time left on the active lockout, if any.
    pub remaining: Option<Duration>,
}

impl LockoutStatus {
    pub fn is_locked(&self) -> bool {
        self.locked_until.is_some()
    }

    /// Whole seconds until the lockout ends, rounded down.
    pub fn retry_after_seconds(&self) -> Option<i64> {
        self.remaining.map(|r| r.num_seconds())
    }

    /// Remaining lockout time as `"{h}h {m}m {s}s"`.
    pub fn time_remaining_display(&self) -> Option<String> {
        self.remaining.map(format_remaining)
    }
}

/// Format a remaining duration as `"{h}h {m}m {s}s"`, truncating each unit.
///
/// Negative durations render as zero.
pub fn format_remaining(remaining: Duration) -> String {
    let total_ms = remaining.num_milliseconds().max(0);
    let hours = total_ms / (1000 * 60 * 60);
    let minutes = (total_ms % (1000 * 60 * 60)) / (1000 * 60);
    let seconds = (total_ms % (1000 * 60)) / 1000;
    format!("{hours}h {minutes}m {seconds}s")
}

/// Describe a lockout period in words, e.g. `"24 hours"` or `"15 minutes"`.
pub fn describe_period(period: Duration) -> String {
    fn plural(n: i64, unit: &str) -> String {
        if n == 1 {
            format!("{n} {unit}")
        } else {
            format!("{n} {unit}s")
        }
    }

    let secs = period.num_seconds().max(0);
    if secs >= 3600 && secs % 3600 == 0 {
        plural(secs / 3600, "hour")
    } else if secs >= 60 && secs % 60 == 0 {
        plural(secs / 60, "minute")
    } else {
        plural(secs, "second")
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct AttemptState {
    attempts: u32,
    locked_until: Option<DateTime<Utc>>,
}

impl AttemptState {
    fn is_clear(&self) -> bool {
        self.attempts == 0 && self.locked_until.is_none()
    }
}

/// Tracks failed admin logins and enforces the lockout.
///
/// All mutation happens under one async mutex, so within a process every
/// read-modify-write of the persisted counter is applied whole. Instances in
/// other processes sharing the same store race last-write-wins.
pub struct LoginAttemptLimiter<S: KeyValueStore> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    config: LimiterConfig,
    keys: StorageKeys,
    events: EventBus,
    state: Mutex<AttemptState>,
}

impl<S: KeyValueStore> LoginAttemptLimiter<S> {
    /// Create a limiter in the Open state without reading the store.
    ///
    /// Call [`restore`](Self::restore) to pick up persisted state, or use
    /// [`load`](Self::load) which does both.
    pub fn new(store: Arc<S>, config: LimiterConfig) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            config,
            keys: StorageKeys::default(),
            events: EventBus::default(),
            state: Mutex::new(AttemptState::default()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_keys(mut self, keys: StorageKeys) -> Self {
        self.keys = keys;
        self
    }

    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    /// Create a limiter and restore its persisted state.
    pub async fn load(store: Arc<S>, config: LimiterConfig) -> Result<Self, Error> {
        let limiter = Self::new(store, config);
        limiter.restore().await?;
        Ok(limiter)
    }

    pub fn config(&self) -> &LimiterConfig {
        &self.config
    }

    pub fn keys(&self) -> &StorageKeys {
        &self.keys
    }

    pub(crate) fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub(crate) fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub(crate) fn events(&self) -> &EventBus {
        &self.events
    }

    /// Reload counter and deadline from the store.
    ///
    /// Unparseable values are logged, removed and treated as zero. An elapsed
    /// deadline resets the limiter to Open and clears the persisted keys.
    pub async fn restore(&self) -> Result<LockoutStatus, Error> {
        let now = self.clock.now();
        let threshold = self.config.max_failed_attempts;
        let mut cleared = None;

        let status = {
            let mut state = self.state.lock().await;

            let attempts = self.read_attempts().await?;
            let locked_until = self.read_deadline().await?;

            *state = match (attempts, locked_until) {
                (attempts, Some(until)) if now < until => {
                    tracing::info!(locked_until = %until, "Restored active lockout");
                    AttemptState {
                        attempts: attempts.max(threshold),
                        locked_until: Some(until),
                    }
                }
                (attempts, Some(until)) => {
                    tracing::info!(
                        locked_until = %until,
                        attempts,
                        "Persisted lockout already expired, resetting"
                    );
                    self.clear_persisted().await?;
                    cleared = Some(UnlockReason::LockoutExpired);
                    AttemptState::default()
                }
                (attempts, None) if attempts >= threshold => {
                    let error = StorageError::MalformedPersistedState {
                        key: self.keys.attempts.clone(),
                        value: attempts.to_string(),
                    };
                    tracing::warn!(
                        error = %error,
                        "Attempt count at threshold without a lockout deadline, resetting"
                    );
                    self.clear_persisted().await?;
                    AttemptState::default()
                }
                (attempts, None) => AttemptState {
                    attempts,
                    locked_until: None,
                },
            };

            self.compute_status(&state, now)
        };

        if let Some(reason) = cleared {
            self.events
                .publish(Event::LockoutCleared {
                    reason,
                    timestamp: now,
                })
                .await;
        }

        Ok(status)
    }

    /// Current status. Expires an elapsed lockout as a side effect.
    pub async fn status(&self) -> Result<LockoutStatus, Error> {
        let now = self.clock.now();
        let (status, expired) = {
            let mut state = self.state.lock().await;
            let expired = self.expire_if_elapsed(&mut state, now).await?;
            (self.compute_status(&state, now), expired)
        };

        if expired {
            self.events
                .publish(Event::LockoutCleared {
                    reason: UnlockReason::LockoutExpired,
                    timestamp: now,
                })
                .await;
        }

        Ok(status)
    }

    /// Check if the limiter is currently locked (convenience method).
    pub async fn is_locked(&self) -> Result<bool, Error> {
        Ok(self.status().await?.is_locked())
    }

    /// Attempts left before a lockout: `max(0, threshold - attempts)`.
    pub async fn remaining_attempts(&self) -> u32 {
        let state = self.state.lock().await;
        self.config.max_failed_attempts.saturating_sub(state.attempts)
    }

    pub async fn failed_attempts(&self) -> u32 {
        self.state.lock().await.attempts
    }

    /// Count one failed attempt, starting a lockout at the threshold.
    ///
    /// Refused with [`AuthError::LockedOut`] while a lockout is active; the
    /// counter is not touched in that case.
    pub async fn record_failed_attempt(&self) -> Result<LockoutStatus, Error> {
        let now = self.clock.now();
        let mut events = Vec::new();

        let status = {
            let mut state = self.state.lock().await;
            if self.expire_if_elapsed(&mut state, now).await? {
                events.push(Event::LockoutCleared {
                    reason: UnlockReason::LockoutExpired,
                    timestamp: now,
                });
            }

            if let Some(until) = state.locked_until {
                return Err(AuthError::LockedOut {
                    remaining_seconds: (until - now).num_seconds(),
                }
                .into());
            }

            let attempts = state.attempts.saturating_add(1);
            events.push(Event::LoginFailed {
                failed_attempts: attempts,
                timestamp: now,
            });

            if attempts >= self.config.max_failed_attempts {
                let locked_until = self.lockout_deadline(now)?;

                // Deadline first: a counter at the threshold without a deadline
                // reads back as corrupt and would be reset to Open.
                self.store
                    .set(
                        &self.keys.lockout_time,
                        &locked_until.timestamp_millis().to_string(),
                    )
                    .await?;
                *state = AttemptState {
                    attempts,
                    locked_until: Some(locked_until),
                };
                self.store
                    .set(&self.keys.attempts, &attempts.to_string())
                    .await?;

                tracing::warn!(
                    failed_attempts = attempts,
                    locked_until = %locked_until,
                    "Too many failed admin logins, locking out"
                );
                events.push(Event::LockoutStarted {
                    failed_attempts: attempts,
                    locked_until,
                    timestamp: now,
                });
            } else {
                self.store
                    .set(&self.keys.attempts, &attempts.to_string())
                    .await?;
                *state = AttemptState {
                    attempts,
                    locked_until: None,
                };
                tracing::info!(failed_attempts = attempts, "Failed admin login");
            }

            self.compute_status(&state, now)
        };

        for event in events {
            self.events.publish(event).await;
        }

        Ok(status)
    }

    /// Clear counter and deadline, in memory and in the store.
    pub async fn reset_attempts(&self) -> Result<(), Error> {
        self.reset_with_reason(UnlockReason::ManualReset).await
    }

    pub(crate) async fn reset_with_reason(&self, reason: UnlockReason) -> Result<(), Error> {
        let was_clear = {
            let mut state = self.state.lock().await;
            self.clear_persisted().await?;
            let was_clear = state.is_clear();
            *state = AttemptState::default();
            was_clear
        };

        if !was_clear {
            tracing::info!(?reason, "Login attempts reset");
            self.events
                .publish(Event::LockoutCleared {
                    reason,
                    timestamp: self.clock.now(),
                })
                .await;
        }

        Ok(())
    }

    /// Deadline for a lockout starting at `now`.
    ///
    /// Fails instead of panicking when the configured period is not positive
    /// or pushes the deadline past what `DateTime` can represent.
    fn lockout_deadline(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, ConfigError> {
        Duration::try_milliseconds(self.config.lockout_period_ms)
            .filter(|period| *period > Duration::zero())
            .and_then(|period| now.checked_add_signed(period))
            .ok_or_else(|| {
                ConfigError::InvalidLimiter(format!(
                    "lockout_period_ms {} does not give a valid deadline",
                    self.config.lockout_period_ms
                ))
            })
    }

    /// Reset if the deadline has passed. Returns whether a reset happened.
    async fn expire_if_elapsed(
        &self,
        state: &mut AttemptState,
        now: DateTime<Utc>,
    ) -> Result<bool, Error> {
        match state.locked_until {
            Some(until) if now >= until => {
                self.clear_persisted().await?;
                *state = AttemptState::default();
                tracing::info!(locked_until = %until, "Lockout expired");
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn clear_persisted(&self) -> Result<(), Error> {
        self.store.remove(&self.keys.attempts).await?;
        self.store.remove(&self.keys.lockout_time).await?;
        Ok(())
    }

    async fn read_attempts(&self) -> Result<u32, Error> {
        let Some(raw) = self.store.get(&self.keys.attempts).await? else {
            return Ok(0);
        };
        match raw.trim().parse::<u32>() {
            Ok(attempts) => Ok(attempts),
            Err(_) => {
                self.discard_malformed(&self.keys.attempts, raw).await?;
                Ok(0)
            }
        }
    }

    async fn read_deadline(&self) -> Result<Option<DateTime<Utc>>, Error> {
        let Some(raw) = self.store.get(&self.keys.lockout_time).await? else {
            return Ok(None);
        };
        match raw
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(DateTime::from_timestamp_millis)
        {
            Some(until) => Ok(Some(until)),
            None => {
                self.discard_malformed(&self.keys.lockout_time, raw).await?;
                Ok(None)
            }
        }
    }

    async fn discard_malformed(&self, key: &str, value: String) -> Result<(), Error> {
        let error = StorageError::MalformedPersistedState {
            key: key.to_string(),
            value,
        };
        tracing::warn!(error = %error, "Discarding malformed persisted value");
        self.store.remove(key).await
    }

    fn compute_status(&self, state: &AttemptState, now: DateTime<Utc>) -> LockoutStatus {
        match state.locked_until {
            Some(until) => LockoutStatus {
                failed_attempts: state.attempts,
                remaining_attempts: 0,
                locked_until: Some(until),
                remaining: Some(until - now),
            },
            None => LockoutStatus {
                failed_attempts: state.attempts,
                remaining_attempts: self.config.max_failed_attempts.saturating_sub(state.attempts),
                locked_until: None,
                remaining: None,
            },
        }
    }
}
