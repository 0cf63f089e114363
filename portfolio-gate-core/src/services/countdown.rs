//! Display refresh while locked out.
//!
//! [`LockoutCountdown`] replaces a page's one-second interval timer. It polls
//! the limiter on a fixed period, publishes the remaining time on a watch
//! channel and ends itself once the lockout is over. Stopping it or dropping
//! it cancels the task, so no recurring callback outlives its owner.

use std::sync::Arc;

use chrono::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::{
    Error,
    services::limiter::{LockoutStatus, LoginAttemptLimiter},
    storage::KeyValueStore,
};

/// What the countdown last observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountdownState {
    Open,
    LockedOut {
        remaining: Duration,
        /// `"{h}h {m}m {s}s"`
        display: String,
    },
}

impl From<&LockoutStatus> for CountdownState {
    fn from(status: &LockoutStatus) -> Self {
        match status.remaining {
            Some(remaining) => CountdownState::LockedOut {
                remaining,
                display: status.time_remaining_display().unwrap_or_default(),
            },
            None => CountdownState::Open,
        }
    }
}

pub struct LockoutCountdown {
    state: watch::Receiver<CountdownState>,
    shutdown: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl LockoutCountdown {
    /// Start ticking at the limiter's configured interval.
    ///
    /// If the limiter is not locked out no task is spawned and the countdown
    /// reports [`CountdownState::Open`] straight away.
    pub async fn start<S: KeyValueStore>(
        limiter: Arc<LoginAttemptLimiter<S>>,
    ) -> Result<Self, Error> {
        let period = limiter.config().tick_interval();
        Self::start_with_period(limiter, period).await
    }

    pub async fn start_with_period<S: KeyValueStore>(
        limiter: Arc<LoginAttemptLimiter<S>>,
        period: std::time::Duration,
    ) -> Result<Self, Error> {
        let initial = CountdownState::from(&limiter.status().await?);
        let (state_tx, state_rx) = watch::channel(initial.clone());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = match initial {
            CountdownState::Open => None,
            CountdownState::LockedOut { .. } => {
                Some(tokio::spawn(run(limiter, period, state_tx, shutdown_rx)))
            }
        };

        Ok(Self {
            state: state_rx,
            shutdown: shutdown_tx,
            handle,
        })
    }

    /// Latest observed state.
    pub fn current(&self) -> CountdownState {
        self.state.borrow().clone()
    }

    /// A receiver that sees every state the countdown publishes.
    pub fn subscribe(&self) -> watch::Receiver<CountdownState> {
        self.state.clone()
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop ticking and wait for the task to exit.
    pub async fn stop(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Lockout countdown task failed");
            }
        }
    }

    /// Wait until the lockout ends on its own (or the task is stopped elsewhere).
    pub async fn finished(mut self) -> CountdownState {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Lockout countdown task failed");
            }
        }
        self.current()
    }
}

impl Drop for LockoutCountdown {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

async fn run<S: KeyValueStore>(
    limiter: Arc<LoginAttemptLimiter<S>>,
    period: std::time::Duration,
    state: watch::Sender<CountdownState>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match limiter.status().await {
                    Ok(status) => {
                        let next = CountdownState::from(&status);
                        let open = next == CountdownState::Open;
                        state.send_replace(next);
                        if open {
                            tracing::debug!("Lockout over, stopping countdown");
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to refresh lockout status");
                    }
                }
            }
            _ = shutdown.changed() => {
                tracing::debug!("Lockout countdown stopped");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::LimiterConfig;
    use crate::storage::MemoryStore;

    const TICK: std::time::Duration = std::time::Duration::from_millis(10);

    async fn locked_limiter() -> (Arc<ManualClock>, Arc<LoginAttemptLimiter<MemoryStore>>) {
        let clock = Arc::new(ManualClock::at_millis(1_700_000_000_000));
        let config = LimiterConfig {
            max_failed_attempts: 1,
            lockout_period_ms: 90 * 60 * 1000,
            ..LimiterConfig::default()
        };
        let limiter = Arc::new(
            LoginAttemptLimiter::new(Arc::new(MemoryStore::new()), config)
                .with_clock(clock.clone()),
        );
        limiter.record_failed_attempt().await.unwrap();
        (clock, limiter)
    }

    #[tokio::test]
    async fn test_open_limiter_spawns_nothing() {
        let limiter = Arc::new(LoginAttemptLimiter::new(
            Arc::new(MemoryStore::new()),
            LimiterConfig::default(),
        ));
        let countdown = LockoutCountdown::start(limiter).await.unwrap();

        assert!(!countdown.is_running());
        assert_eq!(countdown.current(), CountdownState::Open);
    }

    #[tokio::test]
    async fn test_reports_remaining_time() {
        let (_clock, limiter) = locked_limiter().await;
        let countdown = LockoutCountdown::start_with_period(limiter, TICK)
            .await
            .unwrap();

        assert!(countdown.is_running());
        assert_eq!(
            countdown.current(),
            CountdownState::LockedOut {
                remaining: Duration::minutes(90),
                display: "1h 30m 0s".to_string(),
            }
        );
        countdown.stop().await;
    }

    #[tokio::test]
    async fn test_ends_when_lockout_expires() {
        let (clock, limiter) = locked_limiter().await;
        let countdown = LockoutCountdown::start_with_period(limiter.clone(), TICK)
            .await
            .unwrap();

        clock.advance(Duration::minutes(90));
        let last = tokio::time::timeout(std::time::Duration::from_secs(5), countdown.finished())
            .await
            .expect("countdown should end after expiry");

        assert_eq!(last, CountdownState::Open);
        assert!(!limiter.is_locked().await.unwrap());
    }

    #[tokio::test]
    async fn test_stop_cancels_task() {
        let (_clock, limiter) = locked_limiter().await;
        let countdown = LockoutCountdown::start_with_period(limiter.clone(), TICK)
            .await
            .unwrap();

        tokio::time::timeout(std::time::Duration::from_secs(5), countdown.stop())
            .await
            .expect("stop should return promptly");
        assert!(limiter.is_locked().await.unwrap());
    }

    #[tokio::test]
    async fn test_drop_aborts_task() {
        let (_clock, limiter) = locked_limiter().await;
        let countdown = LockoutCountdown::start_with_period(limiter.clone(), TICK)
            .await
            .unwrap();
        let mut rx = countdown.subscribe();
        assert!(countdown.is_running());

        drop(countdown);

        // The sender lives in the task, so the channel closes once it is gone.
        tokio::time::timeout(std::time::Duration::from_secs(5), async {
            while rx.changed().await.is_ok() {}
        })
        .await
        .expect("countdown task should be aborted on drop");

        assert_eq!(Arc::strong_count(&limiter), 1);
        assert!(limiter.is_locked().await.unwrap());
    }

    #[tokio::test]
    async fn test_subscriber_sees_updates() {
        let (clock, limiter) = locked_limiter().await;
        let countdown = LockoutCountdown::start_with_period(limiter, TICK)
            .await
            .unwrap();
        let mut rx = countdown.subscribe();

        clock.advance(Duration::minutes(30));
        let seen = tokio::time::timeout(std::time::Duration::from_secs(5), async {
            loop {
                rx.changed().await.unwrap();
                let state = rx.borrow_and_update().clone();
                if let CountdownState::LockedOut { display, .. } = &state {
                    if display == "1h 0m 0s" {
                        return state;
                    }
                }
            }
        })
        .await
        .expect("subscriber should observe the advanced clock");

        assert!(matches!(seen, CountdownState::LockedOut { .. }));
        drop(countdown);
    }
}
