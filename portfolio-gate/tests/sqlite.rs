#![cfg(feature = "sqlite")]

use std::sync::Arc;

use chrono::Duration;
use portfolio_gate::{
    CredentialConfig, KeyValueStore, LoginOutcome, LoginRejection, ManualClock, PortfolioGate,
    PortfolioGateBuilder, SqliteKeyValueStore,
};
use url::Url;

const SECRET: &str = "correct-horse";
const START_MS: i64 = 1_700_000_000_000;
const DAY_MS: i64 = 24 * 60 * 60 * 1000;

async fn setup_gate(clock: Arc<ManualClock>) -> PortfolioGate<SqliteKeyValueStore> {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    PortfolioGateBuilder::new()
        .with_sqlite("sqlite::memory:")
        .await
        .expect("Failed to connect to SQLite")
        .apply_migrations()
        .await
        .expect("Failed to run migrations")
        .with_credential(CredentialConfig::Plaintext(SECRET.to_string()))
        .with_clock(clock)
        .build()
        .await
        .expect("Failed to build gate")
}

#[tokio::test]
async fn test_sqlite_lockout_scenario() {
    let clock = Arc::new(ManualClock::at_millis(START_MS));
    let gate = setup_gate(clock.clone()).await;

    for n in 1..=4u32 {
        let outcome = gate.submit(&format!("wrong{n}")).await.unwrap();
        assert_eq!(
            outcome,
            LoginOutcome::Rejected(LoginRejection::InvalidCredential {
                remaining_attempts: 5 - n
            })
        );
    }
    assert_eq!(
        gate.submit("wrong5").await.unwrap().message().as_deref(),
        Some("Too many failed login attempts. Try again after 24 hours.")
    );

    let status = gate.status().await.unwrap();
    assert!(status.is_locked());
    assert_eq!(status.remaining_attempts, 0);
    assert_eq!(
        gate.store()
            .get("portfolio_lockout_time")
            .await
            .unwrap()
            .as_deref(),
        Some((START_MS + DAY_MS).to_string().as_str())
    );

    // Even the right credential is refused while locked out.
    clock.advance(Duration::seconds(1));
    let outcome = gate.submit(SECRET).await.unwrap();
    assert!(!outcome.is_accepted());
    assert_eq!(
        outcome.message().as_deref(),
        Some(
            "Too many failed login attempts. Try again after 24 hours. Time remaining: 23h 59m 59s"
        )
    );
    assert!(!gate.is_admin());
    assert_eq!(gate.status().await.unwrap().failed_attempts, 5);

    clock.advance(Duration::hours(24));
    let outcome = gate.submit(SECRET).await.unwrap();
    assert!(outcome.is_accepted());
    assert!(gate.is_admin());

    let status = gate.status().await.unwrap();
    assert_eq!(status.failed_attempts, 0);
    assert!(!status.is_locked());
    assert_eq!(gate.store().get("portfolio_login_attempts").await.unwrap(), None);
    assert_eq!(gate.store().get("portfolio_lockout_time").await.unwrap(), None);
    assert_eq!(
        gate.store()
            .get("portfolio_admin_session")
            .await
            .unwrap()
            .as_deref(),
        Some("authenticated")
    );
}

#[tokio::test]
async fn test_sqlite_logout_keeps_attempts() {
    let clock = Arc::new(ManualClock::at_millis(START_MS));
    let gate = setup_gate(clock).await;

    gate.submit("nope").await.unwrap();
    gate.submit("nope").await.unwrap();
    assert!(gate.submit(SECRET).await.unwrap().is_accepted());
    gate.submit("nope").await.unwrap();

    let location = Url::parse("https://portfolio.example/?admin=true&tab=skills").unwrap();
    let stripped = gate.logout(Some(&location)).await.unwrap().unwrap();

    assert!(!gate.is_admin());
    assert_eq!(stripped.as_str(), "https://portfolio.example/?tab=skills");
    assert_eq!(gate.store().get("portfolio_admin_session").await.unwrap(), None);
    assert_eq!(gate.status().await.unwrap().failed_attempts, 1);
}

#[tokio::test]
async fn test_sqlite_state_survives_restart() {
    let path = std::env::temp_dir().join(format!(
        "portfolio-gate-restart-{}.db",
        std::process::id()
    ));
    let url = format!("sqlite://{}", path.display());
    let clock = Arc::new(ManualClock::at_millis(START_MS));

    {
        let gate = PortfolioGateBuilder::new()
            .with_sqlite(&url)
            .await
            .unwrap()
            .apply_migrations()
            .await
            .unwrap()
            .with_credential(CredentialConfig::Plaintext(SECRET.to_string()))
            .with_clock(clock.clone())
            .build()
            .await
            .unwrap();

        for _ in 0..5 {
            gate.submit("wrong").await.unwrap();
        }
        assert!(gate.status().await.unwrap().is_locked());
        gate.store().pool().close().await;
    }

    clock.advance(Duration::hours(1));
    let gate = PortfolioGateBuilder::new()
        .with_sqlite(&url)
        .await
        .unwrap()
        .with_credential(CredentialConfig::Plaintext(SECRET.to_string()))
        .with_clock(clock.clone())
        .build()
        .await
        .unwrap();

    let status = gate.status().await.unwrap();
    assert!(status.is_locked());
    assert_eq!(status.failed_attempts, 5);
    assert_eq!(status.time_remaining_display().as_deref(), Some("23h 0m 0s"));

    // Reopening after the deadline lands in the open state with a clean slate.
    clock.advance(Duration::hours(23));
    gate.restore(None).await.unwrap();
    let status = gate.status().await.unwrap();
    assert!(!status.is_locked());
    assert_eq!(status.failed_attempts, 0);
    assert_eq!(gate.store().get("portfolio_lockout_time").await.unwrap(), None);

    gate.store().pool().close().await;
    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_builder_with_sqlite_pool() {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to connect to SQLite");

    let gate = PortfolioGateBuilder::new()
        .with_sqlite_pool(pool)
        .apply_migrations()
        .await
        .expect("Failed to run migrations")
        .with_credential(CredentialConfig::Plaintext(SECRET.to_string()))
        .build()
        .await
        .expect("Failed to build gate");

    assert_eq!(gate.migrate().await.unwrap(), 0);
    assert_eq!(gate.status().await.unwrap().remaining_attempts, 5);
}

#[tokio::test]
async fn test_build_without_migrations_fails_to_restore() {
    let result = PortfolioGateBuilder::new()
        .with_sqlite("sqlite::memory:")
        .await
        .unwrap()
        .with_credential(CredentialConfig::Plaintext(SECRET.to_string()))
        .build()
        .await;

    assert!(matches!(
        result,
        Err(portfolio_gate::PortfolioGateBuilderError::Restore(_))
    ));
}
