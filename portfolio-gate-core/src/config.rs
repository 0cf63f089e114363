//! Configuration for the limiter and the admin gate.
//!
//! Everything has a default matching the portfolio's behaviour: five attempts,
//! a 24 hour lockout, a one second countdown tick and the `portfolio_*`
//! storage keys. Only the admin credential has no default.

use std::path::Path;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::{
    crypto::AdminCredential,
    error::{ConfigError, Error},
    storage::StorageKeys,
};

/// Failed attempts allowed before a lockout starts.
pub const DEFAULT_MAX_FAILED_ATTEMPTS: u32 = 5;

/// 24 hours in milliseconds.
pub const DEFAULT_LOCKOUT_PERIOD_MS: i64 = 24 * 60 * 60 * 1000;

pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1000;

/// Longest accepted lockout: 100 years of 365 days.
pub const MAX_LOCKOUT_PERIOD_MS: i64 = 100 * 365 * DEFAULT_LOCKOUT_PERIOD_MS;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimiterConfig {
    /// Number of consecutive failures that triggers a lockout.
    pub max_failed_attempts: u32,
    /// Length of a lockout in milliseconds.
    pub lockout_period_ms: i64,
    /// How often the countdown refreshes while locked out.
    pub tick_interval_ms: u64,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            max_failed_attempts: DEFAULT_MAX_FAILED_ATTEMPTS,
            lockout_period_ms: DEFAULT_LOCKOUT_PERIOD_MS,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
        }
    }
}

impl LimiterConfig {
    pub fn lockout_period(&self) -> Duration {
        Duration::milliseconds(self.lockout_period_ms)
    }

    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.tick_interval_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_failed_attempts == 0 {
            return Err(ConfigError::InvalidLimiter(
                "max_failed_attempts must be at least 1".to_string(),
            ));
        }
        if self.lockout_period_ms <= 0 {
            return Err(ConfigError::InvalidLimiter(
                "lockout_period_ms must be positive".to_string(),
            ));
        }
        if self.lockout_period_ms > MAX_LOCKOUT_PERIOD_MS {
            return Err(ConfigError::InvalidLimiter(format!(
                "lockout_period_ms must be at most {MAX_LOCKOUT_PERIOD_MS}"
            )));
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::InvalidLimiter(
                "tick_interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// How the admin credential is supplied.
///
/// The comparison happens wherever the gate runs, so a plaintext value is no
/// less safe than a digest once someone can read the config. The digest form
/// only keeps the value out of casual view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialConfig {
    Plaintext(String),
    Sha256(String),
}

impl CredentialConfig {
    pub fn to_credential(&self) -> Result<AdminCredential, ConfigError> {
        match self {
            CredentialConfig::Plaintext(value) => Ok(AdminCredential::from_plaintext(value)),
            CredentialConfig::Sha256(digest) => AdminCredential::from_sha256_hex(digest),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub limiter: LimiterConfig,
    pub keys: StorageKeys,
    pub credential: Option<CredentialConfig>,
}

impl GateConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, Error> {
        let config: GateConfig =
            serde_json::from_str(raw).map_err(|e| ConfigError::Read(e.to_string()))?;
        config.limiter.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&raw)
    }

    pub fn with_credential(mut self, credential: CredentialConfig) -> Self {
        self.credential = Some(credential);
        self
    }

    /// Resolve the configured credential.
    pub fn credential(&self) -> Result<AdminCredential, ConfigError> {
        self.credential
            .as_ref()
            .ok_or(ConfigError::MissingCredential)?
            .to_credential()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LimiterConfig::default();
        assert_eq!(config.max_failed_attempts, 5);
        assert_eq!(config.lockout_period().num_milliseconds(), 86_400_000);
        assert_eq!(config.tick_interval(), std::time::Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_attempts() {
        let config = LimiterConfig {
            max_failed_attempts: 0,
            ..LimiterConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidLimiter(_))
        ));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = GateConfig::from_json_str(
            r#"{ "limiter": { "max_failed_attempts": 3 }, "credential": { "plaintext": "hunter2" } }"#,
        )
        .unwrap();

        assert_eq!(config.limiter.max_failed_attempts, 3);
        assert_eq!(config.limiter.lockout_period_ms, DEFAULT_LOCKOUT_PERIOD_MS);
        assert_eq!(config.keys, StorageKeys::default());
        assert!(config.credential().unwrap().verify("hunter2"));
    }

    #[test]
    fn test_missing_credential() {
        let config = GateConfig::default();
        assert!(matches!(
            config.credential(),
            Err(ConfigError::MissingCredential)
        ));
    }

    #[test]
    fn test_invalid_limiter_in_json_is_rejected() {
        let result = GateConfig::from_json_str(r#"{ "limiter": { "lockout_period_ms": 0 } }"#);
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::InvalidLimiter(_)))
        ));
    }

    #[test]
    fn test_rejects_oversized_lockout_period() {
        let at_limit = LimiterConfig {
            lockout_period_ms: MAX_LOCKOUT_PERIOD_MS,
            ..LimiterConfig::default()
        };
        assert!(at_limit.validate().is_ok());

        let result = GateConfig::from_json_str(
            r#"{ "limiter": { "lockout_period_ms": 9223372036854775807 }, "credential": { "plaintext": "hunter2" } }"#,
        );
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::InvalidLimiter(_)))
        ));
    }

    #[test]
    fn test_malformed_json() {
        let result = GateConfig::from_json_str("{ not json");
        assert!(matches!(result, Err(Error::Config(ConfigError::Read(_)))));
    }
}
