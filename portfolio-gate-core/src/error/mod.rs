use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Event error: {0}")]
    Event(#[from] EventError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credential")]
    InvalidCredential,

    #[error("Locked out for another {remaining_seconds}s")]
    LockedOut { remaining_seconds: i64 },

    #[error("Admin session required")]
    NotAdmin,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Malformed persisted state under {key}: {value:?}")]
    MalformedPersistedState { key: String, value: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid category: {0}")]
    InvalidCategory(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Unknown custom skill: {0}")]
    UnknownSkill(String),

    #[error("Unknown project: {0}")]
    UnknownProject(String),

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("A project lists at most {max} skills")]
    TooManySkills { max: usize },

    #[error("Skill already listed: {0}")]
    DuplicateSkill(String),
}

#[derive(Debug, Error)]
pub enum EventError {
    #[error("Event bus error: {0}")]
    BusError(String),

    #[error("Event handler error: {0}")]
    HandlerError(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid credential digest: {0}")]
    InvalidDigest(String),

    #[error("Missing admin credential")]
    MissingCredential,

    #[error("Invalid limiter setting: {0}")]
    InvalidLimiter(String),

    #[error("Failed to read configuration: {0}")]
    Read(String),
}

impl Error {
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Error::Auth(_))
    }

    pub fn is_locked_out(&self) -> bool {
        matches!(self, Error::Auth(AuthError::LockedOut { .. }))
    }

    pub fn is_validation_error(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    pub fn is_storage_error(&self) -> bool {
        matches!(self, Error::Storage(_))
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(value: serde_json::Error) -> Self {
        StorageError::Serialization(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let auth_error = Error::Auth(AuthError::InvalidCredential);
        assert_eq!(
            auth_error.to_string(),
            "Authentication error: Invalid credential"
        );

        let validation_error = Error::Validation(ValidationError::InvalidUrl("nope".to_string()));
        assert_eq!(
            validation_error.to_string(),
            "Validation error: Invalid URL: nope"
        );

        let storage_error = Error::Storage(StorageError::MalformedPersistedState {
            key: "portfolio_login_attempts".to_string(),
            value: "abc".to_string(),
        });
        assert_eq!(
            storage_error.to_string(),
            "Storage error: Malformed persisted state under portfolio_login_attempts: \"abc\""
        );
    }

    #[test]
    fn test_project_validation_display() {
        let too_long = ValidationError::TooLong {
            field: "description".to_string(),
            max: 2000,
        };
        assert_eq!(
            too_long.to_string(),
            "description must be at most 2000 characters"
        );
        assert_eq!(
            ValidationError::TooManySkills { max: 5 }.to_string(),
            "A project lists at most 5 skills"
        );
    }

    #[test]
    fn test_locked_out_display() {
        let locked = AuthError::LockedOut {
            remaining_seconds: 42,
        };
        assert_eq!(locked.to_string(), "Locked out for another 42s");
    }

    #[test]
    fn test_error_predicates() {
        assert!(Error::Auth(AuthError::NotAdmin).is_auth_error());
        assert!(
            Error::Auth(AuthError::LockedOut {
                remaining_seconds: 1
            })
            .is_locked_out()
        );
        assert!(!Error::Auth(AuthError::InvalidCredential).is_locked_out());
        assert!(
            Error::Validation(ValidationError::MissingField("name".to_string()))
                .is_validation_error()
        );
        assert!(Error::Storage(StorageError::Database("x".to_string())).is_storage_error());
        assert!(!Error::Config(ConfigError::MissingCredential).is_storage_error());
    }
}
