//! Validation helpers for values entered in the admin editor.

use crate::error::ValidationError;
use url::Url;

/// Trim `value` and fail if nothing is left.
///
/// # Examples
///
/// ```rust
/// use portfolio_gate_core::validation::validate_required;
///
/// assert_eq!(validate_required("name", "  Rust ").unwrap(), "Rust");
/// assert!(validate_required("name", "   ").is_err());
/// ```
pub fn validate_required<'a>(field: &str, value: &'a str) -> Result<&'a str, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField(field.to_string()));
    }
    Ok(trimmed)
}

/// Validates an absolute URL
///
/// Anything `Url::parse` accepts is allowed, which includes `mailto:` and
/// other non-http schemes. Relative references are rejected.
///
/// # Examples
///
/// ```rust
/// use portfolio_gate_core::validation::validate_url;
///
/// assert!(validate_url("https://www.rust-lang.org").is_ok());
/// assert!(validate_url("rust-lang.org").is_err());
/// ```
pub fn validate_url(value: &str) -> Result<Url, ValidationError> {
    let trimmed = value.trim();
    Url::parse(trimmed).map_err(|e| ValidationError::InvalidUrl(format!("{trimmed}: {e}")))
}

/// Like [`validate_url`] but an empty value is `Ok(None)`.
pub fn validate_optional_url(value: Option<&str>) -> Result<Option<Url>, ValidationError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(url) => validate_url(url).map(Some),
    }
}
