//! Credential comparison for the admin gate
//!
//! The gate compares a submitted string with one configured value. The value
//! is kept as a SHA256 digest and compared in constant time with the `subtle`
//! crate so the comparison does not exit early on the first differing byte.
//!
//! # Security
//!
//! This is not an authentication system. Whoever runs the gate can read the
//! configured digest, and a low-entropy password digest is trivially brute
//! forced offline. Never put the gate on a network-exposed path.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::ConfigError;

/// The value a submitted candidate must match.
#[derive(Clone, PartialEq, Eq)]
pub struct AdminCredential {
    digest: [u8; 32],
}

impl AdminCredential {
    pub fn from_plaintext(value: &str) -> Self {
        Self {
            digest: sha256(value),
        }
    }

    /// Build from a hex-encoded SHA256 digest (64 hex characters).
    pub fn from_sha256_hex(digest: &str) -> Result<Self, ConfigError> {
        let bytes = hex::decode(digest.trim())
            .map_err(|e| ConfigError::InvalidDigest(e.to_string()))?;
        let digest: [u8; 32] = bytes.try_into().map_err(|bytes: Vec<u8>| {
            ConfigError::InvalidDigest(format!("expected 32 bytes, got {}", bytes.len()))
        })?;
        Ok(Self { digest })
    }

    /// Check a submitted candidate.
    pub fn verify(&self, candidate: &str) -> bool {
        constant_time_compare(&sha256(candidate), &self.digest)
    }

    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest)
    }
}

impl std::fmt::Debug for AdminCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCredential")
            .field("digest", &"<redacted>")
            .finish()
    }
}

/// Hex-encoded SHA256 of `value`.
pub fn hash_credential(value: &str) -> String {
    hex::encode(sha256(value))
}

fn sha256(value: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    hasher.finalize().into()
}

/// Perform constant-time comparison of two byte slices.
pub fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plaintext_verify() {
        let credential = AdminCredential::from_plaintext("open-sesame");
        assert!(credential.verify("open-sesame"));
        assert!(!credential.verify("open-sesame "));
        assert!(!credential.verify(""));
    }

    #[test]
    fn test_digest_roundtrip() {
        let hex_digest = hash_credential("open-sesame");
        assert_eq!(hex_digest.len(), 64);

        let credential = AdminCredential::from_sha256_hex(&hex_digest).unwrap();
        assert!(credential.verify("open-sesame"));
        assert_eq!(credential.digest_hex(), hex_digest);
        assert_eq!(credential, AdminCredential::from_plaintext("open-sesame"));
    }

    #[test]
    fn test_bad_digest() {
        assert!(matches!(
            AdminCredential::from_sha256_hex("zz"),
            Err(ConfigError::InvalidDigest(_))
        ));
        assert!(matches!(
            AdminCredential::from_sha256_hex("abcd"),
            Err(ConfigError::InvalidDigest(_))
        ));
    }

    #[test]
    fn test_debug_is_redacted() {
        let credential = AdminCredential::from_plaintext("secret");
        let rendered = format!("{credential:?}");
        assert!(!rendered.contains(&hash_credential("secret")));
        assert!(rendered.contains("redacted"));
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare(b"hello", b"hello"));
        assert!(constant_time_compare(b"", b""));
        assert!(!constant_time_compare(b"hello", b"world"));
        assert!(!constant_time_compare(b"short", b"longer_string"));
    }
}
