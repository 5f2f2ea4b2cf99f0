//! Identity hashing
//!
//! Every table in the analytics core is keyed by an [`IdentityHash`], a
//! keyed one-way digest of the host application's account identifier. The
//! key is a single deployment-wide secret; without it the hash cannot be
//! recomputed, and with it the hash still cannot be inverted.
//!
//! The same secret signs attestation receipts, so the hasher also exposes
//! HMAC signing and constant-time signature comparison.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;

use crate::error::AnalyticsError;

type HmacSha256 = Hmac<Sha256>;

/// Minimum accepted secret length in bytes
pub const MIN_SECRET_LEN: usize = 16;

/// Placeholder values that must never be accepted as a deployment secret
const PLACEHOLDER_SECRETS: &[&str] = &[
    "changeme",
    "change-me",
    "default",
    "default-salt",
    "default_salt",
    "secret",
    "development-secret",
    "your-secret-here",
];

/// Pseudonymous handle derived from an account identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityHash(String);

impl IdentityHash {
    /// Wrap an already computed hex digest (used when reading from storage)
    pub fn from_hex(hex_digest: impl Into<String>) -> Self {
        Self(hex_digest.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Keyed one-way hasher holding the deployment secret
pub struct IdentityHasher {
    secret: SecretString,
}

impl fmt::Debug for IdentityHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityHasher")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl IdentityHasher {
    /// Create a hasher from the configured secret.
    ///
    /// A missing, short, or placeholder secret is a configuration error; it is
    /// never replaced by a built-in default.
    pub fn new(secret: Option<&str>) -> Result<Self, AnalyticsError> {
        let secret = secret.map(str::trim).unwrap_or_default();

        if secret.is_empty() {
            return Err(AnalyticsError::Configuration(
                "deployment secret is not configured".to_string(),
            ));
        }

        if PLACEHOLDER_SECRETS
            .iter()
            .any(|p| p.eq_ignore_ascii_case(secret))
        {
            return Err(AnalyticsError::Configuration(
                "deployment secret is a placeholder value".to_string(),
            ));
        }

        if secret.len() < MIN_SECRET_LEN {
            return Err(AnalyticsError::Configuration(format!(
                "deployment secret must be at least {MIN_SECRET_LEN} bytes"
            )));
        }

        Ok(Self {
            secret: SecretString::from(secret.to_string()),
        })
    }

    /// Derive the pseudonymous handle for an account identifier
    pub fn hash(&self, account_id: &str) -> IdentityHash {
        IdentityHash(hex::encode(self.mac(&[b"identity:", account_id.as_bytes()])))
    }

    /// Sign arbitrary content with the deployment secret (hex HMAC-SHA256)
    pub fn sign(&self, content: &[u8]) -> String {
        hex::encode(self.mac(&[b"attestation:", content]))
    }

    /// Check a hex signature against content in constant time
    pub fn verify_signature(&self, content: &[u8], signature_hex: &str) -> bool {
        let Ok(expected) = hex::decode(signature_hex) else {
            return false;
        };
        let mut mac = self.keyed();
        mac.update(b"attestation:");
        mac.update(content);
        mac.verify_slice(&expected).is_ok()
    }

    fn mac(&self, parts: &[&[u8]]) -> Vec<u8> {
        let mut mac = self.keyed();
        for part in parts {
            mac.update(part);
        }
        mac.finalize().into_bytes().to_vec()
    }

    fn keyed(&self) -> HmacSha256 {
        // HMAC accepts keys of any length, so construction cannot fail here.
        match HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes()) {
            Ok(mac) => mac,
            Err(_) => unreachable!("HMAC-SHA256 accepts keys of any length"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SECRET: &str = "unit-test-deployment-secret-0001";

    #[test]
    fn test_missing_secret_is_configuration_error() {
        assert!(matches!(
            IdentityHasher::new(None),
            Err(AnalyticsError::Configuration(_))
        ));
        assert!(matches!(
            IdentityHasher::new(Some("   ")),
            Err(AnalyticsError::Configuration(_))
        ));
    }

    #[test]
    fn test_placeholder_and_short_secrets_rejected() {
        assert!(IdentityHasher::new(Some("default-salt")).is_err());
        assert!(IdentityHasher::new(Some("CHANGEME")).is_err());
        assert!(IdentityHasher::new(Some("too-short")).is_err());
    }

    #[test]
    fn test_hash_shape() {
        let hasher = IdentityHasher::new(Some(SECRET)).unwrap();
        let hash = hasher.hash("account-42");

        assert_eq!(hash.as_str().len(), 64);
        assert!(hash.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert!(!hash.as_str().contains("account"));
    }

    #[test]
    fn test_hash_depends_on_secret() {
        let a = IdentityHasher::new(Some(SECRET)).unwrap();
        let b = IdentityHasher::new(Some("another-deployment-secret-0002")).unwrap();
        assert_ne!(a.hash("account-42"), b.hash("account-42"));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let hasher = IdentityHasher::new(Some(SECRET)).unwrap();
        let rendered = format!("{hasher:?}");
        assert!(!rendered.contains(SECRET));
        assert!(rendered.contains("REDACTED"));
    }

    #[test]
    fn test_signature_round_trip_and_tamper() {
        let hasher = IdentityHasher::new(Some(SECRET)).unwrap();
        let signature = hasher.sign(b"receipt-content");

        assert!(hasher.verify_signature(b"receipt-content", &signature));
        assert!(!hasher.verify_signature(b"receipt-content!", &signature));
        assert!(!hasher.verify_signature(b"receipt-content", "not-hex"));
    }

    #[test]
    fn test_identity_and_signature_domains_are_separate() {
        let hasher = IdentityHasher::new(Some(SECRET)).unwrap();
        assert_ne!(hasher.hash("x").as_str(), hasher.sign(b"x"));
    }

    proptest! {
        #[test]
        fn prop_hash_is_deterministic(id in "[a-zA-Z0-9@._-]{1,64}") {
            let hasher = IdentityHasher::new(Some(SECRET)).unwrap();
            prop_assert_eq!(hasher.hash(&id), hasher.hash(&id));
        }

        #[test]
        fn prop_distinct_ids_do_not_collide(
            a in "[a-z0-9]{1,32}",
            b in "[a-z0-9]{1,32}",
        ) {
            prop_assume!(a != b);
            let hasher = IdentityHasher::new(Some(SECRET)).unwrap();
            prop_assert_ne!(hasher.hash(&a), hasher.hash(&b));
        }
    }
}
