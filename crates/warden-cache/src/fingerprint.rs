//! Content fingerprints.
//!
//! A fingerprint identifies *which* message a cached verdict was computed
//! for. It is a staleness guard, not a security boundary: it only has to be
//! deterministic and unlikely to collide for short human-written text.

use sha2::{Digest, Sha256};
use std::fmt;

/// Short deterministic digest of scanned text (first 64 bits of SHA-256, hex).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprints `text`.
    pub fn of(text: &str) -> Self {
        let digest = Sha256::digest(text.as_bytes());
        Self(digest[..8].iter().map(|b| format!("{b:02x}")).collect())
    }

    /// Wraps an already computed fingerprint value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Hex value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
