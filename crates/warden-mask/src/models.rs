//! # Core Types for the Masking Engine
//!
//! Pattern families, the spans they match and the errors raised while
//! configuring them.
//!
//! ## Replacement Contract
//!
//! Every family replaces a match with `[<LABEL> REDACTED]`. Labels are
//! uppercase words only, so a placeholder contains no digits, no `@`, no
//! dots and no token-shaped runs. That gives two guarantees the policy layer
//! relies on:
//!
//! 1. **Idempotence** - masking already-masked text is a no-op
//! 2. **Order independence** - no family's placeholder can match another
//!    family's pattern

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A family of sensitive-data patterns.
///
/// | Variant | Matches | Placeholder |
/// |---------|---------|-------------|
/// | `Ssn` | `123-45-6789` | `[SSN REDACTED]` |
/// | `CreditCard` | 13-19 digit card numbers, grouped or not | `[CREDIT CARD REDACTED]` |
/// | `Email` | `user@example.com` | `[EMAIL REDACTED]` |
/// | `ApiKey` | `sk-…`, `AKIA…`, bearer tokens, `api_key=…` | `[API KEY REDACTED]` |
/// | `PrivateIp` | RFC 1918 IPv4 addresses | `[PRIVATE IP REDACTED]` |
/// | `Phone` | North-American style phone numbers | `[PHONE REDACTED]` |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskFamily {
    /// US social security numbers.
    Ssn,
    /// Payment card numbers.
    CreditCard,
    /// Email addresses.
    Email,
    /// Credential-looking tokens.
    ApiKey,
    /// Private network (RFC 1918) IPv4 addresses.
    PrivateIp,
    /// Phone numbers.
    Phone,
}

impl MaskFamily {
    /// Every family, in application order.
    pub const ALL: [MaskFamily; 6] = [
        MaskFamily::ApiKey,
        MaskFamily::Email,
        MaskFamily::CreditCard,
        MaskFamily::Ssn,
        MaskFamily::PrivateIp,
        MaskFamily::Phone,
    ];

    /// Placeholder written in place of a match.
    pub fn placeholder(&self) -> &'static str {
        match self {
            Self::Ssn => "[SSN REDACTED]",
            Self::CreditCard => "[CREDIT CARD REDACTED]",
            Self::Email => "[EMAIL REDACTED]",
            Self::ApiKey => "[API KEY REDACTED]",
            Self::PrivateIp => "[PRIVATE IP REDACTED]",
            Self::Phone => "[PHONE REDACTED]",
        }
    }

    /// snake_case name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ssn => "ssn",
            Self::CreditCard => "credit_card",
            Self::Email => "email",
            Self::ApiKey => "api_key",
            Self::PrivateIp => "private_ip",
            Self::Phone => "phone",
        }
    }
}

impl fmt::Display for MaskFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MaskFamily {
    type Err = MaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "ssn" => Ok(Self::Ssn),
            "credit_card" | "card" => Ok(Self::CreditCard),
            "email" => Ok(Self::Email),
            "api_key" | "credential" | "token" => Ok(Self::ApiKey),
            "private_ip" | "ip" => Ok(Self::PrivateIp),
            "phone" => Ok(Self::Phone),
            other => Err(MaskError::UnknownFamily(other.to_string())),
        }
    }
}

/// A span matched by one family, by byte offset into the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskedSpan {
    /// Family that matched.
    pub family: MaskFamily,
    /// Start offset (inclusive).
    pub start: usize,
    /// End offset (exclusive).
    pub end: usize,
}

/// Errors raised while configuring the masking engine.
#[derive(Debug, Error)]
pub enum MaskError {
    /// A family name did not match any known family.
    #[error("Unknown mask family: {0}")]
    UnknownFamily(String),
}
