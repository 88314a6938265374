//! # Warden Verdict
//!
//! The data model every Warden component agrees on: the [`Verdict`] the
//! external detection service produces, and the [`ThreatCategory`]
//! vocabulary it reports threats in.
//!
//! ## Threat Vocabulary
//!
//! | Family | Directions | Disposition on outbound block |
//! |--------|------------|-------------------------------|
//! | prompt-injection | - | always block |
//! | data-leakage | input, output | maskable |
//! | disallowed-url | input, output | always block |
//! | toxic-content | input, output | always block |
//! | malicious-code | input, output | always block |
//! | agent-manipulation | input, output | always block |
//! | database-attack | output | always block |
//! | ungrounded | output | block |
//! | topic-policy-violation | input, output | block |
//! | scan-failure | - | always block |
//! | scan-error | - | block |
//!
//! Category names arrive in several spellings (`dlp_response`,
//! `data-leakage-output`, `data_leakage_in_output`). They are normalised once,
//! at this boundary, by [`ThreatCategory::parse`].
//!
//! ## Usage
//!
//! ```rust
//! use warden_verdict::{Action, Severity, Verdict};
//!
//! let verdict = Verdict::from_names(Action::Block, Severity::Critical, ["prompt_injection"]);
//! assert!(verdict.is_threat());
//! assert_eq!(verdict.category_names(), vec!["prompt-injection"]);
//! ```

mod category;
mod detection;
mod verdict;

pub use category::{CategoryFamily, Direction, ThreatCategory};
pub use detection::{PromptDetected, RawDetection, ResponseDetected};
pub use verdict::{Action, DetectedSpan, Severity, Verdict};
