//! # Warden Mask - Sensitive Span Redaction
//!
//! Replaces sensitive spans in outbound text with category placeholders such
//! as `[SSN REDACTED]`. The policy layer calls it when a blocked verdict is
//! made up entirely of data-leakage categories; the engine itself has no
//! knowledge of verdicts.
//!
//! ## Pattern Families
//!
//! | Family | Example | Placeholder |
//! |--------|---------|-------------|
//! | SSN | `123-45-6789` | `[SSN REDACTED]` |
//! | Credit card | `4111 1111 1111 1111` | `[CREDIT CARD REDACTED]` |
//! | Email | `jane@example.com` | `[EMAIL REDACTED]` |
//! | API key | `sk-…`, `AKIA…`, `Bearer …` | `[API KEY REDACTED]` |
//! | Private IP | `10.0.0.7` | `[PRIVATE IP REDACTED]` |
//! | Phone | `(555) 123-4567` | `[PHONE REDACTED]` |
//!
//! ## Guarantees
//!
//! - **Idempotent**: `mask(mask(x)) == mask(x)`
//! - **Order independent**: families are matched on the original text and
//!   overlaps are resolved before replacement
//!
//! ## Usage
//!
//! ```rust
//! use warden_mask::{Masker, MaskFamily};
//!
//! let masker = Masker::new(&[MaskFamily::Ssn, MaskFamily::Email]);
//! let masked = masker.mask("SSN 123-45-6789, mail jane@example.com");
//! assert_eq!(masked, "SSN [SSN REDACTED], mail [EMAIL REDACTED]");
//! ```

pub mod masker;
pub mod models;

pub use masker::{mask, Masker};
pub use models::{MaskError, MaskFamily, MaskedSpan};
