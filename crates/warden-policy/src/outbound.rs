//! Outbound decision
//!
//! | Verdict | Decision |
//! |---------|----------|
//! | `allow` | [`OutboundDecision::Allow`] |
//! | `warn` | [`OutboundDecision::Warn`], content unchanged |
//! | `block`, only data-leakage, masking on, something masked | [`OutboundDecision::Masked`] |
//! | any other `block` | [`OutboundDecision::Blocked`] |
//!
//! A maskable verdict whose content has no recognisable sensitive span is
//! blocked outright: the detector saw something the masker cannot find, and
//! sending the text unredacted would defeat the check.

use serde::Serialize;
use tracing::debug;
use warden_mask::Masker;
use warden_verdict::{Action, Verdict};

use crate::messages::build_block_message;
use crate::rules::{disposition_for, Disposition};

/// What to do with an outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum OutboundDecision {
    /// Send unchanged.
    Allow,
    /// Send unchanged; the caller records the finding.
    Warn {
        /// Canonical names of the flagged categories.
        categories: Vec<String>,
    },
    /// Send the redacted text instead.
    Masked {
        /// Content with sensitive spans replaced by placeholders.
        content: String,
        /// Number of spans replaced.
        redactions: usize,
    },
    /// Send the block message instead.
    Blocked {
        /// Replacement text.
        message: String,
        /// Canonical names of the flagged categories.
        categories: Vec<String>,
    },
}

impl OutboundDecision {
    /// True unless the decision replaces the content.
    pub fn passes_through(&self) -> bool {
        matches!(self, Self::Allow | Self::Warn { .. })
    }
}

/// True when a blocked verdict may be satisfied by masking alone.
pub fn is_maskable(verdict: &Verdict, masking_enabled: bool) -> bool {
    if !masking_enabled {
        return false;
    }
    let mut threats = verdict.threat_categories().peekable();
    threats.peek().is_some()
        && threats.all(|category| disposition_for(category) == Disposition::Maskable)
}

/// Decides what happens to `content` given its `verdict`.
pub fn decide_outbound(
    content: &str,
    verdict: &Verdict,
    masker: &Masker,
    masking_enabled: bool,
) -> OutboundDecision {
    if verdict.is_safe() {
        return OutboundDecision::Allow;
    }

    match verdict.action {
        Action::Allow => OutboundDecision::Allow,
        Action::Warn => OutboundDecision::Warn {
            categories: verdict.category_names(),
        },
        Action::Block => {
            if is_maskable(verdict, masking_enabled) {
                let spans = masker.find(content);
                if !spans.is_empty() {
                    return OutboundDecision::Masked {
                        content: masker.mask(content),
                        redactions: spans.len(),
                    };
                }
                debug!(
                    scan_id = %verdict.scan_id,
                    "No maskable span found in flagged content, blocking instead"
                );
            }
            OutboundDecision::Blocked {
                message: build_block_message(verdict.categories()),
                categories: verdict.category_names(),
            }
        }
    }
}
