//! # Threat Category Vocabulary
//!
//! The detection service reports categories as free-form strings whose
//! spelling is not stable across category families: the same threat may
//! arrive as `dlp_response`, `data-leakage-output` or
//! `data_leakage_in_output`. This module is the single place that absorbs
//! that variance.
//!
//! A [`ThreatCategory`] is a closed [`CategoryFamily`] plus a [`Direction`].
//! Anything the alias table does not recognise becomes
//! [`CategoryFamily::Unknown`] carrying the normalised raw name, so that the
//! policy layer can still apply its conservative default.
//!
//! ## Normalisation
//!
//! | Step | Example |
//! |------|---------|
//! | trim + lowercase | `" DLP_Response "` → `"dlp_response"` |
//! | `_` → `-` | `"dlp_response"` → `"dlp-response"` |
//! | exact alias lookup | `"prompt-injection"` → `PromptInjection` |
//! | suffix split | `"dlp-response"` → (`"dlp"`, `Output`) |
//! | stem alias lookup | `"dlp"` → `DataLeakage` |
//!
//! Parsing is infallible. Display always yields the canonical hyphenated
//! name, and parsing a canonical name returns the same category.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Family of a threat category, independent of the direction it was seen in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CategoryFamily {
    /// Nothing detected.
    Safe,
    /// Attempt to override the agent's instructions.
    PromptInjection,
    /// Sensitive data (PII, credentials, secrets) in the text.
    DataLeakage,
    /// URL in a disallowed or malicious URL category.
    DisallowedUrl,
    /// Toxic, abusive or hateful content.
    ToxicContent,
    /// Malicious code or payloads.
    MaliciousCode,
    /// Attempt to manipulate the agent's tools or memory.
    AgentManipulation,
    /// SQL injection or other database-targeted attack.
    DatabaseAttack,
    /// Response not grounded in the provided context.
    Ungrounded,
    /// Topic guardrail violation.
    TopicViolation,
    /// Synthesized locally when a scan failed and fail-closed is active.
    ScanFailure,
    /// Reported when a scan errored but the request was let through.
    ScanError,
    /// Anything the alias table does not recognise (normalised raw name).
    Unknown(String),
}

impl CategoryFamily {
    /// Canonical hyphenated stem for this family.
    pub fn stem(&self) -> &str {
        match self {
            Self::Safe => "safe",
            Self::PromptInjection => "prompt-injection",
            Self::DataLeakage => "data-leakage",
            Self::DisallowedUrl => "disallowed-url",
            Self::ToxicContent => "toxic-content",
            Self::MaliciousCode => "malicious-code",
            Self::AgentManipulation => "agent-manipulation",
            Self::DatabaseAttack => "database-attack",
            Self::Ungrounded => "ungrounded",
            Self::TopicViolation => "topic-policy-violation",
            Self::ScanFailure => "scan-failure",
            Self::ScanError => "scan-error",
            Self::Unknown(raw) => raw,
        }
    }

    /// Families that carry no direction suffix.
    fn is_directionless(&self) -> bool {
        matches!(
            self,
            Self::Safe | Self::PromptInjection | Self::ScanFailure | Self::ScanError | Self::Unknown(_)
        )
    }
}

/// Which side of the conversation the threat was detected in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    /// Detected in the prompt / inbound text.
    Input,
    /// Detected in the response / outbound text.
    Output,
    /// The collaborator did not say.
    Unspecified,
}

/// A normalised threat category.
///
/// Serialises as its canonical string and deserialises from any spelling
/// the alias table accepts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ThreatCategory {
    family: CategoryFamily,
    direction: Direction,
}

/// Alias table: (alias, family, implied direction).
///
/// Entries are matched against the normalised full name first and then
/// against the stem left after stripping a direction suffix.
const ALIASES: &[(&str, Family, Option<Direction>)] = &[
    ("safe", Family::Safe, None),
    ("benign", Family::Safe, None),
    ("prompt-injection", Family::PromptInjection, Some(Direction::Input)),
    ("injection", Family::PromptInjection, Some(Direction::Input)),
    ("data-leakage", Family::DataLeakage, None),
    ("dlp", Family::DataLeakage, None),
    ("data-leak", Family::DataLeakage, None),
    ("sensitive-data", Family::DataLeakage, None),
    ("disallowed-url", Family::DisallowedUrl, None),
    ("url-filtering", Family::DisallowedUrl, None),
    ("url-cats", Family::DisallowedUrl, None),
    ("malicious-url", Family::DisallowedUrl, None),
    ("toxic-content", Family::ToxicContent, None),
    ("toxicity", Family::ToxicContent, None),
    ("toxic", Family::ToxicContent, None),
    ("malicious-code", Family::MaliciousCode, None),
    ("malware", Family::MaliciousCode, None),
    ("agent-manipulation", Family::AgentManipulation, None),
    ("agent-threat", Family::AgentManipulation, None),
    ("agent", Family::AgentManipulation, None),
    ("database-attack", Family::DatabaseAttack, Some(Direction::Output)),
    ("db-security", Family::DatabaseAttack, Some(Direction::Output)),
    ("sql-injection", Family::DatabaseAttack, Some(Direction::Output)),
    ("ungrounded", Family::Ungrounded, Some(Direction::Output)),
    ("topic-policy-violation", Family::TopicViolation, None),
    ("topic-violation", Family::TopicViolation, None),
    ("topic-guardrails", Family::TopicViolation, None),
    ("scan-failure", Family::ScanFailure, None),
    ("scan-error", Family::ScanError, None),
    ("api-error", Family::ScanError, None),
];

/// Direction suffixes, longest first so `-in-output` wins over `-output`.
const SUFFIXES: &[(&str, Direction)] = &[
    ("-in-response", Direction::Output),
    ("-in-output", Direction::Output),
    ("-in-prompt", Direction::Input),
    ("-in-input", Direction::Input),
    ("-response", Direction::Output),
    ("-output", Direction::Output),
    ("-prompt", Direction::Input),
    ("-input", Direction::Input),
];

/// Data-free mirror of [`CategoryFamily`] usable in a `const` table.
#[derive(Debug, Clone, Copy)]
enum Family {
    Safe,
    PromptInjection,
    DataLeakage,
    DisallowedUrl,
    ToxicContent,
    MaliciousCode,
    AgentManipulation,
    DatabaseAttack,
    Ungrounded,
    TopicViolation,
    ScanFailure,
    ScanError,
}

impl From<Family> for CategoryFamily {
    fn from(family: Family) -> Self {
        match family {
            Family::Safe => Self::Safe,
            Family::PromptInjection => Self::PromptInjection,
            Family::DataLeakage => Self::DataLeakage,
            Family::DisallowedUrl => Self::DisallowedUrl,
            Family::ToxicContent => Self::ToxicContent,
            Family::MaliciousCode => Self::MaliciousCode,
            Family::AgentManipulation => Self::AgentManipulation,
            Family::DatabaseAttack => Self::DatabaseAttack,
            Family::Ungrounded => Self::Ungrounded,
            Family::TopicViolation => Self::TopicViolation,
            Family::ScanFailure => Self::ScanFailure,
            Family::ScanError => Self::ScanError,
        }
    }
}

fn lookup_alias(name: &str) -> Option<(CategoryFamily, Option<Direction>)> {
    ALIASES
        .iter()
        .find(|(alias, _, _)| *alias == name)
        .map(|(_, family, direction)| ((*family).into(), *direction))
}

impl ThreatCategory {
    /// Builds a category from its parts.
    ///
    /// Directionless families (safe, prompt-injection, scan-failure,
    /// scan-error, unknown) ignore the requested direction.
    pub fn new(family: CategoryFamily, direction: Direction) -> Self {
        let direction = if family.is_directionless() {
            Direction::Unspecified
        } else {
            direction
        };
        Self { family, direction }
    }

    /// Parses any known spelling of a category. Never fails.
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_ascii_lowercase().replace('_', "-");

        if let Some((family, implied)) = lookup_alias(&normalized) {
            return Self::new(family, implied.unwrap_or(Direction::Unspecified));
        }

        for (suffix, direction) in SUFFIXES {
            if let Some(stem) = normalized.strip_suffix(suffix) {
                if let Some((family, _)) = lookup_alias(stem) {
                    return Self::new(family, *direction);
                }
            }
        }

        Self::new(CategoryFamily::Unknown(normalized), Direction::Unspecified)
    }

    /// The `safe` category.
    pub fn safe() -> Self {
        Self::new(CategoryFamily::Safe, Direction::Unspecified)
    }

    /// The locally synthesized `scan-failure` category.
    pub fn scan_failure() -> Self {
        Self::new(CategoryFamily::ScanFailure, Direction::Unspecified)
    }

    /// The `scan-error` category.
    pub fn scan_error() -> Self {
        Self::new(CategoryFamily::ScanError, Direction::Unspecified)
    }

    /// Category family.
    pub fn family(&self) -> &CategoryFamily {
        &self.family
    }

    /// Direction the threat was seen in.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// True for the `safe` category.
    pub fn is_safe(&self) -> bool {
        self.family == CategoryFamily::Safe
    }

    /// True when the alias table did not recognise the name.
    pub fn is_unknown(&self) -> bool {
        matches!(self.family, CategoryFamily::Unknown(_))
    }

    /// Canonical hyphenated name.
    pub fn canonical_name(&self) -> String {
        let stem = self.family.stem();
        match (&self.family, self.direction) {
            (_, Direction::Unspecified) => stem.to_string(),
            (CategoryFamily::Ungrounded, Direction::Output) => "ungrounded-output".to_string(),
            (_, Direction::Input) => format!("{stem}-in-input"),
            (_, Direction::Output) => format!("{stem}-in-output"),
        }
    }

    /// Every category the detection service is documented to produce.
    pub fn vocabulary() -> Vec<ThreatCategory> {
        use CategoryFamily as F;
        use Direction::{Input, Output, Unspecified};
        vec![
            Self::new(F::Safe, Unspecified),
            Self::new(F::PromptInjection, Unspecified),
            Self::new(F::DataLeakage, Input),
            Self::new(F::DataLeakage, Output),
            Self::new(F::DisallowedUrl, Input),
            Self::new(F::DisallowedUrl, Output),
            Self::new(F::ToxicContent, Input),
            Self::new(F::ToxicContent, Output),
            Self::new(F::MaliciousCode, Input),
            Self::new(F::MaliciousCode, Output),
            Self::new(F::AgentManipulation, Input),
            Self::new(F::AgentManipulation, Output),
            Self::new(F::DatabaseAttack, Output),
            Self::new(F::Ungrounded, Output),
            Self::new(F::TopicViolation, Input),
            Self::new(F::TopicViolation, Output),
            Self::new(F::ScanFailure, Unspecified),
            Self::new(F::ScanError, Unspecified),
        ]
    }
}

impl fmt::Display for ThreatCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical_name())
    }
}

impl From<String> for ThreatCategory {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<&str> for ThreatCategory {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl From<ThreatCategory> for String {
    fn from(category: ThreatCategory) -> Self {
        category.canonical_name()
    }
}
