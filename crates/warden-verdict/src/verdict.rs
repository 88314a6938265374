//! Verdict types produced by the detection service.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::category::{CategoryFamily, ThreatCategory};

/// What the detection service recommends doing with the scanned text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Let the text through.
    Allow,
    /// Let the text through but record the finding.
    Warn,
    /// Stop the text.
    Block,
}

impl Action {
    /// Parses the collaborator's action string. `alert` is an alias for warn.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "allow" => Some(Self::Allow),
            "warn" | "alert" => Some(Self::Warn),
            "block" => Some(Self::Block),
            _ => None,
        }
    }

    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Warn => "warn",
            Self::Block => "block",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Risk level of a verdict. Ordered from least to most risky.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Nothing found.
    Safe,
    /// Minor finding.
    Low,
    /// Detection flags raised.
    Medium,
    /// Suspicious content.
    High,
    /// Malicious content or an explicit block.
    Critical,
}

impl Severity {
    /// Uppercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Safe => "SAFE",
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }

    /// Parses a severity name, case-insensitively.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "SAFE" => Some(Self::Safe),
            "LOW" => Some(Self::Low),
            "MEDIUM" => Some(Self::Medium),
            "HIGH" => Some(Self::High),
            "CRITICAL" => Some(Self::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A span the detection service flagged, by byte offset into the scanned text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedSpan {
    /// Start offset (inclusive).
    pub start: usize,
    /// End offset (exclusive).
    pub end: usize,
    /// Collaborator-defined kind (e.g. "ssn").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// Structured result of scanning text for threats.
///
/// `categories` is never empty: a scan that found nothing carries exactly
/// `[safe]`. Constructors and deserialisation both enforce this, and
/// duplicate categories are dropped while preserving first-seen order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    /// Recommended action.
    pub action: Action,

    /// Risk level.
    pub severity: Severity,

    #[serde(deserialize_with = "deserialize_categories")]
    categories: Vec<ThreatCategory>,

    /// Collaborator scan identifier, for audit correlation.
    #[serde(default)]
    pub scan_id: String,

    /// Collaborator report identifier.
    #[serde(default)]
    pub report_id: String,

    /// Detection profile the scan ran under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_name: Option<String>,

    /// Session the scan belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Transaction id pairing a prompt scan with its response scan.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,

    /// Per-detector flags for the prompt side.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub prompt_detected: BTreeMap<String, bool>,

    /// Per-detector flags for the response side.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub response_detected: BTreeMap<String, bool>,

    /// Flagged spans, when the collaborator reports them.
    #[serde(default, alias = "masked_spans", skip_serializing_if = "Vec::is_empty")]
    pub detected_spans: Vec<DetectedSpan>,

    /// Round-trip latency of the scan call.
    #[serde(default)]
    pub latency_ms: u64,

    /// The collaborator gave up before every detector finished.
    #[serde(default)]
    pub timed_out: bool,

    /// Error text when this verdict stands in for a failed scan.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn normalize_categories(categories: Vec<ThreatCategory>) -> Vec<ThreatCategory> {
    let mut out: Vec<ThreatCategory> = Vec::with_capacity(categories.len());
    for category in categories {
        if !out.contains(&category) {
            out.push(category);
        }
    }
    if out.is_empty() {
        out.push(ThreatCategory::safe());
    }
    out
}

fn deserialize_categories<'de, D>(deserializer: D) -> Result<Vec<ThreatCategory>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<ThreatCategory>::deserialize(deserializer)?;
    Ok(normalize_categories(raw))
}

impl Verdict {
    /// Creates a verdict. An empty category list becomes `[safe]`.
    pub fn new(action: Action, severity: Severity, categories: Vec<ThreatCategory>) -> Self {
        Self {
            action,
            severity,
            categories: normalize_categories(categories),
            scan_id: String::new(),
            report_id: String::new(),
            profile_name: None,
            session_id: None,
            correlation_id: None,
            prompt_detected: BTreeMap::new(),
            response_detected: BTreeMap::new(),
            detected_spans: Vec::new(),
            latency_ms: 0,
            timed_out: false,
            error: None,
        }
    }

    /// An uneventful scan: `allow`, `SAFE`, `[safe]`.
    pub fn safe() -> Self {
        Self::new(Action::Allow, Severity::Safe, vec![ThreatCategory::safe()])
    }

    /// The conservative stand-in for a failed scan under fail-closed:
    /// `block`, `CRITICAL`, `[scan-failure]`.
    pub fn scan_failure(error: impl Into<String>) -> Self {
        let mut verdict = Self::new(
            Action::Block,
            Severity::Critical,
            vec![ThreatCategory::scan_failure()],
        );
        verdict.error = Some(error.into());
        verdict
    }

    /// Builds a verdict from category names in any accepted spelling.
    pub fn from_names<I, S>(action: Action, severity: Severity, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let categories = names
            .into_iter()
            .map(|name| ThreatCategory::parse(name.as_ref()))
            .collect();
        Self::new(action, severity, categories)
    }

    /// Sets the scan id.
    pub fn with_scan_id(mut self, scan_id: impl Into<String>) -> Self {
        self.scan_id = scan_id.into();
        self
    }

    /// Sets the report id.
    pub fn with_report_id(mut self, report_id: impl Into<String>) -> Self {
        self.report_id = report_id.into();
        self
    }

    /// Sets the session id.
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Sets the correlation (transaction) id.
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Sets the measured latency.
    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    /// Marks the scan as timed out.
    pub fn with_timed_out(mut self, timed_out: bool) -> Self {
        self.timed_out = timed_out;
        self
    }

    /// Categories in first-seen order. Never empty.
    pub fn categories(&self) -> &[ThreatCategory] {
        &self.categories
    }

    /// Canonical names of the categories.
    pub fn category_names(&self) -> Vec<String> {
        self.categories.iter().map(ToString::to_string).collect()
    }

    /// True when any category belongs to `family`.
    pub fn has_family(&self, family: &CategoryFamily) -> bool {
        self.categories.iter().any(|c| c.family() == family)
    }

    /// `allow` with exactly `[safe]`.
    pub fn is_safe(&self) -> bool {
        self.action == Action::Allow && self.categories.len() == 1 && self.categories[0].is_safe()
    }

    /// Any non-safe condition: action warn/block, or a category other than safe.
    pub fn is_threat(&self) -> bool {
        self.action != Action::Allow || self.categories.iter().any(|c| !c.is_safe())
    }

    /// Non-safe categories only.
    pub fn threat_categories(&self) -> impl Iterator<Item = &ThreatCategory> {
        self.categories.iter().filter(|c| !c.is_safe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_verdict() {
        let verdict = Verdict::safe();
        assert!(verdict.is_safe());
        assert!(!verdict.is_threat());
        assert_eq!(verdict.category_names(), vec!["safe"]);
    }

    #[test]
    fn test_empty_categories_become_safe() {
        let verdict = Verdict::new(Action::Allow, Severity::Safe, Vec::new());
        assert_eq!(verdict.categories().len(), 1);
        assert!(verdict.categories()[0].is_safe());
    }

    #[test]
    fn test_duplicate_spellings_collapse() {
        let verdict = Verdict::from_names(
            Action::Block,
            Severity::High,
            ["dlp_response", "data-leakage-in-output", "prompt_injection"],
        );
        assert_eq!(
            verdict.category_names(),
            vec!["data-leakage-in-output", "prompt-injection"]
        );
    }

    #[test]
    fn test_warn_with_safe_category_is_threat() {
        let verdict = Verdict::from_names(Action::Warn, Severity::Low, ["safe"]);
        assert!(verdict.is_threat());
        assert!(!verdict.is_safe());
    }

    #[test]
    fn test_scan_failure_verdict() {
        let verdict = Verdict::scan_failure("connection refused");
        assert_eq!(verdict.action, Action::Block);
        assert_eq!(verdict.severity, Severity::Critical);
        assert!(verdict.has_family(&CategoryFamily::ScanFailure));
        assert_eq!(verdict.error.as_deref(), Some("connection refused"));
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Safe < Severity::Low);
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn test_action_alert_alias() {
        assert_eq!(Action::parse("alert"), Some(Action::Warn));
        assert_eq!(Action::parse("BLOCK"), Some(Action::Block));
        assert_eq!(Action::parse("quarantine"), None);
    }

    #[test]
    fn test_deserialize_normalises_categories() {
        let json = r#"{"action":"block","severity":"CRITICAL","categories":[]}"#;
        let verdict: Verdict = serde_json::from_str(json).unwrap();
        assert_eq!(verdict.category_names(), vec!["safe"]);
        assert_eq!(verdict.severity, Severity::Critical);
    }
}
