//! Conversion from the detection service's raw response into a [`Verdict`].
//!
//! The service answers with a coarse `category` (`benign`, `suspicious`,
//! `malicious`), an `action` (`allow`, `alert`, `block`) and two sets of
//! per-detector flags, one for the prompt and one for the response. The
//! flags are what tell us *which* threat was found, so categories are built
//! from them first and only fall back to the coarse category when no flag
//! fired.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::category::ThreatCategory;
use crate::verdict::{Action, DetectedSpan, Severity, Verdict};

/// Detector flags for the prompt side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptDetected {
    /// Prompt injection.
    pub injection: bool,
    /// Sensitive data in the prompt.
    pub dlp: bool,
    /// Disallowed URL categories.
    pub url_cats: bool,
    /// Toxic language.
    pub toxic_content: bool,
    /// Malicious code.
    pub malicious_code: bool,
    /// Attempts to manipulate the agent's tools or memory.
    pub agent: bool,
    /// Off-topic request per the detection profile.
    pub topic_violation: bool,
}

/// Detector flags for the response side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseDetected {
    /// Sensitive data in the response.
    pub dlp: bool,
    /// Disallowed URL categories.
    pub url_cats: bool,
    /// Dangerous database statements.
    pub db_security: bool,
    /// Claims not supported by the supplied context.
    pub ungrounded: bool,
    /// Toxic language.
    pub toxic_content: bool,
    /// Malicious code.
    pub malicious_code: bool,
    /// Agent manipulation.
    pub agent: bool,
    /// Off-topic answer per the detection profile.
    pub topic_violation: bool,
}

/// Raw response body of a synchronous scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawDetection {
    /// Service-assigned scan id.
    pub scan_id: String,
    /// Id of the detailed report for this scan.
    pub report_id: String,
    /// Detection profile that was applied.
    pub profile_name: Option<String>,
    /// `benign`, `suspicious` or `malicious`.
    pub category: Option<String>,
    /// `allow`, `alert` or `block`.
    pub action: Option<String>,
    /// Prompt-side detector flags.
    pub prompt_detected: Option<PromptDetected>,
    /// Response-side detector flags.
    pub response_detected: Option<ResponseDetected>,
    /// Transaction id echoed by the service; overrides the one we sent.
    pub tr_id: Option<String>,
    /// Session the scan was attributed to.
    pub session_id: Option<String>,
    /// Set when the service stopped waiting on one or more detectors.
    pub timeout: bool,
    /// Offsets of flagged spans, when reported.
    pub masked_spans: Vec<DetectedSpan>,
}

impl RawDetection {
    /// Parses a raw JSON response body.
    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }
}

impl PromptDetected {
    fn flags(&self) -> [(&'static str, bool); 7] {
        [
            ("injection", self.injection),
            ("dlp", self.dlp),
            ("url_cats", self.url_cats),
            ("toxic_content", self.toxic_content),
            ("malicious_code", self.malicious_code),
            ("agent", self.agent),
            ("topic_violation", self.topic_violation),
        ]
    }
}

impl ResponseDetected {
    fn flags(&self) -> [(&'static str, bool); 8] {
        [
            ("dlp", self.dlp),
            ("url_cats", self.url_cats),
            ("db_security", self.db_security),
            ("ungrounded", self.ungrounded),
            ("toxic_content", self.toxic_content),
            ("malicious_code", self.malicious_code),
            ("agent", self.agent),
            ("topic_violation", self.topic_violation),
        ]
    }
}

impl Verdict {
    /// Builds a verdict from a raw detection response.
    ///
    /// - categories: one per raised flag, prompt flags before response
    ///   flags and each side in detector order (injection, dlp, url, ...),
    ///   named `<flag>_prompt` / `<flag>_response` and normalised through
    ///   the alias table; when no
    ///   flag fired, `[safe]` for a benign response or the coarse category
    ///   otherwise
    /// - severity: `CRITICAL` for malicious or block, `HIGH` for suspicious,
    ///   `MEDIUM` when any flag fired, else `SAFE`
    /// - action: `block` → block, `alert` → warn, anything else → allow
    pub fn from_detection(raw: RawDetection, latency_ms: u64) -> Self {
        let coarse = raw
            .category
            .as_deref()
            .unwrap_or("benign")
            .trim()
            .to_ascii_lowercase();
        let action_str = raw
            .action
            .as_deref()
            .unwrap_or("allow")
            .trim()
            .to_ascii_lowercase();

        let prompt_flags: Vec<(&'static str, bool)> = raw
            .prompt_detected
            .as_ref()
            .map(|pd| pd.flags().to_vec())
            .unwrap_or_default();
        let response_flags: Vec<(&'static str, bool)> = raw
            .response_detected
            .as_ref()
            .map(|rd| rd.flags().to_vec())
            .unwrap_or_default();

        // Category order follows the detector order above.
        let mut categories: Vec<ThreatCategory> = prompt_flags
            .iter()
            .filter(|(_, raised)| *raised)
            .map(|(flag, _)| prompt_category(flag))
            .collect();
        categories.extend(
            response_flags
                .iter()
                .filter(|(_, raised)| *raised)
                .map(|(flag, _)| ThreatCategory::parse(&format!("{flag}_response"))),
        );
        if categories.is_empty() {
            let fallback = if coarse == "benign" {
                ThreatCategory::safe()
            } else {
                ThreatCategory::parse(&coarse)
            };
            categories.push(fallback);
        }

        let any_flag = prompt_flags
            .iter()
            .chain(&response_flags)
            .any(|(_, raised)| *raised);
        let severity = if coarse == "malicious" || action_str == "block" {
            Severity::Critical
        } else if coarse == "suspicious" {
            Severity::High
        } else if any_flag {
            Severity::Medium
        } else {
            Severity::Safe
        };

        let action = match action_str.as_str() {
            "block" => Action::Block,
            "alert" | "warn" => Action::Warn,
            _ => Action::Allow,
        };

        let mut verdict = Verdict::new(action, severity, categories)
            .with_scan_id(raw.scan_id)
            .with_report_id(raw.report_id)
            .with_latency_ms(latency_ms)
            .with_timed_out(raw.timeout);
        verdict.profile_name = raw.profile_name;
        verdict.session_id = raw.session_id;
        verdict.correlation_id = raw.tr_id;
        verdict.prompt_detected = flag_map(&prompt_flags);
        verdict.response_detected = flag_map(&response_flags);
        verdict.detected_spans = raw.masked_spans;
        verdict
    }
}

fn flag_map(flags: &[(&'static str, bool)]) -> BTreeMap<String, bool> {
    flags
        .iter()
        .map(|(flag, raised)| (flag.to_string(), *raised))
        .collect()
}

/// Prompt-side flags map to `<flag>_prompt`, except injection which is
/// directionless.
fn prompt_category(flag: &str) -> ThreatCategory {
    if flag == "injection" {
        ThreatCategory::parse("prompt_injection")
    } else {
        ThreatCategory::parse(&format!("{flag}_prompt"))
    }
}
