//! Tool gating
//!
//! Decides whether a tool call may proceed given the session's current
//! verdict. The blocked set is the union of the per-category tool lists and,
//! for any non-safe verdict, the configured high-risk tools.

use serde::Serialize;
use warden_verdict::Verdict;

use crate::rules::blocked_tools_for;

/// Result of a tool-gating check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolGate {
    /// Whether the call must be stopped.
    pub block: bool,
    /// Why, when blocked. Names the tool, the categories and the scan id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ToolGate {
    /// Let the call through.
    pub fn allow() -> Self {
        Self {
            block: false,
            reason: None,
        }
    }

    /// Stop the call.
    pub fn blocked(reason: impl Into<String>) -> Self {
        Self {
            block: true,
            reason: Some(reason.into()),
        }
    }
}

/// Checks `tool_name` against `verdict`.
///
/// Total for any tool name and any category; never panics. Names are
/// compared case-insensitively.
pub fn should_block_tool<S: AsRef<str>>(
    tool_name: &str,
    verdict: &Verdict,
    high_risk_tools: &[S],
) -> ToolGate {
    if verdict.is_safe() {
        return ToolGate::allow();
    }

    let by_category = verdict
        .categories()
        .iter()
        .any(|category| blocked_tools_for(category).iter().any(|t| t.eq_ignore_ascii_case(tool_name)));
    let by_risk = verdict.is_threat()
        && high_risk_tools
            .iter()
            .any(|t| t.as_ref().eq_ignore_ascii_case(tool_name));

    if !(by_category || by_risk) {
        return ToolGate::allow();
    }

    ToolGate::blocked(block_reason(tool_name, verdict))
}

fn block_reason(tool_name: &str, verdict: &Verdict) -> String {
    let mut triggering: Vec<String> = verdict.threat_categories().map(ToString::to_string).collect();
    if triggering.is_empty() {
        triggering = verdict.category_names();
    }
    let scan_id = if verdict.scan_id.is_empty() {
        "unknown"
    } else {
        verdict.scan_id.as_str()
    };
    format!(
        "Tool '{tool_name}' blocked by security policy: active threat [{}] (action: {}, severity: {}, scan_id: {scan_id})",
        triggering.join(", "),
        verdict.action,
        verdict.severity.as_str(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::DEFAULT_HIGH_RISK_TOOLS;
    use warden_verdict::{Action, Severity};

    #[test]
    fn test_safe_verdict_never_blocks() {
        let verdict = Verdict::safe();
        for tool in ["exec", "Bash", "web_fetch", "anything"] {
            assert!(!should_block_tool(tool, &verdict, DEFAULT_HIGH_RISK_TOOLS).block);
        }
    }

    #[test]
    fn test_category_tool_blocked() {
        let verdict =
            Verdict::from_names(Action::Block, Severity::High, ["url_filtering_prompt"]);
        let gate = should_block_tool("web_fetch", &verdict, &[] as &[&str]);
        assert!(gate.block);
    }

    #[test]
    fn test_high_risk_applies_to_any_threat() {
        let verdict = Verdict::from_names(Action::Warn, Severity::Low, ["topic-violation"]);
        assert!(should_block_tool("cron", &verdict, DEFAULT_HIGH_RISK_TOOLS).block);
        assert!(!should_block_tool("read", &verdict, DEFAULT_HIGH_RISK_TOOLS).block);
    }

    #[test]
    fn test_case_insensitive_match() {
        let verdict = Verdict::from_names(Action::Block, Severity::High, ["malicious-code"]);
        assert!(should_block_tool("EXEC", &verdict, &[] as &[&str]).block);
        assert!(should_block_tool("Apply_Patch", &verdict, &[] as &[&str]).block);
    }

    #[test]
    fn test_reason_names_tool_categories_and_scan() {
        let verdict = Verdict::from_names(Action::Block, Severity::Critical, ["prompt-injection"])
            .with_scan_id("scan-42");
        let gate = should_block_tool("Bash", &verdict, DEFAULT_HIGH_RISK_TOOLS);
        let reason = gate.reason.expect("blocked gate has a reason");
        assert!(reason.contains("'Bash'"));
        assert!(reason.contains("prompt-injection"));
        assert!(reason.contains("scan-42"));
    }

    #[test]
    fn test_warn_with_only_safe_category_still_gates_high_risk() {
        let verdict = Verdict::new(Action::Warn, Severity::Low, vec![]);
        let gate = should_block_tool("exec", &verdict, DEFAULT_HIGH_RISK_TOOLS);
        assert!(gate.block);
        assert!(gate.reason.is_some_and(|r| r.contains("[safe]")));
    }
}
