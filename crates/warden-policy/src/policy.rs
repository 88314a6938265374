//! The enforcement policy facade.

use tracing::{debug, info};
use warden_mask::Masker;
use warden_verdict::Verdict;

use crate::gate::{should_block_tool, ToolGate};
use crate::messages::build_context_warning;
use crate::outbound::{decide_outbound, OutboundDecision};
use crate::rules::DEFAULT_HIGH_RISK_TOOLS;

/// Enforcement policy: the configured high-risk tools plus the masking setup.
///
/// # Example
///
/// ```rust
/// use warden_policy::EnforcementPolicy;
/// use warden_verdict::{Action, Severity, Verdict};
///
/// let policy = EnforcementPolicy::new();
/// let verdict = Verdict::from_names(Action::Block, Severity::Critical, ["prompt-injection"]);
///
/// assert!(policy.check_tool("Bash", &verdict).block);
/// assert!(!policy.check_tool("Bash", &Verdict::safe()).block);
/// ```
pub struct EnforcementPolicy {
    high_risk_tools: Vec<String>,
    masking_enabled: bool,
    masker: Masker,
}

impl Default for EnforcementPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl EnforcementPolicy {
    /// Default high-risk tools, masking enabled with every family.
    pub fn new() -> Self {
        Self {
            high_risk_tools: DEFAULT_HIGH_RISK_TOOLS.iter().map(|t| t.to_string()).collect(),
            masking_enabled: true,
            masker: Masker::all(),
        }
    }

    /// Replaces the high-risk tool list.
    #[must_use]
    pub fn with_high_risk_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.high_risk_tools = tools.into_iter().map(Into::into).collect();
        self
    }

    /// Enables or disables masking of data-leakage blocks.
    #[must_use]
    pub fn with_masking(mut self, enabled: bool) -> Self {
        self.masking_enabled = enabled;
        self
    }

    /// Uses a custom masker.
    #[must_use]
    pub fn with_masker(mut self, masker: Masker) -> Self {
        self.masker = masker;
        self
    }

    /// Configured high-risk tools.
    pub fn high_risk_tools(&self) -> &[String] {
        &self.high_risk_tools
    }

    /// Whether data-leakage blocks may be masked.
    pub fn masking_enabled(&self) -> bool {
        self.masking_enabled
    }

    /// Tool gating against the configured high-risk list.
    pub fn check_tool(&self, tool_name: &str, verdict: &Verdict) -> ToolGate {
        let gate = should_block_tool(tool_name, verdict, &self.high_risk_tools);
        if gate.block {
            info!(
                tool = %tool_name,
                scan_id = %verdict.scan_id,
                categories = ?verdict.category_names(),
                "Blocking tool call"
            );
        } else {
            debug!(tool = %tool_name, "Tool call allowed");
        }
        gate
    }

    /// Outbound decision with the configured masker.
    pub fn check_outbound(&self, content: &str, verdict: &Verdict) -> OutboundDecision {
        decide_outbound(content, verdict, &self.masker, self.masking_enabled)
    }

    /// Context warning for a non-safe verdict, `None` for a safe one.
    pub fn context_warning(&self, verdict: &Verdict) -> Option<String> {
        if verdict.is_safe() {
            None
        } else {
            Some(build_context_warning(verdict))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_verdict::{Action, Severity};

    #[test]
    fn test_custom_high_risk_list() {
        let policy = EnforcementPolicy::new().with_high_risk_tools(["deploy"]);
        let verdict = Verdict::from_names(Action::Warn, Severity::Low, ["topic-violation"]);
        assert!(policy.check_tool("deploy", &verdict).block);
        assert!(!policy.check_tool("cron", &verdict).block);
    }

    #[test]
    fn test_masking_toggle() {
        let verdict = Verdict::from_names(Action::Block, Severity::High, ["dlp_response"]);
        let on = EnforcementPolicy::new().check_outbound("mail jane@example.com", &verdict);
        let off = EnforcementPolicy::new()
            .with_masking(false)
            .check_outbound("mail jane@example.com", &verdict);
        assert!(matches!(on, OutboundDecision::Masked { .. }));
        assert!(matches!(off, OutboundDecision::Blocked { .. }));
    }

    #[test]
    fn test_context_warning_only_for_threats() {
        let policy = EnforcementPolicy::new();
        assert!(policy.context_warning(&Verdict::safe()).is_none());
        let verdict = Verdict::from_names(Action::Block, Severity::High, ["injection"]);
        assert!(policy.context_warning(&verdict).is_some());
    }
}
