//! # Warden Policy - Verdict to Action Mapping
//!
//! Turns a [`Verdict`](warden_verdict::Verdict) into concrete decisions:
//! which tools to block, whether an outbound message is sent, masked or
//! replaced, and what the agent is told about the threat.
//!
//! ## Decision Surface
//!
//! | Question | Function |
//! |----------|----------|
//! | May this tool run? | [`should_block_tool`] / [`EnforcementPolicy::check_tool`] |
//! | May this message be sent? | [`decide_outbound`] / [`EnforcementPolicy::check_outbound`] |
//! | What should the agent be told? | [`build_context_warning`] |
//! | What does the user see instead? | [`build_block_message`] |
//!
//! ## Rule Table
//!
//! Every [`CategoryFamily`](warden_verdict::CategoryFamily) maps to exactly
//! one [`EnforcementRule`]: a tool list, an instruction, a label and an
//! outbound [`Disposition`]. Categories the vocabulary does not know fall
//! back to [`DEFAULT_BLOCK_TOOLS`].
//!
//! | Disposition | Families |
//! |-------------|----------|
//! | Maskable | data leakage |
//! | Always block | prompt injection, malicious code, malicious URL, toxic content, agent manipulation, database attack, scan failure |
//! | Neutral | safe, ungrounded, topic violation, scan error, unknown |
//!
//! ## Security Notes
//!
//! - `allow` with exactly `[safe]` never blocks a tool and never alters content
//! - Any other verdict also blocks the configured high-risk tools
//! - A single always-block category rules out masking for the whole message
//! - Block messages never quote the flagged content

pub mod gate;
pub mod messages;
pub mod outbound;
pub mod policy;
pub mod rules;

pub use gate::{should_block_tool, ToolGate};
pub use messages::{build_block_message, build_context_warning};
pub use outbound::{decide_outbound, is_maskable, OutboundDecision};
pub use policy::EnforcementPolicy;
pub use rules::{
    blocked_tools_for, disposition_for, instruction_for, label_for, rule_for, Disposition,
    EnforcementRule, DEFAULT_BLOCK_TOOLS, DEFAULT_HIGH_RISK_TOOLS,
};
