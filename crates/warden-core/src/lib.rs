//! # Warden Core
//!
//! Cross-phase verdict enforcement for AI agents. Sits in the host's
//! request lifecycle, asks an external detection service about the text
//! flowing through it, and turns the answer into warnings, blocked tool
//! calls and redacted or withheld messages.
//!
//! ## Threat Coverage
//!
//! | Phase | Hook | Threats Handled |
//! |-------|------|-----------------|
//! | Inbound | [`Warden::on_message_received`] | Prompt injection, malicious payloads (scan only) |
//! | Pre-processing | [`Warden::before_agent_start`] | Agent acting on flagged input unwarned |
//! | Pre-tool | [`Warden::before_tool_call`] | Flagged input driving exec / write / send tools |
//! | Pre-send | [`Warden::message_sending`] | Data leakage, toxic or malicious output |
//!
//! ## Architecture
//!
//! ```text
//! inbound ──scan (spawned)──► VerdictStore ◄── get_if_fresh / rescan ── pre-processing
//!                                   │
//!                                   └──── get ──► EnforcementPolicy ── pre-tool
//!
//! outbound ──scan──► EnforcementPolicy ──► allow / mask / block ── pre-send
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use warden_core::{Warden, WardenConfig, InboundEvent, ToolCallEvent};
//!
//! let warden = Warden::with_memory_cache(WardenConfig::default(), Arc::new(my_scanner))?;
//!
//! warden.on_message_received(&inbound);
//! if let Some(injection) = warden.before_agent_start(&agent_start).await {
//!     host.prepend(injection.prepend_context);
//! }
//! if let Some(decision) = warden.before_tool_call(&tool_call) {
//!     host.reject(decision.block_reason);
//! }
//! ```
//!
//! ## Security Notes
//!
//! - Fail-closed (the default) turns every scan failure into a blocking verdict
//! - Fail-closed cannot be combined with probabilistic features; construction fails
//! - A cached verdict is only applied to the prompt it was computed for
//! - Scanned text is never logged

mod config;
mod error;
mod events;
mod modes;
mod rate_limit;
mod scanner;
mod tools;
mod warden;

pub use config::{RateLimitConfig, RawConfig, WardenConfig};
pub use error::WardenError;
pub use events::{
    AgentStartEvent, ContextInjection, InboundEvent, OutboundEvent, OutboundModification,
    SessionScoped, ToolCallDecision, ToolCallEvent, DEFAULT_SESSION_KEY,
};
pub use modes::{
    resolve_all, resolve_feature_mode, resolve_reminder_mode, Feature, FeatureMode, ReminderMode,
    ResolvedModes,
};
pub use rate_limit::{RateLimitedScanner, RateLimiter};
pub use scanner::{AppMetadata, ScanError, ScanRequest, Scanner};
pub use tools::{tool_definitions, ToolDefinition, CHECK_TOOL_TOOL, SCAN_OUTBOUND_TOOL, SCAN_TOOL};
pub use warden::Warden;

// Re-export component types for convenience
pub use warden_cache::{Fingerprint, InMemoryVerdictCache, VerdictStore};
pub use warden_policy::{EnforcementPolicy, OutboundDecision, ToolGate};
pub use warden_verdict::{Action, Severity, ThreatCategory, Verdict};

/// Core result type for warden operations.
pub type Result<T> = std::result::Result<T, WardenError>;
