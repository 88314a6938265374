//! Feature mode resolution.
//!
//! Each protection can run automatically in a hook (`deterministic`), be
//! offered to the agent as a tool it is asked to call (`probabilistic`), or
//! be switched off. Resolution precedence for every feature:
//!
//! | Priority | Source | Example |
//! |----------|--------|---------|
//! | 1 | explicit mode string (if valid) | `outbound_mode = "off"` |
//! | 2 | legacy boolean | `outbound_scanning_enabled = true` → deterministic |
//! | 3 | default | deterministic |
//!
//! ## Fail-Closed Invariant
//!
//! A probabilistic feature only runs if the agent chooses to call its tool,
//! so it cannot fail closed. [`resolve_all`] rejects that combination
//! outright instead of downgrading it.
//!
//! Resolution is pure: no I/O and no defaults beyond the ones named here.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::RawConfig;
use crate::error::WardenError;
use crate::Result;

/// How a feature is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureMode {
    /// Enforced automatically in a lifecycle hook.
    Deterministic,
    /// Exposed to the agent as a callable tool.
    Probabilistic,
    /// Disabled.
    Off,
}

impl FeatureMode {
    /// Parses a mode string, ignoring case and surrounding whitespace.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "deterministic" => Some(Self::Deterministic),
            "probabilistic" => Some(Self::Probabilistic),
            "off" => Some(Self::Off),
            _ => None,
        }
    }

    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deterministic => "deterministic",
            Self::Probabilistic => "probabilistic",
            Self::Off => "off",
        }
    }
}

impl fmt::Display for FeatureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the bootstrap reminder is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderMode {
    /// Show the reminder.
    On,
    /// Do not.
    Off,
}

impl ReminderMode {
    /// Parses `on` / `off`, ignoring case and surrounding whitespace.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "on" => Some(Self::On),
            "off" => Some(Self::Off),
            _ => None,
        }
    }
}

/// A protection whose enforcement mode is configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    /// Inbound message scanning.
    Audit,
    /// Warning injection before the agent runs.
    ContextInjection,
    /// Outbound message scanning.
    Outbound,
    /// Tool call gating.
    ToolGating,
}

impl Feature {
    /// Every configurable feature, in configuration order.
    pub const ALL: [Feature; 4] = [
        Feature::Audit,
        Feature::ContextInjection,
        Feature::Outbound,
        Feature::ToolGating,
    ];

    /// Configuration key for this feature's mode.
    pub fn config_key(&self) -> &'static str {
        match self {
            Self::Audit => "audit_mode",
            Self::ContextInjection => "context_injection_mode",
            Self::Outbound => "outbound_mode",
            Self::ToolGating => "tool_gating_mode",
        }
    }
}

/// Fully resolved modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedModes {
    /// Inbound scanning.
    pub audit: FeatureMode,
    /// Context warning injection.
    pub context_injection: FeatureMode,
    /// Outbound scanning.
    pub outbound: FeatureMode,
    /// Tool gating.
    pub tool_gating: FeatureMode,
    /// Bootstrap reminder.
    pub reminder: ReminderMode,
}

impl ResolvedModes {
    /// Mode of `feature`.
    pub fn mode(&self, feature: Feature) -> FeatureMode {
        match feature {
            Feature::Audit => self.audit,
            Feature::ContextInjection => self.context_injection,
            Feature::Outbound => self.outbound,
            Feature::ToolGating => self.tool_gating,
        }
    }

    /// True when `feature` is enforced by its hook.
    pub fn is_deterministic(&self, feature: Feature) -> bool {
        self.mode(feature) == FeatureMode::Deterministic
    }

    /// Features in `mode`, in configuration order.
    pub fn features_in(&self, mode: FeatureMode) -> Vec<Feature> {
        Feature::ALL
            .into_iter()
            .filter(|feature| self.mode(*feature) == mode)
            .collect()
    }
}

impl Default for ResolvedModes {
    fn default() -> Self {
        Self {
            audit: FeatureMode::Deterministic,
            context_injection: FeatureMode::Deterministic,
            outbound: FeatureMode::Deterministic,
            tool_gating: FeatureMode::Deterministic,
            reminder: ReminderMode::On,
        }
    }
}

/// Resolves one feature's mode.
///
/// An explicit string that does not name a mode is ignored.
pub fn resolve_feature_mode(
    explicit: Option<&str>,
    legacy: Option<bool>,
    default: FeatureMode,
) -> FeatureMode {
    if let Some(mode) = explicit.and_then(FeatureMode::parse) {
        return mode;
    }
    match legacy {
        Some(true) => FeatureMode::Deterministic,
        Some(false) => FeatureMode::Off,
        None => default,
    }
}

/// Resolves the reminder mode with the same precedence.
pub fn resolve_reminder_mode(
    explicit: Option<&str>,
    legacy: Option<bool>,
    default: ReminderMode,
) -> ReminderMode {
    if let Some(mode) = explicit.and_then(ReminderMode::parse) {
        return mode;
    }
    match legacy {
        Some(true) => ReminderMode::On,
        Some(false) => ReminderMode::Off,
        None => default,
    }
}

/// Resolves every feature and enforces the fail-closed invariant.
///
/// # Errors
///
/// [`WardenError::FailClosedConflict`] naming every feature key that
/// resolved to probabilistic while `fail_closed` is set.
pub fn resolve_all(raw: &RawConfig) -> Result<ResolvedModes> {
    let feature = |explicit: &Option<String>, legacy: Option<bool>| {
        resolve_feature_mode(explicit.as_deref(), legacy, FeatureMode::Deterministic)
    };

    let modes = ResolvedModes {
        audit: feature(&raw.audit_mode, raw.audit_enabled),
        context_injection: feature(&raw.context_injection_mode, raw.context_injection_enabled),
        outbound: feature(&raw.outbound_mode, raw.outbound_scanning_enabled),
        tool_gating: feature(&raw.tool_gating_mode, raw.tool_gating_enabled),
        reminder: resolve_reminder_mode(
            raw.reminder_mode.as_deref(),
            raw.reminder_enabled,
            ReminderMode::On,
        ),
    };

    if raw.fail_closed {
        let conflicts: Vec<String> = modes
            .features_in(FeatureMode::Probabilistic)
            .iter()
            .map(|feature| feature.config_key().to_string())
            .collect();
        if !conflicts.is_empty() {
            return Err(WardenError::FailClosedConflict {
                features: conflicts,
            });
        }
    }

    Ok(modes)
}
