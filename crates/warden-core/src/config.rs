//! Configuration types for Warden.
//!
//! Every field has a default, so an empty document is a valid
//! configuration. Mode settings live in [`RawConfig`] and are flattened into
//! the top level of [`WardenConfig`].

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use warden_policy::DEFAULT_HIGH_RISK_TOOLS;

use crate::error::WardenError;
use crate::modes::{resolve_all, ResolvedModes};
use crate::Result;

/// Unresolved mode settings as written by the operator.
///
/// Explicit `*_mode` strings take precedence over the legacy `*_enabled`
/// booleans; see [`crate::modes`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// `deterministic`, `probabilistic` or `off`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit_mode: Option<String>,
    /// `deterministic`, `probabilistic` or `off`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_injection_mode: Option<String>,
    /// `deterministic`, `probabilistic` or `off`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outbound_mode: Option<String>,
    /// `deterministic`, `probabilistic` or `off`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_gating_mode: Option<String>,
    /// `on` or `off`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminder_mode: Option<String>,

    /// Legacy switch for inbound scanning.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit_enabled: Option<bool>,
    /// Legacy switch for context injection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_injection_enabled: Option<bool>,
    /// Legacy switch for outbound scanning.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outbound_scanning_enabled: Option<bool>,
    /// Legacy switch for tool gating.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_gating_enabled: Option<bool>,
    /// Legacy switch for the reminder.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminder_enabled: Option<bool>,

    /// Treat scan failures as blocking threats.
    pub fail_closed: bool,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            audit_mode: None,
            context_injection_mode: None,
            outbound_mode: None,
            tool_gating_mode: None,
            reminder_mode: None,
            audit_enabled: None,
            context_injection_enabled: None,
            outbound_scanning_enabled: None,
            tool_gating_enabled: None,
            reminder_enabled: None,
            fail_closed: true,
        }
    }
}

/// Client-side limit on scan calls per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Whether the limit applies.
    pub enabled: bool,
    /// Scans allowed per window.
    pub max_requests: u32,
    /// Window length.
    pub window_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 100,
            window_seconds: 60,
        }
    }
}

impl RateLimitConfig {
    /// Window as a [`Duration`].
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }
}

/// Configuration for the Warden orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WardenConfig {
    /// Mode settings.
    #[serde(flatten)]
    pub modes: RawConfig,

    /// Mask data-leakage blocks instead of replacing the whole message.
    pub dlp_mask_only: bool,

    /// Tools blocked for any non-safe verdict.
    pub high_risk_tools: Vec<String>,

    /// Detection profile passed to the scanner.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_name: Option<String>,

    /// Application name reported with every scan.
    pub app_name: String,

    /// Application user reported with every scan.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_user: Option<String>,

    /// Model name reported with every scan.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_model: Option<String>,

    /// Lifetime of a cached verdict.
    pub cache_ttl_secs: u64,

    /// Period of the background cache sweep. Zero disables it.
    pub sweep_interval_secs: u64,

    /// Environment variable holding the detection service API key.
    pub api_key_env: String,

    /// Scan rate limit.
    pub rate_limit: RateLimitConfig,
}

impl Default for WardenConfig {
    fn default() -> Self {
        Self {
            modes: RawConfig::default(),
            dlp_mask_only: true,
            high_risk_tools: DEFAULT_HIGH_RISK_TOOLS.iter().map(|t| t.to_string()).collect(),
            profile_name: None,
            app_name: "warden".to_string(),
            app_user: None,
            ai_model: None,
            cache_ttl_secs: 30,
            sweep_interval_secs: 60,
            api_key_env: "WARDEN_API_KEY".to_string(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl WardenConfig {
    /// Parses a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(|e| WardenError::Config(e.to_string()))
    }

    /// Loads a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&source)
    }

    /// Renders the configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| WardenError::Config(e.to_string()))
    }

    /// Resolves modes and checks value ranges.
    ///
    /// # Errors
    ///
    /// - [`WardenError::FailClosedConflict`] from mode resolution
    /// - [`WardenError::Config`] for a zero TTL or an empty rate limit
    pub fn validate(&self) -> Result<ResolvedModes> {
        let modes = resolve_all(&self.modes)?;
        if self.cache_ttl_secs == 0 {
            return Err(WardenError::Config(
                "cache_ttl_secs must be greater than zero".to_string(),
            ));
        }
        if self.rate_limit.enabled
            && (self.rate_limit.max_requests == 0 || self.rate_limit.window_seconds == 0)
        {
            return Err(WardenError::Config(
                "rate_limit needs max_requests and window_seconds above zero".to_string(),
            ));
        }
        Ok(modes)
    }

    /// Cache TTL as a [`Duration`].
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Sweep period, or `None` when sweeping is disabled.
    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_secs > 0).then(|| Duration::from_secs(self.sweep_interval_secs))
    }

    /// API key from the configured environment variable, if set and non-empty.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}
