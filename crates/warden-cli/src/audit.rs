//! Configuration audit.
//!
//! Runs a fixed list of checks against a config file and the environment and
//! collects the outcome of each. A `Fail` anywhere fails the audit; a `Warn`
//! is reported but does not.

use std::path::Path;

use serde::Serialize;
use warden_core::{Feature, FeatureMode, ResolvedModes, WardenConfig};

/// Outcome of one check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

impl CheckStatus {
    fn tag(&self) -> &'static str {
        match self {
            Self::Pass => "[OK]",
            Self::Warn => "[WARN]",
            Self::Fail => "[FAIL]",
        }
    }
}

/// One named check and what it found.
#[derive(Debug, Clone, Serialize)]
pub struct AuditCheck {
    pub name: &'static str,
    pub status: CheckStatus,
    pub message: String,
}

impl AuditCheck {
    fn new(name: &'static str, status: CheckStatus, message: impl Into<String>) -> Self {
        Self {
            name,
            status,
            message: message.into(),
        }
    }
}

/// Every check, in the order it ran.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AuditReport {
    pub checks: Vec<AuditCheck>,
}

impl AuditReport {
    fn push(&mut self, check: AuditCheck) {
        self.checks.push(check);
    }

    /// True when no check failed.
    pub fn is_ok(&self) -> bool {
        self.count(CheckStatus::Fail) == 0
    }

    pub fn count(&self, status: CheckStatus) -> usize {
        self.checks.iter().filter(|c| c.status == status).count()
    }

    pub fn status_of(&self, name: &str) -> Option<CheckStatus> {
        self.checks.iter().find(|c| c.name == name).map(|c| c.status)
    }

    /// Human-readable rendering.
    pub fn render(&self) -> String {
        let rule = "=".repeat(60);
        let mut out = format!("{rule}\nWARDEN CONFIGURATION AUDIT\n{rule}\n\n");
        for check in &self.checks {
            out.push_str(&format!(
                "{:<6} {}: {}\n",
                check.status.tag(),
                check.name,
                check.message
            ));
        }
        let passed = self.count(CheckStatus::Pass);
        let warned = self.count(CheckStatus::Warn);
        let failed = self.count(CheckStatus::Fail);
        out.push_str(&format!("\n{rule}\n"));
        if failed == 0 {
            out.push_str(&format!("All checks passed ({passed} ok, {warned} warnings)\n"));
        } else {
            out.push_str(&format!("{passed} passed, {warned} warnings, {failed} failed\n"));
        }
        out.push_str(&rule);
        out
    }
}

/// Masks an API key for display: first and last four characters, or `***`
/// when the key is too short to reveal any of it.
pub fn mask_api_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "***".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

/// One-line summary of resolved modes, e.g. `audit_mode=deterministic, ...`.
pub fn describe_modes(modes: &ResolvedModes) -> String {
    let mut parts: Vec<String> = Feature::ALL
        .iter()
        .map(|feature| format!("{}={}", feature.config_key(), modes.mode(*feature)))
        .collect();
    parts.push(format!(
        "reminder_mode={}",
        match modes.reminder {
            warden_core::ReminderMode::On => "on",
            warden_core::ReminderMode::Off => "off",
        }
    ));
    parts.join(", ")
}

/// Audits the config at `path`. `env` looks up environment variables.
pub fn run_audit<F>(path: &Path, env: F) -> AuditReport
where
    F: Fn(&str) -> Option<String>,
{
    let mut report = AuditReport::default();

    let config = if path.exists() {
        match WardenConfig::load(path) {
            Ok(config) => {
                report.push(AuditCheck::new(
                    "Config File",
                    CheckStatus::Pass,
                    format!("Config file found: {}", path.display()),
                ));
                config
            }
            Err(e) => {
                report.push(AuditCheck::new(
                    "Config File",
                    CheckStatus::Fail,
                    format!("Cannot load {}: {e}", path.display()),
                ));
                return report;
            }
        }
    } else {
        report.push(AuditCheck::new(
            "Config File",
            CheckStatus::Warn,
            format!("No config at {} (using defaults)", path.display()),
        ));
        WardenConfig::default()
    };

    report.push(check_api_key(&config, &env));

    match config.validate() {
        Ok(modes) => {
            report.push(AuditCheck::new("Modes", CheckStatus::Pass, describe_modes(&modes)));
            report.push(check_policy(&config, &modes));
        }
        Err(e) => report.push(AuditCheck::new("Modes", CheckStatus::Fail, e.to_string())),
    }

    report.push(check_rate_limit(&config));
    report
}

fn check_api_key<F>(config: &WardenConfig, env: &F) -> AuditCheck
where
    F: Fn(&str) -> Option<String>,
{
    match env(&config.api_key_env).filter(|key| !key.trim().is_empty()) {
        Some(key) => AuditCheck::new(
            "API Key",
            CheckStatus::Pass,
            format!("API key configured: {}", mask_api_key(&key)),
        ),
        None => AuditCheck::new(
            "API Key",
            CheckStatus::Fail,
            format!("{} environment variable not set", config.api_key_env),
        ),
    }
}

fn check_policy(config: &WardenConfig, modes: &ResolvedModes) -> AuditCheck {
    let mut notes = Vec::new();
    if config.high_risk_tools.is_empty() {
        notes.push("high_risk_tools is empty; threats only block category-specific tools");
    }
    if config.dlp_mask_only && modes.outbound == FeatureMode::Off {
        notes.push("dlp_mask_only has no effect while outbound_mode is off");
    }
    if modes.features_in(FeatureMode::Off).len() == Feature::ALL.len() {
        notes.push("every feature is off; nothing is enforced");
    }

    if notes.is_empty() {
        AuditCheck::new(
            "Policy",
            CheckStatus::Pass,
            format!(
                "{} high-risk tools, masking {}",
                config.high_risk_tools.len(),
                if config.dlp_mask_only { "on" } else { "off" }
            ),
        )
    } else {
        AuditCheck::new("Policy", CheckStatus::Warn, notes.join("; "))
    }
}

fn check_rate_limit(config: &WardenConfig) -> AuditCheck {
    let limit = &config.rate_limit;
    if !limit.enabled {
        return AuditCheck::new("Rate Limit", CheckStatus::Warn, "scan rate limiting disabled");
    }
    if limit.max_requests == 0 || limit.window_seconds == 0 {
        return AuditCheck::new(
            "Rate Limit",
            CheckStatus::Fail,
            "max_requests and window_seconds must be above zero",
        );
    }
    AuditCheck::new(
        "Rate Limit",
        CheckStatus::Pass,
        format!("{} scans per {}s per user", limit.max_requests, limit.window_seconds),
    )
}
