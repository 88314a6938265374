//! Error types for Warden Core.

use thiserror::Error;

/// Core error type for warden operations.
#[derive(Debug, Error)]
pub enum WardenError {
    /// Fail-closed is on while one or more features delegate enforcement to
    /// the agent. Lists every offending configuration key.
    #[error(
        "fail_closed is enabled but {} resolved to probabilistic; use deterministic or off, or set fail_closed = false",
        .features.join(", ")
    )]
    FailClosedConflict {
        /// Offending keys, e.g. `outbound_mode`.
        features: Vec<String>,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Agent tool invocation error.
    #[error("Tool error: {0}")]
    Tool(String),

    /// JSON (de)serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Reading a configuration file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
