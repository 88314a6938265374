//! Detection service collaborator.
//!
//! Warden never computes verdicts itself. A [`Scanner`] wraps whatever
//! client talks to the detection service; the orchestrator only depends on
//! this trait.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use warden_verdict::Verdict;

/// Application metadata attached to every scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppMetadata {
    /// Name of the calling application.
    pub app_name: String,
    /// End user the request is made for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_user: Option<String>,
    /// Model producing responses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_model: Option<String>,
}

/// One scan call. At least one of `prompt` and `response` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRequest {
    /// Inbound text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// Outbound text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    /// Conversation the text belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Fresh id per request, for pairing with the service's audit log.
    pub correlation_id: String,
    /// Detection profile.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_name: Option<String>,
    /// Caller metadata.
    pub metadata: AppMetadata,
}

impl ScanRequest {
    fn empty() -> Self {
        Self {
            prompt: None,
            response: None,
            session_id: None,
            correlation_id: Uuid::new_v4().to_string(),
            profile_name: None,
            metadata: AppMetadata::default(),
        }
    }

    /// Scan of inbound text.
    pub fn prompt(text: impl Into<String>) -> Self {
        Self {
            prompt: Some(text.into()),
            ..Self::empty()
        }
    }

    /// Scan of outbound text.
    pub fn response(text: impl Into<String>) -> Self {
        Self {
            response: Some(text.into()),
            ..Self::empty()
        }
    }

    /// Sets the session.
    #[must_use]
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Sets the detection profile.
    #[must_use]
    pub fn with_profile(mut self, profile_name: Option<String>) -> Self {
        self.profile_name = profile_name;
        self
    }

    /// Sets the caller metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: AppMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// User the request is attributed to, for rate limiting.
    pub fn user_key(&self) -> &str {
        self.metadata
            .app_user
            .as_deref()
            .or(self.session_id.as_deref())
            .unwrap_or("anonymous")
    }
}

/// Why a scan produced no verdict.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScanError {
    /// Network or protocol failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Missing or rejected API key.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Too many scans.
    #[error("Rate limit exceeded: {limit} requests per {window_seconds}s")]
    RateLimited {
        /// Allowed requests per window.
        limit: u32,
        /// Window length.
        window_seconds: u64,
    },

    /// The call did not complete in time.
    #[error("Scan timed out after {0}ms")]
    Timeout(u64),

    /// The service answered with something unparseable.
    #[error("Invalid scan response: {0}")]
    InvalidResponse(String),
}

/// A client of the detection service.
#[async_trait]
pub trait Scanner: Send + Sync {
    /// Scans the request's text.
    async fn scan(&self, request: ScanRequest) -> Result<Verdict, ScanError>;
}

#[async_trait]
impl<T: Scanner + ?Sized> Scanner for Arc<T> {
    async fn scan(&self, request: ScanRequest) -> Result<Verdict, ScanError> {
        (**self).scan(request).await
    }
}
