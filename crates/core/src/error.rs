//! Error types for the Mysa domain.
//!
//! Two layers, both built with `thiserror`:
//! - [`ProviderError`]: what a model backend reports, discriminated by cause
//! - [`ServiceError`]: the only failure shape handed to the front end

use serde::{Deserialize, Serialize};
use thiserror::Error;

// --- Backend errors ---

/// A failure reported by a model backend.
///
/// Backends map their own status codes onto these variants so the
/// orchestrator can classify without reading message text. `ApiError` is the
/// catch-all for responses the backend could not discriminate further.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("Missing API key: {0}")]
    MissingCredential(String),

    #[error("Invalid API key: {0}")]
    AuthenticationFailed(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Content blocked by safety filter: {0}")]
    ContentFiltered(String),

    #[error("Request timeout: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

// --- Caller-facing errors ---

/// The fixed taxonomy of orchestration failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceErrorKind {
    Network,
    Timeout,
    InvalidResponse,
    Credential,
    Quota,
    ContentFiltered,
    Unknown,
}

impl ServiceErrorKind {
    /// Whether failures of this kind are worth another attempt.
    pub fn is_retryable(self) -> bool {
        !matches!(self, Self::Credential | Self::Quota | Self::ContentFiltered)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::InvalidResponse => "invalid_response",
            Self::Credential => "credential",
            Self::Quota => "quota",
            Self::ContentFiltered => "content_filtered",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ServiceErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure, ready to be shown to the user.
///
/// `message` is user-facing text; the front end renders it as an assistant
/// turn. `retryable` records whether the kind is transient, even when the
/// automatic retry budget is already spent.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ServiceError {
    pub kind: ServiceErrorKind,
    pub message: String,
    pub retryable: bool,
}

impl ServiceError {
    pub fn new(kind: ServiceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable: kind.is_retryable(),
        }
    }

    pub fn timeout() -> Self {
        Self::new(
            ServiceErrorKind::Timeout,
            "Mysa is taking longer than usual - please try again",
        )
    }

    pub fn network() -> Self {
        Self::new(ServiceErrorKind::Network, "Connection issue - please try again")
    }

    pub fn credential() -> Self {
        Self::new(
            ServiceErrorKind::Credential,
            "API key configuration issue - please check your API key",
        )
    }

    pub fn permission_denied() -> Self {
        Self::new(
            ServiceErrorKind::Credential,
            "API access denied - check your API key permissions",
        )
    }

    pub fn quota() -> Self {
        Self::new(
            ServiceErrorKind::Quota,
            "API quota exceeded - please try again later",
        )
    }

    pub fn content_filtered() -> Self {
        Self::new(
            ServiceErrorKind::ContentFiltered,
            "Content was filtered - please rephrase your question",
        )
    }

    pub fn invalid_response() -> Self {
        Self::new(
            ServiceErrorKind::InvalidResponse,
            "Sorry, I couldn't understand that. Please try again",
        )
    }

    /// An unclassified backend failure; the detail is kept for the user.
    pub fn backend(detail: &str) -> Self {
        Self::new(
            ServiceErrorKind::Unknown,
            format!("Model backend error: {detail}"),
        )
    }

    pub fn unknown() -> Self {
        Self::new(ServiceErrorKind::Unknown, "Something went wrong. Please try again")
    }
}

// --- Parameter validation ---

/// Raised when request parameters are malformed. This is a caller bug, not a
/// service failure, so it stays outside the [`ServiceError`] taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidParams {
    #[error("latest user message is empty")]
    EmptyUserMessage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_retryable_kinds() {
        assert!(!ServiceErrorKind::Credential.is_retryable());
        assert!(!ServiceErrorKind::Quota.is_retryable());
        assert!(!ServiceErrorKind::ContentFiltered.is_retryable());
        assert!(ServiceErrorKind::Timeout.is_retryable());
        assert!(ServiceErrorKind::Unknown.is_retryable());
    }

    #[test]
    fn service_error_serializes_with_snake_case_kind() {
        let json = serde_json::to_value(ServiceError::content_filtered()).unwrap();
        assert_eq!(json["kind"], "content_filtered");
        assert_eq!(json["retryable"], false);
        assert!(json["message"].as_str().unwrap().contains("rephrase"));
    }

    #[test]
    fn service_error_displays_its_message() {
        let err = ServiceError::backend("model overloaded");
        assert_eq!(err.to_string(), "Model backend error: model overloaded");
        assert!(err.retryable);
    }

    #[test]
    fn provider_error_displays_correctly() {
        let err = ProviderError::ApiError {
            status_code: 500,
            message: "Internal".into(),
        };
        assert!(err.to_string().contains("500"));
        assert!(ProviderError::Timeout("30s".into()).to_string().contains("timeout"));
    }
}
