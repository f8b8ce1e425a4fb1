//! Mapping backend failures onto the caller-facing error taxonomy.
//!
//! Discriminated [`ProviderError`] variants map directly. Only the
//! unstructured `ApiError` message falls back to keyword matching.

use mysa_core::{ProviderError, ServiceError};

/// Classify a backend failure.
pub fn classify(error: &ProviderError) -> ServiceError {
    match error {
        ProviderError::Timeout(_) => ServiceError::timeout(),
        ProviderError::Network(_) => ServiceError::network(),
        ProviderError::MissingCredential(_) | ProviderError::AuthenticationFailed(_) => {
            ServiceError::credential()
        }
        ProviderError::PermissionDenied(_) => ServiceError::permission_denied(),
        ProviderError::QuotaExceeded(_) => ServiceError::quota(),
        ProviderError::ContentFiltered(_) => ServiceError::content_filtered(),
        ProviderError::InvalidResponse(_) => ServiceError::invalid_response(),
        ProviderError::ApiError { message, .. } => {
            match_keywords(message).unwrap_or_else(|| ServiceError::backend(message))
        }
        ProviderError::NotConfigured(message) => classify_message(message),
    }
}

/// Classify free-form error text. First matching rule wins.
pub fn classify_message(raw: &str) -> ServiceError {
    if let Some(err) = match_keywords(raw) {
        return err;
    }
    if raw.to_lowercase().contains("invalid response") {
        return ServiceError::invalid_response();
    }
    ServiceError::unknown()
}

fn match_keywords(raw: &str) -> Option<ServiceError> {
    let text = raw.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| text.contains(n));

    if has(&["timeout", "timed out"]) {
        Some(ServiceError::timeout())
    } else if has(&["network", "fetch"]) {
        Some(ServiceError::network())
    } else if has(&["api_key", "api key", "invalid key", "credential"]) {
        Some(ServiceError::credential())
    } else if has(&["quota", "exceeded"]) {
        Some(ServiceError::quota())
    } else if has(&["safety", "blocked"]) {
        Some(ServiceError::content_filtered())
    } else if has(&["permission", "forbidden"]) {
        Some(ServiceError::permission_denied())
    } else {
        None
    }
}
