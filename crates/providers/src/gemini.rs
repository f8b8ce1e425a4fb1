//! Google Gemini provider (`generateContent`).
//!
//! Sends the prompt as a single user turn and maps Gemini's status codes,
//! `error.status` names and safety signals onto [`ProviderError`] variants.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mysa_config::CredentialSource;
use mysa_core::error::ProviderError;
use mysa_core::provider::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_VERSION: &str = "v1beta";

/// Finish reasons meaning the candidate was withheld by a content filter.
const BLOCKING_FINISH_REASONS: [&str; 4] = ["SAFETY", "BLOCKLIST", "PROHIBITED_CONTENT", "SPII"];

pub struct GeminiProvider {
    base_url: String,
    api_version: String,
    credential: Arc<dyn CredentialSource>,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(credential: Arc<dyn CredentialSource>) -> Result<Self, ProviderError> {
        // Safety net only; the orchestrator enforces the real deadline.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            base_url: DEFAULT_BASE_URL.into(),
            api_version: DEFAULT_VERSION.into(),
            credential,
            client,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/{}/models/{}:generateContent",
            self.base_url, self.api_version, model
        )
    }

    fn build_body(request: &ProviderRequest) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: "user".into(),
                parts: vec![Part {
                    text: Some(request.prompt.clone()),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_output_tokens,
            },
        }
    }
}

#[async_trait]
impl mysa_core::Provider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let api_key = self.credential.api_key().ok_or_else(|| {
            ProviderError::MissingCredential(
                "set MYSA_API_KEY or GOOGLE_API_KEY, or api_key in the config file".into(),
            )
        })?;

        let body = Self::build_body(&request);
        debug!(provider = "gemini", model = %request.model, "Sending generateContent request");

        let response = self
            .client
            .post(self.endpoint(&request.model))
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Gemini returned error");
            return Err(map_http_error(status, &error_body));
        }

        let payload: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("failed to decode body: {e}")))?;

        interpret_response(payload, &request.model)
    }
}

pub(crate) fn map_transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else {
        ProviderError::Network(e.to_string())
    }
}

/// Map a non-2xx response onto a discriminated error. Google's error envelope
/// carries a status name and, for bad keys, an `API_KEY_INVALID` reason even
/// when the HTTP code is a plain 400.
fn map_http_error(status: u16, body: &str) -> ProviderError {
    let envelope = serde_json::from_str::<ApiErrorEnvelope>(body).ok();
    let message = envelope
        .as_ref()
        .map(|e| e.error.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.to_string());
    let status_name = envelope
        .as_ref()
        .and_then(|e| e.error.status.clone())
        .unwrap_or_default();
    let bad_key = envelope.as_ref().is_some_and(|e| {
        e.error
            .details
            .iter()
            .any(|d| d.reason.as_deref() == Some("API_KEY_INVALID"))
    });

    if bad_key || status == 401 || status_name == "UNAUTHENTICATED" {
        return ProviderError::AuthenticationFailed(message);
    }

    match (status, status_name.as_str()) {
        (403, _) | (_, "PERMISSION_DENIED") => ProviderError::PermissionDenied(message),
        (429, _) | (_, "RESOURCE_EXHAUSTED") => ProviderError::QuotaExceeded(message),
        (408 | 504, _) | (_, "DEADLINE_EXCEEDED") => ProviderError::Timeout(message),
        _ => ProviderError::ApiError {
            status_code: status,
            message,
        },
    }
}

fn interpret_response(
    payload: GenerateContentResponse,
    requested_model: &str,
) -> Result<ProviderResponse, ProviderError> {
    if let Some(reason) = payload.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(ProviderError::ContentFiltered(format!("prompt blocked: {reason}")));
    }

    let candidate = payload.candidates.into_iter().next();
    let finish_reason = candidate.as_ref().and_then(|c| c.finish_reason.clone());
    let text: String = candidate
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.trim().is_empty()
        && finish_reason
            .as_deref()
            .is_some_and(|r| BLOCKING_FINISH_REASONS.contains(&r))
    {
        return Err(ProviderError::ContentFiltered(format!(
            "response withheld: {}",
            finish_reason.unwrap_or_default()
        )));
    }

    let usage = payload.usage_metadata.map(|u| {
        let prompt_tokens = u.prompt_token_count.unwrap_or(0);
        let completion_tokens = u.candidates_token_count.unwrap_or(0);
        Usage {
            prompt_tokens,
            completion_tokens,
            total_tokens: u
                .total_token_count
                .unwrap_or(prompt_tokens + completion_tokens),
        }
    });

    Ok(ProviderResponse {
        text,
        model: payload
            .model_version
            .unwrap_or_else(|| requested_model.to_string()),
        finish_reason,
        usage,
    })
}

// --- Gemini API types (internal) ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
    total_token_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    details: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    reason: Option<String>,
}
