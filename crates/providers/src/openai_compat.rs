//! OpenAI-compatible provider implementation.
//!
//! Works with: OpenAI, OpenRouter, Ollama, vLLM, Together AI, and any
//! endpoint exposing `/chat/completions`. The prompt is sent as a single
//! user message.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mysa_config::CredentialSource;
use mysa_core::error::ProviderError;
use mysa_core::provider::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::gemini::map_transport_error;

/// An OpenAI-compatible model backend.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    credential: Arc<dyn CredentialSource>,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        credential: Arc<dyn CredentialSource>,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credential,
            client,
        })
    }

    fn build_body(request: &ProviderRequest) -> serde_json::Value {
        let messages = vec![ApiMessage {
            role: "user".into(),
            content: Some(request.prompt.clone()),
        }];

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": messages,
            "temperature": request.temperature,
            "stream": false,
        });

        if let Some(max_tokens) = request.max_output_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        body
    }
}

#[async_trait]
impl mysa_core::Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let api_key = self.credential.api_key().ok_or_else(|| {
            ProviderError::MissingCredential(format!("no API key for provider '{}'", self.name))
        })?;

        let url = format!("{}/chat/completions", self.base_url);
        let body = Self::build_body(&request);

        debug!(provider = %self.name, model = %request.model, "Sending completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status().as_u16();

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider returned error");
            return Err(map_http_error(status, &error_body));
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("failed to parse response: {e}")))?;

        interpret_response(api_response)
    }
}

fn map_http_error(status: u16, body: &str) -> ProviderError {
    let detail = serde_json::from_str::<ApiErrorEnvelope>(body).ok().map(|e| e.error);
    let message = detail
        .as_ref()
        .map(|d| d.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.to_string());
    // OpenAI sends string codes, OpenRouter numeric ones.
    let code = match detail.and_then(|d| d.code) {
        Some(serde_json::Value::String(code)) => code,
        Some(other) => other.to_string(),
        None => String::new(),
    };

    match (status, code.as_str()) {
        (401, _) | (_, "invalid_api_key") => ProviderError::AuthenticationFailed(message),
        (403, _) => ProviderError::PermissionDenied(message),
        (429, _) | (_, "insufficient_quota") => ProviderError::QuotaExceeded(message),
        (408 | 504, _) => ProviderError::Timeout(message),
        _ => ProviderError::ApiError {
            status_code: status,
            message,
        },
    }
}

fn interpret_response(api_response: ApiResponse) -> Result<ProviderResponse, ProviderError> {
    let choice = api_response.choices.into_iter().next();
    let finish_reason = choice.as_ref().and_then(|c| c.finish_reason.clone());
    let text = choice
        .and_then(|c| c.message.content)
        .unwrap_or_default();

    if text.trim().is_empty() && finish_reason.as_deref() == Some("content_filter") {
        return Err(ProviderError::ContentFiltered(
            "completion stopped by content filter".into(),
        ));
    }

    let usage = api_response.usage.map(|u| Usage {
        prompt_tokens: u.prompt_tokens,
        completion_tokens: u.completion_tokens,
        total_tokens: u.total_tokens,
    });

    Ok(ProviderResponse {
        text,
        model: api_response.model,
        finish_reason,
        usage,
    })
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    model: String,
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mysa_core::Provider;

    #[test]
    fn body_wraps_prompt_as_single_user_message() {
        let body = OpenAiCompatProvider::build_body(&ProviderRequest {
            model: "gpt-4o-mini".into(),
            prompt: "Quiet sunset walk?".into(),
            temperature: 0.2,
            max_output_tokens: None,
        });
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "Quiet sunset walk?");
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn parse_completion() {
        let data = r#"{
            "model": "gpt-4o-mini",
            "choices": [{"message": {"role": "assistant", "content": "Karanji Lake."}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 3, "total_tokens": 13}
        }"#;
        let resp = interpret_response(serde_json::from_str(data).unwrap()).unwrap();
        assert_eq!(resp.text, "Karanji Lake.");
        assert_eq!(resp.usage.unwrap().total_tokens, 13);
    }

    #[test]
    fn content_filter_finish_is_filtered() {
        let data = r#"{"model": "m", "choices": [{"message": {"role": "assistant", "content": null}, "finish_reason": "content_filter"}]}"#;
        let err = interpret_response(serde_json::from_str(data).unwrap()).unwrap_err();
        assert!(matches!(err, ProviderError::ContentFiltered(_)));
    }

    #[test]
    fn error_codes_map_to_variants() {
        let quota = r#"{"error": {"message": "You exceeded your current quota", "code": "insufficient_quota"}}"#;
        assert!(matches!(map_http_error(429, quota), ProviderError::QuotaExceeded(_)));
        assert!(matches!(map_http_error(401, "{}"), ProviderError::AuthenticationFailed(_)));
        assert!(matches!(map_http_error(403, ""), ProviderError::PermissionDenied(_)));
        assert!(matches!(
            map_http_error(500, "oops"),
            ProviderError::ApiError { status_code: 500, .. }
        ));
    }

    #[test]
    fn numeric_error_code_keeps_message() {
        let body = r#"{"error": {"message": "Provider returned error", "code": 502}}"#;
        match map_http_error(502, body) {
            ProviderError::ApiError { status_code, message } => {
                assert_eq!(status_code, 502);
                assert_eq!(message, "Provider returned error");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let body = r#"{"error": {"message": "Rate limit exceeded", "code": 429}}"#;
        match map_http_error(429, body) {
            ProviderError::QuotaExceeded(message) => assert_eq!(message, "Rate limit exceeded"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
