//! Provider selection: builds the configured model backend.

use std::sync::Arc;

use mysa_config::{AppConfig, CredentialSource, ProviderKind};
use mysa_core::error::ProviderError;
use mysa_core::provider::Provider;

use crate::gemini::GeminiProvider;
use crate::openai_compat::OpenAiCompatProvider;

/// Build the backend named by `config.provider`.
///
/// The credential source is stored, not resolved: each request asks it for
/// the current key.
pub fn build_from_config(
    config: &AppConfig,
    credential: Arc<dyn CredentialSource>,
) -> Result<Arc<dyn Provider>, ProviderError> {
    let base_url = config
        .provider
        .api_url
        .clone()
        .unwrap_or_else(|| default_base_url(config.provider.kind).to_string());

    let provider: Arc<dyn Provider> = match config.provider.kind {
        ProviderKind::Gemini => {
            Arc::new(GeminiProvider::new(credential)?.with_base_url(base_url))
        }
        ProviderKind::OpenaiCompat => Arc::new(OpenAiCompatProvider::new(
            provider_label(&base_url),
            base_url,
            credential,
        )?),
    };

    tracing::debug!(
        provider = provider.name(),
        model = %config.provider.model,
        "Model backend ready"
    );
    Ok(provider)
}

/// Get the default base URL for a provider kind.
fn default_base_url(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::Gemini => "https://generativelanguage.googleapis.com",
        ProviderKind::OpenaiCompat => "https://api.openai.com/v1",
    }
}

/// A readable name for an OpenAI-compatible endpoint, for logs.
fn provider_label(base_url: &str) -> &'static str {
    if base_url.contains("openrouter.ai") {
        "openrouter"
    } else if base_url.contains("localhost:11434") {
        "ollama"
    } else if base_url.contains("api.openai.com") {
        "openai"
    } else {
        "openai_compat"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mysa_config::StaticCredential;

    #[test]
    fn build_from_default_config_is_gemini() {
        let config = AppConfig::default();
        let provider = build_from_config(&config, Arc::new(StaticCredential::new("k"))).unwrap();
        assert_eq!(provider.name(), "gemini");
    }

    #[test]
    fn openai_compat_uses_api_url_for_label() {
        let mut config = AppConfig::default();
        config.provider.kind = ProviderKind::OpenaiCompat;
        config.provider.api_url = Some("https://openrouter.ai/api/v1".into());
        let provider = build_from_config(&config, Arc::new(StaticCredential::new("k"))).unwrap();
        assert_eq!(provider.name(), "openrouter");
    }

    #[test]
    fn default_base_urls() {
        assert!(default_base_url(ProviderKind::Gemini).contains("googleapis.com"));
        assert!(default_base_url(ProviderKind::OpenaiCompat).contains("api.openai.com"));
    }
}
