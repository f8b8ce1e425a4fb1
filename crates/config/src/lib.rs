//! Configuration loading, validation, and management for Mysa.
//!
//! Loads configuration from `~/.mysa/config.toml` with environment
//! variable overrides. Validates all settings at startup.
//!
//! The API key is the exception: it is never frozen into [`AppConfig`] at
//! startup. Backends resolve it through a [`CredentialSource`] on every
//! request, see [`credential`].

pub mod credential;

pub use credential::{CredentialSource, EnvCredential, StaticCredential};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.mysa/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key used when no credential environment variable is set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model backend settings
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Timeout, retry and prompt window settings
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// Where the grounding document comes from
    #[serde(default)]
    pub context: ContextConfig,

    /// Who the guide is and which city it covers
    #[serde(default)]
    pub persona: PersonaConfig,
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("provider", &self.provider)
            .field("orchestrator", &self.orchestrator)
            .field("context", &self.context)
            .field("persona", &self.persona)
            .finish()
    }
}

/// Which wire protocol the model backend speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Google Gemini `generateContent`
    Gemini,
    /// Any `/chat/completions` endpoint (OpenAI, OpenRouter, Ollama, ...)
    OpenaiCompat,
}

impl std::str::FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "openai_compat" | "openai" | "openrouter" | "ollama" => Ok(Self::OpenaiCompat),
            other => Err(ConfigError::ValidationError(format!(
                "unknown provider kind '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_provider_kind")]
    pub kind: ProviderKind,

    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL override (e.g. a proxy or a local Ollama)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

fn default_provider_kind() -> ProviderKind {
    ProviderKind::Gemini
}
fn default_model() -> String {
    "gemini-1.5-flash".into()
}
fn default_temperature() -> f32 {
    0.7
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: default_provider_kind(),
            model: default_model(),
            api_url: None,
            temperature: default_temperature(),
            max_output_tokens: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Wall-clock budget for one dispatch
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Automatic re-attempts after the first dispatch
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// First backoff delay; doubles on every retry
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// How many recent turns go into the prompt
    #[serde(default = "default_history_window")]
    pub history_window: usize,
}

fn default_timeout_ms() -> u64 {
    30_000
}
fn default_max_retries() -> u32 {
    2
}
fn default_backoff_base_ms() -> u64 {
    1_000
}
fn default_history_window() -> usize {
    3
}

impl OrchestratorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            history_window: default_history_window(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// File path or http(s) URL of the grounding document
    #[serde(default = "default_context_source")]
    pub source: String,
}

fn default_context_source() -> String {
    "product.md".into()
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            source: default_context_source(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaConfig {
    #[serde(default = "default_persona_name")]
    pub name: String,

    #[serde(default = "default_city")]
    pub city: String,
}

fn default_persona_name() -> String {
    "Mysa".into()
}
fn default_city() -> String {
    "Mysuru".into()
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            name: default_persona_name(),
            city: default_city(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `path`, then apply environment overrides:
    /// - `MYSA_PROVIDER`: provider kind
    /// - `MYSA_MODEL`: model name
    /// - `MYSA_CONTEXT`: grounding document location
    pub fn load_with_overrides(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;

        if let Ok(kind) = std::env::var("MYSA_PROVIDER") {
            config.provider.kind = kind.parse()?;
        }

        if let Ok(model) = std::env::var("MYSA_MODEL") {
            config.provider.model = model;
        }

        if let Ok(source) = std::env::var("MYSA_CONTEXT") {
            config.context.source = source;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".mysa")
    }

    /// Get the default configuration file path.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.temperature < 0.0 || self.provider.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "provider.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.provider.model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "provider.model must not be empty".into(),
            ));
        }

        if self.orchestrator.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "orchestrator.timeout_ms must be > 0".into(),
            ));
        }

        if self.orchestrator.backoff_base_ms == 0 {
            return Err(ConfigError::ValidationError(
                "orchestrator.backoff_base_ms must be > 0".into(),
            ));
        }

        if self.orchestrator.history_window == 0 {
            return Err(ConfigError::ValidationError(
                "orchestrator.history_window must be >= 1".into(),
            ));
        }

        if self.persona.name.trim().is_empty() || self.persona.city.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "persona.name and persona.city must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// The credential source backends should consult on every request.
    pub fn credential_source(&self) -> EnvCredential {
        EnvCredential::default().with_fallback(self.api_key.clone())
    }

}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            provider: ProviderConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            context: ContextConfig::default(),
            persona: PersonaConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.provider.kind, ProviderKind::Gemini);
        assert_eq!(config.orchestrator.timeout(), Duration::from_secs(30));
        assert_eq!(config.orchestrator.max_retries, 2);
        assert_eq!(config.context.source, "product.md");
        assert_eq!(config.persona.name, "Mysa");
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.provider.model, config.provider.model);
        assert_eq!(parsed.orchestrator.history_window, config.orchestrator.history_window);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let mut config = AppConfig::default();
        config.provider.temperature = 5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_timeout_rejected() {
        let mut config = AppConfig::default();
        config.orchestrator.timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_history_window_rejected() {
        let mut config = AppConfig::default();
        config.orchestrator.history_window = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().provider.model, "gemini-1.5-flash");
    }

    #[test]
    fn partial_config_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[provider]
kind = "openai_compat"
model = "gpt-4o-mini"
api_url = "http://localhost:11434/v1"

[orchestrator]
timeout_ms = 5000

[persona]
city = "Hampi"
"#
        )
        .unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.provider.kind, ProviderKind::OpenaiCompat);
        assert_eq!(config.provider.model, "gpt-4o-mini");
        assert_eq!(config.orchestrator.timeout_ms, 5000);
        assert_eq!(config.orchestrator.max_retries, 2);
        assert_eq!(config.persona.name, "Mysa");
        assert_eq!(config.persona.city, "Hampi");
    }

    #[test]
    fn malformed_config_file_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[provider\nkind = ").unwrap();
        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn provider_kind_parses_aliases() {
        assert_eq!("Gemini".parse::<ProviderKind>().unwrap(), ProviderKind::Gemini);
        assert_eq!("openrouter".parse::<ProviderKind>().unwrap(), ProviderKind::OpenaiCompat);
        assert!("bard".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = AppConfig {
            api_key: Some("AIzaSecret".into()),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("AIzaSecret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
