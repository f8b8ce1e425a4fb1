//! Credential resolution for model backends.
//!
//! A [`CredentialSource`] is asked for the API key on every dispatch, so a key
//! exported mid-session is picked up by the next request without a restart.

/// Environment variables checked for the API key, highest priority first.
pub const DEFAULT_API_KEY_VARS: [&str; 3] = ["MYSA_API_KEY", "GOOGLE_API_KEY", "VITE_GOOGLE_API_KEY"];

/// Values shipped in sample `.env` files. They are never real keys.
const PLACEHOLDER_KEYS: [&str; 2] = ["your_actual_api_key_here", "test-key"];

/// Supplies the backend API key at request time.
pub trait CredentialSource: Send + Sync {
    /// The key to use right now, or `None` if none is configured.
    fn api_key(&self) -> Option<String>;
}

/// Reads the key from environment variables, falling back to a static value
/// from the config file.
#[derive(Clone)]
pub struct EnvCredential {
    vars: Vec<String>,
    fallback: Option<String>,
}

impl EnvCredential {
    pub fn new<I, S>(vars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            vars: vars.into_iter().map(Into::into).collect(),
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, key: Option<String>) -> Self {
        self.fallback = key;
        self
    }

    /// The environment variables consulted, in priority order.
    pub fn vars(&self) -> &[String] {
        &self.vars
    }

    /// Name of the variable that currently supplies a usable key, if any.
    pub fn active_var(&self) -> Option<&str> {
        self.vars
            .iter()
            .find(|var| std::env::var(var).ok().and_then(usable).is_some())
            .map(String::as_str)
    }
}

impl Default for EnvCredential {
    fn default() -> Self {
        Self::new(DEFAULT_API_KEY_VARS)
    }
}

impl std::fmt::Debug for EnvCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvCredential")
            .field("vars", &self.vars)
            .field("fallback", &self.fallback.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl CredentialSource for EnvCredential {
    fn api_key(&self) -> Option<String> {
        self.vars
            .iter()
            .find_map(|var| std::env::var(var).ok().and_then(usable))
            .or_else(|| self.fallback.clone().and_then(usable))
    }
}

/// A fixed key, for embedding and tests.
#[derive(Clone, Default)]
pub struct StaticCredential(Option<String>);

impl StaticCredential {
    pub fn new(key: impl Into<String>) -> Self {
        Self(Some(key.into()))
    }

    pub fn none() -> Self {
        Self(None)
    }
}

impl CredentialSource for StaticCredential {
    fn api_key(&self) -> Option<String> {
        self.0.clone().and_then(usable)
    }
}

/// Empty strings and placeholders count as "no key".
fn usable(key: String) -> Option<String> {
    let trimmed = key.trim();
    if trimmed.is_empty() || PLACEHOLDER_KEYS.contains(&trimmed) {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Short, non-reversible description of a key for diagnostics.
pub fn describe_key(key: &str) -> String {
    let prefix: String = key.chars().take(4).collect();
    format!("{prefix}*** ({} chars)", key.chars().count())
}
