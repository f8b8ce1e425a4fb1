//! Where the grounding document is read from.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

/// Why a grounding document could not be used. Never surfaces from
/// [`crate::ContextProvider::load`]; it only decides that the fallback is used.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ContextLoadError {
    #[error("grounding document not found at {0}")]
    Missing(String),

    #[error("grounding document at {0} is empty or contains only whitespace")]
    Empty(String),

    #[error("failed to read {location}: {reason}")]
    Io { location: String, reason: String },

    #[error("failed to fetch {location}: {status}")]
    Status { location: String, status: u16 },

    #[error("failed to fetch {location}: {reason}")]
    Transport { location: String, reason: String },
}

/// A place the grounding document can be fetched from.
#[async_trait]
pub trait ContextSource: Send + Sync {
    /// Human-readable location, for logs and diagnostics.
    fn describe(&self) -> String;

    /// Fetch the raw document text.
    async fn fetch(&self) -> Result<String, ContextLoadError>;
}

/// Reads the document from the local filesystem.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ContextSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch(&self) -> Result<String, ContextLoadError> {
        debug!(path = %self.path.display(), "Reading grounding document");
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => ContextLoadError::Missing(self.describe()),
                _ => ContextLoadError::Io {
                    location: self.describe(),
                    reason: e.to_string(),
                },
            })
    }
}

/// Fetches the document over HTTP(S).
pub struct HttpSource {
    url: String,
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(url: impl Into<String>) -> Result<Self, ContextLoadError> {
        let url = url.into();
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| ContextLoadError::Transport {
                location: url.clone(),
                reason: e.to_string(),
            })?;
        Ok(Self { url, client })
    }
}

#[async_trait]
impl ContextSource for HttpSource {
    fn describe(&self) -> String {
        self.url.clone()
    }

    async fn fetch(&self) -> Result<String, ContextLoadError> {
        debug!(url = %self.url, "Fetching grounding document");
        let transport = |e: reqwest::Error| ContextLoadError::Transport {
            location: self.url.clone(),
            reason: e.to_string(),
        };

        let response = self.client.get(&self.url).send().await.map_err(transport)?;

        let status = response.status().as_u16();
        if status == 404 {
            return Err(ContextLoadError::Missing(self.url.clone()));
        }
        if !response.status().is_success() {
            return Err(ContextLoadError::Status {
                location: self.url.clone(),
                status,
            });
        }

        response.text().await.map_err(transport)
    }
}

/// Pick a source for a configured location: `http://` and `https://` URLs are
/// fetched over the network, anything else is a file path.
pub fn source_for(location: &str) -> Result<Arc<dyn ContextSource>, ContextLoadError> {
    let trimmed = location.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(Arc::new(HttpSource::new(trimmed)?))
    } else {
        Ok(Arc::new(FileSource::new(trimmed)))
    }
}
