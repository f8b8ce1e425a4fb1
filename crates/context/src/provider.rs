//! Cached, single-flight access to the grounding document.

use std::sync::{Arc, Mutex, MutexGuard};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use mysa_core::ConversationMode;
use tracing::{debug, info, warn};

use crate::fallback::FALLBACK_DOCUMENT;
use crate::source::{ContextLoadError, ContextSource};

type PendingLoad = Shared<BoxFuture<'static, Result<String, ContextLoadError>>>;

#[derive(Default)]
struct LoadState {
    cached: Option<String>,
    pending: Option<(u64, PendingLoad)>,
    generation: u64,
}

/// Loads the grounding document once and hands out the cached copy.
///
/// Concurrent callers that arrive while a load is running await the same
/// future, so the source is fetched at most once per load. A failed load is
/// not cached: the caller gets [`FALLBACK_DOCUMENT`] and the next call tries
/// the source again.
pub struct ContextProvider {
    source: Arc<dyn ContextSource>,
    persona_name: String,
    state: Mutex<LoadState>,
}

impl ContextProvider {
    pub fn new(source: Arc<dyn ContextSource>) -> Self {
        Self {
            source,
            persona_name: "Mysa".into(),
            state: Mutex::new(LoadState::default()),
        }
    }

    /// Persona name a well-formed document is expected to mention.
    pub fn with_persona_name(mut self, name: impl Into<String>) -> Self {
        self.persona_name = name.into();
        self
    }

    /// Location of the underlying source.
    pub fn location(&self) -> String {
        self.source.describe()
    }

    /// Return the grounding document. Never fails.
    pub async fn load(&self) -> String {
        let (generation, pending) = {
            let mut state = self.lock();
            if let Some(doc) = &state.cached {
                return doc.clone();
            }
            match &state.pending {
                Some((generation, pending)) => (*generation, pending.clone()),
                None => {
                    state.generation += 1;
                    let generation = state.generation;
                    let pending = fetch_validated(Arc::clone(&self.source), self.persona_name.clone())
                        .boxed()
                        .shared();
                    state.pending = Some((generation, pending.clone()));
                    (generation, pending)
                }
            }
        };

        let result = pending.await;

        {
            let mut state = self.lock();
            // A clear_cache() during the load bumps the generation; its result
            // must not repopulate the cache.
            if state.pending.as_ref().is_some_and(|(g, _)| *g == generation) {
                state.pending = None;
                if let Ok(doc) = &result {
                    state.cached = Some(doc.clone());
                }
            }
        }

        match result {
            Ok(doc) => doc,
            Err(e) => {
                warn!(source = %self.source.describe(), error = %e, "Using fallback grounding document");
                FALLBACK_DOCUMENT.to_string()
            }
        }
    }

    /// Drop the cached document and detach any in-flight load.
    pub fn clear_cache(&self) {
        let mut state = self.lock();
        state.cached = None;
        state.pending = None;
        state.generation += 1;
        debug!("Grounding document cache cleared");
    }

    /// The cached document, without triggering a load.
    pub fn peek_cache(&self) -> Option<String> {
        self.lock().cached.clone()
    }

    /// Whether a load is currently in flight.
    pub fn is_loading(&self) -> bool {
        self.lock().pending.is_some()
    }

    fn lock(&self) -> MutexGuard<'_, LoadState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

async fn fetch_validated(
    source: Arc<dyn ContextSource>,
    persona_name: String,
) -> Result<String, ContextLoadError> {
    let content = source.fetch().await?;
    if content.trim().is_empty() {
        return Err(ContextLoadError::Empty(source.describe()));
    }

    if !looks_like_grounding(&content, &persona_name) {
        warn!(
            source = %source.describe(),
            "Grounding document mentions neither the persona nor any mode, using it anyway"
        );
    }

    info!(source = %source.describe(), bytes = content.len(), "Grounding document loaded");
    Ok(content)
}

/// Soft structural check: a usable document mentions the persona or at least
/// one conversation mode.
fn looks_like_grounding(content: &str, persona_name: &str) -> bool {
    let lower = content.to_lowercase();
    let persona = persona_name.trim().to_lowercase();
    (!persona.is_empty() && lower.contains(&persona))
        || lower.contains("personality")
        // Older documents still title the festival section "Dasara".
        || lower.contains("dasara")
        || ConversationMode::ALL
            .iter()
            .any(|mode| lower.contains(mode.as_str()))
}
