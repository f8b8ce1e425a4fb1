//! Grounding document provider for Mysa.
//!
//! The grounding document is the city knowledge injected into every prompt.
//! [`ContextProvider`] loads it once, shares a single in-flight load between
//! concurrent callers, caches the result, and falls back to a built-in
//! document when the configured source is unusable.

pub mod fallback;
pub mod provider;
pub mod source;

pub use fallback::FALLBACK_DOCUMENT;
pub use provider::ContextProvider;
pub use source::{ContextLoadError, ContextSource, FileSource, HttpSource, source_for};
