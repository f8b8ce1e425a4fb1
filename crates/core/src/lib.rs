//! # Mysa Core
//!
//! Domain types, traits, and error definitions for the Mysa city guide.
//! This crate has **no async runtime dependency**: it defines the domain model
//! that the backend, context and orchestration crates implement against.
//!
//! - [`message`]: conversation modes, chat messages, request parameters
//! - [`provider`]: the model backend trait
//! - [`error`]: backend errors and the caller-facing [`ServiceError`]

pub mod error;
pub mod message;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use error::{InvalidParams, ProviderError, ServiceError, ServiceErrorKind};
pub use message::{ChatMessage, ConversationMode, RequestParams, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
