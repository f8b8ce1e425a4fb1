//! Model backend implementations for Mysa.
//!
//! All providers implement the `mysa_core::Provider` trait.
//! [`router::build_from_config`] picks one based on configuration.

pub mod gemini;
pub mod openai_compat;
pub mod router;

pub use gemini::GeminiProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use router::build_from_config;
