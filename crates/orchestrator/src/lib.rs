//! Request orchestration for Mysa.
//!
//! Turns one conversation turn into a single model dispatch:
//! assemble the prompt, race the backend against a timeout, validate the
//! reply, and classify failures into a [`mysa_core::ServiceError`]. Transient
//! failures are retried with exponential backoff.

pub mod classify;
pub mod orchestrator;
pub mod prompt;
pub mod retry;

pub use classify::{classify, classify_message};
pub use orchestrator::{Orchestrator, OrchestratorSettings, RetryState};
pub use prompt::PromptBuilder;
pub use retry::RetryPolicy;
