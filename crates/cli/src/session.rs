//! In-memory conversation state for one chat session.

use mysa_core::{ChatMessage, ConversationMode, InvalidParams, RequestParams, ServiceError};
use mysa_orchestrator::Orchestrator;

/// The assistant turn produced for a user turn.
#[derive(Debug, Clone)]
pub struct Reply {
    pub text: String,
    pub error: Option<ServiceError>,
}

pub struct ChatSession {
    mode: ConversationMode,
    messages: Vec<ChatMessage>,
    failed: Option<RequestParams>,
}

impl ChatSession {
    /// Start a session with the guide's greeting as the first turn.
    pub fn new(persona_name: &str, city: &str, mode: ConversationMode) -> Self {
        let greeting = format!(
            "Namaskara! I'm {persona_name}, your local guide to {city}. \
             Ask me about food, festivals, or walks around the city."
        );
        Self {
            mode,
            messages: vec![ChatMessage::assistant(greeting, mode)],
            failed: None,
        }
    }

    pub fn mode(&self) -> ConversationMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ConversationMode) {
        self.mode = mode;
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Whether the last turn failed and can be retried.
    pub fn can_retry(&self) -> bool {
        self.failed.is_some()
    }

    /// Record a user turn, ask the guide, and record its answer. Failures are
    /// recorded as assistant turns carrying the error message.
    ///
    /// `document` is the grounding document loaded when the session started.
    pub async fn send(
        &mut self,
        text: &str,
        orchestrator: &Orchestrator,
        document: &str,
    ) -> Result<Reply, InvalidParams> {
        let text = text.trim();
        if text.is_empty() {
            return Err(InvalidParams::EmptyUserMessage);
        }

        self.messages.push(ChatMessage::user(text, self.mode));
        let params = RequestParams::new(self.mode, self.messages.clone(), text, document)?;

        let result = orchestrator.respond(&params).await;
        Ok(self.record(params, result))
    }

    /// Re-submit the last failed turn with a fresh retry budget.
    pub async fn retry(&mut self, orchestrator: &Orchestrator) -> Option<Reply> {
        let params = self.failed.take()?;
        let result = orchestrator.retry_last_request(&params).await;
        Some(self.record(params, result))
    }

    fn record(&mut self, params: RequestParams, result: Result<String, ServiceError>) -> Reply {
        let mode = params.mode();
        match result {
            Ok(text) => {
                self.messages.push(ChatMessage::assistant(&text, mode));
                self.failed = None;
                Reply { text, error: None }
            }
            Err(err) => {
                self.messages.push(ChatMessage::assistant(&err.message, mode));
                self.failed = Some(params);
                Reply {
                    text: err.message.clone(),
                    error: Some(err),
                }
            }
        }
    }
}
