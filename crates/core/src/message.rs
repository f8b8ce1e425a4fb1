//! Conversation modes, chat messages and per-call request parameters.
//!
//! Flow: the front end records a [`ChatMessage`] for every turn, then packs the
//! history into [`RequestParams`] for one orchestration call.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::InvalidParams;

/// The topical filter chosen by the user for a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationMode {
    Food,
    Festival,
    Walks,
}

impl ConversationMode {
    pub const ALL: [ConversationMode; 3] = [Self::Food, Self::Festival, Self::Walks];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Food => "food",
            Self::Festival => "festival",
            Self::Walks => "walks",
        }
    }

    /// What the guide should concentrate on in this mode.
    pub fn focus(self) -> &'static str {
        match self {
            Self::Food => "food recommendations, restaurants, and local dishes",
            Self::Festival => "festival events, traditions, and planning",
            Self::Walks => "heritage walks, routes, and sightseeing",
        }
    }

    /// Heading of the grounding document section this mode privileges.
    pub fn section_heading(self) -> &'static str {
        match self {
            Self::Food => "Food Mode",
            Self::Festival => "Festival Mode",
            Self::Walks => "Walks Mode",
        }
    }
}

impl std::fmt::Display for ConversationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown mode '{0}' (expected food, festival or walks)")]
pub struct ParseModeError(pub String);

impl std::str::FromStr for ConversationMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "food" => Ok(Self::Food),
            // The festival mode was called "dasara" in earlier releases.
            "festival" | "dasara" => Ok(Self::Festival),
            "walks" | "walk" => Ok(Self::Walks),
            other => Err(ParseModeError(other.to_string())),
        }
    }
}

/// Who wrote a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single turn in the conversation. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub mode: ConversationMode,
    /// Epoch milliseconds.
    pub timestamp: i64,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>, mode: ConversationMode) -> Self {
        Self::new(Role::User, content, mode)
    }

    pub fn assistant(content: impl Into<String>, mode: ConversationMode) -> Self {
        Self::new(Role::Assistant, content, mode)
    }

    fn new(role: Role, content: impl Into<String>, mode: ConversationMode) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            mode,
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

/// Everything one orchestration call needs, owned by that call.
#[derive(Debug, Clone)]
pub struct RequestParams {
    mode: ConversationMode,
    messages: Vec<ChatMessage>,
    latest_user_message: String,
    context_content: String,
}

impl RequestParams {
    /// Build parameters for one turn. `messages` is the full history, oldest
    /// first, and may be empty.
    pub fn new(
        mode: ConversationMode,
        messages: Vec<ChatMessage>,
        latest_user_message: impl Into<String>,
        context_content: impl Into<String>,
    ) -> Result<Self, InvalidParams> {
        let latest_user_message = latest_user_message.into();
        if latest_user_message.trim().is_empty() {
            return Err(InvalidParams::EmptyUserMessage);
        }

        Ok(Self {
            mode,
            messages,
            latest_user_message,
            context_content: context_content.into(),
        })
    }

    pub fn mode(&self) -> ConversationMode {
        self.mode
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn latest_user_message(&self) -> &str {
        &self.latest_user_message
    }

    pub fn context_content(&self) -> &str {
        &self.context_content
    }
}
