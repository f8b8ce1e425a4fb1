//! Prompt assembly: persona, mode guidance, grounding document, recent turns.
//!
//! The backend receives one text payload per turn. Assembly is
//! deterministic; identical parameters always produce an identical prompt.

use mysa_config::PersonaConfig;
use mysa_core::{ChatMessage, RequestParams, Role};

/// Builds the single instruction payload sent to the model backend.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    persona_name: String,
    city: String,
    history_window: usize,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::from_config(&PersonaConfig::default(), 3)
    }
}

impl PromptBuilder {
    pub fn new(persona_name: impl Into<String>, city: impl Into<String>) -> Self {
        Self {
            persona_name: persona_name.into(),
            city: city.into(),
            history_window: 3,
        }
    }

    pub fn from_config(persona: &PersonaConfig, history_window: usize) -> Self {
        Self::new(&persona.name, &persona.city).with_history_window(history_window)
    }

    /// How many of the most recent turns are included.
    pub fn with_history_window(mut self, turns: usize) -> Self {
        self.history_window = turns;
        self
    }

    /// The turns that make it into the prompt, oldest first.
    ///
    /// The front end usually appends the new user message to the history
    /// before dispatching; that trailing copy is skipped so the message is
    /// not repeated.
    pub fn recent_turns<'a>(&self, params: &'a RequestParams) -> &'a [ChatMessage] {
        let mut history = params.messages();
        if let Some(last) = history.last()
            && last.role == Role::User
            && last.content.trim() == params.latest_user_message().trim()
        {
            history = &history[..history.len() - 1];
        }
        let start = history.len().saturating_sub(self.history_window);
        &history[start..]
    }

    pub fn build(&self, params: &RequestParams) -> String {
        let name = &self.persona_name;
        let city = &self.city;
        let mode = params.mode();

        let history = self
            .recent_turns(params)
            .iter()
            .map(|msg| {
                let speaker = match msg.role {
                    Role::User => "User",
                    Role::Assistant => name.as_str(),
                };
                format!("   {speaker}: {}", msg.content)
            })
            .collect::<Vec<_>>()
            .join("\n");
        let history = if history.is_empty() {
            "   (no earlier messages)".to_string()
        } else {
            history
        };

        format!(
            "You are {name}, a friendly local guide from {city}. You love helping visitors discover your city.

1. PERSONALITY & TONE:
   - Speak like a warm, enthusiastic local friend
   - Use simple, conversational English
   - Be realistic about limitations and don't oversell experiences

2. CURRENT MODE FOCUS:
   - The user is currently in \"{mode_upper}\" mode
   - Focus primarily on {focus}
   - Use the \"{section}\" section of the knowledge base below as your primary source

3. RESPONSE STRUCTURE:
   - Keep responses to 3-4 sentences
   - Give 2-3 specific recommendations with brief explanations
   - Include practical details: timing, cost, location hints

4. USE THIS {city_upper} KNOWLEDGE BASE:

{knowledge}

5. CONVERSATION CONTEXT:
   Current mode: {mode}
   Recent conversation history:
{history}

Now respond to this user message as {name}: \"{latest}\"

Remember: stay focused on {city} and use the knowledge base above.",
            mode_upper = mode.as_str().to_uppercase(),
            focus = mode.focus(),
            section = mode.section_heading(),
            city_upper = city.to_uppercase(),
            knowledge = params.context_content(),
            latest = params.latest_user_message().trim(),
        )
    }
}
