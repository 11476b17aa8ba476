//! Per-persona generation state.

use crate::backend::ChatMessage;

/// Message history and final output of one persona's generation call.
///
/// A session belongs to exactly one persona and one call; it is never shared.
#[derive(Debug, Clone)]
pub struct GenerationSession {
    persona: String,
    messages: Vec<ChatMessage>,
    final_output: Option<String>,
}

impl GenerationSession {
    pub fn new(persona: impl Into<String>, system_prompt: String, subject_prompt: String) -> Self {
        Self {
            persona: persona.into(),
            messages: vec![
                ChatMessage::system(system_prompt),
                ChatMessage::user(subject_prompt),
            ],
            final_output: None,
        }
    }

    pub fn persona(&self) -> &str {
        &self.persona
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn final_output(&self) -> Option<&str> {
        self.final_output.as_deref()
    }

    /// Record the provider's reply and close the session.
    pub fn finish(&mut self, output: String) -> &str {
        self.messages.push(ChatMessage::assistant(output.as_str()));
        self.final_output.insert(output).as_str()
    }
}
