//! Backend trait definitions
//!
//! Defines the GenerationBackend trait every text-generation provider
//! implements, and the chat message shape passed to it.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

// ─────────────────────────────────────────────────────────────────
// Chat Messages
// ─────────────────────────────────────────────────────────────────

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One message in a generation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

// ─────────────────────────────────────────────────────────────────
// GenerationBackend Trait
// ─────────────────────────────────────────────────────────────────

/// Core trait for text-generation backends
///
/// Implementations are stateless across calls apart from configuration and
/// counters, so one instance can serve concurrent persona sessions.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Backend identifier (e.g., "gemini", "openai")
    fn name(&self) -> &'static str;

    /// Model used for requests
    fn model(&self) -> &str;

    /// Send the messages and return the generated text
    async fn invoke(&self, messages: &[ChatMessage]) -> Result<String>;

    /// Convenience for the common system + user prompt pair
    async fn invoke_prompt(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let messages = [ChatMessage::system(system_prompt), ChatMessage::user(user_prompt)];
        self.invoke(&messages).await
    }
}

/// Type alias for a shared backend reference
pub type SharedBackend = Arc<dyn GenerationBackend>;

/// Split messages into the system instruction and the conversation turns.
///
/// Multiple system messages are joined with a blank line.
pub fn split_system(messages: &[ChatMessage]) -> (Option<String>, Vec<&ChatMessage>) {
    let system: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect();

    let turns = messages.iter().filter(|m| m.role != Role::System).collect();

    let system = if system.is_empty() {
        None
    } else {
        Some(system.join("\n\n"))
    };

    (system, turns)
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_string(&Role::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
    }

    #[test]
    fn test_split_system() {
        let messages = vec![
            ChatMessage::system("be brief"),
            ChatMessage::user("hello"),
            ChatMessage::system("be honest"),
        ];

        let (system, turns) = split_system(&messages);
        assert_eq!(system.as_deref(), Some("be brief\n\nbe honest"));
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].content, "hello");
    }

    #[test]
    fn test_split_without_system() {
        let messages = vec![ChatMessage::user("hello")];
        let (system, turns) = split_system(&messages);
        assert!(system.is_none());
        assert_eq!(turns.len(), 1);
    }
}
