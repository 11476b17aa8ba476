//! Mock backend for testing and dry runs
//!
//! Produces deterministic review text without network access. A request whose
//! prompt asks for the summary JSON format gets a canned, schema-valid summary.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::{ChatMessage, GenerationBackend, Role};

/// Marker the summarizer prompt carries; the mock answers it with JSON.
pub const SUMMARY_PROMPT_MARKER: &str = "Required JSON format";

const CANNED_SUMMARY: &str = r#"{
  "overall_sentiment": "Positive",
  "purchase_intent_percentage": 72.5,
  "confidence_score": 80.0,
  "key_strengths": ["Build quality", "Battery life", "Ease of use"],
  "key_concerns": ["Price", "Limited colors", "Weight"],
  "demographic_insights": {
    "profession_based": "Technical reviewers focus on specifications.",
    "age_based": "Younger reviewers value design more.",
    "nationality_based": "Preferences are consistent across nationalities."
  },
  "common_themes": ["Value", "Durability", "Design", "Portability"],
  "recommendation": "Recommended for buyers who prioritize quality.",
  "detailed_summary": "Reviewers were broadly positive.\n\nPrice was the main concern."
}"#;

// ─────────────────────────────────────────────────────────────────
// Mock Backend Configuration
// ─────────────────────────────────────────────────────────────────

/// Configuration for mock backend behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MockConfig {
    /// Model name reported by the backend
    pub default_model: String,

    /// Simulated latency per call (ms)
    pub latency_ms: u64,

    /// Fixed response text (for deterministic testing)
    pub fixed_response: Option<String>,

    /// Fail any call whose messages contain this text
    pub fail_when_contains: Option<String>,

    /// Fail every call
    pub fail_all: bool,

    /// Accepted for overlay compatibility with the remote backends
    pub temperature: f32,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            default_model: "mock-model".to_string(),
            latency_ms: 0,
            fixed_response: None,
            fail_when_contains: None,
            fail_all: false,
            temperature: 0.7,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Mock Backend
// ─────────────────────────────────────────────────────────────────

/// Mock implementation of GenerationBackend for testing
pub struct MockBackend {
    config: MockConfig,
    call_counts: RwLock<CallCounts>,
    prompts: RwLock<Vec<String>>,
}

/// Track call counts for verification
#[derive(Debug, Default, Clone, Copy)]
struct CallCounts {
    invoke: u32,
    failed: u32,
}

impl MockBackend {
    /// Create a new mock backend with default configuration
    pub fn new() -> Self {
        Self::with_config(MockConfig::default())
    }

    pub fn with_config(config: MockConfig) -> Self {
        Self {
            config,
            call_counts: RwLock::new(CallCounts::default()),
            prompts: RwLock::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &MockConfig {
        &self.config
    }

    /// Number of invoke calls, failed ones included
    pub fn call_count(&self) -> u32 {
        self.call_counts.read().invoke
    }

    /// Number of invoke calls that returned an error
    pub fn failure_count(&self) -> u32 {
        self.call_counts.read().failed
    }

    /// User prompts received, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.read().clone()
    }

    fn should_fail(&self, messages: &[ChatMessage]) -> bool {
        self.config.fail_all
            || self
                .config
                .fail_when_contains
                .as_deref()
                .map(|needle| messages.iter().any(|m| m.content.contains(needle)))
                .unwrap_or(false)
    }

    fn respond(&self, user_prompt: &str) -> String {
        if let Some(fixed) = &self.config.fixed_response {
            return fixed.clone();
        }

        if user_prompt.contains(SUMMARY_PROMPT_MARKER) {
            return CANNED_SUMMARY.to_string();
        }

        let subject = user_prompt
            .lines()
            .next()
            .unwrap_or_default()
            .trim_start_matches("Review this product:")
            .trim();

        format!(
            "REVIEW: {} looks well made and fits my routine. I would likely buy it. Purchase likelihood: 70%.",
            if subject.is_empty() { "This product" } else { subject }
        )
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn model(&self) -> &str {
        &self.config.default_model
    }

    async fn invoke(&self, messages: &[ChatMessage]) -> Result<String> {
        self.call_counts.write().invoke += 1;

        let user_prompt = messages
            .iter()
            .filter(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        self.prompts.write().push(user_prompt.clone());

        if self.config.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.latency_ms)).await;
        }

        if self.should_fail(messages) {
            self.call_counts.write().failed += 1;
            return Err(Error::generation("Mock generation failure"));
        }

        Ok(self.respond(&user_prompt))
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
