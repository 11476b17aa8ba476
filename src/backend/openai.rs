//! OpenAI-compatible chat completions backend
//!
//! Implements GenerationBackend by calling `POST {base_url}/chat/completions`
//! with bearer authentication. Works against OpenAI and any compatible
//! endpoint.

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

use super::http::{build_client, send_with_retry};
use super::{ChatMessage, GenerationBackend};

// ─────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────

/// Configuration for the OpenAI-compatible backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OpenAiConfig {
    /// API base URL (e.g., "https://api.openai.com/v1")
    pub base_url: String,

    /// API key, supplied per run and never written back out
    #[serde(skip_serializing)]
    pub api_key: String,

    /// Model to use (overlay key `model` also sets this)
    pub default_model: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Completion token limit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Maximum retries on transient errors
    pub max_retries: u32,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            default_model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            max_tokens: None,
            timeout_secs: 120,
            max_retries: 2,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// OpenAI API types (request/response)
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiErrorWrapper {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

fn describe_error(_status: StatusCode, body: String) -> String {
    serde_json::from_str::<ApiErrorWrapper>(&body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or(body)
}

fn extract_text(response: ChatCompletionResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| Error::generation("No choices in API response"))
}

// ─────────────────────────────────────────────────────────────────
// OpenAI Backend
// ─────────────────────────────────────────────────────────────────

/// OpenAI-compatible generation backend
pub struct OpenAiBackend {
    config: OpenAiConfig,
    client: Client,
    total_requests: RwLock<u64>,
    total_tokens: RwLock<u64>,
}

impl OpenAiBackend {
    /// Create a new OpenAI backend with the given configuration
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(Error::provider_init("openai", "an API key is required"));
        }

        let client = build_client("openai", config.timeout_secs)?;

        info!(
            base_url = %config.base_url,
            model = %config.default_model,
            temperature = config.temperature,
            "OpenAI-compatible backend created"
        );

        Ok(Self {
            config,
            client,
            total_requests: RwLock::new(0),
            total_tokens: RwLock::new(0),
        })
    }

    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    /// Successful requests so far
    pub fn request_count(&self) -> u64 {
        *self.total_requests.read()
    }

    /// Tokens reported by the API so far
    pub fn token_count(&self) -> u64 {
        *self.total_tokens.read()
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.config.api_key)
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl GenerationBackend for OpenAiBackend {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.config.default_model
    }

    async fn invoke(&self, messages: &[ChatMessage]) -> Result<String> {
        let body = ChatCompletionRequest {
            model: &self.config.default_model,
            messages: messages
                .iter()
                .map(|m| ApiMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let url = self.endpoint();
        let auth = self.auth_header();

        let response = send_with_retry(
            "openai",
            self.config.max_retries,
            || {
                self.client
                    .post(&url)
                    .header("Authorization", &auth)
                    .json(&body)
            },
            describe_error,
        )
        .await?;

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::generation(format!("Failed to parse API response: {}", e)))?;

        *self.total_requests.write() += 1;
        if let Some(usage) = &parsed.usage {
            *self.total_tokens.write() += usage.total_tokens as u64;
        }

        let text = extract_text(parsed)?;
        debug!(model = %self.config.default_model, chars = text.len(), "Chat completion received");
        Ok(text)
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn keyed() -> OpenAiConfig {
        OpenAiConfig {
            api_key: "sk-test-123".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = OpenAiConfig::default();
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert!(config.api_key.is_empty());
        assert_eq!(config.default_model, "gpt-4o-mini");
        assert_eq!(config.temperature, 0.7);
        assert_eq!(config.timeout_secs, 120);
        assert_eq!(config.max_retries, 2);
    }

    #[test]
    fn test_requires_api_key() {
        let err = OpenAiBackend::new(OpenAiConfig::default()).err().unwrap();
        assert!(matches!(err, Error::ProviderInit { .. }));
    }

    #[test]
    fn test_backend_identity() {
        let backend = OpenAiBackend::new(keyed()).unwrap();
        assert_eq!(backend.name(), "openai");
        assert_eq!(backend.model(), "gpt-4o-mini");
        assert_eq!(backend.request_count(), 0);
    }

    #[test]
    fn test_auth_header_and_endpoint() {
        let backend = OpenAiBackend::new(OpenAiConfig {
            base_url: "http://localhost:8080/v1/".to_string(),
            ..keyed()
        })
        .unwrap();
        assert_eq!(backend.auth_header(), "Bearer sk-test-123");
        assert_eq!(backend.endpoint(), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn test_api_key_not_serialized() {
        let value = serde_json::to_value(keyed()).unwrap();
        assert!(value.get("api_key").is_none());
        assert!(value.get("max_tokens").is_none());
    }

    #[test]
    fn test_extract_text() {
        let response: ChatCompletionResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"REVIEW: fine"}}],
                "usage":{"prompt_tokens":3,"completion_tokens":2,"total_tokens":5}}"#,
        )
        .unwrap();
        assert_eq!(extract_text(response).unwrap(), "REVIEW: fine");

        let empty: ChatCompletionResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(extract_text(empty).is_err());
    }

    #[test]
    fn test_describe_error_prefers_api_message() {
        let body = r#"{"error":{"message":"Invalid API key","type":"auth"}}"#.to_string();
        assert_eq!(describe_error(StatusCode::UNAUTHORIZED, body), "Invalid API key");
        assert_eq!(
            describe_error(StatusCode::BAD_GATEWAY, "upstream down".to_string()),
            "upstream down"
        );
    }
}
