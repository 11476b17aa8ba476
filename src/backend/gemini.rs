//! Google Gemini backend
//!
//! Calls `POST {base_url}/models/{model}:generateContent?key=...`. System
//! messages become the request's `systemInstruction`; assistant turns are
//! sent with the `model` role.

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

use super::http::{build_client, send_with_retry};
use super::{split_system, ChatMessage, GenerationBackend, Role};

// ─────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────

/// Configuration for the Gemini backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeminiConfig {
    /// API base URL
    pub base_url: String,

    /// API key, supplied per run and never written back out
    #[serde(skip_serializing)]
    pub api_key: String,

    /// Model to use (overlay key `model` also sets this)
    pub default_model: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Output token limit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Maximum retries on transient errors
    pub max_retries: u32,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key: String::new(),
            default_model: "gemini-1.5-pro".to_string(),
            temperature: 0.7,
            max_tokens: None,
            timeout_secs: 120,
            max_retries: 2,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Gemini API types (request/response)
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Debug, Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Debug, Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

fn describe_error(status: StatusCode, body: String) -> String {
    let message = serde_json::from_str::<ErrorWrapper>(&body)
        .map(|wrapper| {
            let msg = wrapper.error.message.unwrap_or_else(|| body.clone());
            match wrapper.error.status {
                Some(s) if !s.is_empty() => format!("{}: {}", s, msg),
                _ => msg,
            }
        })
        .unwrap_or_else(|_| body.clone());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            format!("authentication failed ({})", message)
        }
        StatusCode::NOT_FOUND => format!("model not found ({})", message),
        _ => message,
    }
}

fn extract_text(response: GenerateContentResponse) -> Result<String> {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(Error::generation(format!("Gemini blocked the prompt: {}", reason)));
    }

    let text: Vec<String> = response
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        return Err(Error::generation(
            "Gemini API returned no text in the response candidates",
        ));
    }

    Ok(text.concat())
}

fn build_request(messages: &[ChatMessage], config: &GeminiConfig) -> GenerateContentRequest {
    let (system, turns) = split_system(messages);

    GenerateContentRequest {
        system_instruction: system.map(|text| Content {
            role: None,
            parts: vec![Part { text }],
        }),
        contents: turns
            .into_iter()
            .map(|m| Content {
                role: Some(match m.role {
                    Role::Assistant => "model",
                    _ => "user",
                }),
                parts: vec![Part {
                    text: m.content.clone(),
                }],
            })
            .collect(),
        generation_config: GenerationConfig {
            temperature: config.temperature,
            max_output_tokens: config.max_tokens,
        },
    }
}

// ─────────────────────────────────────────────────────────────────
// Gemini Backend
// ─────────────────────────────────────────────────────────────────

/// Gemini generation backend
pub struct GeminiBackend {
    config: GeminiConfig,
    client: Client,
    total_requests: RwLock<u64>,
}

impl GeminiBackend {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(Error::provider_init("gemini", "an API key is required"));
        }

        let client = build_client("gemini", config.timeout_secs)?;

        info!(
            model = %config.default_model,
            temperature = config.temperature,
            "Gemini backend created"
        );

        Ok(Self {
            config,
            client,
            total_requests: RwLock::new(0),
        })
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    pub fn request_count(&self) -> u64 {
        *self.total_requests.read()
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.default_model
        )
    }
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.config.default_model
    }

    async fn invoke(&self, messages: &[ChatMessage]) -> Result<String> {
        let body = build_request(messages, &self.config);
        let url = self.endpoint();

        let response = send_with_retry(
            "gemini",
            self.config.max_retries,
            || {
                self.client
                    .post(&url)
                    .query(&[("key", self.config.api_key.as_str())])
                    .json(&body)
            },
            describe_error,
        )
        .await?;

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| Error::generation(format!("Failed to parse Gemini response: {}", e)))?;

        *self.total_requests.write() += 1;

        let text = extract_text(parsed)?;
        debug!(model = %self.config.default_model, chars = text.len(), "Gemini content received");
        Ok(text)
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
