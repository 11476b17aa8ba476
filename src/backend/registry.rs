//! Backend Registry
//!
//! Maps backend identifiers to concrete backends and merges per-run
//! overrides into the configured backend defaults.

use std::str::FromStr;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use crate::error::{Error, Result};

use super::{
    GeminiBackend, GeminiConfig, GenerationBackend, MockBackend, MockConfig, OpenAiBackend,
    OpenAiConfig, SharedBackend,
};

/// Caller-supplied per-run overrides (e.g. `temperature`, `model`)
pub type ModelOverlay = Map<String, Value>;

// ─────────────────────────────────────────────────────────────────
// Backend Type
// ─────────────────────────────────────────────────────────────────

/// Supported backend types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// Google Gemini
    Gemini,
    /// OpenAI-compatible chat completions
    OpenAi,
    /// Mock backend (for testing and dry runs)
    Mock,
}

impl BackendType {
    /// Get all backend types
    pub fn all() -> &'static [BackendType] {
        &[BackendType::Gemini, BackendType::OpenAi, BackendType::Mock]
    }

    /// Get the backend name
    pub fn name(&self) -> &'static str {
        match self {
            BackendType::Gemini => "gemini",
            BackendType::OpenAi => "openai",
            BackendType::Mock => "mock",
        }
    }

    /// Whether the backend calls a remote API and needs a credential
    pub fn is_remote(&self) -> bool {
        !matches!(self, BackendType::Mock)
    }
}

impl FromStr for BackendType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Ok(BackendType::Gemini),
            "openai" => Ok(BackendType::OpenAi),
            "mock" => Ok(BackendType::Mock),
            _ => Err(Error::UnsupportedBackend(s.to_string())),
        }
    }
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ─────────────────────────────────────────────────────────────────
// Overlay
// ─────────────────────────────────────────────────────────────────

/// Parse one `key=value` override. The value is read as JSON when it parses
/// (numbers, booleans, quoted strings) and as a plain string otherwise.
pub fn parse_overlay_pair(pair: &str) -> std::result::Result<(String, Value), String> {
    let (key, raw) = pair
        .split_once('=')
        .ok_or_else(|| format!("Invalid override '{}'. Expected KEY=VALUE", pair))?;

    let key = key.trim();
    if key.is_empty() {
        return Err(format!("Invalid override '{}'. Key is empty", pair));
    }

    let value = serde_json::from_str(raw.trim()).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

/// Shallow-merge `overlay` over `defaults`, caller keys winning, and decode
/// the result back into the backend's config type.
fn merge_overlay<T>(backend: BackendType, defaults: &T, overlay: &ModelOverlay) -> Result<T>
where
    T: Serialize + DeserializeOwned,
{
    let mut merged = match serde_json::to_value(defaults)? {
        Value::Object(map) => map,
        other => {
            return Err(Error::Internal(format!(
                "{} defaults serialized to {}, expected an object",
                backend, other
            )))
        }
    };

    for (key, value) in overlay {
        let key = if key == "model" { "default_model" } else { key.as_str() };
        merged.insert(key.to_string(), value.clone());
    }

    serde_json::from_value(Value::Object(merged))
        .map_err(|e| Error::provider_init(backend.name(), format!("invalid override: {}", e)))
}

// ─────────────────────────────────────────────────────────────────
// Backend Factory
// ─────────────────────────────────────────────────────────────────

/// Configured defaults for every backend type
#[derive(Debug, Clone, Default)]
pub struct BackendDefaults {
    pub gemini: GeminiConfig,
    pub openai: OpenAiConfig,
    pub mock: MockConfig,
}

/// Factory for creating backends
pub struct BackendFactory;

impl BackendFactory {
    /// Create a backend of the specified type
    ///
    /// A non-empty `credential` replaces any key from the defaults.
    pub fn create(
        backend_type: BackendType,
        credential: &str,
        defaults: &BackendDefaults,
        overlay: &ModelOverlay,
    ) -> Result<SharedBackend> {
        let backend: SharedBackend = match backend_type {
            BackendType::Gemini => {
                let mut config = merge_overlay(backend_type, &defaults.gemini, overlay)?;
                config.api_key = pick_credential(credential, &defaults.gemini.api_key);
                Arc::new(GeminiBackend::new(config)?)
            }
            BackendType::OpenAi => {
                let mut config = merge_overlay(backend_type, &defaults.openai, overlay)?;
                config.api_key = pick_credential(credential, &defaults.openai.api_key);
                Arc::new(OpenAiBackend::new(config)?)
            }
            BackendType::Mock => {
                let config = merge_overlay(backend_type, &defaults.mock, overlay)?;
                Arc::new(MockBackend::with_config(config))
            }
        };

        info!(backend = %backend_type, model = %backend.model(), "Backend initialized");
        Ok(backend)
    }

    /// Parse the identifier and create the backend
    pub fn create_by_name(
        name: &str,
        credential: &str,
        defaults: &BackendDefaults,
        overlay: &ModelOverlay,
    ) -> Result<SharedBackend> {
        Self::create(name.parse()?, credential, defaults, overlay)
    }
}

fn pick_credential(credential: &str, configured: &str) -> String {
    if credential.trim().is_empty() {
        configured.to_string()
    } else {
        credential.to_string()
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
