//! Configuration system for review-panel
//!
//! Supports multiple configuration sources with the following precedence (highest to lowest):
//! 1. CLI arguments
//! 2. Environment variables (REVIEW_PANEL_* prefix)
//! 3. Configuration file (TOML)
//! 4. Default values

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::backend::{BackendDefaults, BackendType, GeminiConfig, MockConfig, ModelOverlay, OpenAiConfig};
use crate::error::{Error, Result};
use crate::persona::PersonaKind;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Persona source and selection settings
    pub personas: PersonaSettings,

    /// Per-persona review generation settings
    pub generation: GenerationSettings,

    /// Summary generation settings
    pub summarizer: SummarizerSettings,

    /// Gemini backend defaults
    pub gemini: GeminiConfig,

    /// OpenAI-compatible backend defaults
    pub openai: OpenAiConfig,

    /// Logging configuration
    pub logging: LoggingSettings,
}

/// Persona source settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaSettings {
    /// Persona family held by the data file: consumer or expert
    pub kind: PersonaKind,

    /// CSV file holding the persona records
    pub data_file: String,

    /// Synthesize personas when too few records match
    pub allow_backfill: bool,

    /// Fixed RNG seed for reproducible selections
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

/// Review generation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Backend identifier: gemini, openai, mock
    pub backend: String,

    /// Credential for the review backend
    #[serde(skip_serializing_if = "String::is_empty")]
    pub api_key: String,

    /// Deadline for one persona's review call
    pub timeout_secs: u64,

    /// Persona reviews in flight at once (1 = sequential)
    pub max_concurrency: usize,

    /// Panel size when none is requested
    pub default_count: usize,
}

/// Summary generation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizerSettings {
    /// Backend identifier: gemini, openai, mock
    pub backend: String,

    /// Credential for the summary backend (empty = reuse the review credential)
    #[serde(skip_serializing_if = "String::is_empty")]
    pub api_key: String,

    /// Model for the summary request (empty = the backend's default_model)
    #[serde(skip_serializing_if = "String::is_empty")]
    pub model: String,

    /// Sampling temperature for the summary request
    pub temperature: f32,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error
    pub level: String,

    /// Log file path (empty = no file logging)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Number of rotated log files to keep
    pub max_files: u32,

    /// Enable JSON formatted logging
    pub json_format: bool,
}

// ─────────────────────────────────────────────────────────────────
// Default implementations
// ─────────────────────────────────────────────────────────────────

impl Default for PersonaSettings {
    fn default() -> Self {
        Self {
            kind: PersonaKind::Consumer,
            data_file: "personas.csv".to_string(),
            allow_backfill: true,
            seed: None,
        }
    }
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            backend: "gemini".to_string(),
            api_key: String::new(),
            timeout_secs: 120,
            max_concurrency: 1,
            default_count: 5,
        }
    }
}

impl Default for SummarizerSettings {
    fn default() -> Self {
        Self {
            backend: "gemini".to_string(),
            api_key: String::new(),
            model: String::new(),
            temperature: 0.2,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            max_files: 5,
            json_format: false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Loading
// ─────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file with environment variable overrides
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = match Self::find_config_file(config_path)? {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        config.apply_env_overrides();
        config.expand_paths();
        config.validate()?;

        Ok(config)
    }

    /// Parse a configuration file without overrides or validation
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "Loading configuration file");
        let content = fs::read_to_string(path).map_err(|e| Error::IoRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config = toml::from_str(&content).map_err(|e| Error::ConfigParse {
            message: format!("{}: {}", path.display(), e),
            source: Some(e),
        })?;

        info!(path = %path.display(), "Configuration loaded from file");
        Ok(config)
    }

    /// Find the configuration file to use
    fn find_config_file(explicit_path: Option<&str>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit_path {
            let path = PathBuf::from(expand_path(path));
            return if path.exists() {
                Ok(Some(path))
            } else {
                Err(Error::ConfigNotFound { path })
            };
        }

        let search_paths = [
            Some(PathBuf::from("review-panel.toml")),
            dirs::config_dir().map(|p| p.join("review-panel").join("config.toml")),
            dirs::home_dir().map(|p| p.join(".review-panel").join("config.toml")),
        ];

        for path in search_paths.iter().flatten() {
            if path.exists() {
                debug!(path = %path.display(), "Found configuration file");
                return Ok(Some(path.clone()));
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(None)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        fn var(name: &str) -> Option<String> {
            std::env::var(format!("REVIEW_PANEL_{}", name)).ok()
        }
        fn parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
            var(name).and_then(|v| v.trim().parse().ok())
        }

        // Personas
        if let Some(val) = parsed("PERSONA_KIND") {
            self.personas.kind = val;
        }
        if let Some(val) = var("PERSONA_FILE") {
            self.personas.data_file = val;
        }
        if let Some(val) = parsed("ALLOW_BACKFILL") {
            self.personas.allow_backfill = val;
        }
        if let Some(val) = parsed("SEED") {
            self.personas.seed = Some(val);
        }

        // Generation
        if let Some(val) = var("BACKEND") {
            self.generation.backend = val;
        }
        if let Some(val) = var("API_KEY") {
            self.generation.api_key = val;
        }
        if let Some(val) = parsed("TIMEOUT_SECS") {
            self.generation.timeout_secs = val;
        }
        if let Some(val) = parsed("MAX_CONCURRENCY") {
            self.generation.max_concurrency = val;
        }
        if let Some(val) = parsed("DEFAULT_COUNT") {
            self.generation.default_count = val;
        }

        // Summarizer
        if let Some(val) = var("SUMMARIZER_BACKEND") {
            self.summarizer.backend = val;
        }
        if let Some(val) = var("SUMMARIZER_API_KEY") {
            self.summarizer.api_key = val;
        }
        if let Some(val) = var("SUMMARIZER_MODEL") {
            self.summarizer.model = val;
        }

        // Backends
        if let Some(val) = var("GEMINI_BASE_URL") {
            self.gemini.base_url = val;
        }
        if let Some(val) = var("GEMINI_MODEL") {
            self.gemini.default_model = val;
        }
        if let Some(val) = var("OPENAI_BASE_URL") {
            self.openai.base_url = val;
        }
        if let Some(val) = var("OPENAI_MODEL") {
            self.openai.default_model = val;
        }

        // Logging
        if let Some(val) = var("LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Some(val) = var("LOG_FILE") {
            self.logging.file = Some(val);
        }
        if let Some(val) = parsed("LOG_JSON") {
            self.logging.json_format = val;
        }
    }

    /// Expand ~ and other path variables
    fn expand_paths(&mut self) {
        self.personas.data_file = expand_path(&self.personas.data_file);

        if let Some(ref file) = self.logging.file {
            self.logging.file = Some(expand_path(file));
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        for (field, backend) in [
            ("generation.backend", &self.generation.backend),
            ("summarizer.backend", &self.summarizer.backend),
        ] {
            backend.parse::<BackendType>().map_err(|_| {
                Error::config_field_invalid(
                    field,
                    format!("unknown backend '{}'. Must be one of: gemini, openai, mock", backend),
                )
            })?;
        }

        if self.generation.max_concurrency == 0 {
            return Err(Error::config_field_invalid(
                "generation.max_concurrency",
                "max_concurrency must be at least 1",
            ));
        }

        for (field, secs) in [
            ("generation.timeout_secs", self.generation.timeout_secs),
            ("gemini.timeout_secs", self.gemini.timeout_secs),
            ("openai.timeout_secs", self.openai.timeout_secs),
        ] {
            if secs == 0 {
                return Err(Error::config_field_invalid(field, "timeout must be at least 1 second"));
            }
        }

        for (field, temperature) in [
            ("summarizer.temperature", self.summarizer.temperature),
            ("gemini.temperature", self.gemini.temperature),
            ("openai.temperature", self.openai.temperature),
        ] {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(Error::config_field_invalid(
                    field,
                    format!("temperature {} must be between 0.0 and 2.0", temperature),
                ));
            }
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(Error::config_field_invalid(
                "logging.level",
                format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    valid_levels.join(", ")
                ),
            ));
        }

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────
    // Derived settings
    // ─────────────────────────────────────────────────────────────

    /// Persona CSV path
    pub fn persona_file(&self) -> PathBuf {
        PathBuf::from(&self.personas.data_file)
    }

    /// Deadline for one persona's review call
    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation.timeout_secs)
    }

    /// Backend defaults handed to the factory
    pub fn backend_defaults(&self) -> BackendDefaults {
        BackendDefaults {
            gemini: self.gemini.clone(),
            openai: self.openai.clone(),
            mock: MockConfig::default(),
        }
    }

    /// Overlay applied to the summary backend
    pub fn summarizer_overlay(&self) -> ModelOverlay {
        let mut overlay = ModelOverlay::new();
        if !self.summarizer.model.trim().is_empty() {
            overlay.insert("model".to_string(), self.summarizer.model.clone().into());
        }
        overlay.insert(
            "temperature".to_string(),
            f64::from(self.summarizer.temperature).into(),
        );
        overlay
    }
}

/// Expand ~ and environment variables in paths
fn expand_path(path: &str) -> String {
    shellexpand::full(path)
        .unwrap_or_else(|_| std::borrow::Cow::Borrowed(path))
        .into_owned()
}

// ─────────────────────────────────────────────────────────────────
// Config file generation
// ─────────────────────────────────────────────────────────────────

/// Default location written by `config init`
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".review-panel")
        .join("config.toml")
}

/// Initialize a new configuration file
pub fn init_config(path: Option<&str>, force: bool) -> Result<PathBuf> {
    let config_path = path
        .map(|p| PathBuf::from(expand_path(p)))
        .unwrap_or_else(default_config_path);

    if config_path.exists() && !force {
        return Err(Error::Config(format!(
            "Configuration file already exists: {}. Use --force to overwrite.",
            config_path.display()
        )));
    }

    if let Some(parent) = config_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| Error::IoWrite {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
    }

    fs::write(&config_path, generate_default_config()).map_err(|e| Error::IoWrite {
        path: config_path.clone(),
        source: e,
    })?;

    Ok(config_path)
}

/// Generate default configuration content with comments
fn generate_default_config() -> String {
    r#"# review-panel configuration

[personas]
# Persona family: consumer or expert
kind = "consumer"

# CSV file. Consumer columns: name, age, profession, nationality,
# salary_range, hobbies, priorities, constraints. Expert columns: name, age,
# profession, years_experience, industry_focus, expertise_areas,
# specializations
data_file = "personas.csv"

# Synthesize personas when too few records match the criteria
allow_backfill = true

# Fixed RNG seed for reproducible selections
# seed = 42

[generation]
# Review backend: gemini, openai, mock
backend = "gemini"

# Credential for the review backend (or set REVIEW_PANEL_API_KEY)
# api_key = ""

# Deadline for each persona's review call (seconds)
timeout_secs = 120

# Persona reviews in flight at once (1 = sequential)
max_concurrency = 1

# Panel size when --count is not given
default_count = 5

[summarizer]
# Summary backend: gemini, openai, mock
backend = "gemini"

# Empty = reuse the review credential
# api_key = ""

# Empty = the summary backend's own default_model
# model = "gemini-1.5-pro"
temperature = 0.2

[gemini]
base_url = "https://generativelanguage.googleapis.com/v1beta"
default_model = "gemini-1.5-pro"
temperature = 0.7
timeout_secs = 120
max_retries = 2
# max_tokens = 2048

[openai]
base_url = "https://api.openai.com/v1"
default_model = "gpt-4o-mini"
temperature = 0.7
timeout_secs = 120
max_retries = 2
# max_tokens = 2048

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log file path (rotated daily)
# file = "~/.review-panel/logs/review-panel.log"

# Number of rotated log files to keep
max_files = 5

# Enable JSON formatted logging
json_format = false
"#
    .to_string()
}
