//! Error types for review-panel
//!
//! Provides structured error handling with:
//! - Numeric error codes grouped by pipeline stage
//! - User-friendly hints for the CLI
//! - Exit codes per error category
//!
//! Generation and summary-parse errors are recoverable inside a run; the
//! orchestrator and summarizer absorb them. Everything else is fatal to the
//! operation that raised it.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for review-panel operations
pub type Result<T> = std::result::Result<T, Error>;

/// Numeric error codes for machine parsing and documentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    // Configuration errors (1xx)
    ConfigNotFound = 100,
    ConfigParseError = 101,
    ConfigValidation = 102,

    // IO errors (2xx)
    IoRead = 200,
    IoWrite = 201,
    IoPermission = 202,
    IoNotFound = 203,

    // Persona source schema errors (3xx)
    SchemaMissingColumns = 300,
    SchemaInvalidRecord = 301,
    SchemaMalformedSource = 302,

    // Selection errors (4xx)
    SelectionFailed = 400,
    SelectionUnsatisfiable = 401,

    // Generation errors (5xx)
    GenerationFailed = 500,
    GenerationTimeout = 501,

    // Provider initialization errors (6xx)
    ProviderInitFailed = 600,
    ProviderUnsupported = 601,

    // Summary errors (7xx)
    SummaryParse = 700,

    // Internal errors (9xx)
    InternalError = 900,
    SerializationError = 901,
}

impl ErrorCode {
    /// Get the string code (e.g., "E300")
    pub fn as_str(&self) -> String {
        format!("E{}", *self as u16)
    }

    /// Get the exit code for CLI (one per hundred-block)
    pub fn exit_code(&self) -> i32 {
        match *self as u16 {
            100..=199 => 10,
            200..=299 => 20,
            300..=399 => 30,
            400..=499 => 40,
            500..=599 => 50,
            600..=699 => 60,
            700..=799 => 70,
            900..=999 => 90,
            _ => 1,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type
#[derive(Error, Debug)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Configuration parse error
    #[error("Failed to parse configuration: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<toml::de::Error>,
    },

    /// Configuration validation error
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String, field: Option<String> },

    /// Generic configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    // ─────────────────────────────────────────────────────────────
    // IO Errors
    // ─────────────────────────────────────────────────────────────

    /// File read error
    #[error("Failed to read file: {path}")]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File write error
    #[error("Failed to write file: {path}")]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    Toml(#[from] toml::ser::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // Persona Source Schema Errors
    // ─────────────────────────────────────────────────────────────

    /// Required columns are absent from the persona source
    #[error("Persona source is missing required columns: {}", columns.join(", "))]
    MissingColumns { columns: Vec<String> },

    /// A persona record failed validation
    #[error("Invalid persona record at row {row}: {message}")]
    Schema { row: usize, message: String },

    /// The tabular source could not be read
    #[error("Malformed persona source: {0}")]
    Csv(#[from] csv::Error),

    // ─────────────────────────────────────────────────────────────
    // Selection Errors
    // ─────────────────────────────────────────────────────────────

    /// Selection failed (e.g. empty catalog during backfill)
    #[error("Persona selection failed: {0}")]
    Selection(String),

    /// A constraint can never be met
    #[error("Unsatisfiable criteria for '{field}': {message}")]
    UnsatisfiableCriteria { field: String, message: String },

    // ─────────────────────────────────────────────────────────────
    // Generation Errors
    // ─────────────────────────────────────────────────────────────

    /// A single provider call failed
    #[error("Generation failed: {message}")]
    Generation {
        persona: Option<String>,
        message: String,
    },

    /// A single provider call exceeded its deadline
    #[error("Generation timed out after {timeout_secs}s")]
    GenerationTimeout { timeout_secs: u64 },

    // ─────────────────────────────────────────────────────────────
    // Provider Initialization Errors
    // ─────────────────────────────────────────────────────────────

    /// Backend could not be constructed
    #[error("Failed to initialize {backend} backend: {message}")]
    ProviderInit { backend: String, message: String },

    /// Backend identifier is not in the supported set
    #[error("Unsupported backend '{0}'. Valid: gemini, openai, mock")]
    UnsupportedBackend(String),

    // ─────────────────────────────────────────────────────────────
    // Summary Errors
    // ─────────────────────────────────────────────────────────────

    /// Summary model output did not match the expected schema
    #[error("Failed to parse summary: {0}")]
    SummaryParse(String),

    // ─────────────────────────────────────────────────────────────
    // Internal Errors
    // ─────────────────────────────────────────────────────────────

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    // ─────────────────────────────────────────────────────────────
    // Error Classification
    // ─────────────────────────────────────────────────────────────

    /// Get the numeric error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::ConfigNotFound { .. } => ErrorCode::ConfigNotFound,
            Error::ConfigParse { .. } => ErrorCode::ConfigParseError,
            Error::ConfigValidation { .. } => ErrorCode::ConfigValidation,
            Error::Config(_) => ErrorCode::ConfigValidation,

            Error::IoRead { .. } => ErrorCode::IoRead,
            Error::IoWrite { .. } => ErrorCode::IoWrite,
            Error::Io(e) => match e.kind() {
                std::io::ErrorKind::NotFound => ErrorCode::IoNotFound,
                std::io::ErrorKind::PermissionDenied => ErrorCode::IoPermission,
                _ => ErrorCode::IoRead,
            },
            Error::Toml(_) | Error::Json(_) => ErrorCode::SerializationError,

            Error::MissingColumns { .. } => ErrorCode::SchemaMissingColumns,
            Error::Schema { .. } => ErrorCode::SchemaInvalidRecord,
            Error::Csv(_) => ErrorCode::SchemaMalformedSource,

            Error::Selection(_) => ErrorCode::SelectionFailed,
            Error::UnsatisfiableCriteria { .. } => ErrorCode::SelectionUnsatisfiable,

            Error::Generation { .. } => ErrorCode::GenerationFailed,
            Error::GenerationTimeout { .. } => ErrorCode::GenerationTimeout,

            Error::ProviderInit { .. } => ErrorCode::ProviderInitFailed,
            Error::UnsupportedBackend(_) => ErrorCode::ProviderUnsupported,

            Error::SummaryParse(_) => ErrorCode::SummaryParse,

            Error::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Errors the orchestrator absorbs per persona instead of aborting the run
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Generation { .. } | Error::GenerationTimeout { .. } | Error::SummaryParse(_)
        )
    }

    /// Get the exit code for CLI
    pub fn exit_code(&self) -> i32 {
        self.code().exit_code()
    }

    // ─────────────────────────────────────────────────────────────
    // User-Friendly Messages
    // ─────────────────────────────────────────────────────────────

    /// Get a user-friendly suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::ConfigNotFound { .. } => Some(
                "Run 'review-panel config init' to create a default configuration file."
            ),
            Error::ConfigParse { .. } => Some(
                "Check your configuration file syntax. Run 'review-panel config validate' to see details."
            ),
            Error::ConfigValidation { .. } => Some(
                "Review the configuration file and fix the invalid values."
            ),

            Error::MissingColumns { .. } => Some(
                "The persona file needs the columns: name, age, profession, nationality, salary_range, hobbies, priorities, constraints."
            ),
            Error::Schema { .. } => Some(
                "Fix the reported row in the persona file. Every scalar column needs a value and age must be a whole number."
            ),

            Error::UnsatisfiableCriteria { .. } => Some(
                "Lower the minimum match count or add more desired values."
            ),
            Error::Selection(_) => Some(
                "Check the selection criteria against 'review-panel personas catalog'."
            ),

            Error::ProviderInit { .. } => Some(
                "Verify the API key and the --set overrides for the chosen backend."
            ),
            Error::UnsupportedBackend(_) => Some(
                "Use one of: gemini, openai, mock."
            ),

            _ => None,
        }
    }

    /// Format the error for terminal display with colors
    pub fn format_for_terminal(&self) -> String {
        let mut output = format!(
            "\x1b[31mError [{}]\x1b[0m: {}\n",
            self.code().as_str(),
            self
        );

        if let Some(hint) = self.suggestion() {
            output.push_str(&format!("\n\x1b[33mHint\x1b[0m: {}\n", hint));
        }

        output
    }

    /// Format the error for logging (no colors)
    pub fn format_for_log(&self) -> String {
        format!("[{}] {}", self.code().as_str(), self)
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    /// Create a config validation error with field name
    pub fn config_field_invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ConfigValidation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a schema error for a 1-based data row
    pub fn schema(row: usize, message: impl Into<String>) -> Self {
        Error::Schema {
            row,
            message: message.into(),
        }
    }

    /// Create an unsatisfiable-criteria error
    pub fn unsatisfiable(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::UnsatisfiableCriteria {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a generation error not yet tied to a persona
    pub fn generation(message: impl Into<String>) -> Self {
        Error::Generation {
            persona: None,
            message: message.into(),
        }
    }

    /// Create a provider initialization error
    pub fn provider_init(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ProviderInit {
            backend: backend.into(),
            message: message.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
