//! Backend module for text generation
//!
//! This module provides the core abstraction for generation backends and
//! implementations for the supported providers.

mod gemini;
mod http;
mod mock;
mod openai;
mod registry;
mod traits;

pub use gemini::{GeminiBackend, GeminiConfig};
pub use mock::{MockBackend, MockConfig, SUMMARY_PROMPT_MARKER};
pub use openai::{OpenAiBackend, OpenAiConfig};
pub use registry::*;
pub use traits::*;
