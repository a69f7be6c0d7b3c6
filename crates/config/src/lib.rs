//! Configuration management for the totem voice backend
//!
//! Supports loading configuration from:
//! - TOML files
//! - Environment variables (TOTEM_ prefix, `__` section separator)
//!
//! API keys are expected from the environment
//! (`TOTEM_TRANSCRIBER__API_KEY`, `TOTEM_LLM__API_KEY`, ...); everything
//! else has workable defaults.

pub mod lexicon;
pub mod prompts;
pub mod settings;

pub use lexicon::{pronunciation_lexicon, LexiconEntry};
pub use prompts::{
    find_predefined_question, predefined_questions, PredefinedQuestion, CONTEXT_PREAMBLE,
    DEFAULT_SYSTEM_PROMPT, GENERATION_FALLBACK_TEXT, GREETING_RESPONSE, INTERNAL_ERROR_TEXT,
    NO_RESULTS_TEXT, SEARCH_FALLBACK_TEXT,
};
pub use settings::{
    load_settings, CallSettings, KeyPresence, LlmSettings, SearchSettings, ServerSettings,
    Settings, SilenceSettings, TranscriberSettings, TtsSettings,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
