//! Error types shared across the backend

use thiserror::Error;

/// Errors surfaced by provider-facing collaborators.
///
/// Everything here is recoverable at the call level: the orchestrator
/// converts these into error events instead of letting them tear down a
/// session.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Transcriber error: {0}")]
    Transcriber(String),

    #[error("Knowledge search error: {0}")]
    Search(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Speech synthesis error: {0}")]
    Synthesis(String),

    #[error("{what} timed out after {seconds}s")]
    Timeout { what: &'static str, seconds: u64 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Create a timeout error for a named operation
    pub fn timeout(what: &'static str, seconds: u64) -> Self {
        Error::Timeout { what, seconds }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
