//! Error types for Sleuth.
//!
//! This module defines a unified error enum that covers the error categories
//! surfaced to callers: configuration, I/O, LLM transport, retrieval, prompt
//! rendering and agent failures.

use thiserror::Error;

/// Unified error type for Sleuth.
///
/// Library crates keep their own typed errors for the conditions the
/// reasoning loop must distinguish, and convert into `AppError` at the edge.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// LLM provider could not be reached (connection refused, transport timeout)
    #[error("LLM error: {0}")]
    Llm(String),

    /// LLM provider answered, but with an error status or an undecodable body
    #[error("LLM reply error: {0}")]
    LlmReply(String),

    /// Corpus, index and fusion errors
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Reasoning loop errors that abort a task
    #[error("Agent error: {0}")]
    Agent(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
