//! Sleuth Core Library
//!
//! This crate provides the foundational utilities shared by every Sleuth crate:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration management (LLM, agent, retrieval and search settings)

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{AgentSettings, AppConfig, RetrievalSettings, SearchSettings};
pub use error::{AppError, AppResult};
