//! Embedding providers for the semantic index.
//!
//! The corpus and every query must be embedded by the same provider and
//! model, so a single provider is created per process and shared.

pub mod config;
pub mod provider;
pub mod providers;

pub use config::EmbeddingConfig;
pub use provider::{create_provider, EmbeddingProvider};
