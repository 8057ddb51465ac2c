//! Embedding configuration.

use serde::{Deserialize, Serialize};
use sleuth_core::RetrievalSettings;

/// Settings needed to construct an embedding provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "trigram" or "ollama"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Base URL for HTTP providers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            endpoint: None,
        }
    }
}

impl EmbeddingConfig {
    /// Build from the retrieval section of the app config.
    ///
    /// `model` is the resolved embedding model, if one is configured; otherwise
    /// the provider's default is used. `endpoint` is the LLM provider endpoint,
    /// reused for HTTP embedders.
    pub fn from_settings(
        settings: &RetrievalSettings,
        model: Option<&str>,
        endpoint: Option<&str>,
    ) -> Self {
        let provider = settings.embedding_provider.clone();
        let model = model
            .map(str::to_string)
            .unwrap_or_else(|| default_model(&provider).to_string());

        Self {
            provider,
            model,
            dimensions: settings.embedding_dimensions,
            endpoint: endpoint.map(str::to_string),
        }
    }
}

fn default_model(provider: &str) -> &'static str {
    match provider.to_lowercase().as_str() {
        "ollama" => "nomic-embed-text",
        _ => "trigram-v1",
    }
}
