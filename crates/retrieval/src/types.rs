//! Retrieval type definitions.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Immutable unit of retrievable evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    /// Unique chunk identifier
    pub id: String,

    /// Text content
    pub text: String,

    /// Where the text came from (file path, URL)
    pub source_uri: String,

    /// Embedding vector in the corpus embedding space
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,

    /// Term statistics, computed when the corpus is built
    #[serde(skip)]
    pub term_stats: Option<TermStats>,
}

impl Chunk {
    /// Create a chunk without embedding or term statistics.
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        source_uri: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            source_uri: source_uri.into(),
            embedding: None,
            term_stats: None,
        }
    }

    /// Attach a precomputed embedding.
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }
}

/// Term frequencies and token length of a chunk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TermStats {
    pub term_freqs: HashMap<String, u32>,
    pub length: u32,
}

impl TermStats {
    /// Count the tokens of a text.
    pub fn from_text(text: &str) -> Self {
        let tokens = crate::text::tokenize(text);
        let mut term_freqs = HashMap::new();
        for token in &tokens {
            *term_freqs.entry(token.clone()).or_insert(0) += 1;
        }

        Self {
            term_freqs,
            length: tokens.len() as u32,
        }
    }
}

/// A retrieval method that produces ranked lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalMethod {
    Semantic,
    Lexical,
    Web,
}

impl RetrievalMethod {
    /// All methods in declaration order.
    pub const ALL: [RetrievalMethod; 3] = [Self::Semantic, Self::Lexical, Self::Web];

    /// Parse a method name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "semantic" => Some(Self::Semantic),
            "lexical" => Some(Self::Lexical),
            "web" => Some(Self::Web),
            _ => None,
        }
    }

    /// Get the canonical method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Semantic => "semantic",
            Self::Lexical => "lexical",
            Self::Web => "web",
        }
    }
}

impl fmt::Display for RetrievalMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of a single retrieval method for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedCandidate {
    pub chunk_id: String,
    pub method: RetrievalMethod,
    /// 0-based position in the method's list
    pub rank: usize,
    pub raw_score: f64,
}

/// Output of the fusion engine. Ordering is the contract, not the magnitude.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FusedResult {
    pub chunk_id: String,
    pub fused_score: f64,
}
