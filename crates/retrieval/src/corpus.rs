//! Chunk corpus loading.
//!
//! The corpus is a JSON Lines file with one chunk per line:
//!
//! ```text
//! {"id": "own-1", "text": "Each value has an owner.", "sourceUri": "book/ch04.md"}
//! {"id": "own-2", "text": "...", "sourceUri": "...", "embedding": [0.1, 0.2]}
//! ```

use crate::embeddings::EmbeddingProvider;
use crate::types::{Chunk, TermStats};
use sleuth_core::{AppError, AppResult};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Immutable, ordered collection of chunks.
///
/// Order is the load order and is used as the final tie-breaker by the
/// indices, so a given corpus always ranks the same way.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    chunks: Vec<Arc<Chunk>>,
    positions: HashMap<String, usize>,
}

impl Corpus {
    /// Build a corpus, computing term statistics for every chunk.
    ///
    /// Fails on empty or duplicate chunk ids.
    pub fn new(chunks: Vec<Chunk>) -> AppResult<Self> {
        let mut positions = HashMap::with_capacity(chunks.len());
        let mut stored = Vec::with_capacity(chunks.len());

        for (position, mut chunk) in chunks.into_iter().enumerate() {
            if chunk.id.trim().is_empty() {
                return Err(AppError::Retrieval(format!(
                    "Chunk at position {} has an empty id",
                    position
                )));
            }

            if positions.insert(chunk.id.clone(), position).is_some() {
                return Err(AppError::Retrieval(format!(
                    "Duplicate chunk id '{}'",
                    chunk.id
                )));
            }

            chunk.term_stats = Some(TermStats::from_text(&chunk.text));
            stored.push(Arc::new(chunk));
        }

        Ok(Self {
            chunks: stored,
            positions,
        })
    }

    /// Load a corpus from a JSON Lines file. Blank lines are ignored.
    pub fn load_jsonl(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            return Err(AppError::Retrieval(format!(
                "Corpus file not found: {:?}. Set retrieval.corpusPath or pass --corpus",
                path
            )));
        }

        let contents = std::fs::read_to_string(path)?;
        let mut chunks = Vec::new();

        for (line_no, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            let chunk: Chunk = serde_json::from_str(line).map_err(|e| {
                AppError::Retrieval(format!(
                    "Invalid chunk on line {} of {:?}: {}",
                    line_no + 1,
                    path,
                    e
                ))
            })?;
            chunks.push(chunk);
        }

        let corpus = Self::new(chunks)?;
        tracing::info!(
            chunks = corpus.len(),
            embedded = corpus.embedded_count(),
            "Loaded corpus from {:?}",
            path
        );

        Ok(corpus)
    }

    /// Return a corpus where every chunk lacking an embedding has one.
    ///
    /// Chunks that already carry an embedding are left untouched.
    pub async fn embed_missing(self, provider: &dyn EmbeddingProvider) -> AppResult<Self> {
        let missing: Vec<usize> = self
            .chunks
            .iter()
            .enumerate()
            .filter(|(_, c)| c.embedding.is_none())
            .map(|(i, _)| i)
            .collect();

        if missing.is_empty() {
            return Ok(self);
        }

        tracing::info!(
            count = missing.len(),
            provider = provider.provider_name(),
            model = provider.model_name(),
            "Embedding chunks without vectors"
        );

        let texts: Vec<String> = missing.iter().map(|&i| self.chunks[i].text.clone()).collect();
        let vectors = provider.embed_batch(&texts).await?;

        if vectors.len() != missing.len() {
            return Err(AppError::Retrieval(format!(
                "Embedding provider returned {} vectors for {} chunks",
                vectors.len(),
                missing.len()
            )));
        }

        let mut chunks = self.chunks;
        for (index, vector) in missing.into_iter().zip(vectors) {
            let mut chunk = (*chunks[index]).clone();
            chunk.embedding = Some(vector);
            chunks[index] = Arc::new(chunk);
        }

        Ok(Self {
            chunks,
            positions: self.positions,
        })
    }

    /// Look up a chunk by id.
    pub fn get(&self, id: &str) -> Option<&Arc<Chunk>> {
        self.positions.get(id).map(|&i| &self.chunks[i])
    }

    pub fn chunks(&self) -> &[Arc<Chunk>] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Number of chunks carrying an embedding.
    pub fn embedded_count(&self) -> usize {
        self.chunks.iter().filter(|c| c.embedding.is_some()).count()
    }
}
