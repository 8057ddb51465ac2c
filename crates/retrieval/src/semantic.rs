//! Cosine-similarity index over chunk embeddings.

use crate::corpus::Corpus;
use crate::embeddings::EmbeddingProvider;
use crate::types::{RankedCandidate, RetrievalMethod};
use sleuth_core::{AppError, AppResult};
use std::sync::Arc;

/// Brute-force vector index.
///
/// Vectors are normalized once at build time so a search is a dot product
/// per chunk. Chunks without an embedding are not searchable.
#[derive(Debug)]
pub struct SemanticIndex {
    corpus: Arc<Corpus>,
    provider: Arc<dyn EmbeddingProvider>,
    /// (chunk position, unit vector)
    vectors: Vec<(usize, Vec<f32>)>,
}

impl SemanticIndex {
    /// Build the index. Every stored embedding must match the provider's
    /// dimensions, since queries are embedded by that provider.
    pub fn build(corpus: Arc<Corpus>, provider: Arc<dyn EmbeddingProvider>) -> AppResult<Self> {
        let dimensions = provider.dimensions();
        let mut vectors = Vec::with_capacity(corpus.len());
        let mut skipped = 0usize;

        for (position, chunk) in corpus.chunks().iter().enumerate() {
            let Some(embedding) = &chunk.embedding else {
                skipped += 1;
                continue;
            };

            if embedding.len() != dimensions {
                return Err(AppError::Retrieval(format!(
                    "Chunk '{}' has a {}-dimensional embedding but provider '{}' produces {}",
                    chunk.id,
                    embedding.len(),
                    provider.provider_name(),
                    dimensions
                )));
            }

            if let Some(unit) = normalize(embedding) {
                vectors.push((position, unit));
            } else {
                skipped += 1;
            }
        }

        if skipped > 0 {
            tracing::warn!(
                skipped,
                "Chunks without a usable embedding are excluded from semantic search"
            );
        }

        Ok(Self {
            corpus,
            provider,
            vectors,
        })
    }

    /// Embed the query and return up to `k` chunks by cosine similarity.
    pub async fn search(&self, query: &str, k: usize) -> AppResult<Vec<RankedCandidate>> {
        if k == 0 || self.vectors.is_empty() || query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self.provider.embed(query).await?;
        Ok(self.search_vector(&query_vector, k))
    }

    /// Rank chunks against an already-embedded query.
    ///
    /// Only positive similarities count as matches. Equal similarities are
    /// ordered by corpus position.
    pub fn search_vector(&self, query_vector: &[f32], k: usize) -> Vec<RankedCandidate> {
        let Some(query) = normalize(query_vector) else {
            return Vec::new();
        };

        let mut scored: Vec<(usize, f64)> = self
            .vectors
            .iter()
            .filter(|(_, v)| v.len() == query.len())
            .map(|(position, v)| (*position, dot(&query, v)))
            .filter(|(_, similarity)| *similarity > 0.0)
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);

        let chunks = self.corpus.chunks();
        scored
            .into_iter()
            .enumerate()
            .map(|(rank, (position, similarity))| RankedCandidate {
                chunk_id: chunks[position].id.clone(),
                method: RetrievalMethod::Semantic,
                rank,
                raw_score: similarity,
            })
            .collect()
    }

    /// Number of searchable chunks.
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn corpus(&self) -> &Arc<Corpus> {
        &self.corpus
    }
}

fn normalize(v: &[f32]) -> Option<Vec<f32>> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 && norm.is_finite() {
        Some(v.iter().map(|x| x / norm).collect())
    } else {
        None
    }
}

fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (*x as f64) * (*y as f64)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::trigram::TrigramProvider;
    use crate::types::Chunk;

    fn vector_index(chunks: Vec<Chunk>, dims: usize) -> SemanticIndex {
        let corpus = Arc::new(Corpus::new(chunks).unwrap());
        SemanticIndex::build(corpus, Arc::new(TrigramProvider::new(dims))).unwrap()
    }

    #[test]
    fn test_search_vector_orders_by_cosine() {
        let idx = vector_index(
            vec![
                Chunk::new("x", "", "x").with_embedding(vec![1.0, 0.0, 0.0]),
                Chunk::new("xy", "", "xy").with_embedding(vec![1.0, 1.0, 0.0]),
                Chunk::new("z", "", "z").with_embedding(vec![0.0, 0.0, 1.0]),
            ],
            3,
        );

        let results = idx.search_vector(&[2.0, 0.1, 0.0], 5);
        let ids: Vec<&str> = results.iter().map(|r| r.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["x", "xy"]);
        assert_eq!(results[0].method, RetrievalMethod::Semantic);
        assert_eq!(results[1].rank, 1);
        assert!(results[0].raw_score > results[1].raw_score);
    }

    #[test]
    fn test_equal_similarity_keeps_corpus_order() {
        let idx = vector_index(
            vec![
                Chunk::new("second", "", "s").with_embedding(vec![0.0, 1.0]),
                Chunk::new("first", "", "f").with_embedding(vec![0.0, 3.0]),
            ],
            2,
        );

        let results = idx.search_vector(&[0.0, 1.0], 5);
        assert_eq!(results[0].chunk_id, "second");
        assert_eq!(results[1].chunk_id, "first");
    }

    #[test]
    fn test_chunks_without_embeddings_skipped() {
        let idx = vector_index(
            vec![
                Chunk::new("a", "", "a").with_embedding(vec![1.0, 0.0]),
                Chunk::new("b", "no vector", "b"),
                Chunk::new("c", "", "c").with_embedding(vec![0.0, 0.0]),
            ],
            2,
        );
        assert_eq!(idx.len(), 1);
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let corpus = Arc::new(
            Corpus::new(vec![Chunk::new("a", "", "a").with_embedding(vec![1.0, 0.0])]).unwrap(),
        );
        let err = SemanticIndex::build(corpus, Arc::new(TrigramProvider::new(3))).unwrap_err();
        assert!(err.to_string().contains("2-dimensional"));
    }

    #[test]
    fn test_zero_query_vector_matches_nothing() {
        let idx = vector_index(
            vec![Chunk::new("a", "", "a").with_embedding(vec![1.0, 0.0])],
            2,
        );
        assert!(idx.search_vector(&[0.0, 0.0], 5).is_empty());
    }

    #[tokio::test]
    async fn test_search_embeds_query() {
        let provider = TrigramProvider::new(256);
        let texts = [
            ("own", "ownership rules move semantics"),
            ("bread", "sourdough bread baking"),
        ];

        let mut chunks = Vec::new();
        for (id, text) in texts {
            let embedding = provider.embed(text).await.unwrap();
            chunks.push(Chunk::new(id, text, id).with_embedding(embedding));
        }

        let idx = vector_index(chunks, 256);
        let results = idx.search("ownership semantics", 1).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk_id, "own");
    }
}
