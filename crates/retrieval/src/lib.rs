//! Retrieval primitives for Sleuth.
//!
//! Everything in this crate is read-only once built: a [`Corpus`] is loaded
//! once, wrapped in an `Arc`, and shared by the indices. Searches take `&self`
//! and keep no scratch state, so any number of tasks can query concurrently.
//!
//! - [`lexical::LexicalIndex`] - BM25 term scoring
//! - [`semantic::SemanticIndex`] - cosine similarity over chunk embeddings
//! - [`fusion::FusionEngine`] - weighted reciprocal rank fusion
//! - [`embeddings`] - embedding providers used by the semantic index

pub mod corpus;
pub mod embeddings;
pub mod fusion;
pub mod lexical;
pub mod semantic;
pub mod text;
pub mod types;

pub use corpus::Corpus;
pub use embeddings::{create_provider, EmbeddingConfig, EmbeddingProvider};
pub use fusion::FusionEngine;
pub use lexical::{Bm25Params, LexicalIndex};
pub use semantic::SemanticIndex;
pub use types::{Chunk, FusedResult, RankedCandidate, RetrievalMethod, TermStats};
