//! Retrieval tools exposed to the planner.
//!
//! Registration order at startup is `semantic`, `lexical`, `hybrid`, then
//! `web` when an external search endpoint is configured.

pub mod hybrid;
pub mod lexical;
pub mod semantic;
pub mod web;

pub use hybrid::HybridTool;
pub use lexical::LexicalTool;
pub use semantic::SemanticTool;
pub use web::WebSearchTool;

use crate::tool::ToolHit;
use sleuth_retrieval::{Corpus, RankedCandidate};

/// Resolve ranked chunk ids to hits with text and source.
pub(crate) fn hits_from_corpus<'a, I>(corpus: &Corpus, ranked: I) -> Vec<ToolHit>
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    ranked
        .into_iter()
        .filter_map(|(id, score)| {
            corpus.get(id).map(|chunk| ToolHit {
                chunk_id: chunk.id.clone(),
                text: chunk.text.clone(),
                source_uri: chunk.source_uri.clone(),
                score,
            })
        })
        .collect()
}

pub(crate) fn candidate_pairs(candidates: &[RankedCandidate]) -> impl Iterator<Item = (&str, f64)> {
    candidates
        .iter()
        .map(|c| (c.chunk_id.as_str(), c.raw_score))
}
