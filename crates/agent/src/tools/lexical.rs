//! BM25 keyword search over the local corpus.

use super::{candidate_pairs, hits_from_corpus};
use crate::error::ToolError;
use crate::tool::{RetrievalTool, ToolHit};
use sleuth_retrieval::LexicalIndex;
use std::sync::Arc;

pub struct LexicalTool {
    index: Arc<LexicalIndex>,
}

impl LexicalTool {
    pub fn new(index: Arc<LexicalIndex>) -> Self {
        Self { index }
    }
}

#[async_trait::async_trait]
impl RetrievalTool for LexicalTool {
    fn name(&self) -> &str {
        "lexical"
    }

    fn description(&self) -> &str {
        "Keyword (BM25) search over the local corpus. Best for exact terms, identifiers, error codes and names."
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<ToolHit>, ToolError> {
        let ranked = self.index.search(query, k);
        Ok(hits_from_corpus(self.index.corpus(), candidate_pairs(&ranked)))
    }
}
