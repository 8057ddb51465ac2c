//! Embedding similarity search over the local corpus.

use super::{candidate_pairs, hits_from_corpus};
use crate::error::ToolError;
use crate::tool::{RetrievalTool, ToolHit};
use sleuth_retrieval::SemanticIndex;
use std::sync::Arc;

pub struct SemanticTool {
    index: Arc<SemanticIndex>,
}

impl SemanticTool {
    pub fn new(index: Arc<SemanticIndex>) -> Self {
        Self { index }
    }
}

#[async_trait::async_trait]
impl RetrievalTool for SemanticTool {
    fn name(&self) -> &str {
        "semantic"
    }

    fn description(&self) -> &str {
        "Meaning-based (embedding) search over the local corpus. Best for conceptual or paraphrased questions."
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<ToolHit>, ToolError> {
        let ranked = self
            .index
            .search(query, k)
            .await
            .map_err(|e| ToolError::Backend(e.to_string()))?;

        Ok(hits_from_corpus(self.index.corpus(), candidate_pairs(&ranked)))
    }
}
