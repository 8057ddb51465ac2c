//! Fused lexical + semantic search.

use super::hits_from_corpus;
use crate::error::ToolError;
use crate::tool::{RetrievalTool, ToolHit};
use sleuth_retrieval::{FusionEngine, LexicalIndex, SemanticIndex};
use std::sync::Arc;

/// Each index is asked for this many times `k` candidates before fusion.
const CANDIDATE_MULTIPLIER: usize = 2;

pub struct HybridTool {
    lexical: Arc<LexicalIndex>,
    semantic: Arc<SemanticIndex>,
    fusion: FusionEngine,
    alpha: f64,
}

impl HybridTool {
    pub fn new(
        lexical: Arc<LexicalIndex>,
        semantic: Arc<SemanticIndex>,
        fusion: FusionEngine,
        alpha: f64,
    ) -> Self {
        Self {
            lexical,
            semantic,
            fusion,
            alpha,
        }
    }
}

#[async_trait::async_trait]
impl RetrievalTool for HybridTool {
    fn name(&self) -> &str {
        "hybrid"
    }

    fn description(&self) -> &str {
        "Keyword and meaning-based search fused into one ranking. A good default when unsure."
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<ToolHit>, ToolError> {
        let depth = k.saturating_mul(CANDIDATE_MULTIPLIER);

        let semantic = self
            .semantic
            .search(query, depth)
            .await
            .map_err(|e| ToolError::Backend(e.to_string()))?;
        let lexical = self.lexical.search(query, depth);

        tracing::debug!(
            semantic = semantic.len(),
            lexical = lexical.len(),
            alpha = self.alpha,
            "Fusing candidate lists"
        );

        let fused = self.fusion.fuse(&[semantic, lexical], self.alpha, k);

        Ok(hits_from_corpus(
            self.lexical.corpus(),
            fused.iter().map(|r| (r.chunk_id.as_str(), r.fused_score)),
        ))
    }
}
