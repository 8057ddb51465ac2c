//! Retrieval tool abstraction.

use crate::error::ToolError;
use serde::{Deserialize, Serialize};

/// Raw result of a tool call, before the loop stamps provenance on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolHit {
    pub chunk_id: String,
    pub text: String,
    pub source_uri: String,
    /// Tool-specific relevance, higher is better
    pub score: f64,
}

/// Name and description shown to the planner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
}

/// Tool trait that every evidence source implements.
///
/// The reasoning loop only ever sees this trait; a tool's identity to the
/// loop is its name.
#[async_trait::async_trait]
pub trait RetrievalTool: Send + Sync {
    /// Unique registry name
    fn name(&self) -> &str;

    /// One-line description for the planner
    fn description(&self) -> &str;

    /// Return up to `k` hits for `query`, best first.
    ///
    /// An empty list means nothing matched. Failures must be reported as
    /// errors, never as partial results.
    async fn search(&self, query: &str, k: usize) -> Result<Vec<ToolHit>, ToolError>;

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name().to_string(),
            description: self.description().to_string(),
        }
    }
}
