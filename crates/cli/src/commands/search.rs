//! Search command handler.
//!
//! Calls one retrieval tool directly, bypassing the reasoning loop.

use crate::runtime;
use clap::Args;
use sleuth_agent::RetrievalTool;
use sleuth_core::{config::AppConfig, AppError, AppResult};

/// Run a single retrieval tool directly
#[derive(Args, Debug)]
pub struct SearchCommand {
    /// Search query
    pub query: String,

    /// Tool to call (see `sleuth tools`)
    #[arg(short, long, default_value = "hybrid")]
    pub tool: String,

    /// Number of results (default: agent.topK)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Fusion alpha for the hybrid tool
    #[arg(long)]
    pub alpha: Option<f64>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl SearchCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::debug!("Search command options: {:?}", self);

        let config = config.clone().with_agent_overrides(None, self.alpha, self.top_k);
        config.validate()?;

        let registry = runtime::build_registry(&config).await?;
        let tool = registry.get(&self.tool)?;

        let hits = tool
            .search(&self.query, config.agent.top_k)
            .await
            .map_err(|e| AppError::Retrieval(format!("{} search failed: {}", self.tool, e)))?;

        tracing::info!(tool = %self.tool, results = hits.len(), "Search finished");

        if self.json {
            let json = serde_json::to_string_pretty(&hits)
                .map_err(|e| AppError::Serialization(e.to_string()))?;
            println!("{}", json);
            return Ok(());
        }

        if hits.is_empty() {
            println!("No results.");
            return Ok(());
        }

        for (rank, hit) in hits.iter().enumerate() {
            println!("{}. [{}] {} (score {:.4})", rank + 1, hit.chunk_id, hit.source_uri, hit.score);
            println!("   {}", preview(&hit.text));
        }

        Ok(())
    }
}

const PREVIEW_CHARS: usize = 160;

fn preview(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= PREVIEW_CHARS {
        return flat;
    }
    let cut: String = flat.chars().take(PREVIEW_CHARS).collect();
    format!("{}...", cut.trim_end())
}
