//! Tools command handler.

use crate::runtime;
use clap::Args;
use sleuth_core::{config::AppConfig, AppError, AppResult};

/// List registered retrieval tools
#[derive(Args, Debug)]
pub struct ToolsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ToolsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let registry = runtime::build_registry(config).await?;
        let descriptors = registry.descriptors();

        if self.json {
            let output: Vec<serde_json::Value> = descriptors
                .iter()
                .map(|d| serde_json::json!({ "name": d.name, "description": d.description }))
                .collect();
            let json = serde_json::to_string_pretty(&output)
                .map_err(|e| AppError::Serialization(e.to_string()))?;
            println!("{}", json);
        } else {
            for descriptor in descriptors {
                println!("{:<10} {}", descriptor.name, descriptor.description);
            }
        }

        Ok(())
    }
}
