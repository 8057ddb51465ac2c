//! Prompts command handler.

use clap::Args;
use sleuth_core::{config::AppConfig, AppError, AppResult};
use sleuth_prompt::{list_prompts, PromptOrigin};

/// List prompt definitions and workspace overrides
#[derive(Args, Debug)]
pub struct PromptsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl PromptsCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let listings = list_prompts(&config.workspace)?;

        if self.json {
            let json = serde_json::to_string_pretty(&listings)
                .map_err(|e| AppError::Serialization(e.to_string()))?;
            println!("{}", json);
            return Ok(());
        }

        for listing in listings {
            let origin = match listing.origin {
                PromptOrigin::Builtin => "built-in",
                PromptOrigin::Workspace => "workspace",
            };
            println!("{:<20} {}", listing.id, origin);
        }

        Ok(())
    }
}
