//! Prompt system for Sleuth.
//!
//! This crate provides structured prompt management for the language-model
//! capabilities (planner, judge, synthesizer):
//! - YAML-based prompt definitions with built-in defaults
//! - Workspace overrides in `.sleuth/prompts/<id>.yml`
//! - Handlebars template rendering

pub mod builder;
pub mod defaults;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use defaults::{JUDGE_PROMPT_ID, PLANNER_PROMPT_ID, SYNTHESIZER_PROMPT_ID};
pub use loader::{list_prompts, load_prompt, PromptListing, PromptOrigin};
pub use types::{
    BuiltPrompt, BuiltPromptMetadata, PromptBehavior, PromptDefinition, PromptInputSpec,
    PromptOutputSpec,
};
