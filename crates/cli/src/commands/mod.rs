//! Command handlers for the Sleuth CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod ask;
pub mod prompts;
pub mod search;
pub mod tools;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use prompts::PromptsCommand;
pub use search::SearchCommand;
pub use tools::ToolsCommand;
