//! Prompt loader for YAML prompt definitions.

use crate::defaults;
use crate::types::PromptDefinition;
use serde::Serialize;
use sleuth_core::{AppError, AppResult};
use std::path::{Path, PathBuf};

/// Where a prompt definition came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptOrigin {
    /// Compiled into the binary
    Builtin,

    /// `.sleuth/prompts/<id>.yml` in the workspace
    Workspace,
}

/// A prompt id together with the definition that wins for it.
#[derive(Debug, Clone, Serialize)]
pub struct PromptListing {
    pub id: String,
    pub origin: PromptOrigin,
}

/// Load a prompt definition by ID.
///
/// A workspace file named `<id>.yml` in `.sleuth/prompts/` takes precedence
/// over the built-in definition with the same id.
///
/// # Example
/// ```no_run
/// use sleuth_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), "agent.judge")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = prompts_dir(workspace_path).join(format!("{}.yml", prompt_id));

    let definition = if prompt_file.exists() {
        tracing::debug!("Loading prompt override from: {:?}", prompt_file);

        let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
            AppError::Prompt(format!(
                "Failed to read prompt file {:?}: {}",
                prompt_file, e
            ))
        })?;

        serde_yaml::from_str::<PromptDefinition>(&contents).map_err(|e| {
            AppError::Prompt(format!(
                "Failed to parse prompt YAML {:?}: {}",
                prompt_file, e
            ))
        })?
    } else {
        let source = defaults::builtin_source(prompt_id).ok_or_else(|| {
            AppError::Prompt(format!(
                "Prompt '{}' is neither built in nor present at {:?}",
                prompt_id, prompt_file
            ))
        })?;

        serde_yaml::from_str::<PromptDefinition>(source).map_err(|e| {
            AppError::Prompt(format!("Built-in prompt '{}' is invalid: {}", prompt_id, e))
        })?
    };

    validate_prompt(&definition)?;

    if definition.id != prompt_id {
        return Err(AppError::Prompt(format!(
            "Prompt file for '{}' declares id '{}'",
            prompt_id, definition.id
        )));
    }

    tracing::debug!("Loaded prompt: {} ({})", definition.id, definition.title);

    Ok(definition)
}

/// List built-in prompts and workspace overrides.
pub fn list_prompts(workspace_path: &Path) -> AppResult<Vec<PromptListing>> {
    let mut listings: Vec<PromptListing> = defaults::builtin_ids()
        .iter()
        .map(|id| PromptListing {
            id: id.to_string(),
            origin: PromptOrigin::Builtin,
        })
        .collect();

    let dir = prompts_dir(workspace_path);
    if !dir.exists() {
        return Ok(listings);
    }

    for entry in walkdir::WalkDir::new(&dir)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("yml") {
            continue;
        }

        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            match listings.iter_mut().find(|l| l.id == stem) {
                Some(existing) => existing.origin = PromptOrigin::Workspace,
                None => listings.push(PromptListing {
                    id: stem.to_string(),
                    origin: PromptOrigin::Workspace,
                }),
            }
        }
    }

    Ok(listings)
}

fn prompts_dir(workspace_path: &Path) -> PathBuf {
    workspace_path.join(".sleuth").join("prompts")
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    Ok(())
}
