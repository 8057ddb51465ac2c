use super::{parse_reply, PromptedCall};
use crate::capabilities::{Planner, PlanningContext};
use crate::error::CapabilityError;
use crate::types::{Attempt, PlannedStep};
use serde::Deserialize;
use sleuth_core::AppResult;
use sleuth_llm::LlmClient;
use sleuth_prompt::PLANNER_PROMPT_ID;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct PlanReply {
    tool: String,
    query: String,
    #[serde(default)]
    rationale: String,
}

/// Planner backed by the `agent.plan` prompt.
#[derive(Clone)]
pub struct LlmPlanner {
    call: PromptedCall,
}

impl LlmPlanner {
    pub fn new(client: Arc<dyn LlmClient>, model: &str, workspace: &Path) -> AppResult<Self> {
        Ok(Self {
            call: PromptedCall::load(client, model, workspace, PLANNER_PROMPT_ID)?,
        })
    }
}

#[async_trait::async_trait]
impl Planner for LlmPlanner {
    async fn plan(&self, context: PlanningContext<'_>) -> Result<PlannedStep, CapabilityError> {
        let mut variables = HashMap::new();
        variables.insert("question".to_string(), context.question.to_string());
        variables.insert(
            "tools".to_string(),
            context
                .tools
                .iter()
                .map(|t| format!("- {}: {}", t.name, t.description))
                .collect::<Vec<_>>()
                .join("\n"),
        );
        variables.insert("attempts".to_string(), render_attempts(context.attempts));
        if let Some(feedback) = context.feedback {
            variables.insert("feedback".to_string(), feedback.to_string());
        }

        let reply = self.call.complete(variables).await?;
        let parsed: PlanReply = parse_reply(&reply)?;

        Ok(PlannedStep {
            tool: parsed.tool.trim().to_string(),
            query: parsed.query.trim().to_string(),
            rationale: parsed.rationale.trim().to_string(),
        })
    }
}

fn render_attempts(attempts: &[Attempt]) -> String {
    if attempts.is_empty() {
        return "(none yet)".to_string();
    }

    attempts
        .iter()
        .map(|a| {
            let outcome = match &a.error {
                Some(error) => format!("failed: {}", error),
                None => format!("{} results ({} new)", a.evidence.len(), a.new_evidence),
            };
            let missing = a
                .verdict
                .missing
                .as_deref()
                .map(|m| format!("; missing: {}", m))
                .unwrap_or_default();

            format!(
                "{}. tool={} query=\"{}\" -> {}; judge {}/10: {}{}",
                a.iteration, a.tool, a.query, outcome, a.verdict.score, a.verdict.rationale, missing
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
