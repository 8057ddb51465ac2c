//! Reasoning capabilities consumed by the loop.
//!
//! Implementations are injected into [`ReasoningAgent`](crate::ReasoningAgent)
//! at construction. The loop applies timeouts and fail-closed coercion, so
//! implementations only report what happened.

use crate::error::CapabilityError;
use crate::tool::ToolDescriptor;
use crate::types::{Attempt, EvidenceRecord, PlannedStep, Verdict};

/// Everything the planner sees when choosing the next step.
#[derive(Debug, Clone, Copy)]
pub struct PlanningContext<'a> {
    pub question: &'a str,
    pub attempts: &'a [Attempt],
    pub tools: &'a [ToolDescriptor],
    /// Judge feedback or a note about a rejected proposal
    pub feedback: Option<&'a str>,
}

impl PlanningContext<'_> {
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }
}

/// Picks the next tool and query.
#[async_trait::async_trait]
pub trait Planner: Send + Sync {
    async fn plan(&self, context: PlanningContext<'_>) -> Result<PlannedStep, CapabilityError>;
}

/// Scores the accumulated evidence against the question.
#[async_trait::async_trait]
pub trait Judge: Send + Sync {
    /// Return a verdict. Out-of-range scores are coerced by the caller.
    async fn evaluate(
        &self,
        question: &str,
        evidence: &[EvidenceRecord],
    ) -> Result<Verdict, CapabilityError>;
}

/// Input for answer generation.
#[derive(Debug, Clone, Copy)]
pub struct SynthesisRequest<'a> {
    pub question: &'a str,
    /// Rendered evidence block, one tagged item per chunk
    pub context: &'a str,
    /// Evidence ordered by iteration
    pub evidence: &'a [&'a EvidenceRecord],
    pub low_confidence: bool,
}

/// Unvalidated generator output.
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    pub answer: String,
    /// `None` when the generator gave no structured citation list
    pub citations: Option<Vec<String>>,
}

/// Writes the answer text and names the chunks it relied on.
#[async_trait::async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(&self, request: SynthesisRequest<'_>) -> Result<Draft, CapabilityError>;
}
