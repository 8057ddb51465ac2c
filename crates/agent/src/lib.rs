//! Sleuth reasoning agent.
//!
//! A bounded Plan → Act → Observe → Reflect loop over a closed set of
//! retrieval tools, followed by cited answer synthesis.
//!
//! The loop never talks to a model directly. It is handed a [`Planner`], a
//! [`Judge`] and a [`Synthesizer`] at construction; [`llm`] provides the
//! model-backed implementations and the scenario tests provide scripted ones.

pub mod agent;
pub mod capabilities;
pub mod error;
pub mod guard;
pub mod llm;
pub mod registry;
pub mod report;
pub mod retry;
pub mod rewriter;
pub mod synthesis;
pub mod tool;
pub mod tools;
pub mod types;

#[cfg(test)]
mod tests;

pub use agent::{AgentOptions, ReasoningAgent, TaskRequest};
pub use capabilities::{Judge, PlanningContext, Planner, Synthesizer};
pub use error::{AgentError, CapabilityError, ToolError};
pub use registry::{ToolRegistry, ToolRegistryBuilder};
pub use report::{AttemptSummary, TaskReport};
pub use retry::RetryPolicy;
pub use rewriter::{FollowUpRewriter, PassthroughRewriter, QueryRewriter};
pub use synthesis::AnswerSynthesizer;
pub use tool::{RetrievalTool, ToolDescriptor, ToolHit};
pub use types::{
    Attempt, Citation, Completion, EvidenceRecord, EvidenceSet, PlannedStep, SynthesizedAnswer,
    TaskPhase, Verdict,
};
