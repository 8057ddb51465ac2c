//! Error types for the reasoning agent.
//!
//! Only [`AgentError`] ever leaves [`ReasoningAgent::run`](crate::ReasoningAgent::run).
//! Tool and capability failures are absorbed by the loop and show up in the
//! task trace instead.

use sleuth_core::AppError;
use thiserror::Error;

/// Failure of a retrieval tool call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    /// The call did not finish within the tool timeout
    #[error("tool call timed out")]
    Timeout,

    /// Backend could not be reached or asked us to back off
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// Backend answered but the call failed
    #[error("backend error: {0}")]
    Backend(String),
}

impl ToolError {
    /// Whether a transport-level retry may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::Unavailable(_))
    }
}

/// Failure of a Planner, Judge or Synthesizer call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CapabilityError {
    /// The service behind the capability cannot be reached
    #[error("capability unavailable: {0}")]
    Unavailable(String),

    #[error("capability timed out")]
    Timeout,

    /// The service answered with something that does not fit the schema
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Errors that abort a task or the agent setup.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AgentError {
    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    #[error("tool '{0}' is already registered")]
    DuplicateTool(String),

    /// A reasoning capability is unreachable; no further reasoning is possible
    #[error("{capability} unavailable: {reason}")]
    ServiceUnavailable {
        capability: &'static str,
        reason: String,
    },

    #[error("invalid task transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },
}

impl From<AgentError> for AppError {
    fn from(err: AgentError) -> Self {
        AppError::Agent(err.to_string())
    }
}
