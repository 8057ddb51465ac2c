//! Task trace exposed to callers.
//!
//! A [`TaskReport`] is the audit record of one task: every attempt in order
//! with its tool, query, evidence counts and verdict, plus the outcome.

use crate::types::{Attempt, Citation, Completion, EvidenceRecord, TaskPhase, Verdict};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One line of the attempt trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptSummary {
    pub iteration: u32,
    pub tool: String,
    pub query: String,
    pub rationale: String,
    pub forced: bool,
    /// Results returned by the tool, duplicates included
    pub evidence_count: usize,
    pub new_evidence: usize,
    pub verdict: Verdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&Attempt> for AttemptSummary {
    fn from(attempt: &Attempt) -> Self {
        Self {
            iteration: attempt.iteration,
            tool: attempt.tool.clone(),
            query: attempt.query.clone(),
            rationale: attempt.rationale.clone(),
            forced: attempt.forced,
            evidence_count: attempt.evidence.len(),
            new_evidence: attempt.new_evidence,
            verdict: attempt.verdict.clone(),
            error: attempt.error.clone(),
        }
    }
}

/// Outcome and full trace of a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskReport {
    pub task_id: String,
    pub question: String,
    /// Question after follow-up rewriting
    pub effective_question: String,
    pub status: TaskPhase,
    pub completion: Option<Completion>,
    pub exhausted: bool,
    pub low_confidence: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub attempts: Vec<AttemptSummary>,
    pub evidence_count: usize,
    pub evidence: Vec<EvidenceRecord>,
    pub answer: Option<String>,
    pub citations: Vec<Citation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synthesis_error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl TaskReport {
    pub fn is_done(&self) -> bool {
        self.status == TaskPhase::Done
    }

    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }

    /// Human-readable attempt trace, one line per attempt.
    pub fn trace_lines(&self) -> Vec<String> {
        self.attempts
            .iter()
            .map(|a| {
                let mut line = format!(
                    "#{} {}{} \"{}\" -> {} results ({} new), score {}/10 sufficient={}: {}",
                    a.iteration,
                    a.tool,
                    if a.forced { " (forced)" } else { "" },
                    a.query,
                    a.evidence_count,
                    a.new_evidence,
                    a.verdict.score,
                    a.verdict.sufficient,
                    a.verdict.rationale
                );
                if let Some(error) = &a.error {
                    line.push_str(&format!(" [error: {}]", error));
                }
                line
            })
            .collect()
    }
}
