//! Task state shared by the reasoning loop, the synthesizer and the report.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Normalized unit of evidence with provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceRecord {
    pub chunk_id: String,
    pub text: String,
    pub source_uri: String,
    /// Tool that first produced this chunk
    pub originating_tool: String,
    /// 1-based iteration of first insertion
    pub iteration: u32,
}

/// Accumulated evidence of a task, unique by chunk id.
///
/// The first record inserted for a chunk id wins, so provenance always
/// points at the earliest attempt that found it. Insertion order is kept.
#[derive(Debug, Clone, Default)]
pub struct EvidenceSet {
    records: Vec<EvidenceRecord>,
    seen: HashSet<String>,
}

impl EvidenceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record unless its chunk id is already present.
    pub fn insert(&mut self, record: EvidenceRecord) -> bool {
        if self.seen.contains(&record.chunk_id) {
            return false;
        }
        self.seen.insert(record.chunk_id.clone());
        self.records.push(record);
        true
    }

    /// Insert every record, returning how many were new.
    pub fn merge<I>(&mut self, records: I) -> usize
    where
        I: IntoIterator<Item = EvidenceRecord>,
    {
        let mut added = 0;
        for record in records {
            if self.insert(record) {
                added += 1;
            }
        }
        added
    }

    pub fn contains(&self, chunk_id: &str) -> bool {
        self.seen.contains(chunk_id)
    }

    pub fn get(&self, chunk_id: &str) -> Option<&EvidenceRecord> {
        self.records.iter().find(|r| r.chunk_id == chunk_id)
    }

    pub fn records(&self) -> &[EvidenceRecord] {
        &self.records
    }

    /// Records ordered by the iteration that found them.
    pub fn by_iteration(&self) -> Vec<&EvidenceRecord> {
        let mut ordered: Vec<&EvidenceRecord> = self.records.iter().collect();
        ordered.sort_by_key(|r| r.iteration);
        ordered
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Judge assessment of the accumulated evidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    /// 1..=10 for a valid verdict, 0 when coerced
    pub score: u8,
    pub sufficient: bool,
    pub rationale: String,
    pub missing: Option<String>,
}

impl Verdict {
    pub const MIN_SCORE: u8 = 1;
    pub const MAX_SCORE: u8 = 10;

    /// Fail-closed verdict used when the Judge reply cannot be trusted.
    pub fn unparseable() -> Self {
        Self {
            score: 0,
            sufficient: false,
            rationale: "unparseable".to_string(),
            missing: None,
        }
    }

    /// Verdict used when there is nothing to judge.
    pub fn no_evidence() -> Self {
        Self {
            score: 0,
            sufficient: false,
            rationale: "no evidence retrieved".to_string(),
            missing: None,
        }
    }

    /// Whether the score is inside the judge scale.
    pub fn is_valid(&self) -> bool {
        (Self::MIN_SCORE..=Self::MAX_SCORE).contains(&self.score)
    }

    /// Feedback for the next planning round.
    pub fn feedback(&self) -> String {
        match self.missing.as_deref().filter(|m| !m.trim().is_empty()) {
            Some(missing) => format!(
                "Previous evidence scored {}/10: {}. Missing: {}",
                self.score, self.rationale, missing
            ),
            None => format!("Previous evidence scored {}/10: {}", self.score, self.rationale),
        }
    }
}

/// Planner decision for one iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedStep {
    pub tool: String,
    pub query: String,
    #[serde(default)]
    pub rationale: String,
}

impl PlannedStep {
    pub fn new(
        tool: impl Into<String>,
        query: impl Into<String>,
        rationale: impl Into<String>,
    ) -> Self {
        Self {
            tool: tool.into(),
            query: query.into(),
            rationale: rationale.into(),
        }
    }
}

/// One complete Plan/Act/Observe/Reflect cycle. Never modified once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    /// 1-based
    pub iteration: u32,
    pub tool: String,
    pub query: String,
    pub rationale: String,
    /// Set when the loop substituted an unused tool after repeated plans
    pub forced: bool,
    /// Everything the tool returned, including chunks already known
    pub evidence: Vec<EvidenceRecord>,
    /// How many of those were new to the task
    pub new_evidence: usize,
    pub verdict: Verdict,
    pub error: Option<String>,
}

/// Task state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPhase {
    Planning,
    Acting,
    Observing,
    Reflecting,
    Done,
    Failed,
}

impl TaskPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Allowed edges of the state machine.
    pub fn can_transition_to(&self, next: TaskPhase) -> bool {
        use TaskPhase::*;

        match (self, next) {
            (Done | Failed, _) => false,
            (_, Failed) => true,
            (Planning, Acting | Done) => true,
            (Acting, Observing) => true,
            (Observing, Reflecting) => true,
            (Reflecting, Planning | Done) => true,
            _ => false,
        }
    }
}

impl fmt::Display for TaskPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Planning => "PLANNING",
            Self::Acting => "ACTING",
            Self::Observing => "OBSERVING",
            Self::Reflecting => "REFLECTING",
            Self::Done => "DONE",
            Self::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// How a task reached `DONE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Completion {
    /// The Judge accepted the evidence
    Sufficient,
    /// The iteration budget ran out
    Exhausted,
    /// The planner kept repeating itself and every tool was used
    BestEffort,
}

impl Completion {
    /// Answers for anything but sufficient evidence are flagged.
    pub fn is_low_confidence(&self) -> bool {
        !matches!(self, Self::Sufficient)
    }
}

/// A cited chunk in the final answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    pub chunk_id: String,
    pub source_uri: String,
}

/// Final answer of a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesizedAnswer {
    pub answer: String,
    pub citations: Vec<Citation>,
    pub low_confidence: bool,
}
