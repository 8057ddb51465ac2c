//! The reasoning loop.
//!
//! Each task walks the state machine
//! `PLANNING → ACTING → OBSERVING → REFLECTING → (PLANNING | DONE | FAILED)`
//! one phase at a time. Tasks share nothing mutable: the registry, the
//! capabilities and the indices behind the tools are only read, so one
//! [`ReasoningAgent`] can run many tasks concurrently.

use crate::capabilities::{Judge, PlanningContext, Planner};
use crate::error::{AgentError, CapabilityError, ToolError};
use crate::guard::LoopGuard;
use crate::registry::ToolRegistry;
use crate::report::{AttemptSummary, TaskReport};
use crate::rewriter::{PassthroughRewriter, QueryRewriter};
use crate::synthesis::AnswerSynthesizer;
use crate::tool::{ToolDescriptor, ToolHit};
use crate::types::{
    Attempt, Completion, EvidenceRecord, EvidenceSet, PlannedStep, SynthesizedAnswer, TaskPhase,
    Verdict,
};
use chrono::{DateTime, Utc};
use sleuth_core::config::AgentSettings;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

/// Invalid planner replies tolerated per planning phase.
const MAX_INVALID_PLANS: u32 = 2;

/// Repeated `(tool, query)` proposals tolerated before a tool is forced.
const MAX_REPEATED_PLANS: u32 = 2;

/// Loop limits and timeouts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentOptions {
    pub max_iterations: u32,
    /// Advisory; the judge's `sufficient` flag decides
    pub sufficiency_threshold: u8,
    pub top_k: usize,
    pub capability_timeout: Duration,
    pub tool_timeout: Duration,
}

impl AgentOptions {
    pub fn from_settings(settings: &AgentSettings) -> Self {
        Self {
            max_iterations: settings.max_iterations,
            sufficiency_threshold: settings.sufficiency_threshold,
            top_k: settings.top_k,
            capability_timeout: Duration::from_secs(settings.capability_timeout_secs),
            tool_timeout: Duration::from_secs(settings.tool_timeout_secs),
        }
    }
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self::from_settings(&AgentSettings::default())
    }
}

/// A question to answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRequest {
    pub question: String,
    /// Previous question, for follow-up rewriting
    pub follow_up_of: Option<String>,
}

impl TaskRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            follow_up_of: None,
        }
    }

    pub fn follow_up_of(mut self, previous: impl Into<String>) -> Self {
        self.follow_up_of = Some(previous.into());
        self
    }
}

/// Per-task state. Owned by exactly one `run` call.
struct Task {
    id: Uuid,
    question: String,
    effective_question: String,
    phase: TaskPhase,
    attempts: Vec<Attempt>,
    evidence: EvidenceSet,
    guard: LoopGuard,
    completion: Option<Completion>,
    failure_reason: Option<String>,
    answer: Option<SynthesizedAnswer>,
    synthesis_error: Option<String>,
    started_at: DateTime<Utc>,
}

impl Task {
    fn new(question: String, effective_question: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            question,
            effective_question,
            phase: TaskPhase::Planning,
            attempts: Vec::new(),
            evidence: EvidenceSet::new(),
            guard: LoopGuard::new(),
            completion: None,
            failure_reason: None,
            answer: None,
            synthesis_error: None,
            started_at: Utc::now(),
        }
    }

    fn transition(&mut self, next: TaskPhase) -> Result<(), AgentError> {
        if !self.phase.can_transition_to(next) {
            return Err(AgentError::InvalidTransition {
                from: self.phase.to_string(),
                to: next.to_string(),
            });
        }

        tracing::debug!(from = %self.phase, to = %next, "Phase transition");
        self.phase = next;
        Ok(())
    }

    fn fail(&mut self, reason: impl Into<String>) {
        if !self.phase.can_transition_to(TaskPhase::Failed) {
            return;
        }

        let reason = reason.into();
        tracing::warn!(phase = %self.phase, reason = %reason, "Task failed");
        self.phase = TaskPhase::Failed;
        self.failure_reason = Some(reason);
    }

    /// Fail the task if cancellation was requested. Returns whether it did.
    fn cancelled(&mut self, cancel: &CancellationToken) -> bool {
        if cancel.is_cancelled() {
            self.fail("cancelled");
            return true;
        }
        false
    }

    fn into_report(self) -> TaskReport {
        let completion = self.completion;
        let low_confidence = match &self.answer {
            Some(answer) => answer.low_confidence,
            None => completion.map(|c| c.is_low_confidence()).unwrap_or(false),
        };
        let (answer, citations) = match self.answer {
            Some(answer) => (Some(answer.answer), answer.citations),
            None => (None, Vec::new()),
        };

        TaskReport {
            task_id: self.id.to_string(),
            question: self.question,
            effective_question: self.effective_question,
            status: self.phase,
            completion,
            exhausted: completion == Some(Completion::Exhausted),
            low_confidence,
            failure_reason: self.failure_reason,
            attempts: self.attempts.iter().map(AttemptSummary::from).collect(),
            evidence_count: self.evidence.len(),
            evidence: self.evidence.records().to_vec(),
            answer,
            citations,
            synthesis_error: self.synthesis_error,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}

/// Result of one planning phase.
enum PlanOutcome {
    Step { step: PlannedStep, forced: bool },
    /// Too many invalid proposals
    Undecided,
    /// The planner keeps repeating itself and every tool has been used
    NoToolsLeft,
}

/// What the loop does after an iteration.
enum Next {
    Plan(String),
    Finish(Completion),
    Stop,
}

/// Bounded Plan → Act → Observe → Reflect agent.
pub struct ReasoningAgent {
    registry: Arc<ToolRegistry>,
    planner: Arc<dyn Planner>,
    judge: Arc<dyn Judge>,
    synthesizer: AnswerSynthesizer,
    rewriter: Arc<dyn QueryRewriter>,
    options: AgentOptions,
}

impl ReasoningAgent {
    pub fn new(
        registry: Arc<ToolRegistry>,
        planner: Arc<dyn Planner>,
        judge: Arc<dyn Judge>,
        synthesizer: AnswerSynthesizer,
        options: AgentOptions,
    ) -> Self {
        Self {
            registry,
            planner,
            judge,
            synthesizer,
            rewriter: Arc::new(PassthroughRewriter),
            options,
        }
    }

    pub fn with_rewriter(mut self, rewriter: Arc<dyn QueryRewriter>) -> Self {
        self.rewriter = rewriter;
        self
    }

    pub fn options(&self) -> &AgentOptions {
        &self.options
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Answer one question.
    ///
    /// Only [`AgentError::ServiceUnavailable`] (or a broken state machine) is
    /// returned as an error. Cancellation, indecision and exhausted budgets
    /// all produce a report.
    pub async fn run(
        &self,
        request: TaskRequest,
        cancel: &CancellationToken,
    ) -> Result<TaskReport, AgentError> {
        let effective = self
            .rewriter
            .rewrite(&request.question, request.follow_up_of.as_deref())
            .await;
        let mut task = Task::new(request.question, effective);

        let span = tracing::info_span!("task", id = %task.id);
        async {
            tracing::info!(question = %task.effective_question, "Task started");

            if let Err(e) = self.drive(&mut task, cancel).await {
                task.fail(e.to_string());
                tracing::error!(error = %e, "Task aborted");
                return Err(e);
            }

            tracing::info!(
                status = %task.phase,
                attempts = task.attempts.len(),
                evidence = task.evidence.len(),
                "Task finished"
            );
            Ok(())
        }
        .instrument(span)
        .await?;

        Ok(task.into_report())
    }

    async fn drive(&self, task: &mut Task, cancel: &CancellationToken) -> Result<(), AgentError> {
        let tools = self.registry.descriptors();
        let mut feedback: Option<String> = None;

        loop {
            if task.cancelled(cancel) {
                return Ok(());
            }

            // Unconditional ceiling, independent of the decision step
            if task.attempts.len() >= self.options.max_iterations as usize {
                return self.finish(task, Completion::Exhausted, cancel).await;
            }

            let iteration = task.attempts.len() as u32 + 1;
            let next = self
                .iterate(task, iteration, &tools, feedback.as_deref(), cancel)
                .instrument(tracing::info_span!("attempt", iteration))
                .await?;

            match next {
                Next::Plan(note) => feedback = Some(note),
                Next::Finish(completion) => return self.finish(task, completion, cancel).await,
                Next::Stop => return Ok(()),
            }
        }
    }

    async fn iterate(
        &self,
        task: &mut Task,
        iteration: u32,
        tools: &[ToolDescriptor],
        feedback: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Next, AgentError> {
        // PLANNING
        let (step, forced) = match self.plan(task, tools, feedback).await? {
            PlanOutcome::Step { step, forced } => (step, forced),
            PlanOutcome::Undecided => {
                task.fail("could not decide");
                return Ok(Next::Stop);
            }
            PlanOutcome::NoToolsLeft => return Ok(Next::Finish(Completion::BestEffort)),
        };

        tracing::info!(tool = %step.tool, query = %step.query, forced, "Planned step");

        if task.cancelled(cancel) {
            return Ok(Next::Stop);
        }

        // ACTING
        task.transition(TaskPhase::Acting)?;
        task.guard.record(&step.tool, &step.query);
        let result = self.act(&step).await?;

        if task.cancelled(cancel) {
            return Ok(Next::Stop);
        }

        // OBSERVING
        task.transition(TaskPhase::Observing)?;
        let (evidence, error) = match result {
            Ok(hits) => (observe(hits, &step.tool, iteration), None),
            Err(e) => {
                tracing::warn!(tool = %step.tool, error = %e, "Tool call failed");
                (Vec::new(), Some(e.to_string()))
            }
        };
        let new_evidence = task.evidence.merge(evidence.iter().cloned());
        tracing::info!(
            returned = evidence.len(),
            new = new_evidence,
            total = task.evidence.len(),
            "Observed evidence"
        );

        if task.cancelled(cancel) {
            return Ok(Next::Stop);
        }

        // REFLECTING
        task.transition(TaskPhase::Reflecting)?;
        let verdict = self.reflect(&task.effective_question, &task.evidence).await?;
        tracing::info!(
            score = verdict.score,
            sufficient = verdict.sufficient,
            rationale = %verdict.rationale,
            "Judged evidence"
        );

        let mut note = verdict.feedback();
        if let Some(error) = &error {
            note.push_str(&format!(". The last call to '{}' failed: {}", step.tool, error));
        }
        let sufficient = verdict.sufficient;

        task.attempts.push(Attempt {
            iteration,
            tool: step.tool,
            query: step.query,
            rationale: step.rationale,
            forced,
            evidence,
            new_evidence,
            verdict,
            error,
        });

        if sufficient {
            return Ok(Next::Finish(Completion::Sufficient));
        }
        if task.attempts.len() >= self.options.max_iterations as usize {
            tracing::info!(
                max_iterations = self.options.max_iterations,
                "Iteration budget exhausted"
            );
            return Ok(Next::Finish(Completion::Exhausted));
        }

        task.transition(TaskPhase::Planning)?;
        Ok(Next::Plan(note))
    }

    async fn plan(
        &self,
        task: &Task,
        tools: &[ToolDescriptor],
        feedback: Option<&str>,
    ) -> Result<PlanOutcome, AgentError> {
        let mut note: Option<String> = None;
        let mut invalid = 0;
        let mut repeated = 0;

        loop {
            let combined = match (feedback, note.as_deref()) {
                (Some(f), Some(n)) => Some(format!("{}\n{}", f, n)),
                (Some(f), None) => Some(f.to_string()),
                (None, n) => n.map(str::to_string),
            };
            let context = PlanningContext {
                question: &task.effective_question,
                attempts: &task.attempts,
                tools,
                feedback: combined.as_deref(),
            };

            let proposal = with_timeout(self.options.capability_timeout, self.planner.plan(context)).await;

            let rejection = match proposal {
                Err(CapabilityError::Unavailable(reason)) => {
                    return Err(AgentError::ServiceUnavailable {
                        capability: "planner",
                        reason,
                    });
                }
                Err(e) => format!(
                    "Your previous reply could not be used ({}). Reply with one JSON object naming a listed tool and a query.",
                    e
                ),
                Ok(step) if !self.registry.contains(&step.tool) => format!(
                    "Tool '{}' is not registered. Choose one of: {}.",
                    step.tool,
                    self.registry.names().join(", ")
                ),
                Ok(step) if step.query.trim().is_empty() => {
                    "The query was empty. Provide a search query.".to_string()
                }
                Ok(step) if task.guard.is_repeat(&step.tool, &step.query) => {
                    repeated += 1;
                    tracing::warn!(tool = %step.tool, query = %step.query, repeated, "Rejected repeated step");

                    if repeated < MAX_REPEATED_PLANS {
                        note = Some(format!(
                            "Tool '{}' with query \"{}\" was already tried. Choose a different tool or query.",
                            step.tool, step.query
                        ));
                        continue;
                    }

                    return Ok(match self.registry.first_unused(task.guard.tools_used()) {
                        Some(tool) => {
                            tracing::warn!(tool, "Forcing unused tool");
                            PlanOutcome::Step {
                                step: PlannedStep::new(
                                    tool,
                                    step.query.clone(),
                                    format!("forced after repeated '{}' proposals", step.tool),
                                ),
                                forced: true,
                            }
                        }
                        None => {
                            tracing::warn!("Every tool has been used, finishing with best effort");
                            PlanOutcome::NoToolsLeft
                        }
                    });
                }
                Ok(step) => return Ok(PlanOutcome::Step { step, forced: false }),
            };

            invalid += 1;
            tracing::warn!(invalid, reason = %rejection, "Rejected planner proposal");
            if invalid >= MAX_INVALID_PLANS {
                return Ok(PlanOutcome::Undecided);
            }
            note = Some(rejection);
        }
    }

    /// Run the planned tool. The outer error only signals a registry miss;
    /// tool failures are returned in the inner result.
    async fn act(&self, step: &PlannedStep) -> Result<Result<Vec<ToolHit>, ToolError>, AgentError> {
        let tool = self.registry.get(&step.tool)?;

        let result = match tokio::time::timeout(
            self.options.tool_timeout,
            tool.search(&step.query, self.options.top_k),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ToolError::Timeout),
        };

        Ok(result.map(|mut hits| {
            hits.truncate(self.options.top_k);
            hits
        }))
    }

    async fn reflect(&self, question: &str, evidence: &EvidenceSet) -> Result<Verdict, AgentError> {
        if evidence.is_empty() {
            tracing::info!("No evidence yet, skipping judge");
            return Ok(Verdict::no_evidence());
        }

        let verdict = with_timeout(
            self.options.capability_timeout,
            self.judge.evaluate(question, evidence.records()),
        )
        .await;

        match verdict {
            Ok(verdict) if verdict.is_valid() => {
                let meets_threshold = verdict.score >= self.options.sufficiency_threshold;
                if meets_threshold != verdict.sufficient {
                    tracing::warn!(
                        score = verdict.score,
                        threshold = self.options.sufficiency_threshold,
                        sufficient = verdict.sufficient,
                        "Judge verdict disagrees with threshold, keeping the judge's flag"
                    );
                }
                Ok(verdict)
            }
            Ok(verdict) => {
                tracing::warn!(score = verdict.score, "Judge score out of range, treating as insufficient");
                Ok(Verdict::unparseable())
            }
            Err(CapabilityError::Unavailable(reason)) => Err(AgentError::ServiceUnavailable {
                capability: "judge",
                reason,
            }),
            Err(e) => {
                tracing::warn!(error = %e, "Judge reply unusable, treating as insufficient");
                Ok(Verdict::unparseable())
            }
        }
    }

    async fn finish(
        &self,
        task: &mut Task,
        completion: Completion,
        cancel: &CancellationToken,
    ) -> Result<(), AgentError> {
        if task.cancelled(cancel) {
            return Ok(());
        }

        task.transition(TaskPhase::Done)?;
        task.completion = Some(completion);
        tracing::info!(completion = ?completion, "Synthesizing answer");

        let answer = with_timeout(
            self.options.capability_timeout,
            self.synthesizer.synthesize(
                &task.effective_question,
                &task.evidence,
                completion.is_low_confidence(),
            ),
        )
        .await;

        match answer {
            Ok(answer) => {
                tracing::info!(
                    citations = answer.citations.len(),
                    low_confidence = answer.low_confidence,
                    "Answer ready"
                );
                task.answer = Some(answer);
            }
            Err(CapabilityError::Unavailable(reason)) => {
                return Err(AgentError::ServiceUnavailable {
                    capability: "synthesizer",
                    reason,
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "Synthesis failed, returning trace without answer");
                task.synthesis_error = Some(e.to_string());
            }
        }

        Ok(())
    }
}

/// Stamp provenance on raw tool hits.
fn observe(hits: Vec<ToolHit>, tool: &str, iteration: u32) -> Vec<EvidenceRecord> {
    hits.into_iter()
        .map(|hit| EvidenceRecord {
            chunk_id: hit.chunk_id,
            text: hit.text,
            source_uri: hit.source_uri,
            originating_tool: tool.to_string(),
            iteration,
        })
        .collect()
}

async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, CapabilityError>
where
    F: Future<Output = Result<T, CapabilityError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(CapabilityError::Timeout),
    }
}
