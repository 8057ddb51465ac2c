use super::fakes::*;
use crate::agent::TaskRequest;
use crate::error::{AgentError, CapabilityError, ToolError};
use crate::rewriter::FollowUpRewriter;
use crate::synthesis::LOW_CONFIDENCE_PREFIX;
use crate::tools::{HybridTool, LexicalTool, SemanticTool};
use crate::types::{Completion, TaskPhase};
use crate::{RetrievalTool, ToolRegistry};
use sleuth_retrieval::embeddings::providers::trigram::TrigramProvider;
use sleuth_retrieval::{Bm25Params, Chunk, Corpus, FusionEngine, LexicalIndex, SemanticIndex};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn ask(question: &str) -> TaskRequest {
    TaskRequest::new(question)
}

#[tokio::test]
async fn test_sufficient_first_attempt() {
    let (semantic, lexical, hybrid) = standard_tools(&["c1", "c2"], &[], &[]);
    let planner = ScriptedPlanner::new(vec![step("semantic", "ownership rules")]);
    let judge = ScriptedJudge::new(vec![Ok(verdict(9, true))]);
    let synthesizer = CannedSynthesizer::new("Each value has one owner [c1].", &["c1"]);

    let agent = agent(
        registry(vec![semantic.clone(), lexical, hybrid]),
        planner.clone(),
        judge.clone(),
        synthesizer,
        options(3),
    );
    let report = agent
        .run(ask("What are Rust's ownership rules?"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.status, TaskPhase::Done);
    assert!(report.is_done());
    assert_eq!(report.completion, Some(Completion::Sufficient));
    assert_eq!(report.attempts.len(), 1);
    assert!(!report.exhausted);
    assert!(!report.low_confidence);
    assert_eq!(report.evidence_count, 2);
    assert_eq!(report.answer.as_deref(), Some("Each value has one owner [c1]."));
    assert_eq!(report.citations.len(), 1);
    assert_eq!(report.citations[0].source_uri, "docs/c1.md");

    assert_eq!(planner.calls(), 1);
    let seen = planner.seen.lock().unwrap().clone();
    assert_eq!(seen[0].question, "What are Rust's ownership rules?");
    assert_eq!(seen[0].tools, vec!["semantic", "lexical", "hybrid"]);
    assert_eq!(judge.calls(), 1);
    assert_eq!(semantic.queries.lock().unwrap().as_slice(), ["ownership rules"]);
}

#[tokio::test]
async fn test_second_tool_completes_task() {
    let (semantic, lexical, hybrid) = standard_tools(&["c1"], &["c2", "c1"], &[]);
    let planner = ScriptedPlanner::new(vec![
        step("semantic", "borrow checker"),
        step("lexical", "E0502 mutable borrow"),
    ]);
    let judge = ScriptedJudge::new(vec![Ok(verdict(3, false)), Ok(verdict(9, true))]);
    let synthesizer = CannedSynthesizer::new("E0502 means [c2], see also [c1].", &["c2", "c1"]);

    let agent = agent(
        registry(vec![semantic, lexical, hybrid]),
        planner.clone(),
        judge.clone(),
        synthesizer.clone(),
        options(3),
    );
    let report = agent
        .run(ask("What does error E0502 mean?"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.completion, Some(Completion::Sufficient));
    assert_eq!(report.attempts.len(), 2);
    assert_eq!(report.attempts[0].tool, "semantic");
    assert_eq!(report.attempts[0].verdict.score, 3);
    assert_eq!(report.attempts[1].tool, "lexical");
    assert_eq!(report.attempts[1].verdict.score, 9);

    // Planner sees the first attempt and the judge's feedback
    let seen = planner.seen.lock().unwrap().clone();
    assert_eq!(seen[1].attempts, 1);
    assert!(seen[1].feedback.as_deref().unwrap().contains("3/10"));
    assert!(seen[1].feedback.as_deref().unwrap().contains("more detail"));

    // Judge sees the accumulated evidence
    assert_eq!(judge.evidence_sizes.lock().unwrap().as_slice(), [1, 2]);

    // Synthesizer gets evidence ordered by iteration
    assert_eq!(synthesizer.seen_ids.lock().unwrap().as_slice(), ["c1", "c2"]);
    let cited: Vec<&str> = report.citations.iter().map(|c| c.chunk_id.as_str()).collect();
    assert_eq!(cited, vec!["c2", "c1"]);
    let c2 = report.evidence.iter().find(|r| r.chunk_id == "c2").unwrap();
    assert_eq!(c2.iteration, 2);
    assert_eq!(c2.originating_tool, "lexical");
}

#[tokio::test]
async fn test_exhausted_budget_is_low_confidence() {
    let (semantic, lexical, hybrid) = standard_tools(&["a"], &["b"], &["c"]);
    let planner = ScriptedPlanner::new(vec![
        step("semantic", "q1"),
        step("lexical", "q2"),
        step("hybrid", "q3"),
        step("semantic", "q4"),
    ]);
    let judge = ScriptedJudge::always(verdict(2, false));

    let agent = agent(
        registry(vec![semantic, lexical, hybrid]),
        planner.clone(),
        judge,
        CannedSynthesizer::new("partial", &["a"]),
        options(3),
    );
    let report = agent.run(ask("q"), &CancellationToken::new()).await.unwrap();

    assert_eq!(report.status, TaskPhase::Done);
    assert_eq!(report.completion, Some(Completion::Exhausted));
    assert!(report.exhausted);
    assert!(report.low_confidence);
    assert_eq!(report.attempts.len(), 3);
    assert_eq!(planner.calls(), 3);
    assert!(report.answer.unwrap().starts_with(LOW_CONFIDENCE_PREFIX));
}

#[tokio::test]
async fn test_hybrid_tool_ranks_shared_chunks_first() {
    // Chunks found by both methods must outrank chunks found by one
    let chunks = vec![
        Chunk::new("A", "rust ownership borrowing rules", "a.md"),
        Chunk::new("B", "rust ownership model", "b.md"),
        Chunk::new("C", "borrowing rules for references", "c.md"),
        Chunk::new("D", "borrowing money rules", "d.md"),
    ];
    let provider = Arc::new(TrigramProvider::new(384));
    let corpus = Corpus::new(chunks)
        .unwrap()
        .embed_missing(provider.as_ref())
        .await
        .unwrap();
    let corpus = Arc::new(corpus);

    let lexical = Arc::new(LexicalIndex::build(corpus.clone(), Bm25Params::default()));
    let semantic = Arc::new(SemanticIndex::build(corpus, provider).unwrap());
    let hybrid = HybridTool::new(lexical.clone(), semantic.clone(), FusionEngine::default(), 0.5);

    let lexical_hits = LexicalTool::new(lexical).search("borrowing rules", 4).await.unwrap();
    let semantic_hits = SemanticTool::new(semantic).search("borrowing rules", 4).await.unwrap();
    let fused = hybrid.search("borrowing rules", 4).await.unwrap();

    let in_both: HashSet<&str> = lexical_hits
        .iter()
        .map(|h| h.chunk_id.as_str())
        .filter(|id| semantic_hits.iter().any(|s| s.chunk_id == *id))
        .collect();
    assert!(!in_both.is_empty());
    for (position, hit) in fused.iter().enumerate() {
        if !in_both.contains(hit.chunk_id.as_str()) {
            assert!(fused[position..]
                .iter()
                .all(|later| !in_both.contains(later.chunk_id.as_str())));
        }
    }
}

#[tokio::test]
async fn test_judge_fails_closed() {
    let (semantic, lexical, hybrid) = standard_tools(&["a"], &["b"], &["c"]);
    let planner = ScriptedPlanner::new(vec![
        step("semantic", "q1"),
        step("lexical", "q2"),
        step("hybrid", "q3"),
    ]);
    let out_of_range = crate::types::Verdict {
        score: 14,
        sufficient: true,
        rationale: "great".to_string(),
        missing: None,
    };
    let judge = ScriptedJudge::new(vec![
        Err(CapabilityError::Malformed("missing field `score`".to_string())),
        Ok(out_of_range),
        Err(CapabilityError::Timeout),
    ]);

    let agent = agent(
        registry(vec![semantic, lexical, hybrid]),
        planner,
        judge,
        CannedSynthesizer::new("maybe", &[]),
        options(3),
    );
    let report = agent.run(ask("q"), &CancellationToken::new()).await.unwrap();

    assert_eq!(report.status, TaskPhase::Done);
    assert!(report.exhausted);
    for attempt in &report.attempts {
        assert_eq!(attempt.verdict.score, 0);
        assert!(!attempt.verdict.sufficient);
        assert_eq!(attempt.verdict.rationale, "unparseable");
        assert_eq!(attempt.verdict.missing, None);
    }
}

#[tokio::test]
async fn test_judge_error_status_fails_closed_and_loop_continues() {
    use crate::llm::test_support::ScriptedClient;
    use crate::llm::LlmJudge;
    use sleuth_core::AppError;

    let temp_dir = tempfile::TempDir::new().unwrap();
    let client = Arc::new(ScriptedClient::new(vec![
        Err(AppError::LlmReply(
            "Ollama API error (400 Bad Request): prompt exceeds context length".to_string(),
        )),
        Ok(r#"{"score": 9, "sufficient": true, "rationale": "covers it", "missing": null}"#
            .to_string()),
    ]));
    let judge = LlmJudge::new(client, "m", temp_dir.path(), 7).unwrap();

    let (semantic, lexical, hybrid) = standard_tools(&["a"], &["b"], &[]);
    let agent = agent(
        registry(vec![semantic, lexical, hybrid]),
        ScriptedPlanner::new(vec![step("semantic", "q1"), step("lexical", "q2")]),
        Arc::new(judge),
        CannedSynthesizer::new("answer [b]", &["b"]),
        options(3),
    );
    let report = agent.run(ask("q"), &CancellationToken::new()).await.unwrap();

    assert_eq!(report.status, TaskPhase::Done);
    assert_eq!(report.completion, Some(Completion::Sufficient));
    assert_eq!(report.attempts.len(), 2);
    assert_eq!(report.attempts[0].verdict.score, 0);
    assert!(!report.attempts[0].verdict.sufficient);
    assert_eq!(report.attempts[0].verdict.rationale, "unparseable");
    assert_eq!(report.attempts[1].verdict.score, 9);
}

#[tokio::test]
async fn test_repeated_step_forces_unused_tool() {
    let (semantic, lexical, hybrid) = standard_tools(&["s1"], &["l1"], &["h1"]);
    let planner = ScriptedPlanner::new(vec![
        step("lexical", "What is RRF?"),
        step("lexical", "what is  rrf"),
        step("lexical", "WHAT IS RRF."),
    ]);
    let judge = ScriptedJudge::always(verdict(4, false));

    let agent = agent(
        registry(vec![semantic.clone(), lexical.clone(), hybrid]),
        planner.clone(),
        judge,
        CannedSynthesizer::new("answer", &[]),
        options(2),
    );
    let report = agent.run(ask("What is RRF?"), &CancellationToken::new()).await.unwrap();

    assert_eq!(report.attempts.len(), 2);
    assert_eq!(lexical.calls(), 1);
    assert_eq!(report.attempts[1].tool, "semantic");
    assert!(report.attempts[1].forced);
    assert_eq!(semantic.calls(), 1);
    assert!(planner.feedback(2).contains("already tried"));
}

#[tokio::test]
async fn test_alternative_after_rejection_is_used() {
    let (semantic, lexical, hybrid) = standard_tools(&["s1"], &["l1"], &[]);
    let planner = ScriptedPlanner::new(vec![
        step("lexical", "rrf"),
        step("lexical", "rrf"),
        step("lexical", "reciprocal rank fusion constant"),
    ]);
    let judge = ScriptedJudge::new(vec![Ok(verdict(4, false)), Ok(verdict(8, true))]);

    let agent = agent(
        registry(vec![semantic, lexical.clone(), hybrid]),
        planner,
        judge,
        CannedSynthesizer::new("answer", &[]),
        options(3),
    );
    let report = agent.run(ask("rrf"), &CancellationToken::new()).await.unwrap();

    assert_eq!(report.attempts.len(), 2);
    assert!(!report.attempts[1].forced);
    assert_eq!(
        lexical.queries.lock().unwrap().as_slice(),
        ["rrf", "reciprocal rank fusion constant"]
    );
}

#[tokio::test]
async fn test_best_effort_when_every_tool_used() {
    let lexical = FakeTool::returning("lexical", &["l1"]);
    let planner = ScriptedPlanner::new(vec![
        step("lexical", "q"),
        step("lexical", "q"),
        step("lexical", "q"),
    ]);
    let judge = ScriptedJudge::always(verdict(5, false));

    let agent = agent(
        registry(vec![lexical.clone()]),
        planner,
        judge,
        CannedSynthesizer::new("what we have [l1]", &["l1"]),
        options(3),
    );
    let report = agent.run(ask("q"), &CancellationToken::new()).await.unwrap();

    assert_eq!(report.status, TaskPhase::Done);
    assert_eq!(report.completion, Some(Completion::BestEffort));
    assert!(!report.exhausted);
    assert!(report.low_confidence);
    assert_eq!(report.attempts.len(), 1);
    assert_eq!(lexical.calls(), 1);
}

#[tokio::test]
async fn test_overlapping_tools_deduplicate_evidence() {
    let (semantic, lexical, hybrid) = standard_tools(&["c1", "c2"], &["c2", "c3"], &[]);
    let planner = ScriptedPlanner::new(vec![step("semantic", "q"), step("lexical", "q")]);
    let judge = ScriptedJudge::new(vec![Ok(verdict(4, false)), Ok(verdict(9, true))]);

    let agent = agent(
        registry(vec![semantic, lexical, hybrid]),
        planner,
        judge,
        CannedSynthesizer::new("answer", &[]),
        options(3),
    );
    let report = agent.run(ask("q"), &CancellationToken::new()).await.unwrap();

    assert_eq!(report.evidence_count, 3);
    let ids: HashSet<&str> = report.evidence.iter().map(|r| r.chunk_id.as_str()).collect();
    assert_eq!(ids.len(), report.evidence.len());

    let c2 = report.evidence.iter().find(|r| r.chunk_id == "c2").unwrap();
    assert_eq!(c2.originating_tool, "semantic");
    assert_eq!(c2.iteration, 1);
    assert_eq!(report.attempts[1].evidence_count, 2);
    assert_eq!(report.attempts[1].new_evidence, 1);
}

#[tokio::test]
async fn test_iterations_never_exceed_budget() {
    for max_iterations in 1..=5 {
        let semantic = FakeTool::returning("semantic", &["a"]);
        let lexical = FakeTool::failing("lexical", ToolError::Unavailable("down".to_string()));
        let hybrid = FakeTool::returning("hybrid", &[]);

        let agent = agent(
            registry(vec![semantic, lexical, hybrid]),
            Arc::new(RoundRobinPlanner),
            ScriptedJudge::always(verdict(1, false)),
            CannedSynthesizer::new("answer", &[]),
            options(max_iterations),
        );
        let report = agent.run(ask("q"), &CancellationToken::new()).await.unwrap();

        assert!(report.status.is_terminal());
        assert!(report.attempts.len() <= max_iterations as usize);
    }
}

#[tokio::test]
async fn test_zero_budget_finishes_without_attempts() {
    let (semantic, lexical, hybrid) = standard_tools(&["a"], &[], &[]);
    let planner = ScriptedPlanner::new(vec![step("semantic", "q")]);

    let agent = agent(
        registry(vec![semantic, lexical, hybrid]),
        planner.clone(),
        ScriptedJudge::always(verdict(9, true)),
        CannedSynthesizer::new("answer", &[]),
        options(0),
    );
    let report = agent.run(ask("q"), &CancellationToken::new()).await.unwrap();

    assert!(report.exhausted);
    assert!(report.attempts.is_empty());
    assert_eq!(planner.calls(), 0);
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let (semantic, lexical, hybrid) = standard_tools(&["a"], &[], &[]);
    let planner = ScriptedPlanner::new(vec![step("semantic", "q")]);

    let agent = agent(
        registry(vec![semantic, lexical, hybrid]),
        planner.clone(),
        ScriptedJudge::always(verdict(9, true)),
        CannedSynthesizer::new("answer", &[]),
        options(3),
    );
    let cancel = CancellationToken::new();
    cancel.cancel();
    let report = agent.run(ask("q"), &cancel).await.unwrap();

    assert_eq!(report.status, TaskPhase::Failed);
    assert_eq!(report.failure_reason.as_deref(), Some("cancelled"));
    assert_eq!(planner.calls(), 0);
    assert!(report.answer.is_none());
}

#[tokio::test]
async fn test_cancellation_observed_at_next_boundary() {
    let cancel = CancellationToken::new();
    let semantic = FakeTool::cancelling("semantic", &["a"], cancel.clone());
    let judge = ScriptedJudge::always(verdict(9, true));

    let agent = agent(
        registry(vec![semantic.clone()]),
        ScriptedPlanner::new(vec![step("semantic", "q")]),
        judge.clone(),
        CannedSynthesizer::new("answer", &[]),
        options(3),
    );
    let report = agent.run(ask("q"), &cancel).await.unwrap();

    // The in-flight call completes; the task stops before reflecting
    assert_eq!(semantic.calls(), 1);
    assert_eq!(report.status, TaskPhase::Failed);
    assert_eq!(report.failure_reason.as_deref(), Some("cancelled"));
    assert_eq!(judge.calls(), 0);
    assert!(report.attempts.is_empty());
}

#[tokio::test]
async fn test_unknown_tool_twice_fails() {
    let (semantic, lexical, hybrid) = standard_tools(&["a"], &[], &[]);
    let planner = ScriptedPlanner::new(vec![step("grep", "q"), step("grep", "q")]);

    let agent = agent(
        registry(vec![semantic, lexical, hybrid]),
        planner.clone(),
        ScriptedJudge::always(verdict(9, true)),
        CannedSynthesizer::new("answer", &[]),
        options(3),
    );
    let report = agent.run(ask("q"), &CancellationToken::new()).await.unwrap();

    assert_eq!(report.status, TaskPhase::Failed);
    assert!(!report.is_done());
    assert_eq!(report.failure_reason.as_deref(), Some("could not decide"));
    assert!(report.attempts.is_empty());
    assert!(planner.feedback(1).contains("Tool 'grep' is not registered"));
}

#[tokio::test]
async fn test_unknown_tool_once_then_valid() {
    let (semantic, lexical, hybrid) = standard_tools(&["a"], &[], &[]);
    let planner = ScriptedPlanner::new(vec![
        step("grep", "q"),
        Err(CapabilityError::Malformed("not json".to_string())),
    ]);

    let agent = agent(
        registry(vec![semantic.clone(), lexical, hybrid]),
        planner.clone(),
        ScriptedJudge::always(verdict(9, true)),
        CannedSynthesizer::new("answer", &[]),
        options(3),
    );
    let report = agent.run(ask("q"), &CancellationToken::new()).await.unwrap();

    // A malformed reply counts as the second invalid response
    assert_eq!(report.status, TaskPhase::Failed);
    assert_eq!(semantic.calls(), 0);

    let planner = ScriptedPlanner::new(vec![step("grep", "q"), step("semantic", "q")]);
    let agent = super::fakes::agent(
        registry(vec![semantic.clone()]),
        planner,
        ScriptedJudge::always(verdict(9, true)),
        CannedSynthesizer::new("answer", &[]),
        options(3),
    );
    let report = agent.run(ask("q"), &CancellationToken::new()).await.unwrap();

    assert_eq!(report.status, TaskPhase::Done);
    assert_eq!(report.attempts.len(), 1);
    assert_eq!(semantic.calls(), 1);
}

#[tokio::test]
async fn test_unavailable_capabilities_abort_task() {
    let tools = || {
        let (semantic, lexical, hybrid) = standard_tools(&["a"], &[], &[]);
        registry(vec![semantic, lexical, hybrid])
    };

    let planner_down = agent(
        tools(),
        ScriptedPlanner::new(vec![Err(CapabilityError::Unavailable("refused".to_string()))]),
        ScriptedJudge::always(verdict(9, true)),
        CannedSynthesizer::new("answer", &[]),
        options(3),
    );
    let err = planner_down
        .run(ask("q"), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        AgentError::ServiceUnavailable {
            capability: "planner",
            reason: "refused".to_string()
        }
    );

    let judge_down = agent(
        tools(),
        ScriptedPlanner::new(vec![step("semantic", "q")]),
        ScriptedJudge::new(vec![Err(CapabilityError::Unavailable("refused".to_string()))]),
        CannedSynthesizer::new("answer", &[]),
        options(3),
    );
    let err = judge_down.run(ask("q"), &CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, AgentError::ServiceUnavailable { capability: "judge", .. }));

    let synthesizer_down = agent(
        tools(),
        ScriptedPlanner::new(vec![step("semantic", "q")]),
        ScriptedJudge::always(verdict(9, true)),
        CannedSynthesizer::failing(CapabilityError::Unavailable("refused".to_string())),
        options(3),
    );
    let err = synthesizer_down
        .run(ask("q"), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, AgentError::ServiceUnavailable { capability: "synthesizer", .. }));
}

#[tokio::test]
async fn test_tool_failure_recorded_and_loop_continues() {
    let semantic = FakeTool::failing("semantic", ToolError::Backend("index unavailable".to_string()));
    let lexical = FakeTool::returning("lexical", &["l1"]);
    let planner = ScriptedPlanner::new(vec![step("semantic", "q"), step("lexical", "q")]);
    let judge = ScriptedJudge::always(verdict(9, true));

    let agent = agent(
        registry(vec![semantic, lexical]),
        planner.clone(),
        judge.clone(),
        CannedSynthesizer::new("answer [l1]", &[]),
        options(3),
    );
    let report = agent.run(ask("q"), &CancellationToken::new()).await.unwrap();

    assert_eq!(report.attempts.len(), 2);
    let failed = &report.attempts[0];
    assert_eq!(failed.evidence_count, 0);
    assert_eq!(failed.error.as_deref(), Some("backend error: index unavailable"));
    assert_eq!(failed.verdict.rationale, "no evidence retrieved");

    // Empty evidence never reaches the judge
    assert_eq!(judge.calls(), 1);
    assert!(planner.feedback(1).contains("index unavailable"));
    assert_eq!(report.citations[0].chunk_id, "l1");
}

#[tokio::test]
async fn test_slow_tool_times_out() {
    let slow = FakeTool::slow("semantic", Duration::from_secs(10));
    let mut opts = options(1);
    opts.tool_timeout = Duration::from_millis(20);

    let agent = agent(
        registry(vec![slow]),
        ScriptedPlanner::new(vec![step("semantic", "q")]),
        ScriptedJudge::always(verdict(9, true)),
        CannedSynthesizer::new("answer", &[]),
        opts,
    );
    let report = agent.run(ask("q"), &CancellationToken::new()).await.unwrap();

    assert_eq!(report.attempts[0].error.as_deref(), Some("tool call timed out"));
    assert!(report.exhausted);
    assert!(report.low_confidence);
}

#[tokio::test]
async fn test_synthesis_timeout_keeps_task_done() {
    let (semantic, lexical, hybrid) = standard_tools(&["a"], &[], &[]);
    let mut opts = options(3);
    opts.capability_timeout = Duration::from_millis(50);

    let agent = agent(
        registry(vec![semantic, lexical, hybrid]),
        ScriptedPlanner::new(vec![step("semantic", "q")]),
        ScriptedJudge::always(verdict(9, true)),
        CannedSynthesizer::slow(Duration::from_secs(10)),
        opts,
    );
    let report = agent.run(ask("q"), &CancellationToken::new()).await.unwrap();

    assert_eq!(report.status, TaskPhase::Done);
    assert!(report.answer.is_none());
    assert_eq!(report.synthesis_error.as_deref(), Some("capability timed out"));
}

#[tokio::test]
async fn test_follow_up_question_rewritten() {
    let (semantic, lexical, hybrid) = standard_tools(&["a"], &[], &[]);
    let planner = ScriptedPlanner::new(vec![step("semantic", "bm25 detail")]);

    let agent = agent(
        registry(vec![semantic, lexical, hybrid]),
        planner.clone(),
        ScriptedJudge::always(verdict(9, true)),
        CannedSynthesizer::new("answer", &[]),
        options(3),
    )
    .with_rewriter(Arc::new(FollowUpRewriter));

    let request = TaskRequest::new("tell me more").follow_up_of("What is BM25?");
    let report = agent.run(request, &CancellationToken::new()).await.unwrap();

    assert_eq!(report.question, "tell me more");
    assert_eq!(report.effective_question, "What is BM25? (more detail)");
    assert_eq!(planner.seen.lock().unwrap()[0].question, "What is BM25? (more detail)");
}

#[tokio::test]
async fn test_concurrent_tasks_are_independent() {
    let semantic = FakeTool::returning("semantic", &["s1"]);
    let lexical = FakeTool::returning("lexical", &["l1"]);
    let registry: Arc<ToolRegistry> = registry(vec![semantic.clone(), lexical]);

    let agent = Arc::new(agent(
        registry,
        Arc::new(RoundRobinPlanner),
        ScriptedJudge::always(verdict(8, true)),
        CannedSynthesizer::new("answer [s1]", &[]),
        options(3),
    ));
    let cancel = CancellationToken::new();

    let questions = ["q1", "q2", "q3", "q4"];
    let reports = futures::future::join_all(
        questions
            .iter()
            .map(|q| agent.run(TaskRequest::new(*q), &cancel)),
    )
    .await;

    let mut ids = HashSet::new();
    for (report, question) in reports.into_iter().zip(questions) {
        let report = report.unwrap();
        assert_eq!(report.question, question);
        assert_eq!(report.attempts.len(), 1);
        assert_eq!(report.attempts[0].query, question);
        assert_eq!(report.evidence_count, 1);
        ids.insert(report.task_id);
    }
    assert_eq!(ids.len(), 4);
    assert_eq!(semantic.calls(), 4);
}
