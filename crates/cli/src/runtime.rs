//! Assembly of the corpus, indices, tools and capabilities for one invocation.

use sleuth_agent::llm::{LlmJudge, LlmPlanner, LlmSynthesizer};
use sleuth_agent::tools::{HybridTool, LexicalTool, SemanticTool, WebSearchTool};
use sleuth_agent::{
    AgentOptions, AnswerSynthesizer, FollowUpRewriter, ReasoningAgent, RetryPolicy, ToolRegistry,
};
use sleuth_core::{config::AppConfig, AppError, AppResult};
use sleuth_llm::create_client;
use sleuth_retrieval::{
    create_provider, Bm25Params, Corpus, EmbeddingConfig, FusionEngine, LexicalIndex,
    SemanticIndex,
};
use std::sync::Arc;

/// Extra seconds on the HTTP client timeout, so the loop's own timeout fires first.
const CLIENT_TIMEOUT_MARGIN_SECS: u64 = 5;

/// Load the corpus, build both indices and register the retrieval tools.
///
/// Registration order: `semantic`, `lexical`, `hybrid`, then `web` when a
/// search endpoint is configured.
pub async fn build_registry(config: &AppConfig) -> AppResult<Arc<ToolRegistry>> {
    let embedding = EmbeddingConfig::from_settings(
        &config.retrieval,
        config.embedding_model(),
        config.provider_endpoint(),
    );
    let provider = create_provider(&embedding).await?;

    let mut corpus = Corpus::load_jsonl(&config.corpus_path())?;
    if config.retrieval.embed_missing && corpus.embedded_count() < corpus.len() {
        tracing::info!(
            missing = corpus.len() - corpus.embedded_count(),
            provider = provider.provider_name(),
            "Embedding chunks without vectors"
        );
        corpus = corpus.embed_missing(provider.as_ref()).await?;
    }
    let corpus = Arc::new(corpus);

    let lexical = Arc::new(LexicalIndex::build(
        corpus.clone(),
        Bm25Params {
            k1: config.retrieval.bm25_k1,
            b: config.retrieval.bm25_b,
        },
    ));
    let semantic = Arc::new(SemanticIndex::build(corpus, provider)?);
    let fusion = FusionEngine::from_names(config.retrieval.rrf_k, &config.retrieval.method_priority);

    let mut builder = ToolRegistry::builder()
        .register(Arc::new(SemanticTool::new(semantic.clone())))?
        .register(Arc::new(LexicalTool::new(lexical.clone())))?
        .register(Arc::new(HybridTool::new(
            lexical,
            semantic,
            fusion,
            config.retrieval.fusion_alpha,
        )))?;

    if let Some(search) = &config.search {
        let web = WebSearchTool::new(search.endpoint.as_str(), RetryPolicy::from_settings(search))
            .map_err(|e| AppError::Config(format!("Invalid search endpoint: {}", e)))?;
        builder = builder.register(Arc::new(web))?;
    }

    let registry = builder.build();
    tracing::info!(tools = ?registry.names(), "Tool registry ready");
    Ok(Arc::new(registry))
}

/// HTTP timeout for completions: the provider's `timeout`, else the
/// capability timeout plus a margin.
fn client_timeout_secs(config: &AppConfig) -> u64 {
    config
        .provider_timeout_secs()
        .unwrap_or(config.agent.capability_timeout_secs + CLIENT_TIMEOUT_MARGIN_SECS)
}

/// Create the language-model capabilities and the agent around `registry`.
pub fn build_agent(config: &AppConfig, registry: Arc<ToolRegistry>) -> AppResult<ReasoningAgent> {
    let client = create_client(
        &config.provider,
        config.provider_endpoint(),
        Some(client_timeout_secs(config)),
    )
    .map_err(AppError::Config)?;

    let planner = LlmPlanner::new(client.clone(), &config.model, &config.workspace)?;
    let judge = LlmJudge::new(
        client.clone(),
        &config.model,
        &config.workspace,
        config.agent.sufficiency_threshold,
    )?;
    let synthesizer = LlmSynthesizer::new(client, &config.model, &config.workspace)?;

    Ok(ReasoningAgent::new(
        registry,
        Arc::new(planner),
        Arc::new(judge),
        AnswerSynthesizer::new(Arc::new(synthesizer)),
        AgentOptions::from_settings(&config.agent),
    )
    .with_rewriter(Arc::new(FollowUpRewriter)))
}
