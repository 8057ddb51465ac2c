//! Configuration management for Sleuth.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Built-in defaults
//! - Config files (.sleuth/config.yaml)
//! - Environment variables
//! - Command-line flags
//!
//! The configuration is workspace-centric, with the corpus and prompt
//! overrides stored in `.sleuth/`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Providers with a client implementation in `sleuth-llm`.
const KNOWN_PROVIDERS: [&str; 1] = ["ollama"];

/// Retrieval methods accepted in `methodPriority`.
const KNOWN_METHODS: [&str; 3] = ["semantic", "lexical", "web"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .sleuth/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// LLM provider backing the Planner, Judge and Synthesizer
    pub provider: String,

    /// Default model identifier
    pub model: String,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Emit logs as JSON lines
    pub log_json: bool,

    /// LLM provider configurations
    pub llm: Option<LlmConfig>,

    /// Reasoning loop settings
    pub agent: AgentSettings,

    /// Index and fusion settings
    pub retrieval: RetrievalSettings,

    /// External web search tool (registered only when present)
    pub search: Option<SearchSettings>,
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub endpoint: String,
    pub model: String,
    /// Embedding model used when this provider also serves `retrieval.embeddingProvider`
    #[serde(rename = "embeddingModel")]
    pub embedding_model: Option<String>,
    /// HTTP request timeout in seconds for completions
    pub timeout: Option<u64>,
}

/// Reasoning loop settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentSettings {
    /// Hard cap on Planning cycles per task
    pub max_iterations: u32,

    /// Advisory minimum verdict score; the judge's `sufficient` flag decides
    pub sufficiency_threshold: u8,

    /// Results requested per tool call
    pub top_k: usize,

    /// Timeout for each Planner/Judge/Synthesizer call
    pub capability_timeout_secs: u64,

    /// Timeout for each tool call, including transport retries
    pub tool_timeout_secs: u64,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            sufficiency_threshold: 7,
            top_k: 5,
            capability_timeout_secs: 60,
            tool_timeout_secs: 30,
        }
    }
}

/// Corpus, index and fusion settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetrievalSettings {
    /// JSONL corpus file, relative to the workspace unless absolute
    pub corpus_path: PathBuf,

    /// Semantic weight in the fusion engine (lexical gets `1 - alpha`)
    pub fusion_alpha: f64,

    /// RRF rank-damping constant
    pub rrf_k: f64,

    /// Tie-break order between retrieval methods
    pub method_priority: Vec<String>,

    /// BM25 term-frequency saturation
    pub bm25_k1: f64,

    /// BM25 length normalization
    pub bm25_b: f64,

    /// Embedding provider ("trigram" or "ollama")
    pub embedding_provider: String,

    /// Embedding model identifier; unset falls back to the provider's `embeddingModel`
    pub embedding_model: Option<String>,

    /// Embedding vector dimensions
    pub embedding_dimensions: usize,

    /// Embed corpus chunks that arrive without a vector
    pub embed_missing: bool,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            corpus_path: PathBuf::from(".sleuth/corpus.jsonl"),
            fusion_alpha: 0.5,
            rrf_k: 60.0,
            method_priority: vec!["semantic".to_string(), "lexical".to_string()],
            bm25_k1: 1.2,
            bm25_b: 0.75,
            embedding_provider: "trigram".to_string(),
            embedding_model: None,
            embedding_dimensions: 384,
            embed_missing: true,
        }
    }
}

/// External web search settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSettings {
    /// Search endpoint (SearxNG-compatible JSON API)
    pub endpoint: String,

    /// Transport attempts per tool call
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// First backoff delay; doubles on every retry
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Upper bound for a single backoff delay
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    100
}

fn default_max_backoff_ms() -> u64 {
    2_000
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
    agent: Option<AgentSettings>,
    retrieval: Option<RetrievalSettings>,
    search: Option<SearchSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
    json: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "ollama".to_string(), // Local-first default
            model: "llama3.2".to_string(),
            log_level: None,
            verbose: false,
            no_color: false,
            log_json: false,
            llm: None,
            agent: AgentSettings::default(),
            retrieval: RetrievalSettings::default(),
            search: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the YAML config file and environment variables.
    ///
    /// Environment variables:
    /// - `SLEUTH_WORKSPACE`: Override workspace path
    /// - `SLEUTH_CONFIG`: Path to config file
    /// - `SLEUTH_PROVIDER`: LLM provider
    /// - `SLEUTH_MODEL`: Model identifier
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use sleuth_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("SLEUTH_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Ok(config_file) = std::env::var("SLEUTH_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.sleuth_dir().join("config.yaml"),
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("SLEUTH_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("SLEUTH_MODEL") {
            config.model = model;
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into a copy of this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        Ok(self.clone().merge(config_file))
    }

    fn merge(mut self, file: ConfigFile) -> Self {
        if let Some(path) = file.workspace.and_then(|ws| ws.path) {
            self.workspace = PathBuf::from(path);
        }

        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                self.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                self.no_color = !color;
            }
            if let Some(json) = logging.json {
                self.log_json = json;
            }
        }

        if let Some(llm) = file.llm {
            self.provider = llm.active_provider.clone();
            if let Some(provider_config) = llm.providers.get(&llm.active_provider) {
                self.model = provider_config.model.clone();
            }
            self.llm = Some(llm);
        }

        if let Some(agent) = file.agent {
            self.agent = agent;
        }

        if let Some(retrieval) = file.retrieval {
            self.retrieval = retrieval;
        }

        if file.search.is_some() {
            self.search = file.search;
        }

        self
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// This method merges command-line flags with the loaded configuration,
    /// giving precedence to CLI flags over environment variables.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
        log_json: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        if log_json {
            self.log_json = true;
        }

        self
    }

    /// Apply per-invocation reasoning loop overrides.
    pub fn with_agent_overrides(
        mut self,
        max_iterations: Option<u32>,
        fusion_alpha: Option<f64>,
        top_k: Option<usize>,
    ) -> Self {
        if let Some(max_iterations) = max_iterations {
            self.agent.max_iterations = max_iterations;
        }

        if let Some(alpha) = fusion_alpha {
            self.retrieval.fusion_alpha = alpha;
        }

        if let Some(top_k) = top_k {
            self.agent.top_k = top_k;
        }

        self
    }

    /// Get the path to the .sleuth directory.
    pub fn sleuth_dir(&self) -> PathBuf {
        self.workspace.join(".sleuth")
    }

    /// Ensure the .sleuth directory exists.
    pub fn ensure_sleuth_dir(&self) -> AppResult<()> {
        let sleuth_dir = self.sleuth_dir();
        if !sleuth_dir.exists() {
            std::fs::create_dir_all(&sleuth_dir).map_err(|e| {
                AppError::Config(format!("Failed to create .sleuth directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Resolve the corpus path against the workspace.
    pub fn corpus_path(&self) -> PathBuf {
        if self.retrieval.corpus_path.is_absolute() {
            self.retrieval.corpus_path.clone()
        } else {
            self.workspace.join(&self.retrieval.corpus_path)
        }
    }

    /// Get the configuration for a provider.
    pub fn get_provider_config(&self, provider: &str) -> Option<&ProviderConfig> {
        self.llm
            .as_ref()
            .and_then(|llm| llm.providers.get(provider))
    }

    /// Endpoint configured for the active provider, if any.
    pub fn provider_endpoint(&self) -> Option<&str> {
        self.get_provider_config(&self.provider)
            .map(|pc| pc.endpoint.as_str())
    }

    /// Embedding model: `retrieval.embeddingModel`, else the matching
    /// provider's `embeddingModel`.
    pub fn embedding_model(&self) -> Option<&str> {
        self.retrieval.embedding_model.as_deref().or_else(|| {
            self.get_provider_config(&self.retrieval.embedding_provider)
                .and_then(|pc| pc.embedding_model.as_deref())
        })
    }

    /// Completion request timeout configured for the active provider, if any.
    pub fn provider_timeout_secs(&self) -> Option<u64> {
        self.get_provider_config(&self.provider)
            .and_then(|pc| pc.timeout)
    }

    /// Validate configuration for the active provider and the reasoning loop.
    pub fn validate(&self) -> AppResult<()> {
        let provider = self.provider.as_str();
        if !KNOWN_PROVIDERS.contains(&provider) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if self.agent.max_iterations == 0 {
            return Err(AppError::Config(
                "agent.maxIterations must be at least 1".to_string(),
            ));
        }

        if self.agent.top_k == 0 {
            return Err(AppError::Config(
                "agent.topK must be at least 1".to_string(),
            ));
        }

        if self.agent.capability_timeout_secs == 0 {
            return Err(AppError::Config(
                "agent.capabilityTimeoutSecs must be at least 1".to_string(),
            ));
        }

        if self.agent.tool_timeout_secs == 0 {
            return Err(AppError::Config(
                "agent.toolTimeoutSecs must be at least 1".to_string(),
            ));
        }

        if self.provider_timeout_secs() == Some(0) {
            return Err(AppError::Config(format!(
                "llm.providers.{}.timeout must be at least 1",
                self.provider
            )));
        }

        if !(1..=10).contains(&self.agent.sufficiency_threshold) {
            return Err(AppError::Config(format!(
                "agent.sufficiencyThreshold must be within 1..=10, got {}",
                self.agent.sufficiency_threshold
            )));
        }

        let alpha = self.retrieval.fusion_alpha;
        if !(0.0..=1.0).contains(&alpha) {
            return Err(AppError::Config(format!(
                "retrieval.fusionAlpha must be within [0, 1], got {}",
                alpha
            )));
        }

        if !(self.retrieval.rrf_k >= 0.0) {
            return Err(AppError::Config(format!(
                "retrieval.rrfK must be non-negative, got {}",
                self.retrieval.rrf_k
            )));
        }

        for method in &self.retrieval.method_priority {
            if !KNOWN_METHODS.contains(&method.as_str()) {
                return Err(AppError::Config(format!(
                    "Unknown retrieval method in methodPriority: {}. Supported: {}",
                    method,
                    KNOWN_METHODS.join(", ")
                )));
            }
        }

        if let Some(ref search) = self.search {
            if search.max_retries == 0 {
                return Err(AppError::Config(
                    "search.maxRetries must be at least 1".to_string(),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.provider, "ollama");
        assert_eq!(config.model, "llama3.2");
        assert_eq!(config.agent.max_iterations, 3);
        assert_eq!(config.agent.sufficiency_threshold, 7);
        assert_eq!(config.agent.top_k, 5);
        assert_eq!(config.retrieval.fusion_alpha, 0.5);
        assert_eq!(config.retrieval.rrf_k, 60.0);
        assert!(config.search.is_none());
        assert!(!config.verbose);
    }

    #[test]
    fn test_sleuth_dir() {
        let config = AppConfig::default();
        assert!(config.sleuth_dir().ends_with(".sleuth"));
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default();
        let overridden = config.with_overrides(
            None,
            None,
            Some("ollama".to_string()),
            Some("qwen2.5".to_string()),
            None,
            true,
            false,
            true,
        );

        assert_eq!(overridden.model, "qwen2.5");
        assert!(overridden.verbose);
        assert!(overridden.log_json);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_agent_overrides() {
        let config = AppConfig::default().with_agent_overrides(Some(5), Some(0.8), None);
        assert_eq!(config.agent.max_iterations, 5);
        assert_eq!(config.retrieval.fusion_alpha, 0.8);
        assert_eq!(config.agent.top_k, 5);
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = AppConfig::default();
        config.provider = "unknown".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_defaults() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_iterations() {
        let mut config = AppConfig::default();
        config.agent.max_iterations = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_timeouts() {
        let mut config = AppConfig::default();
        config.agent.capability_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.agent.tool_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.llm = Some(LlmConfig {
            active_provider: "ollama".to_string(),
            providers: HashMap::from([(
                "ollama".to_string(),
                ProviderConfig {
                    endpoint: "http://localhost:11434".to_string(),
                    model: "llama3.2".to_string(),
                    embedding_model: None,
                    timeout: Some(0),
                },
            )]),
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_alpha_out_of_range() {
        let mut config = AppConfig::default();
        config.retrieval.fusion_alpha = 1.5;
        assert!(config.validate().is_err());

        config.retrieval.fusion_alpha = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_method() {
        let mut config = AppConfig::default();
        config.retrieval.method_priority = vec!["fuzzy".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_merge_yaml_partial_sections() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(
            &path,
            r#"
llm:
  activeProvider: ollama
  providers:
    ollama:
      endpoint: http://gpu-box:11434
      model: mistral
      embeddingModel: nomic-embed-text
      timeout: 90
agent:
  maxIterations: 5
retrieval:
  fusionAlpha: 0.7
logging:
  json: true
search:
  endpoint: http://localhost:8888/search
"#,
        )
        .unwrap();

        let merged = AppConfig::default().merge_yaml(&path).unwrap();
        assert_eq!(merged.model, "mistral");
        assert_eq!(merged.provider_endpoint(), Some("http://gpu-box:11434"));
        assert_eq!(merged.provider_timeout_secs(), Some(90));
        assert_eq!(merged.agent.max_iterations, 5);
        assert_eq!(merged.agent.top_k, 5);
        assert_eq!(merged.retrieval.fusion_alpha, 0.7);
        assert_eq!(merged.retrieval.rrf_k, 60.0);
        assert!(merged.log_json);

        let search = merged.search.unwrap();
        assert_eq!(search.max_retries, 3);
        assert_eq!(search.initial_backoff_ms, 100);
    }

    #[test]
    fn test_embedding_model_fallback() {
        let mut config = AppConfig::default();
        config.llm = Some(LlmConfig {
            active_provider: "ollama".to_string(),
            providers: HashMap::from([(
                "ollama".to_string(),
                ProviderConfig {
                    endpoint: "http://localhost:11434".to_string(),
                    model: "llama3.2".to_string(),
                    embedding_model: Some("nomic-embed-text".to_string()),
                    timeout: None,
                },
            )]),
        });

        // Trigram embedder has no provider entry
        assert_eq!(config.embedding_model(), None);

        config.retrieval.embedding_provider = "ollama".to_string();
        assert_eq!(config.embedding_model(), Some("nomic-embed-text"));

        config.retrieval.embedding_model = Some("mxbai-embed-large".to_string());
        assert_eq!(config.embedding_model(), Some("mxbai-embed-large"));
    }

    #[test]
    fn test_corpus_path_relative_to_workspace() {
        let mut config = AppConfig::default();
        config.workspace = PathBuf::from("/srv/docs");
        assert_eq!(
            config.corpus_path(),
            PathBuf::from("/srv/docs/.sleuth/corpus.jsonl")
        );

        config.retrieval.corpus_path = PathBuf::from("/data/corpus.jsonl");
        assert_eq!(config.corpus_path(), PathBuf::from("/data/corpus.jsonl"));
    }
}
