//! Configuration management for the tax assistant.
//!
//! Configuration is read once at startup and is read-only afterwards.
//! Sources, lowest to highest precedence:
//! - Built-in defaults
//! - A `.env` file in the working directory (read, never exported)
//! - The YAML config file (`.tributario/config.yaml` or `TRIBUTARIO_CONFIG`)
//! - Environment variables
//! - Command-line flags (see [`AppConfig::load_from`] and
//!   [`AppConfig::with_overrides`])

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Chat providers the assistant can talk to.
pub const KNOWN_PROVIDERS: [&str; 2] = ["openai", "ollama"];

/// Reranking strategies applied after the initial vector query.
pub const KNOWN_RERANKERS: [&str; 3] = ["pinecone", "llm", "none"];

/// Prefix for per-topic index overrides in the environment,
/// e.g. `TRIBUTARIO_INDEX_ADUANAS=aduanas-2024`.
const INDEX_ENV_PREFIX: &str = "TRIBUTARIO_INDEX_";

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Workspace root (contains `.tributario/`)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Chat provider for answer generation ("openai" or "ollama")
    pub provider: String,

    /// Model used for answer generation
    pub model: String,

    /// Model used by the topic router
    pub router_model: String,

    /// Model used by the graders and the LLM reranker
    pub grader_model: String,

    /// Embedding model the vector indexes were built with
    pub embedding_model: String,

    /// Custom chat endpoint (base URL)
    pub llm_endpoint: Option<String>,

    /// Timeout applied to every outbound HTTP request
    pub request_timeout_secs: u64,

    /// Model provider credential (`OPENAI_API_KEY`)
    #[serde(skip_serializing)]
    pub openai_api_key: Option<String>,

    /// Vector store credential (`PINECONE_API_KEY`)
    #[serde(skip_serializing)]
    pub pinecone_api_key: Option<String>,

    /// Vector store and reranking settings
    pub retrieval: RetrievalSettings,

    /// Cap on GENERATE calls per workflow run
    pub max_generations: u32,

    /// Record a step trace for each workflow run
    pub debug: bool,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,
}

/// Vector store and reranking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetrievalSettings {
    /// Index used when a topic index is absent and for general queries
    pub default_index: String,

    /// Optional Pinecone namespace
    pub namespace: Option<String>,

    /// Candidates fetched from the vector store per query
    pub top_k: usize,

    /// Documents kept after reranking
    pub rerank_top_k: usize,

    /// Reranking strategy ("pinecone", "llm", "none")
    pub reranker: String,

    /// Hosted reranking model
    pub rerank_model: String,

    /// Per-topic index name overrides, keyed by topic label
    pub indexes: BTreeMap<String, String>,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            default_index: "ejhr".to_string(),
            namespace: None,
            top_k: 20,
            rerank_top_k: 8,
            reranker: "pinecone".to_string(),
            rerank_model: "bge-reranker-v2-m3".to_string(),
            indexes: BTreeMap::new(),
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmSection>,
    retrieval: Option<RetrievalSection>,
    workflow: Option<WorkflowSection>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LlmSection {
    provider: Option<String>,
    model: Option<String>,
    router_model: Option<String>,
    grader_model: Option<String>,
    embedding_model: Option<String>,
    endpoint: Option<String>,
    timeout: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RetrievalSection {
    default_index: Option<String>,
    namespace: Option<String>,
    top_k: Option<usize>,
    rerank_top_k: Option<usize>,
    reranker: Option<String>,
    rerank_model: Option<String>,
    indexes: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkflowSection {
    max_generations: Option<u32>,
    debug: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            router_model: "gpt-3.5-turbo".to_string(),
            grader_model: "gpt-3.5-turbo".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            llm_endpoint: None,
            request_timeout_secs: 60,
            openai_api_key: None,
            pinecone_api_key: None,
            retrieval: RetrievalSettings::default(),
            max_generations: 3,
            debug: false,
            log_level: None,
            verbose: false,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from `.env`, the YAML file and the environment.
    ///
    /// Environment variables:
    /// - `TRIBUTARIO_WORKSPACE`, `TRIBUTARIO_CONFIG`
    /// - `TRIBUTARIO_PROVIDER`, `TRIBUTARIO_MODEL`
    /// - `TRIBUTARIO_MAX_GENERATIONS`, `TRIBUTARIO_DEBUG`
    /// - `TRIBUTARIO_INDEX_<TOPIC>`: per-topic index override
    /// - `OPENAI_API_KEY`, `PINECONE_API_KEY`, `PINECONE_INDEX_NAME`
    /// - `RUST_LOG`, `NO_COLOR`
    ///
    /// Credentials are not checked here; call [`AppConfig::validate`].
    pub fn load() -> AppResult<Self> {
        Self::load_from(None, None)
    }

    /// Like [`AppConfig::load`], with the workspace and config file given on
    /// the command line. Either path wins over its environment variable.
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let dotenv = read_dotenv();
        let env: BTreeMap<String, String> = std::env::vars().collect();
        Self::from_sources(workspace, config_file, &dotenv, &env)
    }

    /// Layer defaults, `.env` values, the YAML file and the environment.
    fn from_sources(
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        dotenv: &BTreeMap<String, String>,
        env: &BTreeMap<String, String>,
    ) -> AppResult<Self> {
        let lookup = |key: &str| env.get(key).or_else(|| dotenv.get(key)).cloned();
        let mut config = Self::default();

        if let Some(workspace) = workspace.or_else(|| lookup("TRIBUTARIO_WORKSPACE").map(PathBuf::from)) {
            config.workspace = workspace;
        }
        config.config_file = config_file.or_else(|| lookup("TRIBUTARIO_CONFIG").map(PathBuf::from));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        config.apply_env(|key| dotenv.get(key).cloned());
        config.apply_index_env(dotenv.clone());

        // An explicit config file must exist; the workspace one is optional.
        match config.config_file.clone() {
            Some(path) => config = config.merge_yaml(&path)?,
            None => {
                let path = config.config_dir().join("config.yaml");
                if path.exists() {
                    config = config.merge_yaml(&path)?;
                }
            }
        }

        config.apply_env(|key| env.get(key).cloned());
        config.apply_index_env(env.clone());

        Ok(config)
    }

    /// Apply scalar environment variables through a lookup function.
    fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(provider) = lookup("TRIBUTARIO_PROVIDER") {
            self.provider = provider;
        }

        if let Some(model) = lookup("TRIBUTARIO_MODEL") {
            self.model = model;
        }

        if let Some(index) = lookup("PINECONE_INDEX_NAME") {
            self.retrieval.default_index = index;
        }

        if let Some(max) = lookup("TRIBUTARIO_MAX_GENERATIONS") {
            match max.parse() {
                Ok(max) => self.max_generations = max,
                Err(_) => tracing::warn!("Ignoring invalid TRIBUTARIO_MAX_GENERATIONS: {}", max),
            }
        }

        if let Some(debug) = lookup("TRIBUTARIO_DEBUG") {
            self.debug = matches!(debug.to_lowercase().as_str(), "1" | "true" | "yes");
        }

        if let Some(key) = lookup("OPENAI_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.openai_api_key = Some(key);
        }

        if let Some(key) = lookup("PINECONE_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.pinecone_api_key = Some(key);
        }

        if let Some(level) = lookup("RUST_LOG") {
            self.log_level = Some(level);
        }

        if lookup("NO_COLOR").is_some() {
            self.no_color = true;
        }
    }

    /// Collect `TRIBUTARIO_INDEX_<TOPIC>` overrides.
    fn apply_index_env<I>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if let Some(topic) = key.strip_prefix(INDEX_ENV_PREFIX) {
                if !topic.is_empty() && !value.trim().is_empty() {
                    self.retrieval
                        .indexes
                        .insert(topic.to_lowercase(), value.trim().to_string());
                }
            }
        }
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        Ok(self.merge_file(config_file))
    }

    fn merge_file(&self, file: ConfigFile) -> Self {
        let mut result = self.clone();

        if let Some(llm) = file.llm {
            if let Some(provider) = llm.provider {
                result.provider = provider;
            }
            if let Some(model) = llm.model {
                result.model = model;
            }
            if let Some(model) = llm.router_model {
                result.router_model = model;
            }
            if let Some(model) = llm.grader_model {
                result.grader_model = model;
            }
            if let Some(model) = llm.embedding_model {
                result.embedding_model = model;
            }
            if llm.endpoint.is_some() {
                result.llm_endpoint = llm.endpoint;
            }
            if let Some(timeout) = llm.timeout {
                result.request_timeout_secs = timeout;
            }
        }

        if let Some(retrieval) = file.retrieval {
            let settings = &mut result.retrieval;
            if let Some(index) = retrieval.default_index {
                settings.default_index = index;
            }
            if retrieval.namespace.is_some() {
                settings.namespace = retrieval.namespace;
            }
            if let Some(top_k) = retrieval.top_k {
                settings.top_k = top_k;
            }
            if let Some(top_k) = retrieval.rerank_top_k {
                settings.rerank_top_k = top_k;
            }
            if let Some(reranker) = retrieval.reranker {
                settings.reranker = reranker;
            }
            if let Some(model) = retrieval.rerank_model {
                settings.rerank_model = model;
            }
            for (topic, index) in retrieval.indexes.unwrap_or_default() {
                settings.indexes.insert(topic.to_lowercase(), index);
            }
        }

        if let Some(workflow) = file.workflow {
            if let Some(max) = workflow.max_generations {
                result.max_generations = max;
            }
            if let Some(debug) = workflow.debug {
                result.debug = debug;
            }
        }

        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        result
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over everything loaded by
    /// [`AppConfig::load_from`], which already took the workspace and config
    /// file flags.
    pub fn with_overrides(
        mut self,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
        debug: bool,
    ) -> Self {
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
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        if debug {
            self.debug = true;
        }

        self
    }

    /// Path to the `.tributario` directory.
    pub fn config_dir(&self) -> PathBuf {
        self.workspace.join(".tributario")
    }

    /// Configured index override for a topic label, if any.
    pub fn index_override(&self, topic: &str) -> Option<&str> {
        self.retrieval
            .indexes
            .get(&topic.to_lowercase())
            .map(String::as_str)
    }

    /// Model credential, or a fatal configuration error.
    pub fn require_openai_key(&self) -> AppResult<&str> {
        self.openai_api_key.as_deref().ok_or_else(|| {
            AppError::Config(
                "OPENAI_API_KEY is not set. Add it to the environment or the .env file."
                    .to_string(),
            )
        })
    }

    /// Vector store credential, or a fatal configuration error.
    pub fn require_pinecone_key(&self) -> AppResult<&str> {
        self.pinecone_api_key.as_deref().ok_or_else(|| {
            AppError::Config(
                "PINECONE_API_KEY is not set. Add it to the environment or the .env file."
                    .to_string(),
            )
        })
    }

    /// Validate the configuration before any network call is made.
    pub fn validate(&self) -> AppResult<()> {
        if !KNOWN_PROVIDERS.contains(&self.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if !KNOWN_RERANKERS.contains(&self.retrieval.reranker.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown reranker: {}. Supported: {}",
                self.retrieval.reranker,
                KNOWN_RERANKERS.join(", ")
            )));
        }

        if self.max_generations == 0 {
            return Err(AppError::Config(
                "max_generations must be at least 1".to_string(),
            ));
        }

        if self.retrieval.top_k == 0 || self.retrieval.rerank_top_k == 0 {
            return Err(AppError::Config("top_k values must be at least 1".to_string()));
        }

        // Query embeddings always come from OpenAI, whatever the chat provider.
        self.require_openai_key()?;
        self.require_pinecone_key()?;

        Ok(())
    }
}

/// Read `.env` from the working directory (or a parent) without touching the
/// process environment, so the YAML file can sit between the two.
fn read_dotenv() -> BTreeMap<String, String> {
    let iter = match dotenvy::dotenv_iter() {
        Ok(iter) => iter,
        // A missing .env file is the normal case in production.
        Err(_) => return BTreeMap::new(),
    };

    let mut values = BTreeMap::new();
    for item in iter {
        match item {
            Ok((key, value)) => {
                values.insert(key, value);
            }
            Err(e) => tracing::warn!("Ignoring malformed .env entry: {}", e),
        }
    }

    tracing::debug!("Loaded {} values from .env", values.len());
    values
}
