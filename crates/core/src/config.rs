//! Configuration management for the ITT chatbot.
//!
//! Settings are resolved in layers, later layers winning:
//! - Built-in defaults
//! - YAML config file (`--config`, `ITT_CONFIG`, or `./itt.yaml`)
//! - Environment variables
//! - Command-line flags (`with_overrides`)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{AppError, AppResult};

/// Completion providers the service knows how to build.
pub const LLM_PROVIDERS: &[&str] = &["gemini", "ollama"];

/// Embedding providers the service knows how to build.
pub const EMBEDDING_PROVIDERS: &[&str] = &["gemini", "ollama", "hash"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Config file that was merged, if any
    pub config_file: Option<PathBuf>,

    pub llm: LlmSettings,
    pub embedding: EmbeddingSettings,
    pub knowledge: KnowledgeSettings,
    pub drive: DriveSettings,
    pub server: ServerSettings,

    /// Directory with `<prompt-id>.yml` overrides
    pub prompts_dir: Option<PathBuf>,

    /// Log filter override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Emit JSON log lines
    pub log_json: bool,
}

/// Completion model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub provider: String,
    pub model: String,
    pub temperature: f32,
    pub endpoint: Option<String>,
    pub max_output_tokens: Option<u32>,
    pub timeout_secs: u64,

    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

/// Embedding model settings. The same model must be used for ingestion and
/// for queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
    pub endpoint: Option<String>,
    pub batch_size: usize,
}

/// Index location, chunking and retrieval parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeSettings {
    /// SQLite index file, replaced wholesale on every refresh
    pub index_path: PathBuf,

    /// Local staging directory for source documents
    pub data_path: PathBuf,

    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub score_threshold: f32,
}

/// Google Drive document source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveSettings {
    /// Folder to mirror; when unset the local data directory is used as is
    pub folder_id: Option<String>,

    /// Service-account key file
    pub credentials_path: PathBuf,

    /// Inline service-account key, used when the file is missing
    #[serde(skip_serializing)]
    pub credentials_json: Option<String>,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub frontend_url: String,
    pub frontend_dev_url: Option<String>,
    pub max_question_chars: usize,
    pub sync_on_start: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    llm: Option<LlmSettings>,
    embedding: Option<EmbeddingSettings>,
    knowledge: Option<KnowledgeSettings>,
    drive: Option<DriveSettings>,
    server: Option<ServerSettings>,
    prompts_dir: Option<PathBuf>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
    json: Option<bool>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-2.5-flash".to_string(),
            temperature: 0.3,
            endpoint: None,
            max_output_tokens: None,
            timeout_secs: 60,
            api_key: None,
        }
    }
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-embedding-001".to_string(),
            dimensions: 768,
            endpoint: None,
            batch_size: 64,
        }
    }
}

impl Default for KnowledgeSettings {
    fn default() -> Self {
        Self {
            index_path: PathBuf::from("index/knowledge.sqlite"),
            data_path: PathBuf::from("data"),
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 4,
            score_threshold: 0.3,
        }
    }
}

impl Default for DriveSettings {
    fn default() -> Self {
        Self {
            folder_id: None,
            credentials_path: PathBuf::from("credentials/service_account.json"),
            credentials_json: None,
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            frontend_url: "https://chatbot-itt.vercel.app".to_string(),
            frontend_dev_url: Some("http://localhost:5173".to_string()),
            max_question_chars: 5000,
            sync_on_start: false,
        }
    }
}

impl ServerSettings {
    /// Origins allowed by CORS.
    pub fn allowed_origins(&self) -> Vec<String> {
        let mut origins = vec![self.frontend_url.clone()];
        if let Some(dev) = &self.frontend_dev_url {
            if !dev.is_empty() && dev != &self.frontend_url {
                origins.push(dev.clone());
            }
        }
        origins
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_file: None,
            llm: LlmSettings::default(),
            embedding: EmbeddingSettings::default(),
            knowledge: KnowledgeSettings::default(),
            drive: DriveSettings::default(),
            server: ServerSettings::default(),
            prompts_dir: None,
            log_level: None,
            verbose: false,
            no_color: false,
            log_json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment.
    ///
    /// Environment variables:
    /// - `ITT_CONFIG`: YAML config file (ignored when `config_file` is given)
    /// - `GOOGLE_API_KEY`: API key for Gemini
    /// - `LLM_PROVIDER`, `LLM_MODEL`, `LLM_TEMPERATURE`, `LLM_ENDPOINT`
    /// - `EMBEDDING_PROVIDER`, `EMBEDDING_MODEL`, `EMBEDDING_DIMENSIONS`, `EMBEDDING_ENDPOINT`
    /// - `INDEX_PATH`, `LOCAL_DATA_PATH`, `RETRIEVAL_TOP_K`, `RETRIEVAL_SCORE_THRESHOLD`
    /// - `GOOGLE_DRIVE_FOLDER_ID`, `GOOGLE_CREDENTIALS_PATH`, `GOOGLE_CREDENTIALS_JSON`
    /// - `FRONTEND_URL`, `FRONTEND_DEV_URL`, `PORT`
    /// - `PROMPTS_DIR`, `RUST_LOG`, `NO_COLOR`
    ///
    /// # Example
    /// ```no_run
    /// use itt_core::config::AppConfig;
    ///
    /// let config = AppConfig::load(None).expect("Failed to load config");
    /// println!("Index: {:?}", config.knowledge.index_path);
    /// ```
    pub fn load(config_file: Option<PathBuf>) -> AppResult<Self> {
        Self::load_with(config_file, |key| std::env::var(key).ok())
    }

    /// Load configuration using `lookup` to read environment variables.
    pub fn load_with<F>(config_file: Option<PathBuf>, lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        let explicit = config_file.or_else(|| lookup("ITT_CONFIG").map(PathBuf::from));
        match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(AppError::Config(format!(
                        "Config file does not exist: {:?}",
                        path
                    )));
                }
                config.merge_yaml(&path)?;
            }
            None => {
                let local = PathBuf::from("itt.yaml");
                if local.exists() {
                    config.merge_yaml(&local)?;
                }
            }
        }

        config.merge_env(&lookup)?;
        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&mut self, path: &Path) -> AppResult<()> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        if let Some(llm) = file.llm {
            self.llm = llm;
        }
        if let Some(embedding) = file.embedding {
            self.embedding = embedding;
        }
        if let Some(knowledge) = file.knowledge {
            self.knowledge = knowledge;
        }
        if let Some(drive) = file.drive {
            self.drive = drive;
        }
        if let Some(server) = file.server {
            self.server = server;
        }
        if file.prompts_dir.is_some() {
            self.prompts_dir = file.prompts_dir;
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

        self.config_file = Some(path.to_path_buf());
        Ok(())
    }

    /// Environment variables override the YAML config.
    fn merge_env<F>(&mut self, lookup: &F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("GOOGLE_API_KEY").filter(|k| !k.is_empty()) {
            self.llm.api_key = Some(key);
        }
        if let Some(provider) = lookup("LLM_PROVIDER") {
            self.llm.provider = provider.to_lowercase();
        }
        if let Some(model) = lookup("LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(temperature) = parse_var(lookup, "LLM_TEMPERATURE")? {
            self.llm.temperature = temperature;
        }
        if let Some(endpoint) = lookup("LLM_ENDPOINT") {
            self.llm.endpoint = Some(endpoint);
        }

        if let Some(provider) = lookup("EMBEDDING_PROVIDER") {
            self.embedding.provider = provider.to_lowercase();
        }
        if let Some(model) = lookup("EMBEDDING_MODEL") {
            self.embedding.model = model;
        }
        if let Some(dimensions) = parse_var(lookup, "EMBEDDING_DIMENSIONS")? {
            self.embedding.dimensions = dimensions;
        }
        if let Some(endpoint) = lookup("EMBEDDING_ENDPOINT") {
            self.embedding.endpoint = Some(endpoint);
        }

        if let Some(path) = lookup("INDEX_PATH") {
            self.knowledge.index_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("LOCAL_DATA_PATH") {
            self.knowledge.data_path = PathBuf::from(path);
        }
        if let Some(top_k) = parse_var(lookup, "RETRIEVAL_TOP_K")? {
            self.knowledge.top_k = top_k;
        }
        if let Some(threshold) = parse_var(lookup, "RETRIEVAL_SCORE_THRESHOLD")? {
            self.knowledge.score_threshold = threshold;
        }

        if let Some(folder) = lookup("GOOGLE_DRIVE_FOLDER_ID").filter(|f| !f.is_empty()) {
            self.drive.folder_id = Some(folder);
        }
        if let Some(path) = lookup("GOOGLE_CREDENTIALS_PATH") {
            self.drive.credentials_path = PathBuf::from(path);
        }
        if let Some(json) = lookup("GOOGLE_CREDENTIALS_JSON").filter(|j| !j.is_empty()) {
            self.drive.credentials_json = Some(json);
        }

        if let Some(url) = lookup("FRONTEND_URL") {
            self.server.frontend_url = url;
        }
        if let Some(url) = lookup("FRONTEND_DEV_URL") {
            self.server.frontend_dev_url = Some(url);
        }
        if let Some(port) = parse_var(lookup, "PORT")? {
            self.server.port = port;
        }

        if let Some(dir) = lookup("PROMPTS_DIR") {
            self.prompts_dir = Some(PathBuf::from(dir));
        }
        if let Some(level) = lookup("RUST_LOG") {
            self.log_level = Some(level);
        }
        if lookup("NO_COLOR").is_some() {
            self.no_color = true;
        }

        Ok(())
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        host: Option<String>,
        port: Option<u16>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
        log_json: bool,
        sync_on_start: bool,
    ) -> Self {
        if let Some(host) = host {
            self.server.host = host;
        }

        if let Some(port) = port {
            self.server.port = port;
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

        if sync_on_start {
            self.server.sync_on_start = true;
        }

        self
    }

    /// Validate provider names and numeric ranges.
    pub fn validate(&self) -> AppResult<()> {
        if !LLM_PROVIDERS.contains(&self.llm.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown LLM provider: {}. Supported: {}",
                self.llm.provider,
                LLM_PROVIDERS.join(", ")
            )));
        }

        if !EMBEDDING_PROVIDERS.contains(&self.embedding.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding.provider,
                EMBEDDING_PROVIDERS.join(", ")
            )));
        }

        let needs_google_key = self.llm.provider == "gemini" || self.embedding.provider == "gemini";
        if needs_google_key && self.llm.api_key.is_none() {
            return Err(AppError::Config(
                "GOOGLE_API_KEY is required for the gemini provider".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(AppError::Config(format!(
                "LLM temperature must be within 0.0..=2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.embedding.dimensions == 0 || self.embedding.batch_size == 0 {
            return Err(AppError::Config(
                "Embedding dimensions and batch size must be positive".to_string(),
            ));
        }

        let k = &self.knowledge;
        if k.chunk_size == 0 || k.chunk_overlap >= k.chunk_size {
            return Err(AppError::Config(format!(
                "Chunk overlap ({}) must be smaller than chunk size ({})",
                k.chunk_overlap, k.chunk_size
            )));
        }

        if k.top_k == 0 {
            return Err(AppError::Config("Retrieval top_k must be at least 1".to_string()));
        }

        if !(-1.0..=1.0).contains(&k.score_threshold) {
            return Err(AppError::Config(format!(
                "Score threshold must be a cosine similarity in -1.0..=1.0, got {}",
                k.score_threshold
            )));
        }

        Ok(())
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> AppResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| AppError::Config(format!("Invalid value for {}: {} ({})", key, raw, e))),
        None => Ok(None),
    }
}
