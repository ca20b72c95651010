//! Configuration management for tender.
//!
//! Configuration is resolved once at startup and passed by reference into the
//! engine and orchestrator constructors. Sources, lowest precedence first:
//! - Built-in defaults
//! - YAML config file (`tender.yaml` or `TENDER_CONFIG`)
//! - Environment variables
//! - Command-line flags (`with_overrides`)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};
use crate::logging::LogFormat;

/// Default config file name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "tender.yaml";

/// Search modes the retriever understands. Anything else falls back to
/// plain vector search at dispatch time.
pub const KNOWN_SEARCH_MODES: [&str; 4] = ["embedding", "embedding_rerank", "hybrid", "hybrid_rerank"];

const KNOWN_DIALECTS: [&str; 4] = ["instructional", "native", "gpt", "gguf"];
const KNOWN_BACKENDS: [&str; 1] = ["candle"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Log line format
    pub log_format: LogFormat,

    /// Where the model artifact comes from
    pub model: ModelConfig,

    /// Model construction and sampling defaults
    pub generation: GenerationConfig,

    /// Initial sticky search configuration
    pub search: SearchSettings,

    /// Prompt library settings
    pub prompt: PromptConfig,

    /// Retrieval service settings
    pub retriever: RetrieverConfig,
}

/// Model artifact resolution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Download from the model hub instead of using `local_path`
    pub use_hub: bool,

    /// Pinned local GGUF file
    pub local_path: PathBuf,

    /// Hub repository id (e.g., "org/model-GGUF")
    pub hub_repo: Option<String>,

    /// File inside the hub repository
    pub hub_filename: Option<String>,

    /// Hub base URL
    pub hub_endpoint: String,

    /// Download cache directory
    pub cache_dir: PathBuf,

    /// Tokenizer file used by the local backend
    pub tokenizer_path: Option<PathBuf>,

    /// Inference backend name
    pub backend: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            use_hub: false,
            local_path: PathBuf::from("models/model.gguf"),
            hub_repo: None,
            hub_filename: None,
            hub_endpoint: "https://huggingface.co".to_string(),
            cache_dir: PathBuf::from(".cache/models"),
            tokenizer_path: None,
            backend: "candle".to_string(),
        }
    }
}

/// Model construction parameters and generation defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Layers offloaded to the GPU (0 = CPU only)
    pub gpu_layers: u32,

    /// Context window in tokens
    pub context_size: u32,

    /// CPU threads used for inference
    pub threads: u32,

    pub max_new_tokens: u32,

    pub temperature: f32,

    pub top_p: f32,

    /// Fallback system prompt when a caller supplies none
    pub system_prompt: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            gpu_layers: 0,
            context_size: 2048,
            threads: 8,
            max_new_tokens: 256,
            temperature: 0.7,
            top_p: 0.9,
            system_prompt: "You are an expert in analysing and summarising RFP (request for proposal) documents."
                .to_string(),
        }
    }
}

/// Initial values for the orchestrator's sticky search configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub mode: String,
    pub top_k: usize,
    /// Vector weight in hybrid search (lexical weight is `1 - alpha`)
    pub alpha: f32,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            mode: "hybrid_rerank".to_string(),
            top_k: 10,
            alpha: 0.5,
        }
    }
}

/// Prompt library settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Prompt dialect ("instructional" or "native")
    pub dialect: String,

    /// Optional YAML prompt pack overlaid on the built-in prompts
    pub pack_path: Option<PathBuf>,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            dialect: "instructional".to_string(),
            pack_path: None,
        }
    }
}

/// Retrieval service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrieverConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8000".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    model: Option<ModelConfig>,
    generation: Option<GenerationConfig>,
    search: Option<SearchSettings>,
    prompt: Option<PromptConfig>,
    retriever: Option<RetrieverConfig>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
    format: Option<LogFormat>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_file: None,
            log_level: None,
            verbose: false,
            no_color: false,
            log_format: LogFormat::Pretty,
            model: ModelConfig::default(),
            generation: GenerationConfig::default(),
            search: SearchSettings::default(),
            prompt: PromptConfig::default(),
            retriever: RetrieverConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the YAML file and the environment.
    ///
    /// Environment variables:
    /// - `TENDER_CONFIG`: Path to config file
    /// - `TENDER_USE_MODEL_HUB`: Download the model from the hub ("true"/"1")
    /// - `TENDER_MODEL_PATH`: Local GGUF file
    /// - `TENDER_MODEL_HUB_REPO`, `TENDER_MODEL_HUB_FILENAME`: Hub artifact
    /// - `TENDER_MODEL_CACHE_DIR`: Download cache directory
    /// - `TENDER_TOKENIZER_PATH`: Tokenizer file for the local backend
    /// - `HF_ENDPOINT`: Hub base URL
    /// - `HF_TOKEN`: Hub access token, read by the hub client
    /// - `TENDER_GPU_LAYERS`, `TENDER_CONTEXT_SIZE`, `TENDER_THREADS`
    /// - `TENDER_SEARCH_MODE`, `TENDER_TOP_K`, `TENDER_ALPHA`
    /// - `TENDER_RETRIEVER_ENDPOINT`
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use tender_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Search mode: {}", config.search.mode);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_from(None)
    }

    /// Like [`load`](Self::load), with an explicit config file taking
    /// precedence over `TENDER_CONFIG`.
    pub fn load_from(config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        config.config_file = config_file.or_else(|| std::env::var("TENDER_CONFIG").ok().map(PathBuf::from));

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file does not exist: {:?}",
                config_path
            )));
        }

        config.apply_env(|key| std::env::var(key).ok())?;

        Ok(config)
    }

    /// Merge YAML configuration file into this config.
    pub fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(model) = config_file.model {
            result.model = model;
        }
        if let Some(generation) = config_file.generation {
            result.generation = generation;
        }
        if let Some(search) = config_file.search {
            result.search = search;
        }
        if let Some(prompt) = config_file.prompt {
            result.prompt = prompt;
        }
        if let Some(retriever) = config_file.retriever {
            result.retriever = retriever;
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(format) = logging.format {
                result.log_format = format;
            }
        }

        tracing::debug!("Merged config file {:?}", path);
        Ok(result)
    }

    /// Apply environment overrides using `lookup` to read variables.
    pub fn apply_env<F>(&mut self, lookup: F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("TENDER_USE_MODEL_HUB") {
            self.model.use_hub = parse_bool("TENDER_USE_MODEL_HUB", &value)?;
        }
        if let Some(path) = lookup("TENDER_MODEL_PATH") {
            self.model.local_path = PathBuf::from(path);
        }
        if let Some(repo) = lookup("TENDER_MODEL_HUB_REPO") {
            self.model.hub_repo = Some(repo);
        }
        if let Some(filename) = lookup("TENDER_MODEL_HUB_FILENAME") {
            self.model.hub_filename = Some(filename);
        }
        if let Some(dir) = lookup("TENDER_MODEL_CACHE_DIR") {
            self.model.cache_dir = PathBuf::from(dir);
        }
        if let Some(path) = lookup("TENDER_TOKENIZER_PATH") {
            self.model.tokenizer_path = Some(PathBuf::from(path));
        }
        if let Some(endpoint) = lookup("HF_ENDPOINT") {
            self.model.hub_endpoint = endpoint;
        }

        if let Some(value) = lookup("TENDER_GPU_LAYERS") {
            self.generation.gpu_layers = parse_number("TENDER_GPU_LAYERS", &value)?;
        }
        if let Some(value) = lookup("TENDER_CONTEXT_SIZE") {
            self.generation.context_size = parse_number("TENDER_CONTEXT_SIZE", &value)?;
        }
        if let Some(value) = lookup("TENDER_THREADS") {
            self.generation.threads = parse_number("TENDER_THREADS", &value)?;
        }

        if let Some(mode) = lookup("TENDER_SEARCH_MODE") {
            self.search.mode = mode;
        }
        if let Some(value) = lookup("TENDER_TOP_K") {
            self.search.top_k = parse_number("TENDER_TOP_K", &value)?;
        }
        if let Some(value) = lookup("TENDER_ALPHA") {
            self.search.alpha = parse_number("TENDER_ALPHA", &value)?;
        }

        if let Some(endpoint) = lookup("TENDER_RETRIEVER_ENDPOINT") {
            self.retriever.endpoint = endpoint;
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
    /// CLI flags take precedence over the environment and the config file.
    pub fn with_overrides(
        mut self,
        config_file: Option<PathBuf>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
        log_format: Option<LogFormat>,
    ) -> Self {
        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
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

        if let Some(format) = log_format {
            self.log_format = format;
        }

        self
    }

    /// Validate the resolved configuration.
    pub fn validate(&self) -> AppResult<()> {
        if self.search.top_k == 0 {
            return Err(AppError::Config("search.top_k must be at least 1".to_string()));
        }

        if !(0.0..=1.0).contains(&self.search.alpha) {
            return Err(AppError::Config(format!(
                "search.alpha must be within [0, 1], got {}",
                self.search.alpha
            )));
        }

        if !KNOWN_SEARCH_MODES.contains(&self.search.mode.as_str()) {
            tracing::warn!(
                "Unknown search mode '{}', document queries will use plain vector search",
                self.search.mode
            );
        }

        let dialect = self.prompt.dialect.to_lowercase();
        if !KNOWN_DIALECTS.contains(&dialect.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown prompt dialect: {}. Supported: {}",
                self.prompt.dialect,
                KNOWN_DIALECTS.join(", ")
            )));
        }

        if !KNOWN_BACKENDS.contains(&self.model.backend.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown model backend: {}. Supported: {}",
                self.model.backend,
                KNOWN_BACKENDS.join(", ")
            )));
        }

        if self.model.use_hub && (self.model.hub_repo.is_none() || self.model.hub_filename.is_none()) {
            return Err(AppError::Config(
                "model.use_hub requires model.hub_repo and model.hub_filename".to_string(),
            ));
        }

        if self.generation.context_size == 0 || self.generation.threads == 0 {
            return Err(AppError::Config(
                "generation.context_size and generation.threads must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> AppResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(AppError::Config(format!(
            "Invalid boolean for {}: {}",
            key, other
        ))),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> AppResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::Config(format!("Invalid numeric value for {}: {}", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.search.mode, "hybrid_rerank");
        assert_eq!(config.search.top_k, 10);
        assert_eq!(config.search.alpha, 0.5);
        assert_eq!(config.generation.context_size, 2048);
        assert_eq!(config.prompt.dialect, "instructional");
        assert!(!config.model.use_hub);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_merge_partial_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "search:\n  mode: hybrid\n  top_k: 3\ngeneration:\n  gpu_layers: 35\nlogging:\n  color: false\n  format: json"
        )
        .unwrap();

        let merged = AppConfig::default().merge_yaml(file.path()).unwrap();
        assert_eq!(merged.search.mode, "hybrid");
        assert_eq!(merged.search.top_k, 3);
        // Missing keys inside a section keep their defaults
        assert_eq!(merged.search.alpha, 0.5);
        assert_eq!(merged.generation.gpu_layers, 35);
        assert_eq!(merged.generation.context_size, 2048);
        assert!(merged.no_color);
        assert_eq!(merged.log_format, LogFormat::Json);
    }

    #[test]
    fn test_merge_invalid_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "search: [not, a, map").unwrap();

        let result = AppConfig::default().merge_yaml(file.path());
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config
            .apply_env(env_of(&[
                ("TENDER_USE_MODEL_HUB", "true"),
                ("TENDER_MODEL_HUB_REPO", "org/rfp-model-GGUF"),
                ("TENDER_MODEL_HUB_FILENAME", "model.Q4_K_M.gguf"),
                ("TENDER_TOP_K", "5"),
                ("TENDER_ALPHA", "0.7"),
                ("NO_COLOR", "1"),
            ]))
            .unwrap();

        assert!(config.model.use_hub);
        assert_eq!(config.model.hub_repo.as_deref(), Some("org/rfp-model-GGUF"));
        assert_eq!(config.search.top_k, 5);
        assert_eq!(config.search.alpha, 0.7);
        assert!(config.no_color);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_rejects_bad_number() {
        let mut config = AppConfig::default();
        let result = config.apply_env(env_of(&[("TENDER_TOP_K", "many")]));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_with_overrides() {
        let overridden = AppConfig::default().with_overrides(
            Some(PathBuf::from("custom.yaml")),
            None,
            true,
            false,
            Some(LogFormat::Json),
        );

        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
        assert_eq!(overridden.config_file, Some(PathBuf::from("custom.yaml")));
        assert_eq!(overridden.log_format, LogFormat::Json);
    }

    #[test]
    fn test_validate_hub_requires_repo() {
        let mut config = AppConfig::default();
        config.model.use_hub = true;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_alpha_range() {
        let mut config = AppConfig::default();
        config.search.alpha = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_unknown_dialect() {
        let mut config = AppConfig::default();
        config.prompt.dialect = "shouty".to_string();
        assert!(config.validate().is_err());

        config.prompt.dialect = "gguf".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_search_mode_is_not_fatal() {
        let mut config = AppConfig::default();
        config.search.mode = "bogus".to_string();
        assert!(config.validate().is_ok());
    }
}
