//! Text generation engine.
//!
//! Owns the single model handle and its lifecycle:
//!
//! ```text
//! Uninitialized --initialize()--> Initializing --ok--> Ready
//!                                      |
//!                                      +--err--> Failed --reset()--> Uninitialized
//! ```
//!
//! Only `Ready` allows generation. `Failed` is terminal until `reset()`.
//! Dropping an `initialize()` call mid-load returns to `Uninitialized`.

use crate::hub::HubClient;
use crate::model::{CompletionRequest, LanguageModel, ModelLoader, ModelParams};
use crate::template;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tender_core::config::AppConfig;
use tender_core::{AppError, AppResult, BoxError};

type SharedModel = Arc<Mutex<Box<dyn LanguageModel>>>;

/// Where the model artifact comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelSource {
    /// Pinned file on the local filesystem
    Local { path: PathBuf },
    /// File fetched from a model hub into a cache directory
    Hub {
        endpoint: String,
        repo: String,
        filename: String,
        cache_dir: PathBuf,
    },
}

impl ModelSource {
    /// Resolve the source from configuration.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let model = &config.model;
        if !model.use_hub {
            return Ok(ModelSource::Local {
                path: model.local_path.clone(),
            });
        }

        match (&model.hub_repo, &model.hub_filename) {
            (Some(repo), Some(filename)) => Ok(ModelSource::Hub {
                endpoint: model.hub_endpoint.clone(),
                repo: repo.clone(),
                filename: filename.clone(),
                cache_dir: model.cache_dir.clone(),
            }),
            _ => Err(AppError::Config(
                "model.use_hub requires model.hub_repo and model.hub_filename".to_string(),
            )),
        }
    }

    fn describe(&self) -> String {
        match self {
            ModelSource::Local { path } => path.display().to_string(),
            ModelSource::Hub { repo, filename, .. } => format!("{}/{}", repo, filename),
        }
    }
}

/// Sampling defaults used when a call does not override them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingDefaults {
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

/// Everything the engine needs, resolved from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub source: ModelSource,
    pub params: ModelParams,
    pub defaults: SamplingDefaults,
    /// Fallback when `format_prompt` gets no system prompt
    pub system_prompt: String,
}

impl EngineSettings {
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let generation = &config.generation;
        Ok(Self {
            source: ModelSource::from_config(config)?,
            params: ModelParams {
                gpu_layers: generation.gpu_layers,
                context_size: generation.context_size,
                threads: generation.threads,
            },
            defaults: SamplingDefaults {
                max_new_tokens: generation.max_new_tokens,
                temperature: generation.temperature,
                top_p: generation.top_p,
            },
            system_prompt: generation.system_prompt.clone(),
        })
    }
}

/// Per-call sampling overrides. `None` keeps the engine default.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GenerationOverrides {
    pub max_new_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
}

/// Lifecycle state of the model handle.
enum EngineState {
    Uninitialized,
    Initializing,
    Ready(SharedModel),
    Failed(String),
}

impl EngineState {
    fn name(&self) -> &'static str {
        match self {
            EngineState::Uninitialized => "uninitialized",
            EngineState::Initializing => "initializing",
            EngineState::Ready(_) => "ready",
            EngineState::Failed(_) => "failed",
        }
    }
}

/// Snapshot of the engine's configuration and load state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub source: ModelSource,
    pub backend: String,
    pub gpu_layers: u32,
    pub context_size: u32,
    pub threads: u32,
    pub is_loaded: bool,
    pub state: String,
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

/// Formats dialogues and produces bounded completions from one model.
pub struct TextGenerationEngine {
    settings: EngineSettings,
    loader: Arc<dyn ModelLoader>,
    hub: HubClient,
    state: EngineState,
}

impl TextGenerationEngine {
    /// Create an engine. No model is loaded until [`initialize`](Self::initialize).
    pub fn new(settings: EngineSettings, loader: Arc<dyn ModelLoader>) -> Self {
        let hub = match &settings.source {
            ModelSource::Hub { endpoint, .. } => HubClient::with_endpoint(endpoint.clone()),
            ModelSource::Local { .. } => HubClient::new(),
        };

        Self {
            settings,
            loader,
            hub,
            state: EngineState::Uninitialized,
        }
    }

    /// Resolve the model artifact and construct the model handle.
    ///
    /// Calling this on a ready engine is a no-op. A failed engine stays failed
    /// until [`reset`](Self::reset) is called.
    pub async fn initialize(&mut self) -> AppResult<()> {
        match &self.state {
            EngineState::Ready(_) => {
                tracing::info!("Model already loaded, skipping initialization");
                return Ok(());
            }
            EngineState::Initializing => {
                return Err(AppError::model_load("model initialization already in progress"));
            }
            EngineState::Failed(reason) => {
                return Err(AppError::model_load(format!(
                    "previous initialization failed ({}); call reset() before retrying",
                    reason
                )));
            }
            EngineState::Uninitialized => {}
        }

        let started = Instant::now();
        let transition = Transition::begin(&mut self.state);

        match load_model(&self.settings, &self.hub, &self.loader).await {
            Ok(model) => {
                transition.settle(EngineState::Ready(Arc::new(Mutex::new(model))));
                tracing::info!(
                    "Model loaded in {:.2}s ({})",
                    started.elapsed().as_secs_f64(),
                    self.settings.source.describe()
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!("Model initialization failed: {}", e);
                transition.settle(EngineState::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    /// Drop any loaded model and return to `Uninitialized`.
    pub fn reset(&mut self) {
        tracing::info!("Resetting engine (was {})", self.state.name());
        self.state = EngineState::Uninitialized;
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, EngineState::Ready(_))
    }

    /// Render the three-turn dialogue for the model.
    ///
    /// Pure: identical arguments always produce identical bytes.
    pub fn format_prompt(
        &self,
        question: &str,
        context: Option<&str>,
        system_prompt: Option<&str>,
    ) -> String {
        let system_prompt = match system_prompt {
            Some(prompt) => {
                tracing::debug!("Using system prompt: {}", preview(prompt, 80));
                prompt
            }
            None => {
                tracing::warn!("No system prompt supplied, using the configured default");
                self.settings.system_prompt.as_str()
            }
        };

        let user = template::user_message(question, context);
        template::render_dialogue(system_prompt, &user)
    }

    /// Complete an already formatted prompt.
    pub async fn generate(&self, prompt: &str, overrides: GenerationOverrides) -> AppResult<String> {
        let model = match &self.state {
            EngineState::Ready(model) => Arc::clone(model),
            _ => return Err(AppError::EngineNotReady),
        };

        let request = self.build_request(prompt, overrides);
        tracing::info!(
            "Generating (max_tokens={}, temperature={})",
            request.max_tokens,
            request.temperature
        );

        let started = Instant::now();
        let stops = request.stop.clone();
        let completion = tokio::task::spawn_blocking(move || {
            let mut guard = model
                .lock()
                .map_err(|e| -> BoxError { format!("model lock poisoned: {}", e).into() })?;
            guard.complete(&request)
        })
        .await
        .map_err(AppError::generation)?
        .map_err(|source| AppError::Generation { source })?;

        let text = template::truncate_at_stop(&completion.text, &stops)
            .trim()
            .to_string();

        tracing::info!(
            "Generation finished in {:.2}s ({} tokens, {} chars, {:?})",
            started.elapsed().as_secs_f64(),
            completion.tokens_generated,
            text.chars().count(),
            completion.finish_reason
        );

        Ok(text)
    }

    /// Format a dialogue and generate the assistant reply.
    pub async fn chat(
        &self,
        question: &str,
        context: Option<&str>,
        system_prompt: Option<&str>,
        overrides: GenerationOverrides,
    ) -> AppResult<String> {
        let prompt = self.format_prompt(question, context, system_prompt);
        self.generate(&prompt, overrides).await
    }

    pub fn model_info(&self) -> ModelInfo {
        ModelInfo {
            source: self.settings.source.clone(),
            backend: self.loader.backend_name().to_string(),
            gpu_layers: self.settings.params.gpu_layers,
            context_size: self.settings.params.context_size,
            threads: self.settings.params.threads,
            is_loaded: self.is_ready(),
            state: self.state.name().to_string(),
            max_new_tokens: self.settings.defaults.max_new_tokens,
            temperature: self.settings.defaults.temperature,
            top_p: self.settings.defaults.top_p,
        }
    }

    fn build_request(&self, prompt: &str, overrides: GenerationOverrides) -> CompletionRequest {
        let defaults = &self.settings.defaults;
        CompletionRequest {
            prompt: prompt.to_string(),
            max_tokens: overrides.max_new_tokens.unwrap_or(defaults.max_new_tokens),
            temperature: overrides.temperature.unwrap_or(defaults.temperature),
            top_p: overrides.top_p.unwrap_or(defaults.top_p),
            stop: template::STOP_SEQUENCES.iter().map(|s| s.to_string()).collect(),
            echo: false,
        }
    }
}

/// Holds the engine in `Initializing` while a load is in flight.
///
/// If the `initialize()` future is dropped before the load settles, the
/// engine falls back to `Uninitialized` so a later call can retry. A
/// blocking load already handed to the thread pool runs to completion and
/// its model is discarded.
struct Transition<'a> {
    state: &'a mut EngineState,
    settled: bool,
}

impl<'a> Transition<'a> {
    fn begin(state: &'a mut EngineState) -> Self {
        *state = EngineState::Initializing;
        Self {
            state,
            settled: false,
        }
    }

    fn settle(mut self, next: EngineState) {
        *self.state = next;
        self.settled = true;
    }
}

impl Drop for Transition<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!("Model initialization cancelled, engine returns to uninitialized");
            *self.state = EngineState::Uninitialized;
        }
    }
}

async fn load_model(
    settings: &EngineSettings,
    hub: &HubClient,
    loader: &Arc<dyn ModelLoader>,
) -> AppResult<Box<dyn LanguageModel>> {
    let path = resolve_model_path(&settings.source, hub).await?;
    let params = settings.params.clone();

    tracing::info!(
        "Loading model with {} backend (gpu_layers={}, context={}, threads={})",
        loader.backend_name(),
        params.gpu_layers,
        params.context_size,
        params.threads
    );

    let loader = Arc::clone(loader);
    tokio::task::spawn_blocking(move || loader.load(&path, &params))
        .await
        .map_err(AppError::model_load)?
        .map_err(|source| AppError::ModelLoad { source })
}

async fn resolve_model_path(source: &ModelSource, hub: &HubClient) -> AppResult<PathBuf> {
    match source {
        ModelSource::Local { path } => {
            if !path.exists() {
                return Err(AppError::ModelNotFound { path: path.clone() });
            }
            tracing::info!("Using local model: {:?}", path);
            Ok(path.clone())
        }
        ModelSource::Hub {
            repo,
            filename,
            cache_dir,
            ..
        } => hub.download(repo, filename, cache_dir).await,
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Completion, FinishReason};
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tender_core::ErrorKind;

    /// Records requests and replies with a fixed text.
    struct ScriptedModel {
        reply: String,
        seen: Arc<Mutex<Vec<CompletionRequest>>>,
    }

    impl LanguageModel for ScriptedModel {
        fn complete(&mut self, request: &CompletionRequest) -> Result<Completion, BoxError> {
            self.seen.lock().unwrap().push(request.clone());
            if self.reply == "FAIL" {
                return Err("backend exploded".into());
            }
            Ok(Completion {
                text: self.reply.clone(),
                tokens_generated: 3,
                finish_reason: FinishReason::Stop,
            })
        }
    }

    struct CountingLoader {
        loads: Arc<AtomicUsize>,
        reply: String,
        seen: Arc<Mutex<Vec<CompletionRequest>>>,
        fail: bool,
        delay: Duration,
    }

    impl CountingLoader {
        fn new(reply: &str) -> Self {
            Self {
                loads: Arc::new(AtomicUsize::new(0)),
                reply: reply.to_string(),
                seen: Arc::new(Mutex::new(Vec::new())),
                fail: false,
                delay: Duration::ZERO,
            }
        }
    }

    impl ModelLoader for CountingLoader {
        fn backend_name(&self) -> &str {
            "counting"
        }

        fn load(&self, _path: &Path, _params: &ModelParams) -> Result<Box<dyn LanguageModel>, BoxError> {
            std::thread::sleep(self.delay);
            self.loads.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err("corrupt gguf header".into());
            }
            Ok(Box::new(ScriptedModel {
                reply: self.reply.clone(),
                seen: Arc::clone(&self.seen),
            }))
        }
    }

    fn settings_for(path: PathBuf) -> EngineSettings {
        EngineSettings {
            source: ModelSource::Local { path },
            params: ModelParams {
                gpu_layers: 0,
                context_size: 2048,
                threads: 4,
            },
            defaults: SamplingDefaults {
                max_new_tokens: 256,
                temperature: 0.7,
                top_p: 0.9,
            },
            system_prompt: "DEFAULT SYSTEM".to_string(),
        }
    }

    fn model_file() -> tempfile::NamedTempFile {
        tempfile::NamedTempFile::new().unwrap()
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let file = model_file();
        let loader = Arc::new(CountingLoader::new("ok"));
        let loads = Arc::clone(&loader.loads);
        let mut engine = TextGenerationEngine::new(settings_for(file.path().to_path_buf()), loader);

        engine.initialize().await.unwrap();
        engine.initialize().await.unwrap();

        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(engine.is_ready());
    }

    #[tokio::test]
    async fn test_missing_local_model() {
        let loader = Arc::new(CountingLoader::new("ok"));
        let loads = Arc::clone(&loader.loads);
        let mut engine =
            TextGenerationEngine::new(settings_for(PathBuf::from("/nonexistent/model.gguf")), loader);

        let err = engine.initialize().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ModelNotFound);
        assert_eq!(loads.load(Ordering::SeqCst), 0);
        assert!(!engine.is_ready());
    }

    #[tokio::test]
    async fn test_load_failure_wraps_cause_and_is_terminal() {
        let file = model_file();
        let mut loader = CountingLoader::new("ok");
        loader.fail = true;
        let loads = Arc::clone(&loader.loads);
        let mut engine =
            TextGenerationEngine::new(settings_for(file.path().to_path_buf()), Arc::new(loader));

        let err = engine.initialize().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ModelLoad);
        assert!(err.chain().contains("corrupt gguf header"));

        // Failed is terminal: no second load attempt
        let again = engine.initialize().await.unwrap_err();
        assert_eq!(again.kind(), ErrorKind::ModelLoad);
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(engine.model_info().state, "failed");

        engine.reset();
        assert_eq!(engine.model_info().state, "uninitialized");
    }

    #[tokio::test]
    async fn test_cancelled_initialize_can_be_retried() {
        let file = model_file();
        let mut loader = CountingLoader::new("ok");
        loader.delay = Duration::from_millis(300);
        let loads = Arc::clone(&loader.loads);
        let mut engine =
            TextGenerationEngine::new(settings_for(file.path().to_path_buf()), Arc::new(loader));

        let cancelled =
            tokio::time::timeout(Duration::from_millis(20), engine.initialize()).await;
        assert!(cancelled.is_err());
        assert_eq!(engine.model_info().state, "uninitialized");
        assert!(!engine.is_ready());

        engine.initialize().await.unwrap();
        assert!(engine.is_ready());
        assert_eq!(engine.model_info().state, "ready");
        assert!(loads.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_generate_before_initialize() {
        let engine = TextGenerationEngine::new(
            settings_for(PathBuf::from("model.gguf")),
            Arc::new(CountingLoader::new("ok")),
        );

        let err = engine
            .generate("prompt", GenerationOverrides::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EngineNotReady);
    }

    #[tokio::test]
    async fn test_generate_uses_defaults_and_stop_sequences() {
        let file = model_file();
        let loader = Arc::new(CountingLoader::new("  5억원입니다.  "));
        let seen = Arc::clone(&loader.seen);
        let mut engine = TextGenerationEngine::new(settings_for(file.path().to_path_buf()), loader);
        engine.initialize().await.unwrap();

        let text = engine
            .generate("PROMPT", GenerationOverrides::default())
            .await
            .unwrap();
        assert_eq!(text, "5억원입니다.");

        let requests = seen.lock().unwrap();
        let request = &requests[0];
        assert_eq!(request.prompt, "PROMPT");
        assert_eq!(request.max_tokens, 256);
        assert_eq!(request.temperature, 0.7);
        assert_eq!(request.top_p, 0.9);
        assert!(!request.echo);
        assert_eq!(request.stop, vec!["<|eot_id|>", "<|end_of_text|>"]);
    }

    #[tokio::test]
    async fn test_generate_applies_overrides() {
        let file = model_file();
        let loader = Arc::new(CountingLoader::new("ok"));
        let seen = Arc::clone(&loader.seen);
        let mut engine = TextGenerationEngine::new(settings_for(file.path().to_path_buf()), loader);
        engine.initialize().await.unwrap();

        let overrides = GenerationOverrides {
            max_new_tokens: Some(32),
            temperature: Some(0.0),
            top_p: None,
        };
        engine.generate("PROMPT", overrides).await.unwrap();

        let requests = seen.lock().unwrap();
        assert_eq!(requests[0].max_tokens, 32);
        assert_eq!(requests[0].temperature, 0.0);
        assert_eq!(requests[0].top_p, 0.9);
    }

    #[tokio::test]
    async fn test_generate_cuts_leaked_stop_sequence() {
        let file = model_file();
        let loader = Arc::new(CountingLoader::new("답변<|eot_id|><|start_header_id|>user"));
        let mut engine = TextGenerationEngine::new(settings_for(file.path().to_path_buf()), loader);
        engine.initialize().await.unwrap();

        let text = engine
            .generate("PROMPT", GenerationOverrides::default())
            .await
            .unwrap();
        assert_eq!(text, "답변");
    }

    #[tokio::test]
    async fn test_generation_failure_is_wrapped() {
        let file = model_file();
        let loader = Arc::new(CountingLoader::new("FAIL"));
        let mut engine = TextGenerationEngine::new(settings_for(file.path().to_path_buf()), loader);
        engine.initialize().await.unwrap();

        let err = engine
            .generate("PROMPT", GenerationOverrides::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Generation);
        assert!(err.to_string().contains("backend exploded"));
    }

    #[test]
    fn test_format_prompt_is_deterministic() {
        let engine = TextGenerationEngine::new(
            settings_for(PathBuf::from("model.gguf")),
            Arc::new(CountingLoader::new("ok")),
        );

        let a = engine.format_prompt("예산은?", Some("[Document 1]\n5억원\n"), Some("SYS"));
        let b = engine.format_prompt("예산은?", Some("[Document 1]\n5억원\n"), Some("SYS"));
        assert_eq!(a, b);
        assert!(a.contains("Reference documents:\n[Document 1]"));
        assert!(a.contains("\n\nQuestion: 예산은?<|eot_id|>"));
    }

    #[test]
    fn test_format_prompt_falls_back_to_default_system_prompt() {
        let engine = TextGenerationEngine::new(
            settings_for(PathBuf::from("model.gguf")),
            Arc::new(CountingLoader::new("ok")),
        );

        let prompt = engine.format_prompt("안녕하세요", None, None);
        assert!(prompt.starts_with(
            "<|start_header_id|>system<|end_header_id|>\n\nDEFAULT SYSTEM<|eot_id|>"
        ));
        assert!(prompt.contains("user<|end_header_id|>\n\n안녕하세요<|eot_id|>"));
    }

    #[test]
    fn test_source_from_config() {
        let mut config = AppConfig::default();
        assert!(matches!(
            ModelSource::from_config(&config).unwrap(),
            ModelSource::Local { .. }
        ));

        config.model.use_hub = true;
        assert!(ModelSource::from_config(&config).is_err());

        config.model.hub_repo = Some("org/rfp-GGUF".to_string());
        config.model.hub_filename = Some("model.gguf".to_string());
        match ModelSource::from_config(&config).unwrap() {
            ModelSource::Hub { repo, filename, .. } => {
                assert_eq!(repo, "org/rfp-GGUF");
                assert_eq!(filename, "model.gguf");
            }
            other => panic!("expected hub source, got {:?}", other),
        }
    }

    #[test]
    fn test_preview_is_char_safe() {
        assert_eq!(preview("짧음", 10), "짧음");
        assert_eq!(preview("가나다라마", 2), "가나...");
    }
}
