//! Answer orchestration.
//!
//! Routes each query through classification, optional retrieval, prompt
//! selection and generation, then normalizes the result:
//!
//! ```text
//! query -> classify -> greeting | thanks | out_of_scope -> category prompt, no context
//!                   -> document -> retrieve (sticky mode) -> [Document N] context
//!       -> engine.chat -> history += (user, assistant) -> AnswerResult
//! ```

use crate::classifier::QueryClassifier;
use crate::context::format_context;
use crate::retriever::Retriever;
use crate::sources::{estimate_usage, normalize_sources};
use crate::types::{
    AnswerResult, ChatTurn, RetrievedDocument, SearchConfig, SearchMode, DIRECT_MODE,
};
use std::sync::Arc;
use std::time::Instant;
use tender_core::config::AppConfig;
use tender_core::{AppError, AppResult};
use tender_llm::{EngineSettings, GenerationOverrides, ModelLoader, TextGenerationEngine};
use tender_prompt::{load_prompt_pack, PromptDialect, PromptLibrary};
use tracing::Instrument;

/// Top-level coordinator for grounded answers.
pub struct AnswerOrchestrator {
    classifier: Arc<dyn QueryClassifier>,
    retriever: Arc<dyn Retriever>,
    engine: TextGenerationEngine,
    prompts: PromptLibrary,
    dialect: PromptDialect,
    search: SearchConfig,
    history: Vec<ChatTurn>,
    last_documents: Vec<RetrievedDocument>,
}

impl AnswerOrchestrator {
    /// Build the orchestrator and load the model.
    ///
    /// The engine is initialized here, so a missing or broken model fails
    /// construction rather than the first question.
    pub async fn new(
        config: &AppConfig,
        classifier: Arc<dyn QueryClassifier>,
        retriever: Arc<dyn Retriever>,
        loader: Arc<dyn ModelLoader>,
    ) -> AppResult<Self> {
        let dialect = PromptDialect::parse(&config.prompt.dialect).ok_or_else(|| {
            AppError::Config(format!("Unknown prompt dialect: {}", config.prompt.dialect))
        })?;

        let prompts = match &config.prompt.pack_path {
            Some(path) => load_prompt_pack(path)?,
            None => PromptLibrary::builtin(),
        };

        let mut engine = TextGenerationEngine::new(EngineSettings::from_config(config)?, loader);
        engine.initialize().await?;

        tracing::info!(
            "Orchestrator ready (dialect={}, mode={}, top_k={}, alpha={})",
            dialect,
            config.search.mode,
            config.search.top_k,
            config.search.alpha
        );

        Ok(Self {
            classifier,
            retriever,
            engine,
            prompts,
            dialect,
            search: SearchConfig::from(&config.search),
            history: Vec::new(),
            last_documents: Vec::new(),
        })
    }

    /// Answer one query.
    ///
    /// Overrides are applied to the sticky search configuration before
    /// anything else and persist for later calls. Any stage failure is
    /// returned as a single `AnswerGeneration` error wrapping the cause.
    pub async fn answer(
        &mut self,
        query: &str,
        top_k: Option<usize>,
        search_mode: Option<&str>,
        alpha: Option<f32>,
    ) -> AppResult<AnswerResult> {
        self.set_search_config(search_mode, top_k, alpha);

        let span = tracing::info_span!("answer", mode = %self.search.mode, top_k = self.search.top_k);
        match self.run(query).instrument(span).await {
            Ok(result) => Ok(result),
            Err(e) => {
                tracing::error!("Answer generation failed: {}", e.chain());
                Err(AppError::answer_generation(e))
            }
        }
    }

    async fn run(&mut self, query: &str) -> AppResult<AnswerResult> {
        let started = Instant::now();

        let classification = self.classifier.classify(query).await?;
        let category = classification.query_type;
        tracing::info!(
            "Classified as {} (confidence {:.2})",
            category,
            classification.confidence
        );

        let (context, used_retrieval) = if category.needs_retrieval() {
            let documents = self.retrieve(query).await?;
            tracing::info!("Retrieved {} documents", documents.len());
            let context = format_context(&documents);
            self.last_documents = documents;
            (Some(context), true)
        } else {
            tracing::info!("Skipping retrieval for {}", category);
            self.last_documents.clear();
            (None, false)
        };

        let system_prompt = self.prompts.prompt(category, self.dialect);
        let answer = self
            .engine
            .chat(
                query,
                context.as_deref(),
                Some(system_prompt),
                GenerationOverrides::default(),
            )
            .await?;

        self.history.push(ChatTurn::user(query));
        self.history.push(ChatTurn::assistant(answer.clone()));

        let elapsed = started.elapsed().as_secs_f64();
        tracing::info!("Answered in {:.2}s", elapsed);

        Ok(AnswerResult {
            sources: normalize_sources(&self.last_documents),
            usage: estimate_usage(query, &answer),
            answer,
            used_retrieval,
            query_type: category,
            search_mode: if used_retrieval {
                self.search.mode.clone()
            } else {
                DIRECT_MODE.to_string()
            },
            routing_info: classification,
            elapsed_time: elapsed,
        })
    }

    /// Dispatch to exactly one retrieval strategy.
    async fn retrieve(&self, query: &str) -> AppResult<Vec<RetrievedDocument>> {
        let SearchConfig { mode, top_k, alpha } = &self.search;
        let resolved = self.search.resolved_mode();
        if SearchMode::from_name(mode).is_none() {
            tracing::warn!("Unknown search mode '{}', using {}", mode, resolved);
        }

        tracing::debug!("Retrieving with {} (top_k={}, alpha={})", resolved, top_k, alpha);
        match resolved {
            SearchMode::Embedding => self.retriever.search(query, *top_k).await,
            SearchMode::EmbeddingRerank => self.retriever.search_with_rerank(query, *top_k).await,
            SearchMode::Hybrid => self.retriever.hybrid_search(query, *top_k, *alpha).await,
            SearchMode::HybridRerank => {
                self.retriever
                    .hybrid_search_with_rerank(query, *top_k, *alpha)
                    .await
            }
        }
    }

    /// Answer text only.
    pub async fn chat(&mut self, query: &str) -> AppResult<String> {
        Ok(self.answer(query, None, None, None).await?.answer)
    }

    pub fn clear_history(&mut self) {
        tracing::debug!("Clearing {} history turns", self.history.len());
        self.history.clear();
    }

    /// Copy of the chat history.
    pub fn history(&self) -> Vec<ChatTurn> {
        self.history.clone()
    }

    /// Update the sticky search configuration. `None` leaves a field as is.
    pub fn set_search_config(
        &mut self,
        search_mode: Option<&str>,
        top_k: Option<usize>,
        alpha: Option<f32>,
    ) {
        if let Some(mode) = search_mode {
            self.search.mode = mode.to_string();
        }
        if let Some(top_k) = top_k {
            self.search.top_k = top_k;
        }
        if let Some(alpha) = alpha {
            self.search.alpha = alpha;
        }
    }

    pub fn search_config(&self) -> &SearchConfig {
        &self.search
    }

    /// Documents from the most recent call; empty after a direct answer.
    pub fn last_documents(&self) -> &[RetrievedDocument] {
        &self.last_documents
    }

    pub fn engine(&self) -> &TextGenerationEngine {
        &self.engine
    }
}
