//! Command handlers for the tender CLI.

pub mod ask;
pub mod chat;
pub mod prompt;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use chat::ChatCommand;
pub use prompt::PromptCommand;

use std::sync::Arc;
use tender_core::{config::AppConfig, AppResult};
use tender_llm::create_loader;
use tender_rag::{AnswerOrchestrator, HttpRetriever, KeywordClassifier};

/// Wire the orchestrator with the HTTP retriever, keyword classifier and
/// the configured model backend. Loads the model.
pub async fn build_orchestrator(config: &AppConfig) -> AppResult<AnswerOrchestrator> {
    let loader = create_loader(&config.model)?;
    let retriever = Arc::new(HttpRetriever::new(&config.retriever)?);
    let classifier = Arc::new(KeywordClassifier::new());

    AnswerOrchestrator::new(config, classifier, retriever, loader).await
}
