//! Grounded answer pipeline for tender.
//!
//! Classifies a query, optionally retrieves supporting passages, picks a
//! system prompt for the category and generates the answer with the local
//! model. [`AnswerOrchestrator`] ties the pieces together; retrieval and
//! classification are consumed through the [`Retriever`] and
//! [`QueryClassifier`] traits.

pub mod classifier;
pub mod context;
pub mod orchestrator;
pub mod retriever;
pub mod sources;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use classifier::{KeywordClassifier, QueryClassifier};
pub use context::{format_context, NO_DOCUMENTS_SENTINEL};
pub use orchestrator::AnswerOrchestrator;
pub use retriever::{HttpRetriever, Retriever};
pub use sources::{estimate_usage, normalize_sources};
pub use types::{
    AnswerResult, ChatRole, ChatTurn, Classification, FirstStageScore, RetrievalScore,
    RetrievedDocument, ScoreType, SearchConfig, SearchMode, SourceRecord, TokenUsage,
};
