//! Error types for the tender workspace.
//!
//! A single closed enum covers every failure the answer pipeline can surface:
//! model lifecycle, prompt lookup, generation, retrieval, classification and
//! the orchestrator boundary that wraps all of them.

use std::path::PathBuf;
use thiserror::Error;

/// Boxed error used to carry causes from backends we do not control.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Unified error type for the tender workspace.
///
/// All fallible functions return `Result<T, AppError>`. Variants that wrap
/// another failure keep it as a `#[source]` so the chain stays inspectable.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Pinned local model artifact does not exist
    #[error("Model file not found: {}", path.display())]
    ModelNotFound { path: PathBuf },

    /// Model artifact could not be fetched from the hub
    #[error("Failed to fetch model {repo}/{filename}: {source}")]
    ModelFetch {
        repo: String,
        filename: String,
        #[source]
        source: BoxError,
    },

    /// Model handle construction failed
    #[error("Failed to load model: {source}")]
    ModelLoad {
        #[source]
        source: BoxError,
    },

    /// Generation attempted before the engine finished initializing
    #[error("Text generation engine is not initialized; call initialize() first")]
    EngineNotReady,

    /// Prompt lookup for a category outside the library
    #[error("Unknown prompt category '{category}' for dialect '{dialect}'")]
    UnknownCategory { category: String, dialect: String },

    /// Failure inside the model invocation
    #[error("Text generation failed: {source}")]
    Generation {
        #[source]
        source: BoxError,
    },

    /// Retriever errors
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// Query classifier errors
    #[error("Classification error: {0}")]
    Classification(String),

    /// Prompt library errors (loading, validation)
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// The single error surfaced by `AnswerOrchestrator::answer`
    #[error("Answer generation failed: {source}")]
    AnswerGeneration {
        #[source]
        source: Box<AppError>,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

/// Discriminant of [`AppError`] for callers that branch on the kind only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Io,
    ModelNotFound,
    ModelFetch,
    ModelLoad,
    EngineNotReady,
    UnknownCategory,
    Generation,
    Retrieval,
    Classification,
    Prompt,
    AnswerGeneration,
    Serialization,
    Other,
}

impl AppError {
    /// Wrap any backend error as a model load failure.
    pub fn model_load(err: impl Into<BoxError>) -> Self {
        AppError::ModelLoad { source: err.into() }
    }

    /// Wrap any backend error as a generation failure.
    pub fn generation(err: impl Into<BoxError>) -> Self {
        AppError::Generation { source: err.into() }
    }

    /// Wrap a stage failure at the orchestrator boundary.
    pub fn answer_generation(cause: AppError) -> Self {
        AppError::AnswerGeneration {
            source: Box::new(cause),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Config(_) => ErrorKind::Config,
            AppError::Io(_) => ErrorKind::Io,
            AppError::ModelNotFound { .. } => ErrorKind::ModelNotFound,
            AppError::ModelFetch { .. } => ErrorKind::ModelFetch,
            AppError::ModelLoad { .. } => ErrorKind::ModelLoad,
            AppError::EngineNotReady => ErrorKind::EngineNotReady,
            AppError::UnknownCategory { .. } => ErrorKind::UnknownCategory,
            AppError::Generation { .. } => ErrorKind::Generation,
            AppError::Retrieval(_) => ErrorKind::Retrieval,
            AppError::Classification(_) => ErrorKind::Classification,
            AppError::Prompt(_) => ErrorKind::Prompt,
            AppError::AnswerGeneration { .. } => ErrorKind::AnswerGeneration,
            AppError::Serialization(_) => ErrorKind::Serialization,
            AppError::Other(_) => ErrorKind::Other,
        }
    }

    /// The wrapped stage error for `AnswerGeneration`, `None` otherwise.
    pub fn cause(&self) -> Option<&AppError> {
        match self {
            AppError::AnswerGeneration { source } => Some(source.as_ref()),
            _ => None,
        }
    }

    /// Render the error and every source below it, outermost first.
    pub fn chain(&self) -> String {
        let mut rendered = self.to_string();
        let mut current = std::error::Error::source(self);
        while let Some(err) = current {
            rendered.push_str(" <- ");
            rendered.push_str(&err.to_string());
            current = err.source();
        }
        rendered
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_generation_keeps_cause() {
        let err = AppError::answer_generation(AppError::Retrieval("index offline".to_string()));

        assert_eq!(err.kind(), ErrorKind::AnswerGeneration);
        let cause = err.cause().expect("cause must be kept");
        assert_eq!(cause.kind(), ErrorKind::Retrieval);
        assert!(err.to_string().contains("index offline"));
    }

    #[test]
    fn test_chain_walks_sources() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let err = AppError::answer_generation(AppError::generation(io));

        let chain = err.chain();
        assert!(chain.starts_with("Answer generation failed"));
        assert!(chain.contains("Text generation failed"));
        assert!(chain.ends_with("disk gone"));
    }

    #[test]
    fn test_cause_absent_for_leaf_errors() {
        assert!(AppError::EngineNotReady.cause().is_none());
        assert_eq!(AppError::EngineNotReady.kind(), ErrorKind::EngineNotReady);
    }

    #[test]
    fn test_model_not_found_message_names_path() {
        let err = AppError::ModelNotFound {
            path: PathBuf::from("/models/missing.gguf"),
        };
        assert!(err.to_string().contains("/models/missing.gguf"));
    }
}
