//! Answer pipeline types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use tender_prompt::QueryCategory;

/// Score attached by the retrieval mode that produced a document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RetrievalScore {
    /// Vector similarity only
    Embedding { relevance: f32 },
    /// Weighted blend of lexical and vector scores
    Hybrid { hybrid: f32 },
    /// Reranker output; keeps the first-stage score when the service sends it
    Rerank {
        rerank: f32,
        upstream: Option<FirstStageScore>,
    },
    /// The retriever sent no score
    Unscored,
}

impl RetrievalScore {
    /// Value reported in sources; `0.0` when unscored.
    pub fn value(&self) -> f32 {
        match self {
            RetrievalScore::Embedding { relevance } => *relevance,
            RetrievalScore::Hybrid { hybrid } => *hybrid,
            RetrievalScore::Rerank { rerank, .. } => *rerank,
            RetrievalScore::Unscored => 0.0,
        }
    }

    pub fn score_type(&self) -> ScoreType {
        match self {
            RetrievalScore::Embedding { .. } => ScoreType::Embedding,
            RetrievalScore::Hybrid { .. } => ScoreType::Hybrid,
            RetrievalScore::Rerank { .. } => ScoreType::Rerank,
            RetrievalScore::Unscored => ScoreType::Unknown,
        }
    }
}

/// First-stage score carried alongside a rerank score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FirstStageScore {
    Relevance(f32),
    Hybrid(f32),
}

impl FirstStageScore {
    pub fn value(&self) -> f32 {
        match self {
            FirstStageScore::Relevance(score) | FirstStageScore::Hybrid(score) => *score,
        }
    }
}

/// Wire shape of a retrieved document: the score is whichever field is present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawDocument {
    content: String,
    #[serde(default)]
    metadata: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    organization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    relevance_score: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    hybrid_score: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rerank_score: Option<f32>,
}

impl From<RawDocument> for RetrievedDocument {
    fn from(raw: RawDocument) -> Self {
        // Reranked documents usually carry their first-stage score as well
        let score = match (raw.rerank_score, raw.hybrid_score, raw.relevance_score) {
            (Some(rerank), hybrid, relevance) => RetrievalScore::Rerank {
                rerank,
                upstream: hybrid
                    .map(FirstStageScore::Hybrid)
                    .or(relevance.map(FirstStageScore::Relevance)),
            },
            (None, Some(hybrid), _) => RetrievalScore::Hybrid { hybrid },
            (None, None, Some(relevance)) => RetrievalScore::Embedding { relevance },
            (None, None, None) => RetrievalScore::Unscored,
        };

        Self {
            content: raw.content,
            metadata: match raw.metadata {
                Value::Null => Value::Object(Map::new()),
                metadata => metadata,
            },
            filename: raw.filename,
            organization: raw.organization,
            score,
        }
    }
}

impl From<RetrievedDocument> for RawDocument {
    fn from(doc: RetrievedDocument) -> Self {
        let mut raw = RawDocument {
            content: doc.content,
            metadata: doc.metadata,
            filename: doc.filename,
            organization: doc.organization,
            ..Default::default()
        };
        match doc.score {
            RetrievalScore::Embedding { relevance } => raw.relevance_score = Some(relevance),
            RetrievalScore::Hybrid { hybrid } => raw.hybrid_score = Some(hybrid),
            RetrievalScore::Rerank { rerank, upstream } => {
                raw.rerank_score = Some(rerank);
                match upstream {
                    Some(FirstStageScore::Relevance(score)) => raw.relevance_score = Some(score),
                    Some(FirstStageScore::Hybrid(score)) => raw.hybrid_score = Some(score),
                    None => {}
                }
            }
            RetrievalScore::Unscored => {}
        }
        raw
    }
}

/// A passage returned by the retriever, in retrieval order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawDocument", into = "RawDocument")]
pub struct RetrievedDocument {
    pub content: String,
    pub metadata: Value,
    pub filename: Option<String>,
    pub organization: Option<String>,
    pub score: RetrievalScore,
}

impl RetrievedDocument {
    pub fn new(content: impl Into<String>, score: RetrievalScore) -> Self {
        Self {
            content: content.into(),
            metadata: Value::Object(Map::new()),
            filename: None,
            organization: None,
            score,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Retrieval strategy for document queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    Embedding,
    EmbeddingRerank,
    Hybrid,
    HybridRerank,
}

impl SearchMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "embedding" => Some(Self::Embedding),
            "embedding_rerank" => Some(Self::EmbeddingRerank),
            "hybrid" => Some(Self::Hybrid),
            "hybrid_rerank" => Some(Self::HybridRerank),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Embedding => "embedding",
            Self::EmbeddingRerank => "embedding_rerank",
            Self::Hybrid => "hybrid",
            Self::HybridRerank => "hybrid_rerank",
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sticky search configuration.
///
/// `mode` is kept verbatim so an unknown name is reported back as given;
/// dispatch falls back to vector search for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    pub mode: String,
    pub top_k: usize,
    pub alpha: f32,
}

impl SearchConfig {
    /// Strategy to dispatch to.
    pub fn resolved_mode(&self) -> SearchMode {
        SearchMode::from_name(&self.mode).unwrap_or(SearchMode::Embedding)
    }
}

impl From<&tender_core::config::SearchSettings> for SearchConfig {
    fn from(settings: &tender_core::config::SearchSettings) -> Self {
        Self {
            mode: settings.mode.clone(),
            top_k: settings.top_k,
            alpha: settings.alpha,
        }
    }
}

/// Classifier verdict for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    #[serde(rename = "type")]
    pub query_type: QueryCategory,

    /// In `[0, 1]`
    pub confidence: f32,

    /// Classifier-specific routing fields (e.g. `route`, `reason`)
    #[serde(flatten)]
    pub routing: Map<String, Value>,
}

impl Classification {
    pub fn new(query_type: QueryCategory, confidence: f32) -> Self {
        Self {
            query_type,
            confidence: confidence.clamp(0.0, 1.0),
            routing: Map::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.routing.insert(key.into(), value.into());
        self
    }
}

/// Speaker of a history turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One entry of the orchestrator's chat history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Which score a source reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreType {
    Rerank,
    Hybrid,
    Embedding,
    Unknown,
}

impl ScoreType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreType::Rerank => "rerank",
            ScoreType::Hybrid => "hybrid",
            ScoreType::Embedding => "embedding",
            ScoreType::Unknown => "unknown",
        }
    }
}

/// A source as reported to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub content: String,
    pub metadata: Value,
    pub filename: String,
    pub organization: String,
    pub score: f32,
    pub score_type: ScoreType,
}

/// Token usage estimate (not a tokenizer count).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

impl TokenUsage {
    pub fn new(prompt_tokens: usize, completion_tokens: usize) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Result of one `answer()` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResult {
    pub answer: String,

    /// In retrieval order; empty when retrieval was skipped
    pub sources: Vec<SourceRecord>,

    pub used_retrieval: bool,

    pub query_type: QueryCategory,

    /// Sticky mode when retrieval ran, otherwise `"direct"`
    pub search_mode: String,

    pub routing_info: Classification,

    /// Seconds
    pub elapsed_time: f64,

    pub usage: TokenUsage,
}

/// `search_mode` reported when retrieval was skipped.
pub const DIRECT_MODE: &str = "direct";
