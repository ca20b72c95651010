//! Retriever trait and HTTP client.

use crate::types::{RetrievedDocument, SearchMode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tender_core::config::RetrieverConfig;
use tender_core::{AppError, AppResult};

/// Document retrieval strategies.
///
/// Every method returns documents in the order the strategy ranked them;
/// callers must not re-sort.
#[async_trait::async_trait]
pub trait Retriever: Send + Sync {
    /// Vector similarity search.
    async fn search(&self, query: &str, top_k: usize) -> AppResult<Vec<RetrievedDocument>>;

    /// Vector search followed by a rerank pass.
    async fn search_with_rerank(&self, query: &str, top_k: usize)
        -> AppResult<Vec<RetrievedDocument>>;

    /// Lexical and vector scores blended by `alpha` (vector weight).
    async fn hybrid_search(
        &self,
        query: &str,
        top_k: usize,
        alpha: f32,
    ) -> AppResult<Vec<RetrievedDocument>>;

    /// Hybrid search followed by a rerank pass.
    async fn hybrid_search_with_rerank(
        &self,
        query: &str,
        top_k: usize,
        alpha: f32,
    ) -> AppResult<Vec<RetrievedDocument>>;
}

/// Search request body.
#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    mode: SearchMode,
    query: &'a str,
    top_k: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    alpha: Option<f32>,
}

/// Search response body.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    documents: Vec<RetrievedDocument>,
}

/// Client for a retrieval service exposing `POST {endpoint}/search`.
pub struct HttpRetriever {
    /// Base URL for the retrieval service
    endpoint: String,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpRetriever {
    pub fn new(config: &RetrieverConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build retriever client: {}", e)))?;

        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn post_search(
        &self,
        mode: SearchMode,
        query: &str,
        top_k: usize,
        alpha: Option<f32>,
    ) -> AppResult<Vec<RetrievedDocument>> {
        let url = format!("{}/search", self.endpoint);
        let body = SearchRequest {
            mode,
            query,
            top_k,
            alpha,
        };

        tracing::debug!("Retriever request: {} mode={} top_k={}", url, mode, top_k);

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Retrieval(format!("Request to {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Retrieval(format!(
                "Retriever returned {}: {}",
                status, error_text
            )));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| AppError::Retrieval(format!("Failed to parse retriever response: {}", e)))?;

        tracing::debug!("Retriever returned {} documents", parsed.documents.len());
        Ok(parsed.documents)
    }
}

#[async_trait::async_trait]
impl Retriever for HttpRetriever {
    async fn search(&self, query: &str, top_k: usize) -> AppResult<Vec<RetrievedDocument>> {
        self.post_search(SearchMode::Embedding, query, top_k, None).await
    }

    async fn search_with_rerank(
        &self,
        query: &str,
        top_k: usize,
    ) -> AppResult<Vec<RetrievedDocument>> {
        self.post_search(SearchMode::EmbeddingRerank, query, top_k, None)
            .await
    }

    async fn hybrid_search(
        &self,
        query: &str,
        top_k: usize,
        alpha: f32,
    ) -> AppResult<Vec<RetrievedDocument>> {
        self.post_search(SearchMode::Hybrid, query, top_k, Some(alpha))
            .await
    }

    async fn hybrid_search_with_rerank(
        &self,
        query: &str,
        top_k: usize,
        alpha: f32,
    ) -> AppResult<Vec<RetrievedDocument>> {
        self.post_search(SearchMode::HybridRerank, query, top_k, Some(alpha))
            .await
    }
}
