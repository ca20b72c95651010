//! Model hub download.
//!
//! Resolves a single model file from a Hugging Face compatible hub into a
//! local cache directory through `hf-hub`. A file already present in the
//! cache is reused without touching the network.

use hf_hub::api::tokio::{Api, ApiBuilder};
use std::path::{Path, PathBuf};
use tender_core::{AppError, AppResult, BoxError};

/// Default hub base URL.
pub const DEFAULT_HUB_ENDPOINT: &str = "https://huggingface.co";

/// Environment variable holding the hub access token.
pub const HUB_TOKEN_ENV: &str = "HF_TOKEN";

/// Hub client settings.
pub struct HubClient {
    /// Base URL for the hub
    endpoint: String,

    /// Access token for gated or private repositories
    token: Option<String>,
}

impl HubClient {
    /// Create a client for the public hub.
    pub fn new() -> Self {
        Self::with_endpoint(DEFAULT_HUB_ENDPOINT)
    }

    /// Create a client for a custom hub endpoint or mirror.
    ///
    /// The access token is taken from `HF_TOKEN` when set.
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        let token = std::env::var(HUB_TOKEN_ENV)
            .ok()
            .filter(|token| !token.trim().is_empty());

        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Replace the access token.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Pinned file dropped directly into `cache_dir`.
    pub fn cached_path(cache_dir: &Path, filename: &str) -> PathBuf {
        cache_dir.join(filename)
    }

    fn api(&self, cache_dir: &Path) -> Result<Api, BoxError> {
        let mut builder = ApiBuilder::new()
            .with_cache_dir(cache_dir.to_path_buf())
            .with_endpoint(self.endpoint.clone())
            .with_progress(false);
        if let Some(token) = &self.token {
            builder = builder.with_token(Some(token.clone()));
        }
        builder.build().map_err(|e| e.to_string().into())
    }

    /// Fetch `repo/filename` into `cache_dir` and return the local path.
    ///
    /// A file at `cache_dir/filename` wins over the hub cache layout.
    pub async fn download(&self, repo: &str, filename: &str, cache_dir: &Path) -> AppResult<PathBuf> {
        let pinned = Self::cached_path(cache_dir, filename);
        if pinned.is_file() {
            tracing::info!("Using cached model file: {:?}", pinned);
            return Ok(pinned);
        }

        let fetch_error = |source: BoxError| AppError::ModelFetch {
            repo: repo.to_string(),
            filename: filename.to_string(),
            source,
        };

        tracing::info!(
            "Fetching {}/{} from {} (authenticated: {})",
            repo,
            filename,
            self.endpoint,
            self.has_token()
        );

        let api = self.api(cache_dir).map_err(fetch_error)?;
        let path = api
            .model(repo.to_string())
            .get(filename)
            .await
            .map_err(|e| fetch_error(e.to_string().into()))?;

        tracing::info!("Model file ready: {:?}", path);
        Ok(path)
    }
}

impl Default for HubClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tender_core::ErrorKind;

    /// Unroutable endpoint: reaching the network fails the call.
    const OFFLINE: &str = "http://127.0.0.1:9";

    #[test]
    fn test_endpoint_and_token() {
        let client = HubClient::with_endpoint("https://mirror.example.com/")
            .with_token(Some("hf_secret".to_string()));
        assert_eq!(client.endpoint(), "https://mirror.example.com");
        assert!(client.has_token());

        assert!(!client.with_token(None).has_token());
    }

    #[tokio::test]
    async fn test_cached_file_is_reused() {
        let cache = tempfile::tempdir().unwrap();
        let cached = cache.path().join("model.gguf");
        std::fs::write(&cached, b"GGUF").unwrap();

        let client = HubClient::with_endpoint(OFFLINE);
        let path = client
            .download("org/repo", "model.gguf", cache.path())
            .await
            .unwrap();

        assert_eq!(path, cached);
    }

    #[tokio::test]
    async fn test_hub_cache_snapshot_is_reused() {
        let cache = tempfile::tempdir().unwrap();
        let repo_dir = cache.path().join("models--org--repo");
        let commit = "0123456789abcdef0123456789abcdef01234567";
        std::fs::create_dir_all(repo_dir.join("refs")).unwrap();
        std::fs::write(repo_dir.join("refs").join("main"), commit).unwrap();
        let snapshot = repo_dir.join("snapshots").join(commit);
        std::fs::create_dir_all(&snapshot).unwrap();
        std::fs::write(snapshot.join("model.gguf"), b"GGUF").unwrap();

        let client = HubClient::with_endpoint(OFFLINE);
        let path = client
            .download("org/repo", "model.gguf", cache.path())
            .await
            .unwrap();

        assert_eq!(path, snapshot.join("model.gguf"));
    }

    #[tokio::test]
    async fn test_unreachable_hub_is_fetch_error() {
        let cache = tempfile::tempdir().unwrap();
        let client = HubClient::with_endpoint(OFFLINE).with_token(Some("hf_secret".to_string()));

        let err = client
            .download("org/repo", "model.gguf", cache.path())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ModelFetch);
        assert!(err.to_string().contains("org/repo/model.gguf"));
        assert!(!err.chain().contains("hf_secret"));
        assert!(!cache.path().join("model.gguf").exists());
    }
}
