//! Language model abstraction and request/response types.
//!
//! Backends implement [`ModelLoader`] to construct a [`LanguageModel`] from a
//! resolved artifact path. Both traits are synchronous: inference is CPU/GPU
//! bound, and the engine moves calls onto the blocking pool.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tender_core::BoxError;

/// Parameters fixed when the model handle is constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelParams {
    /// Layers offloaded to the GPU (0 = CPU only)
    pub gpu_layers: u32,

    /// Context window in tokens
    pub context_size: u32,

    /// CPU threads for inference
    pub threads: u32,
}

/// One completion call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Fully formatted prompt text
    pub prompt: String,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Temperature for sampling (0.0 = greedy)
    pub temperature: f32,

    /// Top-p nucleus sampling
    pub top_p: f32,

    /// Generation halts before any of these sequences
    pub stop: Vec<String>,

    /// Reflect the prompt at the start of the output
    #[serde(default)]
    pub echo: bool,
}

/// Why generation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// A stop sequence was produced
    Stop,
    /// The token budget ran out
    Length,
}

/// Output of one completion call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    /// Generated text, without the stop sequence
    pub text: String,

    /// Tokens produced by the model
    pub tokens_generated: usize,

    pub finish_reason: FinishReason,
}

/// A loaded model able to complete prompts.
///
/// Implementations are not expected to be thread-safe for concurrent
/// inference; the engine serializes calls behind a mutex.
pub trait LanguageModel: Send {
    fn complete(&mut self, request: &CompletionRequest) -> Result<Completion, BoxError>;
}

/// Constructs a [`LanguageModel`] from an artifact on disk.
pub trait ModelLoader: Send + Sync {
    /// Backend name (e.g., "candle").
    fn backend_name(&self) -> &str;

    fn load(&self, path: &Path, params: &ModelParams) -> Result<Box<dyn LanguageModel>, BoxError>;
}
