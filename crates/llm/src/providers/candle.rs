//! Quantized GGUF inference with candle.
//!
//! Loads Llama-family GGUF weights through `candle_transformers` and samples
//! with [`LogitsProcessor`]. The tokenizer is read from a `tokenizer.json`,
//! either configured explicitly or found next to the model file.

use crate::model::{Completion, CompletionRequest, FinishReason, LanguageModel, ModelLoader, ModelParams};
use crate::template;
use anyhow::{anyhow, bail, Context, Result};
use candle_core::quantized::gguf_file;
use candle_core::{DType, Device, Tensor};
use candle_transformers::generation::LogitsProcessor;
use candle_transformers::models::quantized_llama::ModelWeights;
use std::path::{Path, PathBuf};
use tender_core::BoxError;
use tokenizers::Tokenizer;

const TOKENIZER_FILE: &str = "tokenizer.json";
const SAMPLING_SEED: u64 = 42;

/// Builds [`CandleGgufModel`] handles.
pub struct CandleGgufLoader {
    tokenizer_path: Option<PathBuf>,
}

impl CandleGgufLoader {
    pub fn new(tokenizer_path: Option<PathBuf>) -> Self {
        Self { tokenizer_path }
    }

    fn resolve_tokenizer(&self, model_path: &Path) -> Result<PathBuf> {
        if let Some(path) = &self.tokenizer_path {
            return Ok(path.clone());
        }

        let sibling = model_path
            .parent()
            .map(|dir| dir.join(TOKENIZER_FILE))
            .unwrap_or_else(|| PathBuf::from(TOKENIZER_FILE));
        if sibling.exists() {
            Ok(sibling)
        } else {
            bail!(
                "no tokenizer configured and {} not found next to {}",
                TOKENIZER_FILE,
                model_path.display()
            )
        }
    }

    fn load_model(&self, path: &Path, params: &ModelParams) -> Result<CandleGgufModel> {
        let device = select_device(params.gpu_layers)?;
        tracing::info!("Device: {:?}", device);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(params.threads.max(1) as usize)
            .build()
            .context("failed to build inference thread pool")?;

        let mut file = std::fs::File::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        let content = gguf_file::Content::read(&mut file)
            .with_context(|| format!("invalid GGUF file {}", path.display()))?;
        tracing::debug!(
            "GGUF metadata: {} tensors, {} keys",
            content.tensor_infos.len(),
            content.metadata.len()
        );

        let weights = ModelWeights::from_gguf(content, &mut file, &device)?;

        let tokenizer_path = self.resolve_tokenizer(path)?;
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("failed to load tokenizer {}: {}", tokenizer_path.display(), e))?;

        let stop_ids = template::STOP_SEQUENCES
            .iter()
            .filter_map(|token| tokenizer.token_to_id(token))
            .collect::<Vec<_>>();
        if stop_ids.is_empty() {
            tracing::warn!("Tokenizer has no Llama-3 end-of-turn tokens; relying on text stops");
        }

        Ok(CandleGgufModel {
            weights,
            tokenizer,
            device,
            pool,
            stop_ids,
            context_size: params.context_size as usize,
        })
    }
}

impl ModelLoader for CandleGgufLoader {
    fn backend_name(&self) -> &str {
        "candle"
    }

    fn load(&self, path: &Path, params: &ModelParams) -> Result<Box<dyn LanguageModel>, BoxError> {
        let model = self.load_model(path, params)?;
        Ok(Box::new(model))
    }
}

/// Candle cannot offload a subset of layers; any GPU layer request moves the
/// whole model to the first CUDA device when one is present.
fn select_device(gpu_layers: u32) -> Result<Device> {
    if gpu_layers == 0 {
        return Ok(Device::Cpu);
    }
    Ok(Device::cuda_if_available(0)?)
}

/// A loaded quantized Llama model.
pub struct CandleGgufModel {
    weights: ModelWeights,
    tokenizer: Tokenizer,
    device: Device,
    pool: rayon::ThreadPool,
    stop_ids: Vec<u32>,
    context_size: usize,
}

impl CandleGgufModel {
    fn run(&mut self, request: &CompletionRequest) -> Result<Completion> {
        let encoded = self
            .tokenizer
            .encode(request.prompt.as_str(), true)
            .map_err(|e| anyhow!("tokenization failed: {}", e))?;
        let prompt_tokens = encoded.get_ids().to_vec();
        if prompt_tokens.is_empty() {
            bail!("empty prompt after tokenization");
        }
        if prompt_tokens.len() >= self.context_size {
            bail!(
                "prompt is {} tokens, context window is {}",
                prompt_tokens.len(),
                self.context_size
            );
        }

        let budget = (request.max_tokens as usize).min(self.context_size - prompt_tokens.len());
        let temperature = if request.temperature > 0.0 {
            Some(request.temperature as f64)
        } else {
            None
        };
        let top_p = if request.top_p < 1.0 {
            Some(request.top_p as f64)
        } else {
            None
        };
        let mut logits_processor = LogitsProcessor::new(SAMPLING_SEED, temperature, top_p);

        let mut generated: Vec<u32> = Vec::with_capacity(budget);
        let mut finish_reason = FinishReason::Length;
        let mut input: Vec<u32> = prompt_tokens.clone();
        let mut pos = 0;

        for _ in 0..budget {
            let tensor = Tensor::new(input.as_slice(), &self.device)?.unsqueeze(0)?;
            let weights = &mut self.weights;
            let logits = self.pool.install(|| weights.forward(&tensor, pos))?;
            let logits = logits.squeeze(0)?.to_dtype(DType::F32)?;

            let next = logits_processor.sample(&logits)?;
            pos += input.len();

            if self.stop_ids.contains(&next) {
                finish_reason = FinishReason::Stop;
                break;
            }
            generated.push(next);

            let text = self.decode(&generated)?;
            if request.stop.iter().any(|stop| !stop.is_empty() && text.contains(stop.as_str())) {
                finish_reason = FinishReason::Stop;
                break;
            }
            input = vec![next];
        }

        let text = self.decode(&generated)?;
        let text = template::truncate_at_stop(&text, &request.stop);
        let text = if request.echo {
            format!("{}{}", request.prompt, text)
        } else {
            text.to_string()
        };

        Ok(Completion {
            text,
            tokens_generated: generated.len(),
            finish_reason,
        })
    }

    fn decode(&self, tokens: &[u32]) -> Result<String> {
        self.tokenizer
            .decode(tokens, false)
            .map_err(|e| anyhow!("detokenization failed: {}", e))
    }
}

impl LanguageModel for CandleGgufModel {
    fn complete(&mut self, request: &CompletionRequest) -> Result<Completion, BoxError> {
        Ok(self.run(request)?)
    }
}
