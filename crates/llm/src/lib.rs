//! Local text generation for tender.
//!
//! This crate owns the single language model used to answer questions:
//! - Llama-3 chat template rendering
//! - Model artifact resolution (local file or hub download)
//! - The [`TextGenerationEngine`] lifecycle and bounded generation
//!
//! Inference backends sit behind [`ModelLoader`]. The quantized GGUF backend
//! is built with the `candle` feature.
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use tender_core::AppConfig;
//! use tender_llm::{create_loader, EngineSettings, GenerationOverrides, TextGenerationEngine};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! let loader = create_loader(&config.model)?;
//! let mut engine = TextGenerationEngine::new(EngineSettings::from_config(&config)?, loader);
//! engine.initialize().await?;
//! let answer = engine
//!     .chat("안녕하세요", None, None, GenerationOverrides::default())
//!     .await?;
//! println!("{}", answer);
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod factory;
pub mod hub;
pub mod model;
pub mod providers;
pub mod template;

// Re-export main types
pub use engine::{
    EngineSettings, GenerationOverrides, ModelInfo, ModelSource, SamplingDefaults,
    TextGenerationEngine,
};
pub use factory::create_loader;
pub use hub::HubClient;
pub use model::{Completion, CompletionRequest, FinishReason, LanguageModel, ModelLoader, ModelParams};
