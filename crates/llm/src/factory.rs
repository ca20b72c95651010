//! Model backend factory.
//!
//! Resolves the configured backend name to a [`ModelLoader`].

use crate::model::ModelLoader;
use std::sync::Arc;
use tender_core::config::ModelConfig;
use tender_core::{AppError, AppResult};

/// Create the model loader for `config.backend`.
///
/// # Errors
/// Returns error if:
/// - Backend is unknown
/// - Backend was not compiled in (the `candle` feature is off)
pub fn create_loader(config: &ModelConfig) -> AppResult<Arc<dyn ModelLoader>> {
    match config.backend.to_lowercase().as_str() {
        "candle" => candle_loader(config),
        other => Err(AppError::Config(format!("Unknown model backend: {}", other))),
    }
}

#[cfg(feature = "candle")]
fn candle_loader(config: &ModelConfig) -> AppResult<Arc<dyn ModelLoader>> {
    Ok(Arc::new(crate::providers::CandleGgufLoader::new(
        config.tokenizer_path.clone(),
    )))
}

#[cfg(not(feature = "candle"))]
fn candle_loader(_config: &ModelConfig) -> AppResult<Arc<dyn ModelLoader>> {
    Err(AppError::model_load(
        "candle backend not compiled in; rebuild with `--features candle`",
    ))
}
