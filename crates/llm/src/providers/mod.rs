//! Model backends.

#[cfg(feature = "candle")]
pub mod candle;

#[cfg(feature = "candle")]
pub use candle::{CandleGgufLoader, CandleGgufModel};
