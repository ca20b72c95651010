//! Prompt library for tender.
//!
//! This crate provides the system prompts used to answer each query category:
//! - Closed category and dialect types
//! - Built-in prompt table for both dialects
//! - YAML prompt packs overlaid on the built-ins

pub mod library;
pub mod loader;
pub mod types;

// Re-export main types
pub use library::{builtin_prompt, PromptLibrary};
pub use loader::{load_prompt_pack, parse_prompt_pack};
pub use types::{PromptDialect, QueryCategory};
