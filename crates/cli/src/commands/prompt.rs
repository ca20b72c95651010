//! Prompt command handler.
//!
//! Prints the system prompt the orchestrator would use for a category.

use clap::Args;
use tender_core::{config::AppConfig, AppError, AppResult};
use tender_prompt::{load_prompt_pack, PromptDialect, PromptLibrary, QueryCategory};

/// Show the system prompt for a category
#[derive(Args, Debug)]
pub struct PromptCommand {
    /// Category (greeting, thanks, document, out_of_scope); all when omitted
    pub category: Option<String>,

    /// Dialect (instructional, native); defaults to the configured one
    #[arg(short, long)]
    pub dialect: Option<String>,
}

impl PromptCommand {
    /// Execute the prompt command.
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing prompt command");

        let dialect_name = self.dialect.as_deref().unwrap_or(&config.prompt.dialect);
        let dialect = PromptDialect::parse(dialect_name)
            .ok_or_else(|| AppError::Config(format!("Unknown prompt dialect: {}", dialect_name)))?;

        let library = match &config.prompt.pack_path {
            Some(path) => load_prompt_pack(path)?,
            None => PromptLibrary::builtin(),
        };

        match &self.category {
            Some(category) => println!("{}", library.get_prompt(category, dialect)?),
            None => {
                for category in QueryCategory::ALL {
                    println!("## {} ({})", category, dialect);
                    println!("{}", library.prompt(category, dialect));
                    println!();
                }
            }
        }

        Ok(())
    }
}
