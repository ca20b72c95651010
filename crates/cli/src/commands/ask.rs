//! Ask command handler.
//!
//! Answers one question and prints the answer with its sources.

use super::build_orchestrator;
use clap::Args;
use tender_core::{config::AppConfig, AppResult};
use tender_rag::AnswerResult;

/// Answer a single question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Number of documents to retrieve
    #[arg(long)]
    pub top_k: Option<usize>,

    /// Search mode (embedding, embedding_rerank, hybrid, hybrid_rerank)
    #[arg(short, long)]
    pub mode: Option<String>,

    /// Vector weight for hybrid search (0.0-1.0)
    #[arg(long)]
    pub alpha: Option<f32>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let mut orchestrator = build_orchestrator(config).await?;
        let result = orchestrator
            .answer(&self.question, self.top_k, self.mode.as_deref(), self.alpha)
            .await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            print_result(&result);
        }

        Ok(())
    }
}

/// Human-readable answer block.
pub fn print_result(result: &AnswerResult) {
    println!("{}", result.answer);
    println!();

    if result.used_retrieval {
        if result.sources.is_empty() {
            println!("Sources: (no documents found)");
        } else {
            println!("Sources ({}):", result.search_mode);
            for (i, source) in result.sources.iter().enumerate() {
                println!(
                    "  {}. {} [{}] {} {:.3}",
                    i + 1,
                    source.filename,
                    source.organization,
                    source.score_type.as_str(),
                    source.score
                );
            }
        }
    }

    println!(
        "({}, {:.2}s, ~{} tokens)",
        result.query_type, result.elapsed_time, result.usage.total_tokens
    );
}
