//! Chat command handler.
//!
//! Line-based session over one orchestrator. Lines starting with `/` are
//! session commands; everything else is a question.

use super::ask::print_result;
use super::build_orchestrator;
use clap::Args;
use std::io::Write;
use tender_core::{config::AppConfig, AppResult};
use tender_rag::{AnswerOrchestrator, ChatRole};
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "Commands: /clear, /history, /mode <mode>, /info, /help, /quit";

/// Interactive question answering session
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Initial search mode
    #[arg(short, long)]
    pub mode: Option<String>,
}

/// Parsed input line.
#[derive(Debug, PartialEq)]
enum Input<'a> {
    Question(&'a str),
    Clear,
    History,
    Mode(Option<&'a str>),
    Info,
    Help,
    Quit,
    Unknown(&'a str),
    Empty,
}

fn parse_input(line: &str) -> Input<'_> {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }
    let Some(command) = line.strip_prefix('/') else {
        return Input::Question(line);
    };

    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, Some(arg.trim()).filter(|a| !a.is_empty())),
        None => (command, None),
    };

    match name {
        "clear" => Input::Clear,
        "history" => Input::History,
        "mode" => Input::Mode(arg),
        "info" => Input::Info,
        "help" => Input::Help,
        "quit" | "exit" => Input::Quit,
        _ => Input::Unknown(name),
    }
}

impl ChatCommand {
    /// Execute the chat command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing chat command");

        let mut orchestrator = build_orchestrator(config).await?;
        if let Some(mode) = &self.mode {
            orchestrator.set_search_config(Some(mode), None, None);
        }

        println!("{}", HELP);
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            print!("> ");
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };

            match parse_input(&line) {
                Input::Empty => continue,
                Input::Quit => break,
                Input::Help => println!("{}", HELP),
                Input::Clear => {
                    orchestrator.clear_history();
                    println!("History cleared");
                }
                Input::History => print_history(&orchestrator),
                Input::Mode(Some(mode)) => {
                    orchestrator.set_search_config(Some(mode), None, None);
                    println!("Search mode: {}", mode);
                }
                Input::Mode(None) => {
                    let search = orchestrator.search_config();
                    println!(
                        "Search mode: {} (top_k={}, alpha={})",
                        search.mode, search.top_k, search.alpha
                    );
                }
                Input::Info => {
                    let info = orchestrator.engine().model_info();
                    println!("{}", serde_json::to_string_pretty(&info)?);
                }
                Input::Unknown(name) => println!("Unknown command /{}. {}", name, HELP),
                Input::Question(question) => {
                    match orchestrator.answer(question, None, None, None).await {
                        Ok(result) => print_result(&result),
                        // Keep the session alive; the error is already logged
                        Err(e) => eprintln!("Error: {}", e),
                    }
                }
            }
        }

        Ok(())
    }
}

fn print_history(orchestrator: &AnswerOrchestrator) {
    let history = orchestrator.history();
    if history.is_empty() {
        println!("(empty)");
        return;
    }
    for turn in history {
        let speaker = match turn.role {
            ChatRole::User => "you",
            ChatRole::Assistant => "tender",
        };
        println!("{}: {}", speaker, turn.content);
    }
}
