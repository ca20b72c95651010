//! Llama-3 chat template.
//!
//! The header/turn markers below are the wire contract with the model. The
//! rendered output must stay byte-stable for identical inputs.

use std::fmt;

pub const HEADER_START: &str = "<|start_header_id|>";
pub const HEADER_END: &str = "<|end_header_id|>";
pub const TURN_END: &str = "<|eot_id|>";
pub const END_OF_TEXT: &str = "<|end_of_text|>";

/// Markers that end generation at the model's own turn boundary.
pub const STOP_SEQUENCES: [&str; 2] = [TURN_END, END_OF_TEXT];

/// Speaker of a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Header that opens a turn, including the blank line before the content.
pub fn open_turn(role: Role) -> String {
    format!("{}{}{}\n\n", HEADER_START, role, HEADER_END)
}

/// A complete turn: header, content and turn-end marker.
pub fn render_turn(role: Role, content: &str) -> String {
    format!("{}{}{}", open_turn(role), content, TURN_END)
}

/// User message with optional reference documents.
pub fn user_message(question: &str, context: Option<&str>) -> String {
    match context {
        Some(context) => format!("Reference documents:\n{}\n\nQuestion: {}", context, question),
        None => question.to_string(),
    }
}

/// System turn, user turn, then an open assistant turn for the model to fill.
pub fn render_dialogue(system_prompt: &str, user_message: &str) -> String {
    let mut prompt = String::with_capacity(system_prompt.len() + user_message.len() + 128);
    prompt.push_str(&render_turn(Role::System, system_prompt));
    prompt.push_str(&render_turn(Role::User, user_message));
    prompt.push_str(&open_turn(Role::Assistant));
    prompt
}

/// Cut `text` at the earliest occurrence of any stop sequence.
pub fn truncate_at_stop<'a, S: AsRef<str>>(text: &'a str, stops: &[S]) -> &'a str {
    let cut = stops
        .iter()
        .filter_map(|stop| {
            let stop = stop.as_ref();
            if stop.is_empty() {
                None
            } else {
                text.find(stop)
            }
        })
        .min();

    match cut {
        Some(index) => &text[..index],
        None => text,
    }
}
