//! Shell input parsing: slash commands vs. questions.

use super::types::{Command, Task};

pub fn parse_input(text: &str) -> Option<Task> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let Some(cmd) = text.strip_prefix('/') else {
        return Some(Task::Query(text.to_string()));
    };

    let cmd = cmd.trim().to_ascii_lowercase();
    Some(Task::Command(match cmd.as_str() {
        "summary" => Command::Summary,
        "context" | "history" => Command::Context,
        "reset" | "new" => Command::Reset,
        "quit" | "exit" | "q" => Command::Quit,
        _ => Command::Unknown(cmd),
    }))
}
