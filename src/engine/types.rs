//! Shared structs.

use super::state::AgentState;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Shell input, split into engine commands and plain questions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    Query(String),
    Command(Command),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Summary,
    Context,
    Reset,
    Quit,
    Unknown(String),
}

/// Trust tier for the best local match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "HIGH",
            Confidence::Medium => "MEDIUM",
            Confidence::Low => "LOW",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the local index handed back for a turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalSnapshot {
    pub documents: Vec<String>,
    pub distances: Vec<f32>,
    pub num_results: usize,
}

/// One finalized query/answer exchange. Only built by
/// [`TurnBuilder`](super::turn::TurnBuilder), so answer, source and
/// confidence are either all settled (COMPLETE) or all absent (ERROR).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationTurn {
    pub turn_id: u64,
    pub query: String,
    pub timestamp: DateTime<Local>,
    pub agent_state: AgentState,
    pub retrieval_results: Option<RetrievalSnapshot>,
    pub confidence: Option<Confidence>,
    pub web_search_used: bool,
    pub final_answer: Option<String>,
    pub source: Option<String>,
    pub reasoning: Vec<String>,
}

impl ConversationTurn {
    pub fn reasoning_text(&self) -> String {
        self.reasoning.join("\n")
    }
}

/// Caller-facing result of one `process_query` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentResponse {
    pub turn_id: u64,
    pub query: String,
    pub answer: String,
    pub confidence: Confidence,
    pub source: String,
    pub web_search_used: bool,
    pub reasoning: String,
    pub retrieval_details: RetrievalDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalDetails {
    pub num_candidates_found: usize,
    pub best_score: Option<f32>,
}

/// Redacted view of a session: no answers, no reasoning.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub created_at: DateTime<Local>,
    pub turns_completed: u64,
    pub conversation_history: Vec<TurnSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnSummary {
    pub turn_id: u64,
    pub query: String,
    pub source: Option<String>,
    pub web_search_used: bool,
}
