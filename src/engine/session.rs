//! Append-only ledger of turns for one conversation.

use super::state::AgentState;
use super::types::{ConversationTurn, SessionSummary, TurnSummary};
use chrono::{DateTime, Local};
use std::fmt::Write as _;

pub const DEFAULT_CONTEXT_WINDOW: usize = 3;

#[derive(Debug, Clone)]
pub struct SessionState {
    session_id: String,
    created_at: DateTime<Local>,
    current_state: AgentState,
    turn_count: u64,
    conversation_history: Vec<ConversationTurn>,
}

impl SessionState {
    pub(crate) fn new() -> Self {
        let created_at = Local::now();
        Self {
            session_id: session_id_for(created_at),
            created_at,
            current_state: AgentState::Idle,
            turn_count: 0,
            conversation_history: Vec::new(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn created_at(&self) -> DateTime<Local> {
        self.created_at
    }

    pub fn current_state(&self) -> AgentState {
        self.current_state
    }

    pub(crate) fn set_current_state(&mut self, state: AgentState) {
        self.current_state = state;
    }

    pub fn turn_count(&self) -> u64 {
        self.turn_count
    }

    pub fn history(&self) -> &[ConversationTurn] {
        &self.conversation_history
    }

    pub fn add_turn(&mut self, turn: ConversationTurn) {
        self.conversation_history.push(turn);
        self.turn_count += 1;
        debug_assert_eq!(self.turn_count as usize, self.conversation_history.len());
    }

    /// Digest of the last `window` exchanges, oldest first.
    pub fn get_context(&self, window: usize) -> String {
        if self.conversation_history.is_empty() {
            return "No previous conversation history.".to_string();
        }

        let start = self.conversation_history.len().saturating_sub(window);
        let mut context = String::from("Previous conversation turns:\n");
        for turn in &self.conversation_history[start..] {
            let _ = writeln!(context, "\nTurn {}: {}", turn.turn_id, turn.query);
            if let Some(answer) = &turn.final_answer {
                let _ = writeln!(context, "Answer: {}", answer);
            }
        }
        context
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.session_id.clone(),
            created_at: self.created_at,
            turns_completed: self.turn_count,
            conversation_history: self
                .conversation_history
                .iter()
                .map(|turn| TurnSummary {
                    turn_id: turn.turn_id,
                    query: turn.query.clone(),
                    source: turn.source.clone(),
                    web_search_used: turn.web_search_used,
                })
                .collect(),
        }
    }
}

fn session_id_for(created_at: DateTime<Local>) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("session_{}_{}", created_at.format("%Y%m%d_%H%M%S"), &suffix[..8])
}
