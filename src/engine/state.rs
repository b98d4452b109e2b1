//! Phase guard for the single in-flight turn of a session.

use super::session::SessionState;
use super::types::ConversationTurn;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    Idle,
    Retrieving,
    Evaluating,
    SearchingWeb,
    Processing,
    Complete,
    Error,
}

impl AgentState {
    /// Edges leaving `self`. `Idle` is the only re-entry point after a
    /// terminal outcome.
    pub fn successors(self) -> &'static [AgentState] {
        use AgentState::*;
        match self {
            Idle => &[Retrieving],
            Retrieving => &[Evaluating, Error],
            Evaluating => &[SearchingWeb, Processing, Error],
            SearchingWeb => &[Processing, Error],
            Processing => &[Complete, Error],
            Complete => &[Idle],
            Error => &[Idle],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentState::Idle => "idle",
            AgentState::Retrieving => "retrieving",
            AgentState::Evaluating => "evaluating",
            AgentState::SearchingWeb => "searching_web",
            AgentState::Processing => "processing",
            AgentState::Complete => "complete",
            AgentState::Error => "error",
        }
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owns the session and is the only thing allowed to move its state.
#[derive(Debug)]
pub struct StateMachine {
    session: SessionState,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    pub fn new() -> Self {
        let session = SessionState::new();
        info!(session_id = %session.session_id(), "session started");
        Self { session }
    }

    pub fn can_transition(from: AgentState, to: AgentState) -> bool {
        from.successors().contains(&to)
    }

    /// Commit `to` if the table allows it. Illegal moves are rejected
    /// without touching the current state.
    pub fn transition(&mut self, to: AgentState) -> bool {
        let from = self.session.current_state();
        if Self::can_transition(from, to) {
            self.session.set_current_state(to);
            debug!(%from, %to, "state transition");
            true
        } else {
            warn!(%from, %to, "rejected illegal state transition");
            false
        }
    }

    pub fn current_state(&self) -> AgentState {
        self.session.current_state()
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub(crate) fn session_mut(&mut self) -> &mut SessionState {
        &mut self.session
    }

    pub fn history(&self) -> &[ConversationTurn] {
        self.session.history()
    }

    /// Start a new conversation. The old session is dropped whole.
    pub fn reset(&mut self) {
        let previous = std::mem::replace(&mut self.session, SessionState::new());
        info!(
            old_session = %previous.session_id(),
            new_session = %self.session.session_id(),
            "session reset"
        );
    }
}
