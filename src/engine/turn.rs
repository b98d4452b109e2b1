//! In-flight turn. Fields accumulate phase by phase and are frozen into a
//! [`ConversationTurn`] exactly once.

use super::evaluator::EvaluationResult;
use super::state::AgentState;
use super::types::{Confidence, ConversationTurn, RetrievalSnapshot};
use chrono::{DateTime, Local};

/// Where the answer of a completed turn came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub answer: String,
    pub source: String,
    pub web_search_used: bool,
}

#[derive(Debug)]
pub struct TurnBuilder {
    turn_id: u64,
    query: String,
    timestamp: DateTime<Local>,
    phase: AgentState,
    retrieval: Option<RetrievalSnapshot>,
    evaluation: Option<EvaluationResult>,
    reasoning: Vec<String>,
}

impl TurnBuilder {
    pub fn new(turn_id: u64, query: impl Into<String>) -> Self {
        Self {
            turn_id,
            query: query.into(),
            timestamp: Local::now(),
            phase: AgentState::Idle,
            retrieval: None,
            evaluation: None,
            reasoning: Vec::new(),
        }
    }

    pub fn turn_id(&self) -> u64 {
        self.turn_id
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn phase(&self) -> AgentState {
        self.phase
    }

    pub fn enter(&mut self, phase: AgentState) {
        self.phase = phase;
    }

    pub fn note(&mut self, step: impl Into<String>) {
        self.reasoning.push(step.into());
    }

    pub fn record_retrieval(&mut self, snapshot: RetrievalSnapshot) {
        self.retrieval = Some(snapshot);
    }

    pub fn record_evaluation(&mut self, evaluation: EvaluationResult) {
        self.evaluation = Some(evaluation);
    }

    pub fn reasoning_text(&self) -> String {
        self.reasoning.join("\n")
    }

    /// Freeze a turn that reached COMPLETE.
    pub fn complete(self, resolution: Resolution) -> ConversationTurn {
        let confidence = self
            .evaluation
            .as_ref()
            .map(|e| e.confidence)
            .unwrap_or(Confidence::Low);
        ConversationTurn {
            turn_id: self.turn_id,
            query: self.query,
            timestamp: self.timestamp,
            agent_state: AgentState::Complete,
            retrieval_results: self.retrieval,
            confidence: Some(confidence),
            web_search_used: resolution.web_search_used,
            final_answer: Some(resolution.answer),
            source: Some(resolution.source),
            reasoning: self.reasoning,
        }
    }

    /// Freeze a turn that was aborted. Answer, source and confidence stay
    /// unset.
    pub fn abort(self) -> ConversationTurn {
        ConversationTurn {
            turn_id: self.turn_id,
            query: self.query,
            timestamp: self.timestamp,
            agent_state: AgentState::Error,
            retrieval_results: self.retrieval,
            confidence: None,
            web_search_used: false,
            final_answer: None,
            source: None,
            reasoning: self.reasoning,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aborted_turn_carries_no_answer() {
        let mut b = TurnBuilder::new(7, "q");
        b.enter(AgentState::Retrieving);
        b.note("retrieving");
        b.record_evaluation(EvaluationResult {
            confidence: Confidence::High,
            score: 0.1,
            rationale: String::new(),
        });
        let t = b.abort();
        assert_eq!(t.agent_state, AgentState::Error);
        assert!(t.final_answer.is_none() && t.source.is_none() && t.confidence.is_none());
        assert_eq!(t.reasoning, vec!["retrieving".to_string()]);
    }

    #[test]
    fn completed_turn_takes_evaluated_confidence() {
        let mut b = TurnBuilder::new(1, "q");
        b.record_evaluation(EvaluationResult {
            confidence: Confidence::Medium,
            score: 0.7,
            rationale: String::new(),
        });
        let t = b.complete(Resolution {
            answer: "a".into(),
            source: "none".into(),
            web_search_used: false,
        });
        assert_eq!(t.confidence, Some(Confidence::Medium));
        assert_eq!(t.agent_state, AgentState::Complete);
        assert_eq!(t.final_answer.as_deref(), Some("a"));
    }
}
