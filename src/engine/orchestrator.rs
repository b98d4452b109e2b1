//! High-level coordinator: query → local retrieval → confidence → answer
//! source → (web fallback) → recorded turn.

use super::{
    evaluator::{ConfidenceEvaluator, EvaluationResult, Thresholds, DEFAULT_TOP_K},
    retrieval::{
        result::{Candidates, WebSearchOutcome},
        RetrievalError,
    },
    session::{SessionState, DEFAULT_CONTEXT_WINDOW},
    state::{AgentState, StateMachine},
    traits::{Retriever, WebSearch},
    turn::{Resolution, TurnBuilder},
    types::{
        AgentResponse, Confidence, ConversationTurn, RetrievalDetails, RetrievalSnapshot,
        SessionSummary,
    },
};
use crate::config::{AgentConfig, ConfigError};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time;
use tracing::{info, instrument, warn};

/// Answer given when neither the index nor the web produced anything.
pub const NOT_FOUND_ANSWER: &str = "No information found in local database or web search.";
pub const LOCAL_SOURCE: &str = "local index";
pub const NO_SOURCE: &str = "none";

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Illegal state transition {from} -> {to}")]
    IllegalTransition { from: AgentState, to: AgentState },
}

/// Knobs for one orchestrator. Thresholds live in the evaluator.
#[derive(Debug, Clone)]
pub struct RoutingSettings {
    pub n_results: usize,
    pub web_max_results: usize,
    pub top_k: usize,
    pub use_average: bool,
    pub retrieval_timeout: Duration,
    pub web_timeout: Duration,
    pub context_window: usize,
}

impl Default for RoutingSettings {
    fn default() -> Self {
        Self {
            n_results: 3,
            web_max_results: 5,
            top_k: DEFAULT_TOP_K,
            use_average: false,
            retrieval_timeout: Duration::from_secs(10),
            web_timeout: Duration::from_secs(30),
            context_window: DEFAULT_CONTEXT_WINDOW,
        }
    }
}

impl RoutingSettings {
    pub fn from_config(config: &AgentConfig) -> Self {
        // The web budget covers every retry of the adapter, not one request.
        let web = &config.web;
        let attempts = u64::from(web.max_retries) + 1;
        let backoff_units = 1u64.checked_shl(web.max_retries).map_or(u64::MAX, |n| n - 1);
        let backoff = Duration::from_millis(web.retry_delay_ms.saturating_mul(backoff_units));
        let web_timeout =
            Duration::from_secs(web.timeout_secs.saturating_mul(attempts)).saturating_add(backoff);
        Self {
            n_results: config.retrieval.n_results,
            web_max_results: config.web.max_results,
            top_k: config.evaluation.top_k,
            use_average: config.evaluation.use_average,
            retrieval_timeout: Duration::from_secs(config.retrieval.timeout_secs),
            web_timeout,
            context_window: config.session.context_window,
        }
    }
}

/// What the pipeline settled on before the turn is frozen.
struct Routed {
    resolution: Resolution,
    evaluation: EvaluationResult,
    num_candidates: usize,
    has_distances: bool,
}

/// One orchestrator drives exactly one session. `process_query` takes
/// `&mut self`, so turns on a session are strictly sequential.
pub struct Orchestrator {
    retriever: Arc<dyn Retriever>,
    web: Arc<dyn WebSearch>,
    evaluator: ConfidenceEvaluator,
    machine: StateMachine,
    settings: RoutingSettings,
}

impl Orchestrator {
    pub fn new(retriever: Arc<dyn Retriever>, web: Arc<dyn WebSearch>) -> Self {
        Self::with_settings(retriever, web, Thresholds::default(), RoutingSettings::default())
    }

    pub fn with_settings(
        retriever: Arc<dyn Retriever>,
        web: Arc<dyn WebSearch>,
        thresholds: Thresholds,
        settings: RoutingSettings,
    ) -> Self {
        let machine = StateMachine::new();
        info!(session_id = %machine.session().session_id(), "agent initialized");
        Self {
            retriever,
            web,
            evaluator: ConfidenceEvaluator::new(thresholds),
            machine,
            settings,
        }
    }

    pub fn from_config(
        config: &AgentConfig,
        retriever: Arc<dyn Retriever>,
        web: Arc<dyn WebSearch>,
    ) -> Result<Self, ConfigError> {
        let thresholds = config.evaluation.thresholds()?;
        Ok(Self::with_settings(
            retriever,
            web,
            thresholds,
            RoutingSettings::from_config(config),
        ))
    }

    /// Drive one query through the whole pipeline and record it.
    ///
    /// Capability failures never surface here; they degrade to "no
    /// results". The only error is a broken transition invariant, in which
    /// case the turn is recorded in ERROR and the machine is back in IDLE.
    #[instrument(skip(self), fields(session = %self.machine.session().session_id()))]
    pub async fn process_query(&mut self, query: &str) -> Result<AgentResponse, AgentError> {
        let turn_id = self.machine.session().turn_count() + 1;
        let mut turn = TurnBuilder::new(turn_id, query);

        let outcome = self.run(&mut turn).await;
        let routed = match outcome {
            Ok(routed) => routed,
            Err(e) => {
                self.abort(turn, &e);
                return Err(e);
            }
        };

        let reasoning = turn.reasoning_text();
        let record = turn.complete(routed.resolution.clone());
        self.machine.session_mut().add_turn(record);
        self.return_to_idle()?;

        let Routed {
            resolution,
            evaluation,
            num_candidates,
            has_distances,
        } = routed;
        info!(
            turn_id,
            confidence = %evaluation.confidence,
            source = %resolution.source,
            web_search_used = resolution.web_search_used,
            "turn complete"
        );

        Ok(AgentResponse {
            turn_id,
            query: query.to_string(),
            answer: resolution.answer,
            confidence: evaluation.confidence,
            source: resolution.source,
            web_search_used: resolution.web_search_used,
            reasoning,
            retrieval_details: RetrievalDetails {
                num_candidates_found: num_candidates,
                best_score: has_distances.then_some(evaluation.score),
            },
        })
    }

    async fn run(&mut self, turn: &mut TurnBuilder) -> Result<Routed, AgentError> {
        turn.note("Step 1: attempting retrieval from the local game index...");
        self.advance(turn, AgentState::Retrieving)?;
        let candidates = self.retrieve(turn.query()).await;
        turn.note(format!("   Retrieved {} candidates from the index", candidates.len()));
        turn.record_retrieval(RetrievalSnapshot {
            documents: candidates.documents.clone(),
            distances: candidates.distances.clone(),
            num_results: candidates.len(),
        });

        turn.note("Step 2: evaluating retrieval confidence...");
        self.advance(turn, AgentState::Evaluating)?;
        let evaluation = self.evaluator.evaluate_with(
            &candidates.distances,
            self.settings.top_k,
            self.settings.use_average,
        );
        turn.note(format!(
            "   Confidence: {} (score: {:.3})",
            evaluation.confidence, evaluation.score
        ));
        turn.note(format!("   Rationale: {}", evaluation.rationale));
        turn.record_evaluation(evaluation.clone());

        // A HIGH score over zero documents is not an answer.
        let resolution = match candidates.documents.first() {
            Some(best) if evaluation.confidence == Confidence::High => {
                turn.note("High confidence in local results, answering from the index");
                self.advance(turn, AgentState::Processing)?;
                Resolution {
                    answer: best.clone(),
                    source: LOCAL_SOURCE.to_string(),
                    web_search_used: false,
                }
            }
            _ => {
                turn.note("Low/medium confidence, falling back to web search...");
                self.advance(turn, AgentState::SearchingWeb)?;
                turn.note("Step 3: searching the web...");
                let outcome = self.search_web(turn.query()).await;
                let resolution = self.resolve_web(&outcome);
                if resolution.web_search_used {
                    turn.note(format!("   Found web result: {}", resolution.source));
                } else {
                    turn.note("   No results found in web search");
                }
                self.advance(turn, AgentState::Processing)?;
                resolution
            }
        };

        self.advance(turn, AgentState::Complete)?;

        Ok(Routed {
            resolution,
            evaluation,
            num_candidates: candidates.len(),
            has_distances: !candidates.distances.is_empty(),
        })
    }

    fn resolve_web(&self, outcome: &WebSearchOutcome) -> Resolution {
        match outcome.top() {
            Some(top) => {
                let title = if top.title.trim().is_empty() {
                    "Unknown"
                } else {
                    top.title.as_str()
                };
                Resolution {
                    answer: top.content.clone(),
                    source: format!("web search ({}) - {}", self.web.provider(), title),
                    web_search_used: true,
                }
            }
            None => Resolution {
                answer: NOT_FOUND_ANSWER.to_string(),
                source: NO_SOURCE.to_string(),
                web_search_used: false,
            },
        }
    }

    fn advance(&mut self, turn: &mut TurnBuilder, to: AgentState) -> Result<(), AgentError> {
        let from = self.machine.current_state();
        if self.machine.transition(to) {
            turn.enter(to);
            Ok(())
        } else {
            Err(AgentError::IllegalTransition { from, to })
        }
    }

    fn return_to_idle(&mut self) -> Result<(), AgentError> {
        let from = self.machine.current_state();
        if self.machine.transition(AgentState::Idle) {
            Ok(())
        } else {
            Err(AgentError::IllegalTransition {
                from,
                to: AgentState::Idle,
            })
        }
    }

    /// Record the turn in ERROR and put the machine back at rest.
    fn abort(&mut self, mut turn: TurnBuilder, err: &AgentError) {
        warn!(turn_id = turn.turn_id(), phase = %turn.phase(), error = %err, "aborting turn");
        turn.note(format!("Aborted: {err}"));
        if self.machine.transition(AgentState::Error) {
            turn.enter(AgentState::Error);
        }
        self.machine.session_mut().add_turn(turn.abort());
        if !self.machine.transition(AgentState::Idle) {
            warn!(state = %self.machine.current_state(), "could not return to idle after abort");
        }
    }

    async fn retrieve(&self, query: &str) -> Candidates {
        let limit = self.settings.retrieval_timeout;
        match time::timeout(limit, self.retriever.retrieve(query, self.settings.n_results)).await {
            Ok(Ok(found)) => Candidates::new(found.documents, found.distances),
            Ok(Err(e)) => {
                warn!(error = %e, "retrieval failed, continuing with no candidates");
                Candidates::empty()
            }
            Err(_) => {
                let e = RetrievalError::Timeout {
                    capability: "retrieval",
                    secs: limit.as_secs(),
                };
                warn!(error = %e, "retrieval failed, continuing with no candidates");
                Candidates::empty()
            }
        }
    }

    async fn search_web(&self, query: &str) -> WebSearchOutcome {
        let limit = self.settings.web_timeout;
        match time::timeout(limit, self.web.search(query, self.settings.web_max_results)).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                warn!(error = %e, "web search failed");
                WebSearchOutcome::failed(query, e.to_string())
            }
            Err(_) => {
                let e = RetrievalError::Timeout {
                    capability: "web search",
                    secs: limit.as_secs(),
                };
                warn!(error = %e, "web search failed");
                WebSearchOutcome::failed(query, e.to_string())
            }
        }
    }

    pub fn session_summary(&self) -> SessionSummary {
        self.machine.session().summary()
    }

    /// Recent exchanges for display. Not fed back into routing.
    pub fn context(&self) -> String {
        self.machine.session().get_context(self.settings.context_window)
    }

    pub fn session(&self) -> &SessionState {
        self.machine.session()
    }

    pub fn history(&self) -> &[ConversationTurn] {
        self.machine.history()
    }

    pub fn current_state(&self) -> AgentState {
        self.machine.current_state()
    }

    /// Drop the conversation and start a fresh session.
    pub fn reset_session(&mut self) {
        self.machine.reset();
    }

    #[cfg(test)]
    pub(crate) fn state_machine_mut(&mut self) -> &mut StateMachine {
        &mut self.machine
    }
}
