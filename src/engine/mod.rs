//! Public façade for the engine layer.

pub mod core;
pub mod evaluator;
pub mod orchestrator;
pub mod retrieval;
pub mod session;
pub mod state;
pub mod traits;
pub mod turn;
pub mod types;

pub use evaluator::{ConfidenceEvaluator, EvaluationResult, Thresholds};
pub use orchestrator::{AgentError, Orchestrator, NOT_FOUND_ANSWER};
pub use session::SessionState;
pub use state::{AgentState, StateMachine};
pub use traits::{Retriever, WebSearch};
pub use types::{AgentResponse, Confidence, ConversationTurn, SessionSummary};
