//! Video-game question answering: local semantic index first, web search
//! when the local match is not trustworthy enough.

pub mod config;
pub mod engine;

pub use config::AgentConfig;
pub use engine::Orchestrator;
