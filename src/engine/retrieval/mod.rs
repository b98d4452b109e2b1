pub mod db;
pub mod result;
pub mod ws;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("Database error: {0}")]
    Database(#[from] db::DatabaseError),
    #[error("Web search error: {0}")]
    WebSearch(#[from] ws::WebSearchError),
    #[error("{capability} timed out after {secs}s")]
    Timeout { capability: &'static str, secs: u64 },
}
