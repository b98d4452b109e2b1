//! Capabilities the router consumes. Implementations live outside the
//! decision core (see `retrieval::db` and `retrieval::ws`).

use super::retrieval::result::{Candidates, WebSearchOutcome};
use super::retrieval::RetrievalError;
use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

/// Local semantic index.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Up to `n` candidates, best match first.
    async fn retrieve(&self, query: &str, n: usize) -> Result<Candidates, RetrievalError>;
}

/// Live web-search provider.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Human-readable provider name, used in answer provenance.
    fn provider(&self) -> &'static str;

    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<WebSearchOutcome, RetrievalError>;
}
