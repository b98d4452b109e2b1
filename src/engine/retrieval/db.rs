use super::result::Candidates;
use super::RetrievalError;
use crate::config::RetrievalConfig;
use crate::engine::traits::Retriever;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument};

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Vector search failed: {0}")]
    SearchFailed(String),
    #[error("Invalid query parameters: {0}")]
    InvalidParameters(String),
    #[error("Client setup failed: {0}")]
    ClientSetup(String),
}

/// Column-major query response of a Chroma-compatible index: one inner
/// list per query text.
#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    documents: Option<Vec<Vec<Option<String>>>>,
    #[serde(default)]
    distances: Option<Vec<Vec<f32>>>,
}

/// Talks to the game index over HTTP. The index embeds query text itself.
pub struct IndexRetriever {
    client: Client,
    endpoint: String,
}

impl IndexRetriever {
    #[instrument(skip(config), fields(endpoint = %config.endpoint))]
    pub fn new(config: &RetrievalConfig) -> Result<Self, DatabaseError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("lorekeeper/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DatabaseError::ClientSetup(e.to_string()))?;
        info!("IndexRetriever initialized");
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }

    #[instrument(skip(self))]
    pub async fn query(&self, query: &str, n: usize) -> Result<Candidates, DatabaseError> {
        if n == 0 {
            return Err(DatabaseError::InvalidParameters("n_results must be positive".into()));
        }

        let response = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({
                "query_texts": [query],
                "n_results": n,
                "include": ["documents", "distances"],
            }))
            .send()
            .await
            .map_err(|e| DatabaseError::SearchFailed(e.to_string()))?;

        if response.status() != StatusCode::OK {
            return Err(DatabaseError::SearchFailed(format!("HTTP {}", response.status())));
        }

        let body: QueryResponse = response
            .json()
            .await
            .map_err(|e| DatabaseError::SearchFailed(e.to_string()))?;

        let documents = body
            .documents
            .and_then(|d| d.into_iter().next())
            .unwrap_or_default();
        let distances = body
            .distances
            .and_then(|d| d.into_iter().next())
            .unwrap_or_default();

        // A slot without a document text is dropped along with its distance.
        let (documents, distances): (Vec<String>, Vec<f32>) = documents
            .into_iter()
            .zip(distances)
            .filter_map(|(doc, distance)| doc.map(|doc| (doc, distance)))
            .unzip();

        let candidates = Candidates::new(documents, distances);
        debug!(found = candidates.len(), "index query finished");
        Ok(candidates)
    }
}

#[async_trait]
impl Retriever for IndexRetriever {
    async fn retrieve(&self, query: &str, n: usize) -> Result<Candidates, RetrievalError> {
        Ok(self.query(query, n).await?)
    }
}
