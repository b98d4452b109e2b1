use super::result::{WebResult, WebSearchOutcome};
use super::RetrievalError;
use crate::config::WebSearchConfig;
use crate::engine::traits::WebSearch;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tokio::time;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Error)]
pub enum WebSearchError {
    #[error("API request failed: {0}")]
    RequestFailed(String),
    #[error("API quota exceeded")]
    QuotaExceeded,
    #[error("Request timed out")]
    Timeout,
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Invalid API key")]
    InvalidApiKey,
}

impl WebSearchError {
    /// Worth another attempt after a pause.
    fn is_transient(&self) -> bool {
        matches!(self, WebSearchError::RequestFailed(_) | WebSearchError::Timeout)
    }
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<WebResult>,
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    response_time: Option<serde_json::Value>,
}

pub struct TavilySearcher {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    include_answer: bool,
    max_retries: u32,
    retry_delay: Duration,
}

impl TavilySearcher {
    pub fn new(config: &WebSearchConfig) -> Result<Self, WebSearchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("lorekeeper/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| WebSearchError::ConfigError(e.to_string()))?;

        if config.api_key.is_none() {
            warn!("no web search API key configured; web fallback will report failures");
        }

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            include_answer: config.include_answer,
            max_retries: config.max_retries,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        })
    }

    #[instrument(skip(self))]
    pub async fn search_with_retry(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<WebSearchOutcome, WebSearchError> {
        let api_key = self.api_key.as_deref().ok_or(WebSearchError::InvalidApiKey)?;

        let mut retries = 0;
        loop {
            match self.execute_search(query, max_results, api_key).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) if e.is_transient() && retries < self.max_retries => {
                    let delay = self.retry_delay.saturating_mul(2u32.saturating_pow(retries));
                    warn!(error = %e, attempt = retries + 1, "web search failed, retrying");
                    time::sleep(delay).await;
                    retries += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn execute_search(
        &self,
        query: &str,
        max_results: usize,
        api_key: &str,
    ) -> Result<WebSearchOutcome, WebSearchError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({
                "api_key": api_key,
                "query": query,
                "max_results": max_results,
                "include_answer": self.include_answer,
            }))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    WebSearchError::Timeout
                } else {
                    WebSearchError::RequestFailed(e.to_string())
                }
            })?;

        match response.status() {
            StatusCode::OK => {
                let body: TavilyResponse = response
                    .json()
                    .await
                    .map_err(|e| WebSearchError::RequestFailed(e.to_string()))?;
                debug!(results = body.results.len(), "web search finished");
                Ok(WebSearchOutcome {
                    success: true,
                    query: query.to_string(),
                    results: body.results,
                    answer: body.answer,
                    response_time: body.response_time.as_ref().and_then(seconds),
                    error: None,
                })
            }
            StatusCode::TOO_MANY_REQUESTS => Err(WebSearchError::QuotaExceeded),
            StatusCode::UNAUTHORIZED => Err(WebSearchError::InvalidApiKey),
            status => Err(WebSearchError::RequestFailed(format!("HTTP {}", status))),
        }
    }
}

/// Providers report elapsed time either as a number or a numeric string.
fn seconds(value: &serde_json::Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

#[async_trait]
impl WebSearch for TavilySearcher {
    fn provider(&self) -> &'static str {
        "Tavily"
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<WebSearchOutcome, RetrievalError> {
        let outcome = self.search_with_retry(query, max_results).await?;
        info!(results = outcome.results.len(), "web search returned");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn searcher(url: String, key: Option<&str>) -> TavilySearcher {
        TavilySearcher::new(&WebSearchConfig {
            endpoint: url,
            api_key: key.map(str::to_string),
            retry_delay_ms: 1,
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn parses_results_and_answer() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/search")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "api_key": "test",
                "query": "best zelda game",
                "max_results": 5,
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"query":"best zelda game","answer":"Breath of the Wild","response_time":"1.25",
                    "results":[{"title":"Zelda ranking","url":"https://example.com","content":"BotW tops the list","score":0.93}]}"#,
            )
            .create_async()
            .await;

        let s = searcher(format!("{}/search", server.url()), Some("test"));
        let out = s.search("best zelda game", 5).await.unwrap();

        mock.assert_async().await;
        assert!(out.success);
        assert_eq!(out.results[0].title, "Zelda ranking");
        assert_eq!(out.answer.as_deref(), Some("Breath of the Wild"));
        assert_eq!(out.response_time, Some(1.25));
    }

    #[tokio::test]
    async fn missing_key_fails_without_request() {
        let s = searcher("http://127.0.0.1:9/search".to_string(), None);
        let err = s.search("q", 5).await.unwrap_err();
        assert!(matches!(err, RetrievalError::WebSearch(WebSearchError::InvalidApiKey)));
    }

    #[tokio::test]
    async fn quota_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/search")
            .with_status(429)
            .expect(1)
            .create_async()
            .await;

        let s = searcher(format!("{}/search", server.url()), Some("test"));
        let err = s.search_with_retry("q", 5).await.unwrap_err();
        assert!(matches!(err, WebSearchError::QuotaExceeded));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn server_errors_are_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/search")
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let s = searcher(format!("{}/search", server.url()), Some("test"));
        let err = s.search_with_retry("q", 5).await.unwrap_err();
        assert!(matches!(err, WebSearchError::RequestFailed(_)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn long_retry_runs_do_not_overflow_backoff() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/search")
            .with_status(503)
            .expect(41)
            .create_async()
            .await;

        let s = TavilySearcher::new(&WebSearchConfig {
            endpoint: format!("{}/search", server.url()),
            api_key: Some("test".to_string()),
            max_retries: 40,
            retry_delay_ms: 0,
            ..Default::default()
        })
        .unwrap();
        let err = s.search_with_retry("q", 5).await.unwrap_err();
        assert!(matches!(err, WebSearchError::RequestFailed(_)));
        mock.assert_async().await;
    }
}
