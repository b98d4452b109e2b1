//! Values handed back by the two capabilities.

use serde::{Deserialize, Serialize};

/// Index-aligned documents and distances, best match first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Candidates {
    pub documents: Vec<String>,
    pub distances: Vec<f32>,
}

impl Candidates {
    /// Pairs beyond the shorter of the two lists are dropped.
    pub fn new(mut documents: Vec<String>, mut distances: Vec<f32>) -> Self {
        let len = documents.len().min(distances.len());
        documents.truncate(len);
        distances.truncate(len);
        Self { documents, distances }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub score: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebSearchOutcome {
    pub success: bool,
    pub query: String,
    pub results: Vec<WebResult>,
    /// Provider's own short answer, when it produced one.
    pub answer: Option<String>,
    pub response_time: Option<f64>,
    pub error: Option<String>,
}

impl WebSearchOutcome {
    pub fn failed(query: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            query: query.to_string(),
            results: Vec::new(),
            answer: None,
            response_time: None,
            error: Some(error.into()),
        }
    }

    pub fn top(&self) -> Option<&WebResult> {
        if self.success {
            self.results.first()
        } else {
            None
        }
    }
}
