//! Agent settings: optional TOML file, then environment overrides.

use crate::engine::evaluator::{Thresholds, DEFAULT_TOP_K};
use crate::engine::session::DEFAULT_CONTEXT_WINDOW;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

pub const API_KEY_ENV: &str = "TAVILY_API_KEY";

/// Upper bounds accepted by [`AgentConfig::validate`].
pub const MAX_RETRIES: u32 = 10;
pub const MAX_TIMEOUT_SECS: u64 = 300;
pub const MAX_RETRY_DELAY_MS: u64 = 60_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
    #[error("Invalid value: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub retrieval: RetrievalConfig,
    pub web: WebSearchConfig,
    pub evaluation: EvaluationConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Query endpoint of the game index collection.
    pub endpoint: String,
    /// Candidates requested per query.
    pub n_results: usize,
    pub timeout_secs: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8000/api/v1/collections/games/query".to_string(),
            n_results: 3,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSearchConfig {
    pub endpoint: String,
    /// Falls back to `TAVILY_API_KEY` when absent.
    pub api_key: Option<String>,
    pub max_results: usize,
    pub include_answer: bool,
    pub timeout_secs: u64,
    pub max_retries: u32,
    /// Base delay between retries, doubled on each attempt.
    pub retry_delay_ms: u64,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.tavily.com/search".to_string(),
            api_key: None,
            max_results: 5,
            include_answer: true,
            timeout_secs: 8,
            max_retries: 2,
            retry_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub high_threshold: f32,
    pub medium_threshold: f32,
    pub top_k: usize,
    pub use_average: bool,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        let thresholds = Thresholds::default();
        Self {
            high_threshold: thresholds.high,
            medium_threshold: thresholds.medium,
            top_k: DEFAULT_TOP_K,
            use_average: false,
        }
    }
}

impl EvaluationConfig {
    pub fn thresholds(&self) -> Result<Thresholds, ConfigError> {
        Thresholds::new(self.high_threshold, self.medium_threshold).map_err(ConfigError::Invalid)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Turns shown by the context digest.
    pub context_window: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            context_window: DEFAULT_CONTEXT_WINDOW,
        }
    }
}

impl AgentConfig {
    /// Read `path` if given (a missing file means defaults), load `.env`,
    /// then apply environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let mut config = match path {
            Some(p) if p.exists() => {
                info!(path = %p.display(), "loading config file");
                Self::from_toml(&std::fs::read_to_string(p)?)?
            }
            Some(p) => {
                debug!(path = %p.display(), "config file not found, using defaults");
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Environment wins over the file for the API key.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.web.api_key = Some(key);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for endpoint in [&self.retrieval.endpoint, &self.web.endpoint] {
            url::Url::parse(endpoint).map_err(|e| ConfigError::InvalidEndpoint {
                endpoint: endpoint.clone(),
                reason: e.to_string(),
            })?;
        }
        if self.retrieval.n_results == 0 {
            return Err(ConfigError::Invalid("retrieval.n_results must be positive".into()));
        }
        if self.web.max_results == 0 {
            return Err(ConfigError::Invalid("web.max_results must be positive".into()));
        }
        if self.retrieval.timeout_secs == 0 || self.web.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeouts must be positive".into()));
        }
        let longest = self.retrieval.timeout_secs.max(self.web.timeout_secs);
        if longest > MAX_TIMEOUT_SECS {
            return Err(ConfigError::Invalid(format!(
                "timeouts must not exceed {MAX_TIMEOUT_SECS}s"
            )));
        }
        if self.web.max_retries > MAX_RETRIES {
            return Err(ConfigError::Invalid(format!(
                "web.max_retries must not exceed {MAX_RETRIES}"
            )));
        }
        if self.web.retry_delay_ms > MAX_RETRY_DELAY_MS {
            return Err(ConfigError::Invalid(format!(
                "web.retry_delay_ms must not exceed {MAX_RETRY_DELAY_MS}"
            )));
        }
        self.evaluation.thresholds()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let c = AgentConfig::default();
        c.validate().unwrap();
        assert_eq!(c.retrieval.n_results, 3);
        assert_eq!(c.web.max_results, 5);
        assert_eq!(c.evaluation.high_threshold, 0.65);
        assert_eq!(c.evaluation.medium_threshold, 0.75);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[evaluation]\nhigh_threshold = 0.5\n\n[web]\nmax_results = 2\napi_key = \"from-file\""
        )
        .unwrap();

        let c = AgentConfig::load(Some(file.path())).unwrap();
        assert_eq!(c.evaluation.high_threshold, 0.5);
        assert_eq!(c.evaluation.medium_threshold, 0.75);
        assert_eq!(c.web.max_results, 2);
        assert_eq!(c.retrieval.n_results, 3);
    }

    #[test]
    fn missing_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let c = AgentConfig::load(Some(&dir.path().join("nope.toml"))).unwrap();
        assert_eq!(c.session.context_window, 3);
    }

    #[test]
    fn env_key_overrides_file() {
        let mut c = AgentConfig::from_toml("[web]\napi_key = \"file\"").unwrap();
        c.apply_env(|k| (k == API_KEY_ENV).then(|| "env".to_string()));
        assert_eq!(c.web.api_key.as_deref(), Some("env"));

        c.apply_env(|_| Some("  ".to_string()));
        assert_eq!(c.web.api_key.as_deref(), Some("env"));
    }

    #[test]
    fn rejects_inverted_thresholds() {
        let c = AgentConfig::from_toml("[evaluation]\nhigh_threshold = 0.9").unwrap();
        assert!(matches!(c.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_bad_endpoint() {
        let c = AgentConfig::from_toml("[retrieval]\nendpoint = \"not a url\"").unwrap();
        assert!(matches!(c.validate(), Err(ConfigError::InvalidEndpoint { .. })));
    }

    #[test]
    fn rejects_unbounded_web_retry_settings() {
        let c = AgentConfig::from_toml("[web]\nmax_retries = 40").unwrap();
        assert!(matches!(c.validate(), Err(ConfigError::Invalid(_))));

        let mut c = AgentConfig::default();
        c.web.timeout_secs = u64::MAX / 2;
        assert!(matches!(c.validate(), Err(ConfigError::Invalid(_))));

        let mut c = AgentConfig::default();
        c.web.retry_delay_ms = u64::MAX;
        assert!(matches!(c.validate(), Err(ConfigError::Invalid(_))));

        let mut c = AgentConfig::default();
        c.web.max_retries = MAX_RETRIES;
        c.web.timeout_secs = MAX_TIMEOUT_SECS;
        c.web.retry_delay_ms = MAX_RETRY_DELAY_MS;
        c.validate().unwrap();
    }
}
