//! Experiment configuration and credentials

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of searches issued per prompt
pub const DEFAULT_SEARCHES_PER_PROMPT: usize = 5;

/// Default pause between two attempts of the same prompt
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_secs(1);

/// Default pause between the last attempt of a prompt and the next prompt
pub const DEFAULT_PROMPT_DELAY: Duration = Duration::from_secs(2);

/// Default web-search endpoint
pub const DEFAULT_SEARCH_ENDPOINT: &str = "https://api.bing.microsoft.com";

/// Default agent service API version
pub const DEFAULT_AGENT_API_VERSION: &str = "2025-05-01";

/// Model used when an agent has to be created
pub const DEFAULT_AGENT_MODEL: &str = "gpt-4o";

/// Experiment configuration
///
/// Controls how many attempts the executor issues per prompt and the fixed
/// pacing between them. The delays exist to stay under upstream rate limits;
/// they never adapt to errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Number of sequential searches per prompt
    pub searches_per_prompt: usize,

    /// Delay after each attempt before the next one of the same prompt
    pub request_delay: Duration,

    /// Delay after the last attempt of a prompt before the next prompt
    pub prompt_delay: Duration,

    /// Per-request timeout handed to the HTTP client; `None` leaves the
    /// client's own behaviour in place
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<Duration>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            searches_per_prompt: DEFAULT_SEARCHES_PER_PROMPT,
            request_delay: DEFAULT_REQUEST_DELAY,
            prompt_delay: DEFAULT_PROMPT_DELAY,
            request_timeout: None,
        }
    }
}

impl ExperimentConfig {
    /// Create a config with the given number of searches per prompt
    pub fn new(searches_per_prompt: usize) -> Self {
        Self {
            searches_per_prompt,
            ..Default::default()
        }
    }

    /// Config with no pacing at all, for tests and dry runs
    pub fn immediate(searches_per_prompt: usize) -> Self {
        Self::new(searches_per_prompt)
            .with_request_delay(Duration::ZERO)
            .with_prompt_delay(Duration::ZERO)
    }

    /// Set the inter-request delay
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    /// Set the inter-prompt delay
    pub fn with_prompt_delay(mut self, delay: Duration) -> Self {
        self.prompt_delay = delay;
        self
    }

    /// Set the HTTP request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.searches_per_prompt == 0 {
            return Err(ConfigError::InvalidSearchCount(
                "searches per prompt must be at least 1".into(),
            ));
        }

        if let Some(timeout) = self.request_timeout {
            if timeout.is_zero() {
                return Err(ConfigError::InvalidTimeout(
                    "request timeout must be positive".into(),
                ));
            }
        }

        Ok(())
    }
}

/// Credentials for the standard web-search API
#[derive(Debug, Clone)]
pub struct SearchCredentials {
    /// Subscription key
    pub api_key: String,
    /// Base endpoint, without trailing slash
    pub endpoint: String,
    /// Optional market/region code (e.g. `en-US`)
    pub market: Option<String>,
}

impl SearchCredentials {
    /// Load from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = required(&lookup, "SEARCH_API_KEY")?;
        let endpoint = lookup("SEARCH_ENDPOINT")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SEARCH_ENDPOINT.to_string());

        Ok(Self {
            api_key,
            endpoint: validate_endpoint(&endpoint)?,
            market: lookup("SEARCH_MARKET").filter(|v| !v.trim().is_empty()),
        })
    }
}

/// Credentials for the hosted agent service
#[derive(Debug, Clone)]
pub struct AgentCredentials {
    /// Project endpoint, without trailing slash
    pub endpoint: String,
    /// Bearer token
    pub api_token: String,
    /// Agent to run; when unset the first listed agent is used, or one is created
    pub agent_id: Option<String>,
    /// Model for a newly created agent
    pub model: String,
    /// Web-grounding connection attached to each run, if any
    pub connection_id: Option<String>,
    /// Service API version query parameter
    pub api_version: String,
}

impl AgentCredentials {
    /// Load from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = required(&lookup, "AGENT_ENDPOINT")?;

        Ok(Self {
            endpoint: validate_endpoint(&endpoint)?,
            api_token: required(&lookup, "AGENT_API_TOKEN")?,
            agent_id: lookup("AGENT_ID")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            model: lookup("AGENT_MODEL")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_AGENT_MODEL.to_string()),
            connection_id: lookup("GROUNDING_CONNECTION_ID").filter(|v| !v.trim().is_empty()),
            api_version: lookup("AGENT_API_VERSION")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_AGENT_API_VERSION.to_string()),
        })
    }
}

fn required<F>(lookup: &F, key: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::MissingVar(key))
}

fn validate_endpoint(endpoint: &str) -> Result<String, ConfigError> {
    let trimmed = endpoint.trim().trim_end_matches('/');
    if trimmed.starts_with("https://") || trimmed.starts_with("http://") {
        Ok(trimmed.to_string())
    } else {
        Err(ConfigError::InvalidEndpoint(endpoint.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ExperimentConfig::default();
        assert_eq!(config.searches_per_prompt, 5);
        assert_eq!(config.request_delay, Duration::from_secs(1));
        assert_eq!(config.prompt_delay, Duration::from_secs(2));
        assert!(config.request_timeout.is_none());
    }

    #[test]
    fn test_config_builder_pattern() {
        let config = ExperimentConfig::new(3)
            .with_request_delay(Duration::from_millis(10))
            .with_prompt_delay(Duration::from_millis(20))
            .with_request_timeout(Duration::from_secs(30));

        assert_eq!(config.searches_per_prompt, 3);
        assert_eq!(config.request_delay, Duration::from_millis(10));
        assert_eq!(config.prompt_delay, Duration::from_millis(20));
        assert_eq!(config.request_timeout, Some(Duration::from_secs(30)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_zero_searches() {
        assert!(ExperimentConfig::new(0).validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_timeout() {
        let config = ExperimentConfig::new(1).with_request_timeout(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_immediate_config_has_no_delays() {
        let config = ExperimentConfig::immediate(2);
        assert!(config.request_delay.is_zero());
        assert!(config.prompt_delay.is_zero());
    }

    #[test]
    fn test_config_serialization() {
        let config = ExperimentConfig::new(4).with_request_timeout(Duration::from_secs(5));
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: ExperimentConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, config);
    }

    #[test]
    fn test_search_credentials_defaults_endpoint() {
        let creds = SearchCredentials::from_lookup(lookup(&[("SEARCH_API_KEY", "k")])).unwrap();
        assert_eq!(creds.api_key, "k");
        assert_eq!(creds.endpoint, DEFAULT_SEARCH_ENDPOINT);
        assert!(creds.market.is_none());
    }

    #[test]
    fn test_search_credentials_missing_key() {
        let err = SearchCredentials::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar("SEARCH_API_KEY")));
    }

    #[test]
    fn test_search_credentials_blank_key_is_missing() {
        let err = SearchCredentials::from_lookup(lookup(&[("SEARCH_API_KEY", "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(_)));
    }

    #[test]
    fn test_search_credentials_rejects_bad_endpoint() {
        let err = SearchCredentials::from_lookup(lookup(&[
            ("SEARCH_API_KEY", "k"),
            ("SEARCH_ENDPOINT", "api.example.com"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEndpoint(_)));
    }

    #[test]
    fn test_agent_credentials_trims_trailing_slash() {
        let creds = AgentCredentials::from_lookup(lookup(&[
            ("AGENT_ENDPOINT", "https://example.services.ai/api/projects/p1/"),
            ("AGENT_API_TOKEN", "t"),
            ("AGENT_ID", "asst_1"),
            ("GROUNDING_CONNECTION_ID", "conn-1"),
        ]))
        .unwrap();
        assert_eq!(creds.endpoint, "https://example.services.ai/api/projects/p1");
        assert_eq!(creds.agent_id.as_deref(), Some("asst_1"));
        assert_eq!(creds.connection_id.as_deref(), Some("conn-1"));
        assert_eq!(creds.api_version, DEFAULT_AGENT_API_VERSION);
        assert_eq!(creds.model, DEFAULT_AGENT_MODEL);
    }

    #[test]
    fn test_agent_credentials_without_agent_id() {
        let creds = AgentCredentials::from_lookup(lookup(&[
            ("AGENT_ENDPOINT", "https://example.services.ai"),
            ("AGENT_API_TOKEN", "t"),
            ("AGENT_ID", "  "),
            ("AGENT_MODEL", "gpt-4.1"),
        ]))
        .unwrap();
        assert!(creds.agent_id.is_none());
        assert_eq!(creds.model, "gpt-4.1");
    }

    #[test]
    fn test_agent_credentials_missing_token() {
        let err = AgentCredentials::from_lookup(lookup(&[(
            "AGENT_ENDPOINT",
            "https://example.services.ai",
        )]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar("AGENT_API_TOKEN")));
    }
}
