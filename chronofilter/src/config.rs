use crate::types::{ChronoError, Result};
use url::Url;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://chronofilter.db?mode=rwc";
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Full URL of an OpenAI-compatible chat completions endpoint.
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_seconds: u64,
}

impl LlmConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: None,
            model: DEFAULT_LLM_MODEL.to_string(),
            timeout_seconds: 20,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    /// Remote analysis is off unless an endpoint is configured.
    pub llm: Option<LlmConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            llm: None,
        }
    }
}

impl AppConfig {
    /// Reads `CHRONOFILTER_*` variables from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(url) = lookup("CHRONOFILTER_DATABASE_URL") {
            config.database_url = url;
        }

        if let Some(endpoint) = lookup("CHRONOFILTER_LLM_ENDPOINT").filter(|e| !e.trim().is_empty()) {
            let mut llm = LlmConfig::new(endpoint);
            llm.api_key = lookup("CHRONOFILTER_LLM_API_KEY").filter(|k| !k.is_empty());
            if let Some(model) = lookup("CHRONOFILTER_LLM_MODEL") {
                llm.model = model;
            }
            if let Some(timeout) = lookup("CHRONOFILTER_LLM_TIMEOUT_SECS") {
                llm.timeout_seconds = timeout.parse().map_err(|_| {
                    ChronoError::Config(format!("CHRONOFILTER_LLM_TIMEOUT_SECS is not a number: {}", timeout))
                })?;
            }
            config.llm = Some(llm);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.database_url.trim().is_empty() {
            return Err(ChronoError::Config("database url is empty".to_string()));
        }
        if let Some(llm) = &self.llm {
            let endpoint = Url::parse(&llm.endpoint)?;
            if !matches!(endpoint.scheme(), "http" | "https") {
                return Err(ChronoError::Config(format!(
                    "LLM endpoint must be http(s): {}",
                    llm.endpoint
                )));
            }
            if llm.model.trim().is_empty() {
                return Err(ChronoError::Config("LLM model name is empty".to_string()));
            }
            if llm.timeout_seconds == 0 {
                return Err(ChronoError::Config("LLM timeout must be positive".to_string()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = AppConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert!(config.llm.is_none());
    }

    #[test]
    fn reads_llm_settings() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("CHRONOFILTER_DATABASE_URL", "sqlite::memory:"),
            ("CHRONOFILTER_LLM_ENDPOINT", "https://llm.example.com/v1/chat/completions"),
            ("CHRONOFILTER_LLM_API_KEY", "secret"),
            ("CHRONOFILTER_LLM_MODEL", "small-model"),
            ("CHRONOFILTER_LLM_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.database_url, "sqlite::memory:");
        let llm = config.llm.unwrap();
        assert_eq!(llm.api_key.as_deref(), Some("secret"));
        assert_eq!(llm.model, "small-model");
        assert_eq!(llm.timeout_seconds, 5);
    }

    #[test]
    fn rejects_bad_timeout() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("CHRONOFILTER_LLM_ENDPOINT", "https://llm.example.com/v1/chat/completions"),
            ("CHRONOFILTER_LLM_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ChronoError::Config(_)));
    }

    #[test]
    fn rejects_non_http_endpoint() {
        let err = AppConfig::from_lookup(lookup_from(&[("CHRONOFILTER_LLM_ENDPOINT", "ftp://llm.example.com")]))
            .unwrap_err();
        assert!(matches!(err, ChronoError::Config(_)));

        let err = AppConfig::from_lookup(lookup_from(&[("CHRONOFILTER_LLM_ENDPOINT", "not a url")])).unwrap_err();
        assert!(matches!(err, ChronoError::InvalidUrl(_)));
    }
}
