//! Configuration types.
//!
//! Everything is read from the environment (after `.env` has been loaded by
//! the binary). Lookups go through a closure so tests never touch the real
//! process environment.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default system prompt sent with every inference call.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a coding assistant. You help the user with \
programming tasks in their current working directory. Use the available tools to read, list, \
edit and diff files and to run terminal commands. Prefer small, targeted edits and explain what \
you changed.";

pub const DEFAULT_MODEL: &str = "claude-3-7-sonnet-latest";
pub const DEFAULT_MAX_TOKENS: u32 = 4096;
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Agent loop configuration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Agent name for identification in logs.
    pub name: String,
    /// System prompt for every inference call.
    pub system_prompt: Option<String>,
    /// Repaint period of the elapsed-time indicator.
    pub progress_interval: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "terminal-coding-agent".to_string(),
            system_prompt: Some(DEFAULT_SYSTEM_PROMPT.to_string()),
            progress_interval: Duration::from_secs(1),
        }
    }
}

impl AgentConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let system_prompt = match lookup("AGENT_SYSTEM_PROMPT") {
            Some(prompt) if prompt.trim().is_empty() => None,
            Some(prompt) => Some(prompt),
            None => defaults.system_prompt,
        };

        let progress_interval = match lookup("AGENT_PROGRESS_INTERVAL_MS") {
            Some(raw) => {
                let ms: u64 = parse_value("AGENT_PROGRESS_INTERVAL_MS", &raw)?;
                if ms == 0 {
                    return Err(ConfigError::InvalidValue {
                        key: "AGENT_PROGRESS_INTERVAL_MS".to_string(),
                        message: "must be greater than zero".to_string(),
                    });
                }
                Duration::from_millis(ms)
            }
            None => defaults.progress_interval,
        };

        Ok(Self {
            system_prompt,
            progress_interval,
            ..defaults
        })
    }
}

/// Configuration for the inference backend.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: SecretString,
    pub model: String,
    pub max_tokens: u32,
    pub base_url: String,
}

impl LlmConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_key = lookup("ANTHROPIC_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("ANTHROPIC_API_KEY".to_string()))?;

        let model = lookup("AGENT_MODEL")
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let max_tokens = match lookup("AGENT_MAX_TOKENS") {
            Some(raw) => parse_value("AGENT_MAX_TOKENS", &raw)?,
            None => DEFAULT_MAX_TOKENS,
        };

        let base_url = lookup("ANTHROPIC_BASE_URL")
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            api_key: SecretString::from(api_key),
            model,
            max_tokens,
            base_url,
        })
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{:?}: {}", raw, e),
        })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_llm_config_defaults() {
        let config = LlmConfig::from_lookup(env(&[("ANTHROPIC_API_KEY", "sk-ant-123")])).unwrap();
        assert_eq!(config.api_key.expose_secret(), "sk-ant-123");
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_llm_config_missing_key() {
        let err = LlmConfig::from_lookup(env(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "ANTHROPIC_API_KEY"));

        let err = LlmConfig::from_lookup(env(&[("ANTHROPIC_API_KEY", "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(_)));
    }

    #[test]
    fn test_llm_config_overrides() {
        let config = LlmConfig::from_lookup(env(&[
            ("ANTHROPIC_API_KEY", "k"),
            ("AGENT_MODEL", "claude-sonnet-4-20250514"),
            ("AGENT_MAX_TOKENS", "2048"),
            ("ANTHROPIC_BASE_URL", "http://localhost:8080"),
        ]))
        .unwrap();
        assert_eq!(config.model, "claude-sonnet-4-20250514");
        assert_eq!(config.max_tokens, 2048);
        assert_eq!(config.base_url, "http://localhost:8080");
    }

    #[test]
    fn test_llm_config_invalid_max_tokens() {
        let err = LlmConfig::from_lookup(env(&[
            ("ANTHROPIC_API_KEY", "k"),
            ("AGENT_MAX_TOKENS", "lots"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "AGENT_MAX_TOKENS"));
    }

    #[test]
    fn test_agent_config() {
        let config = AgentConfig::from_lookup(env(&[])).unwrap();
        assert_eq!(config.system_prompt.as_deref(), Some(DEFAULT_SYSTEM_PROMPT));
        assert_eq!(config.progress_interval, Duration::from_secs(1));

        let config = AgentConfig::from_lookup(env(&[
            ("AGENT_SYSTEM_PROMPT", ""),
            ("AGENT_PROGRESS_INTERVAL_MS", "250"),
        ]))
        .unwrap();
        assert!(config.system_prompt.is_none());
        assert_eq!(config.progress_interval, Duration::from_millis(250));

        assert!(AgentConfig::from_lookup(env(&[("AGENT_PROGRESS_INTERVAL_MS", "0")])).is_err());
    }
}
