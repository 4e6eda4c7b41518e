use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use tracing::info;

use crate::error::MagpieError;

/// Which hosted model family generates hunt content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Gemini,
    Claude,
}

impl Provider {
    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini-1.5-flash",
            Provider::Claude => "claude-haiku-4-5-20251001",
        }
    }

    fn api_key_var(&self) -> &'static str {
        match self {
            Provider::Gemini => "GEMINI_API_KEY",
            Provider::Claude => "ANTHROPIC_API_KEY",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Gemini => f.write_str("gemini"),
            Provider::Claude => f.write_str("claude"),
        }
    }
}

impl FromStr for Provider {
    type Err = MagpieError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(Provider::Gemini),
            "claude" | "anthropic" => Ok(Provider::Claude),
            other => Err(MagpieError::Config(format!("unknown provider: {other}"))),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub provider: Provider,

    /// Only generation needs it; see [`Config::require_api_key`].
    pub api_key: Option<String>,
    pub model: String,
    pub request_timeout: Duration,

    /// Postgres URL for durable hunts and audit logs. In-memory when unset.
    pub database_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, MagpieError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup (the environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, MagpieError> {
        let provider = match lookup("MAGPIE_PROVIDER") {
            Some(value) => value.parse()?,
            None => Provider::Gemini,
        };

        let api_key = lookup(provider.api_key_var()).filter(|key| !key.trim().is_empty());

        let model = lookup("MAGPIE_MODEL").unwrap_or_else(|| provider.default_model().to_string());

        let request_timeout = match lookup("MAGPIE_REQUEST_TIMEOUT_SECS") {
            Some(value) => Duration::from_secs(value.trim().parse().map_err(|_| {
                MagpieError::Config("MAGPIE_REQUEST_TIMEOUT_SECS must be a number".to_string())
            })?),
            None => Duration::from_secs(60),
        };

        Ok(Self {
            provider,
            api_key,
            model,
            request_timeout,
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
        })
    }

    /// The provider key, or a config error naming the variable to set.
    pub fn require_api_key(&self) -> Result<&str, MagpieError> {
        self.api_key.as_deref().ok_or_else(|| {
            MagpieError::Config(format!(
                "{} environment variable is required",
                self.provider.api_key_var()
            ))
        })
    }

    /// Log the effective configuration with secrets masked.
    pub fn log_redacted(&self) {
        let api_key = match &self.api_key {
            Some(key) => redact(key),
            None => "unset".to_string(),
        };
        info!(
            provider = %self.provider,
            model = self.model.as_str(),
            api_key = api_key.as_str(),
            request_timeout_secs = self.request_timeout.as_secs(),
            database = if self.database_url.is_some() { "postgres" } else { "memory" },
            "Loaded config"
        );
    }
}

fn redact(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    if secret.chars().count() <= 8 {
        "****".to_string()
    } else {
        format!("{visible}****")
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
    fn test_defaults_to_gemini() {
        let config = Config::from_lookup(lookup(&[("GEMINI_API_KEY", "g-key")])).unwrap();
        assert_eq!(config.provider, Provider::Gemini);
        assert_eq!(config.model, "gemini-1.5-flash");
        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert_eq!(config.database_url, None);
    }

    #[test]
    fn test_claude_provider_uses_anthropic_key() {
        let config = Config::from_lookup(lookup(&[
            ("MAGPIE_PROVIDER", "claude"),
            ("ANTHROPIC_API_KEY", "a-key"),
            ("MAGPIE_MODEL", "claude-sonnet-4-20250514"),
            ("DATABASE_URL", "postgres://localhost/magpie"),
        ]))
        .unwrap();
        assert_eq!(config.provider, Provider::Claude);
        assert_eq!(config.require_api_key().unwrap(), "a-key");
        assert_eq!(config.model, "claude-sonnet-4-20250514");
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/magpie")
        );
    }

    #[test]
    fn test_missing_key_loads_but_cannot_generate() {
        let config = Config::from_lookup(lookup(&[
            ("MAGPIE_PROVIDER", "claude"),
            ("GEMINI_API_KEY", "g-key"),
        ]))
        .unwrap();
        assert_eq!(config.api_key, None);

        let err = config.require_api_key().unwrap_err();
        assert!(matches!(err, MagpieError::Config(ref msg) if msg.contains("ANTHROPIC_API_KEY")));
    }

    #[test]
    fn test_blank_key_counts_as_missing() {
        let config = Config::from_lookup(lookup(&[("GEMINI_API_KEY", "   ")])).unwrap();
        assert!(config.require_api_key().is_err());
    }

    #[test]
    fn test_bad_timeout_is_config_error() {
        let err = Config::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "g-key"),
            ("MAGPIE_REQUEST_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, MagpieError::Config(_)));
    }

    #[test]
    fn test_redact() {
        assert_eq!(redact("short"), "****");
        assert_eq!(redact("AIzaSyExampleKey"), "AIza****");
    }
}
