use std::time::Duration;

use crate::error::AppError;

pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Process configuration shared by the CLI and the server.
#[derive(Debug, Clone)]
pub struct ScoutConfig {
    /// API keys parsed from the comma-separated `GROQ_API_KEYS`.
    pub api_keys: Vec<String>,
    pub model: String,
    pub base_url: String,
    pub llm_timeout: Duration,
    pub key_cooldown: Duration,
    pub port: u16,
}

impl ScoutConfig {
    /// Read configuration from environment variables.
    ///
    /// - `GROQ_API_KEYS` (required, comma-separated)
    /// - `SCOUT_MODEL` (optional, defaults to `llama-3.3-70b-versatile`)
    /// - `SCOUT_BASE_URL` (optional, defaults to the Groq OpenAI-compatible API)
    /// - `SCOUT_LLM_TIMEOUT_SECS` (optional, defaults to 60)
    /// - `SCOUT_KEY_COOLDOWN_MINUTES` (optional, defaults to 5)
    /// - `SCOUT_SERVER_PORT` (optional, defaults to 8000)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reading from an arbitrary source.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let raw_keys = get("GROQ_API_KEYS").ok_or_else(|| {
            AppError::ConfigError("GROQ_API_KEYS not set. Required for discovery.".into())
        })?;
        let api_keys: Vec<String> = raw_keys
            .split(',')
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        if api_keys.is_empty() {
            return Err(AppError::ConfigError(
                "GROQ_API_KEYS must contain at least one key".into(),
            ));
        }

        let model = get("SCOUT_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let base_url = get("SCOUT_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let llm_timeout = Duration::from_secs(parse_positive(&get, "SCOUT_LLM_TIMEOUT_SECS", 60)?);
        let key_cooldown =
            Duration::from_secs(60 * parse_positive(&get, "SCOUT_KEY_COOLDOWN_MINUTES", 5)?);

        let port = match get("SCOUT_SERVER_PORT") {
            None => 8000,
            Some(raw) => raw.parse::<u16>().map_err(|_| {
                AppError::ConfigError(format!("Invalid SCOUT_SERVER_PORT '{raw}'"))
            })?,
        };

        Ok(Self {
            api_keys,
            model,
            base_url,
            llm_timeout,
            key_cooldown,
            port,
        })
    }
}

fn parse_positive(
    get: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: u64,
) -> Result<u64, AppError> {
    let Some(raw) = get(name) else {
        return Ok(default);
    };
    let parsed: u64 = raw.parse().map_err(|_| {
        AppError::ConfigError(format!(
            "Invalid {name} '{raw}': must be a positive integer"
        ))
    })?;
    if parsed == 0 {
        return Err(AppError::ConfigError(format!("{name} must be at least 1")));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn defaults_applied() {
        let cfg = ScoutConfig::from_lookup(lookup(&[("GROQ_API_KEYS", "k1, k2")])).unwrap();
        assert_eq!(cfg.api_keys, vec!["k1", "k2"]);
        assert_eq!(cfg.model, DEFAULT_MODEL);
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.llm_timeout, Duration::from_secs(60));
        assert_eq!(cfg.key_cooldown, Duration::from_secs(300));
        assert_eq!(cfg.port, 8000);
    }

    #[test]
    fn missing_keys_is_error() {
        let err = ScoutConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
        let err = ScoutConfig::from_lookup(lookup(&[("GROQ_API_KEYS", " , ")])).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }

    #[test]
    fn rejects_bad_numbers() {
        let err = ScoutConfig::from_lookup(lookup(&[
            ("GROQ_API_KEYS", "k"),
            ("SCOUT_LLM_TIMEOUT_SECS", "0"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("at least 1"));

        let err = ScoutConfig::from_lookup(lookup(&[
            ("GROQ_API_KEYS", "k"),
            ("SCOUT_SERVER_PORT", "99999"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("SCOUT_SERVER_PORT"));
    }

    #[test]
    fn overrides_applied() {
        let cfg = ScoutConfig::from_lookup(lookup(&[
            ("GROQ_API_KEYS", "k"),
            ("SCOUT_MODEL", "gpt-4o-mini"),
            ("SCOUT_KEY_COOLDOWN_MINUTES", "1"),
        ]))
        .unwrap();
        assert_eq!(cfg.model, "gpt-4o-mini");
        assert_eq!(cfg.key_cooldown, Duration::from_secs(60));
    }
}
