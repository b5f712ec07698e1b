use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Application configuration loaded from environment variables.
/// Without an API key the service runs on the local fallback path only.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: Option<String>,
    pub port: u16,
    pub rust_log: String,
    pub ai_timeout_secs: u64,
    /// TOML file overriding the built-in reference tables.
    pub reference_data_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let ai_timeout_secs = match non_empty("AI_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .context("AI_TIMEOUT_SECS must be a whole number of seconds")?,
            None => 5,
        };
        if ai_timeout_secs == 0 {
            bail!("AI_TIMEOUT_SECS must be greater than zero");
        }

        Ok(Config {
            anthropic_api_key: non_empty("ANTHROPIC_API_KEY"),
            port: non_empty("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: non_empty("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            ai_timeout_secs,
            reference_data_path: non_empty("REFERENCE_DATA_PATH").map(PathBuf::from),
        })
    }

    pub fn ai_timeout(&self) -> Duration {
        Duration::from_secs(self.ai_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let c = config(&[]).unwrap();
        assert_eq!(c.anthropic_api_key, None);
        assert_eq!(c.port, 8080);
        assert_eq!(c.rust_log, "info");
        assert_eq!(c.ai_timeout(), Duration::from_secs(5));
        assert_eq!(c.reference_data_path, None);
    }

    #[test]
    fn test_overrides() {
        let c = config(&[
            ("ANTHROPIC_API_KEY", "sk-ant-test"),
            ("PORT", "9090"),
            ("RUST_LOG", "debug"),
            ("AI_TIMEOUT_SECS", "12"),
            ("REFERENCE_DATA_PATH", "/etc/bid-assessor/reference.toml"),
        ])
        .unwrap();
        assert_eq!(c.anthropic_api_key.as_deref(), Some("sk-ant-test"));
        assert_eq!(c.port, 9090);
        assert_eq!(c.rust_log, "debug");
        assert_eq!(c.ai_timeout_secs, 12);
        assert_eq!(
            c.reference_data_path,
            Some(PathBuf::from("/etc/bid-assessor/reference.toml"))
        );
    }

    #[test]
    fn test_blank_api_key_means_fallback_only() {
        let c = config(&[("ANTHROPIC_API_KEY", "  ")]).unwrap();
        assert_eq!(c.anthropic_api_key, None);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = config(&[("AI_TIMEOUT_SECS", "0")]).unwrap_err();
        assert!(err.to_string().contains("greater than zero"));
    }

    #[test]
    fn test_invalid_port_rejected() {
        assert!(config(&[("PORT", "http")]).is_err());
        assert!(config(&[("AI_TIMEOUT_SECS", "soon")]).is_err());
    }
}
