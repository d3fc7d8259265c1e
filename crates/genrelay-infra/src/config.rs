//! Application configuration loader.
//!
//! Reads a TOML config file (path from `GENRELAY_CONFIG`, default
//! `config.toml` in the working directory) and deserializes it into
//! [`AppConfig`]. Falls back to sensible defaults when the file is missing
//! or malformed. The gateway API key never lives in the file; it comes from
//! the `GENRELAY_API_KEY` environment variable.

use std::path::Path;

use serde::Deserialize;

use super::sqlite::pool::default_database_url;

/// Environment variable naming the config file path.
pub const CONFIG_PATH_ENV: &str = "GENRELAY_CONFIG";

/// Top-level application configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// SQLite database URL.
    pub database_url: String,
    pub gateway: GatewayConfig,
    pub limits: LimitsConfig,
    pub triggers: TriggerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            gateway: GatewayConfig::default(),
            limits: LimitsConfig::default(),
            triggers: TriggerConfig::default(),
        }
    }
}

/// Generation gateway endpoint settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub base_url: String,
    pub text_model: String,
    pub art_model: String,
    /// Per-call deadline in seconds.
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8085".to_string(),
            text_model: "relay-text".to_string(),
            art_model: "relay-art".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Admission and retry limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Sustained request rate towards the backend, per second.
    pub rate_per_sec: f64,
    /// Maximum simultaneous backend calls.
    pub concurrent: usize,
    /// Attempts per generation call, including the first.
    pub retry_attempts: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            rate_per_sec: 1.0,
            concurrent: 2,
            retry_attempts: 3,
        }
    }
}

/// Trigger and ignore word lists for the intent classifier.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    pub text_prefixes: Vec<String>,
    pub art_prefixes: Vec<String>,
    pub ignore_prefixes: Vec<String>,
    pub ignore_postfixes: Vec<String>,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            text_prefixes: vec!["bot,".to_string(), "/gen".to_string()],
            art_prefixes: vec!["bot, draw".to_string(), "/art".to_string()],
            ignore_prefixes: Vec::new(),
            ignore_postfixes: Vec::new(),
        }
    }
}

/// Load configuration from `path`.
///
/// - If the file does not exist, returns [`AppConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the
///   default.
pub async fn load_config(path: &Path) -> AppConfig {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return AppConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", path.display());
            return AppConfig::default();
        }
    };

    match toml::from_str::<AppConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("Failed to parse {}: {err}, using defaults", path.display());
            AppConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_returns_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join("config.toml")).await;
        assert_eq!(config.limits.rate_per_sec, 1.0);
        assert_eq!(config.limits.retry_attempts, 3);
        assert_eq!(config.gateway.timeout_secs, 60);
        assert!(!config.triggers.text_prefixes.is_empty());
    }

    #[tokio::test]
    async fn valid_toml_is_parsed() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        tokio::fs::write(
            &path,
            r##"
database_url = "sqlite:///tmp/relay.db"

[gateway]
base_url = "https://gateway.example.com"
timeout_secs = 90

[limits]
rate_per_sec = 0.5
concurrent = 4

[triggers]
text_prefixes = ["relay,"]
art_prefixes = ["relay, draw"]
ignore_prefixes = ["#mute"]
"##,
        )
        .await
        .unwrap();

        let config = load_config(&path).await;
        assert_eq!(config.database_url, "sqlite:///tmp/relay.db");
        assert_eq!(config.gateway.base_url, "https://gateway.example.com");
        assert_eq!(config.gateway.timeout_secs, 90);
        // Unset fields inside a present section keep their defaults.
        assert_eq!(config.gateway.text_model, "relay-text");
        assert_eq!(config.limits.rate_per_sec, 0.5);
        assert_eq!(config.limits.concurrent, 4);
        assert_eq!(config.limits.retry_attempts, 3);
        assert_eq!(config.triggers.text_prefixes, vec!["relay,".to_string()]);
        assert_eq!(config.triggers.ignore_prefixes, vec!["#mute".to_string()]);
    }

    #[tokio::test]
    async fn invalid_toml_returns_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        tokio::fs::write(&path, "not { valid toml !!!").await.unwrap();

        let config = load_config(&path).await;
        assert_eq!(config.limits.concurrent, 2);
    }
}
