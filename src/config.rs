//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::ai::{GeminiConfig, DEFAULT_MODEL};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Largest accepted request body (uploads included)
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_max_upload_mb() -> usize {
    100
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_mb: default_max_upload_mb(),
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn body_limit_bytes(&self) -> usize {
        self.max_upload_mb * 1024 * 1024
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `sqlite://path`, `sqlite::memory:` or a bare file path
    #[serde(default = "default_database_url")]
    pub url: String,
}

fn default_database_url() -> String {
    "sqlite://./fixit.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

/// Hosted model configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Left empty in files; normally supplied through `GEMINI_API_KEY`
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_model_name")]
    pub name: String,

    #[serde(default = "default_model_base_url")]
    pub base_url: String,

    #[serde(default = "default_model_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_model_retries")]
    pub max_retries: u32,

    #[serde(default = "default_media_wait")]
    pub media_max_wait_secs: u64,
}

fn default_model_name() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_model_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_model_timeout() -> u64 {
    120
}

fn default_model_retries() -> u32 {
    3
}

fn default_media_wait() -> u64 {
    300 // 5 minutes
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            name: default_model_name(),
            base_url: default_model_base_url(),
            request_timeout_secs: default_model_timeout(),
            max_retries: default_model_retries(),
            media_max_wait_secs: default_media_wait(),
        }
    }
}

impl ModelConfig {
    /// Whether a non-empty API key is present
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().map_or(false, |k| !k.trim().is_empty())
    }

    pub fn to_gemini_config(&self) -> GeminiConfig {
        GeminiConfig {
            api_key: self.api_key.clone().filter(|k| !k.trim().is_empty()),
            model: self.name.clone(),
            base_url: self.base_url.trim_end_matches('/').to_string(),
            request_timeout_ms: self.request_timeout_secs * 1000,
            max_retries: self.max_retries,
            media_max_wait_secs: self.media_max_wait_secs,
            ..GeminiConfig::default()
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        for path in default_paths() {
            if path.exists() {
                match Self::load_with_env(&path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        // Server overrides
        if let Some(host) = var("FIXIT_HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("FIXIT_PORT") {
            match port.parse() {
                Ok(p) => self.server.port = p,
                Err(_) => tracing::warn!("Ignoring invalid FIXIT_PORT {:?}", port),
            }
        }

        // Database overrides
        if let Some(url) = var("DATABASE_URL") {
            self.database.url = url;
        }

        // Model overrides
        if let Some(key) = var("GEMINI_API_KEY") {
            self.model.api_key = Some(key);
        }
        if let Some(name) = var("GEMINI_MODEL") {
            self.model.name = name;
        }

        // Logging overrides
        if let Some(level) = var("FIXIT_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("FIXIT_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Config file search order
pub fn default_paths() -> Vec<PathBuf> {
    [
        dirs::config_dir().map(|p| p.join("fixit").join("config.toml")),
        Some(PathBuf::from("/etc/fixit/config.toml")),
        Some(PathBuf::from("./config.toml")),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Fix-It Configuration
#
# Environment variables override these settings (a .env file is read too):
# - FIXIT_HOST
# - FIXIT_PORT
# - DATABASE_URL
# - GEMINI_API_KEY
# - GEMINI_MODEL
# - FIXIT_LOG_LEVEL
# - FIXIT_LOG_FORMAT

[server]
# API server host
host = "0.0.0.0"

# API server port
port = 8000

# Largest accepted upload (MB)
max_upload_mb = 100

[database]
# SQLite database: sqlite://path, sqlite::memory: or a plain file path
url = "sqlite://./fixit.db"

[model]
# Prefer setting GEMINI_API_KEY in the environment
# api_key = ""

# Model used for triage, diagnosis and video audits
name = "gemini-2.0-flash"

base_url = "https://generativelanguage.googleapis.com"

# Per-request timeout in seconds
request_timeout_secs = 120

# Attempts for rate-limited or failed requests
max_retries = 3

# How long to wait for an uploaded video to finish processing (seconds)
media_max_wait_secs = 300

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_generated_config_parses_to_defaults() {
        let config = Config::parse(&generate_default_config()).unwrap();
        let defaults = Config::default();

        assert_eq!(config.server.addr(), defaults.server.addr());
        assert_eq!(config.server.max_upload_mb, 100);
        assert_eq!(config.database.url, defaults.database.url);
        assert_eq!(config.model.name, DEFAULT_MODEL);
        assert!(!config.model.is_configured());
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::parse("[server]\nport = 9100\n").unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.model.max_retries, 3);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("FIXIT_PORT", "8123"),
            ("DATABASE_URL", "sqlite::memory:"),
            ("GEMINI_API_KEY", "secret"),
            ("GEMINI_MODEL", "gemini-1.5-pro"),
            ("FIXIT_LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.server.port, 8123);
        assert_eq!(config.database.url, "sqlite::memory:");
        assert!(config.model.is_configured());
        assert_eq!(config.model.name, "gemini-1.5-pro");
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_invalid_port_override_is_ignored() {
        let mut config = Config::default();
        config.apply_overrides(|k| (k == "FIXIT_PORT").then(|| "not-a-port".to_string()));
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_gemini_config_conversion() {
        let mut model = ModelConfig::default();
        model.api_key = Some("  ".to_string());
        model.base_url = "http://localhost:9999/".to_string();

        let gemini = model.to_gemini_config();
        assert!(gemini.api_key.is_none());
        assert_eq!(gemini.base_url, "http://localhost:9999");
        assert_eq!(gemini.request_timeout_ms, 120_000);
    }

    #[test]
    fn test_load_reports_path_on_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server\nport = ").unwrap();

        match Config::load(&path) {
            Err(ConfigError::Parse { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected parse error, got {:?}", other),
        }
    }
}
