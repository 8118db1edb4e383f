//! Configuration loading, validation, and management for Master Mind.
//!
//! Loads configuration from `~/.mastermind/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.mastermind/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Memory Store connection
    #[serde(default)]
    pub memory: MemoryStoreConfig,

    /// Completion Service connection
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Pipeline request defaults
    #[serde(default)]
    pub enhancement: EnhancementConfig,

    /// HTTP gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct MemoryStoreConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_memory_url")]
    pub api_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    #[serde(default = "default_memory_timeout")]
    pub timeout_secs: u64,
}

fn default_memory_url() -> String {
    "https://api.mem0.ai".into()
}
fn default_memory_timeout() -> u64 {
    30
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_memory_url(),
            org_id: None,
            project_id: None,
            timeout_secs: default_memory_timeout(),
        }
    }
}

impl std::fmt::Debug for MemoryStoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStoreConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("org_id", &self.org_id)
            .field("project_id", &self.project_id)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_completion_url")]
    pub api_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_completion_timeout")]
    pub timeout_secs: u64,
}

fn default_completion_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_completion_timeout() -> u64 {
    60
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_completion_url(),
            model: default_model(),
            timeout_secs: default_completion_timeout(),
        }
    }
}

impl std::fmt::Debug for CompletionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancementConfig {
    /// Memories requested per search when the caller does not say
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Largest limit a caller may request
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
}

fn default_limit() -> usize {
    5
}
fn default_max_limit() -> usize {
    20
}

impl Default for EnhancementConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// CORS origins are allowed when they start with one of these
    #[serde(default = "default_origin_prefixes")]
    pub allowed_origin_prefixes: Vec<String>,

    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_port() -> u16 {
    8000
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_origin_prefixes() -> Vec<String> {
    vec!["chrome-extension://".into()]
}
fn default_max_body_bytes() -> usize {
    1024 * 1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            allowed_origin_prefixes: default_origin_prefixes(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.mastermind/config.toml).
    ///
    /// Environment variables take precedence over the file:
    /// - `MEM0_API_KEY`, `MEM0_API_URL`
    /// - `OPENAI_API_KEY`, `MASTERMIND_MODEL`
    /// - `MASTERMIND_HOST`, `MASTERMIND_PORT`
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_env(&Self::config_dir().join("config.toml"))
    }

    /// Load from a specific file, then apply environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("MEM0_API_KEY").filter(|k| !k.is_empty()) {
            self.memory.api_key = Some(key);
        }
        if let Some(url) = lookup("MEM0_API_URL") {
            self.memory.api_url = url;
        }
        if let Some(key) = lookup("OPENAI_API_KEY").filter(|k| !k.is_empty()) {
            self.completion.api_key = Some(key);
        }
        if let Some(model) = lookup("MASTERMIND_MODEL") {
            self.completion.model = model;
        }
        if let Some(host) = lookup("MASTERMIND_HOST") {
            self.gateway.host = host;
        }
        if let Some(port) = lookup("MASTERMIND_PORT") {
            self.gateway.port = port.parse().map_err(|_| {
                ConfigError::ValidationError(format!("MASTERMIND_PORT is not a port: {port}"))
            })?;
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".mastermind")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.enhancement.default_limit == 0 || self.enhancement.max_limit == 0 {
            return Err(ConfigError::ValidationError(
                "enhancement limits must be at least 1".into(),
            ));
        }

        if self.enhancement.default_limit > self.enhancement.max_limit {
            return Err(ConfigError::ValidationError(
                "enhancement.default_limit must not exceed enhancement.max_limit".into(),
            ));
        }

        if self.memory.timeout_secs == 0 || self.completion.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "timeout_secs must be > 0".into(),
            ));
        }

        if self.completion.model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "completion.model must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// The Memory Store key, or the credential error that makes startup fatal.
    pub fn require_memory_key(&self) -> Result<&str, ConfigError> {
        self.memory
            .api_key
            .as_deref()
            .ok_or(ConfigError::MissingCredential("MEM0_API_KEY"))
    }

    /// The Completion Service key, or the credential error that makes startup fatal.
    pub fn require_completion_key(&self) -> Result<&str, ConfigError> {
        self.completion
            .api_key
            .as_deref()
            .ok_or(ConfigError::MissingCredential("OPENAI_API_KEY"))
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("Missing credential: set {0} or add it to config.toml")]
    MissingCredential(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.gateway.port, 8000);
        assert_eq!(config.completion.model, "gpt-4o-mini");
        assert_eq!(config.enhancement.default_limit, 5);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.memory.api_url, config.memory.api_url);
        assert_eq!(parsed.gateway.port, config.gateway.port);
    }

    #[test]
    fn default_exceeding_max_rejected() {
        let mut config = AppConfig::default();
        config.enhancement.default_limit = 50;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.memory.api_url, "https://api.mem0.ai");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[completion]\nmodel = \"gpt-4o\"\n\n[gateway]\nport = 9100\n",
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.completion.model, "gpt-4o");
        assert_eq!(config.completion.api_url, "https://api.openai.com/v1");
        assert_eq!(config.gateway.port, 9100);
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[gateway\nport = ").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn env_overrides_file_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("MEM0_API_KEY", "m0-key"),
            ("OPENAI_API_KEY", "sk-test"),
            ("MASTERMIND_PORT", "9000"),
        ]);
        let mut config = AppConfig::default();
        config
            .apply_env(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.require_memory_key().unwrap(), "m0-key");
        assert_eq!(config.require_completion_key().unwrap(), "sk-test");
        assert_eq!(config.gateway.port, 9000);
    }

    #[test]
    fn bad_port_in_env_rejected() {
        let mut config = AppConfig::default();
        let result = config.apply_env(|k| (k == "MASTERMIND_PORT").then(|| "eighty".to_string()));
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn missing_credentials_are_reported_by_name() {
        let config = AppConfig::default();
        let err = config.require_memory_key().unwrap_err();
        assert!(err.to_string().contains("MEM0_API_KEY"));
        let err = config.require_completion_key().unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn debug_output_redacts_keys() {
        let mut config = AppConfig::default();
        config.memory.api_key = Some("m0-secret".into());
        config.completion.api_key = Some("sk-secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("gpt-4o-mini"));
        assert!(toml_str.contains("chrome-extension://"));
    }
}
