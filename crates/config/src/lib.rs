//! Configuration loading and validation for braincast.
//!
//! Loads a TOML file with environment variable overrides and validates
//! all settings at startup. Every knob the orchestrator, sanitizer, and
//! gateway use is set here — nothing is hard-coded at call sites.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// The root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Model backend settings
    #[serde(default)]
    pub backend: BackendConfig,

    /// Circuit breakers for the agent loop
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Tool output sanitization
    #[serde(default)]
    pub sanitizer: SanitizerConfig,

    /// HTTP gateway settings
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Settings for the model backend adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the OpenAI-compatible endpoint
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key; usually supplied via `BRAINCAST_API_KEY`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Bound on each network round-trip to the backend
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// The two independent circuit breakers bounding a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Per-request tool call budget
    #[serde(default = "default_max_tool_calls")]
    pub max_tool_calls: u32,

    /// Cap on model-call iterations per request
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_tool_calls: default_max_tool_calls(),
            max_iterations: default_max_iterations(),
        }
    }
}

/// Caps applied to tool output before it reaches a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SanitizerConfig {
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Cap for top-level strings
    #[serde(default = "default_max_string_len")]
    pub max_string_len: usize,

    /// Cap for strings nested inside arrays/objects
    #[serde(default = "default_max_nested_string_len")]
    pub max_nested_string_len: usize,

    #[serde(default = "default_max_array_items")]
    pub max_array_items: usize,

    /// Case-insensitive substrings that mark a key as sensitive
    #[serde(default = "default_sensitive_keys")]
    pub sensitive_keys: Vec<String>,
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_string_len: default_max_string_len(),
            max_nested_string_len: default_max_nested_string_len(),
            max_array_items: default_max_array_items(),
            sensitive_keys: default_sensitive_keys(),
        }
    }
}

/// HTTP gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Name reported in the `final` payload's `agent` field
    #[serde(default = "default_agent_name")]
    pub agent_name: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            agent_name: default_agent_name(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_request_timeout() -> u64 {
    120
}
fn default_max_tool_calls() -> u32 {
    16
}
fn default_max_iterations() -> u32 {
    8
}
fn default_max_depth() -> usize {
    10
}
fn default_max_string_len() -> usize {
    500
}
fn default_max_nested_string_len() -> usize {
    300
}
fn default_max_array_items() -> usize {
    10
}
fn default_sensitive_keys() -> Vec<String> {
    [
        "password",
        "secret",
        "token",
        "credential",
        "api_key",
        "authorization",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8080
}
fn default_agent_name() -> String {
    "braincast".into()
}

impl AppConfig {
    /// Load configuration from a TOML file, then apply env overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let mut config: AppConfig = toml::from_str(&raw)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus env overrides — used when no config file is given.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = AppConfig::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("BRAINCAST_API_KEY")
            && !key.is_empty()
        {
            self.backend.api_key = Some(key);
        }
        if let Ok(url) = std::env::var("BRAINCAST_BASE_URL")
            && !url.is_empty()
        {
            self.backend.base_url = url;
        }
        if let Ok(model) = std::env::var("BRAINCAST_MODEL")
            && !model.is_empty()
        {
            self.backend.model = model;
        }
    }

    /// Validate settings; called once at startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend.base_url.is_empty() {
            return Err(ConfigError::Invalid("backend.base_url is empty".into()));
        }
        if !(0.0..=2.0).contains(&self.backend.temperature) {
            return Err(ConfigError::Invalid(format!(
                "backend.temperature must be in [0.0, 2.0], got {}",
                self.backend.temperature
            )));
        }
        if self.limits.max_tool_calls == 0 {
            return Err(ConfigError::Invalid(
                "limits.max_tool_calls must be at least 1".into(),
            ));
        }
        if self.limits.max_iterations == 0 {
            return Err(ConfigError::Invalid(
                "limits.max_iterations must be at least 1".into(),
            ));
        }
        if self.sanitizer.max_depth == 0 {
            return Err(ConfigError::Invalid(
                "sanitizer.max_depth must be at least 1".into(),
            ));
        }
        if self.gateway.port == 0 {
            return Err(ConfigError::Invalid("gateway.port must be nonzero".into()));
        }
        Ok(())
    }
}
