use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use serde::Deserialize;
use serde_json::Value;

use crate::client::{ApiRequest, ClientSettings, DEFAULT_TIMEOUT, Method};
use crate::policy::{Expectation, StatusPolicy};

/// Connection settings for the remote API.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            username: None,
            password: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ServerConfig {
    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            base_url: self.base_url.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

/// Availability polling done once before any check runs.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WaitConfig {
    #[serde(default = "default_health_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_delay_secs")]
    pub delay_secs: u64,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            endpoint: default_health_endpoint(),
            max_attempts: default_max_attempts(),
            delay_secs: default_delay_secs(),
        }
    }
}

/// One configured remote call.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckConfig {
    pub name: String,
    pub endpoint: String,
    #[serde(default)]
    pub method: Method,
    /// Query parameters; non-string values are sent in their JSON text form.
    #[serde(default)]
    pub params: BTreeMap<String, Value>,
    #[serde(default)]
    pub body: Option<Value>,
    /// Overrides the suite's expectation.
    #[serde(default)]
    pub expect: Option<Expectation>,
}

impl CheckConfig {
    pub fn request(&self) -> ApiRequest {
        ApiRequest {
            method: self.method,
            endpoint: self.endpoint.clone(),
            body: self.body.clone(),
            query: self
                .params
                .iter()
                .map(|(k, v)| (k.clone(), param_text(v)))
                .collect(),
        }
    }
}

fn param_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// A named group of checks, typically one server controller.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SuiteConfig {
    /// Short selector used on the command line (e.g. "core").
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub expect: Expectation,
    #[serde(default)]
    pub tolerate_messages: Vec<String>,
    #[serde(default, rename = "check")]
    pub checks: Vec<CheckConfig>,
}

impl SuiteConfig {
    pub fn policy_for(&self, check: &CheckConfig) -> StatusPolicy {
        StatusPolicy::new(check.expect.unwrap_or(self.expect)).tolerating(&self.tolerate_messages)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub wait: WaitConfig,
    #[serde(default, rename = "suite")]
    pub suites: Vec<SuiteConfig>,
}

impl Config {
    /// Check cross-field constraints serde cannot express.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.base_url.trim().is_empty() {
            bail!("server.base_url must not be empty");
        }
        if self.wait.max_attempts == 0 {
            bail!("wait.max_attempts must be at least 1");
        }
        if !self.wait.endpoint.starts_with('/') {
            bail!("wait.endpoint '{}' must start with '/'", self.wait.endpoint);
        }
        if self.suites.is_empty() {
            bail!("No suites configured");
        }

        let mut keys = HashSet::new();
        for suite in &self.suites {
            if suite.key.trim().is_empty() {
                bail!("Suite '{}' has an empty key", suite.name);
            }
            if !keys.insert(suite.key.as_str()) {
                bail!("Duplicate suite key '{}'", suite.key);
            }
            for check in &suite.checks {
                if !check.endpoint.starts_with('/') {
                    bail!(
                        "Check '{}' in suite '{}': endpoint '{}' must start with '/'",
                        check.name,
                        suite.key,
                        check.endpoint
                    );
                }
            }
        }
        Ok(())
    }

    pub fn suite_keys(&self) -> Vec<&str> {
        self.suites.iter().map(|s| s.key.as_str()).collect()
    }
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> anyhow::Result<Config> {
    let config: Config = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Load suite configuration from a TOML file.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Failed to parse config: {}", path.display()))
}

/// Returns the default path to `config/suites.toml` relative to the current directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("config/suites.toml")
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

fn default_health_endpoint() -> String {
    "/actuator/health".to_string()
}

fn default_max_attempts() -> u32 {
    30
}

fn default_delay_secs() -> u64 {
    2
}
