use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::auth::{Credentials, Token};
use crate::jenkins::PollPolicy;
use crate::registry::{Environment, EnvironmentRegistry};

/// Configuration file structure for jj.
///
/// Holds the configured Jenkins environments, the name of the current one and
/// the timing settings used while waiting for builds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Name of the environment used when `-n` is not given
    pub current: Option<String>,

    /// Configured Jenkins instances, in the order they were added
    #[serde(default)]
    pub environments: IndexMap<String, EnvironmentConfig>,

    /// Polling and timeout settings
    #[serde(default)]
    pub settings: Settings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EnvironmentConfig {
    /// Jenkins base URL
    pub url: String,

    /// Jenkins user name
    pub username: String,

    /// Jenkins API token
    pub token: Token,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Settings {
    /// Timeout for each HTTP request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Delay between two polls of a queue item or build
    #[serde(default = "default_poll_interval_millis")]
    pub poll_interval_millis: u64,

    /// How long to wait for a queued build to get a number
    #[serde(default = "default_resolve_timeout_secs")]
    pub resolve_timeout_secs: u64,

    /// Consecutive network failures tolerated while polling
    #[serde(default = "default_max_transient_failures")]
    pub max_transient_failures: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
            poll_interval_millis: default_poll_interval_millis(),
            resolve_timeout_secs: default_resolve_timeout_secs(),
            max_transient_failures: default_max_transient_failures(),
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_poll_interval_millis() -> u64 {
    1000
}

fn default_resolve_timeout_secs() -> u64 {
    600
}

fn default_max_transient_failures() -> u32 {
    3
}

impl Settings {
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            poll_interval: Duration::from_millis(self.poll_interval_millis),
            resolve_timeout: Duration::from_secs(self.resolve_timeout_secs),
            max_transient_failures: self.max_transient_failures,
        }
    }
}

impl Config {
    /// Default location: `<config dir>/jj/config.toml`.
    pub fn default_path() -> Result<PathBuf> {
        let dir = dirs::config_dir().context("No configuration directory found")?;
        Ok(dir.join("jj").join("config.toml"))
    }

    /// Load configuration from a file.
    ///
    /// Returns the default (empty) configuration if the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        Self::load_from_path(path)
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => {
                // Try TOML first, then JSON, then YAML
                toml::from_str(&contents)
                    .or_else(|_| serde_json::from_str(&contents))
                    .or_else(|_| serde_yaml::from_str(&contents))
                    .with_context(|| format!("Failed to parse config file: {}", path.display()))
            }
        }
    }

    /// Save configuration to a file, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::to_string_pretty(self)?,
            Some("yaml") | Some("yml") => serde_yaml::to_string(self)?,
            _ => toml::to_string_pretty(self)?,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    pub fn registry(&self) -> Result<EnvironmentRegistry> {
        let environments = self
            .environments
            .iter()
            .map(|(name, env)| {
                Environment::new(
                    name.clone(),
                    &env.url,
                    Credentials::new(env.username.clone(), env.token.clone()),
                )
            })
            .collect::<crate::error::Result<Vec<_>>>()?;

        Ok(EnvironmentRegistry::from_environments(
            environments,
            self.current.as_deref(),
        ))
    }

    /// Replaces the persisted environments with the registry contents.
    pub fn store_registry(&mut self, registry: &EnvironmentRegistry) {
        self.current = registry.default_name().map(str::to_owned);
        self.environments = registry
            .environments()
            .map(|env| {
                (
                    env.name.clone(),
                    EnvironmentConfig {
                        url: env.url.to_string(),
                        username: env.credentials.username.clone(),
                        token: env.credentials.token.clone(),
                    },
                )
            })
            .collect();
    }
}
