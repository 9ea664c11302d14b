//! Configuration management for Plugload.
//!
//! Handles loading configuration from TOML files.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::RetryConfig;
use crate::plugin::{PluginReference, ProtocolPolicy, ResolutionStrategy};

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Loader settings
    pub loader: LoaderSettings,

    /// Host environment settings
    pub environment: EnvironmentSettings,

    /// Retry settings for transient load failures
    pub retry: RetrySettings,

    /// Plugins to load
    pub plugins: Vec<PluginReference>,
}

/// How plugins are resolved and loaded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderSettings {
    /// Resolution strategy (module, global-convention)
    pub strategy: ResolutionStrategy,

    /// URL scheme policy for global-convention loading (strict, allow-schemeless)
    pub protocol_policy: ProtocolPolicy,

    /// Base URL that scheme-less plugin URLs resolve against
    pub base_url: Option<String>,

    /// Maximum number of plugins resolved at once (unbounded when unset)
    pub max_concurrency: Option<usize>,

    /// Per-plugin resolution timeout in seconds
    pub timeout_secs: Option<u64>,
}

/// Which script loaders the host offers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentSettings {
    /// Document-style asynchronous script loading
    pub dom: bool,

    /// Worker-style synchronous script loading
    pub worker: bool,

    /// User agent sent with artifact requests
    pub user_agent: String,

    /// HTTP request timeout in seconds
    pub http_timeout_secs: u64,
}

impl Default for EnvironmentSettings {
    fn default() -> Self {
        Self {
            dom: true,
            worker: false,
            user_agent: format!("{}/{}", crate::APP_NAME, crate::VERSION),
            http_timeout_secs: 30,
        }
    }
}

/// Retry behavior for retryable load failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Retries after the first attempt (0 disables retrying)
    pub max_attempts: u32,

    /// Delay before the first retry, in milliseconds
    pub initial_delay_ms: u64,

    /// Upper bound on the delay between retries, in milliseconds
    pub max_delay_ms: u64,

    /// Multiplier applied to the delay after each retry
    pub backoff_multiplier: f64,

    /// Whether to add jitter to delays
    pub jitter: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetrySettings {
    /// Convert to a retry configuration.
    pub fn to_retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            backoff_multiplier: self.backoff_multiplier,
            jitter: self.jitter,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Looks for config in:
    /// 1. `.plugload.toml` in current directory
    /// 2. `~/.config/plugload/config.toml`
    /// 3. Falls back to defaults
    pub fn load() -> anyhow::Result<Self> {
        match Self::find_file() {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// The file `load` reads, in lookup order, if any exists.
    pub fn find_file() -> Option<PathBuf> {
        let local_config = PathBuf::from(".plugload.toml");
        if local_config.exists() {
            return Some(local_config);
        }

        Self::config_dir().map(|dir| dir.join("config.toml")).filter(|path| path.exists())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        tracing::debug!(path = %path.display(), plugins = config.plugins.len(), "Loaded config");
        Ok(config)
    }

    /// Get the config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(crate::APP_NAME))
    }
}
