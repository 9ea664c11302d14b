//! Plugin loading error types.

use std::time::Duration;

use thiserror::Error;

/// Result type for plugin operations.
pub type PluginResult<T> = Result<T, PluginError>;

/// Errors that can occur while resolving and loading plugins.
#[derive(Debug, Error)]
pub enum PluginError {
    /// The plugin URL could not be parsed or resolved.
    #[error("Invalid plugin URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The plugin URL uses a scheme other than http or https.
    ///
    /// `scheme` carries the trailing colon, e.g. `ftp:`.
    #[error("cannot load plugins using protocol \"{scheme}\"")]
    Protocol { scheme: String },

    /// No script loading mechanism is available in the host.
    #[error("cannot figure out how to load external scripts in this environment")]
    EnvironmentUnsupported,

    /// Fetching or executing a plugin artifact failed.
    #[error("Failed to load {url}: {reason}")]
    ScriptLoad { url: String, reason: String },

    /// A script executed but did not register its plugin.
    #[error(
        "Plugin '{name}' did not register itself after loading {url}: expected global property \"{key}\""
    )]
    NotRegistered { name: String, key: String, url: String },

    /// A module resolved without a usable default constructor.
    #[error("Plugin module at {url} is malformed: {reason}")]
    Shape { url: String, reason: String },

    /// Global-convention loading needs a plugin name.
    #[error("Plugin at {url} has no name; global-convention loading requires one")]
    MissingName { url: String },

    /// Resolution exceeded the configured per-plugin timeout.
    #[error("Plugin at {url} timed out after {limit:?}")]
    Timeout { url: String, limit: Duration },

    /// The artifact digest did not match the declared integrity value.
    #[error("Integrity check failed for {url}: expected {expected}, got {actual}")]
    Integrity { url: String, expected: String, actual: String },

    /// Invalid plugin artifact.
    #[error("Invalid plugin manifest: {0}")]
    InvalidManifest(String),

    /// Plugin version incompatible.
    #[error("Plugin '{name}' requires API version {required}, but host provides {available}")]
    IncompatibleVersion { name: String, required: String, available: String },

    /// Two loaded plugins share a name.
    #[error("Plugin '{0}' is already registered")]
    AlreadyRegistered(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PluginError {
    /// Build a script load error for a URL.
    pub fn script_load(url: impl ToString, reason: impl ToString) -> Self {
        Self::ScriptLoad { url: url.to_string(), reason: reason.to_string() }
    }

    /// Whether retrying the same reference could succeed.
    ///
    /// Protocol, shape and registration failures are properties of the
    /// reference or the artifact and never heal on their own.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ScriptLoad { .. } | Self::Timeout { .. })
    }
}
