//! Plugin artifact parsing and validation.
//!
//! A plugin artifact is a TOML document describing a declarative plugin:
//! its metadata, the host modules it needs, the elements it contributes and
//! its configuration slots.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{ElementType, PluginError, PluginResult};

/// Plugin names end up in registry keys, so they must be identifiers.
static PLUGIN_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid plugin name pattern"));

/// A parsed plugin artifact.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Plugin metadata. Absent for artifacts that only export values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<PluginMetadata>,
    /// Elements contributed by the plugin.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contributes: Vec<ElementType>,
    /// Configuration slots with their default values.
    #[serde(default, skip_serializing_if = "toml::Table::is_empty")]
    pub configuration: toml::Table,
    /// Named value exports (module evaluation only).
    #[serde(default, skip_serializing_if = "toml::Table::is_empty")]
    pub exports: toml::Table,
}

/// Plugin metadata section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginMetadata {
    /// Plugin name (unique identifier).
    pub name: String,
    /// Plugin version (semver).
    pub version: String,
    /// Plugin API version the artifact targets.
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Plugin description.
    #[serde(default)]
    pub description: Option<String>,
    /// Plugin author.
    #[serde(default)]
    pub author: Option<String>,
    /// Plugin license.
    #[serde(default)]
    pub license: Option<String>,
    /// Host capability modules the plugin uses.
    #[serde(default)]
    pub requires: Vec<String>,
}

fn default_api_version() -> String {
    super::PLUGIN_API_VERSION.to_string()
}

impl PluginManifest {
    /// Parse an artifact from TOML.
    pub fn from_toml(content: &str) -> PluginResult<Self> {
        toml::from_str(content).map_err(|e| PluginError::InvalidManifest(e.to_string()))
    }

    /// Serialize to TOML string.
    pub fn to_toml(&self) -> PluginResult<String> {
        toml::to_string_pretty(self).map_err(|e| PluginError::InvalidManifest(e.to_string()))
    }

    /// Validate the artifact against the host API version.
    pub fn validate(&self, host_api_version: &str) -> PluginResult<()> {
        let Some(plugin) = &self.plugin else {
            return Ok(());
        };

        if plugin.name.is_empty() {
            return Err(PluginError::InvalidManifest("Plugin name is required".to_string()));
        }

        if !PLUGIN_NAME.is_match(&plugin.name) {
            return Err(PluginError::InvalidManifest(format!(
                "Plugin name '{}' must start with a letter or underscore and contain only letters, digits, and underscores",
                plugin.name
            )));
        }

        let version_parts: Vec<&str> = plugin.version.split('.').collect();
        if version_parts.len() < 2 || version_parts.iter().any(|p| p.parse::<u32>().is_err()) {
            return Err(PluginError::InvalidManifest(format!(
                "Version '{}' must be in semver format (e.g., 1.0.0)",
                plugin.version
            )));
        }

        let mut seen = std::collections::HashSet::new();
        for element in &self.contributes {
            if element.name.is_empty() {
                return Err(PluginError::InvalidManifest(format!(
                    "{} contributed by '{}' has an empty name",
                    element.kind, plugin.name
                )));
            }
            if !seen.insert((element.kind, element.name.as_str())) {
                return Err(PluginError::InvalidManifest(format!(
                    "{} '{}' is contributed twice",
                    element.kind, element.name
                )));
            }
        }

        if !plugin.is_compatible_with(host_api_version) {
            return Err(PluginError::IncompatibleVersion {
                name: plugin.name.clone(),
                required: plugin.api_version.clone(),
                available: host_api_version.to_string(),
            });
        }

        Ok(())
    }
}

impl PluginMetadata {
    /// Check if this plugin is compatible with the given host API version.
    pub fn is_compatible_with(&self, host_api_version: &str) -> bool {
        let required: Vec<u32> =
            self.api_version.split('.').filter_map(|s| s.parse().ok()).collect();
        let available: Vec<u32> =
            host_api_version.split('.').filter_map(|s| s.parse().ok()).collect();

        if required.is_empty() || available.is_empty() {
            return false;
        }

        // Major version must match, and available minor must be >= required
        required[0] == available[0]
            && (available.len() < 2 || required.len() < 2 || available[1] >= required[1])
    }
}
