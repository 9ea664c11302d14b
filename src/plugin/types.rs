//! Core plugin types.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::ConfigurationSchema;

/// Plugin API version provided by the host.
pub const PLUGIN_API_VERSION: &str = "0.1.0";

/// Prefix of the registry key a global-convention script registers under.
pub const GLOBAL_PLUGIN_PREFIX: &str = "JBrowsePlugin";

/// Name of the global property holding the host capability bundle.
pub const EXPORTS_PROPERTY: &str = "JBrowseExports";

/// Name of a module's default export.
pub const DEFAULT_EXPORT: &str = "default";

/// Registry key for a plugin loaded through the global convention.
pub fn global_key(name: &str) -> String {
    format!("{GLOBAL_PLUGIN_PREFIX}{name}")
}

/// Kind of element a plugin contributes to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ElementKind {
    /// Data adapter (PAF, BAM, ...).
    Adapter,
    /// Track type.
    TrackType,
    /// View type (dotplot, linear, ...).
    ViewType,
    /// Text search adapter.
    TextSearchAdapter,
    /// Display type.
    DisplayType,
    /// Widget.
    Widget,
}

impl ElementKind {
    /// Every element kind, in display order.
    pub const ALL: [Self; 6] = [
        Self::Adapter,
        Self::TrackType,
        Self::ViewType,
        Self::TextSearchAdapter,
        Self::DisplayType,
        Self::Widget,
    ];

    /// Get the display name for this element kind.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Adapter => "Adapter",
            Self::TrackType => "Track type",
            Self::ViewType => "View type",
            Self::TextSearchAdapter => "Text search adapter",
            Self::DisplayType => "Display type",
            Self::Widget => "Widget",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// A named element contributed by a plugin.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementType {
    /// Element kind.
    pub kind: ElementKind,
    /// Element name, unique within its kind.
    pub name: String,
}

/// Declarative reference to a remote plugin.
///
/// Only plain data lives here, so `Clone` is a full deep copy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PluginReference {
    /// Plugin name. Required by global-convention loading.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Artifact URL.
    pub url: String,
    /// Expected SHA-256 of the artifact (lowercase hex).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrity: Option<String>,
}

impl PluginReference {
    /// Create an unnamed reference.
    pub fn new(url: impl Into<String>) -> Self {
        Self { name: None, url: url.into(), integrity: None }
    }

    /// Create a named reference.
    pub fn named(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self { name: Some(name.into()), url: url.into(), integrity: None }
    }

    /// Attach an expected artifact digest.
    pub fn with_integrity(mut self, sha256: impl Into<String>) -> Self {
        self.integrity = Some(sha256.into());
        self
    }

    /// Registry key the plugin is expected to register under.
    pub fn global_key(&self) -> Option<String> {
        self.name.as_deref().map(global_key)
    }

    /// Name if present, otherwise the URL.
    pub fn display(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.url)
    }
}

/// A running plugin instance.
pub trait Plugin: Send + Sync {
    /// Plugin name.
    fn name(&self) -> &str;

    /// Plugin version.
    fn version(&self) -> &str;

    /// Elements this plugin contributes.
    fn element_types(&self) -> Vec<ElementType> {
        Vec::new()
    }

    /// Configuration schema, if the plugin is configurable.
    fn configuration_schema(&self) -> Option<ConfigurationSchema> {
        None
    }
}

type ConstructorFn = dyn Fn() -> Box<dyn Plugin> + Send + Sync;

/// Factory for plugin instances, produced by resolution.
#[derive(Clone)]
pub struct PluginConstructor {
    inner: Arc<ConstructorFn>,
}

impl PluginConstructor {
    /// Wrap a factory function.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Box<dyn Plugin> + Send + Sync + 'static,
    {
        Self { inner: Arc::new(factory) }
    }

    /// Create a new plugin instance.
    pub fn instantiate(&self) -> Box<dyn Plugin> {
        (self.inner)()
    }

    /// Whether two handles share the same factory.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for PluginConstructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PluginConstructor(..)")
    }
}

/// A resolved plugin, paired with the reference it came from.
#[derive(Debug, Clone)]
pub struct PluginRecord {
    /// Constructor for the plugin.
    pub constructor: PluginConstructor,
    /// The reference that was resolved.
    pub definition: PluginReference,
}
