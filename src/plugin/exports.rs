//! Host capabilities re-exported to dynamically loaded plugins.
//!
//! Plugins loaded through the global convention have no static link to the
//! host, so the host publishes the shared objects they need under the
//! `JBrowseExports` property of the scope. Plugins use these instead of
//! carrying their own copies, which keeps one identity per shared type.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::{ElementKind, GlobalScope, SchemaFactory, PLUGIN_API_VERSION};

/// A single exported capability.
pub type Capability = Arc<dyn Any + Send + Sync>;

/// Module exposing the plugin API description.
pub const PLUGIN_MODULE: &str = "@jbrowse/core/Plugin";
/// Module exposing the configuration schema factory.
pub const CONFIGURATION_MODULE: &str = "@jbrowse/core/configuration";
/// Module exposing the element kind catalog.
pub const ELEMENT_TYPES_MODULE: &str = "@jbrowse/core/pluggableElementTypes";
/// Module exposing the host version.
pub const VERSION_MODULE: &str = "@jbrowse/core/version";

/// Description of the plugin API the host implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PluginApi {
    /// Plugin API version.
    pub api_version: &'static str,
}

/// Every element kind a plugin may contribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementCatalog {
    /// Known kinds.
    pub kinds: &'static [ElementKind],
}

/// Version of the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostVersion(pub &'static str);

/// Mapping from module name to exported capability.
#[derive(Clone, Default)]
pub struct CapabilityBundle {
    modules: BTreeMap<&'static str, Capability>,
}

impl CapabilityBundle {
    /// Add or replace a module.
    pub fn insert<T: Any + Send + Sync>(&mut self, module: &'static str, value: T) {
        self.modules.insert(module, Arc::new(value));
    }

    /// Get a module's capability as a concrete type.
    pub fn get<T: Any>(&self, module: &str) -> Option<&T> {
        self.modules.get(module).and_then(|c| c.downcast_ref::<T>())
    }

    /// Whether the bundle exports `module`.
    pub fn contains(&self, module: &str) -> bool {
        self.modules.contains_key(module)
    }

    /// Exported module names, sorted.
    pub fn module_names(&self) -> Vec<&'static str> {
        self.modules.keys().copied().collect()
    }

    /// Number of exported modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether nothing is exported.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl fmt::Debug for CapabilityBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityBundle").field("modules", &self.module_names()).finish()
    }
}

/// Build the bundle from the static re-export table.
pub fn re_exports() -> CapabilityBundle {
    let mut bundle = CapabilityBundle::default();
    bundle.insert(PLUGIN_MODULE, PluginApi { api_version: PLUGIN_API_VERSION });
    bundle.insert(CONFIGURATION_MODULE, SchemaFactory);
    bundle.insert(ELEMENT_TYPES_MODULE, ElementCatalog { kinds: &ElementKind::ALL });
    bundle.insert(VERSION_MODULE, HostVersion(crate::VERSION));
    bundle
}

/// Install the host capability bundle on `target`.
///
/// Replaces whatever bundle was there, so repeated calls leave the same
/// contents as a single call.
pub fn install_global_capabilities(target: &GlobalScope) {
    let bundle = re_exports();
    tracing::debug!(modules = bundle.len(), "Installing host capability bundle");
    target.set_exports(bundle);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_re_export_table() {
        let bundle = re_exports();
        assert_eq!(
            bundle.module_names(),
            vec![PLUGIN_MODULE, CONFIGURATION_MODULE, ELEMENT_TYPES_MODULE, VERSION_MODULE]
        );

        let api = bundle.get::<PluginApi>(PLUGIN_MODULE).unwrap();
        assert_eq!(api.api_version, PLUGIN_API_VERSION);

        let catalog = bundle.get::<ElementCatalog>(ELEMENT_TYPES_MODULE).unwrap();
        assert!(catalog.kinds.contains(&ElementKind::Adapter));

        assert!(bundle.get::<SchemaFactory>(CONFIGURATION_MODULE).is_some());
    }

    #[test]
    fn test_get_wrong_type_is_none() {
        let bundle = re_exports();
        assert!(bundle.get::<HostVersion>(PLUGIN_MODULE).is_none());
        assert!(bundle.get::<HostVersion>("@jbrowse/core/missing").is_none());
    }

    #[test]
    fn test_install_is_idempotent() {
        let once = GlobalScope::new();
        install_global_capabilities(&once);

        let twice = GlobalScope::new();
        install_global_capabilities(&twice);
        install_global_capabilities(&twice);

        let a = once.exports().unwrap();
        let b = twice.exports().unwrap();
        assert_eq!(a.module_names(), b.module_names());
        assert_eq!(a.len(), b.len());
        assert_eq!(twice.property_names(), once.property_names());
    }

    #[test]
    fn test_install_replaces_stale_entries() {
        let scope = GlobalScope::new();
        let mut stale = CapabilityBundle::default();
        stale.insert("@legacy/module", HostVersion("0.0.1"));
        scope.set_exports(stale);

        install_global_capabilities(&scope);

        let exports = scope.exports().unwrap();
        assert!(!exports.contains("@legacy/module"));
        assert_eq!(exports.len(), re_exports().len());
    }
}
