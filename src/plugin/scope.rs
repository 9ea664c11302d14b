//! The global scope shared by the host and executed plugin scripts.

use std::sync::Arc;

use parking_lot::RwLock;

use super::{CapabilityBundle, PluginRegistry, EXPORTS_PROPERTY};

/// Global namespace a plugin script executes against.
///
/// Holds the capability bundle the host exposes and the registry scripts
/// register their plugins in.
#[derive(Debug, Default)]
pub struct GlobalScope {
    registry: PluginRegistry,
    exports: RwLock<Option<Arc<CapabilityBundle>>>,
}

impl GlobalScope {
    /// Create an empty scope with no capabilities installed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty scope behind an `Arc`.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// A scope for running one script: same capabilities, empty registry.
    pub fn execution_scope(&self) -> Arc<Self> {
        Arc::new(Self { registry: PluginRegistry::new(), exports: RwLock::new(self.exports()) })
    }

    /// Plugin registry for this scope.
    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// The installed capability bundle, if any.
    pub fn exports(&self) -> Option<Arc<CapabilityBundle>> {
        self.exports.read().clone()
    }

    /// Replace the capability bundle.
    pub fn set_exports(&self, bundle: CapabilityBundle) {
        *self.exports.write() = Some(Arc::new(bundle));
    }

    /// Names of the properties currently defined on the scope.
    pub fn property_names(&self) -> Vec<String> {
        let mut names = self.registry.keys();
        if self.exports.read().is_some() {
            names.push(EXPORTS_PROPERTY.to_string());
        }
        names.sort();
        names
    }
}
