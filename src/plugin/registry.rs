//! Registry that global-convention scripts register their plugins in.
//!
//! Executing a plugin script registers its constructor under
//! `JBrowsePlugin<Name>`; the resolver then takes it back out. Every script
//! execution gets a registry of its own, so a registration is only visible
//! to the resolution that ran the script. Within one execution a second
//! registration under the same key wins and the first is reported as
//! overwritten.

use std::collections::HashMap;

use parking_lot::Mutex;

use super::PluginConstructor;

/// Shared, mutable map from registry key to plugin constructor.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    entries: Mutex<HashMap<String, PluginConstructor>>,
}

impl PluginRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor under `key`.
    ///
    /// Returns `true` when an existing registration was overwritten.
    pub fn register(&self, key: impl Into<String>, constructor: PluginConstructor) -> bool {
        let key = key.into();
        let replaced = self.entries.lock().insert(key.clone(), constructor).is_some();

        if replaced {
            tracing::warn!(key = %key, "Plugin registration overwritten");
        } else {
            tracing::debug!(key = %key, "Plugin registered");
        }

        replaced
    }

    /// Remove and return the constructor registered under `key`.
    pub fn take(&self, key: &str) -> Option<PluginConstructor> {
        self.entries.lock().remove(key)
    }

    /// Move every registration out, leaving the registry empty.
    pub fn take_all(&self) -> Self {
        Self { entries: Mutex::new(std::mem::take(&mut *self.entries.lock())) }
    }

    /// Whether something is registered under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.entries.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of pending registrations.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::Plugin;

    struct Dummy;

    impl Plugin for Dummy {
        fn name(&self) -> &str {
            "Dummy"
        }

        fn version(&self) -> &str {
            "0.1.0"
        }
    }

    fn ctor() -> PluginConstructor {
        PluginConstructor::new(|| Box::new(Dummy))
    }

    #[test]
    fn test_register_and_take() {
        let registry = PluginRegistry::new();
        assert!(!registry.register("JBrowsePluginDummy", ctor()));
        assert!(registry.contains("JBrowsePluginDummy"));

        let taken = registry.take("JBrowsePluginDummy").unwrap();
        assert_eq!(taken.instantiate().name(), "Dummy");

        // Taking consumes the registration.
        assert!(registry.take("JBrowsePluginDummy").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_reports_overwrite() {
        let registry = PluginRegistry::new();
        let first = ctor();
        let second = ctor();

        registry.register("JBrowsePluginDummy", first.clone());
        assert!(registry.register("JBrowsePluginDummy", second.clone()));
        assert_eq!(registry.len(), 1);

        let taken = registry.take("JBrowsePluginDummy").unwrap();
        assert!(taken.ptr_eq(&second));
        assert!(!taken.ptr_eq(&first));
    }

    #[test]
    fn test_take_all_empties_registry() {
        let registry = PluginRegistry::new();
        registry.register("JBrowsePluginA", ctor());
        registry.register("JBrowsePluginB", ctor());

        let moved = registry.take_all();
        assert!(registry.is_empty());
        assert_eq!(moved.keys(), vec!["JBrowsePluginA", "JBrowsePluginB"]);
    }

    #[test]
    fn test_keys_sorted() {
        let registry = PluginRegistry::new();
        registry.register("JBrowsePluginB", ctor());
        registry.register("JBrowsePluginA", ctor());
        assert_eq!(registry.keys(), vec!["JBrowsePluginA", "JBrowsePluginB"]);
    }
}
