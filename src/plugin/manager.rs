//! Plugin manager holding instantiated plugins.
//!
//! The manager is the consumer of [`PluginLoader`](super::PluginLoader)
//! output: it instantiates each record once and indexes the elements the
//! plugins contribute.

use std::collections::{BTreeMap, HashMap};

use super::{
    ElementKind, ElementType, Plugin, PluginError, PluginRecord, PluginReference, PluginResult,
};

/// A plugin instance and the reference it was loaded from.
pub struct LoadedPlugin {
    /// The running plugin.
    pub instance: Box<dyn Plugin>,
    /// Reference the plugin was resolved from.
    pub definition: PluginReference,
}

impl LoadedPlugin {
    /// Plugin name.
    pub fn name(&self) -> &str {
        self.instance.name()
    }

    /// Plugin version.
    pub fn version(&self) -> &str {
        self.instance.version()
    }
}

impl std::fmt::Debug for LoadedPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedPlugin")
            .field("name", &self.name())
            .field("version", &self.version())
            .field("definition", &self.definition)
            .finish()
    }
}

/// Owns instantiated plugins and their contributed elements.
#[derive(Debug, Default)]
pub struct PluginManager {
    /// Plugins in registration order.
    plugins: Vec<LoadedPlugin>,
    /// Plugin name to index in `plugins`.
    by_name: HashMap<String, usize>,
    /// Contributed element names per kind, with the owning plugin.
    elements: BTreeMap<ElementKind, Vec<(String, usize)>>,
}

impl PluginManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Instantiate and register every record, in order.
    ///
    /// Stops at the first duplicate; plugins registered before it stay.
    pub fn register_all(&mut self, records: &[PluginRecord]) -> PluginResult<()> {
        for record in records {
            self.register(record)?;
        }
        Ok(())
    }

    /// Instantiate a record and register the resulting plugin.
    ///
    /// Returns the plugin name.
    pub fn register(&mut self, record: &PluginRecord) -> PluginResult<String> {
        let instance = record.constructor.instantiate();
        let name = instance.name().to_string();

        if self.by_name.contains_key(&name) {
            return Err(PluginError::AlreadyRegistered(name));
        }

        let index = self.plugins.len();
        for ElementType { kind, name: element } in instance.element_types() {
            self.elements.entry(kind).or_default().push((element, index));
        }

        tracing::debug!(
            plugin = %name,
            version = instance.version(),
            url = %record.definition.url,
            "Registered plugin"
        );

        self.by_name.insert(name.clone(), index);
        self.plugins.push(LoadedPlugin { instance, definition: record.definition.clone() });
        Ok(name)
    }

    /// Get a plugin by name.
    pub fn get(&self, name: &str) -> Option<&LoadedPlugin> {
        self.by_name.get(name).map(|&index| &self.plugins[index])
    }

    /// List plugins in registration order.
    pub fn list(&self) -> impl Iterator<Item = &LoadedPlugin> {
        self.plugins.iter()
    }

    /// Get the number of registered plugins.
    pub fn count(&self) -> usize {
        self.plugins.len()
    }

    /// Elements of `kind`, as `(element name, plugin name)` pairs.
    pub fn elements_of(&self, kind: ElementKind) -> Vec<(&str, &str)> {
        self.elements
            .get(&kind)
            .map(|entries| {
                entries
                    .iter()
                    .map(|(element, index)| (element.as_str(), self.plugins[*index].name()))
                    .collect()
            })
            .unwrap_or_default()
    }
}
