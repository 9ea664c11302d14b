//! Evaluation of fetched plugin artifacts.
//!
//! A [`ScriptEngine`] turns artifact source into something the host can
//! use, either by executing it against a [`GlobalScope`] (global-convention
//! loading) or by evaluating it into a [`ModuleNamespace`] (module loading).
//! The shipped [`ManifestEngine`] evaluates declarative TOML artifacts.

use std::collections::BTreeMap;
use std::sync::Arc;

use url::Url;

use super::{
    global_key, ConfigurationSchema, ElementType, GlobalScope, Plugin, PluginConstructor,
    PluginError, PluginManifest, PluginResult, SchemaFactory, DEFAULT_EXPORT, EXPORTS_PROPERTY,
    PLUGIN_API_VERSION,
};

/// A value exported by an evaluated module.
#[derive(Debug, Clone)]
pub enum ModuleExport {
    /// A plugin constructor.
    Constructor(PluginConstructor),
    /// Plain data.
    Value(toml::Value),
}

/// Exports of an evaluated module.
#[derive(Debug, Clone, Default)]
pub struct ModuleNamespace {
    exports: BTreeMap<String, ModuleExport>,
}

impl ModuleNamespace {
    /// Create an empty namespace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Namespace whose default export is `constructor`.
    pub fn with_default(constructor: PluginConstructor) -> Self {
        let mut namespace = Self::new();
        namespace.insert(DEFAULT_EXPORT, ModuleExport::Constructor(constructor));
        namespace
    }

    /// Add or replace an export.
    pub fn insert(&mut self, name: impl Into<String>, export: ModuleExport) {
        self.exports.insert(name.into(), export);
    }

    /// Look up an export.
    pub fn get(&self, name: &str) -> Option<&ModuleExport> {
        self.exports.get(name)
    }

    /// The default export.
    pub fn default_export(&self) -> Option<&ModuleExport> {
        self.get(DEFAULT_EXPORT)
    }

    /// Exported names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.exports.keys().map(String::as_str).collect()
    }
}

/// Evaluates fetched plugin source.
pub trait ScriptEngine: Send + Sync {
    /// Execute a script for its side effects on `scope`.
    fn execute_script(&self, url: &Url, source: &str, scope: &GlobalScope) -> PluginResult<()>;

    /// Evaluate a module and return its exports.
    fn evaluate_module(&self, url: &Url, source: &str) -> PluginResult<ModuleNamespace>;
}

/// Engine for declarative TOML plugin artifacts.
#[derive(Debug, Clone)]
pub struct ManifestEngine {
    api_version: String,
}

impl Default for ManifestEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ManifestEngine {
    /// Engine targeting the host's plugin API version.
    pub fn new() -> Self {
        Self { api_version: PLUGIN_API_VERSION.to_string() }
    }

    /// Engine targeting a specific plugin API version.
    pub fn with_api_version(api_version: impl Into<String>) -> Self {
        Self { api_version: api_version.into() }
    }

    fn parse(&self, source: &str) -> PluginResult<PluginManifest> {
        let manifest = PluginManifest::from_toml(source)?;
        manifest.validate(&self.api_version)?;
        Ok(manifest)
    }
}

impl ScriptEngine for ManifestEngine {
    fn execute_script(&self, url: &Url, source: &str, scope: &GlobalScope) -> PluginResult<()> {
        let manifest = self.parse(source)?;
        let Some(plugin) = &manifest.plugin else {
            tracing::debug!(url = %url, "Script defines no plugin");
            return Ok(());
        };

        if !plugin.requires.is_empty() {
            let exports = scope.exports().ok_or_else(|| {
                let reason = format!(
                    "plugin '{}' needs host modules but {EXPORTS_PROPERTY} is not installed",
                    plugin.name
                );
                PluginError::script_load(url, reason)
            })?;

            if let Some(missing) = plugin.requires.iter().find(|m| !exports.contains(m)) {
                let reason = format!(
                    "plugin '{}' requires host module '{missing}' which {EXPORTS_PROPERTY} does not provide",
                    plugin.name
                );
                return Err(PluginError::script_load(url, reason));
            }
        }

        let key = global_key(&plugin.name);
        scope.registry().register(key, ManifestPlugin::constructor(manifest));
        Ok(())
    }

    fn evaluate_module(&self, url: &Url, source: &str) -> PluginResult<ModuleNamespace> {
        let manifest = self.parse(source)?;
        let mut namespace = ModuleNamespace::new();

        for (name, value) in &manifest.exports {
            namespace.insert(name.clone(), ModuleExport::Value(value.clone()));
        }

        if manifest.plugin.is_some() {
            let constructor = ManifestPlugin::constructor(manifest);
            namespace.insert(DEFAULT_EXPORT, ModuleExport::Constructor(constructor));
        }

        tracing::debug!(url = %url, exports = ?namespace.names(), "Module evaluated");
        Ok(namespace)
    }
}

/// Plugin instance backed by a declarative artifact.
#[derive(Debug, Clone)]
pub struct ManifestPlugin {
    manifest: Arc<PluginManifest>,
}

impl ManifestPlugin {
    /// Constructor producing instances of the artifact's plugin.
    pub fn constructor(manifest: PluginManifest) -> PluginConstructor {
        let manifest = Arc::new(manifest);
        PluginConstructor::new(move || Box::new(Self { manifest: Arc::clone(&manifest) }))
    }

    /// The artifact this plugin was built from.
    pub fn manifest(&self) -> &PluginManifest {
        &self.manifest
    }
}

impl Plugin for ManifestPlugin {
    fn name(&self) -> &str {
        self.manifest.plugin.as_ref().map_or("", |p| p.name.as_str())
    }

    fn version(&self) -> &str {
        self.manifest.plugin.as_ref().map_or("", |p| p.version.as_str())
    }

    fn element_types(&self) -> Vec<ElementType> {
        self.manifest.contributes.clone()
    }

    fn configuration_schema(&self) -> Option<ConfigurationSchema> {
        if self.manifest.configuration.is_empty() {
            return None;
        }
        Some(SchemaFactory.from_table(self.name(), &self.manifest.configuration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::{install_global_capabilities, ElementKind};

    const SCRIPT: &str = r#"
[plugin]
name = "Foo"
version = "0.3.0"
requires = ["@jbrowse/core/configuration"]

[[contributes]]
kind = "track-type"
name = "FooTrack"

[configuration]
color = "blue"
"#;

    fn url() -> Url {
        Url::parse("https://plugins.example.org/foo.toml").unwrap()
    }

    #[test]
    fn test_script_registers_under_global_key() {
        let scope = GlobalScope::new();
        install_global_capabilities(&scope);

        ManifestEngine::new().execute_script(&url(), SCRIPT, &scope).unwrap();

        let ctor = scope.registry().take("JBrowsePluginFoo").unwrap();
        let plugin = ctor.instantiate();
        assert_eq!(plugin.name(), "Foo");
        assert_eq!(plugin.version(), "0.3.0");
        assert_eq!(plugin.element_types()[0].kind, ElementKind::TrackType);
        let schema = plugin.configuration_schema().unwrap();
        assert!(schema.slot("color").is_some());
    }

    #[test]
    fn test_script_without_exports_fails() {
        let scope = GlobalScope::new();
        let err = ManifestEngine::new().execute_script(&url(), SCRIPT, &scope).unwrap_err();

        assert!(matches!(err, PluginError::ScriptLoad { .. }));
        assert!(err.to_string().contains(EXPORTS_PROPERTY));
        assert!(scope.registry().is_empty());
    }

    #[test]
    fn test_script_missing_required_module() {
        let scope = GlobalScope::new();
        install_global_capabilities(&scope);
        let source = "[plugin]\nname = \"Foo\"\nversion = \"0.1.0\"\nrequires = [\"@jbrowse/core/ui\"]\n";

        let err = ManifestEngine::new().execute_script(&url(), source, &scope).unwrap_err();
        assert!(err.to_string().contains("@jbrowse/core/ui"));
    }

    #[test]
    fn test_script_without_plugin_registers_nothing() {
        let scope = GlobalScope::new();
        ManifestEngine::new().execute_script(&url(), "[exports]\nx = 1\n", &scope).unwrap();
        assert!(scope.registry().is_empty());
    }

    #[test]
    fn test_module_default_export() {
        let namespace = ManifestEngine::new().evaluate_module(&url(), SCRIPT).unwrap();
        match namespace.default_export() {
            Some(ModuleExport::Constructor(ctor)) => {
                assert_eq!(ctor.instantiate().name(), "Foo");
            }
            other => panic!("unexpected default export: {other:?}"),
        }
    }

    #[test]
    fn test_module_value_exports() {
        let namespace = ManifestEngine::new()
            .evaluate_module(&url(), "[exports]\ndefault = \"oops\"\nversion = 2\n")
            .unwrap();
        assert!(matches!(namespace.default_export(), Some(ModuleExport::Value(_))));
        assert_eq!(namespace.names(), vec!["default", "version"]);
    }

    #[test]
    fn test_incompatible_api_version() {
        let engine = ManifestEngine::with_api_version("1.0.0");
        let err = engine.evaluate_module(&url(), SCRIPT).unwrap_err();
        assert!(matches!(err, PluginError::IncompatibleVersion { .. }));
    }
}
