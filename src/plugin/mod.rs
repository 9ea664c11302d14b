//! Dynamic plugin loading.
//!
//! Plugins are declared as [`PluginReference`]s pointing at remote
//! artifacts. A [`PluginLoader`] resolves every reference concurrently into
//! a [`PluginConstructor`] through one of two strategies:
//!
//! - **Module**: the artifact is imported as a module and its `default`
//!   export is the constructor.
//! - **Global convention**: the artifact runs as a script against a
//!   [`GlobalScope`] and registers its constructor under
//!   `JBrowsePlugin<Name>`.
//!
//! Before any script runs, [`install_global_capabilities`] publishes the
//! host library surface on the scope as `JBrowseExports`.
//!
//! # Example Configuration
//!
//! ```toml
//! [loader]
//! strategy = "global-convention"
//!
//! [[plugins]]
//! name = "Dotplot"
//! url = "https://plugins.example.org/dotplot.toml"
//! ```

mod error;
mod exports;
mod fetch;
mod host;
mod loader;
mod manager;
mod manifest;
mod protocol;
mod registry;
mod resolver;
mod runtime;
mod schema;
mod scope;
mod types;

pub use error::{PluginError, PluginResult};
pub use exports::{
    install_global_capabilities, re_exports, Capability, CapabilityBundle, ElementCatalog,
    HostVersion, PluginApi, CONFIGURATION_MODULE, ELEMENT_TYPES_MODULE, PLUGIN_MODULE,
    VERSION_MODULE,
};
pub use fetch::{verify_integrity, HttpSource, ScriptFetcher, ScriptRequest};
pub use host::{
    detect_environment, select_loader, HostEnvironment, HostRuntime, HttpImporter, HttpInjector,
    ScriptImporter, ScriptInjector, ScriptLoader, StandardHost,
};
pub use loader::{loader_from_config, LoadOptions, PluginLoader, SettledPlugin};
pub use manager::{LoadedPlugin, PluginManager};
pub use manifest::{PluginManifest, PluginMetadata};
pub use protocol::{ProtocolPolicy, ProtocolValidator};
pub use registry::PluginRegistry;
pub use resolver::{
    GlobalConventionResolver, HttpModuleImporter, ModuleImporter, ModuleResolver, PluginResolver,
    ResolutionStrategy,
};
pub use runtime::{ManifestEngine, ManifestPlugin, ModuleExport, ModuleNamespace, ScriptEngine};
pub use schema::{ConfigSlot, ConfigurationSchema, SchemaBuilder, SchemaFactory, SlotType};
pub use scope::GlobalScope;
pub use types::{
    global_key, ElementKind, ElementType, Plugin, PluginConstructor, PluginRecord,
    PluginReference, DEFAULT_EXPORT, EXPORTS_PROPERTY, GLOBAL_PLUGIN_PREFIX, PLUGIN_API_VERSION,
};
