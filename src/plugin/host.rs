//! Host runtime abstraction.
//!
//! A host offers at most two ways to run a plugin script: a document-style
//! injector that loads scripts asynchronously, and a worker-style importer
//! that loads them synchronously. Which one is used is decided each time a
//! script is fetched, never cached.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use super::{GlobalScope, HttpSource, PluginError, PluginResult, ScriptEngine, ScriptRequest};
use crate::core::EnvironmentSettings;

/// Script loading capability of the active host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEnvironment {
    /// Scripts are injected into a document and load asynchronously.
    Dom,
    /// Scripts are imported synchronously, worker style.
    Worker,
    /// No way to load scripts.
    Neither,
}

impl fmt::Display for HostEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Dom => "dom",
            Self::Worker => "worker",
            Self::Neither => "none",
        };
        f.write_str(name)
    }
}

/// Document-style script loading.
#[async_trait]
pub trait ScriptInjector: Send + Sync {
    /// Load and execute the script, resolving once it has run.
    async fn inject(&self, request: &ScriptRequest, scope: &GlobalScope) -> PluginResult<()>;
}

/// Worker-style synchronous script loading.
pub trait ScriptImporter: Send + Sync {
    /// Load and execute the script before returning. May block.
    fn import_scripts(&self, request: &ScriptRequest, scope: &GlobalScope) -> PluginResult<()>;
}

/// The ambient runtime plugins are loaded into.
pub trait HostRuntime: Send + Sync {
    /// Document-style injector, if the host has a document.
    fn document(&self) -> Option<Arc<dyn ScriptInjector>>;

    /// Worker-style importer, if the host has one.
    fn script_importer(&self) -> Option<Arc<dyn ScriptImporter>>;
}

/// Loading mechanism picked for one fetch.
pub enum ScriptLoader {
    /// Use the document injector.
    Inject(Arc<dyn ScriptInjector>),
    /// Use the worker importer.
    Import(Arc<dyn ScriptImporter>),
    /// Nothing available.
    Unavailable,
}

impl ScriptLoader {
    /// Environment this loader corresponds to.
    pub fn environment(&self) -> HostEnvironment {
        match self {
            Self::Inject(_) => HostEnvironment::Dom,
            Self::Import(_) => HostEnvironment::Worker,
            Self::Unavailable => HostEnvironment::Neither,
        }
    }
}

/// Pick a loader. A document wins over a worker importer.
pub fn select_loader(host: &dyn HostRuntime) -> ScriptLoader {
    if let Some(injector) = host.document() {
        return ScriptLoader::Inject(injector);
    }
    if let Some(importer) = host.script_importer() {
        return ScriptLoader::Import(importer);
    }
    ScriptLoader::Unavailable
}

/// Which environment `host` currently offers.
pub fn detect_environment(host: &dyn HostRuntime) -> HostEnvironment {
    select_loader(host).environment()
}

/// Injector that fetches over HTTP and hands the source to an engine.
pub struct HttpInjector {
    source: HttpSource,
    engine: Arc<dyn ScriptEngine>,
}

impl HttpInjector {
    /// Create an injector.
    pub fn new(source: HttpSource, engine: Arc<dyn ScriptEngine>) -> Self {
        Self { source, engine }
    }
}

#[async_trait]
impl ScriptInjector for HttpInjector {
    async fn inject(&self, request: &ScriptRequest, scope: &GlobalScope) -> PluginResult<()> {
        let source = self.source.fetch_text(request).await?;
        self.engine.execute_script(&request.url, &source, scope)
    }
}

/// Importer that blocks on an HTTP fetch, then runs the engine.
///
/// Must be called off the async worker threads (the script fetcher uses the
/// blocking pool), on a thread that can see a tokio runtime.
pub struct HttpImporter {
    source: HttpSource,
    engine: Arc<dyn ScriptEngine>,
}

impl HttpImporter {
    /// Create an importer.
    pub fn new(source: HttpSource, engine: Arc<dyn ScriptEngine>) -> Self {
        Self { source, engine }
    }
}

impl ScriptImporter for HttpImporter {
    fn import_scripts(&self, request: &ScriptRequest, scope: &GlobalScope) -> PluginResult<()> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| PluginError::script_load(&request.url, e))?;
        let source = handle.block_on(self.source.fetch_text(request))?;
        self.engine.execute_script(&request.url, &source, scope)
    }
}

/// Host runtime assembled from optional loaders.
#[derive(Clone, Default)]
pub struct StandardHost {
    injector: Option<Arc<dyn ScriptInjector>>,
    importer: Option<Arc<dyn ScriptImporter>>,
}

impl StandardHost {
    /// HTTP-backed host with the loaders enabled in `settings`.
    pub fn from_settings(
        settings: &EnvironmentSettings,
        source: &HttpSource,
        engine: &Arc<dyn ScriptEngine>,
    ) -> Self {
        let mut host = Self::detached();
        if settings.dom {
            let injector = HttpInjector::new(source.clone(), Arc::clone(engine));
            host = host.with_injector(Arc::new(injector));
        }
        if settings.worker {
            let importer = HttpImporter::new(source.clone(), Arc::clone(engine));
            host = host.with_importer(Arc::new(importer));
        }
        host
    }

    /// Host with no way to load scripts.
    pub fn detached() -> Self {
        Self::default()
    }

    /// Set the document-style injector.
    pub fn with_injector(mut self, injector: Arc<dyn ScriptInjector>) -> Self {
        self.injector = Some(injector);
        self
    }

    /// Set the worker-style importer.
    pub fn with_importer(mut self, importer: Arc<dyn ScriptImporter>) -> Self {
        self.importer = Some(importer);
        self
    }
}

impl HostRuntime for StandardHost {
    fn document(&self) -> Option<Arc<dyn ScriptInjector>> {
        self.injector.clone()
    }

    fn script_importer(&self) -> Option<Arc<dyn ScriptImporter>> {
        self.importer.clone()
    }
}
