//! Load orchestration.
//!
//! [`PluginLoader`] owns a private copy of the plugin references it was
//! given and resolves all of them concurrently on each `load` call. Nothing
//! is cached between calls.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::{join_all, try_join_all};
use futures::{stream, StreamExt, TryStreamExt};

use super::{
    GlobalConventionResolver, GlobalScope, HttpModuleImporter, HttpSource, ManifestEngine,
    ModuleResolver, PluginConstructor, PluginError, PluginRecord, PluginReference,
    PluginResolver, PluginResult, ProtocolPolicy, ProtocolValidator, ResolutionStrategy,
    ScriptEngine, ScriptFetcher, StandardHost,
};
use crate::core::{retry_async, Config, RetryConfig};

/// Tuning for a load run.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Maximum plugins resolved at once. `None` resolves all at once.
    pub max_concurrency: Option<usize>,
    /// Per-plugin timeout, covering fetch and evaluation.
    pub timeout: Option<Duration>,
    /// Retry policy for retryable failures.
    pub retry: RetryConfig,
}

impl LoadOptions {
    /// Options from the `[loader]` and `[retry]` config sections.
    pub fn from_config(config: &Config) -> PluginResult<Self> {
        if config.loader.max_concurrency == Some(0) {
            return Err(PluginError::Config("loader.max_concurrency must be at least 1".into()));
        }

        Ok(Self {
            max_concurrency: config.loader.max_concurrency,
            timeout: config.loader.timeout_secs.map(Duration::from_secs),
            retry: config.retry.to_retry_config(),
        })
    }
}

/// Outcome of one reference in a settled load.
#[derive(Debug)]
pub struct SettledPlugin {
    /// The reference that was resolved.
    pub definition: PluginReference,
    /// Its constructor, or why resolution failed.
    pub result: PluginResult<PluginConstructor>,
}

impl SettledPlugin {
    /// Whether the plugin resolved.
    pub fn is_loaded(&self) -> bool {
        self.result.is_ok()
    }

    /// Convert into a record, dropping failures.
    pub fn into_record(self) -> Option<PluginRecord> {
        let definition = self.definition;
        self.result.ok().map(|constructor| PluginRecord { constructor, definition })
    }
}

/// Resolves a fixed set of plugin references.
pub struct PluginLoader {
    definitions: Vec<PluginReference>,
    resolver: Arc<dyn PluginResolver>,
    options: LoadOptions,
}

impl PluginLoader {
    /// Create a loader over a private copy of `definitions`.
    pub fn new(definitions: &[PluginReference], resolver: Arc<dyn PluginResolver>) -> Self {
        Self { definitions: definitions.to_vec(), resolver, options: LoadOptions::default() }
    }

    /// Set load options.
    pub fn with_options(mut self, options: LoadOptions) -> Self {
        self.options = options;
        self
    }

    /// The references this loader resolves.
    pub fn definitions(&self) -> &[PluginReference] {
        &self.definitions
    }

    /// Strategy of the underlying resolver.
    pub fn strategy(&self) -> ResolutionStrategy {
        self.resolver.strategy()
    }

    /// Resolve every reference.
    ///
    /// Records come back in input order. If any reference fails the whole
    /// load fails and no records are returned.
    pub async fn load(&self) -> PluginResult<Vec<PluginRecord>> {
        let start = Instant::now();
        let tasks = self.definitions.iter().map(|definition| self.load_record(definition));

        let records: Vec<PluginRecord> = match self.options.max_concurrency {
            None => try_join_all(tasks).await?,
            Some(limit) => stream::iter(tasks).buffered(limit).try_collect().await?,
        };

        tracing::info!(
            count = records.len(),
            strategy = %self.strategy(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Plugins loaded"
        );
        Ok(records)
    }

    /// Resolve every reference, reporting each outcome in input order.
    pub async fn load_settled(&self) -> Vec<SettledPlugin> {
        let tasks = self.definitions.iter().map(|definition| async move {
            let result = self.resolve(definition).await;
            if let Err(e) = &result {
                tracing::warn!(plugin = definition.display(), error = %e, "Plugin failed to load");
            }
            SettledPlugin { definition: definition.clone(), result }
        });

        match self.options.max_concurrency {
            None => join_all(tasks).await,
            Some(limit) => stream::iter(tasks).buffered(limit).collect().await,
        }
    }

    async fn load_record(&self, definition: &PluginReference) -> PluginResult<PluginRecord> {
        let constructor = self.resolve(definition).await?;
        Ok(PluginRecord { constructor, definition: definition.clone() })
    }

    async fn resolve(&self, definition: &PluginReference) -> PluginResult<PluginConstructor> {
        retry_async(
            &self.options.retry,
            || self.resolve_once(definition),
            PluginError::is_retryable,
        )
        .await
        .into_result()
    }

    async fn resolve_once(&self, definition: &PluginReference) -> PluginResult<PluginConstructor> {
        let Some(limit) = self.options.timeout else {
            return self.resolver.resolve(definition).await;
        };

        tokio::time::timeout(limit, self.resolver.resolve(definition)).await.map_err(|_| {
            PluginError::Timeout { url: definition.url.clone(), limit }
        })?
    }
}

/// Build a loader for the configured plugins using the HTTP host.
///
/// Global-convention scripts execute against `scope`, which should already
/// carry the host capability bundle.
pub fn loader_from_config(config: &Config, scope: Arc<GlobalScope>) -> PluginResult<PluginLoader> {
    let source = HttpSource::new(&config.environment)?;
    let engine: Arc<dyn ScriptEngine> = Arc::new(ManifestEngine::new());

    let resolver: Arc<dyn PluginResolver> = match config.loader.strategy {
        ResolutionStrategy::Module => {
            if config.loader.protocol_policy != ProtocolPolicy::Strict {
                tracing::warn!("protocol_policy only applies to global-convention loading");
            }
            let importer = HttpModuleImporter::new(source, engine);
            Arc::new(ModuleResolver::new(Arc::new(importer)))
        }
        ResolutionStrategy::GlobalConvention => {
            let validator = ProtocolValidator::new(
                config.loader.protocol_policy,
                config.loader.base_url.as_deref(),
            )?;
            let host = StandardHost::from_settings(&config.environment, &source, &engine);
            let fetcher = ScriptFetcher::new(Arc::new(host));
            Arc::new(GlobalConventionResolver::new(validator, fetcher, scope))
        }
    };

    Ok(PluginLoader::new(&config.plugins, resolver).with_options(LoadOptions::from_config(config)?))
}
