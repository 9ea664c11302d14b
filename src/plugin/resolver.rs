//! Turning plugin references into constructors.
//!
//! Two strategies are available behind [`PluginResolver`]:
//!
//! - **Module**: import the artifact as a module and use its default export.
//! - **Global convention**: execute the artifact as a script, which
//!   registers its plugin under `JBrowsePlugin<Name>`, then take it from the
//!   scope's registry.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{
    GlobalScope, HttpSource, ModuleExport, ModuleNamespace, PluginConstructor, PluginError,
    PluginReference, PluginResult, ProtocolValidator, ScriptEngine, ScriptFetcher, ScriptRequest,
};

/// Which resolution strategy to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionStrategy {
    /// Import the artifact as a module.
    #[default]
    Module,
    /// Execute the artifact as a script and use the global registry.
    #[serde(alias = "global")]
    GlobalConvention,
}

impl std::fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Module => f.write_str("module"),
            Self::GlobalConvention => f.write_str("global-convention"),
        }
    }
}

/// Resolves one plugin reference into a constructor.
#[async_trait]
pub trait PluginResolver: Send + Sync {
    /// Strategy this resolver implements.
    fn strategy(&self) -> ResolutionStrategy;

    /// Resolve `reference`.
    async fn resolve(&self, reference: &PluginReference) -> PluginResult<PluginConstructor>;
}

/// Dynamic module import.
#[async_trait]
pub trait ModuleImporter: Send + Sync {
    /// Fetch and evaluate the module at the request URL.
    async fn import(&self, request: &ScriptRequest) -> PluginResult<ModuleNamespace>;
}

/// Module importer that fetches over HTTP and evaluates with an engine.
pub struct HttpModuleImporter {
    source: HttpSource,
    engine: Arc<dyn ScriptEngine>,
}

impl HttpModuleImporter {
    /// Create an importer.
    pub fn new(source: HttpSource, engine: Arc<dyn ScriptEngine>) -> Self {
        Self { source, engine }
    }
}

#[async_trait]
impl ModuleImporter for HttpModuleImporter {
    async fn import(&self, request: &ScriptRequest) -> PluginResult<ModuleNamespace> {
        let source = self.source.fetch_text(request).await?;
        self.engine.evaluate_module(&request.url, &source)
    }
}

/// Resolves plugins through their module's default export.
pub struct ModuleResolver {
    validator: ProtocolValidator,
    importer: Arc<dyn ModuleImporter>,
}

impl ModuleResolver {
    /// Create a resolver. Module URLs are always validated strictly.
    pub fn new(importer: Arc<dyn ModuleImporter>) -> Self {
        Self { validator: ProtocolValidator::strict(), importer }
    }
}

#[async_trait]
impl PluginResolver for ModuleResolver {
    fn strategy(&self) -> ResolutionStrategy {
        ResolutionStrategy::Module
    }

    async fn resolve(&self, reference: &PluginReference) -> PluginResult<PluginConstructor> {
        let url = self.validator.validate(&reference.url)?;
        let request = ScriptRequest::new(url).with_integrity(reference.integrity.clone());

        tracing::debug!(
            plugin = reference.display(),
            url = %request.url,
            "Importing plugin module"
        );
        let namespace = self.importer.import(&request).await?;

        match namespace.default_export() {
            Some(ModuleExport::Constructor(constructor)) => Ok(constructor.clone()),
            Some(ModuleExport::Value(value)) => Err(PluginError::Shape {
                url: request.url.to_string(),
                reason: format!(
                    "default export is a {} value, not a plugin constructor",
                    value.type_str()
                ),
            }),
            None => Err(PluginError::Shape {
                url: request.url.to_string(),
                reason: "module has no default export".to_string(),
            }),
        }
    }
}

/// Resolves plugins through the `JBrowsePlugin<Name>` registry convention.
pub struct GlobalConventionResolver {
    validator: ProtocolValidator,
    fetcher: ScriptFetcher,
    scope: Arc<GlobalScope>,
}

impl GlobalConventionResolver {
    /// Create a resolver executing scripts against `scope`.
    pub fn new(
        validator: ProtocolValidator,
        fetcher: ScriptFetcher,
        scope: Arc<GlobalScope>,
    ) -> Self {
        Self { validator, fetcher, scope }
    }

    /// The scope scripts execute against.
    pub fn scope(&self) -> &Arc<GlobalScope> {
        &self.scope
    }
}

#[async_trait]
impl PluginResolver for GlobalConventionResolver {
    fn strategy(&self) -> ResolutionStrategy {
        ResolutionStrategy::GlobalConvention
    }

    async fn resolve(&self, reference: &PluginReference) -> PluginResult<PluginConstructor> {
        let name = reference
            .name
            .as_deref()
            .ok_or_else(|| PluginError::MissingName { url: reference.url.clone() })?;

        let url = self.validator.validate(&reference.url)?;
        let request = ScriptRequest::new(url).with_integrity(reference.integrity.clone());
        let key = super::global_key(name);

        tracing::debug!(plugin = name, url = %request.url, key = %key, "Loading plugin script");
        let registrations = self.fetcher.fetch_and_execute(&request, &self.scope).await?;
        let constructor = registrations.take(&key);

        if !registrations.is_empty() {
            tracing::warn!(
                plugin = name,
                unclaimed = ?registrations.keys(),
                "Dropping registrations the script made under other names"
            );
        }

        constructor.ok_or_else(|| PluginError::NotRegistered {
            name: name.to_string(),
            key,
            url: request.url.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::{Plugin, ScriptInjector, StandardHost};

    struct Stub;

    impl Plugin for Stub {
        fn name(&self) -> &str {
            "Stub"
        }

        fn version(&self) -> &str {
            "1.0.0"
        }
    }

    struct StaticImporter(ModuleNamespace);

    #[async_trait]
    impl ModuleImporter for StaticImporter {
        async fn import(&self, _request: &ScriptRequest) -> PluginResult<ModuleNamespace> {
            Ok(self.0.clone())
        }
    }

    /// Registers `Stub` under a fixed key, whatever the URL.
    struct RegisteringInjector(Option<&'static str>);

    #[async_trait]
    impl ScriptInjector for RegisteringInjector {
        async fn inject(&self, _request: &ScriptRequest, scope: &GlobalScope) -> PluginResult<()> {
            if let Some(key) = self.0 {
                scope.registry().register(key, PluginConstructor::new(|| Box::new(Stub)));
            }
            Ok(())
        }
    }

    fn global_resolver(key: Option<&'static str>) -> GlobalConventionResolver {
        let host = StandardHost::detached().with_injector(Arc::new(RegisteringInjector(key)));
        GlobalConventionResolver::new(
            ProtocolValidator::strict(),
            ScriptFetcher::new(Arc::new(host)),
            GlobalScope::shared(),
        )
    }

    #[tokio::test]
    async fn test_module_default_export() {
        let namespace = ModuleNamespace::with_default(PluginConstructor::new(|| Box::new(Stub)));
        let resolver = ModuleResolver::new(Arc::new(StaticImporter(namespace)));

        let ctor = resolver.resolve(&PluginReference::new("https://x/y.toml")).await.unwrap();
        assert_eq!(ctor.instantiate().name(), "Stub");
        assert_eq!(resolver.strategy(), ResolutionStrategy::Module);
    }

    #[tokio::test]
    async fn test_module_missing_default_is_shape_error() {
        let resolver = ModuleResolver::new(Arc::new(StaticImporter(ModuleNamespace::new())));
        let err = resolver.resolve(&PluginReference::new("https://x/y.toml")).await.unwrap_err();
        assert!(matches!(err, PluginError::Shape { .. }));
    }

    #[tokio::test]
    async fn test_module_value_default_is_shape_error() {
        let mut namespace = ModuleNamespace::new();
        namespace.insert("default", ModuleExport::Value(toml::Value::Integer(1)));
        let resolver = ModuleResolver::new(Arc::new(StaticImporter(namespace)));

        let err = resolver.resolve(&PluginReference::new("https://x/y.toml")).await.unwrap_err();
        assert!(err.to_string().contains("integer"));
    }

    #[tokio::test]
    async fn test_module_rejects_ftp() {
        let resolver = ModuleResolver::new(Arc::new(StaticImporter(ModuleNamespace::new())));
        let err = resolver.resolve(&PluginReference::new("ftp://x/y.js")).await.unwrap_err();
        assert!(err.to_string().contains("ftp:"));
    }

    #[tokio::test]
    async fn test_global_takes_registration() {
        let resolver = global_resolver(Some("JBrowsePluginFoo"));
        let ctor =
            resolver.resolve(&PluginReference::named("Foo", "https://x/foo.toml")).await.unwrap();

        assert_eq!(ctor.instantiate().name(), "Stub");
        assert!(resolver.scope().registry().is_empty());
    }

    #[tokio::test]
    async fn test_global_missing_registration() {
        let resolver = global_resolver(None);
        let err = resolver
            .resolve(&PluginReference::named("Foo", "https://x/foo.toml"))
            .await
            .unwrap_err();

        match err {
            PluginError::NotRegistered { name, key, .. } => {
                assert_eq!(name, "Foo");
                assert_eq!(key, "JBrowsePluginFoo");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_global_wrong_name_is_not_registered() {
        let resolver = global_resolver(Some("JBrowsePluginBar"));
        let err = resolver
            .resolve(&PluginReference::named("Foo", "https://x/foo.toml"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("JBrowsePluginFoo"));
    }

    #[tokio::test]
    async fn test_global_requires_name() {
        let resolver = global_resolver(Some("JBrowsePluginFoo"));
        let err = resolver.resolve(&PluginReference::new("https://x/foo.toml")).await.unwrap_err();
        assert!(matches!(err, PluginError::MissingName { .. }));
    }

    #[test]
    fn test_strategy_serde() {
        #[derive(Deserialize)]
        struct Wrapper {
            strategy: ResolutionStrategy,
        }

        let parsed: Wrapper = toml::from_str("strategy = \"global\"").unwrap();
        assert_eq!(parsed.strategy, ResolutionStrategy::GlobalConvention);
        let parsed: Wrapper = toml::from_str("strategy = \"global-convention\"").unwrap();
        assert_eq!(parsed.strategy, ResolutionStrategy::GlobalConvention);
        assert_eq!(ResolutionStrategy::Module.to_string(), "module");
    }
}
