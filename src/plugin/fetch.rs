//! Fetching and executing plugin scripts.

use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};
use tokio::task::JoinError;
use url::Url;

use super::{
    select_loader, GlobalScope, HostEnvironment, HostRuntime, PluginError, PluginRegistry,
    PluginResult, ScriptLoader,
};
use crate::core::EnvironmentSettings;

/// A validated artifact location plus its expected digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRequest {
    /// Artifact URL, already protocol-checked.
    pub url: Url,
    /// Expected SHA-256 (hex) of the artifact body.
    pub integrity: Option<String>,
}

impl ScriptRequest {
    /// Request without an integrity check.
    pub fn new(url: Url) -> Self {
        Self { url, integrity: None }
    }

    /// Attach an expected digest.
    pub fn with_integrity(mut self, integrity: Option<String>) -> Self {
        self.integrity = integrity;
        self
    }
}

/// HTTP client for plugin artifacts.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
}

impl HttpSource {
    /// Create a source with the configured timeout and user agent.
    pub fn new(settings: &EnvironmentSettings) -> PluginResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.http_timeout_secs))
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|e| PluginError::Config(e.to_string()))?;

        Ok(Self { client })
    }

    /// Download an artifact and return its text.
    pub async fn fetch_text(&self, request: &ScriptRequest) -> PluginResult<String> {
        let url = &request.url;
        tracing::debug!(url = %url, "Fetching plugin artifact");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| PluginError::script_load(url, e))?;

        if !response.status().is_success() {
            return Err(PluginError::script_load(url, format!("HTTP {}", response.status())));
        }

        let bytes = response.bytes().await.map_err(|e| PluginError::script_load(url, e))?;
        verify_integrity(request, &bytes)?;

        String::from_utf8(bytes.to_vec())
            .map_err(|_| PluginError::script_load(url, "artifact is not valid UTF-8"))
    }
}

/// Check `body` against the request's expected digest, if any.
pub fn verify_integrity(request: &ScriptRequest, body: &[u8]) -> PluginResult<()> {
    let Some(expected) = &request.integrity else {
        return Ok(());
    };

    let mut hasher = Sha256::new();
    hasher.update(body);
    let actual = format!("{:x}", hasher.finalize());

    if actual.eq_ignore_ascii_case(expected.trim()) {
        Ok(())
    } else {
        Err(PluginError::Integrity {
            url: request.url.to_string(),
            expected: expected.clone(),
            actual,
        })
    }
}

/// Runs plugin scripts through whatever loader the host offers.
#[derive(Clone)]
pub struct ScriptFetcher {
    host: Arc<dyn HostRuntime>,
}

impl ScriptFetcher {
    /// Create a fetcher for `host`.
    pub fn new(host: Arc<dyn HostRuntime>) -> Self {
        Self { host }
    }

    /// Environment the host offers right now.
    pub fn environment(&self) -> HostEnvironment {
        super::detect_environment(self.host.as_ref())
    }

    /// Fetch the script and execute it in a fresh execution scope of `scope`.
    ///
    /// Returns the registrations this execution produced. A script still
    /// running after the returned future is dropped writes only into its own
    /// execution scope. No timeout is applied here.
    pub async fn fetch_and_execute(
        &self,
        request: &ScriptRequest,
        scope: &GlobalScope,
    ) -> PluginResult<PluginRegistry> {
        let execution = scope.execution_scope();

        match select_loader(self.host.as_ref()) {
            ScriptLoader::Inject(injector) => {
                tracing::debug!(url = %request.url, "Injecting plugin script");
                injector.inject(request, &execution).await?;
            }
            ScriptLoader::Import(importer) => {
                tracing::debug!(url = %request.url, "Importing plugin script");
                let url = request.url.clone();
                let request = request.clone();
                let target = Arc::clone(&execution);

                tokio::task::spawn_blocking(move || importer.import_scripts(&request, &target))
                    .await
                    .unwrap_or_else(|e| Err(PluginError::script_load(&url, join_failure(e))))?;
            }
            ScriptLoader::Unavailable => return Err(PluginError::EnvironmentUnsupported),
        }

        Ok(execution.registry().take_all())
    }
}

/// Describe why a blocking import did not return.
fn join_failure(err: JoinError) -> String {
    if !err.is_panic() {
        return "script import was cancelled".to_string();
    }

    let payload = err.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("script import panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("script import panicked: {message}")
    } else {
        "script import aborted without an error".to_string()
    }
}
