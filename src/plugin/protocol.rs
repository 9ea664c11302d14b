//! URL scheme validation for plugin references.
//!
//! Nothing is fetched for a reference until its URL passes here.

use serde::{Deserialize, Serialize};
use url::{ParseError, Url};

use super::{PluginError, PluginResult};

/// Schemes a plugin may be fetched over.
const ALLOWED_SCHEMES: [&str; 2] = ["http", "https"];

/// How URLs without a scheme are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProtocolPolicy {
    /// Every URL must be absolute http(s).
    #[default]
    Strict,
    /// Scheme-less URLs are resolved against a base URL.
    AllowSchemeless,
}

/// Validates plugin URLs before any fetch happens.
#[derive(Debug, Clone, Default)]
pub struct ProtocolValidator {
    policy: ProtocolPolicy,
    base: Option<Url>,
}

impl ProtocolValidator {
    /// Validator that only accepts absolute http(s) URLs.
    pub fn strict() -> Self {
        Self::default()
    }

    /// Validator with an explicit policy and optional base URL.
    ///
    /// The base URL, when given, must itself be http(s).
    pub fn new(policy: ProtocolPolicy, base: Option<&str>) -> PluginResult<Self> {
        let base = base.map(|raw| Self::strict().validate(raw)).transpose()?;
        Ok(Self { policy, base })
    }

    /// The active policy.
    pub fn policy(&self) -> ProtocolPolicy {
        self.policy
    }

    /// Parse `raw` and check its scheme.
    pub fn validate(&self, raw: &str) -> PluginResult<Url> {
        let url = match Url::parse(raw) {
            Ok(url) => url,
            Err(ParseError::RelativeUrlWithoutBase) => self.resolve_schemeless(raw)?,
            Err(e) => {
                return Err(PluginError::InvalidUrl { url: raw.to_string(), reason: e.to_string() })
            }
        };

        check_scheme(&url)?;
        Ok(url)
    }

    fn resolve_schemeless(&self, raw: &str) -> PluginResult<Url> {
        let invalid = |reason: String| PluginError::InvalidUrl { url: raw.to_string(), reason };

        if self.policy != ProtocolPolicy::AllowSchemeless {
            return Err(invalid("relative URL without a base".to_string()));
        }

        let base = self
            .base
            .as_ref()
            .ok_or_else(|| invalid("scheme-less URLs need a configured base URL".to_string()))?;

        base.join(raw).map_err(|e| invalid(e.to_string()))
    }
}

fn check_scheme(url: &Url) -> PluginResult<()> {
    if ALLOWED_SCHEMES.contains(&url.scheme()) {
        Ok(())
    } else {
        Err(PluginError::Protocol { scheme: format!("{}:", url.scheme()) })
    }
}
