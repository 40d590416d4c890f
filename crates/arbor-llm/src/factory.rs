//! # Driver Factory
//!
//! Selects and builds a driver from the root node's configuration:
//!
//! | provider                          | driver                       |
//! |-----------------------------------|------------------------------|
//! | absent, `google`, `gemini`        | native structured-stream     |
//! | id in the compatible preset table | universal delta              |
//! | unknown id with a `base_url`      | universal delta              |
//! | anything else                     | [`ProviderError::Other`]     |
//!
//! The node's own API key wins; otherwise the environment variable named by
//! the preset is read. A missing key where one is required is an
//! [`ProviderError::Auth`] raised here, before any request is built.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument};

use arbor_core::nodes::AgentConfig;
use arbor_settings::ProviderSettings;

use crate::google::{GoogleConfig, GoogleProvider};
use crate::openai::{OpenAiCompatConfig, OpenAiCompatProvider};
use crate::provider::{Provider, ProviderError, ProviderFactory, ProviderResult};

/// Provider ids routed to the native driver.
const NATIVE_IDS: &[&str] = &["google", "gemini"];

/// Per-dispatch driver configuration, taken from the root node.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DriverConfig {
    /// Provider id; `None` selects the native driver.
    pub provider: Option<String>,
    /// Model ID.
    pub model: String,
    /// Node-level credential.
    pub api_key: Option<String>,
    /// Node-level base URL override.
    pub base_url: Option<String>,
}

impl DriverConfig {
    /// Build from an agent or router node's configuration.
    #[must_use]
    pub fn from_agent(config: &AgentConfig) -> Self {
        Self {
            provider: config.provider.clone().filter(|p| !p.trim().is_empty()),
            model: config.model.clone(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            base_url: config.base_url.clone().filter(|u| !u.is_empty()),
        }
    }

    /// Whether this configuration selects the native driver.
    #[must_use]
    pub fn is_native(&self) -> bool {
        self.provider
            .as_deref()
            .is_none_or(|p| NATIVE_IDS.iter().any(|id| p.eq_ignore_ascii_case(id)))
    }
}

type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Default [`ProviderFactory`] backed by settings and the process environment.
#[derive(Clone)]
pub struct DefaultProviderFactory {
    settings: ProviderSettings,
    client: reqwest::Client,
    env: EnvLookup,
}

impl fmt::Debug for DefaultProviderFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultProviderFactory")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl DefaultProviderFactory {
    /// Factory reading credentials from the process environment.
    #[must_use]
    pub fn new(settings: ProviderSettings) -> Self {
        Self::with_env(settings, |name| std::env::var(name).ok())
    }

    /// Factory with a custom environment lookup.
    #[must_use]
    pub fn with_env(
        settings: ProviderSettings,
        env: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            settings,
            client: reqwest::Client::new(),
            env: Arc::new(env),
        }
    }

    fn lookup_key(&self, var: &str) -> Option<String> {
        (self.env)(var).filter(|v| !v.trim().is_empty())
    }

    fn build_native(&self, config: &DriverConfig) -> ProviderResult<Arc<dyn Provider>> {
        let native = &self.settings.native;
        let api_key = config
            .api_key
            .clone()
            .or_else(|| self.lookup_key(&native.api_key_env))
            .ok_or_else(|| ProviderError::Auth {
                message: format!("no API key for the native provider (set {})", native.api_key_env),
            })?;
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| native.base_url.clone());

        Ok(Arc::new(GoogleProvider::with_client(
            GoogleConfig {
                model: config.model.clone(),
                api_key,
                base_url: Some(base_url),
            },
            self.client.clone(),
        )))
    }

    fn build_compatible(&self, id: &str, config: &DriverConfig) -> ProviderResult<Arc<dyn Provider>> {
        let preset = self.settings.compatible_preset(id);
        let base_url = config
            .base_url
            .clone()
            .or_else(|| preset.map(|p| p.base_url.clone()))
            .ok_or_else(|| ProviderError::Other {
                message: format!("unknown provider '{id}' and no base URL configured"),
            })?;

        let env_key = preset
            .and_then(|p| p.api_key_env.as_deref())
            .and_then(|var| self.lookup_key(var));
        let api_key = config.api_key.clone().or(env_key);
        // Unknown ids with an explicit endpoint are assumed to be local servers.
        let requires_key = preset.is_some_and(|p| p.requires_key);
        if requires_key && api_key.is_none() {
            let hint = preset
                .and_then(|p| p.api_key_env.as_deref())
                .map(|var| format!(" (set {var})"))
                .unwrap_or_default();
            return Err(ProviderError::Auth {
                message: format!("no API key for provider '{id}'{hint}"),
            });
        }

        Ok(Arc::new(OpenAiCompatProvider::with_client(
            OpenAiCompatConfig {
                provider_id: id.to_owned(),
                model: config.model.clone(),
                api_key,
                base_url,
            },
            self.client.clone(),
        )))
    }
}

#[async_trait]
impl ProviderFactory for DefaultProviderFactory {
    #[instrument(skip_all, fields(provider = config.provider.as_deref().unwrap_or("native"), model = %config.model))]
    async fn create(&self, config: &DriverConfig) -> ProviderResult<Arc<dyn Provider>> {
        if config.model.trim().is_empty() {
            return Err(ProviderError::Other {
                message: "root node has no model configured".into(),
            });
        }
        let provider = match config.provider.as_deref() {
            Some(id) if !config.is_native() => self.build_compatible(id, config)?,
            _ => self.build_native(config)?,
        };
        debug!(provider_type = %provider.provider_type(), "driver selected");
        Ok(provider)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
