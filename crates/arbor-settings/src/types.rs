//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]`, so a settings
//! file may be partial: missing fields keep their compiled default.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Root settings type.
///
/// ```json
/// {
///   "agent": { "maxToolRounds": 10 },
///   "providers": { "compatible": { "local": { "baseUrl": "http://127.0.0.1:8080/v1", "requiresKey": false } } }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArborSettings {
    /// Orchestration loop settings.
    pub agent: AgentSettings,
    /// Backend endpoints and credentials.
    pub providers: ProviderSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

/// Orchestration loop settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentSettings {
    /// Maximum streaming rounds per turn before the loop fails closed.
    pub max_tool_rounds: u32,
    /// Temperature used when the root node does not set one.
    pub default_temperature: f64,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_tool_rounds: 25,
            default_temperature: 0.7,
        }
    }
}

/// Backend endpoints.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderSettings {
    /// The native structured-stream backend.
    pub native: NativeProvider,
    /// OpenAI-compatible backends, keyed by provider id.
    pub compatible: BTreeMap<String, CompatibleProvider>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        let compatible = [
            ("openai", "https://api.openai.com/v1", "OPENAI_API_KEY", true),
            ("openrouter", "https://openrouter.ai/api/v1", "OPENROUTER_API_KEY", true),
            ("deepseek", "https://api.deepseek.com/v1", "DEEPSEEK_API_KEY", true),
            ("groq", "https://api.groq.com/openai/v1", "GROQ_API_KEY", true),
            ("ollama", "http://localhost:11434/v1", "OLLAMA_API_KEY", false),
        ]
        .into_iter()
        .map(|(id, base_url, env, requires_key)| {
            (
                id.to_owned(),
                CompatibleProvider {
                    base_url: base_url.to_owned(),
                    api_key_env: Some(env.to_owned()),
                    requires_key,
                },
            )
        })
        .collect();

        Self {
            native: NativeProvider::default(),
            compatible,
        }
    }
}

impl ProviderSettings {
    /// Preset for a compatible provider id (case-insensitive).
    #[must_use]
    pub fn compatible_preset(&self, id: &str) -> Option<&CompatibleProvider> {
        self.compatible
            .get(id)
            .or_else(|| self.compatible.get(&id.to_ascii_lowercase()))
    }
}

/// Native backend settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NativeProvider {
    /// API root, without the `/models/...` suffix.
    pub base_url: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
}

impl Default for NativeProvider {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_owned(),
            api_key_env: "GEMINI_API_KEY".to_owned(),
        }
    }
}

/// One OpenAI-compatible backend.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompatibleProvider {
    /// API root; `/chat/completions` is appended.
    pub base_url: String,
    /// Environment variable holding the API key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    /// Whether dispatch must fail without a key.
    pub requires_key: bool,
}

/// Logging configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_owned(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
