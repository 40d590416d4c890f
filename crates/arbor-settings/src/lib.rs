//! # arbor-settings
//!
//! Layered settings for arbor. Compiled defaults are deep-merged with
//! `~/.arbor/settings.json`, then selected environment variables override
//! individual values.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{load_settings, load_settings_from_path, settings_path};
pub use types::{
    AgentSettings, ArborSettings, CompatibleProvider, LoggingSettings, NativeProvider,
    ProviderSettings,
};
