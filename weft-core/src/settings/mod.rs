//! Settings store - dotted-path key/value storage for plugin settings
//!
//! Plugins read and write settings through their [`PluginContext`], which
//! scopes every key under `Plugins.<plugin name>.`. The store itself is a
//! nested TOML table addressed by dotted paths such as
//! `Plugins.storage.enabled`.
//!
//! [`PluginContext`]: crate::plugins::PluginContext

mod file;
mod memory;

pub use file::FileSettings;
pub use memory::MemorySettings;

use std::path::PathBuf;
use thiserror::Error;

/// Root table for all plugin settings
pub const PLUGINS_ROOT_KEY: &str = "Plugins";

/// Build the store path for a plugin-scoped setting
pub fn plugin_setting_path(plugin_name: &str, setting: &str) -> String {
    format!("{}.{}.{}", PLUGINS_ROOT_KEY, plugin_name, setting)
}

/// Errors from a settings store
#[derive(Error, Debug)]
pub enum SettingsError {
    /// The path was empty or had an empty segment
    #[error("Invalid settings path: '{0}'")]
    InvalidPath(String),

    /// A non-table value sits where the path needs a table
    #[error("Settings path '{path}' crosses a non-table value at '{segment}'")]
    NotATable { path: String, segment: String },

    /// The value could not be converted to or from TOML
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Reading or writing the settings file failed
    #[error("Settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Key/value storage addressed by dotted paths
pub trait SettingsStore: Send + Sync {
    /// Read the value at `path`, if any
    fn get(&self, path: &str) -> Option<toml::Value>;

    /// Write `value` at `path`, creating intermediate tables
    fn set(&self, path: &str, value: toml::Value) -> Result<(), SettingsError>;
}

pub(crate) fn split_path(path: &str) -> Result<Vec<&str>, SettingsError> {
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(SettingsError::InvalidPath(path.to_string()));
    }
    Ok(segments)
}
