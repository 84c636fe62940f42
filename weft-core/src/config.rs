//! Plugin host configuration

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use weft_plugin_api::PluginType;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Configuration for PluginHost
///
/// ```toml
/// project_plugin_dir = ".weft/plugins"
/// plugin_types = ["SERVICE", "GUI_COMMON"]
/// relay_capacity = 128
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginHostConfig {
    /// User plugin directory (~/.config/weft/plugins)
    pub user_plugin_dir: PathBuf,
    /// Project-level plugin directory, scanned before the user directory
    pub project_plugin_dir: Option<PathBuf>,
    /// Plugin types this runtime loads
    pub plugin_types: Vec<PluginType>,
    /// Settings file backing `Plugins.<name>.*`
    pub settings_path: PathBuf,
    /// Per-endpoint buffer of the message relay
    pub relay_capacity: usize,
    /// Buffer of the load progress channel
    pub event_capacity: usize,
}

impl Default for PluginHostConfig {
    fn default() -> Self {
        Self {
            user_plugin_dir: weft_paths::user_plugin_dir(),
            project_plugin_dir: None,
            plugin_types: vec![PluginType::Service],
            settings_path: weft_paths::settings_path(),
            relay_capacity: 64,
            event_capacity: 64,
        }
    }
}

impl PluginHostConfig {
    /// Load configuration from a TOML file
    ///
    /// Returns the defaults if the file doesn't exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Plugin directories to scan, project first
    pub fn plugin_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        if let Some(project_dir) = &self.project_plugin_dir {
            dirs.push(project_dir.clone());
        }
        dirs.push(self.user_plugin_dir.clone());
        dirs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = PluginHostConfig::default();
        assert_eq!(config.plugin_types, vec![PluginType::Service]);
        assert_eq!(config.relay_capacity, 64);
        assert_eq!(config.event_capacity, 64);
        assert!(config.user_plugin_dir.ends_with("plugins"));
        assert!(config.settings_path.ends_with("settings.toml"));
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let config = PluginHostConfig::load(&temp.path().join("nope.toml")).unwrap();
        assert_eq!(config, PluginHostConfig::default());
    }

    #[test]
    fn test_load_partial_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("weft.toml");
        std::fs::write(
            &path,
            r#"
project_plugin_dir = "/work/.weft/plugins"
plugin_types = ["SERVICE", "GUI_COMMON"]
relay_capacity = 128
"#,
        )
        .unwrap();

        let config = PluginHostConfig::load(&path).unwrap();
        assert_eq!(
            config.plugin_types,
            vec![PluginType::Service, PluginType::GuiCommon]
        );
        assert_eq!(config.relay_capacity, 128);
        assert_eq!(config.event_capacity, 64);
        assert_eq!(
            config.plugin_dirs(),
            vec![
                PathBuf::from("/work/.weft/plugins"),
                config.user_plugin_dir.clone()
            ]
        );
    }

    #[test]
    fn test_load_invalid_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("weft.toml");
        std::fs::write(&path, "relay_capacity = \"lots\"").unwrap();

        let err = PluginHostConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
