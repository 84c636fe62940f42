//! Plugin manifest discovery
//!
//! Each scan directory holds one subdirectory per plugin, with the plugin's
//! manifest in `plugin.toml`:
//!
//! ```text
//! plugins/
//! ├── console/
//! │   └── plugin.toml
//! └── app/
//!     └── plugin.toml
//! ```

mod catalog;

pub use catalog::PluginCatalog;

use std::path::{Path, PathBuf};

use thiserror::Error;
use weft_plugin_api::{PluginError, PluginManifest, PluginType};

/// Manifest file name inside a plugin directory
pub const MANIFEST_FILE: &str = "plugin.toml";

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid manifest {}: {source}", .path.display())]
    Manifest {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid plugin {}: {source}", .path.display())]
    Invalid {
        path: PathBuf,
        #[source]
        source: PluginError,
    },
}

/// A manifest found on disk
#[derive(Debug, Clone)]
pub struct DiscoveredPlugin {
    pub manifest: PluginManifest,
    /// The plugin's directory
    pub path: PathBuf,
}

/// Scans plugin directories for manifests of the wanted plugin types
#[derive(Debug, Clone)]
pub struct PluginScanner {
    dirs: Vec<PathBuf>,
    types: Vec<PluginType>,
}

impl PluginScanner {
    pub fn new(dirs: Vec<PathBuf>, types: Vec<PluginType>) -> Self {
        Self { dirs, types }
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Scan every directory in order
    pub fn scan(&self) -> Result<Vec<DiscoveredPlugin>, DiscoveryError> {
        tracing::debug!(dirs = self.dirs.len(), "Scanning for plugin manifests");

        let mut found = Vec::new();
        for dir in &self.dirs {
            found.extend(self.scan_dir(dir)?);
        }

        tracing::debug!(count = found.len(), "Plugin scan complete");
        Ok(found)
    }

    fn scan_dir(&self, dir: &Path) -> Result<Vec<DiscoveredPlugin>, DiscoveryError> {
        if !dir.exists() {
            tracing::debug!(dir = %dir.display(), "Plugin directory does not exist");
            return Ok(Vec::new());
        }

        let io_err = |source| DiscoveryError::Io {
            path: dir.to_path_buf(),
            source,
        };

        let mut plugin_dirs = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.is_dir() {
                plugin_dirs.push(path);
            }
        }
        plugin_dirs.sort();

        let mut found = Vec::new();
        for plugin_dir in plugin_dirs {
            let Some(manifest) = read_manifest(&plugin_dir)? else {
                continue;
            };

            if !self.types.contains(&manifest.plugin_type) {
                tracing::debug!(
                    plugin = %manifest.name,
                    plugin_type = %manifest.plugin_type,
                    "Plugin type not wanted, skipping"
                );
                continue;
            }

            tracing::debug!(plugin = %manifest.name, version = %manifest.version, "Detected plugin");
            found.push(DiscoveredPlugin {
                manifest,
                path: plugin_dir,
            });
        }

        Ok(found)
    }
}

/// Read and validate `<dir>/plugin.toml`, if there is one
pub fn read_manifest(dir: &Path) -> Result<Option<PluginManifest>, DiscoveryError> {
    let path = dir.join(MANIFEST_FILE);
    if !path.is_file() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(&path).map_err(|source| DiscoveryError::Io {
        path: path.clone(),
        source,
    })?;
    let manifest: PluginManifest =
        toml::from_str(&content).map_err(|source| DiscoveryError::Manifest {
            path: path.clone(),
            source,
        })?;
    manifest
        .validate()
        .map_err(|source| DiscoveryError::Invalid { path, source })?;

    Ok(Some(manifest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_plugin(root: &Path, dir: &str, manifest: &str) {
        let plugin_dir = root.join(dir);
        std::fs::create_dir_all(&plugin_dir).unwrap();
        std::fs::write(plugin_dir.join(MANIFEST_FILE), manifest).unwrap();
    }

    #[test]
    fn test_scan_reads_manifests_in_directory_order() {
        let temp = TempDir::new().unwrap();
        write_plugin(
            temp.path(),
            "b-app",
            r#"
name = "app"
version = "1.0.0"

[accessors]
log = "logger"
"#,
        );
        write_plugin(
            temp.path(),
            "a-console",
            r#"
name = "console"
version = "1.0.0"
behaviors = ["logger"]
"#,
        );

        let scanner = PluginScanner::new(vec![temp.path().to_path_buf()], vec![PluginType::Service]);
        let found = scanner.scan().unwrap();

        let names: Vec<&str> = found.iter().map(|p| p.manifest.name.as_str()).collect();
        assert_eq!(names, vec!["console", "app"]);
        assert_eq!(found[0].path, temp.path().join("a-console"));
        assert_eq!(found[1].manifest.accessors["log"], "logger");
    }

    #[test]
    fn test_scan_filters_by_type() {
        let temp = TempDir::new().unwrap();
        write_plugin(temp.path(), "svc", "name = \"svc\"\nversion = \"1\"\n");
        write_plugin(
            temp.path(),
            "gui",
            "name = \"gui\"\nversion = \"1\"\ntype = \"GUI_MAIN\"\n",
        );

        let services = PluginScanner::new(vec![temp.path().to_path_buf()], vec![PluginType::Service])
            .scan()
            .unwrap();
        assert_eq!(services.len(), 1);
        assert_eq!(services[0].manifest.name, "svc");

        let everything = PluginScanner::new(
            vec![temp.path().to_path_buf()],
            vec![PluginType::Service, PluginType::GuiMain],
        )
        .scan()
        .unwrap();
        assert_eq!(everything.len(), 2);
    }

    #[test]
    fn test_scan_skips_missing_dirs_and_plain_files() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("README.md"), "not a plugin").unwrap();
        std::fs::create_dir(temp.path().join("empty")).unwrap();

        let scanner = PluginScanner::new(
            vec![temp.path().join("missing"), temp.path().to_path_buf()],
            vec![PluginType::Service],
        );
        assert!(scanner.scan().unwrap().is_empty());
    }

    #[test]
    fn test_scan_project_dir_first() {
        let project = TempDir::new().unwrap();
        let user = TempDir::new().unwrap();
        write_plugin(project.path(), "p", "name = \"project\"\nversion = \"1\"\n");
        write_plugin(user.path(), "u", "name = \"user\"\nversion = \"1\"\n");

        let scanner = PluginScanner::new(
            vec![project.path().to_path_buf(), user.path().to_path_buf()],
            vec![PluginType::Service],
        );
        let names: Vec<String> = scanner
            .scan()
            .unwrap()
            .into_iter()
            .map(|p| p.manifest.name)
            .collect();
        assert_eq!(names, vec!["project", "user"]);
    }

    #[test]
    fn test_invalid_manifest_fails_scan() {
        let temp = TempDir::new().unwrap();
        write_plugin(temp.path(), "broken", "name = [");

        let err = PluginScanner::new(vec![temp.path().to_path_buf()], vec![PluginType::Service])
            .scan()
            .unwrap_err();
        assert!(matches!(err, DiscoveryError::Manifest { .. }));
    }

    #[test]
    fn test_manifest_without_version_is_invalid() {
        let temp = TempDir::new().unwrap();
        write_plugin(temp.path(), "nover", "name = \"nover\"\nversion = \"\"\n");

        let err = read_manifest(&temp.path().join("nover")).unwrap_err();
        assert!(matches!(err, DiscoveryError::Invalid { .. }));
    }
}
