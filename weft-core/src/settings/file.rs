//! File-backed settings store
//!
//! Stored as TOML in `~/.config/weft/settings.toml` by default.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{MemorySettings, SettingsError, SettingsStore};

/// Settings persisted to a TOML file, written back on every `set`
#[derive(Debug)]
pub struct FileSettings {
    path: PathBuf,
    values: MemorySettings,
    /// Serializes writers so the file always matches the last committed value
    write_lock: Mutex<()>,
}

impl FileSettings {
    /// Load settings from a TOML file
    ///
    /// Returns an empty store if the file doesn't exist.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();
        let table = if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|source| SettingsError::Io {
                path: path.clone(),
                source,
            })?;
            toml::from_str(&content).map_err(|e| SettingsError::Serialization(e.to_string()))?
        } else {
            toml::Table::new()
        };

        Ok(Self {
            path,
            values: MemorySettings::from_table(table),
            write_lock: Mutex::new(()),
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, table: &toml::Table) -> Result<(), SettingsError> {
        let content = toml::to_string_pretty(table)
            .map_err(|e| SettingsError::Serialization(e.to_string()))?;

        // Create parent directory if it doesn't exist
        if let Some(parent) = self.path.parent().filter(|p| !p.exists()) {
            std::fs::create_dir_all(parent).map_err(|source| SettingsError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        std::fs::write(&self.path, content).map_err(|source| SettingsError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl SettingsStore for FileSettings {
    fn get(&self, path: &str) -> Option<toml::Value> {
        self.values.get(path)
    }

    fn set(&self, path: &str, value: toml::Value) -> Result<(), SettingsError> {
        let _guard = self.write_lock.lock().unwrap();

        // Memory only changes once the file has been written
        let candidate = MemorySettings::from_table(self.values.snapshot());
        candidate.set(path, value.clone())?;
        self.save(&candidate.snapshot())?;

        self.values.set(path, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_file_is_empty() {
        let settings = FileSettings::load("/nonexistent/path/settings.toml").unwrap();
        assert!(settings.get("Plugins.any.enabled").is_none());
    }

    #[test]
    fn test_set_persists_to_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/dir/settings.toml");

        let settings = FileSettings::load(&path).unwrap();
        settings
            .set("Plugins.storage.enabled", toml::Value::Boolean(true))
            .unwrap();
        assert!(path.exists());

        let reloaded = FileSettings::load(&path).unwrap();
        assert_eq!(
            reloaded.get("Plugins.storage.enabled"),
            Some(toml::Value::Boolean(true))
        );
    }

    #[test]
    fn test_failed_write_leaves_values_untouched() {
        let dir = TempDir::new().unwrap();
        // A plain file where the parent directory should be
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();

        let settings = FileSettings::load(blocker.join("settings.toml")).unwrap();
        let err = settings
            .set("Plugins.storage.enabled", toml::Value::Boolean(true))
            .unwrap_err();

        assert!(matches!(err, SettingsError::Io { .. }));
        assert!(settings.get("Plugins.storage.enabled").is_none());
    }

    #[test]
    fn test_load_invalid_toml_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "this is = = not toml").unwrap();

        let err = FileSettings::load(&path).unwrap_err();
        assert!(matches!(err, SettingsError::Serialization(_)));
    }
}
