//! In-memory settings store

use std::sync::RwLock;

use super::{SettingsError, SettingsStore, split_path};

/// Settings held in a nested TOML table
#[derive(Debug, Default)]
pub struct MemorySettings {
    root: RwLock<toml::Table>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with an existing table
    pub fn from_table(table: toml::Table) -> Self {
        Self {
            root: RwLock::new(table),
        }
    }

    /// Copy of the whole table
    pub fn snapshot(&self) -> toml::Table {
        self.root.read().unwrap().clone()
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, path: &str) -> Option<toml::Value> {
        let segments = split_path(path).ok()?;
        let root = self.root.read().unwrap();

        let (last, parents) = segments.split_last()?;
        let mut table = &*root;
        for segment in parents {
            table = table.get(*segment)?.as_table()?;
        }
        table.get(*last).cloned()
    }

    fn set(&self, path: &str, value: toml::Value) -> Result<(), SettingsError> {
        let segments = split_path(path)?;
        let mut root = self.root.write().unwrap();

        let Some((last, parents)) = segments.split_last() else {
            return Err(SettingsError::InvalidPath(path.to_string()));
        };
        let mut table = &mut *root;
        for segment in parents {
            let entry = table
                .entry(segment.to_string())
                .or_insert_with(|| toml::Value::Table(toml::Table::new()));
            table = entry
                .as_table_mut()
                .ok_or_else(|| SettingsError::NotATable {
                    path: path.to_string(),
                    segment: segment.to_string(),
                })?;
        }
        table.insert(last.to_string(), value);
        Ok(())
    }
}
