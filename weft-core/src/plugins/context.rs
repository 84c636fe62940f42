//! PluginContext - a plugin's view of the runtime
//!
//! Carries the plugin's identity, its resolved dependency aliases, the relay
//! and scoped access to the settings store.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use weft_plugin_api::Plugin;

use super::instance::PluginInstance;
use crate::relay::PluginRelay;
use crate::settings::{SettingsError, SettingsStore, plugin_setting_path};

/// Dependency alias to the live instances that satisfy it
pub type AccessorMap = BTreeMap<String, Vec<Arc<PluginInstance>>>;

#[derive(Clone)]
pub struct PluginContext {
    name: String,
    fqn: String,
    settings: Arc<dyn SettingsStore>,
    relay: PluginRelay,
    accessors: AccessorMap,
}

impl PluginContext {
    pub fn new(
        name: impl Into<String>,
        fqn: impl Into<String>,
        settings: Arc<dyn SettingsStore>,
        relay: PluginRelay,
    ) -> Self {
        Self {
            name: name.into(),
            fqn: fqn.into(),
            settings,
            relay,
            accessors: AccessorMap::new(),
        }
    }

    /// Builder: set the resolved dependency aliases
    pub fn with_accessors(mut self, accessors: AccessorMap) -> Self {
        self.accessors = accessors;
        self
    }

    pub fn plugin_name(&self) -> &str {
        &self.name
    }

    pub fn fqn(&self) -> &str {
        &self.fqn
    }

    pub fn relay(&self) -> &PluginRelay {
        &self.relay
    }

    // ─── Dependencies ────────────────────────────────────────────────

    /// All resolved dependency aliases
    pub fn accessors(&self) -> &AccessorMap {
        &self.accessors
    }

    /// Instances injected under `alias`; empty when the alias is unknown
    pub fn accessor(&self, alias: &str) -> &[Arc<PluginInstance>] {
        self.accessors.get(alias).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First instance under `alias` whose plugin is a `T`
    pub fn accessor_plugin<T: Plugin>(&self, alias: &str) -> Option<Arc<T>> {
        self.accessor(alias)
            .iter()
            .find_map(|instance| instance.downcast::<T>())
    }

    // ─── Settings ────────────────────────────────────────────────────

    /// Raw setting value at `Plugins.<name>.<path>`
    pub fn setting_value(&self, path: &str) -> Option<toml::Value> {
        self.settings.get(&plugin_setting_path(&self.name, path))
    }

    /// Read a setting
    ///
    /// # Example
    /// ```ignore
    /// let retries: Option<u32> = ctx.get_setting("retries");
    /// ```
    pub fn get_setting<T: DeserializeOwned>(&self, path: &str) -> Option<T> {
        self.setting_value(path).and_then(|v| v.try_into().ok())
    }

    /// Write a setting
    pub fn set_setting<T: Serialize>(&self, path: &str, value: T) -> Result<(), SettingsError> {
        let value =
            toml::Value::try_from(value).map_err(|e| SettingsError::Serialization(e.to_string()))?;
        self.settings
            .set(&plugin_setting_path(&self.name, path), value)
    }
}

impl std::fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginContext")
            .field("name", &self.name)
            .field("fqn", &self.fqn)
            .field("accessors", &self.accessors.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::RelayHub;
    use crate::settings::MemorySettings;

    fn context(settings: Arc<MemorySettings>) -> PluginContext {
        PluginContext::new("fakePlugin", "fakePlugin-v1.0.0", settings, RelayHub::default().main())
    }

    #[test]
    fn test_get_setting_is_scoped_to_plugin() {
        let settings = Arc::new(MemorySettings::new());
        settings
            .set("Plugins.fakePlugin.someSetting", toml::Value::Integer(3))
            .unwrap();

        let ctx = context(settings);
        assert_eq!(ctx.get_setting::<i64>("someSetting"), Some(3));
        assert_eq!(ctx.get_setting::<i64>("missing"), None);
    }

    #[test]
    fn test_set_setting_is_scoped_to_plugin() {
        let settings = Arc::new(MemorySettings::new());
        let ctx = context(settings.clone());

        ctx.set_setting("anotherSetting", "someValue").unwrap();

        assert_eq!(
            settings.get("Plugins.fakePlugin.anotherSetting"),
            Some(toml::Value::String("someValue".to_string()))
        );
    }

    #[test]
    fn test_unknown_accessor_is_empty() {
        let ctx = context(Arc::new(MemorySettings::new()));
        assert!(ctx.accessor("nope").is_empty());
        assert!(ctx.accessors().is_empty());
    }
}
