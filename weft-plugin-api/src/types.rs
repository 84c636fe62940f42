//! Plugin types and metadata structures

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::PluginError;

/// Plugin manifest containing metadata about the plugin
///
/// Read from the `plugin.toml` file of a plugin package:
///
/// ```toml
/// name = "storage"
/// version = "1.2.0"
/// type = "SERVICE"
/// behaviors = ["kv-store"]
///
/// [accessors]
/// log = "logger"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Plugin name
    pub name: String,
    /// Plugin version (semver)
    pub version: String,
    /// Plugin API version the plugin was written against
    #[serde(default = "current_api_version")]
    pub api_version: u32,
    /// Runtime this plugin targets
    #[serde(rename = "type", default)]
    pub plugin_type: PluginType,
    /// Capability labels this plugin provides
    #[serde(default)]
    pub behaviors: Vec<String>,
    /// Dependency aliases, mapping the alias the plugin uses internally to the
    /// capability label it requires
    #[serde(default)]
    pub accessors: BTreeMap<String, String>,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
}

impl PluginManifest {
    /// Create a manifest with no behaviors or accessors
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            api_version: crate::API_VERSION,
            plugin_type: PluginType::default(),
            behaviors: Vec::new(),
            accessors: BTreeMap::new(),
            description: String::new(),
        }
    }

    /// Builder: declare a provided capability label
    pub fn with_behavior(mut self, behavior: impl Into<String>) -> Self {
        self.behaviors.push(behavior.into());
        self
    }

    /// Builder: require a capability label under an alias
    pub fn with_accessor(mut self, alias: impl Into<String>, label: impl Into<String>) -> Self {
        self.accessors.insert(alias.into(), label.into());
        self
    }

    /// Builder: set the plugin type
    pub fn with_type(mut self, plugin_type: PluginType) -> Self {
        self.plugin_type = plugin_type;
        self
    }

    /// Fully qualified name: `<name>-v<version>`
    pub fn fqn(&self) -> String {
        fully_qualified_name(&self.name, &self.version)
    }

    /// Check the fields the runtime keys on
    pub fn validate(&self) -> Result<(), PluginError> {
        if self.name.trim().is_empty() {
            return Err(PluginError::invalid_input("plugin name is empty"));
        }
        if self.name.chars().any(char::is_whitespace) {
            return Err(PluginError::invalid_input(format!(
                "plugin name '{}' contains whitespace",
                self.name
            )));
        }
        // Names become a single segment of the dotted settings path
        if self.name.contains('.') {
            return Err(PluginError::invalid_input(format!(
                "plugin name '{}' contains '.'",
                self.name
            )));
        }
        if self.version.trim().is_empty() {
            return Err(PluginError::invalid_input(format!(
                "plugin '{}' has an empty version",
                self.name
            )));
        }
        if self.api_version != crate::API_VERSION {
            return Err(PluginError::invalid_input(format!(
                "plugin '{}' targets API version {}, expected {}",
                self.name,
                self.api_version,
                crate::API_VERSION
            )));
        }
        Ok(())
    }
}

fn current_api_version() -> u32 {
    crate::API_VERSION
}

/// Build a fully qualified name from a name and version
pub fn fully_qualified_name(name: &str, version: &str) -> String {
    format!("{}-v{}", name, version)
}

/// Runtime a plugin targets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PluginType {
    /// Background service
    #[default]
    Service,
    /// UI code shared between the main and peer sides
    GuiCommon,
    /// UI code for the main side only
    GuiMain,
}

impl PluginType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Service => "SERVICE",
            Self::GuiCommon => "GUI_COMMON",
            Self::GuiMain => "GUI_MAIN",
        }
    }
}

impl fmt::Display for PluginType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PluginType {
    type Err = PluginError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "SERVICE" => Ok(Self::Service),
            "GUI_COMMON" => Ok(Self::GuiCommon),
            "GUI_MAIN" => Ok(Self::GuiMain),
            other => Err(PluginError::invalid_input(format!(
                "unknown plugin type '{}'",
                other
            ))),
        }
    }
}

/// Lifecycle status of a plugin instance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginStatus {
    /// Initial state, and the state after a successful stop
    #[default]
    Stopped,
    /// Running
    Started,
    /// Reserved, no transition leads here yet
    Paused,
    /// The last transition attempt failed
    Errored,
}

impl fmt::Display for PluginStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Stopped => "stopped",
            Self::Started => "started",
            Self::Paused => "paused",
            Self::Errored => "errored",
        };
        f.write_str(s)
    }
}
