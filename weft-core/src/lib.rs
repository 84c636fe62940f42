//! weft-core: plugin runtime for weft
//!
//! This crate resolves plugins into a safe load order and runs them:
//!
//! - **Plugin runtime** - [`PluginHost`] registers descriptors, resolves their
//!   capability dependencies and loads every plugin once, dependencies first
//! - **Lifecycle** - [`PluginInstance`] with its enable gate and status
//! - **Discovery** - [`PluginScanner`] reads `plugin.toml` manifests from disk
//! - **Settings** - [`SettingsStore`] with in-memory and TOML file backends
//! - **Relay** - [`RelayHub`] named messages between a main side and its peers
//!
//! # Architecture
//!
//! ```text
//! PluginScanner -> PluginCatalog -> PluginHost
//!                                   ├── CapabilityRegistry  (label -> FQNs)
//!                                   ├── ChainMap            (label -> FQNs to load first)
//!                                   ├── instances           (FQN -> PluginInstance)
//!                                   └── failures            (FQN -> DependencyChainError)
//! ```

pub mod config;
pub mod discovery;
pub mod plugins;
pub mod relay;
pub mod settings;

// Re-export key types for convenience
pub use config::{ConfigError, PluginHostConfig};
pub use discovery::{DiscoveredPlugin, DiscoveryError, PluginCatalog, PluginScanner};
pub use plugins::{
    ChainCause, DependencyChainError, LifecycleError, LoadEvent, PluginContext, PluginDescriptor,
    PluginFactory, PluginHost, PluginHostError, PluginInstance,
};
pub use relay::{PluginRelay, RelayHub};
pub use settings::{FileSettings, MemorySettings, SettingsError, SettingsStore};
