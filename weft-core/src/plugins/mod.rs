//! Plugin runtime
//!
//! This module provides the infrastructure for resolving and running plugins:
//!
//! - [`PluginDescriptor`]: a manifest plus the factory that builds the plugin
//! - [`CapabilityRegistry`]: which descriptors provide which capability labels
//! - [`ChainMap`]: what has to load before what, with cycle detection
//! - [`PluginHost`]: loads every plugin exactly once, dependencies first
//! - [`PluginInstance`]: the enable gate and the lifecycle status of one plugin
//!
//! # Capability labels
//!
//! Every plugin provides its own fully qualified name (`<name>-v<version>`),
//! each behavior it declares, and each behavior suffixed with its version.
//! Accessors name the label they need; the host injects every live provider
//! of that label under the accessor's alias.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use weft_core::plugins::{PluginDescriptor, PluginHost};
//! use weft_core::relay::RelayHub;
//! use weft_core::settings::MemorySettings;
//! use weft_plugin_api::PluginManifest;
//!
//! let host = PluginHost::new(Arc::new(MemorySettings::new()), RelayHub::default(), 64);
//!
//! host.load_plugin_definitions(vec![
//!     PluginDescriptor::basic(PluginManifest::new("app", "1.0.0").with_accessor("log", "logger")),
//!     PluginDescriptor::basic(PluginManifest::new("console", "1.0.0").with_behavior("logger")),
//! ])
//! .await?;
//!
//! // console-v1.0.0 was started before app-v1.0.0
//! let app = host.instance("app-v1.0.0").unwrap();
//! assert_eq!(app.context().accessor("log").len(), 1);
//! ```

mod capabilities;
mod chain;
mod context;
mod descriptor;
mod error;
mod host;
mod instance;
mod progress;

pub use capabilities::{CapabilityRegistry, Registration};
pub use chain::ChainMap;
pub use context::{AccessorMap, PluginContext};
pub use descriptor::{BasicPlugin, PluginDescriptor, PluginFactory, PluginHandle};
pub use error::{
    ChainCause, DependencyChainError, LifecycleError, LifecycleStage, PluginHostError,
};
pub use host::{LoadOutcome, PluginHost};
pub use instance::PluginInstance;
pub use progress::{LoadEvent, LoadProgress};
