//! weft-plugin-api - Plugin API for the weft plugin runtime
//!
//! This crate provides the trait and types needed to write plugins for weft.
//! A plugin declares what it provides (`behaviors`) and what it needs
//! (`accessors`) in its [`PluginManifest`]; the runtime resolves those into a
//! load order and drives each instance through enable and start.
//!
//! # Example
//!
//! ```
//! use weft_plugin_api::{Plugin, PluginError, async_trait};
//!
//! #[derive(Default)]
//! pub struct MyPlugin;
//!
//! #[async_trait]
//! impl Plugin for MyPlugin {
//!     async fn on_start(&self) -> Result<(), PluginError> {
//!         // open connections, spawn tasks, ...
//!         Ok(())
//!     }
//! }
//! ```

pub mod error;
pub mod types;

pub use async_trait::async_trait;
pub use error::PluginError;
pub use types::*;

/// Current plugin API version.
pub const API_VERSION: u32 = 1;

/// The core plugin trait - implement this to create a weft plugin.
///
/// Every hook has a default no-op implementation, so a plugin with no
/// overrides behaves like the bare lifecycle. Hooks run after the runtime has
/// checked the transition's precondition and before the new state is
/// committed; returning an error leaves the instance errored.
#[async_trait]
pub trait Plugin: Send + Sync + 'static {
    /// Called when the plugin is enabled
    async fn on_enable(&self) -> Result<(), PluginError> {
        Ok(())
    }

    /// Called when the plugin is started
    async fn on_start(&self) -> Result<(), PluginError> {
        Ok(())
    }

    /// Called when the plugin is stopped
    async fn on_stop(&self) -> Result<(), PluginError> {
        Ok(())
    }

    /// Called when the plugin is disabled, after it has been stopped
    async fn on_disable(&self) -> Result<(), PluginError> {
        Ok(())
    }
}
