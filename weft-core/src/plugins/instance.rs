//! PluginInstance - a constructed plugin and its lifecycle state
//!
//! Every instance starts `Stopped`. Start, stop, enable and disable check
//! their precondition, run the plugin's hook and only then commit the new
//! state. A failed precondition or hook leaves the instance `Errored` until
//! the next successful transition.

use std::future::Future;
use std::sync::{Arc, Mutex};

use weft_plugin_api::{Plugin, PluginError, PluginManifest, PluginStatus};

use super::context::PluginContext;
use super::descriptor::{PluginDescriptor, PluginHandle};
use super::error::{LifecycleError, LifecycleStage};

#[derive(Debug, Clone, Copy)]
struct LifecycleState {
    enabled: bool,
    status: PluginStatus,
}

pub struct PluginInstance {
    descriptor: PluginDescriptor,
    manifest: PluginManifest,
    handle: PluginHandle,
    context: PluginContext,
    state: Mutex<LifecycleState>,
}

impl PluginInstance {
    /// Construct the plugin through its descriptor's factory
    ///
    /// `enabled` starts from the `Plugins.<name>.enabled` setting (default
    /// false), and the plugin's own name is added to its behaviors.
    pub fn new(descriptor: PluginDescriptor, context: PluginContext) -> Result<Self, PluginError> {
        let handle = descriptor.factory().build(&context)?;
        let enabled = context.get_setting::<bool>("enabled").unwrap_or(false);

        let mut manifest = descriptor.manifest().clone();
        if !manifest.behaviors.contains(&manifest.name) {
            manifest.behaviors.push(manifest.name.clone());
        }

        Ok(Self {
            descriptor,
            manifest,
            handle,
            context,
            state: Mutex::new(LifecycleState {
                enabled,
                status: PluginStatus::Stopped,
            }),
        })
    }

    pub fn fqn(&self) -> &str {
        self.descriptor.fqn()
    }

    pub fn name(&self) -> &str {
        &self.manifest.name
    }

    pub fn manifest(&self) -> &PluginManifest {
        &self.manifest
    }

    pub fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    pub fn context(&self) -> &PluginContext {
        &self.context
    }

    pub fn plugin(&self) -> &dyn Plugin {
        self.handle.plugin()
    }

    /// The concrete plugin, if it is a `T`
    pub fn downcast<T: Plugin>(&self) -> Option<Arc<T>> {
        self.handle.downcast::<T>()
    }

    pub fn is_enabled(&self) -> bool {
        self.state.lock().unwrap().enabled
    }

    pub fn status(&self) -> PluginStatus {
        self.state.lock().unwrap().status
    }

    // ─── Lifecycle ───────────────────────────────────────────────────

    pub async fn enable(&self) -> Result<(), LifecycleError> {
        {
            let mut state = self.state.lock().unwrap();
            if state.enabled {
                state.status = PluginStatus::Errored;
                return Err(LifecycleError::AlreadyEnabled {
                    name: self.name().to_string(),
                });
            }
        }

        self.run_hook(LifecycleStage::Enable, self.plugin().on_enable())
            .await?;
        self.state.lock().unwrap().enabled = true;
        Ok(())
    }

    /// Run the enable hook for an instance whose gate was opened from settings
    pub(crate) async fn activate(&self) -> Result<(), LifecycleError> {
        self.run_hook(LifecycleStage::Enable, self.plugin().on_enable())
            .await?;
        self.state.lock().unwrap().enabled = true;
        Ok(())
    }

    /// Stop, then disable. A failed stop leaves the instance enabled.
    pub async fn disable(&self) -> Result<(), LifecycleError> {
        self.require_enabled()?;
        self.stop().await?;

        self.run_hook(LifecycleStage::Disable, self.plugin().on_disable())
            .await?;
        self.state.lock().unwrap().enabled = false;
        Ok(())
    }

    pub async fn start(&self) -> Result<(), LifecycleError> {
        self.require_enabled()?;
        self.run_hook(LifecycleStage::Start, self.plugin().on_start())
            .await?;
        self.set_status(PluginStatus::Started);
        Ok(())
    }

    pub async fn stop(&self) -> Result<(), LifecycleError> {
        self.require_enabled()?;
        self.run_hook(LifecycleStage::Stop, self.plugin().on_stop())
            .await?;
        self.set_status(PluginStatus::Stopped);
        Ok(())
    }

    /// Stop, then start. A failed stop skips the start.
    pub async fn restart(&self) -> Result<(), LifecycleError> {
        self.stop().await?;
        self.start().await
    }

    fn require_enabled(&self) -> Result<(), LifecycleError> {
        let mut state = self.state.lock().unwrap();
        if !state.enabled {
            state.status = PluginStatus::Errored;
            return Err(LifecycleError::NotEnabled {
                name: self.name().to_string(),
            });
        }
        Ok(())
    }

    fn set_status(&self, status: PluginStatus) {
        self.state.lock().unwrap().status = status;
    }

    async fn run_hook(
        &self,
        stage: LifecycleStage,
        hook: impl Future<Output = Result<(), PluginError>>,
    ) -> Result<(), LifecycleError> {
        hook.await.map_err(|source| {
            self.set_status(PluginStatus::Errored);
            tracing::warn!(plugin = %self.fqn(), %stage, error = %source, "Plugin hook failed");
            LifecycleError::Hook {
                name: self.name().to_string(),
                stage,
                source,
            }
        })
    }
}

impl std::fmt::Debug for PluginInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = *self.state.lock().unwrap();
        f.debug_struct("PluginInstance")
            .field("fqn", &self.fqn())
            .field("enabled", &state.enabled)
            .field("status", &state.status)
            .finish()
    }
}
