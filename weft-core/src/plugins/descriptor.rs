//! Plugin descriptors - static identity plus the means to construct an instance

use std::any::Any;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use weft_plugin_api::{Plugin, PluginError, PluginManifest, PluginType};

use super::context::PluginContext;

type FactoryFn = dyn Fn(&PluginContext) -> Result<PluginHandle, PluginError> + Send + Sync;

/// Constructor for a plugin type
///
/// The factory receives the plugin's context, with its dependency aliases
/// already resolved to live instances.
#[derive(Clone)]
pub struct PluginFactory(Arc<FactoryFn>);

impl PluginFactory {
    pub fn new<P, F>(factory: F) -> Self
    where
        P: Plugin,
        F: Fn(&PluginContext) -> Result<P, PluginError> + Send + Sync + 'static,
    {
        Self(Arc::new(move |ctx| factory(ctx).map(PluginHandle::new)))
    }

    /// Factory for plugins with no behaviour beyond the lifecycle itself
    pub fn basic() -> Self {
        Self::new(|_| Ok(BasicPlugin))
    }

    pub(crate) fn build(&self, ctx: &PluginContext) -> Result<PluginHandle, PluginError> {
        (self.0)(ctx)
    }
}

impl fmt::Debug for PluginFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PluginFactory")
    }
}

/// Lifecycle-only plugin used for manifests with no compiled-in type
#[derive(Debug, Default, Clone, Copy)]
pub struct BasicPlugin;

impl Plugin for BasicPlugin {}

/// A constructed plugin, viewable both as `dyn Plugin` and as its concrete type
#[derive(Clone)]
pub struct PluginHandle {
    plugin: Arc<dyn Plugin>,
    any: Arc<dyn Any + Send + Sync>,
}

impl PluginHandle {
    pub fn new<P: Plugin>(plugin: P) -> Self {
        let plugin = Arc::new(plugin);
        Self {
            plugin: plugin.clone(),
            any: plugin,
        }
    }

    pub fn plugin(&self) -> &dyn Plugin {
        self.plugin.as_ref()
    }

    /// The concrete plugin, if it is a `T`
    pub fn downcast<T: Plugin>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.any).downcast::<T>().ok()
    }
}

/// A discovered plugin: its manifest and how to construct it
///
/// The fully qualified name (`<name>-v<version>`) is derived once and is the
/// descriptor's identity for its whole lifetime. The FQN is always part of
/// the declared capabilities, so every plugin can be required by identity.
#[derive(Debug, Clone)]
pub struct PluginDescriptor {
    fqn: String,
    manifest: PluginManifest,
    factory: PluginFactory,
    path: Option<PathBuf>,
}

impl PluginDescriptor {
    pub fn new(manifest: PluginManifest, factory: PluginFactory) -> Self {
        let fqn = manifest.fqn();
        let mut manifest = manifest;
        if !manifest.behaviors.contains(&fqn) {
            manifest.behaviors.push(fqn.clone());
        }

        Self {
            fqn,
            manifest,
            factory,
            path: None,
        }
    }

    /// Descriptor for a manifest-only plugin
    pub fn basic(manifest: PluginManifest) -> Self {
        Self::new(manifest, PluginFactory::basic())
    }

    /// Builder: record the package directory the manifest came from
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn fqn(&self) -> &str {
        &self.fqn
    }

    pub fn name(&self) -> &str {
        &self.manifest.name
    }

    pub fn version(&self) -> &str {
        &self.manifest.version
    }

    pub fn plugin_type(&self) -> PluginType {
        self.manifest.plugin_type
    }

    pub fn manifest(&self) -> &PluginManifest {
        &self.manifest
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    /// Declared capability labels, the FQN included
    pub fn capabilities(&self) -> &[String] {
        &self.manifest.behaviors
    }

    pub(crate) fn factory(&self) -> &PluginFactory {
        &self.factory
    }
}
