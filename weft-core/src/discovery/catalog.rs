//! PluginCatalog - factories for plugin types compiled into the binary

use std::collections::HashMap;

use crate::plugins::{PluginDescriptor, PluginFactory};

use super::DiscoveredPlugin;

/// Maps plugin names to the factories that build them
///
/// A discovered manifest with no registered factory gets the bare lifecycle.
#[derive(Default, Clone)]
pub struct PluginCatalog {
    factories: HashMap<String, PluginFactory>,
}

impl PluginCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the factory for plugins named `name`
    pub fn register(&mut self, name: impl Into<String>, factory: PluginFactory) {
        self.factories.insert(name.into(), factory);
    }

    /// Builder form of [`register`](Self::register)
    pub fn with(mut self, name: impl Into<String>, factory: PluginFactory) -> Self {
        self.register(name, factory);
        self
    }

    /// Pair each discovered manifest with its factory
    pub fn descriptors(&self, discovered: Vec<DiscoveredPlugin>) -> Vec<PluginDescriptor> {
        discovered
            .into_iter()
            .map(|plugin| {
                let factory = match self.factories.get(&plugin.manifest.name) {
                    Some(factory) => factory.clone(),
                    None => {
                        tracing::debug!(
                            plugin = %plugin.manifest.name,
                            "No compiled-in factory, using basic plugin"
                        );
                        PluginFactory::basic()
                    }
                };
                PluginDescriptor::new(plugin.manifest, factory).with_path(plugin.path)
            })
            .collect()
    }
}
