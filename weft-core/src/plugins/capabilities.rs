//! Capability registry - which descriptors provide which capability labels
//!
//! Every descriptor is registered under its own FQN, under each behavior it
//! declares, and under a version-suffixed alias of each behavior
//! (`<behavior>-v<version>`) so a dependent can pin an exact version of a
//! capability. A generic label may fan out to many providers; an FQN always
//! resolves to exactly one.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use weft_plugin_api::fully_qualified_name;

use super::descriptor::PluginDescriptor;
use super::error::PluginHostError;

/// Outcome of registering a batch of descriptors
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Registration {
    /// Newly registered FQNs, in batch order
    pub registered: Vec<String>,
    /// FQNs skipped because they already have a live instance
    pub already_loaded: Vec<String>,
}

#[derive(Debug, Default)]
pub struct CapabilityRegistry {
    descriptors: BTreeMap<String, PluginDescriptor>,
    providers: BTreeMap<String, BTreeSet<String>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a batch of descriptors
    ///
    /// Fails without registering anything when two descriptors in the batch
    /// share an FQN. Descriptors for which `is_live` holds are left out and
    /// reported in [`Registration::already_loaded`].
    pub fn register(
        &mut self,
        descriptors: Vec<PluginDescriptor>,
        is_live: impl Fn(&str) -> bool,
    ) -> Result<Registration, PluginHostError> {
        check_duplicates(&descriptors)?;

        let mut registration = Registration::default();
        for descriptor in descriptors {
            let fqn = descriptor.fqn().to_string();
            if is_live(&fqn) {
                registration.already_loaded.push(fqn);
                continue;
            }

            // A re-registered identity replaces its previous labels
            self.unregister(&fqn);
            self.insert(descriptor);
            registration.registered.push(fqn);
        }

        Ok(registration)
    }

    fn insert(&mut self, descriptor: PluginDescriptor) {
        let fqn = descriptor.fqn().to_string();

        // An identity label belongs to exactly one descriptor, even if a
        // versioned alias got there first
        self.providers
            .insert(fqn.clone(), BTreeSet::from([fqn.clone()]));

        for label in descriptor.capabilities() {
            if *label == fqn {
                continue;
            }
            self.add_provider(label, &fqn);

            let versioned = fully_qualified_name(label, descriptor.version());
            if !self.descriptors.contains_key(&versioned) && versioned != fqn {
                self.add_provider(&versioned, &fqn);
            }
        }

        self.descriptors.insert(fqn, descriptor);
    }

    fn add_provider(&mut self, label: &str, fqn: &str) {
        self.providers
            .entry(label.to_string())
            .or_default()
            .insert(fqn.to_string());
    }

    /// Remove a descriptor and retract it from every label it provides
    pub fn unregister(&mut self, fqn: &str) -> Option<PluginDescriptor> {
        let descriptor = self.descriptors.remove(fqn)?;

        self.providers.retain(|_, fqns| {
            fqns.remove(fqn);
            !fqns.is_empty()
        });

        Some(descriptor)
    }

    /// Sorted, unique FQNs of every provider of `label`
    pub fn resolve(&self, label: &str) -> Result<Vec<String>, PluginHostError> {
        self.providers
            .get(label)
            .filter(|fqns| !fqns.is_empty())
            .map(|fqns| fqns.iter().cloned().collect())
            .ok_or_else(|| PluginHostError::DependencyMissing {
                label: label.to_string(),
                required_by: None,
            })
    }

    /// Unique, sorted union of the labels required by the given descriptors
    pub fn collect_alias_labels<'a>(
        &self,
        descriptors: impl IntoIterator<Item = &'a PluginDescriptor>,
    ) -> Vec<String> {
        let labels: BTreeSet<String> = descriptors
            .into_iter()
            .flat_map(|d| d.manifest().accessors.values().cloned())
            .collect();
        labels.into_iter().collect()
    }

    /// Descriptors registered under `label`
    pub fn providers_of(&self, label: &str) -> Vec<&PluginDescriptor> {
        self.providers
            .get(label)
            .into_iter()
            .flatten()
            .filter_map(|fqn| self.descriptors.get(fqn))
            .collect()
    }

    /// Whether `fqn` is registered under `label`
    pub fn provides(&self, label: &str, fqn: &str) -> bool {
        self.providers
            .get(label)
            .is_some_and(|fqns| fqns.contains(fqn))
    }

    /// Whether `label` names a registered identity rather than a generic capability
    pub fn is_fqn(&self, label: &str) -> bool {
        self.descriptors.contains_key(label)
    }

    pub fn descriptor(&self, fqn: &str) -> Option<&PluginDescriptor> {
        self.descriptors.get(fqn)
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &PluginDescriptor> {
        self.descriptors.values()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

fn check_duplicates(descriptors: &[PluginDescriptor]) -> Result<(), PluginHostError> {
    let mut seen = HashSet::new();
    let mut duplicates = BTreeSet::new();
    for descriptor in descriptors {
        if !seen.insert(descriptor.fqn()) {
            duplicates.insert(descriptor.fqn().to_string());
        }
    }

    if duplicates.is_empty() {
        Ok(())
    } else {
        Err(PluginHostError::DuplicateName {
            names: duplicates.into_iter().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_plugin_api::PluginManifest;

    fn plugin1() -> PluginDescriptor {
        PluginDescriptor::basic(
            PluginManifest::new("Plugin1", "0.0.1")
                .with_accessor("plug2", "plugin2-behaviour")
                .with_behavior("plugin1-behaviour")
                .with_behavior("common1"),
        )
    }

    fn plugin2() -> PluginDescriptor {
        PluginDescriptor::basic(
            PluginManifest::new("Plugin2", "0.0.1")
                .with_behavior("plugin2-behaviour")
                .with_behavior("common1"),
        )
    }

    fn registry() -> CapabilityRegistry {
        let mut registry = CapabilityRegistry::new();
        registry
            .register(vec![plugin1(), plugin2()], |_| false)
            .unwrap();
        registry
    }

    #[test]
    fn test_register_returns_new_fqns() {
        let mut registry = CapabilityRegistry::new();
        let registration = registry
            .register(vec![plugin2(), plugin1()], |_| false)
            .unwrap();

        assert_eq!(registration.registered, vec!["Plugin2-v0.0.1", "Plugin1-v0.0.1"]);
        assert!(registration.already_loaded.is_empty());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_duplicate_in_batch_registers_nothing() {
        let mut registry = CapabilityRegistry::new();
        let err = registry
            .register(vec![plugin1(), plugin2(), plugin1()], |_| false)
            .unwrap_err();

        assert!(matches!(
            err,
            PluginHostError::DuplicateName { ref names } if names == &["Plugin1-v0.0.1"]
        ));
        assert!(registry.is_empty());
        assert!(registry.resolve("common1").is_err());
    }

    #[test]
    fn test_live_fqns_are_skipped() {
        let mut registry = CapabilityRegistry::new();
        let registration = registry
            .register(vec![plugin1(), plugin2()], |fqn| fqn == "Plugin1-v0.0.1")
            .unwrap();

        assert_eq!(registration.registered, vec!["Plugin2-v0.0.1"]);
        assert_eq!(registration.already_loaded, vec!["Plugin1-v0.0.1"]);
        assert!(registry.descriptor("Plugin1-v0.0.1").is_none());
    }

    #[test]
    fn test_resolve_labels_to_sorted_fqns() {
        let registry = registry();

        assert_eq!(registry.resolve("Plugin1-v0.0.1").unwrap(), vec!["Plugin1-v0.0.1"]);
        assert_eq!(registry.resolve("plugin2-behaviour").unwrap(), vec!["Plugin2-v0.0.1"]);
        assert_eq!(
            registry.resolve("common1").unwrap(),
            vec!["Plugin1-v0.0.1", "Plugin2-v0.0.1"]
        );
    }

    #[test]
    fn test_resolve_versioned_alias() {
        let mut registry = registry();
        registry
            .register(
                vec![PluginDescriptor::basic(
                    PluginManifest::new("Plugin2b", "0.0.2").with_behavior("common1"),
                )],
                |_| false,
            )
            .unwrap();

        assert_eq!(registry.resolve("common1").unwrap().len(), 3);
        assert_eq!(
            registry.resolve("common1-v0.0.1").unwrap(),
            vec!["Plugin1-v0.0.1", "Plugin2-v0.0.1"]
        );
        assert_eq!(registry.resolve("common1-v0.0.2").unwrap(), vec!["Plugin2b-v0.0.2"]);
    }

    #[test]
    fn test_versioned_alias_never_shadows_identity() {
        let mut registry = CapabilityRegistry::new();
        registry
            .register(
                vec![
                    PluginDescriptor::basic(PluginManifest::new("logger", "1")),
                    PluginDescriptor::basic(
                        PluginManifest::new("fancy-logger", "1").with_behavior("logger"),
                    ),
                ],
                |_| false,
            )
            .unwrap();

        assert_eq!(registry.resolve("logger-v1").unwrap(), vec!["logger-v1"]);
        assert_eq!(registry.resolve("logger").unwrap(), vec!["fancy-logger-v1"]);
    }

    #[test]
    fn test_resolve_missing_label() {
        let registry = registry();
        let err = registry.resolve("UnknownPlugin").unwrap_err();
        assert!(matches!(
            err,
            PluginHostError::DependencyMissing { ref label, .. } if label == "UnknownPlugin"
        ));
    }

    #[test]
    fn test_collect_alias_labels() {
        let plugin3 = PluginDescriptor::basic(
            PluginManifest::new("Plugin3", "0.0.1")
                .with_accessor("plug1", "Plugin1-v0.0.1")
                .with_accessor("plug4", "plugin4-behaviour"),
        );
        let plugin4 = PluginDescriptor::basic(
            PluginManifest::new("Plugin4", "0.0.1").with_accessor("plug2", "Plugin2-v0.0.1"),
        );
        let descriptors = [plugin1(), plugin2(), plugin3, plugin4];

        let registry = CapabilityRegistry::new();
        assert_eq!(
            registry.collect_alias_labels(&descriptors),
            vec![
                "Plugin1-v0.0.1",
                "Plugin2-v0.0.1",
                "plugin2-behaviour",
                "plugin4-behaviour"
            ]
        );
    }

    #[test]
    fn test_unregister_retracts_every_label() {
        let mut registry = registry();

        let removed = registry.unregister("Plugin2-v0.0.1").unwrap();
        assert_eq!(removed.fqn(), "Plugin2-v0.0.1");

        assert!(registry.resolve("plugin2-behaviour").is_err());
        assert!(registry.resolve("Plugin2-v0.0.1").is_err());
        assert_eq!(registry.resolve("common1").unwrap(), vec!["Plugin1-v0.0.1"]);
        assert!(registry.unregister("Plugin2-v0.0.1").is_none());
    }

    #[test]
    fn test_providers_of_and_is_fqn() {
        let registry = registry();

        let providers: Vec<&str> = registry
            .providers_of("common1")
            .into_iter()
            .map(|d| d.fqn())
            .collect();
        assert_eq!(providers, vec!["Plugin1-v0.0.1", "Plugin2-v0.0.1"]);

        assert!(registry.is_fqn("Plugin1-v0.0.1"));
        assert!(!registry.is_fqn("common1"));

        assert!(registry.provides("common1-v0.0.1", "Plugin2-v0.0.1"));
        assert!(!registry.provides("plugin2-behaviour", "Plugin1-v0.0.1"));
    }
}
