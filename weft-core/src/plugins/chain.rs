//! Dependency chain resolution
//!
//! The chain map records, for every resolved label, the FQNs that must be
//! loaded before anything satisfying that label can be instantiated. An FQN
//! depends on whatever its accessors require; a generic capability depends on
//! the concrete plugins that provide it.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use super::capabilities::CapabilityRegistry;
use super::error::PluginHostError;

/// Resolved mapping from a label to the FQNs that must load first
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ChainMap {
    entries: BTreeMap<String, Vec<String>>,
}

impl ChainMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `labels` against `registry` and record their dependency chains
    ///
    /// Labels that are already present are left alone. On error the map is
    /// unchanged.
    pub fn build<S: AsRef<str>>(
        &mut self,
        registry: &CapabilityRegistry,
        labels: &[S],
    ) -> Result<(), PluginHostError> {
        let mut resolver = Resolver {
            registry,
            existing: &self.entries,
            pending: BTreeMap::new(),
        };
        resolver.resolve(labels, &[])?;

        let pending = resolver.pending;
        self.entries.extend(pending);
        Ok(())
    }

    /// FQNs that must be loaded before `label`, if any were recorded
    pub fn dependencies(&self, label: &str) -> Option<&[String]> {
        self.entries.get(label).map(Vec::as_slice)
    }

    /// Forget what was resolved for a re-registered `fqn`
    ///
    /// Drops the FQN's own entry and the entry of every generic label it
    /// provides now or was listed under before. Other FQNs keep their
    /// mentions of it.
    pub fn invalidate(&mut self, registry: &CapabilityRegistry, fqn: &str) {
        self.entries.remove(fqn);
        self.entries.retain(|label, fqns| {
            registry.is_fqn(label)
                || !(registry.provides(label, fqn) || fqns.iter().any(|f| f == fqn))
        });
    }

    /// Drop the entry for `label` and every mention of it in other entries
    pub fn remove(&mut self, label: &str) -> Option<Vec<String>> {
        let removed = self.entries.remove(label);
        self.entries.retain(|_, fqns| {
            fqns.retain(|fqn| fqn != label);
            !fqns.is_empty()
        });
        removed
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(label, fqns)| (label.as_str(), fqns.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Flatten `roots` into a dependencies-first sequence
    ///
    /// Every FQN appears once, after everything it depends on. Roots with no
    /// recorded dependencies keep their relative order.
    pub fn load_order<S: AsRef<str>>(&self, roots: &[S]) -> Vec<String> {
        let mut order = Vec::new();
        let mut seen = HashSet::new();
        for root in roots {
            self.visit(root.as_ref(), &mut seen, &mut order);
        }
        order
    }

    fn visit(&self, fqn: &str, seen: &mut HashSet<String>, order: &mut Vec<String>) {
        if !seen.insert(fqn.to_string()) {
            return;
        }
        for dependency in self.dependencies(fqn).unwrap_or_default() {
            self.visit(dependency, seen, order);
        }
        order.push(fqn.to_string());
    }
}

struct Resolver<'a> {
    registry: &'a CapabilityRegistry,
    existing: &'a BTreeMap<String, Vec<String>>,
    pending: BTreeMap<String, Vec<String>>,
}

impl Resolver<'_> {
    fn is_resolved(&self, label: &str) -> bool {
        self.existing.contains_key(label) || self.pending.contains_key(label)
    }

    fn resolve<S: AsRef<str>>(
        &mut self,
        labels: &[S],
        visited: &[String],
    ) -> Result<(), PluginHostError> {
        for label in labels {
            let label = label.as_ref();
            if self.is_resolved(label) {
                continue;
            }

            let providers = self.registry.resolve(label)?;
            let dependencies = self.dependency_fqns(label)?;

            let effective = if self.registry.is_fqn(label) {
                dependencies
            } else {
                providers
            };

            if visited.iter().any(|seen| seen == label) {
                let mut chain = visited.to_vec();
                chain.push(label.to_string());
                return Err(PluginHostError::CyclicReference { chain });
            }

            if !effective.is_empty() {
                let mut chain = visited.to_vec();
                chain.push(label.to_string());
                self.resolve(effective.as_slice(), &chain)?;

                tracing::trace!(label, dependencies = ?effective, "Resolved dependency chain");
                self.pending.insert(label.to_string(), effective);
            }
        }

        Ok(())
    }

    /// FQNs satisfying every accessor of every provider of `label`
    fn dependency_fqns(&self, label: &str) -> Result<Vec<String>, PluginHostError> {
        let providers = self.registry.providers_of(label);
        let required = self
            .registry
            .collect_alias_labels(providers.iter().copied());

        let mut fqns = BTreeSet::new();
        for required in required {
            let resolved = self.registry.resolve(&required).map_err(|err| match err {
                PluginHostError::DependencyMissing { label, .. } => {
                    let required_by = providers
                        .iter()
                        .find(|p| p.manifest().accessors.values().any(|l| *l == label))
                        .map(|p| p.fqn().to_string());
                    PluginHostError::DependencyMissing { label, required_by }
                }
                other => other,
            })?;
            fqns.extend(resolved);
        }
        Ok(fqns.into_iter().collect())
    }
}
