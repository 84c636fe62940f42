//! PluginHost - registers descriptors, resolves their dependency chains and
//! loads every plugin exactly once, dependencies first

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use tokio::sync::{OnceCell, broadcast};
use weft_plugin_api::PluginType;

use super::capabilities::CapabilityRegistry;
use super::chain::ChainMap;
use super::context::{AccessorMap, PluginContext};
use super::descriptor::PluginDescriptor;
use super::error::{ChainCause, DependencyChainError, PluginHostError};
use super::instance::PluginInstance;
use super::progress::{LoadEvent, LoadProgress};
use crate::config::PluginHostConfig;
use crate::relay::{PluginRelay, RelayHub};
use crate::settings::{FileSettings, SettingsStore};

/// Settled result of loading one FQN
pub type LoadOutcome = Result<Arc<PluginInstance>, Arc<DependencyChainError>>;

/// Shared state of every in-flight and completed load
///
/// Guarded by a plain mutex that is never held across an await.
#[derive(Default)]
struct HostState {
    registry: CapabilityRegistry,
    chain_map: ChainMap,
    instances: BTreeMap<String, Arc<PluginInstance>>,
    failures: BTreeMap<String, Arc<DependencyChainError>>,
    loads: HashMap<String, Arc<OnceCell<LoadOutcome>>>,
}

struct HostInner {
    settings: Arc<dyn SettingsStore>,
    relay: RelayHub,
    main_relay: PluginRelay,
    peer_relay: PluginRelay,
    progress: LoadProgress,
    state: Mutex<HostState>,
}

/// The plugin host
///
/// Cloning is cheap and every clone drives the same registries, so loads may
/// be started from several tasks at once.
#[derive(Clone)]
pub struct PluginHost {
    inner: Arc<HostInner>,
}

impl PluginHost {
    /// Create a host over the given settings store and relay
    pub fn new(settings: Arc<dyn SettingsStore>, relay: RelayHub, event_capacity: usize) -> Self {
        let main_relay = relay.main();
        let peer_relay = relay.peer();
        Self {
            inner: Arc::new(HostInner {
                settings,
                relay,
                main_relay,
                peer_relay,
                progress: LoadProgress::new(event_capacity),
                state: Mutex::new(HostState::default()),
            }),
        }
    }

    /// Create a host backed by the settings file named in `config`
    pub fn from_config(config: &PluginHostConfig) -> Result<Self, PluginHostError> {
        let settings = FileSettings::load(&config.settings_path)?;
        Ok(Self::new(
            Arc::new(settings),
            RelayHub::new(config.relay_capacity),
            config.event_capacity,
        ))
    }

    /// Register, resolve and load a batch of descriptors
    ///
    /// Structural problems (duplicate names, missing providers, cycles) fail
    /// the whole batch before anything is loaded, and the batch's
    /// registrations are withdrawn. A plugin that fails to load only takes
    /// its dependents down with it; the rest of the batch still loads, and
    /// the first failure in batch order is returned once everything settled.
    pub async fn load_plugin_definitions(
        &self,
        descriptors: Vec<PluginDescriptor>,
    ) -> Result<BTreeMap<String, Arc<PluginInstance>>, PluginHostError> {
        let registered = self.register_descriptors(descriptors)?;
        self.inner.progress.detected(registered.len());

        if let Err(e) = self.build_chain_map(registered.as_slice()) {
            tracing::error!(error = %e, "Failed to resolve plugin dependencies");
            let mut state = self.inner.state.lock().unwrap();
            for fqn in &registered {
                state.registry.unregister(fqn);
            }
            return Err(e);
        }

        let outcomes = self.load_all(registered).await;
        if let Some(Err(e)) = outcomes.into_iter().find(Result::is_err) {
            return Err(PluginHostError::DependencyChain(e));
        }

        Ok(self.instances())
    }

    /// Register descriptors with the capability registry
    ///
    /// Returns the newly registered FQNs. Descriptors whose FQN already has
    /// a live instance, or is still loading, are recorded as failures and
    /// left out.
    pub fn register_descriptors(
        &self,
        descriptors: Vec<PluginDescriptor>,
    ) -> Result<Vec<String>, PluginHostError> {
        let mut guard = self.inner.state.lock().unwrap();
        let HostState {
            registry,
            chain_map,
            instances,
            failures,
            loads,
        } = &mut *guard;

        let registration = registry.register(descriptors, |fqn| {
            instances.contains_key(fqn)
                || loads
                    .get(fqn)
                    .is_some_and(|cell| !matches!(cell.get(), Some(Err(_))))
        })?;

        for fqn in registration.already_loaded {
            tracing::warn!(plugin = %fqn, "Plugin already loaded, skipping");
            let error = Arc::new(DependencyChainError::already_loaded(fqn.clone()));
            failures.insert(fqn, error);
        }

        for fqn in &registration.registered {
            // Only a failed attempt can be left behind here
            loads.remove(fqn);
            chain_map.invalidate(registry, fqn);
            tracing::debug!(plugin = %fqn, "Registered plugin");
        }

        Ok(registration.registered)
    }

    /// Resolve the dependency chains of `labels` into the chain map
    pub fn build_chain_map<S: AsRef<str>>(&self, labels: &[S]) -> Result<(), PluginHostError> {
        let mut guard = self.inner.state.lock().unwrap();
        let HostState {
            registry,
            chain_map,
            ..
        } = &mut *guard;
        chain_map.build(registry, labels)
    }

    /// Load every FQN in `fqns`, each after its recorded dependencies
    ///
    /// Branches run concurrently. An FQN is instantiated at most once no
    /// matter how many loads ask for it; later callers observe the first
    /// outcome. Outcomes are returned in request order.
    pub fn load_all(&self, fqns: Vec<String>) -> BoxFuture<'static, Vec<LoadOutcome>> {
        let host = self.clone();
        async move { join_all(fqns.into_iter().map(|fqn| host.load_one(fqn))).await }.boxed()
    }

    async fn load_one(&self, fqn: String) -> LoadOutcome {
        if let Some(instance) = self.instance(&fqn) {
            tracing::debug!(plugin = %fqn, "Plugin already running");
            return Ok(instance);
        }

        let cell = {
            let mut state = self.inner.state.lock().unwrap();
            state.loads.entry(fqn.clone()).or_default().clone()
        };

        cell.get_or_init(|| self.load_with_dependencies(&fqn))
            .await
            .clone()
    }

    async fn load_with_dependencies(&self, fqn: &str) -> LoadOutcome {
        let dependencies = {
            let state = self.inner.state.lock().unwrap();
            state
                .chain_map
                .dependencies(fqn)
                .map(<[String]>::to_vec)
                .unwrap_or_default()
        };

        if !dependencies.is_empty() {
            let outcomes = self.load_all(dependencies).await;
            if let Some(Err(failed)) = outcomes.into_iter().find(Result::is_err) {
                let error = Arc::new(DependencyChainError::new(fqn, ChainCause::Dependency(failed)));
                tracing::warn!(plugin = %fqn, error = %error, "Dependency failed, not loading plugin");
                self.record_failure(&error);
                return Err(error);
            }
        }

        self.instantiate(fqn).await
    }

    /// Build, enable and start one plugin
    ///
    /// Its dependencies are expected to be loaded already.
    pub async fn instantiate(&self, fqn: &str) -> LoadOutcome {
        match self.try_instantiate(fqn).await {
            Ok(instance) => {
                {
                    let mut state = self.inner.state.lock().unwrap();
                    state.instances.insert(fqn.to_string(), instance.clone());
                }
                self.inner.progress.loaded(fqn, instance.name());
                Ok(instance)
            }
            Err(cause) => {
                let error = Arc::new(DependencyChainError::new(fqn, cause));
                tracing::error!(plugin = %fqn, error = %error, "Failed to load plugin");
                self.record_failure(&error);
                Err(error)
            }
        }
    }

    async fn try_instantiate(&self, fqn: &str) -> Result<Arc<PluginInstance>, ChainCause> {
        let (descriptor, accessors) = {
            let state = self.inner.state.lock().unwrap();
            let descriptor = state
                .registry
                .descriptor(fqn)
                .cloned()
                .ok_or(ChainCause::Unregistered)?;
            let accessors = map_accessor_aliases(&state, &descriptor)?;
            (descriptor, accessors)
        };

        let relay = match descriptor.plugin_type() {
            PluginType::Service => self.inner.main_relay.clone(),
            PluginType::GuiCommon | PluginType::GuiMain => self.inner.peer_relay.clone(),
        };
        let context = PluginContext::new(
            descriptor.name(),
            descriptor.fqn(),
            self.inner.settings.clone(),
            relay,
        )
        .with_accessors(accessors);

        let instance = PluginInstance::new(descriptor, context).map_err(ChainCause::Construct)?;
        let instance = Arc::new(instance);

        // Enabled in settings means the gate is already open, but the
        // plugin still gets its enable hook once per load
        if instance.is_enabled() {
            instance.activate().await?;
        } else {
            instance.enable().await?;
        }
        instance.start().await?;

        Ok(instance)
    }

    fn record_failure(&self, error: &Arc<DependencyChainError>) {
        let mut state = self.inner.state.lock().unwrap();
        state.failures.insert(error.fqn.clone(), error.clone());
    }

    /// Stop a running plugin and forget it
    ///
    /// The FQN's capability registrations, chain-map entry and load memo are
    /// retracted as well, so it may be registered and loaded again.
    pub async fn unload(&self, fqn: &str) -> Result<(), PluginHostError> {
        let instance = self.instance(fqn).ok_or_else(|| PluginHostError::NotFound {
            fqn: fqn.to_string(),
        })?;

        if instance.is_enabled() {
            instance.stop().await?;
        }

        let mut state = self.inner.state.lock().unwrap();
        state.instances.remove(fqn);
        state.registry.unregister(fqn);
        state.chain_map.remove(fqn);
        state.loads.remove(fqn);

        tracing::info!(plugin = %fqn, "Plugin unloaded");
        Ok(())
    }

    /// Live instance for `fqn`
    pub fn instance(&self, fqn: &str) -> Option<Arc<PluginInstance>> {
        self.inner.state.lock().unwrap().instances.get(fqn).cloned()
    }

    /// Every live instance, keyed by FQN
    pub fn instances(&self) -> BTreeMap<String, Arc<PluginInstance>> {
        self.inner.state.lock().unwrap().instances.clone()
    }

    /// Every recorded load failure, keyed by FQN
    pub fn failures(&self) -> BTreeMap<String, Arc<DependencyChainError>> {
        self.inner.state.lock().unwrap().failures.clone()
    }

    pub fn failure(&self, fqn: &str) -> Option<Arc<DependencyChainError>> {
        self.inner.state.lock().unwrap().failures.get(fqn).cloned()
    }

    /// Snapshot of the resolved chain map
    pub fn chain_map(&self) -> ChainMap {
        self.inner.state.lock().unwrap().chain_map.clone()
    }

    /// Every registered FQN, dependencies first
    pub fn load_order(&self) -> Vec<String> {
        let state = self.inner.state.lock().unwrap();
        let roots: Vec<&str> = state.registry.descriptors().map(|d| d.fqn()).collect();
        state.chain_map.load_order(roots.as_slice())
    }

    pub fn descriptor(&self, fqn: &str) -> Option<PluginDescriptor> {
        self.inner.state.lock().unwrap().registry.descriptor(fqn).cloned()
    }

    /// Sorted FQNs of every provider of `label`
    pub fn resolve(&self, label: &str) -> Result<Vec<String>, PluginHostError> {
        self.inner.state.lock().unwrap().registry.resolve(label)
    }

    /// Number of live instances
    pub fn plugin_count(&self) -> usize {
        self.inner.state.lock().unwrap().instances.len()
    }

    /// Receive progress events for loads started after this call
    pub fn subscribe(&self) -> broadcast::Receiver<LoadEvent> {
        self.inner.progress.subscribe()
    }

    pub fn settings(&self) -> &Arc<dyn SettingsStore> {
        &self.inner.settings
    }

    pub fn relay(&self) -> &RelayHub {
        &self.inner.relay
    }
}

/// Resolve each accessor of `descriptor` to the live instances providing it
fn map_accessor_aliases(
    state: &HostState,
    descriptor: &PluginDescriptor,
) -> Result<AccessorMap, ChainCause> {
    let mut accessors = AccessorMap::new();
    for (alias, label) in &descriptor.manifest().accessors {
        let providers = state
            .registry
            .resolve(label)
            .map_err(|_| ChainCause::Unresolved {
                label: label.clone(),
            })?;
        let instances = providers
            .iter()
            .filter_map(|fqn| state.instances.get(fqn).cloned())
            .collect();
        accessors.insert(alias.clone(), instances);
    }
    Ok(accessors)
}
