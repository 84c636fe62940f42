//! Test plugins shared by the integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use weft_core::plugins::{PluginDescriptor, PluginFactory, PluginHost};
use weft_core::relay::RelayHub;
use weft_core::settings::MemorySettings;
use weft_plugin_api::{Plugin, PluginError, PluginManifest};

/// Ordered record of lifecycle hook calls, as `<name>:<hook>`
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn position(&self, entry: &str) -> usize {
        self.entries()
            .iter()
            .position(|e| e == entry)
            .unwrap_or_else(|| panic!("{entry} not in {:?}", self.entries()))
    }

    pub fn count(&self, entry: &str) -> usize {
        self.entries().iter().filter(|e| *e == entry).count()
    }
}

/// Plugin that records its hook calls, optionally slow or failing to start
pub struct Recorder {
    pub name: String,
    pub log: CallLog,
    pub start_delay: Option<Duration>,
    pub fail_start: bool,
}

impl Recorder {
    fn record(&self, hook: &str) {
        self.log.push(format!("{}:{}", self.name, hook));
    }
}

#[async_trait]
impl Plugin for Recorder {
    async fn on_enable(&self) -> Result<(), PluginError> {
        self.record("enable");
        Ok(())
    }

    async fn on_start(&self) -> Result<(), PluginError> {
        if let Some(delay) = self.start_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_start {
            return Err(PluginError::custom(format!("{} refused to start", self.name)));
        }
        self.record("start");
        Ok(())
    }

    async fn on_stop(&self) -> Result<(), PluginError> {
        self.record("stop");
        Ok(())
    }
}

#[derive(Clone, Copy, Default)]
pub struct Behaviour {
    pub start_delay: Option<Duration>,
    pub fail_start: bool,
}

pub fn recorder_factory(log: &CallLog, name: &str, behaviour: Behaviour) -> PluginFactory {
    let log = log.clone();
    let name = name.to_string();
    PluginFactory::new(move |_| {
        Ok(Recorder {
            name: name.clone(),
            log: log.clone(),
            start_delay: behaviour.start_delay,
            fail_start: behaviour.fail_start,
        })
    })
}

/// Descriptor for a recording plugin
pub fn recorder(log: &CallLog, manifest: PluginManifest) -> PluginDescriptor {
    recorder_with(log, manifest, Behaviour::default())
}

pub fn recorder_with(
    log: &CallLog,
    manifest: PluginManifest,
    behaviour: Behaviour,
) -> PluginDescriptor {
    let factory = recorder_factory(log, &manifest.name, behaviour);
    PluginDescriptor::new(manifest, factory)
}

pub fn manifest(name: &str) -> PluginManifest {
    PluginManifest::new(name, "1")
}

pub fn memory_host() -> PluginHost {
    PluginHost::new(Arc::new(MemorySettings::new()), RelayHub::new(16), 64)
}
