//! Load progress notifications
//!
//! The host publishes a [`LoadEvent::Detected`] once per batch and a
//! [`LoadEvent::Loaded`] for every plugin that finishes enable and start.
//! Subscribers that fall behind lose events; the counters keep running.

use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::broadcast;

/// Progress record emitted while loading plugins
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadEvent {
    /// A batch of newly registered plugins was accepted
    Detected { count: usize },
    /// A plugin instance is enabled and started
    Loaded {
        fqn: String,
        name: String,
        /// Plugins loaded so far, including this one
        loaded: usize,
        /// Plugins detected so far
        total: usize,
    },
}

impl std::fmt::Display for LoadEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Detected { count } => write!(f, "Detected {} plugins", count),
            Self::Loaded {
                name,
                loaded,
                total,
                ..
            } => write!(f, "({}/{}) - Loaded: {}", loaded, total, name),
        }
    }
}

/// Broadcasts [`LoadEvent`]s and keeps the running counts
pub struct LoadProgress {
    detected: AtomicUsize,
    loaded: AtomicUsize,
    tx: broadcast::Sender<LoadEvent>,
}

impl LoadProgress {
    /// Create a progress channel with the given broadcast capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            detected: AtomicUsize::new(0),
            loaded: AtomicUsize::new(0),
            tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LoadEvent> {
        self.tx.subscribe()
    }

    pub fn detected(&self, count: usize) {
        self.detected.fetch_add(count, Ordering::SeqCst);
        self.publish(LoadEvent::Detected { count });
    }

    pub fn loaded(&self, fqn: &str, name: &str) {
        let loaded = self.loaded.fetch_add(1, Ordering::SeqCst) + 1;
        let total = self.detected.load(Ordering::SeqCst);
        self.publish(LoadEvent::Loaded {
            fqn: fqn.to_string(),
            name: name.to_string(),
            loaded,
            total,
        });
    }

    fn publish(&self, event: LoadEvent) {
        tracing::info!("{}", event);
        // No receivers is fine
        let _ = self.tx.send(event);
    }
}

impl Default for LoadProgress {
    fn default() -> Self {
        Self::new(64)
    }
}
