//! PluginRelay - named-message channel between the main side and its peers
//!
//! One [`RelayHub`] joins a single main side to any number of peer sides.
//! Messages sent from the main side reach every peer and the main side
//! itself; messages sent from a peer reach the main side only. Listeners
//! subscribe by message name.

use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::broadcast;

/// A named message travelling through the relay
#[derive(Debug, Clone, PartialEq)]
pub struct RelayMessage {
    /// Message name listeners subscribe to
    pub name: String,
    /// Message payload
    pub payload: Value,
}

/// Which side of the relay an endpoint sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelaySide {
    Main,
    Peer(usize),
}

struct HubInner {
    capacity: usize,
    main_tx: broadcast::Sender<RelayMessage>,
    peers: Mutex<Vec<broadcast::Sender<RelayMessage>>>,
}

/// Owner of the relay channels
#[derive(Clone)]
pub struct RelayHub {
    inner: Arc<HubInner>,
}

impl RelayHub {
    /// Create a hub whose channels buffer up to `capacity` messages per listener
    pub fn new(capacity: usize) -> Self {
        let (main_tx, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(HubInner {
                capacity: capacity.max(1),
                main_tx,
                peers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Endpoint on the main side
    pub fn main(&self) -> PluginRelay {
        PluginRelay {
            side: RelaySide::Main,
            inbox: self.inner.main_tx.clone(),
            hub: Arc::clone(&self.inner),
        }
    }

    /// Attach a new peer side and return its endpoint
    pub fn peer(&self) -> PluginRelay {
        let (tx, _) = broadcast::channel(self.inner.capacity);
        let mut peers = self.inner.peers.lock().unwrap();
        peers.push(tx.clone());

        PluginRelay {
            side: RelaySide::Peer(peers.len() - 1),
            inbox: tx,
            hub: Arc::clone(&self.inner),
        }
    }

    /// Number of attached peers
    pub fn peer_count(&self) -> usize {
        self.inner.peers.lock().unwrap().len()
    }
}

impl Default for RelayHub {
    fn default() -> Self {
        Self::new(64)
    }
}

/// One side's handle on the relay
#[derive(Clone)]
pub struct PluginRelay {
    side: RelaySide,
    inbox: broadcast::Sender<RelayMessage>,
    hub: Arc<HubInner>,
}

impl PluginRelay {
    pub fn side(&self) -> RelaySide {
        self.side
    }

    pub fn is_main(&self) -> bool {
        self.side == RelaySide::Main
    }

    /// Send a named message
    ///
    /// Sending with nobody listening is not an error.
    pub fn send(&self, name: impl Into<String>, payload: Value) {
        let message = RelayMessage {
            name: name.into(),
            payload,
        };

        if self.is_main() {
            for peer in self.hub.peers.lock().unwrap().iter() {
                let _ = peer.send(message.clone());
            }
        }
        let _ = self.hub.main_tx.send(message);
    }

    /// Listen for every message with this name
    pub fn listen(&self, name: impl Into<String>) -> RelaySubscription {
        RelaySubscription {
            name: name.into(),
            rx: self.inbox.subscribe(),
        }
    }

    /// Alias of [`listen`](Self::listen)
    pub fn on(&self, name: impl Into<String>) -> RelaySubscription {
        self.listen(name)
    }

    /// Wait for the next message with this name
    pub async fn once(&self, name: impl Into<String>) -> Option<Value> {
        self.listen(name).recv().await
    }
}

/// Stream of payloads for one message name
pub struct RelaySubscription {
    name: String,
    rx: broadcast::Receiver<RelayMessage>,
}

impl RelaySubscription {
    /// Name this subscription filters on
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Next payload for this name, or `None` once the relay is gone
    pub async fn recv(&mut self) -> Option<Value> {
        loop {
            match self.rx.recv().await {
                Ok(message) if message.name == self.name => return Some(message.payload),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(message = %self.name, skipped, "Relay listener lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
