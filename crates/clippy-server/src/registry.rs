//! Connection registry
//!
//! Tracks the live subscriptions of one client population and fans payloads
//! out to them. Sends that fail because the subscriber went away prune that
//! subscription on the spot.

use std::collections::HashMap;
use std::sync::Arc;

use clippy_observability::RelayMetrics;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

/// Encoded event text, shared by every subscriber of one broadcast
pub type Payload = Arc<str>;

/// Handle to one subscription for pushing payloads
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    /// Connection ID
    pub id: String,
    /// Channel for sending payloads to the subscription
    sender: mpsc::UnboundedSender<Payload>,
}

impl ConnectionHandle {
    /// Create a new connection handle
    pub fn new(id: String, sender: mpsc::UnboundedSender<Payload>) -> Self {
        Self { id, sender }
    }

    /// Create a handle with a fresh id together with the receiving end
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Payload>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = uuid::Uuid::new_v4().to_string();
        (Self::new(id, sender), receiver)
    }

    /// Send a payload to this connection
    pub fn send(&self, payload: Payload) -> Result<(), ConnectionError> {
        self.sender
            .send(payload)
            .map_err(|_| ConnectionError::Closed)
    }

    /// Get connection ID
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Live subscriptions of one population
#[derive(Debug)]
pub struct ConnectionRegistry {
    /// Population label used in logs and metrics
    name: &'static str,
    /// Map of connection ID to connection handle
    connections: Mutex<HashMap<String, ConnectionHandle>>,
}

impl ConnectionRegistry {
    /// Create an empty registry
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            connections: Mutex::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Get current connection count
    pub fn len(&self) -> usize {
        self.connections.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add a connection to the registry
    pub fn add(&self, handle: ConnectionHandle) {
        let mut connections = self.connections.lock();
        connections.insert(handle.id.clone(), handle);
        RelayMetrics::set_active(self.name, connections.len());
    }

    /// Remove a connection; returns whether it was still registered
    pub fn remove(&self, connection_id: &str) -> bool {
        let mut connections = self.connections.lock();
        let removed = connections.remove(connection_id).is_some();
        if removed {
            RelayMetrics::set_active(self.name, connections.len());
        }
        removed
    }

    /// Send `payload` to every connection and return how many are still live
    pub fn broadcast(&self, payload: Payload) -> usize {
        let mut connections = self.connections.lock();

        let mut dead = Vec::new();
        for handle in connections.values() {
            if handle.send(Arc::clone(&payload)).is_err() {
                dead.push(handle.id.clone());
            }
        }

        for id in &dead {
            connections.remove(id);
            debug!(registry = self.name, connection_id = %id, "Pruned closed connection");
        }

        if !dead.is_empty() {
            RelayMetrics::record_pruned(self.name, dead.len());
            RelayMetrics::set_active(self.name, connections.len());
        }

        connections.len()
    }
}

/// Connection-related errors
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("Connection closed")]
    Closed,
}
