//! Multi-network registry.
//!
//! Owns one [`NetworkSession`] per configured network and routes transport
//! events back to the session they belong to. Each network gets its own
//! transport tasks, so one network's dead or slow connection never blocks
//! another's; the only shared resource is the event channel the embedding
//! event loop drains.

use anyhow::{anyhow, Result};
use std::collections::HashMap;
use tokio::sync::mpsc;

use crate::config::NetworkConfig;
use crate::event::{NetworkId, SessionEvent};
use crate::session::NetworkSession;

pub struct NetworkManager {
    sessions: HashMap<NetworkId, NetworkSession>,
    next_id: NetworkId,
    /// Handed to every spawned transport.
    event_tx: mpsc::UnboundedSender<SessionEvent>,
    /// Handed to every session for its per-line update signal.
    update_tx: mpsc::UnboundedSender<NetworkId>,
}

impl NetworkManager {
    pub fn new(
        event_tx: mpsc::UnboundedSender<SessionEvent>,
        update_tx: mpsc::UnboundedSender<NetworkId>,
    ) -> Self {
        Self {
            sessions: HashMap::new(),
            next_id: 0,
            event_tx,
            update_tx,
        }
    }

    /// Register a network from its configuration. The session starts
    /// disconnected, with only its status buffer.
    pub fn add_network(&mut self, config: NetworkConfig) -> NetworkId {
        let id = self.next_id;
        self.next_id += 1;
        self.sessions
            .insert(id, NetworkSession::new(id, config, self.update_tx.clone()));
        id
    }

    pub fn session(&self, id: NetworkId) -> Option<&NetworkSession> {
        self.sessions.get(&id)
    }

    pub fn session_mut(&mut self, id: NetworkId) -> Option<&mut NetworkSession> {
        self.sessions.get_mut(&id)
    }

    pub fn sessions(&self) -> impl Iterator<Item = &NetworkSession> {
        self.sessions.values()
    }

    pub async fn connect(&mut self, id: NetworkId) -> Result<()> {
        let session = self
            .sessions
            .get_mut(&id)
            .ok_or_else(|| anyhow!("unknown network {}", id))?;
        session.connect(self.event_tx.clone()).await
    }

    pub fn disconnect(&mut self, id: NetworkId) {
        if let Some(session) = self.sessions.get_mut(&id) {
            session.disconnect();
        }
    }

    pub fn write_line(&mut self, id: NetworkId, line: &str) {
        if let Some(session) = self.sessions.get_mut(&id) {
            session.write_line(line);
        }
    }

    /// Route one transport event to its owning session. Events for a network
    /// that was removed are dropped.
    pub fn handle_event(&mut self, event: SessionEvent) {
        if let Some(session) = self.sessions.get_mut(&event.network_id()) {
            session.handle_event(event);
        }
    }

    /// Tear down every live connection, e.g. on client shutdown.
    pub fn disconnect_all(&mut self) {
        for session in self.sessions.values_mut() {
            session.disconnect();
        }
    }
}
