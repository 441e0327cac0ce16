//! Presence registry
//!
//! Owns the set of open real-time connections and keeps every one of them
//! informed of how many there are.

use crate::chat::protocol::ServerEvent;
use crate::core::models::ConnectionId;
use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

/// Frames that may wait for one connection's writer before new ones are dropped.
pub const OUTBOX_CAPACITY: usize = 256;

/// Outbound half of a connection. Its writer task drains it into the socket.
pub type Outbox = mpsc::Sender<ServerEvent>;

/// Outbox paired with the receiver its writer task drains.
pub fn outbox() -> (Outbox, mpsc::Receiver<ServerEvent>) {
    mpsc::channel(OUTBOX_CAPACITY)
}

/// Registry of open connections.
///
/// Each open/close mutates the set and fans out the new count under one lock,
/// so count broadcasts are seen in the order the events were applied.
#[derive(Default)]
pub struct PresenceRegistry {
    connections: Mutex<HashMap<ConnectionId, Outbox>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly opened connection and broadcast the count to everyone,
    /// the new connection included. Returns the count that was broadcast.
    pub fn on_open(&self, id: ConnectionId, outbox: Outbox) -> usize {
        let mut connections = self.connections.lock();

        if connections.contains_key(&id) {
            warn!("Connection {} opened twice, keeping the first handle", id);
        } else {
            connections.insert(id, outbox);
        }

        let total = connections.len();
        info!("Connection {} opened ({} connected)", id, total);
        fan_out(connections.iter(), None, &ServerEvent::ClientsTotal(total));
        total
    }

    /// Forget a connection and broadcast the count to the ones left.
    /// Returns the count that was broadcast.
    pub fn on_close(&self, id: ConnectionId) -> usize {
        let mut connections = self.connections.lock();

        if connections.remove(&id).is_none() {
            debug!("Close for unknown connection {}", id);
        }

        let total = connections.len();
        info!("Connection {} closed ({} connected)", id, total);
        fan_out(connections.iter(), None, &ServerEvent::ClientsTotal(total));
        total
    }

    pub fn count(&self) -> usize {
        self.connections.lock().len()
    }

    /// Copy of the current handles, taken so fan-out never iterates a set
    /// that another task is mutating.
    pub fn snapshot(&self) -> Vec<(ConnectionId, Outbox)> {
        self.connections
            .lock()
            .iter()
            .map(|(id, outbox)| (*id, outbox.clone()))
            .collect()
    }

    /// Send `event` to every open connection. Returns how many accepted it.
    pub fn broadcast_all(&self, event: &ServerEvent) -> usize {
        let snapshot = self.snapshot();
        fan_out(snapshot.iter().map(|(id, tx)| (id, tx)), None, event)
    }

    /// Send `event` to every open connection except `sender`.
    pub fn broadcast_except(&self, sender: ConnectionId, event: &ServerEvent) -> usize {
        let snapshot = self.snapshot();
        fan_out(snapshot.iter().map(|(id, tx)| (id, tx)), Some(sender), event)
    }
}

fn fan_out<'a>(
    targets: impl Iterator<Item = (&'a ConnectionId, &'a Outbox)>,
    skip: Option<ConnectionId>,
    event: &ServerEvent,
) -> usize {
    let mut delivered = 0;
    for (id, outbox) in targets {
        if Some(*id) == skip {
            continue;
        }
        match outbox.try_send(event.clone()) {
            Ok(()) => delivered += 1,
            // A peer that stopped reading loses frames instead of growing
            // its queue.
            Err(TrySendError::Full(_)) => {
                warn!("Outbox full, dropping {} for connection {}", event.name(), id);
            }
            // The socket is already going away; its close event will remove
            // it from the registry.
            Err(TrySendError::Closed(_)) => {
                debug!("Dropping {} for closing connection {}", event.name(), id);
            }
        }
    }
    debug!("Fanned out {} to {} connections", event.name(), delivered);
    delivered
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::mpsc::Receiver;

    fn connect(registry: &PresenceRegistry) -> (ConnectionId, Receiver<ServerEvent>) {
        let (tx, rx) = outbox();
        let id = ConnectionId::new();
        registry.on_open(id, tx);
        (id, rx)
    }

    fn drain(rx: &mut Receiver<ServerEvent>) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_kth_open_broadcasts_k() {
        let registry = PresenceRegistry::new();
        let mut receivers = Vec::new();

        for k in 1..=5 {
            let (_, mut rx) = connect(&registry);
            assert_eq!(drain(&mut rx), vec![ServerEvent::ClientsTotal(k)]);
            for earlier in receivers.iter_mut() {
                assert_eq!(drain(earlier), vec![ServerEvent::ClientsTotal(k)]);
            }
            receivers.push(rx);
        }
        assert_eq!(registry.count(), 5);
    }

    #[test]
    fn test_open_then_close_restores_count() {
        let registry = PresenceRegistry::new();
        let (_, mut a) = connect(&registry);
        let (_, mut b) = connect(&registry);
        drain(&mut a);
        drain(&mut b);

        let (c, _c_rx) = connect(&registry);
        registry.on_close(c);

        assert_eq!(
            drain(&mut a),
            vec![ServerEvent::ClientsTotal(3), ServerEvent::ClientsTotal(2)]
        );
        assert_eq!(registry.count(), 2);
        assert!(registry.snapshot().iter().all(|(id, _)| *id != c));
    }

    #[test]
    fn test_duplicate_open_counts_once() {
        let registry = PresenceRegistry::new();
        let (tx, mut rx) = outbox();
        let id = ConnectionId::new();

        assert_eq!(registry.on_open(id, tx.clone()), 1);
        assert_eq!(registry.on_open(id, tx), 1);
        assert_eq!(
            drain(&mut rx),
            vec![ServerEvent::ClientsTotal(1), ServerEvent::ClientsTotal(1)]
        );
    }

    #[test]
    fn test_close_of_unknown_is_harmless() {
        let registry = PresenceRegistry::new();
        let (_, mut a) = connect(&registry);
        drain(&mut a);

        assert_eq!(registry.on_close(ConnectionId::new()), 1);
        assert_eq!(drain(&mut a), vec![ServerEvent::ClientsTotal(1)]);
    }

    #[test]
    fn test_broadcast_except_skips_sender() {
        let registry = PresenceRegistry::new();
        let (a, mut a_rx) = connect(&registry);
        let (_, mut b_rx) = connect(&registry);
        drain(&mut a_rx);
        drain(&mut b_rx);

        let event = ServerEvent::Feedback(json!({"rating": 5}));
        assert_eq!(registry.broadcast_except(a, &event), 1);
        assert!(drain(&mut a_rx).is_empty());
        assert_eq!(drain(&mut b_rx), vec![event.clone()]);

        assert_eq!(registry.broadcast_all(&event), 2);
        assert_eq!(drain(&mut a_rx), vec![event]);
    }

    #[test]
    fn test_dead_outbox_is_skipped() {
        let registry = PresenceRegistry::new();
        let (_, a_rx) = connect(&registry);
        let (_, mut b_rx) = connect(&registry);
        drop(a_rx);
        drain(&mut b_rx);

        assert_eq!(registry.broadcast_all(&ServerEvent::ClientsTotal(0)), 1);
        assert_eq!(registry.count(), 2);
    }

    #[test]
    fn test_stalled_reader_queue_is_bounded() {
        let registry = PresenceRegistry::new();
        let (tx, mut stalled) = mpsc::channel(8);
        registry.on_open(ConnectionId::new(), tx);
        let (_, mut live) = connect(&registry);

        let event = ServerEvent::ChatMessage(json!({"message": "x".repeat(1024)}));
        let mut delivered = 0;
        for _ in 0..100 {
            delivered += registry.broadcast_all(&event);
            // The live reader keeps up, the stalled one never reads.
            drain(&mut live);
        }

        // 100 to the live reader, and only what fit for the stalled one.
        assert_eq!(delivered, 100 + 6);
        assert_eq!(drain(&mut stalled).len(), 8);
        assert_eq!(registry.count(), 2);
    }
}
