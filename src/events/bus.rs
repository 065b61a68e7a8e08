//! Event bus for broadcasting lifecycle events within one service tree.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`]. Every node in
//! a tree publishes to the same bus: the root creates it, children adopt it
//! when they are attached. There is deliberately no process-global bus —
//! embedding several trees in one host keeps them fully isolated.
//!
//! - [`Bus::publish`] sends to all subscribers without blocking.
//! - [`Bus::subscribe`] creates a receiver for consuming events.

use tokio::sync::broadcast;

use crate::events::Event;

/// Broadcast channel for one service tree's events.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a bus with the given ring-buffer capacity (clamped to ≥ 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all subscribers.
    ///
    /// A bus with no subscribers silently drops the event.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Subscribes to the bus, receiving events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}
