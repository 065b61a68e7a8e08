//! # Event subscriber trait.
//!
//! [`Subscribe`] is the extension point for plugging custom observers
//! (metrics, audit trails, dashboards) into a service tree.
//!
//! Each subscriber gets:
//! - a **dedicated worker task** draining its own bounded queue,
//! - **panic isolation**: a panicking subscriber never takes the tree down,
//! - **overflow-by-drop**: a slow subscriber loses events, others are
//!   unaffected.

use async_trait::async_trait;

use crate::events::Event;

/// Receives tree events on a dedicated worker with a bounded queue.
///
/// ## Rules
/// - `on_event()` runs on the subscriber's worker, never on the publisher.
/// - Events arrive in publish order (per-subscriber FIFO).
/// - Handle errors internally; panics are caught and logged.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Processes a single event.
    async fn on_event(&self, event: &Event);

    /// Subscriber name for logs. Keep short ("metrics", "audit").
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Queue capacity for this subscriber. When the queue is full, new events
    /// are dropped for this subscriber only.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
