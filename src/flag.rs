//! # Level-triggered lifecycle flags.
//!
//! [`Flag`] is a one-way latch within a lifecycle: once set, every current and
//! future waiter observes it set. Unlike a `CancellationToken` it can be
//! cleared again, which restart needs (`started`/`stopped`/`crashed` reset to
//! unraised when a service goes back to its initial state).
//!
//! - [`Flag::set`] raises the flag and releases all waiters.
//! - [`Flag::wait`] completes immediately if already raised.
//! - [`Flag::clear`] lowers the flag (only the lifecycle reset does this).

use std::sync::Arc;

use tokio::sync::watch;

/// A clearable, level-triggered latch observable by any number of waiters.
///
/// Cheap to clone; clones share the same underlying state.
#[derive(Clone, Debug)]
pub struct Flag {
    tx: Arc<watch::Sender<bool>>,
}

impl Flag {
    /// Creates a new, unraised flag.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Raises the flag. Idempotent; wakes every waiter.
    pub fn set(&self) {
        self.tx.send_replace(true);
    }

    /// Lowers the flag. Only meaningful during a lifecycle reset.
    pub fn clear(&self) {
        self.tx.send_replace(false);
    }

    /// Returns the current level.
    pub fn is_set(&self) -> bool {
        *self.tx.borrow()
    }

    /// Waits until the flag is raised. Returns immediately if it already is.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in self, so wait_for cannot observe a closed channel.
        let _ = rx.wait_for(|raised| *raised).await;
    }
}

impl Default for Flag {
    fn default() -> Self {
        Self::new()
    }
}
