//! # SubscriberSet: non-blocking fan-out over multiple subscribers.
//!
//! [`SubscriberSet`] pipes a tree's event bus into per-subscriber bounded
//! queues, each drained by its own worker task.
//!
//! ## What it guarantees
//! - Publishing never waits on a subscriber.
//! - Per-subscriber FIFO.
//! - Panics inside subscribers are caught and logged.
//!
//! ## What it does not guarantee
//! - No global ordering across different subscribers.
//! - No retries on queue overflow: the event is dropped for that subscriber.
//!
//! ```text
//!    Bus ──► pipe task
//!              ├──► [queue S1] ─► worker S1 ─► on_event()
//!              ├──► [queue S2] ─► worker S2 ─► on_event()
//!              └──► [queue SN] ─► worker SN ─► on_event()
//! ```

use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::events::{Bus, Event};

use super::Subscribe;

struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
}

/// Fan-out over a set of subscribers, fed from one tree's bus.
///
/// Dropping the set closes the queues; workers exit after draining them.
pub struct SubscriberSet {
    channels: Arc<Vec<SubscriberChannel>>,
    workers: Vec<JoinHandle<()>>,
    pipe: JoinHandle<()>,
}

impl SubscriberSet {
    /// Spawns one worker per subscriber plus the bus pipe.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut channels = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let capacity = sub.queue_capacity().max(1);
            let name = sub.name();
            let (tx, mut rx) = mpsc::channel::<Arc<Event>>(capacity);

            let worker = tokio::spawn(async move {
                while let Some(ev) = rx.recv().await {
                    let fut = sub.on_event(ev.as_ref());
                    if std::panic::AssertUnwindSafe(fut).catch_unwind().await.is_err() {
                        tracing::error!(subscriber = sub.name(), "subscriber panicked");
                    }
                }
            });

            channels.push(SubscriberChannel { name, sender: tx });
            workers.push(worker);
        }

        let channels = Arc::new(channels);
        let pipe = {
            let channels = Arc::clone(&channels);
            let mut rx = bus.subscribe();
            tokio::spawn(async move {
                loop {
                    match rx.recv().await {
                        Ok(ev) => Self::fan_out(&channels, ev),
                        Err(broadcast::error::RecvError::Closed) => break,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "subscriber pipe lagged; skipping old events");
                        }
                    }
                }
            })
        };

        Self {
            channels,
            workers,
            pipe,
        }
    }

    /// Hands one event to every subscriber queue without waiting.
    fn fan_out(channels: &[SubscriberChannel], event: Event) {
        let ev = Arc::new(event);
        for channel in channels {
            match channel.sender.try_send(Arc::clone(&ev)) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(subscriber = channel.name, "queue full; event dropped");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    tracing::warn!(subscriber = channel.name, "queue closed; event dropped");
                }
            }
        }
    }

    /// Number of attached subscribers.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// True when no subscribers are attached.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

impl Drop for SubscriberSet {
    fn drop(&mut self) {
        self.pipe.abort();
        // Workers exit on their own once the senders drop with self.
        for worker in &self.workers {
            worker.abort();
        }
    }
}
