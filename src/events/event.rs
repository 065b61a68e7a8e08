//! # Lifecycle events published by services and their activities.
//!
//! [`EventKind`] classifies events across three groups:
//! - **Service lifecycle**: state transitions, crashes, dependency changes.
//! - **Activity lifecycle**: start, stop, crash, timer overruns, drain escalation.
//! - **Delivery faults**: subscriber overflow and panics.
//!
//! The [`Event`] struct carries metadata: timestamps, service and activity
//! names, the new state, error text, delays, and overrun counts.
//!
//! ## Ordering
//! Each event gets a process-wide monotonically increasing sequence number
//! (`seq`), so consumers can order events correctly even when async channels
//! deliver them interleaved.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::state::ServiceState;

/// Sequence counter shared by all events in the process.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Service lifecycle ===
    /// A service moved to a new lifecycle state (carried in `state`).
    StateChanged,
    /// A service crashed; `error` carries the reason.
    ServiceCrashed,
    /// A child was attached to a parent (declared or runtime).
    DependencyAdded,

    // === Activities ===
    /// An activity began executing.
    ActivityStarted,
    /// An activity finished or observed cancellation and unwound.
    ActivityStopped,
    /// An activity raised; `error` carries the reason.
    ActivityCrashed,
    /// A timer handler overran its period; `missed` counts skipped fires.
    TimerOverrun,

    // === Shutdown ===
    /// Drain exceeded the grace deadline; escalating to cancellation.
    DrainEscalated,
    /// Activities survived the hard grace and were force-dropped.
    StopTimedOut,

    // === Supervisor strategies ===
    /// A revive of a crashed service was scheduled (`delay` set).
    ReviveScheduled,
    /// A crashed service was forfeited instead of revived.
    ReviveForfeited,
    /// The revive budget was exhausted; the strategy is crashing.
    ReviveExhausted,

    // === Delivery faults ===
    /// A subscriber's queue was full; an event was dropped for it.
    SubscriberOverflow,
    /// A subscriber panicked while handling an event.
    SubscriberPanicked,
}

/// A runtime event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Monotonically increasing sequence number for ordering.
    pub seq: u64,
    /// Wall-clock timestamp; may go backwards, use for display only.
    pub at: SystemTime,
    /// The kind of event.
    pub kind: EventKind,
    /// Name of the service this event concerns.
    pub service: Option<String>,
    /// Name of the activity, if the event concerns one.
    pub activity: Option<String>,
    /// New lifecycle state, for [`EventKind::StateChanged`].
    pub state: Option<ServiceState>,
    /// Error text, if the event represents a failure.
    pub error: Option<String>,
    /// Why the transition happened, for non-failure causes.
    pub reason: Option<String>,
    /// Delay before a scheduled revive.
    pub delay: Option<Duration>,
    /// Number of timer fires skipped due to handler overrun.
    pub missed: Option<u64>,
}

impl Event {
    /// Creates an event of the given kind stamped with the current time and
    /// the next sequence number.
    pub fn now(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            service: None,
            activity: None,
            state: None,
            error: None,
            reason: None,
            delay: None,
            missed: None,
        }
    }

    /// Attaches the service name.
    pub fn with_service(mut self, name: impl Into<String>) -> Self {
        self.service = Some(name.into());
        self
    }

    /// Attaches the activity name.
    pub fn with_activity(mut self, name: impl Into<String>) -> Self {
        self.activity = Some(name.into());
        self
    }

    /// Attaches the new lifecycle state.
    pub fn with_state(mut self, state: ServiceState) -> Self {
        self.state = Some(state);
        self
    }

    /// Attaches error text.
    pub fn with_error(mut self, msg: impl Into<String>) -> Self {
        self.error = Some(msg.into());
        self
    }

    /// Attaches a human-readable cause.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a revive delay.
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay = Some(d);
        self
    }

    /// Attaches a missed-fire count.
    pub fn with_missed(mut self, n: u64) -> Self {
        self.missed = Some(n);
        self
    }
}
