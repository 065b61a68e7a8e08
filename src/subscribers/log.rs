//! Built-in subscriber that forwards tree events to `tracing`.
//!
//! Enabled via the `logging` feature. Levels follow the observability
//! contract: routine lifecycle at debug/info, overruns and forfeits at warn,
//! crashes and force-drops at error.

use async_trait::async_trait;

use crate::events::{Event, EventKind};

use super::Subscribe;

/// Reference logging sink: one `tracing` record per event.
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let service = e.service.as_deref().unwrap_or("-");
        let activity = e.activity.as_deref().unwrap_or("-");
        match e.kind {
            EventKind::StateChanged => {
                let state = e.state.map(|s| s.as_label()).unwrap_or("-");
                let cause = e.reason.as_deref().unwrap_or("-");
                tracing::info!(seq = e.seq, service, state, cause, "state");
            }
            EventKind::ServiceCrashed => {
                tracing::error!(seq = e.seq, service, error = ?e.error, "crashed");
            }
            EventKind::DependencyAdded => {
                let child = e.reason.as_deref().unwrap_or("-");
                tracing::debug!(seq = e.seq, service, child, "dependency added");
            }
            EventKind::ActivityStarted => {
                tracing::debug!(seq = e.seq, service, activity, "activity started");
            }
            EventKind::ActivityStopped => {
                tracing::debug!(seq = e.seq, service, activity, "activity stopped");
            }
            EventKind::ActivityCrashed => {
                tracing::error!(seq = e.seq, service, activity, error = ?e.error, "activity crashed");
            }
            EventKind::TimerOverrun => {
                tracing::warn!(seq = e.seq, service, activity, missed = ?e.missed, "timer overrun");
            }
            EventKind::DrainEscalated => {
                tracing::warn!(seq = e.seq, service, reason = ?e.reason, "drain escalated");
            }
            EventKind::StopTimedOut => {
                tracing::error!(seq = e.seq, service, error = ?e.error, "stop timed out");
            }
            EventKind::ReviveScheduled => {
                tracing::info!(seq = e.seq, service, delay = ?e.delay, "revive scheduled");
            }
            EventKind::ReviveForfeited => {
                tracing::warn!(seq = e.seq, service, "revive forfeited");
            }
            EventKind::ReviveExhausted => {
                tracing::error!(seq = e.seq, service, "revive budget exhausted");
            }
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked => {
                tracing::warn!(seq = e.seq, service, error = ?e.error, "subscriber fault");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
