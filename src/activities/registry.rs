//! # Per-service activity registry.
//!
//! The registry owns every background activity a service launched: the join
//! handle, the per-activity cancellation token, and the last-fire timestamp.
//! Nothing escapes it — an activity is tracked until it completed, was
//! cancelled, or was force-dropped and logged.
//!
//! Two shutdown paths:
//! - [`ActivityRegistry::drain`] — await completion *without* cancelling; used
//!   at normal stop, after activities have observed the stop flag.
//! - [`ActivityRegistry::cancel_all`] — cancel tokens, wait a hard grace, then
//!   abort whatever is left; the escalation path.

use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::activities::runner::run_activity;
use crate::activities::spec::ActivitySpec;
use crate::service::ServiceContext;

/// Tracked handle to one running activity.
struct ActivityHandle {
    name: String,
    cancel: CancellationToken,
    join: JoinHandle<()>,
    ran_at: Arc<Mutex<Option<SystemTime>>>,
}

/// Observability snapshot of one registered activity.
#[derive(Clone, Debug)]
pub struct ActivityInfo {
    /// Display name.
    pub name: String,
    /// Wall-clock time of the most recent execution, if any.
    pub ran_at: Option<SystemTime>,
    /// True once the activity returned or was dropped.
    pub finished: bool,
}

/// Bag of running activities owned by one service.
pub(crate) struct ActivityRegistry {
    entries: Mutex<Vec<ActivityHandle>>,
}

impl ActivityRegistry {
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Spawns the activity under its supervision wrapper and records it.
    ///
    /// The caller validates the spec and builds a context carrying a child of
    /// the service's escalation token.
    pub(crate) fn launch(&self, ctx: ServiceContext, spec: ActivitySpec) {
        let (name, kind, body) = spec.into_parts();
        let name = name.into_owned();
        let ran_at = Arc::new(Mutex::new(None));
        let cancel = ctx.token().clone();

        let join = tokio::spawn(run_activity(
            ctx,
            name.clone(),
            kind,
            body,
            Arc::clone(&ran_at),
        ));

        if let Ok(mut entries) = self.entries.lock() {
            entries.push(ActivityHandle {
                name,
                cancel,
                join,
                ran_at,
            });
        }
    }

    /// Awaits every registered activity without cancelling, up to `deadline`.
    ///
    /// On timeout the unfinished handles are kept registered and their names
    /// returned, so the caller can escalate with [`cancel_all`](Self::cancel_all).
    pub(crate) async fn drain(&self, deadline: Option<Duration>) -> Result<(), Vec<String>> {
        let mut entries = self.take_entries();
        if entries.is_empty() {
            return Ok(());
        }

        let wait_all = async {
            for handle in &mut entries {
                let _ = (&mut handle.join).await;
            }
        };

        match deadline {
            None => {
                wait_all.await;
                Ok(())
            }
            Some(d) => {
                if tokio::time::timeout(d, wait_all).await.is_ok() {
                    return Ok(());
                }
                let stuck: Vec<String> = entries
                    .iter()
                    .filter(|h| !h.join.is_finished())
                    .map(|h| h.name.clone())
                    .collect();
                self.put_back(entries);
                Err(stuck)
            }
        }
    }

    /// Cancels every registered activity, waits up to `grace`, then aborts
    /// whatever is still running. Returns the names of force-dropped
    /// activities. Idempotent: an empty registry is a no-op.
    pub(crate) async fn cancel_all(&self, grace: Duration) -> Vec<String> {
        let mut entries = self.take_entries();
        if entries.is_empty() {
            return Vec::new();
        }

        for handle in &entries {
            handle.cancel.cancel();
        }

        let wait_all = async {
            for handle in &mut entries {
                let _ = (&mut handle.join).await;
            }
        };
        if tokio::time::timeout(grace, wait_all).await.is_ok() {
            return Vec::new();
        }

        let mut dropped = Vec::new();
        for handle in &entries {
            if !handle.join.is_finished() {
                handle.join.abort();
                dropped.push(handle.name.clone());
            }
        }
        dropped
    }

    /// Snapshot of registered activities for observability.
    pub(crate) fn infos(&self) -> Vec<ActivityInfo> {
        match self.entries.lock() {
            Ok(entries) => entries
                .iter()
                .map(|h| ActivityInfo {
                    name: h.name.clone(),
                    ran_at: h.ran_at.lock().ok().and_then(|s| *s),
                    finished: h.join.is_finished(),
                })
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Drops finished bookkeeping on lifecycle reset.
    pub(crate) fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    fn take_entries(&self) -> Vec<ActivityHandle> {
        match self.entries.lock() {
            Ok(mut entries) => std::mem::take(&mut *entries),
            Err(_) => Vec::new(),
        }
    }

    fn put_back(&self, entries: Vec<ActivityHandle>) {
        if let Ok(mut slot) = self.entries.lock() {
            slot.extend(entries.into_iter().filter(|h| !h.join.is_finished()));
        }
    }
}
