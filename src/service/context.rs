//! # Service context: what hooks and activity bodies see.
//!
//! [`ServiceContext`] is the engine's hand into service code. It holds a weak
//! back-reference to the owning node — never ownership, so a context captured
//! by a long-lived closure cannot keep a discarded tree alive — plus the
//! per-activity cancellation token used for shutdown escalation.
//!
//! Typical loop body:
//!
//! ```ignore
//! |ctx: ServiceContext| async move {
//!     while !ctx.should_stop() {
//!         refresh().await?;
//!         ctx.sleep(Duration::from_secs(5)).await;
//!     }
//!     Ok(())
//! }
//! ```

use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::activities::ActivitySpec;
use crate::error::{ActivityError, ServiceError};
use crate::events::Event;
use crate::sleep::Wakeup;
use crate::state::ServiceState;

use super::supervised::Supervised;

/// Capability handle bound to one supervised service.
///
/// Cheap to clone; clones share the same node reference and token.
#[derive(Clone)]
pub struct ServiceContext {
    node: Weak<Supervised>,
    token: CancellationToken,
    service: Arc<str>,
}

impl ServiceContext {
    pub(crate) fn new(node: Weak<Supervised>, service: &str, token: CancellationToken) -> Self {
        Self {
            service: Arc::from(service),
            node,
            token,
        }
    }

    /// Name of the owning service.
    pub fn service_name(&self) -> &str {
        &self.service
    }

    /// True once the service wants this code to unwind: the stop flag is
    /// raised, shutdown escalated to cancellation, or the node is gone.
    pub fn should_stop(&self) -> bool {
        if self.token.is_cancelled() {
            return true;
        }
        match self.node.upgrade() {
            Some(node) => node.should_stop(),
            None => true,
        }
    }

    /// Waits until [`should_stop`](Self::should_stop) becomes true.
    pub async fn wait_for_stop(&self) {
        let Some(node) = self.node.upgrade() else {
            return;
        };
        tokio::select! {
            _ = node.stop_flag().wait() => {}
            _ = self.token.cancelled() => {}
        }
    }

    /// Cancellable sleep bound to the service stop signal.
    ///
    /// Returns [`Wakeup::TimerExpired`] after `duration`, or
    /// [`Wakeup::Signaled`]\(0\) as soon as the service begins stopping. A zero
    /// duration yields once and reports `TimerExpired` without checking the
    /// signal.
    pub async fn sleep(&self, duration: Duration) -> Wakeup {
        if duration.is_zero() {
            tokio::task::yield_now().await;
            return Wakeup::TimerExpired;
        }
        let Some(node) = self.node.upgrade() else {
            return Wakeup::Signaled(0);
        };
        tokio::select! {
            biased;
            _ = node.stop_flag().wait() => Wakeup::Signaled(0),
            _ = self.token.cancelled() => Wakeup::Signaled(0),
            _ = tokio::time::sleep(duration) => Wakeup::TimerExpired,
        }
    }

    /// Current lifecycle state of the owning service.
    pub fn state(&self) -> ServiceState {
        match self.node.upgrade() {
            Some(node) => node.state(),
            None => ServiceState::Shutdown,
        }
    }

    /// Registers a one-shot future on the owning service.
    ///
    /// Allowed while the service is Starting or Running; `InvalidState`
    /// otherwise.
    pub fn add_future<Fut>(&self, name: &str, fut: Fut) -> Result<(), ServiceError>
    where
        Fut: Future<Output = Result<(), ActivityError>> + Send + 'static,
    {
        self.spawn(ActivitySpec::from_future(name.to_string(), fut))
    }

    /// Registers a loop task on the owning service.
    ///
    /// The body is re-invoked when it returns normally, unless the spec would
    /// be marked one-shot; use [`add_activity`](Self::add_activity) for full
    /// control. Allowed while Starting or Running.
    pub fn add_task<F, Fut>(&self, name: &str, f: F) -> Result<(), ServiceError>
    where
        F: Fn(ServiceContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ActivityError>> + Send + 'static,
    {
        self.spawn(ActivitySpec::task(name.to_string(), f))
    }

    /// Registers an arbitrary activity spec (timers included) dynamically.
    pub fn add_activity(&self, spec: ActivitySpec) -> Result<(), ServiceError> {
        self.spawn(spec)
    }

    /// Crashes the owning service with the given reason.
    pub fn crash(&self, reason: ActivityError) {
        if let Some(node) = self.node.upgrade() {
            node.report_crash(ServiceError::ActivityCrash {
                activity: "crash".to_string(),
                cause: reason,
            });
        }
    }

    /// Requests an asynchronous stop of the owning service.
    pub fn request_stop(&self) {
        if let Some(node) = self.node.upgrade() {
            node.begin_stop();
        }
    }

    pub(crate) fn publish(&self, ev: Event) {
        if let Some(node) = self.node.upgrade() {
            node.publish(ev);
        }
    }

    pub(crate) fn report_crash(&self, err: ServiceError) {
        if let Some(node) = self.node.upgrade() {
            node.report_crash(err);
        }
    }

    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }

    fn spawn(&self, spec: ActivitySpec) -> Result<(), ServiceError> {
        match self.node.upgrade() {
            Some(node) => node.spawn_activity(spec),
            None => Err(ServiceError::InvalidState {
                op: "add activity",
                state: ServiceState::Shutdown,
            }),
        }
    }
}
