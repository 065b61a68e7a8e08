//! # Activity descriptors.
//!
//! An [`ActivitySpec`] describes one background unit a service owns: what to
//! run and how to drive it. Specs come from two places:
//!
//! - **Declaratively**, returned from `Service::declare_activities()` before
//!   the service starts.
//! - **Dynamically**, via `ServiceContext::add_future` / `add_task` while the
//!   service is Starting or Running.
//!
//! ## Variants
//! - [`ActivitySpec::future`] / [`ActivitySpec::from_future`] — a single
//!   awaitable, run once.
//! - [`ActivitySpec::task`] — a loop body re-invoked while the service runs,
//!   unless marked [`one_shot`](ActivitySpec::one_shot).
//! - [`ActivitySpec::interval`] — invoked every period, eager or lazy.
//! - [`ActivitySpec::cron`] — fire times computed by a [`TimerOracle`].
//!
//! Bodies receive a [`ServiceContext`] and must observe `should_stop` (via
//! `ctx.sleep` or explicit checks) to keep shutdown prompt.

use std::borrow::Cow;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::activities::timer::TimerOracle;
use crate::error::{ActivityError, ServiceError};
use crate::service::ServiceContext;

/// Boxed future produced by an activity body.
pub type ActivityFuture = Pin<Box<dyn Future<Output = Result<(), ActivityError>> + Send + 'static>>;

/// Shared body factory: invoked once per execution, producing a fresh future.
pub(crate) type ActivityBody = Arc<dyn Fn(ServiceContext) -> ActivityFuture + Send + Sync>;

/// When an interval timer fires for the first time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FireMode {
    /// First fire immediately on start (t = 0).
    Eager,
    /// First fire after one full period (t = D).
    Lazy,
}

/// How the runner drives an activity body.
#[derive(Clone)]
pub(crate) enum ActivityKind {
    /// Run once to completion.
    Future,
    /// Re-invoke while the service is running.
    Loop {
        /// Run the body exactly once instead of looping.
        one_shot: bool,
        /// Request a stop of the owning service when the body exits normally.
        stop_on_exit: bool,
    },
    /// Invoke on a fixed-rate schedule.
    Interval { period: Duration, mode: FireMode },
    /// Invoke at instants computed by the oracle. Always lazy.
    Cron { oracle: Arc<dyn TimerOracle> },
}

impl ActivityKind {
    fn label(&self) -> &'static str {
        match self {
            ActivityKind::Future => "future",
            ActivityKind::Loop { .. } => "task",
            ActivityKind::Interval { .. } => "interval",
            ActivityKind::Cron { .. } => "cron",
        }
    }
}

/// Descriptor for one background activity owned by a service.
#[derive(Clone)]
pub struct ActivitySpec {
    name: Cow<'static, str>,
    kind: ActivityKind,
    body: ActivityBody,
}

impl ActivitySpec {
    fn new<F, Fut>(name: impl Into<Cow<'static, str>>, kind: ActivityKind, f: F) -> Self
    where
        F: Fn(ServiceContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ActivityError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            kind,
            body: Arc::new(move |ctx| -> ActivityFuture { Box::pin(f(ctx)) }),
        }
    }

    /// A single awaitable built per execution from a factory closure.
    pub fn future<F, Fut>(name: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: Fn(ServiceContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ActivityError>> + Send + 'static,
    {
        Self::new(name, ActivityKind::Future, f)
    }

    /// A single already-built awaitable.
    ///
    /// The future is consumed by its one execution; on restart, declared
    /// activities are re-collected from `declare_activities()`, so prefer
    /// [`ActivitySpec::future`] there.
    pub fn from_future<Fut>(name: impl Into<Cow<'static, str>>, fut: Fut) -> Self
    where
        Fut: Future<Output = Result<(), ActivityError>> + Send + 'static,
    {
        let slot: Mutex<Option<ActivityFuture>> = Mutex::new(Some(Box::pin(fut)));
        Self {
            name: name.into(),
            kind: ActivityKind::Future,
            body: Arc::new(move |_ctx| -> ActivityFuture {
                match slot.lock().ok().and_then(|mut s| s.take()) {
                    Some(fut) => fut,
                    None => Box::pin(async { Ok::<(), ActivityError>(()) }),
                }
            }),
        }
    }

    /// A loop body: re-invoked after it returns, for as long as the service
    /// is running. Crashes the service if it raises.
    pub fn task<F, Fut>(name: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: Fn(ServiceContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ActivityError>> + Send + 'static,
    {
        Self::new(
            name,
            ActivityKind::Loop {
                one_shot: false,
                stop_on_exit: false,
            },
            f,
        )
    }

    /// An interval timer: the body is invoked every `period`.
    ///
    /// `period` must be non-zero; zero is rejected at launch with
    /// `InvalidArgument`.
    pub fn interval<F, Fut>(
        name: impl Into<Cow<'static, str>>,
        period: Duration,
        mode: FireMode,
        f: F,
    ) -> Self
    where
        F: Fn(ServiceContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ActivityError>> + Send + 'static,
    {
        Self::new(name, ActivityKind::Interval { period, mode }, f)
    }

    /// A crontab-style timer: fire instants come from the oracle.
    pub fn cron<F, Fut>(
        name: impl Into<Cow<'static, str>>,
        oracle: Arc<dyn TimerOracle>,
        f: F,
    ) -> Self
    where
        F: Fn(ServiceContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ActivityError>> + Send + 'static,
    {
        Self::new(name, ActivityKind::Cron { oracle }, f)
    }

    /// Marks a task as one-shot: the body runs once and is not re-invoked.
    ///
    /// No effect on non-task variants.
    pub fn one_shot(mut self) -> Self {
        if let ActivityKind::Loop { one_shot, .. } = &mut self.kind {
            *one_shot = true;
        }
        self
    }

    /// Requests a stop of the owning service once the task body exits
    /// normally. No effect on non-task variants.
    pub fn stop_service_on_exit(mut self) -> Self {
        if let ActivityKind::Loop { stop_on_exit, .. } = &mut self.kind {
            *stop_on_exit = true;
        }
        self
    }

    /// Display name of the activity.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rejects malformed specs before anything is spawned.
    pub(crate) fn validate(&self) -> Result<(), ServiceError> {
        if self.name.trim().is_empty() {
            return Err(ServiceError::invalid_argument("activity name is empty"));
        }
        if let ActivityKind::Interval { period, .. } = &self.kind {
            if period.is_zero() {
                return Err(ServiceError::invalid_argument(format!(
                    "interval activity '{}' has zero period",
                    self.name
                )));
            }
        }
        Ok(())
    }

    pub(crate) fn into_parts(self) -> (Cow<'static, str>, ActivityKind, ActivityBody) {
        (self.name, self.kind, self.body)
    }

    /// Short variant label for logs.
    pub fn kind_label(&self) -> &'static str {
        self.kind.label()
    }
}

#[cfg(test)]
mod tests {
    use super::{ActivitySpec, FireMode};
    use std::time::Duration;

    #[test]
    fn zero_period_interval_is_rejected() {
        let spec = ActivitySpec::interval("tick", Duration::ZERO, FireMode::Lazy, |_ctx| async {
            Ok(())
        });
        assert!(spec.validate().is_err());
    }

    #[test]
    fn empty_name_is_rejected() {
        let spec = ActivitySpec::task("  ", |_ctx| async { Ok(()) });
        assert!(spec.validate().is_err());
    }

    #[test]
    fn modifiers_only_touch_tasks() {
        let spec = ActivitySpec::future("boot", |_ctx| async { Ok(()) }).one_shot();
        assert_eq!(spec.kind_label(), "future");
        let spec = ActivitySpec::task("worker", |_ctx| async { Ok(()) }).one_shot();
        assert_eq!(spec.kind_label(), "task");
        assert!(spec.validate().is_ok());
    }
}
