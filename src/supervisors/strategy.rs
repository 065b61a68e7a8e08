//! # Revive strategies.
//!
//! [`SupervisorStrategy`] is itself a service: start it (typically as a child
//! of the service whose workers it guards), register services with
//! [`SupervisorStrategy::add`], and it revives them when they crash.
//!
//! ## Variants
//! - **one-for-one**: only the crashed service is restarted.
//! - **one-for-all**: a crash restarts every watched service.
//! - **forfeit** (either revive scope): instead of restarting, the crashed
//!   service (or all of them) is stopped and dropped from the watch list.
//! - **crash-through**: no revive at all; any watched crash re-raises through
//!   the strategy itself, crashing it with the victim's reason.
//!
//! ## Budget
//! At most `max_restarts` revives within the sliding `over` window; exceeding
//! the budget crashes the strategy itself, which propagates like any other
//! crash. Delays between revives follow the configured backoff and jitter.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;

use crate::activities::ActivitySpec;
use crate::error::ActivityError;
use crate::events::{Event, EventKind};
use crate::policies::{BackoffPolicy, JitterPolicy};
use crate::service::{Service, ServiceContext, SupervisedRef};

/// Which services a revive touches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReviveScope {
    /// Restart only the crashed service.
    OneForOne,
    /// Restart every watched service when any of them crashes.
    OneForAll,
    /// Revive nothing: re-raise the first watched crash through the strategy.
    CrashThrough,
}

/// A service that watches other services and revives them on crash.
pub struct SupervisorStrategy {
    inner: Arc<StrategyInner>,
}

/// Cloneable handle for managing a strategy's watch list after the strategy
/// itself has been handed to [`Supervised::new`](crate::Supervised::new).
#[derive(Clone)]
pub struct StrategyHandle {
    inner: Arc<StrategyInner>,
}

impl StrategyHandle {
    /// Registers a service to watch. Callable before or after start.
    pub fn add(&self, service: SupervisedRef) {
        self.inner.add(service);
    }

    /// Drops a service from the watch list.
    pub fn discard(&self, service: &SupervisedRef) {
        self.inner.discard(service);
    }

    /// Currently watched services.
    pub fn watched(&self) -> Vec<SupervisedRef> {
        self.inner.snapshot()
    }
}

struct StrategyInner {
    scope: ReviveScope,
    forfeit: bool,
    max_restarts: u32,
    over: Duration,
    backoff: BackoffPolicy,
    jitter: JitterPolicy,
    watched: Mutex<Vec<SupervisedRef>>,
    changed: Notify,
    history: Mutex<VecDeque<Instant>>,
}

impl SupervisorStrategy {
    /// Restart only the crashed service.
    pub fn one_for_one() -> Self {
        Self::with_scope(ReviveScope::OneForOne)
    }

    /// Restart every watched service when any of them crashes.
    pub fn one_for_all() -> Self {
        Self::with_scope(ReviveScope::OneForAll)
    }

    /// Revive nothing: the first watched crash crashes the strategy itself,
    /// carrying the victim's reason, and propagates from there like any other
    /// crash. Budget, backoff, and forfeit settings do not apply.
    pub fn crash_through() -> Self {
        Self::with_scope(ReviveScope::CrashThrough)
    }

    fn with_scope(scope: ReviveScope) -> Self {
        Self {
            inner: Arc::new(StrategyInner {
                scope,
                forfeit: false,
                max_restarts: 100,
                over: Duration::from_secs(1),
                backoff: BackoffPolicy::default(),
                jitter: JitterPolicy::default(),
                watched: Mutex::new(Vec::new()),
                changed: Notify::new(),
                history: Mutex::new(VecDeque::new()),
            }),
        }
    }

    /// Forfeit crashed services (stop and drop) instead of restarting them.
    pub fn forfeit(mut self) -> Self {
        self.with_inner(|inner| inner.forfeit = true);
        self
    }

    /// Sets the revive budget: at most `n` revives within the `over` window.
    pub fn max_restarts(mut self, n: u32) -> Self {
        self.with_inner(|inner| inner.max_restarts = n);
        self
    }

    /// Sets the sliding window the revive budget is measured over.
    pub fn over(mut self, window: Duration) -> Self {
        self.with_inner(|inner| inner.over = window);
        self
    }

    /// Sets the backoff between revives of the same burst.
    pub fn backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.with_inner(|inner| inner.backoff = backoff);
        self
    }

    /// Sets the jitter applied to revive delays.
    pub fn jitter(mut self, jitter: JitterPolicy) -> Self {
        self.with_inner(|inner| inner.jitter = jitter);
        self
    }

    /// Registers a service to watch. Callable before or after start.
    pub fn add(&self, service: SupervisedRef) {
        self.inner.add(service);
    }

    /// Drops a service from the watch list.
    pub fn discard(&self, service: &SupervisedRef) {
        self.inner.discard(service);
    }

    /// Currently watched services.
    pub fn watched(&self) -> Vec<SupervisedRef> {
        self.inner.snapshot()
    }

    /// Hands out a cloneable watch-list handle.
    pub fn watched_handle(&self) -> StrategyHandle {
        StrategyHandle {
            inner: Arc::clone(&self.inner),
        }
    }

    fn with_inner(&mut self, f: impl FnOnce(&mut StrategyInner)) {
        // Builder methods run before the strategy is shared; get_mut only
        // fails if an Arc clone already escaped, in which case the setting
        // is silently left unchanged.
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            f(inner);
        }
    }
}

impl Service for SupervisorStrategy {
    fn declare_activities(&self) -> Vec<ActivitySpec> {
        let inner = Arc::clone(&self.inner);
        vec![ActivitySpec::task("revive-loop", move |ctx| {
            let inner = Arc::clone(&inner);
            async move { inner.run(ctx).await }
        })
        .one_shot()]
    }
}

impl StrategyInner {
    fn add(&self, service: SupervisedRef) {
        if let Ok(mut watched) = self.watched.lock() {
            watched.push(service);
        }
        // notify_one keeps a permit: an add racing the loop between waits
        // still wakes the next `notified()` call.
        self.changed.notify_one();
    }

    fn discard(&self, service: &SupervisedRef) {
        if let Ok(mut watched) = self.watched.lock() {
            watched.retain(|s| !Arc::ptr_eq(s, service));
        }
        self.changed.notify_one();
    }

    async fn run(&self, ctx: ServiceContext) -> Result<(), ActivityError> {
        let mut prev_delay: Option<Duration> = None;

        loop {
            if ctx.should_stop() {
                return Ok(());
            }

            let watched = self.snapshot();
            let Some(victim) = self.wait_for_crash(&ctx, &watched).await else {
                if ctx.should_stop() {
                    return Ok(());
                }
                continue;
            };

            if self.scope == ReviveScope::CrashThrough {
                let reason = victim
                    .crash_reason()
                    .map(|err| err.to_string())
                    .unwrap_or_else(|| "no recorded reason".to_string());
                tracing::error!(
                    service = victim.name(),
                    reason = %reason,
                    "watched service crashed; crashing through"
                );
                return Err(ActivityError::failed(format!(
                    "watched service '{}' crashed: {reason}",
                    victim.name()
                )));
            }

            if !self.within_budget() {
                ctx.publish(
                    Event::now(EventKind::ReviveExhausted).with_service(victim.name()),
                );
                return Err(ActivityError::failed(format!(
                    "revive budget exhausted: {} restarts within {:?}",
                    self.max_restarts, self.over
                )));
            }

            if self.forfeit {
                self.forfeit_crashed(&ctx, &victim).await;
                prev_delay = None;
                continue;
            }

            let delay = self.jitter.apply(self.backoff.next(prev_delay));
            prev_delay = Some(delay);
            tracing::info!(service = victim.name(), ?delay, "revive scheduled");
            ctx.publish(
                Event::now(EventKind::ReviveScheduled)
                    .with_service(victim.name())
                    .with_delay(delay),
            );
            if !ctx.sleep(delay).await.expired() {
                return Ok(());
            }

            // Crash-through returned above; only the revive scopes get here.
            if self.scope == ReviveScope::OneForAll {
                let watched = self.snapshot();
                for service in watched.iter().rev() {
                    service.stop().await;
                }
                let mut all_ok = true;
                for service in &watched {
                    all_ok &= self.revive(service).await;
                }
                if all_ok {
                    prev_delay = None;
                }
            } else if self.revive(&victim).await {
                prev_delay = None;
            }
        }
    }

    /// Stops and restarts one service; true on success.
    async fn revive(&self, service: &SupervisedRef) -> bool {
        service.stop().await;
        match service.restart().await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(service = service.name(), error = %err, "revive failed");
                false
            }
        }
    }

    async fn forfeit_crashed(&self, ctx: &ServiceContext, victim: &SupervisedRef) {
        tracing::warn!(service = victim.name(), "crashed service forfeited");
        ctx.publish(Event::now(EventKind::ReviveForfeited).with_service(victim.name()));
        if self.scope == ReviveScope::OneForAll {
            let watched = self.snapshot();
            for service in watched.iter().rev() {
                service.stop().await;
            }
            if let Ok(mut list) = self.watched.lock() {
                list.clear();
            }
        } else {
            victim.stop().await;
            if let Ok(mut watched) = self.watched.lock() {
                watched.retain(|s| !Arc::ptr_eq(s, victim));
            }
        }
    }

    /// Waits until a watched service crashes. `None` means the stop flag was
    /// raised or the watch list changed; the caller re-evaluates.
    async fn wait_for_crash(
        &self,
        ctx: &ServiceContext,
        watched: &[SupervisedRef],
    ) -> Option<SupervisedRef> {
        if watched.is_empty() {
            tokio::select! {
                _ = ctx.wait_for_stop() => None,
                _ = self.changed.notified() => None,
            }
        } else {
            let crashes: Vec<_> = watched
                .iter()
                .map(|s| {
                    let s = s.clone();
                    Box::pin(async move {
                        s.wait_until_crashed().await;
                        s
                    })
                })
                .collect();
            tokio::select! {
                _ = ctx.wait_for_stop() => None,
                _ = self.changed.notified() => None,
                (victim, _, _) = futures::future::select_all(crashes) => Some(victim),
            }
        }
    }

    /// Sliding-window budget check; records the revive when within budget.
    fn within_budget(&self) -> bool {
        let Ok(mut history) = self.history.lock() else {
            return false;
        };
        let now = Instant::now();
        while let Some(front) = history.front() {
            if now.duration_since(*front) > self.over {
                history.pop_front();
            } else {
                break;
            }
        }
        if history.len() as u32 >= self.max_restarts {
            return false;
        }
        history.push_back(now);
        true
    }

    fn snapshot(&self) -> Vec<SupervisedRef> {
        match self.watched.lock() {
            Ok(watched) => watched.clone(),
            Err(_) => Vec::new(),
        }
    }
}
