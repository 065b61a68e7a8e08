//! # The lifecycle engine.
//!
//! [`Supervised`] wraps a [`Service`] implementation in a tree node that owns
//! its state machine, lifecycle flags, children, and background activities.
//!
//! ## Architecture
//! ```text
//! Supervised::start()
//!   ├─► state Init → Starting
//!   ├─► on_first_start (once) / on_start
//!   ├─► declared children, in order: start + wait-until-started
//!   ├─► launch declared activities (supervised wrappers)
//!   ├─► on_started
//!   └─► raise `started`, state → Running
//!
//! Supervised::stop()                    (spawned: shielded from caller cancel)
//!   ├─► raise `should_stop`, state → Stopping
//!   ├─► on_stop
//!   ├─► children in reverse start order, per-child grace
//!   ├─► drain activities up to the grace deadline
//!   │     └─► escalate: cancel tokens, hard grace, abort stragglers
//!   ├─► on_shutdown
//!   └─► raise `stopped` + `shutdown`, state → Shutdown
//! ```
//!
//! ## Rules
//! - `start()`/`stop()` are idempotent: one execution, every caller awaits the
//!   same outcome.
//! - A crash records the first reason, flags `crashed` + `should_stop`, tears
//!   the subtree down, and notifies the parent according to the parent's
//!   crash policy.
//! - The stop sequence always completes, even if every caller is cancelled.
//! - Parents hold children; children hold only a weak back-reference.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio_util::sync::CancellationToken;

use crate::activities::registry::ActivityRegistry;
use crate::activities::{ActivityInfo, ActivitySpec};
use crate::config::Config;
use crate::error::{ActivityError, ServiceError};
use crate::events::{Bus, Event, EventKind};
use crate::flag::Flag;
use crate::policies::CrashPolicy;
use crate::service::context::ServiceContext;
use crate::service::diag::Diag;
use crate::service::service::Service;
use crate::sleep::{sleep_with, Wakeup};
use crate::state::ServiceState;
use crate::subscribers::{Subscribe, SubscriberSet};

/// Counter for stable node ids used in logs.
static NODE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Shared handle to a supervised service node.
pub type SupervisedRef = Arc<Supervised>;

/// A service wrapped in its lifecycle engine: one node of a supervision tree.
pub struct Supervised {
    service: Arc<dyn Service>,
    name: String,
    id: u64,
    cfg: Config,
    // Self-handle (set by `Arc::new_cyclic`) used to mint contexts and spawn
    // owned lifecycle tasks from `&self` methods.
    weak: Weak<Supervised>,

    bus: Mutex<Bus>,
    // Root-only: keeps subscriber workers alive for the tree's lifetime.
    _subscribers: Option<Arc<SubscriberSet>>,

    state_tx: watch::Sender<ServiceState>,
    started: Flag,
    stopped: Flag,
    shutdown: Flag,
    crashed: Flag,
    should_stop: Flag,

    crash_slot: Mutex<Option<ServiceError>>,
    children: Mutex<Vec<SupervisedRef>>,
    parent: Mutex<Weak<Supervised>>,
    registry: ActivityRegistry,
    diag: Diag,

    // Serializes start executions; concurrent callers await flags instead.
    lifecycle: AsyncMutex<()>,
    // Escalation token; activities get child tokens. Recreated on restart.
    token: Mutex<CancellationToken>,
    stop_begun: AtomicBool,
    first_start_done: AtomicBool,
    children_declared: AtomicBool,
    restarts: AtomicU32,
}

impl std::fmt::Debug for Supervised {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervised")
            .field("name", &self.name)
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl Supervised {
    /// Wraps a service with the default configuration and a fresh bus.
    pub fn new(service: impl Service) -> SupervisedRef {
        Self::builder(service).build()
    }

    /// Wraps a service with an explicit configuration.
    pub fn with_config(service: impl Service, cfg: Config) -> SupervisedRef {
        Self::builder(service).config(cfg).build()
    }

    /// Starts building a node; use for attaching subscribers at the root.
    pub fn builder(service: impl Service) -> SupervisedBuilder {
        SupervisedBuilder::new(service)
    }

    // ---- identity & observability ----

    /// Human name of the wrapped service.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stable display label: name plus node id.
    pub fn label(&self) -> String {
        format!("{}-{}", self.name, self.id)
    }

    /// Stable node id for logging.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ServiceState {
        *self.state_tx.borrow()
    }

    /// True once `started` has been raised in this lifecycle.
    pub fn is_started(&self) -> bool {
        self.started.is_set()
    }

    /// True once `stopped` has been raised in this lifecycle.
    pub fn is_stopped(&self) -> bool {
        self.stopped.is_set()
    }

    /// True once the service crashed in this lifecycle.
    pub fn is_crashed(&self) -> bool {
        self.crashed.is_set()
    }

    /// Level-triggered cooperative stop signal for loop bodies.
    pub fn should_stop(&self) -> bool {
        self.should_stop.is_set()
    }

    /// The error that crashed this service, if it is crashed.
    pub fn crash_reason(&self) -> Option<ServiceError> {
        self.crash_slot.lock().ok().and_then(|slot| slot.clone())
    }

    /// Number of restarts performed on this node.
    pub fn restart_count(&self) -> u32 {
        self.restarts.load(Ordering::Relaxed)
    }

    /// Snapshot of this node's registered activities.
    pub fn activities(&self) -> Vec<ActivityInfo> {
        self.registry.infos()
    }

    /// Snapshot of the current supervision list (declared + runtime children,
    /// in start order).
    pub fn children(&self) -> Vec<SupervisedRef> {
        self.children_snapshot()
    }

    /// Diagnostic flag set for this node.
    pub fn diag(&self) -> &Diag {
        &self.diag
    }

    /// Subscribes to the tree's event bus.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.bus().subscribe()
    }

    // ---- waiting ----

    /// Completes once `started` is raised.
    pub async fn wait_until_started(&self) {
        self.started.wait().await;
    }

    /// Completes once `stopped` is raised.
    pub async fn wait_until_stopped(&self) {
        self.stopped.wait().await;
    }

    /// Completes once the service crashes.
    pub async fn wait_until_crashed(&self) {
        self.crashed.wait().await;
    }

    /// Cancellable sleep bound to this service's stop signal.
    pub async fn sleep(&self, duration: Duration) -> Wakeup {
        sleep_with(duration, &[&self.should_stop]).await
    }

    // ---- lifecycle operations ----

    /// Starts the service: hooks, declared children in order, activities.
    ///
    /// Completes when the service is Running (`Ok`) or Crashed (`Err` with
    /// the reason). Idempotent: concurrent and repeated calls perform the
    /// startup once and all observe the same outcome.
    pub async fn start(&self) -> Result<(), ServiceError> {
        loop {
            match self.state() {
                ServiceState::Init => {}
                ServiceState::Starting | ServiceState::Running => {
                    return self.await_start_outcome().await;
                }
                ServiceState::Crashed => return Err(self.crashed_error()),
                state @ (ServiceState::Stopping | ServiceState::Shutdown) => {
                    return Err(ServiceError::InvalidState { op: "start", state });
                }
            }

            let guard = self.lifecycle.lock().await;
            if self.state() != ServiceState::Init {
                // Someone else ran the startup while we waited; re-dispatch.
                drop(guard);
                continue;
            }
            let result = self.run_start().await;
            drop(guard);
            return result;
        }
    }

    /// Starts the service unless it already left Init.
    ///
    /// Returns whether this call performed the start.
    pub async fn maybe_start(&self) -> Result<bool, ServiceError> {
        if self.state() != ServiceState::Init {
            return Ok(false);
        }
        self.start().await?;
        Ok(true)
    }

    /// Stops the service: children in reverse order, activity drain, hooks.
    ///
    /// Completes once `stopped` is raised. Idempotent, and shielded: the
    /// shutdown sequence finishes even if every caller is cancelled.
    pub async fn stop(&self) {
        self.begin_stop();
        self.stopped.wait().await;
    }

    /// Restarts a Shutdown or Crashed service: reset, `on_restart`, `start`.
    pub async fn restart(&self) -> Result<(), ServiceError> {
        let state = self.state();
        if !state.is_restartable() {
            return Err(ServiceError::InvalidState {
                op: "restart",
                state,
            });
        }

        self.reset();
        self.restarts.fetch_add(1, Ordering::Relaxed);
        tracing::info!(service = %self.name, id = self.id, "restarting");

        let ctx = self.fresh_context();
        if let Err(err) = self.service.on_restart(&ctx).await {
            let err = self.hook_crash("on_restart", err);
            self.record_crash(err.clone());
            return Err(err);
        }
        self.start().await
    }

    // ---- tree building ----

    /// Attaches a child before start; equivalent to declaring it.
    ///
    /// `InvalidState` once the service has left Init.
    pub fn add_dependency(&self, child: SupervisedRef) -> Result<SupervisedRef, ServiceError> {
        let state = self.state();
        if state != ServiceState::Init {
            return Err(ServiceError::InvalidState {
                op: "add dependency",
                state,
            });
        }
        self.attach_child(&child);
        Ok(child)
    }

    /// Attaches and starts a child while this service is Starting or Running.
    ///
    /// The child joins the end of the supervision list, so it is among the
    /// first stopped on shutdown. Completes once the child is Running.
    pub async fn add_runtime_dependency(
        &self,
        child: SupervisedRef,
    ) -> Result<SupervisedRef, ServiceError> {
        let state = self.state();
        if !state.is_active() {
            return Err(ServiceError::InvalidState {
                op: "add runtime dependency",
                state,
            });
        }
        self.attach_child(&child);
        if let Err(err) = child.clone().start_boxed().await {
            return Err(ServiceError::DependencyFailure {
                child: child.name().to_string(),
                cause: Arc::new(err),
            });
        }
        Ok(child)
    }

    // ---- internals: startup ----

    async fn run_start(&self) -> Result<(), ServiceError> {
        self.set_state(ServiceState::Starting, "start requested");
        let mut guard = StartGuard::new(self);
        let ctx = self.fresh_context();

        if !self.first_start_done.swap(true, Ordering::SeqCst) {
            if let Err(err) = self.service.on_first_start(&ctx).await {
                return Err(guard.fail(self.hook_crash("on_first_start", err)));
            }
        }
        if let Err(err) = self.service.on_start(&ctx).await {
            return Err(guard.fail(self.hook_crash("on_start", err)));
        }

        if !self.children_declared.swap(true, Ordering::SeqCst) {
            for child in self.service.declare_children() {
                self.attach_child(&child);
            }
        }

        let children = self.children_snapshot();
        for child in &children {
            match child.clone().start_boxed().await {
                Ok(()) => guard.child_started(child.clone()),
                Err(err) => {
                    return Err(guard.fail(ServiceError::DependencyFailure {
                        child: child.name().to_string(),
                        cause: Arc::new(err),
                    }));
                }
            }
            if self.crashed.is_set() {
                // A sibling crashed us asynchronously while this child came up.
                return Err(guard.fail(self.crashed_error()));
            }
        }

        for spec in self.service.declare_activities() {
            if let Err(err) = self.spawn_activity(spec) {
                return Err(guard.fail(err));
            }
        }

        if let Err(err) = self.service.on_started(&ctx).await {
            return Err(guard.fail(self.hook_crash("on_started", err)));
        }
        if self.crashed.is_set() {
            return Err(guard.fail(self.crashed_error()));
        }

        guard.disarm();
        self.started.set();
        self.set_state(ServiceState::Running, "startup complete");
        Ok(())
    }

    async fn await_start_outcome(&self) -> Result<(), ServiceError> {
        tokio::select! {
            _ = self.started.wait() => Ok(()),
            _ = self.crashed.wait() => Err(self.crashed_error()),
        }
    }

    pub(crate) fn start_boxed(self: Arc<Self>) -> BoxFuture<'static, Result<(), ServiceError>> {
        Box::pin(async move { self.start().await })
    }

    // ---- internals: shutdown ----

    /// Kicks off the shutdown sequence exactly once, without waiting for it.
    pub(crate) fn begin_stop(&self) {
        if self.stop_begun.swap(true, Ordering::SeqCst) {
            return;
        }
        let Some(me) = self.weak.upgrade() else {
            return;
        };
        // Shield: run the sequence on its own task so a cancelled caller
        // cannot leave the tree half-stopped.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(me.stop_sequence());
        }
    }

    pub(crate) fn stop_boxed(self: Arc<Self>) -> BoxFuture<'static, ()> {
        Box::pin(async move { self.stop().await })
    }

    fn stop_sequence(self: Arc<Self>) -> BoxFuture<'static, ()> {
        Box::pin(async move {
            match self.state() {
                ServiceState::Init | ServiceState::Shutdown => {
                    self.stopped.set();
                    self.shutdown.set();
                    return;
                }
                ServiceState::Crashed => {
                    self.reap_crashed().await;
                    return;
                }
                ServiceState::Starting => {
                    // Let startup settle; hooks and activities observe the flag.
                    self.should_stop.set();
                    let _ = self.await_start_outcome().await;
                    if self.state() == ServiceState::Crashed {
                        self.reap_crashed().await;
                        return;
                    }
                }
                ServiceState::Running | ServiceState::Stopping => {}
            }

            self.should_stop.set();
            self.set_state(ServiceState::Stopping, "stop requested");

            let ctx = self.fresh_context();
            if let Err(err) = self.service.on_stop(&ctx).await {
                tracing::error!(service = %self.name, error = %err, "on_stop hook failed");
            }

            let deadline = self
                .cfg
                .grace_deadline()
                .map(|d| tokio::time::Instant::now() + d);

            // Reverse start order: runtime dependencies first, then declared.
            let children = self.children_snapshot();
            for child in children.iter().rev() {
                let fut = child.clone().stop_boxed();
                match stop_budget(deadline, child.cfg.grace_deadline()) {
                    None => fut.await,
                    Some(budget) => {
                        if tokio::time::timeout(budget, fut).await.is_err() {
                            tracing::warn!(
                                parent = %self.name,
                                child = %child.name(),
                                "child did not stop within its grace"
                            );
                        }
                    }
                }
            }

            let remaining =
                deadline.map(|dl| dl.saturating_duration_since(tokio::time::Instant::now()));
            if let Err(stuck) = self.registry.drain(remaining).await {
                tracing::warn!(
                    service = %self.name,
                    ?stuck,
                    "drain deadline elapsed; escalating to cancellation"
                );
                self.publish(
                    Event::now(EventKind::DrainEscalated)
                        .with_service(&self.name)
                        .with_reason(format!("stuck: {stuck:?}")),
                );
                self.cancel_token();
                let dropped = self.registry.cancel_all(self.cfg.force_grace).await;
                self.log_force_dropped(dropped);
            }

            if let Err(err) = self.service.on_shutdown(&ctx).await {
                tracing::error!(service = %self.name, error = %err, "on_shutdown hook failed");
            }

            if self.state() != ServiceState::Crashed {
                self.set_state(ServiceState::Shutdown, "stopped");
            }
            self.stopped.set();
            self.shutdown.set();
        })
    }

    /// Stop path for an already-crashed service: nothing to drain gracefully,
    /// but children and stray activities still get reaped.
    async fn reap_crashed(&self) {
        self.should_stop.set();
        let children = self.children_snapshot();
        for child in children.iter().rev() {
            child.clone().stop_boxed().await;
        }
        self.cancel_token();
        let dropped = self.registry.cancel_all(self.cfg.force_grace).await;
        self.log_force_dropped(dropped);
        self.stopped.set();
        self.shutdown.set();
    }

    // ---- internals: crash handling ----

    /// Crash entry point for activities and contexts: records the crash,
    /// tears the subtree down, and notifies the parent.
    pub(crate) fn report_crash(&self, err: ServiceError) {
        if !self.record_crash(err.clone()) {
            return;
        }

        if let Some(me) = self.weak.upgrade() {
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    let children = me.children_snapshot();
                    for child in children.iter().rev() {
                        child.clone().stop_boxed().await;
                    }
                    let dropped = me.registry.cancel_all(me.cfg.force_grace).await;
                    me.log_force_dropped(dropped);
                });
            }
        }

        if let Some(parent) = self.parent() {
            match parent.crash_policy() {
                CrashPolicy::Propagate => {
                    parent.report_crash(ServiceError::DependencyFailure {
                        child: self.name.clone(),
                        cause: Arc::new(err),
                    });
                }
                CrashPolicy::Isolate => {
                    tracing::warn!(
                        parent = %parent.name(),
                        child = %self.name,
                        error = %err,
                        "child crashed; isolated by crash policy"
                    );
                }
            }
        }
    }

    /// Records the crash without tearing anything down. First reason wins.
    /// Returns whether this call recorded it.
    fn record_crash(&self, err: ServiceError) -> bool {
        {
            let Ok(mut slot) = self.crash_slot.lock() else {
                return false;
            };
            if slot.is_some() || self.state() == ServiceState::Shutdown {
                return false;
            }
            *slot = Some(err.clone());
        }

        tracing::error!(service = %self.name, id = self.id, error = %err, "service crashed");
        self.publish(
            Event::now(EventKind::ServiceCrashed)
                .with_service(&self.name)
                .with_error(err.to_string()),
        );
        self.set_state(ServiceState::Crashed, "crash");
        self.crashed.set();
        self.should_stop.set();
        true
    }

    /// The crash policy governing this node's reaction to child crashes.
    pub fn crash_policy(&self) -> CrashPolicy {
        self.service.crash_policy()
    }

    fn crashed_error(&self) -> ServiceError {
        self.crash_reason().unwrap_or(ServiceError::InvalidState {
            op: "start",
            state: ServiceState::Crashed,
        })
    }

    fn hook_crash(&self, hook: &'static str, err: ActivityError) -> ServiceError {
        ServiceError::ActivityCrash {
            activity: hook.to_string(),
            cause: err,
        }
    }

    // ---- internals: plumbing ----

    /// Validates and launches one activity under this node.
    pub(crate) fn spawn_activity(&self, spec: ActivitySpec) -> Result<(), ServiceError> {
        spec.validate()?;
        let state = self.state();
        if !state.is_active() {
            return Err(ServiceError::InvalidState {
                op: "add activity",
                state,
            });
        }
        tracing::debug!(
            service = %self.name,
            activity = spec.name(),
            kind = spec.kind_label(),
            "launching activity"
        );
        let ctx = self.fresh_context();
        self.registry.launch(ctx, spec);
        Ok(())
    }

    fn fresh_context(&self) -> ServiceContext {
        ServiceContext::new(self.weak.clone(), &self.name, self.child_token())
    }

    fn child_token(&self) -> CancellationToken {
        match self.token.lock() {
            Ok(token) => token.child_token(),
            Err(_) => CancellationToken::new(),
        }
    }

    fn cancel_token(&self) {
        if let Ok(token) = self.token.lock() {
            token.cancel();
        }
    }

    fn set_state(&self, to: ServiceState, cause: &str) {
        let from = *self.state_tx.borrow();
        if from == to {
            return;
        }
        self.diag.unset_flag(from.as_label());
        self.diag.set_flag(to.as_label());
        self.state_tx.send_replace(to);
        tracing::info!(
            service = %self.name,
            id = self.id,
            from = %from,
            to = %to,
            cause,
            "state changed"
        );
        self.publish(
            Event::now(EventKind::StateChanged)
                .with_service(&self.name)
                .with_state(to)
                .with_reason(cause),
        );
    }

    /// Resets this node and its children back to Init for a restart.
    fn reset(&self) {
        for child in self.children_snapshot() {
            child.reset();
        }
        self.registry.clear();
        if let Ok(mut slot) = self.crash_slot.lock() {
            *slot = None;
        }
        if let Ok(mut token) = self.token.lock() {
            *token = CancellationToken::new();
        }
        self.stop_begun.store(false, Ordering::SeqCst);
        self.started.clear();
        self.stopped.clear();
        self.shutdown.clear();
        self.crashed.clear();
        self.should_stop.clear();
        self.diag.reset();
        if self.state() != ServiceState::Init {
            self.set_state(ServiceState::Init, "reset");
        }
    }

    fn attach_child(&self, child: &SupervisedRef) {
        child.set_parent(self.weak.clone());
        child.adopt_bus(&self.bus());
        if let Ok(mut children) = self.children.lock() {
            children.push(child.clone());
        }
        tracing::debug!(parent = %self.name, child = %child.name(), "dependency added");
        self.publish(
            Event::now(EventKind::DependencyAdded)
                .with_service(&self.name)
                .with_reason(child.name().to_string()),
        );
    }

    fn set_parent(&self, parent: Weak<Supervised>) {
        if let Ok(mut slot) = self.parent.lock() {
            *slot = parent;
        }
    }

    fn parent(&self) -> Option<SupervisedRef> {
        self.parent.lock().ok().and_then(|slot| slot.upgrade())
    }

    fn adopt_bus(&self, bus: &Bus) {
        if let Ok(mut slot) = self.bus.lock() {
            *slot = bus.clone();
        }
        for child in self.children_snapshot() {
            child.adopt_bus(bus);
        }
    }

    fn children_snapshot(&self) -> Vec<SupervisedRef> {
        match self.children.lock() {
            Ok(children) => children.clone(),
            Err(_) => Vec::new(),
        }
    }

    pub(crate) fn bus(&self) -> Bus {
        match self.bus.lock() {
            Ok(bus) => bus.clone(),
            Err(_) => Bus::new(1),
        }
    }

    pub(crate) fn publish(&self, ev: Event) {
        self.bus().publish(ev);
    }

    pub(crate) fn stop_flag(&self) -> &Flag {
        &self.should_stop
    }

    fn log_force_dropped(&self, dropped: Vec<String>) {
        if dropped.is_empty() {
            return;
        }
        let err = ServiceError::Timeout {
            deadline: self.cfg.grace,
            stuck: dropped,
        };
        tracing::error!(service = %self.name, error = %err, "activities force-dropped");
        self.publish(
            Event::now(EventKind::StopTimedOut)
                .with_service(&self.name)
                .with_error(err.to_string()),
        );
    }
}

/// Cleans up a failed or abandoned startup: already-started children are
/// stopped in reverse order and launched activities are cancelled. An armed
/// guard dropped mid-await means the caller was cancelled; that records a
/// cancellation-typed crash first.
struct StartGuard<'a> {
    node: &'a Supervised,
    started_children: Vec<SupervisedRef>,
    armed: bool,
}

impl<'a> StartGuard<'a> {
    fn new(node: &'a Supervised) -> Self {
        Self {
            node,
            started_children: Vec::new(),
            armed: true,
        }
    }

    fn child_started(&mut self, child: SupervisedRef) {
        self.started_children.push(child);
    }

    fn fail(&mut self, err: ServiceError) -> ServiceError {
        self.armed = false;
        self.node.record_crash(err.clone());
        self.cleanup();
        err
    }

    fn disarm(&mut self) {
        self.armed = false;
    }

    fn cleanup(&mut self) {
        let children = std::mem::take(&mut self.started_children);
        let Some(node) = self.node.weak.upgrade() else {
            return;
        };
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                for child in children.iter().rev() {
                    child.clone().stop_boxed().await;
                }
                let dropped = node.registry.cancel_all(node.cfg.force_grace).await;
                node.log_force_dropped(dropped);
            });
        }
    }
}

impl Drop for StartGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.node
                .record_crash(ServiceError::Cancelled { during: "start" });
            self.cleanup();
        }
    }
}

fn stop_budget(
    deadline: Option<tokio::time::Instant>,
    child_grace: Option<Duration>,
) -> Option<Duration> {
    let remaining = deadline.map(|dl| dl.saturating_duration_since(tokio::time::Instant::now()));
    match (remaining, child_grace) {
        (None, None) => None,
        (Some(r), None) => Some(r),
        (None, Some(g)) => Some(g),
        (Some(r), Some(g)) => Some(r.min(g)),
    }
}

/// Builder for a supervised node; the root of a tree typically attaches its
/// event subscribers here.
pub struct SupervisedBuilder {
    service: Arc<dyn Service>,
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl SupervisedBuilder {
    fn new(service: impl Service) -> Self {
        Self {
            service: Arc::new(service),
            cfg: Config::default(),
            subscribers: Vec::new(),
        }
    }

    /// Sets the node's configuration.
    pub fn config(mut self, cfg: Config) -> Self {
        self.cfg = cfg;
        self
    }

    /// Attaches an event subscriber; it observes the whole tree once children
    /// adopt this node's bus.
    pub fn subscriber(mut self, sub: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(sub);
        self
    }

    /// Builds the node.
    pub fn build(self) -> SupervisedRef {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subscribers = if self.subscribers.is_empty() {
            None
        } else {
            Some(Arc::new(SubscriberSet::new(self.subscribers, bus.clone())))
        };
        let name = self.service.name().into_owned();
        let (state_tx, _state_rx) = watch::channel(ServiceState::Init);

        Arc::new_cyclic(|weak| Supervised {
            service: self.service,
            name,
            id: NODE_SEQ.fetch_add(1, Ordering::Relaxed),
            cfg: self.cfg,
            weak: weak.clone(),
            bus: Mutex::new(bus),
            _subscribers: subscribers,
            state_tx,
            started: Flag::new(),
            stopped: Flag::new(),
            shutdown: Flag::new(),
            crashed: Flag::new(),
            should_stop: Flag::new(),
            crash_slot: Mutex::new(None),
            children: Mutex::new(Vec::new()),
            parent: Mutex::new(Weak::new()),
            registry: ActivityRegistry::new(),
            diag: Diag::default(),
            lifecycle: AsyncMutex::new(()),
            token: Mutex::new(CancellationToken::new()),
            stop_begun: AtomicBool::new(false),
            first_start_done: AtomicBool::new(false),
            children_declared: AtomicBool::new(false),
            restarts: AtomicU32::new(0),
        })
    }
}
