//! # servisor
//!
//! **Servisor** is a cooperative service-supervision framework for tokio:
//! build applications out of long-lived async *services* arranged in a tree,
//! each with lifecycle hooks, background activities, and coordinated startup,
//! shutdown, restart, and crash propagation.
//!
//! ## Features
//!
//! | Area             | Description                                                       | Key types / traits                          |
//! |------------------|-------------------------------------------------------------------|---------------------------------------------|
//! | **Lifecycle**    | Ordered start, reverse-ordered stop, restart, crash propagation.  | [`Service`], [`Supervised`]                 |
//! | **Activities**   | Futures, loop tasks, interval timers, cron timers per service.    | [`ActivitySpec`], [`FireMode`], [`TimerOracle`] |
//! | **Signals**      | Level-triggered flags and cancellable sleep for loop bodies.      | [`Flag`], [`Wakeup`], [`ServiceContext`]    |
//! | **Strategies**   | Revive crashed services with budgets and backoff.                 | [`SupervisorStrategy`], [`ReviveScope`]     |
//! | **Observability**| Event bus plus pluggable subscribers.                             | [`Event`], [`EventKind`], [`Subscribe`]     |
//! | **Embedding**    | Host-friendly start/join/stop and scoped runs.                    | [`start_system`], [`SystemHandle`], [`run_scoped`] |
//! | **Errors**       | Typed errors for the engine and for service code.                 | [`ServiceError`], [`ActivityError`]         |
//!
//! ## Optional features
//! - `logging`: exports [`LogWriter`], a built-in tracing subscriber sink
//!   _(demo/reference only)_.
//!
//! ```no_run
//! use std::time::Duration;
//! use servisor::{ActivityError, ActivitySpec, Service, ServiceContext, Supervised};
//!
//! #[derive(Default)]
//! struct Heartbeat;
//!
//! impl Service for Heartbeat {
//!     fn declare_activities(&self) -> Vec<ActivitySpec> {
//!         vec![ActivitySpec::task("beat", |ctx: ServiceContext| async move {
//!             while !ctx.should_stop() {
//!                 println!("beat");
//!                 ctx.sleep(Duration::from_secs(1)).await;
//!             }
//!             Ok::<(), ActivityError>(())
//!         })]
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let svc = Supervised::new(Heartbeat);
//!     svc.start().await?;
//!     tokio::time::sleep(Duration::from_secs(3)).await;
//!     svc.stop().await;
//!     Ok(())
//! }
//! ```
//!
//! ---

mod activities;
mod config;
mod embed;
mod error;
mod events;
mod flag;
mod policies;
mod service;
mod sleep;
mod state;
mod subscribers;
mod supervisors;

// ---- Public re-exports ----

pub use activities::{ActivityFuture, ActivityInfo, ActivitySpec, FireMode, TimerOracle};
pub use config::Config;
pub use embed::{run_scoped, start_system, SystemHandle};
pub use error::{ActivityError, ServiceError};
pub use events::{Bus, Event, EventKind};
pub use flag::Flag;
pub use policies::{BackoffPolicy, CrashPolicy, JitterPolicy};
pub use service::{
    Diag, Service, ServiceContext, ServiceRef, Supervised, SupervisedBuilder, SupervisedRef,
};
pub use sleep::{sleep_with, Wakeup};
pub use state::ServiceState;
pub use subscribers::{Subscribe, SubscriberSet};
pub use supervisors::{ReviveScope, StrategyHandle, SupervisorStrategy};

// Optional: built-in tracing sink for tree events (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
