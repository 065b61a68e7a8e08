//! Supervisor strategies: services that revive other services.
//!
//! A [`SupervisorStrategy`] watches registered services and restarts them when
//! they crash, under a restart-rate budget. The parent of a watched service
//! should isolate child crashes ([`CrashPolicy::Isolate`](crate::CrashPolicy))
//! so the strategy, not propagation, decides what happens. The crash-through
//! variant is the degenerate strategy: it revives nothing and re-raises the
//! first watched crash as its own.

mod strategy;

pub use strategy::{ReviveScope, StrategyHandle, SupervisorStrategy};
