//! # Service lifecycle states.
//!
//! [`ServiceState`] enumerates the stages a supervised service moves through:
//!
//! ```text
//! Init ──start()──▶ Starting ──startup ok──▶ Running
//! Running ──stop()──▶ Stopping ──drain ok──▶ Shutdown
//! {Starting|Running|Stopping} ──activity crash──▶ Crashed
//! {Shutdown|Crashed} ──restart()──▶ Init
//! ```
//!
//! Transitions are monotonic within one lifecycle; only an explicit restart
//! resets the machine back to [`ServiceState::Init`].

use std::fmt;

/// Lifecycle stage of a supervised service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceState {
    /// Constructed, never started (or reset by restart).
    Init,
    /// `start()` in progress: hooks, children, activities being brought up.
    Starting,
    /// Fully started; activities executing.
    Running,
    /// `stop()` in progress: children stopping, activities draining.
    Stopping,
    /// Stopped cleanly; restartable.
    Shutdown,
    /// A hook or activity raised; inspect the crash reason. Restartable.
    Crashed,
}

impl ServiceState {
    /// True if the transition `self → to` is one the lifecycle protocol allows.
    pub fn can_transition(self, to: ServiceState) -> bool {
        use ServiceState::*;
        matches!(
            (self, to),
            (Init, Starting)
                | (Starting, Running)
                | (Starting, Crashed)
                | (Running, Stopping)
                | (Running, Crashed)
                | (Stopping, Shutdown)
                | (Stopping, Crashed)
                | (Shutdown, Init)
                | (Crashed, Init)
        )
    }

    /// True while activities may legally be added or running.
    pub fn is_active(self) -> bool {
        matches!(self, ServiceState::Starting | ServiceState::Running)
    }

    /// True for states a `restart()` may leave from.
    pub fn is_restartable(self) -> bool {
        matches!(self, ServiceState::Shutdown | ServiceState::Crashed)
    }

    /// Short lowercase label for logs and diagnostic flags.
    pub fn as_label(self) -> &'static str {
        match self {
            ServiceState::Init => "init",
            ServiceState::Starting => "starting",
            ServiceState::Running => "running",
            ServiceState::Stopping => "stopping",
            ServiceState::Shutdown => "shutdown",
            ServiceState::Crashed => "crashed",
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}
