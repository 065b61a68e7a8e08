//! # Crash propagation policy.
//!
//! When a service crashes, its parent is notified. [`CrashPolicy`] decides
//! what the parent does with the notification.

/// How a parent reacts to a crashed child.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CrashPolicy {
    /// Crash too, wrapping the child's error (default).
    ///
    /// The crash travels up until a service isolates it or the root crashes.
    Propagate,
    /// Log the child's crash and keep running.
    ///
    /// Use under a supervisor strategy that revives crashed services.
    Isolate,
}

impl Default for CrashPolicy {
    /// Returns [`CrashPolicy::Propagate`].
    fn default() -> Self {
        CrashPolicy::Propagate
    }
}
