//! # Error types used by the supervision engine and by service code.
//!
//! Two enums, split by who raises them:
//!
//! - [`ServiceError`] errors raised by the lifecycle engine itself.
//! - [`ActivityError`] errors raised inside hooks and activity bodies.
//!
//! Both provide `as_label()` for logs/metrics. [`ServiceError`] additionally
//! exposes `is_cancellation()` so callers can tell a cooperative abort from a
//! genuine failure.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::state::ServiceState;

/// # Errors produced by the lifecycle engine.
///
/// These are the failure kinds a caller of `start()`/`stop()`/`restart()` or a
/// crashed service's `crash_reason()` can observe.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum ServiceError {
    /// Operation is not allowed in the service's current state.
    #[error("cannot {op} while {state}")]
    InvalidState {
        /// The attempted operation.
        op: &'static str,
        /// State the service was in.
        state: ServiceState,
    },

    /// Malformed input: zero timer period, empty activity name, and similar.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// What was wrong with the input.
        reason: String,
    },

    /// A child service failed to start or crashed; carries the child's error.
    #[error("dependency '{child}' failed: {cause}")]
    DependencyFailure {
        /// Name of the failed child.
        child: String,
        /// The child's underlying error.
        cause: Arc<ServiceError>,
    },

    /// A background activity raised; carries the activity name and its error.
    #[error("activity '{activity}' crashed: {cause}")]
    ActivityCrash {
        /// Display name of the crashed activity.
        activity: String,
        /// The originating error.
        cause: ActivityError,
    },

    /// Cooperative cancellation interrupted start or stop.
    #[error("cancelled during {during}")]
    Cancelled {
        /// Phase that was interrupted.
        during: &'static str,
    },

    /// Shutdown exceeded its deadline; lists activities that required force-cancel.
    #[error("shutdown deadline {deadline:?} exceeded; force-cancelled: {stuck:?}")]
    Timeout {
        /// The deadline that elapsed.
        deadline: Duration,
        /// Activities that did not stop in time.
        stuck: Vec<String>,
    },
}

impl ServiceError {
    /// Returns a short stable label (snake_case) for logs and metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ServiceError::InvalidState { .. } => "invalid_state",
            ServiceError::InvalidArgument { .. } => "invalid_argument",
            ServiceError::DependencyFailure { .. } => "dependency_failure",
            ServiceError::ActivityCrash { .. } => "activity_crash",
            ServiceError::Cancelled { .. } => "cancelled",
            ServiceError::Timeout { .. } => "timeout",
        }
    }

    /// True if this error represents cooperative cancellation rather than a fault.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, ServiceError::Cancelled { .. })
    }

    pub(crate) fn invalid_argument(reason: impl Into<String>) -> Self {
        ServiceError::InvalidArgument {
            reason: reason.into(),
        }
    }
}

/// # Errors produced inside hooks and activity bodies.
///
/// Service code returns these; the engine wraps them into
/// [`ServiceError::ActivityCrash`] when they escape a supervised activity.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum ActivityError {
    /// The body failed. Crashes the owning service.
    #[error("{reason}")]
    Failed {
        /// Human-readable failure description.
        reason: String,
    },

    /// The body observed cancellation and unwound.
    ///
    /// Not a fault: the runner treats this as normal termination.
    #[error("cancelled")]
    Cancelled,
}

impl ActivityError {
    /// Builds a failure from a reason string.
    pub fn failed(reason: impl Into<String>) -> Self {
        ActivityError::Failed {
            reason: reason.into(),
        }
    }

    /// Builds a failure from any displayable error.
    pub fn other(err: impl std::fmt::Display) -> Self {
        ActivityError::Failed {
            reason: err.to_string(),
        }
    }

    /// Returns a short stable label.
    pub fn as_label(&self) -> &'static str {
        match self {
            ActivityError::Failed { .. } => "activity_failed",
            ActivityError::Cancelled => "activity_cancelled",
        }
    }

    /// True for the cooperative-cancellation variant.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, ActivityError::Cancelled)
    }
}

impl From<ServiceError> for ActivityError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Cancelled { .. } => ActivityError::Cancelled,
            other => ActivityError::Failed {
                reason: other.to_string(),
            },
        }
    }
}
