//! Policies governing crash handling and revive pacing.
//!
//! - [`CrashPolicy`] — whether a parent crashes with its children.
//! - [`BackoffPolicy`] — how revive delays grow after repeated crashes.
//! - [`JitterPolicy`] — randomization applied to revive delays.

mod backoff;
mod crash;
mod jitter;

pub use backoff::BackoffPolicy;
pub use crash::CrashPolicy;
pub use jitter::JitterPolicy;
