//! # Jitter policy for revive delays.
//!
//! [`JitterPolicy`] randomizes backoff delays so that a group of services
//! crashed by one shared fault does not revive in lockstep.
//!
//! - [`JitterPolicy::None`] no randomization, predictable delays
//! - [`JitterPolicy::Full`] random delay in `[0, delay]`
//! - [`JitterPolicy::Equal`] `delay/2 + random[0, delay/2]` (balanced)

use std::time::Duration;

use rand::Rng;

/// Randomization applied to revive delays.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JitterPolicy {
    /// Use the exact backoff delay.
    None,
    /// Random delay in `[0, delay]`. Maximum spread.
    Full,
    /// `delay/2 + random[0, delay/2]`. Preserves most of the backoff while
    /// still decorrelating revives.
    Equal,
}

impl Default for JitterPolicy {
    /// Returns [`JitterPolicy::None`].
    fn default() -> Self {
        JitterPolicy::None
    }
}

impl JitterPolicy {
    /// Applies jitter to the given delay.
    pub fn apply(&self, delay: Duration) -> Duration {
        match self {
            JitterPolicy::None => delay,
            JitterPolicy::Full => full_jitter(delay),
            JitterPolicy::Equal => equal_jitter(delay),
        }
    }
}

/// Random in `[0, delay]`.
fn full_jitter(delay: Duration) -> Duration {
    let ms = clamp_ms(delay);
    if ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..=ms))
}

/// `delay/2 + random[0, delay/2]`.
fn equal_jitter(delay: Duration) -> Duration {
    let ms = clamp_ms(delay);
    if ms == 0 {
        return Duration::ZERO;
    }
    let half = ms / 2;
    let jitter = if half == 0 {
        0
    } else {
        rand::rng().random_range(0..=half)
    };
    Duration::from_millis(ms - half + jitter)
}

fn clamp_ms(d: Duration) -> u64 {
    d.as_millis().min(u128::from(u64::MAX)) as u64
}
