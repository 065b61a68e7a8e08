//! # Backoff policy for reviving crashed services.
//!
//! [`BackoffPolicy`] controls how the delay before a revive grows when a
//! service keeps crashing. Parameterized by:
//! - [`BackoffPolicy::first`] — the initial delay;
//! - [`BackoffPolicy::factor`] — the multiplicative growth factor;
//! - [`BackoffPolicy::max`] — the delay cap.
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use servisor::BackoffPolicy;
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_millis(100),
//!     max: Duration::from_secs(10),
//!     factor: 2.0,
//! };
//!
//! assert_eq!(backoff.next(None), Duration::from_millis(100));
//! assert_eq!(backoff.next(Some(Duration::from_millis(100))), Duration::from_millis(200));
//! assert_eq!(backoff.next(Some(Duration::from_secs(20))), Duration::from_secs(10));
//! ```

use std::time::Duration;

/// Revive backoff policy.
#[derive(Clone, Copy, Debug)]
pub struct BackoffPolicy {
    /// Initial delay before the first revive.
    pub first: Duration,
    /// Maximum delay cap.
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0` recommended).
    pub factor: f64,
}

impl Default for BackoffPolicy {
    /// Returns a policy with `first = 100ms`, `max = 30s`, `factor = 2.0`.
    fn default() -> Self {
        Self {
            first: Duration::from_millis(100),
            max: Duration::from_secs(30),
            factor: 2.0,
        }
    }
}

impl BackoffPolicy {
    /// Computes the next delay from the previous one.
    ///
    /// `None` returns [`BackoffPolicy::first`]; otherwise the previous delay
    /// is multiplied by [`BackoffPolicy::factor`] and capped at
    /// [`BackoffPolicy::max`].
    pub fn next(&self, prev: Option<Duration>) -> Duration {
        match prev {
            None => self.first,
            Some(d) => {
                let next = (d.as_secs_f64() * self.factor).min(self.max.as_secs_f64());
                Duration::from_secs_f64(next)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::BackoffPolicy;
    use std::time::Duration;

    #[test]
    fn grows_by_factor_and_caps() {
        let policy = BackoffPolicy {
            first: Duration::from_millis(50),
            max: Duration::from_millis(400),
            factor: 4.0,
        };
        let d1 = policy.next(None);
        let d2 = policy.next(Some(d1));
        let d3 = policy.next(Some(d2));
        assert_eq!(d1, Duration::from_millis(50));
        assert_eq!(d2, Duration::from_millis(200));
        assert_eq!(d3, Duration::from_millis(400));
    }
}
