//! # Cancellable sleep.
//!
//! [`sleep_with`] waits up to a duration or until any of N stop signals fire,
//! and reports exactly one cause as a [`Wakeup`]. This is the primitive loop
//! bodies use between iterations so that shutdown never has to interrupt them
//! preemptively.
//!
//! ## Guarantees
//! - No busy-wait: the future parks on the timer and the signal waiters.
//! - Exactly one cause: if a signal and the deadline become ready in the same
//!   scheduler turn, the signal wins; among signals, the lowest index wins.
//! - Zero duration yields once to the scheduler and reports
//!   [`Wakeup::TimerExpired`] without polling the signals at all.

use std::future::Future;
use std::task::Poll;
use std::time::Duration;

use crate::flag::Flag;

/// Why a cancellable sleep returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Wakeup {
    /// The full duration elapsed on the monotonic clock.
    TimerExpired,
    /// The i-th stop signal fired first.
    Signaled(usize),
}

impl Wakeup {
    /// True when the sleep ran to its deadline.
    pub fn expired(self) -> bool {
        matches!(self, Wakeup::TimerExpired)
    }
}

/// Sleeps for `duration` unless one of `signals` fires first.
///
/// Signals are checked in index order before the timer on every poll, so ties
/// resolve deterministically in favor of the lowest ready signal.
pub async fn sleep_with(duration: Duration, signals: &[&Flag]) -> Wakeup {
    if duration.is_zero() {
        tokio::task::yield_now().await;
        return Wakeup::TimerExpired;
    }

    let mut waits: Vec<_> = signals.iter().map(|f| Box::pin(f.wait())).collect();
    let timer = tokio::time::sleep(duration);
    tokio::pin!(timer);

    futures::future::poll_fn(|cx| {
        for (i, wait) in waits.iter_mut().enumerate() {
            if wait.as_mut().poll(cx).is_ready() {
                return Poll::Ready(Wakeup::Signaled(i));
            }
        }
        if timer.as_mut().poll(cx).is_ready() {
            return Poll::Ready(Wakeup::TimerExpired);
        }
        Poll::Pending
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::{sleep_with, Wakeup};
    use crate::flag::Flag;
    use std::time::{Duration, Instant};

    #[tokio::test]
    async fn expires_when_no_signal_fires() {
        let stop = Flag::new();
        let started = Instant::now();
        let wakeup = sleep_with(Duration::from_millis(50), &[&stop]).await;
        assert_eq!(wakeup, Wakeup::TimerExpired);
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn reports_the_signal_that_fired() {
        let a = Flag::new();
        let b = Flag::new();
        let sleeper = {
            let (a, b) = (a.clone(), b.clone());
            tokio::spawn(async move { sleep_with(Duration::from_secs(30), &[&a, &b]).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        b.set();
        let wakeup = sleeper.await.expect("sleeper task");
        assert_eq!(wakeup, Wakeup::Signaled(1));
    }

    #[tokio::test]
    async fn pre_raised_signals_win_by_lowest_index() {
        let a = Flag::new();
        let b = Flag::new();
        a.set();
        b.set();
        let wakeup = sleep_with(Duration::from_secs(30), &[&a, &b]).await;
        assert_eq!(wakeup, Wakeup::Signaled(0));
    }

    #[tokio::test]
    async fn zero_duration_skips_signal_checks() {
        let stop = Flag::new();
        stop.set();
        let wakeup = sleep_with(Duration::ZERO, &[&stop]).await;
        assert_eq!(wakeup, Wakeup::TimerExpired);
    }
}
