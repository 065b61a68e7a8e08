//! # Timer drivers: fixed-rate intervals and oracle-scheduled fires.
//!
//! Both drivers sleep cooperatively between fires (via the service stop
//! signal), so shutdown never has to interrupt a waiting timer.
//!
//! ## Interval schedule
//! Deadlines are drift-corrected: each fire is scheduled one period after the
//! previous *deadline*, not after the handler finished. A handler that overruns
//! its period gets exactly one immediate follow-up fire; deadlines skipped
//! beyond that are counted, published as [`EventKind::TimerOverrun`], and never
//! replayed. In any window `T` the timer fires at most `⌈T/D⌉ + 1` times.
//!
//! ## Cron schedule
//! Fire instants come from a pluggable [`TimerOracle`]; parsing cron
//! expressions and timezone arithmetic live behind that seam. The driver
//! re-checks the oracle's instant against the wall clock on every wake, so a
//! DST shift or clock skew results in at most one fire per computed instant.

use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use tokio::time::Instant;

use crate::activities::runner::invoke;
use crate::activities::spec::{ActivityBody, FireMode};
use crate::error::ActivityError;
use crate::events::{Event, EventKind};
use crate::service::ServiceContext;

/// Computes the next fire instant for an oracle-scheduled timer.
///
/// Implementations typically wrap a parsed crontab expression plus a timezone;
/// the engine only ever asks "when is the next fire strictly after `now`?".
pub trait TimerOracle: Send + Sync + 'static {
    /// Returns the next fire instant after `now`, or `None` when the schedule
    /// has no further fires (the activity then finishes normally).
    fn next_fire_after(&self, now: SystemTime) -> Option<SystemTime>;
}

/// Drives a fixed-rate interval activity until stop or handler error.
pub(crate) async fn drive_interval(
    ctx: &ServiceContext,
    name: &str,
    body: &ActivityBody,
    ran_at: &Arc<Mutex<Option<SystemTime>>>,
    period: Duration,
    mode: FireMode,
) -> Result<(), ActivityError> {
    let mut next = Instant::now();
    if mode == FireMode::Lazy {
        next += period;
    }

    loop {
        let now = Instant::now();
        if next > now && !ctx.sleep(next - now).await.expired() {
            return Ok(());
        }

        invoke(ctx, body, ran_at).await?;
        if ctx.should_stop() {
            return Ok(());
        }

        next += period;
        let now = Instant::now();
        if next <= now {
            let lag = now - next;
            let missed = (lag.as_nanos() / period.as_nanos().max(1)) as u64;
            tracing::warn!(
                service = ctx.service_name(),
                activity = name,
                ?period,
                missed,
                "timer handler overran its period"
            );
            ctx.publish(
                Event::now(EventKind::TimerOverrun)
                    .with_service(ctx.service_name())
                    .with_activity(name)
                    .with_missed(missed),
            );
            // One immediate follow-up fire; skipped deadlines are not replayed.
            next = now;
        }
    }
}

/// Drives an oracle-scheduled activity until stop, handler error, or schedule end.
pub(crate) async fn drive_cron(
    ctx: &ServiceContext,
    name: &str,
    body: &ActivityBody,
    ran_at: &Arc<Mutex<Option<SystemTime>>>,
    oracle: &Arc<dyn TimerOracle>,
) -> Result<(), ActivityError> {
    loop {
        let Some(next) = oracle.next_fire_after(SystemTime::now()) else {
            tracing::debug!(
                service = ctx.service_name(),
                activity = name,
                "schedule exhausted"
            );
            return Ok(());
        };

        // Sleep until the computed instant, re-checking the wall clock on each
        // wake so DST shifts and skew cannot double-fire.
        loop {
            let remaining = match next.duration_since(SystemTime::now()) {
                Ok(d) if !d.is_zero() => d,
                _ => break,
            };
            if !ctx.sleep(remaining).await.expired() {
                return Ok(());
            }
        }

        invoke(ctx, body, ran_at).await?;
        if ctx.should_stop() {
            return Ok(());
        }
    }
}
