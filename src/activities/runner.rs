//! # Per-activity supervision wrapper.
//!
//! [`run_activity`] drives one activity to completion under supervision:
//!
//! - publishes [`EventKind::ActivityStarted`] / [`EventKind::ActivityStopped`]
//!   / [`EventKind::ActivityCrashed`] to the tree bus,
//! - catches panics in the body and converts them into crashes,
//! - treats cooperative cancellation as normal termination, never as a fault,
//! - reports any other error to the owning service, which crashes it.
//!
//! Loop tasks are re-invoked after returning normally, for as long as the
//! service is running, with a scheduler yield between iterations.

use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use futures::FutureExt;

use crate::activities::spec::{ActivityBody, ActivityKind};
use crate::activities::timer;
use crate::error::{ActivityError, ServiceError};
use crate::events::{Event, EventKind};
use crate::service::ServiceContext;

/// Runs one activity under supervision. Spawned by the registry.
pub(crate) async fn run_activity(
    ctx: ServiceContext,
    name: String,
    kind: ActivityKind,
    body: ActivityBody,
    ran_at: Arc<Mutex<Option<SystemTime>>>,
) {
    tracing::debug!(service = ctx.service_name(), activity = %name, "activity started");
    ctx.publish(
        Event::now(EventKind::ActivityStarted)
            .with_service(ctx.service_name())
            .with_activity(&name),
    );

    let outcome = match kind {
        ActivityKind::Future => invoke(&ctx, &body, &ran_at).await,
        ActivityKind::Loop {
            one_shot,
            stop_on_exit,
        } => run_loop(&ctx, &body, &ran_at, one_shot, stop_on_exit).await,
        ActivityKind::Interval { period, mode } => {
            timer::drive_interval(&ctx, &name, &body, &ran_at, period, mode).await
        }
        ActivityKind::Cron { oracle } => {
            timer::drive_cron(&ctx, &name, &body, &ran_at, &oracle).await
        }
    };

    match outcome {
        Ok(()) => {
            tracing::debug!(service = ctx.service_name(), activity = %name, "activity stopped");
            ctx.publish(
                Event::now(EventKind::ActivityStopped)
                    .with_service(ctx.service_name())
                    .with_activity(&name),
            );
        }
        Err(err) => {
            tracing::error!(
                service = ctx.service_name(),
                activity = %name,
                error = %err,
                "activity crashed"
            );
            ctx.publish(
                Event::now(EventKind::ActivityCrashed)
                    .with_service(ctx.service_name())
                    .with_activity(&name)
                    .with_error(err.to_string()),
            );
            ctx.report_crash(ServiceError::ActivityCrash {
                activity: name,
                cause: err,
            });
        }
    }
}

/// Executes the body once, recording `ran_at` and isolating panics.
///
/// A body returning [`ActivityError::Cancelled`] is treated as a clean exit:
/// cancellation during shutdown is not an error, and a body electing to unwind
/// cooperatively is not a fault either.
pub(crate) async fn invoke(
    ctx: &ServiceContext,
    body: &ActivityBody,
    ran_at: &Arc<Mutex<Option<SystemTime>>>,
) -> Result<(), ActivityError> {
    if let Ok(mut slot) = ran_at.lock() {
        *slot = Some(SystemTime::now());
    }

    let ctx = ctx.clone();
    let body = body.clone();
    let guarded = std::panic::AssertUnwindSafe(async move { (body)(ctx).await }).catch_unwind();

    match guarded.await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(ActivityError::Cancelled)) => Ok(()),
        Ok(Err(err)) => Err(err),
        Err(payload) => Err(ActivityError::failed(panic_reason(payload))),
    }
}

/// Re-invokes a loop body while the service keeps running.
async fn run_loop(
    ctx: &ServiceContext,
    body: &ActivityBody,
    ran_at: &Arc<Mutex<Option<SystemTime>>>,
    one_shot: bool,
    stop_on_exit: bool,
) -> Result<(), ActivityError> {
    loop {
        invoke(ctx, body, ran_at).await?;

        if ctx.should_stop() {
            return Ok(());
        }
        if one_shot || stop_on_exit {
            if stop_on_exit {
                ctx.request_stop();
            }
            return Ok(());
        }
        tokio::task::yield_now().await;
    }
}

fn panic_reason(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}
