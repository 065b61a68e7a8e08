//! # Demo: supervised_tree
//!
//! A small tree: an app service with two declared children and a revive
//! strategy guarding a flaky worker. Events are logged via the built-in
//! [`LogWriter`] subscriber.
//!
//! ## Run
//! ```bash
//! cargo run --example supervised_tree --features logging
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use servisor::{
    ActivityError, ActivitySpec, CrashPolicy, LogWriter, Service, ServiceContext, Supervised,
    SupervisedRef, SupervisorStrategy,
};

/// Crashes twice, then settles down.
struct FlakyWorker {
    failures: Arc<AtomicUsize>,
}

impl Service for FlakyWorker {
    fn declare_activities(&self) -> Vec<ActivitySpec> {
        let failures = Arc::clone(&self.failures);
        vec![ActivitySpec::task("poll", move |ctx: ServiceContext| {
            let failures = Arc::clone(&failures);
            async move {
                ctx.sleep(Duration::from_millis(300)).await;
                if failures.load(Ordering::SeqCst) < 2 {
                    failures.fetch_add(1, Ordering::SeqCst);
                    return Err(ActivityError::failed("upstream refused"));
                }
                while !ctx.should_stop() {
                    println!("[worker] polling upstream");
                    ctx.sleep(Duration::from_millis(500)).await;
                }
                Ok(())
            }
        })]
    }
}

/// Steady child doing periodic housekeeping.
struct Janitor;

impl Service for Janitor {
    fn declare_activities(&self) -> Vec<ActivitySpec> {
        vec![ActivitySpec::task("sweep", |ctx: ServiceContext| async move {
            while !ctx.should_stop() {
                println!("[janitor] sweeping");
                ctx.sleep(Duration::from_millis(800)).await;
            }
            Ok(())
        })]
    }
}

/// Root service wiring the tree together.
struct App {
    children: Vec<SupervisedRef>,
}

impl Service for App {
    // The strategy revives the worker; a crash must not take the app down.
    fn crash_policy(&self) -> CrashPolicy {
        CrashPolicy::Isolate
    }

    fn declare_children(&self) -> Vec<SupervisedRef> {
        self.children.clone()
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let worker = Supervised::new(FlakyWorker {
        failures: Arc::new(AtomicUsize::new(0)),
    });

    let strategy = SupervisorStrategy::one_for_one()
        .max_restarts(5)
        .over(Duration::from_secs(30));
    let watch = strategy.watched_handle();
    let strategy_node = Supervised::new(strategy);

    let app = Supervised::builder(App {
        children: vec![
            Supervised::new(Janitor),
            strategy_node,
            worker.clone(),
        ],
    })
    .subscriber(Arc::new(LogWriter))
    .build();

    app.start().await?;
    watch.add(worker);

    tokio::time::sleep(Duration::from_secs(4)).await;
    app.stop().await;
    Ok(())
}
