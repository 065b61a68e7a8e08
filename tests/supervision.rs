//! Supervision tree behavior: runtime dependencies, crash propagation and
//! isolation, and revive strategies.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use servisor::{
    ActivityError, ActivitySpec, CrashPolicy, Service, ServiceContext, ServiceError, ServiceState,
    Supervised, SupervisorStrategy,
};

/// Inert service, optionally isolating child crashes.
struct Holder {
    isolate: bool,
}

impl Service for Holder {
    fn crash_policy(&self) -> CrashPolicy {
        if self.isolate {
            CrashPolicy::Isolate
        } else {
            CrashPolicy::Propagate
        }
    }
}

/// Crashes its own activity a configurable number of times, then runs clean.
struct Flaky {
    crashes_left: Arc<AtomicUsize>,
}

impl Service for Flaky {
    fn declare_activities(&self) -> Vec<ActivitySpec> {
        let crashes_left = Arc::clone(&self.crashes_left);
        vec![ActivitySpec::task("work", move |ctx: ServiceContext| {
            let crashes_left = Arc::clone(&crashes_left);
            async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                let left = crashes_left.load(Ordering::SeqCst);
                if left > 0 {
                    crashes_left.store(left - 1, Ordering::SeqCst);
                    return Err(ActivityError::failed("flaky failure"));
                }
                while !ctx.should_stop() {
                    ctx.sleep(Duration::from_millis(50)).await;
                }
                Ok(())
            }
        })]
    }
}

#[tokio::test]
async fn runtime_dependency_is_started_and_stopped_with_the_parent() {
    let parent = Supervised::new(Holder { isolate: false });
    parent.start().await.expect("start parent");

    let child = Supervised::new(Holder { isolate: false });
    parent
        .add_runtime_dependency(child.clone())
        .await
        .expect("runtime dependency");

    assert_eq!(child.state(), ServiceState::Running);
    assert!(parent
        .children()
        .iter()
        .any(|c| Arc::ptr_eq(c, &child)));

    parent.stop().await;
    assert!(child.is_stopped());
    assert_eq!(child.state(), ServiceState::Shutdown);
}

#[tokio::test]
async fn runtime_dependency_is_rejected_outside_starting_and_running() {
    let parent = Supervised::new(Holder { isolate: false });
    let child = Supervised::new(Holder { isolate: false });

    // Not started yet.
    let err = parent
        .add_runtime_dependency(child.clone())
        .await
        .expect_err("rejected before start");
    assert!(matches!(err, ServiceError::InvalidState { .. }));

    parent.start().await.expect("start");
    parent.stop().await;

    let err = parent
        .add_runtime_dependency(child)
        .await
        .expect_err("rejected after stop");
    assert!(matches!(err, ServiceError::InvalidState { .. }));
}

#[tokio::test]
async fn pre_start_dependency_behaves_like_a_declared_child() {
    let parent = Supervised::new(Holder { isolate: false });
    let child = Supervised::new(Holder { isolate: false });
    parent.add_dependency(child.clone()).expect("add");

    parent.start().await.expect("start");
    assert_eq!(child.state(), ServiceState::Running);

    // Too late for the declared path now.
    let late = Supervised::new(Holder { isolate: false });
    assert!(matches!(
        parent.add_dependency(late),
        Err(ServiceError::InvalidState { .. })
    ));

    parent.stop().await;
    assert!(child.is_stopped());
}

#[tokio::test]
async fn child_crash_propagates_to_the_parent_by_default() {
    let parent = Supervised::new(Holder { isolate: false });
    parent.start().await.expect("start");

    let child = Supervised::new(Flaky {
        crashes_left: Arc::new(AtomicUsize::new(usize::MAX)),
    });
    parent
        .add_runtime_dependency(child.clone())
        .await
        .expect("runtime dependency");

    tokio::time::timeout(Duration::from_secs(2), parent.wait_until_crashed())
        .await
        .expect("parent crashes with its child");

    let reason = parent.crash_reason().expect("reason");
    assert!(matches!(reason, ServiceError::DependencyFailure { .. }));

    parent.stop().await;
    assert!(child.is_stopped());
}

#[tokio::test]
async fn isolating_parent_survives_a_child_crash() {
    let parent = Supervised::new(Holder { isolate: true });
    parent.start().await.expect("start");

    let child = Supervised::new(Flaky {
        crashes_left: Arc::new(AtomicUsize::new(usize::MAX)),
    });
    parent
        .add_runtime_dependency(child.clone())
        .await
        .expect("runtime dependency");

    tokio::time::timeout(Duration::from_secs(2), child.wait_until_crashed())
        .await
        .expect("child crashes");
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(parent.state(), ServiceState::Running);
    assert!(!parent.is_crashed());
    parent.stop().await;
}

#[tokio::test]
async fn one_for_one_strategy_revives_a_crashed_service() {
    let strategy = SupervisorStrategy::one_for_one()
        .max_restarts(10)
        .over(Duration::from_secs(30));
    let handle = strategy.watched_handle();
    let strategy_node = Supervised::new(strategy);
    strategy_node.start().await.expect("start strategy");

    let worker = Supervised::new(Flaky {
        crashes_left: Arc::new(AtomicUsize::new(1)),
    });
    worker.start().await.expect("start worker");
    handle.add(worker.clone());

    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if worker.state() == ServiceState::Running && worker.restart_count() >= 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    })
    .await
    .expect("worker revived");

    assert!(!strategy_node.is_crashed());
    strategy_node.stop().await;
    worker.stop().await;
}

#[tokio::test]
async fn one_for_all_strategy_restarts_every_watched_service() {
    let strategy = SupervisorStrategy::one_for_all()
        .max_restarts(10)
        .over(Duration::from_secs(30));
    let handle = strategy.watched_handle();
    let strategy_node = Supervised::new(strategy);
    strategy_node.start().await.expect("start strategy");

    let steady = Supervised::new(Flaky {
        crashes_left: Arc::new(AtomicUsize::new(0)),
    });
    steady.start().await.expect("start steady");
    let flaky = Supervised::new(Flaky {
        crashes_left: Arc::new(AtomicUsize::new(1)),
    });
    flaky.start().await.expect("start flaky");
    handle.add(steady.clone());
    handle.add(flaky.clone());

    // One crash restarts the whole watch list: the steady service is
    // stopped and restarted too, even though it never crashed itself.
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let both_running = steady.state() == ServiceState::Running
                && flaky.state() == ServiceState::Running;
            if both_running && steady.restart_count() >= 1 && flaky.restart_count() >= 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    })
    .await
    .expect("both services stopped and restarted");

    assert!(!strategy_node.is_crashed());
    strategy_node.stop().await;
    steady.stop().await;
    flaky.stop().await;
}

#[tokio::test]
async fn crash_through_strategy_crashes_instead_of_reviving() {
    let strategy = SupervisorStrategy::crash_through();
    let handle = strategy.watched_handle();
    let strategy_node = Supervised::new(strategy);
    strategy_node.start().await.expect("start strategy");

    let worker = Supervised::new(Flaky {
        crashes_left: Arc::new(AtomicUsize::new(usize::MAX)),
    });
    worker.start().await.expect("start worker");
    handle.add(worker.clone());

    tokio::time::timeout(Duration::from_secs(5), strategy_node.wait_until_crashed())
        .await
        .expect("strategy re-raises the watched crash");

    let reason = strategy_node.crash_reason().expect("reason");
    assert!(matches!(reason, ServiceError::ActivityCrash { .. }));
    assert!(
        reason.to_string().contains("Flaky"),
        "reason names the victim: {reason}"
    );

    // No revive was attempted: the worker stays crashed, never restarted.
    assert_eq!(worker.state(), ServiceState::Crashed);
    assert_eq!(worker.restart_count(), 0);

    strategy_node.stop().await;
    worker.stop().await;
}

#[tokio::test]
async fn exhausted_revive_budget_crashes_the_strategy() {
    let strategy = SupervisorStrategy::one_for_one()
        .max_restarts(2)
        .over(Duration::from_secs(60))
        .backoff(servisor::BackoffPolicy {
            first: Duration::from_millis(10),
            max: Duration::from_millis(10),
            factor: 1.0,
        });
    let handle = strategy.watched_handle();
    let strategy_node = Supervised::new(strategy);
    strategy_node.start().await.expect("start strategy");

    let worker = Supervised::new(Flaky {
        crashes_left: Arc::new(AtomicUsize::new(usize::MAX)),
    });
    worker.start().await.expect("start worker");
    handle.add(worker.clone());

    tokio::time::timeout(Duration::from_secs(5), strategy_node.wait_until_crashed())
        .await
        .expect("strategy crashes once the budget is spent");

    strategy_node.stop().await;
    worker.stop().await;
}

#[tokio::test]
async fn forfeit_strategy_stops_the_crashed_service_instead() {
    let strategy = SupervisorStrategy::one_for_one().forfeit();
    let handle = strategy.watched_handle();
    let strategy_node = Supervised::new(strategy);
    strategy_node.start().await.expect("start strategy");

    let worker = Supervised::new(Flaky {
        crashes_left: Arc::new(AtomicUsize::new(usize::MAX)),
    });
    worker.start().await.expect("start worker");
    handle.add(worker.clone());

    tokio::time::timeout(Duration::from_secs(5), worker.wait_until_stopped())
        .await
        .expect("worker forfeited and stopped");

    assert!(handle.watched().is_empty());
    assert_eq!(strategy_node.state(), ServiceState::Running);
    strategy_node.stop().await;
}
