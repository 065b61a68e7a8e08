//! Embedding API: start/join/stop handles and scoped runs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use servisor::{
    run_scoped, start_system, ActivitySpec, Service, ServiceError, ServiceState, Supervised,
};

/// Finishes one short job and stops itself.
struct Job;

impl Service for Job {
    fn declare_activities(&self) -> Vec<ActivitySpec> {
        vec![ActivitySpec::task("job", |_ctx| async {
            tokio::time::sleep(Duration::from_millis(40)).await;
            Ok(())
        })
        .one_shot()
        .stop_service_on_exit()]
    }
}

/// Idles until told to stop.
struct Idle;

impl Service for Idle {
    fn declare_activities(&self) -> Vec<ActivitySpec> {
        vec![ActivitySpec::task("idle", |ctx| async move {
            while !ctx.should_stop() {
                ctx.sleep(Duration::from_millis(25)).await;
            }
            Ok(())
        })]
    }
}

#[tokio::test]
async fn join_completes_when_the_tree_shuts_down() {
    let handle = start_system(Supervised::new(Job)).await.expect("start");

    tokio::time::timeout(Duration::from_secs(2), handle.join())
        .await
        .expect("join completes");
    assert_eq!(handle.node().state(), ServiceState::Shutdown);

    // The host's loop stays usable afterwards.
    tokio::time::sleep(Duration::from_millis(10)).await;
}

#[tokio::test]
async fn handle_stop_is_awaitable_from_several_tasks() {
    let handle = start_system(Supervised::new(Idle)).await.expect("start");

    let joiner = {
        let handle = handle.clone();
        tokio::spawn(async move { handle.join().await })
    };
    handle.stop().await;
    tokio::time::timeout(Duration::from_secs(2), joiner)
        .await
        .expect("joiner released")
        .expect("joiner task");
    assert!(handle.node().is_stopped());
}

#[tokio::test]
async fn run_scoped_stops_the_tree_on_success() {
    let node = Supervised::new(Idle);
    let seen = Arc::new(AtomicUsize::new(0));

    let result = run_scoped(node.clone(), |node| {
        let seen = Arc::clone(&seen);
        async move {
            assert_eq!(node.state(), ServiceState::Running);
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(42)
        }
    })
    .await
    .expect("scoped run");

    assert_eq!(result, 42);
    assert_eq!(seen.load(Ordering::SeqCst), 1);
    assert!(node.is_stopped());
}

#[tokio::test]
async fn run_scoped_stops_the_tree_on_error() {
    let node = Supervised::new(Idle);

    let result: Result<(), ServiceError> = run_scoped(node.clone(), |_node| async {
        Err(ServiceError::InvalidArgument {
            reason: "host gave up".to_string(),
        })
    })
    .await;

    assert!(result.is_err());
    assert!(node.is_stopped(), "stop must run on the error path");
}

#[tokio::test]
async fn run_scoped_stops_the_tree_on_panic() {
    let node = Supervised::new(Idle);
    let node_for_scope = node.clone();

    let outcome = tokio::spawn(async move {
        run_scoped(node_for_scope, |node| async move {
            if node.state() == ServiceState::Running {
                panic!("host code exploded");
            }
            Ok(())
        })
        .await
    })
    .await;

    assert!(outcome.is_err(), "panic resumes after cleanup");
    tokio::time::timeout(Duration::from_secs(2), node.wait_until_stopped())
        .await
        .expect("stop must run on the panic path");
}

#[tokio::test]
async fn two_trees_coexist_in_one_host() {
    let one = start_system(Supervised::new(Idle)).await.expect("one");
    let two = start_system(Supervised::new(Idle)).await.expect("two");

    one.stop().await;
    assert!(one.node().is_stopped());
    assert_eq!(two.node().state(), ServiceState::Running);
    two.stop().await;
}
