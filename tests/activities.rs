//! Background activities: loop tasks, timers, dynamic registration, crash
//! handling, and drain escalation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime};

use async_trait::async_trait;
use servisor::{
    ActivityError, ActivitySpec, Config, EventKind, FireMode, Service, ServiceContext,
    ServiceError, ServiceState, Supervised, TimerOracle,
};

/// Service built from a list of activity specs.
struct Activities(Mutex<Vec<ActivitySpec>>);

impl Activities {
    fn new(specs: Vec<ActivitySpec>) -> Self {
        Self(Mutex::new(specs))
    }
}

impl Service for Activities {
    fn declare_activities(&self) -> Vec<ActivitySpec> {
        self.0.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[tokio::test]
async fn loop_task_respects_stop_promptly() {
    let counter = Arc::new(AtomicUsize::new(0));
    let spec = {
        let counter = Arc::clone(&counter);
        ActivitySpec::task("ticker", move |ctx: ServiceContext| {
            let counter = Arc::clone(&counter);
            async move {
                while !ctx.should_stop() {
                    counter.fetch_add(1, Ordering::SeqCst);
                    if !ctx.sleep(Duration::from_millis(100)).await.expired() {
                        break;
                    }
                }
                Ok(())
            }
        })
    };

    let svc = Supervised::new(Activities::new(vec![spec]));
    svc.start().await.expect("start");
    tokio::time::sleep(Duration::from_millis(350)).await;

    let stop_started = Instant::now();
    svc.stop().await;
    let stop_took = stop_started.elapsed();

    let ticks = counter.load(Ordering::SeqCst);
    assert!((3..=5).contains(&ticks), "got {ticks} ticks");
    assert!(
        stop_took < Duration::from_millis(150),
        "stop took {stop_took:?}"
    );
}

#[tokio::test]
async fn eager_interval_fires_immediately_lazy_waits_one_period() {
    let eager_fires = Arc::new(AtomicUsize::new(0));
    let lazy_fires = Arc::new(AtomicUsize::new(0));

    let eager = {
        let fires = Arc::clone(&eager_fires);
        ActivitySpec::interval(
            "eager",
            Duration::from_millis(200),
            FireMode::Eager,
            move |_ctx| {
                let fires = Arc::clone(&fires);
                async move {
                    fires.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            },
        )
    };
    let lazy = {
        let fires = Arc::clone(&lazy_fires);
        ActivitySpec::interval(
            "lazy",
            Duration::from_millis(200),
            FireMode::Lazy,
            move |_ctx| {
                let fires = Arc::clone(&fires);
                async move {
                    fires.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            },
        )
    };

    let svc = Supervised::new(Activities::new(vec![eager, lazy]));
    svc.start().await.expect("start");

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(eager_fires.load(Ordering::SeqCst), 1, "eager fires at t=0");
    assert_eq!(lazy_fires.load(Ordering::SeqCst), 0, "lazy waits a period");

    tokio::time::sleep(Duration::from_millis(440)).await;
    // t ≈ 520ms: eager fired at 0/200/400, lazy at 200/400.
    assert_eq!(eager_fires.load(Ordering::SeqCst), 3);
    assert_eq!(lazy_fires.load(Ordering::SeqCst), 2);

    svc.stop().await;
}

#[tokio::test]
async fn overrunning_interval_handler_is_bounded_and_counted() {
    let fires = Arc::new(AtomicUsize::new(0));
    let period = Duration::from_millis(50);
    let spec = {
        let fires = Arc::clone(&fires);
        ActivitySpec::interval("slow", period, FireMode::Eager, move |_ctx| {
            let fires = Arc::clone(&fires);
            async move {
                fires.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(120)).await;
                Ok(())
            }
        })
    };

    let svc = Supervised::new(Activities::new(vec![spec]));
    let mut events = svc.subscribe();
    svc.start().await.expect("start");

    let window = Duration::from_millis(600);
    tokio::time::sleep(window).await;
    svc.stop().await;

    // Handler takes 120ms per 50ms period: back-to-back fires, never bursts.
    let count = fires.load(Ordering::SeqCst);
    let cap = (window.as_millis() / period.as_millis()) as usize + 1;
    assert!(count <= cap, "{count} fires > cap {cap}");
    assert!(count >= 3, "expected back-to-back fires, got {count}");

    let mut overruns = 0;
    while let Ok(ev) = events.try_recv() {
        if ev.kind == EventKind::TimerOverrun {
            overruns += 1;
        }
    }
    assert!(overruns > 0, "overruns must be reported");
}

/// Oracle firing every 50ms, a bounded number of times.
struct Steady {
    step: Duration,
    left: AtomicUsize,
}

impl TimerOracle for Steady {
    fn next_fire_after(&self, now: SystemTime) -> Option<SystemTime> {
        let left = self.left.load(Ordering::SeqCst);
        if left == 0 {
            return None;
        }
        self.left.store(left - 1, Ordering::SeqCst);
        Some(now + self.step)
    }
}

#[tokio::test]
async fn cron_timer_follows_the_oracle_and_ends_with_it() {
    let fires = Arc::new(AtomicUsize::new(0));
    let oracle = Arc::new(Steady {
        step: Duration::from_millis(50),
        left: AtomicUsize::new(3),
    });
    let spec = {
        let fires = Arc::clone(&fires);
        ActivitySpec::cron("cron", oracle, move |_ctx| {
            let fires = Arc::clone(&fires);
            async move {
                fires.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
    };

    let svc = Supervised::new(Activities::new(vec![spec]));
    svc.start().await.expect("start");
    tokio::time::sleep(Duration::from_millis(400)).await;

    // Still running: an exhausted schedule ends the activity, not the service.
    assert_eq!(svc.state(), ServiceState::Running);
    assert_eq!(fires.load(Ordering::SeqCst), 3);
    svc.stop().await;
}

#[tokio::test]
async fn one_shot_task_can_stop_the_service_when_done() {
    let spec = ActivitySpec::task("job", |_ctx| async {
        tokio::time::sleep(Duration::from_millis(30)).await;
        Ok(())
    })
    .one_shot()
    .stop_service_on_exit();

    let svc = Supervised::new(Activities::new(vec![spec]));
    svc.start().await.expect("start");

    tokio::time::timeout(Duration::from_secs(2), svc.wait_until_stopped())
        .await
        .expect("service stops itself");
    assert_eq!(svc.state(), ServiceState::Shutdown);
}

#[tokio::test]
async fn failing_activity_crashes_the_service() {
    let spec = ActivitySpec::task("doomed", |_ctx| async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        Err(ActivityError::failed("disk on fire"))
    });

    let svc = Supervised::new(Activities::new(vec![spec]));
    svc.start().await.expect("start");

    tokio::time::timeout(Duration::from_secs(2), svc.wait_until_crashed())
        .await
        .expect("service crashes");
    assert_eq!(svc.state(), ServiceState::Crashed);
    let reason = svc.crash_reason().expect("crash reason");
    assert!(matches!(reason, ServiceError::ActivityCrash { .. }));

    svc.stop().await;
    assert!(svc.is_stopped());
}

#[tokio::test]
async fn panicking_activity_is_isolated_into_a_crash() {
    let spec = ActivitySpec::task("bomb", |_ctx| async {
        if SystemTime::now() >= SystemTime::UNIX_EPOCH {
            panic!("boom");
        }
        Ok(())
    });

    let svc = Supervised::new(Activities::new(vec![spec]));
    svc.start().await.expect("start");

    tokio::time::timeout(Duration::from_secs(2), svc.wait_until_crashed())
        .await
        .expect("panic becomes a crash");
    assert!(svc.crash_reason().is_some());
    svc.stop().await;
}

#[tokio::test]
async fn activities_can_be_added_while_running_but_not_while_stopping() {
    struct Dynamic {
        ran: Arc<AtomicUsize>,
        rejected: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Service for Dynamic {
        async fn on_started(&self, ctx: &ServiceContext) -> Result<(), ActivityError> {
            let ran = Arc::clone(&self.ran);
            ctx.add_future("late", async move {
                ran.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })?;
            Ok(())
        }

        async fn on_stop(&self, ctx: &ServiceContext) -> Result<(), ActivityError> {
            let result = ctx.add_task("too-late", |_ctx| async { Ok(()) });
            if matches!(result, Err(ServiceError::InvalidState { .. })) {
                self.rejected.fetch_add(1, Ordering::SeqCst);
            }
            Ok(())
        }
    }

    let ran = Arc::new(AtomicUsize::new(0));
    let rejected = Arc::new(AtomicUsize::new(0));
    let svc = Supervised::new(Dynamic {
        ran: Arc::clone(&ran),
        rejected: Arc::clone(&rejected),
    });

    svc.start().await.expect("start");
    tokio::time::sleep(Duration::from_millis(50)).await;
    svc.stop().await;

    assert_eq!(ran.load(Ordering::SeqCst), 1, "dynamic future ran");
    assert_eq!(rejected.load(Ordering::SeqCst), 1, "add during stop rejected");
}

#[tokio::test]
async fn zero_period_interval_fails_the_start() {
    let spec = ActivitySpec::interval("bad", Duration::ZERO, FireMode::Lazy, |_ctx| async {
        Ok(())
    });
    let svc = Supervised::new(Activities::new(vec![spec]));
    let err = svc.start().await.expect_err("zero period rejected");
    assert!(matches!(err, ServiceError::InvalidArgument { .. }));
    assert_eq!(svc.state(), ServiceState::Crashed);
}

#[tokio::test]
async fn unresponsive_activity_is_force_dropped_after_the_deadline() {
    // Ignores the stop flag and the cancellation token entirely.
    let spec = ActivitySpec::future("stubborn", |_ctx| async {
        tokio::time::sleep(Duration::from_secs(300)).await;
        Ok(())
    });

    let cfg = Config {
        grace: Duration::from_millis(100),
        force_grace: Duration::from_millis(50),
        ..Config::default()
    };
    let svc = Supervised::with_config(Activities::new(vec![spec]), cfg);
    let mut events = svc.subscribe();
    svc.start().await.expect("start");

    let began = Instant::now();
    svc.stop().await;
    let took = began.elapsed();
    assert!(took < Duration::from_secs(5), "stop hung for {took:?}");
    assert_eq!(svc.state(), ServiceState::Shutdown);

    let mut escalated = false;
    let mut timed_out = false;
    while let Ok(ev) = events.try_recv() {
        escalated |= ev.kind == EventKind::DrainEscalated;
        timed_out |= ev.kind == EventKind::StopTimedOut;
    }
    assert!(escalated, "drain escalation must be published");
    assert!(timed_out, "force-drop must be published");
}

#[tokio::test]
async fn ran_at_is_recorded_for_timer_fires() {
    let spec = ActivitySpec::interval(
        "stamped",
        Duration::from_millis(40),
        FireMode::Eager,
        |_ctx| async { Ok(()) },
    );
    let svc = Supervised::new(Activities::new(vec![spec]));
    svc.start().await.expect("start");
    tokio::time::sleep(Duration::from_millis(100)).await;

    let infos = svc.activities();
    assert_eq!(infos.len(), 1);
    assert_eq!(infos[0].name, "stamped");
    assert!(infos[0].ran_at.is_some(), "ran_at set on fire");
    svc.stop().await;
}
