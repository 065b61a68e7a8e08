//! # Demo: timers
//!
//! Interval timers (eager vs lazy) and an oracle-scheduled timer.
//!
//! ## Run
//! ```bash
//! cargo run --example timers
//! ```

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use servisor::{ActivitySpec, FireMode, Service, Supervised, TimerOracle};

/// Toy oracle: fires every 700ms, forever. A real implementation would wrap a
/// parsed crontab expression and a timezone.
struct EveryEvening;

impl TimerOracle for EveryEvening {
    fn next_fire_after(&self, now: SystemTime) -> Option<SystemTime> {
        Some(now + Duration::from_millis(700))
    }
}

struct Clocks;

impl Service for Clocks {
    fn declare_activities(&self) -> Vec<ActivitySpec> {
        vec![
            ActivitySpec::interval(
                "eager",
                Duration::from_millis(500),
                FireMode::Eager,
                |_ctx| async {
                    println!("[eager] tick");
                    Ok(())
                },
            ),
            ActivitySpec::interval(
                "lazy",
                Duration::from_millis(500),
                FireMode::Lazy,
                |_ctx| async {
                    println!("[lazy] tick");
                    Ok(())
                },
            ),
            ActivitySpec::cron("cron", Arc::new(EveryEvening), |_ctx| async {
                println!("[cron] scheduled fire");
                Ok(())
            }),
        ]
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let svc = Supervised::new(Clocks);
    svc.start().await?;

    tokio::time::sleep(Duration::from_millis(2200)).await;

    for info in svc.activities() {
        println!("[main] {} last ran at {:?}", info.name, info.ran_at);
    }

    svc.stop().await;
    Ok(())
}
