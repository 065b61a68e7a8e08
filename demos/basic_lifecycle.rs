//! # Demo: basic_lifecycle
//!
//! Minimal walkthrough of one service's lifecycle:
//! - Implement [`Service`] with a couple of hooks and a loop activity.
//! - `start()`, let it run, `stop()`.
//!
//! ## Run
//! ```bash
//! cargo run --example basic_lifecycle
//! ```

use std::time::Duration;

use async_trait::async_trait;
use servisor::{ActivityError, ActivitySpec, Service, ServiceContext, Supervised};

struct Greeter;

#[async_trait]
impl Service for Greeter {
    async fn on_start(&self, _ctx: &ServiceContext) -> Result<(), ActivityError> {
        println!("[greeter] warming up");
        Ok(())
    }

    fn declare_activities(&self) -> Vec<ActivitySpec> {
        vec![ActivitySpec::task("greet", |ctx: ServiceContext| async move {
            let mut round = 0u32;
            while !ctx.should_stop() {
                round += 1;
                println!("[greeter] hello #{round}");
                ctx.sleep(Duration::from_millis(400)).await;
            }
            println!("[greeter] bye");
            Ok(())
        })]
    }

    async fn on_shutdown(&self, _ctx: &ServiceContext) -> Result<(), ActivityError> {
        println!("[greeter] lights off");
        Ok(())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let svc = Supervised::new(Greeter);

    svc.start().await?;
    println!("[main] state = {}", svc.state());

    tokio::time::sleep(Duration::from_millis(1500)).await;

    svc.stop().await;
    println!("[main] state = {}", svc.state());
    Ok(())
}
