//! # The `Service` trait: lifecycle hooks and declarations.
//!
//! A service is a capability interface: implement the hooks you need, leave
//! the rest defaulted. The engine ([`Supervised`](crate::Supervised)) drives
//! the hooks in a fixed order:
//!
//! | Hook | When | Error effect |
//! |---|---|---|
//! | `declare_children` | Once per construction, at first start | — |
//! | `on_first_start` | First start per construction | Crashed |
//! | `on_start` | Every start, before children | Crashed |
//! | `on_started` | After activities are scheduled | Crashed |
//! | `on_stop` | Start of stop, before children | Logged, continue |
//! | `on_shutdown` | End of stop | Logged, continue |
//! | `on_restart` | Before re-running start | Crashed |
//!
//! Every hook receives a [`ServiceContext`] bound to the owning node: use it
//! for `sleep`, `should_stop` checks, and dynamic activity registration.
//!
//! ## Rules
//! - Hooks must not call `start()`/`stop()` on their own node; they run inside
//!   those operations.
//! - Long work belongs in activities ([`Service::declare_activities`]), not in
//!   hooks.

use std::borrow::Cow;
use std::sync::Arc;

use async_trait::async_trait;

use crate::activities::ActivitySpec;
use crate::error::ActivityError;
use crate::policies::CrashPolicy;
use crate::service::context::ServiceContext;
use crate::service::supervised::SupervisedRef;

/// Shared handle to a service implementation.
pub type ServiceRef = Arc<dyn Service>;

/// A unit with a lifecycle and a set of owned background activities.
///
/// All methods have defaults; an empty `impl Service for Foo {}` is a valid
/// inert service, useful for grouping children.
#[async_trait]
pub trait Service: Send + Sync + 'static {
    /// Human name used in logs and events. Defaults to the type name.
    fn name(&self) -> Cow<'static, str> {
        let full = std::any::type_name::<Self>();
        Cow::Borrowed(full.rsplit("::").next().unwrap_or(full))
    }

    /// How the parent of this service reacts when this service crashes.
    fn crash_policy(&self) -> CrashPolicy {
        CrashPolicy::default()
    }

    /// Children started before this service finishes starting, stopped after
    /// it begins stopping. Collected once per construction; order is start
    /// order.
    fn declare_children(&self) -> Vec<SupervisedRef> {
        Vec::new()
    }

    /// Background activities launched on every start.
    fn declare_activities(&self) -> Vec<ActivitySpec> {
        Vec::new()
    }

    /// Runs once per construction, before the first `on_start`.
    async fn on_first_start(&self, ctx: &ServiceContext) -> Result<(), ActivityError> {
        let _ = ctx;
        Ok(())
    }

    /// Runs on every start, before declared children are started.
    async fn on_start(&self, ctx: &ServiceContext) -> Result<(), ActivityError> {
        let _ = ctx;
        Ok(())
    }

    /// Runs after children are up and activities are scheduled, immediately
    /// before the service is marked Running.
    async fn on_started(&self, ctx: &ServiceContext) -> Result<(), ActivityError> {
        let _ = ctx;
        Ok(())
    }

    /// Runs at the start of stop, before children are stopped and before
    /// activities are cancelled. Errors are logged, not propagated.
    async fn on_stop(&self, ctx: &ServiceContext) -> Result<(), ActivityError> {
        let _ = ctx;
        Ok(())
    }

    /// Runs at the very end of stop, after every activity has returned.
    /// Errors are logged, not propagated.
    async fn on_shutdown(&self, ctx: &ServiceContext) -> Result<(), ActivityError> {
        let _ = ctx;
        Ok(())
    }

    /// Runs before `start()` is re-entered from Shutdown or Crashed.
    async fn on_restart(&self, ctx: &ServiceContext) -> Result<(), ActivityError> {
        let _ = ctx;
        Ok(())
    }
}
