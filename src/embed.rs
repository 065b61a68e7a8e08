//! # Embedding API.
//!
//! The small surface a host program uses to run a service tree inside its own
//! event loop, without handing the loop over:
//!
//! - [`start_system`] starts a tree and returns a [`SystemHandle`] with
//!   `join()` / `stop()`.
//! - [`run_scoped`] runs a closure against a started tree and guarantees the
//!   tree is stopped on every exit path, including panics.
//!
//! Nothing here installs process-global state; a host may embed any number of
//! independent trees.
//!
//! ```ignore
//! let handle = start_system(Supervised::new(App::default())).await?;
//! // ... host keeps doing its own work ...
//! handle.stop().await;
//! handle.join().await;
//! ```

use std::future::Future;

use futures::FutureExt;

use crate::error::ServiceError;
use crate::service::SupervisedRef;

/// Handle to a started service tree.
#[derive(Clone)]
pub struct SystemHandle {
    node: SupervisedRef,
}

impl SystemHandle {
    /// Completes once the root service has fully stopped (Shutdown or a
    /// reaped crash). Callable from any number of tasks.
    pub async fn join(&self) {
        self.node.wait_until_stopped().await;
    }

    /// Requests and awaits a stop of the tree.
    pub async fn stop(&self) {
        self.node.stop().await;
    }

    /// The root node, for state inspection or event subscription.
    pub fn node(&self) -> &SupervisedRef {
        &self.node
    }
}

/// Starts a service tree and hands back a join/stop handle.
///
/// On a failed start the error is returned and the tree is already torn down.
pub async fn start_system(node: SupervisedRef) -> Result<SystemHandle, ServiceError> {
    node.start().await?;
    Ok(SystemHandle { node })
}

/// Runs `f` against a started tree, stopping the tree on every exit path.
///
/// The closure's error is returned after the stop completes; a panic inside
/// `f` is resumed after the stop completes.
pub async fn run_scoped<F, Fut, T>(node: SupervisedRef, f: F) -> Result<T, ServiceError>
where
    F: FnOnce(SupervisedRef) -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    node.start().await?;

    let outcome = std::panic::AssertUnwindSafe(f(node.clone()))
        .catch_unwind()
        .await;
    node.stop().await;

    match outcome {
        Ok(result) => result,
        Err(payload) => std::panic::resume_unwind(payload),
    }
}
