//! Runtime events emitted by the lifecycle engine.
//!
//! - [`Event`] / [`EventKind`]: what happened, with metadata.
//! - [`Bus`]: per-tree broadcast channel carrying the events.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
