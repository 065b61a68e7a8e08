//! Event subscribers: the observability extension point.
//!
//! - [`Subscribe`] — implement to receive tree events.
//! - [`SubscriberSet`] — fan-out with per-subscriber queues and isolation.
//! - `LogWriter` — built-in tracing sink (feature `logging`).

mod set;
mod subscriber;

#[cfg(feature = "logging")]
mod log;

pub use set::SubscriberSet;
pub use subscriber::Subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
