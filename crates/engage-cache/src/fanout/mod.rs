//! Fan-out channel
//!
//! [`FanoutHub`] delivers change events to in-process subscribers. With a
//! [`RelayPublisher`] attached, every published event is also written to
//! Redis, and [`spawn_relay_listener`] feeds events from other instances
//! back into the local hub.

mod hub;
mod relay;

pub use hub::{FanoutError, FanoutHub, Subscription};
pub use relay::{spawn_relay_listener, RelayConfig, RelayEnvelope, RelayPublisher, CHANGES_CHANNEL};
