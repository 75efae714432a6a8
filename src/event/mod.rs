//! Event system: envelopes, the shared bus, per-app dispatch.

pub mod bus;
pub mod dispatch;
pub mod message;

pub use bus::{EventBus, Observer, Subscription, LEAK_THRESHOLD, SHELL_CHANNEL};
pub use dispatch::Dispatcher;
pub use message::Envelope;
