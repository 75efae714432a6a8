//! Per-app send side of the bus.

use serde_json::Value;

use super::bus::EventBus;
use crate::layout::ReadyGate;

/// Sends messages on behalf of one mounted app.
///
/// Messages are held until the app's layout is ready, then handed to the bus.
/// `send` never waits.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    bus: EventBus,
    sender: String,
    ready: ReadyGate,
}

impl Dispatcher {
    pub fn new(bus: EventBus, sender: impl Into<String>, ready: ReadyGate) -> Self {
        Self {
            bus,
            sender: sender.into(),
            ready,
        }
    }

    /// Queue `message` for delivery once the layout is ready.
    ///
    /// If the layout never becomes ready the message is dropped.
    pub fn send(&self, message: impl Into<Value>) {
        let message = message.into();
        if self.ready.is_open() {
            self.bus.dispatch(&self.sender, message);
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(target: "mosaic::events", app = %self.sender, "dispatch outside of a runtime; message dropped");
            return;
        };
        let this = self.clone();
        runtime.spawn(async move {
            if this.ready.wait().await {
                this.bus.dispatch(&this.sender, message);
            } else {
                tracing::warn!(target: "mosaic::events", app = %this.sender, "layout never became ready; message dropped");
            }
        });
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }
}
