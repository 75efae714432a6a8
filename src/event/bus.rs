//! Publish/subscribe bus shared by the shell and every mounted app.
//!
//! Observers are grouped by channel (the subscribing app's name). A dispatch
//! reaches every observer of every channel; the channel only records who owns
//! the subscription, which drives leak detection and log attribution.
//!
//! Delivery is deferred: `dispatch` snapshots the observers and spawns one
//! task per observer, so nothing runs in the sender's turn and a failing or
//! panicking observer cannot affect the others.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use serde_json::Value;

use super::message::Envelope;

/// Live subscriptions per channel above which a leak warning is emitted.
pub const LEAK_THRESHOLD: usize = 20;

/// Channel used by the host page itself.
pub const SHELL_CHANNEL: &str = "shell";

/// An observer callback. Returning an error is logged and otherwise ignored.
pub type Observer = Arc<dyn Fn(&Envelope) -> anyhow::Result<()> + Send + Sync>;

struct Entry {
    id: u64,
    observer: Observer,
}

struct BusInner {
    channels: RwLock<HashMap<String, Vec<Entry>>>,
    next_id: AtomicU64,
    warn_leaks: bool,
    debug: bool,
}

impl BusInner {
    fn remove(&self, channel: &str, id: u64) -> bool {
        let mut channels = self.channels.write();
        let Some(entries) = channels.get_mut(channel) else {
            return false;
        };
        let Some(index) = entries.iter().position(|e| e.id == id) else {
            return false;
        };
        entries.remove(index);
        if entries.is_empty() {
            channels.remove(channel);
        }
        true
    }
}

/// Cheap-to-clone handle to the shared bus.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("channels", &self.inner.channels.read().len())
            .finish()
    }
}

impl EventBus {
    /// Create a bus. `warn_leaks` enables the subscription leak heuristic;
    /// `debug` enables send/receive logging.
    pub fn new(warn_leaks: bool, debug: bool) -> Self {
        Self {
            inner: Arc::new(BusInner {
                channels: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(0),
                warn_leaks,
                debug,
            }),
        }
    }

    /// Register `observer` under `channel`.
    ///
    /// Dropping the returned [`Subscription`] does not unsubscribe; call
    /// [`Subscription::unsubscribe`].
    pub fn subscribe<F>(&self, channel: &str, observer: F) -> Subscription
    where
        F: Fn(&Envelope) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let count = {
            let mut channels = self.inner.channels.write();
            let entries = channels.entry(channel.to_owned()).or_default();
            entries.push(Entry {
                id,
                observer: Arc::new(observer),
            });
            entries.len()
        };
        if self.inner.debug {
            tracing::debug!(target: "mosaic::events", app = %channel, "subscribed");
        }
        if self.inner.warn_leaks && count > LEAK_THRESHOLD {
            tracing::warn!(
                target: "mosaic::events",
                app = %channel,
                subscriptions = count,
                "possible memory leak: `{channel}` has more than {LEAK_THRESHOLD} subscriptions. Did you forget to unsubscribe?"
            );
        }
        Subscription {
            bus: Arc::downgrade(&self.inner),
            channel: channel.to_owned(),
            id,
            active: AtomicBool::new(true),
        }
    }

    /// Deliver `message` from `sender` to every current observer.
    ///
    /// Returns immediately. Observers subscribed or removed after this call
    /// do not affect this delivery. Outside a tokio runtime nothing can be
    /// scheduled and the message is dropped with a warning.
    pub fn dispatch(&self, sender: &str, message: Value) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(target: "mosaic::events", app = %sender, "dispatch outside of a runtime; message dropped");
            return;
        };
        let envelope = Arc::new(Envelope::new(sender, message));
        if self.inner.debug {
            tracing::debug!(target: "mosaic::events", app = %sender, message = %envelope.message, "send");
        }
        for (channel, observer) in self.snapshot() {
            let envelope = envelope.clone();
            let debug = self.inner.debug;
            runtime.spawn(async move {
                match catch_unwind(AssertUnwindSafe(|| observer(&envelope))) {
                    Ok(Ok(())) => {
                        if debug {
                            tracing::debug!(target: "mosaic::events", app = %channel, message = %envelope.message, "recv");
                        }
                    }
                    Ok(Err(error)) => {
                        tracing::warn!(target: "mosaic::events", app = %channel, error = %error, "recv error");
                    }
                    Err(_) => {
                        tracing::warn!(target: "mosaic::events", app = %channel, "observer panicked");
                    }
                }
            });
        }
    }

    /// Live subscriptions owned by `channel`.
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.inner.channels.read().get(channel).map_or(0, Vec::len)
    }

    /// Whether `channel` is over the leak threshold.
    pub fn leak_suspected(&self, channel: &str) -> bool {
        self.subscriber_count(channel) > LEAK_THRESHOLD
    }

    /// Observers across all channels in subscription order.
    fn snapshot(&self) -> Vec<(String, Observer)> {
        let channels = self.inner.channels.read();
        let mut all: Vec<(u64, String, Observer)> = channels
            .iter()
            .flat_map(|(channel, entries)| {
                entries
                    .iter()
                    .map(move |e| (e.id, channel.clone(), e.observer.clone()))
            })
            .collect();
        all.sort_by_key(|(id, _, _)| *id);
        all.into_iter().map(|(_, c, o)| (c, o)).collect()
    }
}

/// Handle returned by [`EventBus::subscribe`].
pub struct Subscription {
    bus: Weak<BusInner>,
    channel: String,
    id: u64,
    active: AtomicBool,
}

impl Subscription {
    /// Remove the observer. Only the first call has an effect.
    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(bus) = self.bus.upgrade() {
            bus.remove(&self.channel, self.id);
            if bus.debug {
                tracing::debug!(target: "mosaic::events", app = %self.channel, "unsubscribed");
            }
        }
    }

    /// Whether `unsubscribe` has not been called yet.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Channel that owns this subscription.
    pub fn channel(&self) -> &str {
        &self.channel
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("channel", &self.channel)
            .field("active", &self.is_active())
            .finish()
    }
}
