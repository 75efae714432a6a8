//! Readiness barrier shared by the sibling apps of one layout.
//!
//! The layout holds the [`ReadySignal`] and opens it once every app has
//! mounted. Apps hold clones of the [`ReadyGate`] and can await it before
//! talking to their siblings. Dropping the signal without opening it closes
//! the gate for good.

use tokio::sync::watch;

/// Create a connected signal/gate pair, initially closed.
pub fn ready_gate() -> (ReadySignal, ReadyGate) {
    let (tx, rx) = watch::channel(false);
    (ReadySignal { tx }, ReadyGate { rx })
}

/// Write side, owned by the layout.
#[derive(Debug)]
pub struct ReadySignal {
    tx: watch::Sender<bool>,
}

impl ReadySignal {
    /// Release every waiter. Idempotent.
    pub fn open(&self) {
        self.tx.send_replace(true);
    }
}

/// Read side handed to every app of a layout.
#[derive(Debug, Clone)]
pub struct ReadyGate {
    rx: watch::Receiver<bool>,
}

impl ReadyGate {
    /// A gate that is already open.
    pub fn opened() -> Self {
        let (signal, gate) = ready_gate();
        signal.open();
        gate
    }

    pub fn is_open(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until the gate opens.
    ///
    /// Returns `false` if the signal was dropped without opening, which
    /// happens when the layout mount failed.
    pub async fn wait(&self) -> bool {
        if self.is_open() {
            return true;
        }
        let mut rx = self.rx.clone();
        let opened = rx.wait_for(|open| *open).await.is_ok();
        opened
    }
}
