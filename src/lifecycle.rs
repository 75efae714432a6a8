//! App lifecycle bookkeeping: which apps are mounted, where, and since when.
//!
//! The `LifecycleTracker` keeps a stack of mounted apps (most recent last) and
//! accumulates lifecycle events (`Mount`, `Unmount`) that can be drained for
//! inspection. It is shared by every app of one shell.

use std::time::Instant;

use crate::dom::NodeId;

// ---------------------------------------------------------------------------
// LifecycleEvent
// ---------------------------------------------------------------------------

/// Events that occur during the app lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// An app was mounted into `container`.
    Mount { app: String, container: NodeId },
    /// An app was unmounted.
    Unmount { app: String },
}

// ---------------------------------------------------------------------------
// MountedApp
// ---------------------------------------------------------------------------

/// One entry of the mounted-app stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountedApp {
    pub name: String,
    pub container: NodeId,
    pub mounted_at: Instant,
}

// ---------------------------------------------------------------------------
// LifecycleTracker
// ---------------------------------------------------------------------------

/// Tracks which apps are currently mounted and accumulates lifecycle events.
#[derive(Debug, Default)]
pub struct LifecycleTracker {
    mounted: Vec<MountedApp>,
    pending: Vec<LifecycleEvent>,
}

impl LifecycleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `app` has been mounted into `container`.
    ///
    /// If the app was already mounted, this is a no-op (no duplicate event).
    pub fn on_mount(&mut self, app: &str, container: NodeId) {
        if self.is_mounted(app) {
            return;
        }
        self.mounted.push(MountedApp {
            name: app.to_owned(),
            container,
            mounted_at: Instant::now(),
        });
        self.pending.push(LifecycleEvent::Mount {
            app: app.to_owned(),
            container,
        });
    }

    /// Record that `app` has been unmounted.
    ///
    /// If the app was not mounted, this is a no-op (no spurious event).
    pub fn on_unmount(&mut self, app: &str) {
        let Some(index) = self.mounted.iter().position(|m| m.name == app) else {
            return;
        };
        self.mounted.remove(index);
        self.pending.push(LifecycleEvent::Unmount {
            app: app.to_owned(),
        });
    }

    pub fn is_mounted(&self, app: &str) -> bool {
        self.mounted.iter().any(|m| m.name == app)
    }

    /// Currently mounted apps, most recently mounted first.
    pub fn mounted_apps(&self) -> Vec<MountedApp> {
        self.mounted.iter().rev().cloned().collect()
    }

    /// Names of the currently mounted apps, most recent first.
    pub fn mounted_names(&self) -> Vec<String> {
        self.mounted.iter().rev().map(|m| m.name.clone()).collect()
    }

    pub fn mounted_count(&self) -> usize {
        self.mounted.len()
    }

    /// Drain and return all pending lifecycle events.
    pub fn pending_events(&mut self) -> Vec<LifecycleEvent> {
        std::mem::take(&mut self.pending)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
