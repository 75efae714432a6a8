//! Test doubles for driving the shell headlessly.
//!
//! [`TextApp`] renders a fixed `<div>` into its container. [`CallLog`] hands
//! out apps that record their lifecycle calls, so ordering can be asserted.
//! [`MemoryLoader`] resolves remote identifiers from a map.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::app::{App, AppRegistry, ModuleLoader, MountContext, MountEnv, Mountable, RenderHandle, UnmountContext};
use crate::dom::{Document, Element, MemoryDocument};
use crate::event::EventBus;
use crate::lifecycle::LifecycleTracker;
use crate::router::RouterHandle;

// ---------------------------------------------------------------------------
// Mountables
// ---------------------------------------------------------------------------

fn render_div(ctx: &MountContext, text: &str) -> anyhow::Result<RenderHandle> {
    let node = ctx.document.instantiate(&Element::new("div").text(text));
    ctx.document.append_child(ctx.container, node)?;
    Ok(RenderHandle::node(node))
}

/// Renders `<div>{text}</div>` into its container.
#[derive(Debug, Clone)]
pub struct TextApp {
    text: String,
}

impl TextApp {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
impl Mountable for TextApp {
    async fn mount(&self, ctx: MountContext) -> anyhow::Result<RenderHandle> {
        render_div(&ctx, &self.text)
    }

    async fn unmount(&self, ctx: UnmountContext) -> anyhow::Result<()> {
        ctx.remove_rendered()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Behavior {
    Record,
    FailMount,
    FailUnmount,
}

/// A mountable that logs into a [`CallLog`].
#[derive(Debug, Clone)]
pub struct RecordingApp {
    name: String,
    log: CallLog,
    behavior: Behavior,
}

#[async_trait]
impl Mountable for RecordingApp {
    async fn mount(&self, ctx: MountContext) -> anyhow::Result<RenderHandle> {
        if self.behavior == Behavior::FailMount {
            self.log.push(format!("{}:mount-failed", self.name));
            anyhow::bail!("{} refused to mount", self.name);
        }
        self.log
            .push(format!("{}:mount {} data={}", self.name, ctx.props, ctx.data));
        render_div(&ctx, &self.name)
    }

    async fn unmount(&self, ctx: UnmountContext) -> anyhow::Result<()> {
        self.log.push(format!("{}:unmount", self.name));
        ctx.remove_rendered()?;
        if self.behavior == Behavior::FailUnmount {
            anyhow::bail!("{} refused to unmount", self.name);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// CallLog
// ---------------------------------------------------------------------------

/// Shared, ordered record of `"{who}:{event}"` entries.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    /// Entries with `event` as the first word after the `:`.
    pub fn count(&self, event: &str) -> usize {
        self.entries
            .lock()
            .iter()
            .filter(|e| {
                e.split_once(':')
                    .and_then(|(_, rest)| rest.split_whitespace().next())
                    == Some(event)
            })
            .count()
    }

    /// Entries without their payloads, e.g. `"nav:mount"`.
    pub fn events(&self) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .map(|e| e.split_whitespace().next().unwrap_or_default().to_owned())
            .collect()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn recording_app(&self, name: &str) -> RecordingApp {
        self.app(name, Behavior::Record)
    }

    /// An app whose mount always fails.
    pub fn failing_app(&self, name: &str) -> RecordingApp {
        self.app(name, Behavior::FailMount)
    }

    /// An app that logs and cleans up on unmount, then reports failure.
    pub fn failing_unmount_app(&self, name: &str) -> RecordingApp {
        self.app(name, Behavior::FailUnmount)
    }

    fn app(&self, name: &str, behavior: Behavior) -> RecordingApp {
        RecordingApp {
            name: name.to_owned(),
            log: self.clone(),
            behavior,
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryLoader
// ---------------------------------------------------------------------------

/// [`ModuleLoader`] backed by a map of identifiers.
#[derive(Default)]
pub struct MemoryLoader {
    modules: Mutex<HashMap<String, Arc<dyn Mountable>>>,
    requests: Mutex<Vec<String>>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_module(self, identifier: impl Into<String>, module: impl Mountable + 'static) -> Self {
        self.modules.lock().insert(identifier.into(), Arc::new(module));
        self
    }

    /// Every identifier requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

impl std::fmt::Debug for MemoryLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryLoader")
            .field("modules", &self.modules.lock().len())
            .finish()
    }
}

#[async_trait]
impl ModuleLoader for MemoryLoader {
    async fn resolve(&self, identifier: &str) -> anyhow::Result<Arc<dyn Mountable>> {
        self.requests.lock().push(identifier.to_owned());
        self.modules
            .lock()
            .get(identifier)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no module named `{identifier}`"))
    }
}

// ---------------------------------------------------------------------------
// Environments
// ---------------------------------------------------------------------------

/// A detached [`MountEnv`] over `doc` with `apps` registered.
///
/// # Panics
///
/// Panics if two apps share a name.
#[track_caller]
pub fn mount_env(doc: &MemoryDocument, apps: Vec<App>) -> MountEnv {
    let registry = match AppRegistry::new(apps) {
        Ok(registry) => registry,
        Err(e) => panic!("invalid test apps: {e}"),
    };
    MountEnv {
        document: Arc::new(doc.clone()) as Arc<dyn Document>,
        bus: EventBus::new(true, false),
        registry: Arc::new(registry),
        lifecycle: Arc::new(Mutex::new(LifecycleTracker::new())),
        loader: None,
        router: RouterHandle::detached(),
        debug: false,
    }
}
