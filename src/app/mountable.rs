//! The contract every resolved app satisfies, and what it is handed.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::dom::{Document, NodeId};
use crate::event::{Dispatcher, Envelope, EventBus, Subscription};
use crate::layout::ReadyGate;
use crate::router::RouterHandle;

/// Opaque result of a mount, given back on unmount.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderHandle(Option<NodeId>);

impl RenderHandle {
    /// Handle pointing at the root node the app rendered.
    pub fn node(id: NodeId) -> Self {
        Self(Some(id))
    }

    /// Handle for apps that render nothing themselves.
    pub fn empty() -> Self {
        Self(None)
    }

    pub fn root(&self) -> Option<NodeId> {
        self.0
    }
}

/// A unit that can render itself into a container and tear itself down.
#[async_trait]
pub trait Mountable: Send + Sync {
    async fn mount(&self, ctx: MountContext) -> anyhow::Result<RenderHandle>;

    async fn unmount(&self, ctx: UnmountContext) -> anyhow::Result<()>;
}

impl std::fmt::Debug for dyn Mountable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Mountable")
    }
}

/// Resolves remote app references into mountables.
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    async fn resolve(&self, identifier: &str) -> anyhow::Result<Arc<dyn Mountable>>;
}

/// Capabilities given to an app while it mounts.
///
/// Navigating through [`MountContext::router`] while mounting queues the
/// change: the call returns once it is queued, and the new route commits
/// after the current one has finished.
pub struct MountContext {
    pub name: String,
    pub data: Value,
    /// Route props with the app `name` merged in.
    pub props: Value,
    pub container: NodeId,
    pub document: Arc<dyn Document>,
    pub ready: ReadyGate,
    pub(crate) dispatcher: Dispatcher,
    pub(crate) bus: EventBus,
    pub(crate) router: RouterHandle,
}

impl MountContext {
    /// Send a message to every subscriber once the layout is ready.
    pub fn dispatch(&self, message: impl Into<Value>) {
        self.dispatcher.send(message);
    }

    /// Subscribe on this app's own channel.
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&Envelope) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.bus.subscribe(&self.name, observer)
    }

    /// A standalone dispatcher, for use after `mount` returns.
    pub fn dispatcher(&self) -> Dispatcher {
        self.dispatcher.clone()
    }

    /// The owning router, for imperative navigation.
    pub fn router(&self) -> &RouterHandle {
        &self.router
    }
}

impl std::fmt::Debug for MountContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountContext")
            .field("name", &self.name)
            .field("container", &self.container)
            .field("props", &self.props)
            .finish_non_exhaustive()
    }
}

/// What an app gets back when it is torn down.
pub struct UnmountContext {
    pub name: String,
    pub container: NodeId,
    pub handle: RenderHandle,
    pub document: Arc<dyn Document>,
}

impl UnmountContext {
    /// Detach and free the node the app rendered, if any.
    pub fn remove_rendered(&self) -> crate::Result<()> {
        if let Some(root) = self.handle.root() {
            self.document.remove_child(self.container, root)?;
            self.document.discard(root);
        }
        Ok(())
    }
}

/// An app that renders nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Blank;

#[async_trait]
impl Mountable for Blank {
    async fn mount(&self, _ctx: MountContext) -> anyhow::Result<RenderHandle> {
        Ok(RenderHandle::empty())
    }

    async fn unmount(&self, _ctx: UnmountContext) -> anyhow::Result<()> {
        Ok(())
    }
}

pub(crate) fn merge_props(props: Value, name: &str) -> Value {
    match props {
        Value::Object(mut map) => {
            map.entry("name").or_insert_with(|| Value::from(name));
            Value::Object(map)
        }
        Value::Null => serde_json::json!({ "name": name }),
        other => other,
    }
}
