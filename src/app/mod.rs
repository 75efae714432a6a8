//! Apps: named, lazily-resolved mountable units.
//!
//! An [`App`] wraps a [`Bootstrap`] source. The source is resolved on first
//! mount and cached for the app's lifetime. While mounted, the app remembers
//! its container and render handle so that `unmount` can hand them back.

pub mod mountable;
pub mod registry;
pub mod source;

pub use mountable::{Blank, ModuleLoader, MountContext, Mountable, RenderHandle, UnmountContext};
pub use registry::AppRegistry;
pub use source::{Bootstrap, Factory};

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::OnceCell;

use crate::dom::{Document, NodeId};
use crate::error::{Error, Result};
use crate::event::{Dispatcher, EventBus};
use crate::layout::ReadyGate;
use crate::lifecycle::LifecycleTracker;
use crate::router::RouterHandle;

/// Everything an app needs from its surroundings to mount.
#[derive(Clone)]
pub struct MountEnv {
    pub document: Arc<dyn Document>,
    pub bus: EventBus,
    pub registry: Arc<AppRegistry>,
    pub lifecycle: Arc<Mutex<LifecycleTracker>>,
    pub loader: Option<Arc<dyn ModuleLoader>>,
    pub router: RouterHandle,
    pub debug: bool,
}

impl MountEnv {
    pub(crate) fn log_stack(&self, event: &str, app: &str) {
        if !self.debug {
            return;
        }
        let stack = self.lifecycle.lock().mounted_apps();
        tracing::debug!(target: "mosaic::app", app = %app, stack = stack.len(), "{event}");
        for entry in &stack {
            tracing::debug!(
                target: "mosaic::app",
                app = %entry.name,
                container = ?entry.container,
                age_ms = entry.mounted_at.elapsed().as_millis() as u64,
                "  stack entry"
            );
        }
    }
}

impl std::fmt::Debug for MountEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountEnv")
            .field("apps", &self.registry.len())
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Placement {
    container: Option<NodeId>,
    handle: RenderHandle,
}

/// A named micro-app.
pub struct App {
    name: String,
    source: Bootstrap,
    data: Value,
    instance: OnceCell<Arc<dyn Mountable>>,
    placement: Mutex<Placement>,
}

impl App {
    pub fn new(name: impl Into<String>, source: impl Into<Bootstrap>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            data: Value::Object(Default::default()),
            instance: OnceCell::new(),
            placement: Mutex::new(Placement::default()),
        }
    }

    /// Static data handed to the app on every mount.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn source(&self) -> &Bootstrap {
        &self.source
    }

    /// Container the app is currently mounted in.
    pub fn container(&self) -> Option<NodeId> {
        self.placement.lock().container
    }

    pub fn render_handle(&self) -> RenderHandle {
        self.placement.lock().handle
    }

    pub fn is_mounted(&self) -> bool {
        self.container().is_some()
    }

    /// Whether the bootstrap source has been resolved yet.
    pub fn is_resolved(&self) -> bool {
        self.instance.initialized()
    }

    /// Resolve the bootstrap source, at most once.
    pub async fn instance(&self, env: &MountEnv) -> Result<Arc<dyn Mountable>> {
        let instance = self
            .instance
            .get_or_try_init(|| self.source.resolve(&self.name, env.loader.as_deref()))
            .await?;
        Ok(instance.clone())
    }

    /// Mount into `container` with `props`.
    ///
    /// `ready` gates the app's outgoing messages until its whole layout has
    /// mounted.
    pub async fn mount(
        &self,
        env: &MountEnv,
        container: Option<NodeId>,
        props: Value,
        ready: ReadyGate,
    ) -> Result<RenderHandle> {
        let container = container.ok_or_else(|| Error::ContainerMissing(self.name.clone()))?;
        let instance = self.instance(env).await?;
        let ctx = MountContext {
            name: self.name.clone(),
            data: self.data.clone(),
            props: mountable::merge_props(props, &self.name),
            container,
            document: env.document.clone(),
            ready: ready.clone(),
            dispatcher: Dispatcher::new(env.bus.clone(), self.name.clone(), ready),
            bus: env.bus.clone(),
            router: env.router.clone(),
        };
        let handle = instance
            .mount(ctx)
            .await
            .map_err(|e| Error::mount(&self.name, e))?;

        *self.placement.lock() = Placement {
            container: Some(container),
            handle,
        };
        env.lifecycle.lock().on_mount(&self.name, container);
        env.log_stack("mounted", &self.name);
        Ok(handle)
    }

    /// Unmount from the recorded container. No-op if not mounted.
    ///
    /// The recorded container and handle are cleared even if the app's own
    /// unmount fails.
    pub async fn unmount(&self, env: &MountEnv) -> Result<()> {
        let placement = std::mem::take(&mut *self.placement.lock());
        let Some(container) = placement.container else {
            return Ok(());
        };
        env.lifecycle.lock().on_unmount(&self.name);
        let instance = self.instance(env).await?;
        let result = instance
            .unmount(UnmountContext {
                name: self.name.clone(),
                container,
                handle: placement.handle,
                document: env.document.clone(),
            })
            .await
            .map_err(|e| Error::unmount(&self.name, e));
        env.log_stack("unmounted", &self.name);
        result
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("name", &self.name)
            .field("source", &self.source)
            .field("mounted", &self.is_mounted())
            .finish()
    }
}
