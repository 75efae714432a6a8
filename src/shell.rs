//! The shell: one bus, one app registry and at most one router over a page.
//!
//! [`bootstrap`] assembles a [`Shell`] from a [`BootstrapConfig`] and, unless
//! told otherwise, runs the initial route change before returning.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use crate::app::{AppRegistry, ModuleLoader, MountEnv};
use crate::config::{BootstrapConfig, ShellOptions};
use crate::dom::{Document, NodeId};
use crate::error::{Error, Result};
use crate::event::{Envelope, EventBus, Subscription, SHELL_CHANNEL};
use crate::lifecycle::{LifecycleEvent, LifecycleTracker, MountedApp};
use crate::router::{History, MemoryHistory, Router, RouterHandle};

// ---------------------------------------------------------------------------
// ShellContext
// ---------------------------------------------------------------------------

/// State shared by everything running under one shell.
pub struct ShellContext {
    pub options: ShellOptions,
    pub bus: EventBus,
    pub document: Arc<dyn Document>,
    pub container: NodeId,
    pub registry: Arc<AppRegistry>,
    pub loader: Option<Arc<dyn ModuleLoader>>,
    pub lifecycle: Arc<Mutex<LifecycleTracker>>,
    pub shared_libs: BTreeMap<String, String>,
}

impl ShellContext {
    /// Mount environment for apps driven by `router`.
    pub fn mount_env(&self, router: RouterHandle) -> MountEnv {
        MountEnv {
            document: self.document.clone(),
            bus: self.bus.clone(),
            registry: self.registry.clone(),
            lifecycle: self.lifecycle.clone(),
            loader: self.loader.clone(),
            router,
            debug: self.options.debug,
        }
    }
}

impl std::fmt::Debug for ShellContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShellContext")
            .field("options", &self.options)
            .field("container", &self.container)
            .field("apps", &self.registry.names())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Shell
// ---------------------------------------------------------------------------

/// A running shell.
#[derive(Debug)]
pub struct Shell {
    ctx: Arc<ShellContext>,
    router: Option<Router>,
}

/// Assemble a shell and, unless `manually_start_router` is set, perform the
/// initial route change.
///
/// Without routes no layout is ever mounted; the bus is still usable.
pub async fn bootstrap(config: BootstrapConfig) -> Result<Shell> {
    let BootstrapConfig {
        document,
        container,
        apps,
        routes,
        history,
        loader,
        shared_libs,
        options,
    } = config;

    if !document.contains(container) {
        return Err(Error::NodeNotFound(container));
    }

    let ctx = Arc::new(ShellContext {
        bus: EventBus::new(options.warnings.subscriptions, options.debug),
        document,
        container,
        registry: Arc::new(apps),
        loader,
        lifecycle: Arc::new(Mutex::new(LifecycleTracker::new())),
        shared_libs,
        options,
    });

    let router = routes.map(|routes| {
        let history: Arc<dyn History> = match history {
            Some(history) => history,
            None => Arc::new(MemoryHistory::new()),
        };
        Router::new(routes, history, &ctx)
    });

    if ctx.options.debug {
        tracing::debug!(
            target: "mosaic::shell",
            apps = ctx.registry.len(),
            routed = router.is_some(),
            base_path = %ctx.options.base_path(),
            "bootstrap"
        );
    }

    let shell = Shell { ctx, router };
    if !shell.ctx.options.manually_start_router {
        shell.start_router().await?;
    }
    Ok(shell)
}

impl Shell {
    /// Run the route change for the current location. No-op without routes.
    pub async fn start_router(&self) -> Result<()> {
        match &self.router {
            Some(router) => router.start().await,
            None => Ok(()),
        }
    }

    /// Send a message from the host page to every subscriber.
    pub fn dispatch(&self, message: impl Into<Value>) {
        self.ctx.bus.dispatch(SHELL_CHANNEL, message.into());
    }

    /// Subscribe the host page to every dispatched message.
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&Envelope) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.ctx.bus.subscribe(SHELL_CHANNEL, observer)
    }

    pub fn router(&self) -> Option<&Router> {
        self.router.as_ref()
    }

    pub fn bus(&self) -> &EventBus {
        &self.ctx.bus
    }

    pub fn options(&self) -> &ShellOptions {
        &self.ctx.options
    }

    pub fn apps(&self) -> &AppRegistry {
        &self.ctx.registry
    }

    pub fn shared_libs(&self) -> &BTreeMap<String, String> {
        &self.ctx.shared_libs
    }

    pub fn context(&self) -> &Arc<ShellContext> {
        &self.ctx
    }

    /// Currently mounted apps, most recently mounted first.
    pub fn mounted_apps(&self) -> Vec<MountedApp> {
        self.ctx.lifecycle.lock().mounted_apps()
    }

    /// Drain the mount/unmount events recorded since the last call.
    pub fn lifecycle_events(&self) -> Vec<LifecycleEvent> {
        self.ctx.lifecycle.lock().pending_events()
    }

    /// A mount environment over this shell, for mounting layouts by hand.
    pub fn mount_env(&self) -> MountEnv {
        let router = self.router.as_ref().map(Router::handle).unwrap_or_default();
        self.ctx.mount_env(router)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{App, Bootstrap};
    use crate::dom::{Element, MemoryDocument};
    use crate::layout::Layout;
    use crate::router::{Route, Routes};
    use crate::testing::TextApp;
    use pretty_assertions::assert_eq;
    use tokio_test::{assert_err, assert_ok};

    fn config(doc: &MemoryDocument, root: NodeId) -> BootstrapConfig {
        let apps = AppRegistry::new([App::new("home", Bootstrap::object(TextApp::new("home")))]).unwrap();
        BootstrapConfig::new(Arc::new(doc.clone()), root, apps)
    }

    fn page() -> (MemoryDocument, NodeId) {
        let doc = MemoryDocument::new();
        let root = doc.create_root(&Element::new("div").id("root"));
        (doc, root)
    }

    #[tokio::test]
    async fn missing_container_is_rejected() {
        let (doc, root) = page();
        doc.discard(root);
        let err = assert_err!(bootstrap(config(&doc, root)).await);
        assert!(matches!(err, Error::NodeNotFound(id) if id == root));
    }

    #[tokio::test]
    async fn without_routes_nothing_mounts() {
        let (doc, root) = page();
        let shell = assert_ok!(bootstrap(config(&doc, root).with_shared_lib("react", "/libs/react.js")).await);
        assert!(shell.router().is_none());
        assert!(shell.mounted_apps().is_empty());
        assert_eq!(shell.shared_libs()["react"], "/libs/react.js");
        assert_ok!(shell.start_router().await);
    }

    #[tokio::test]
    async fn initial_route_change_runs_unless_manual() {
        let (doc, root) = page();
        let routes = || Routes::new([Route::app("/", "home").unwrap()]).unwrap();

        let shell = assert_ok!(bootstrap(config(&doc, root).with_routes(routes())).await);
        assert_eq!(shell.mounted_apps()[0].name, "home");
        assert_eq!(
            shell.lifecycle_events(),
            vec![LifecycleEvent::Mount {
                app: "home".into(),
                container: shell.mounted_apps()[0].container,
            }]
        );
        assert!(shell.lifecycle_events().is_empty());

        let (doc, root) = page();
        let options = ShellOptions::new().with_manually_start_router(true);
        let shell = assert_ok!(
            bootstrap(config(&doc, root).with_routes(routes()).with_options(options)).await
        );
        assert!(shell.mounted_apps().is_empty());
        assert_ok!(shell.start_router().await);
        assert_eq!(shell.mounted_apps().len(), 1);
    }

    #[tokio::test]
    async fn mount_env_shares_bus_and_registry() {
        let (doc, root) = page();
        let shell = assert_ok!(bootstrap(config(&doc, root)).await);
        let env = shell.mount_env();
        let _sub = env.bus.subscribe("home", |_| Ok(()));
        assert_eq!(shell.bus().subscriber_count("home"), 1);
        let mounted = assert_ok!(Layout::for_app("home").mount(&env, root, Value::Null).await);
        assert_eq!(shell.mounted_apps().len(), 1);
        assert_ok!(mounted.unmount(&env).await);
    }
}
