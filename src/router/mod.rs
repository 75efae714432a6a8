//! Navigation: routes, history and the commit protocol.
//!
//! Every route change takes a new epoch from the router's counter before it
//! runs the pipeline. A change may only touch the page if its epoch is still
//! the latest once matching is done, and again once it holds the commit lock.
//! Older changes that lose the race finish silently without mounting.
//!
//! Navigation requested while a commit holds the page, from an app's mount
//! or a route hook, claims its epoch at once and commits after the running
//! one lets go.

pub mod context;
pub mod history;
pub mod route;

pub use context::{Hooks, Match, Props, RouteContext, State};
pub use history::{History, HistoryListener, Location, MemoryHistory};
pub use route::{path_matches, Redirect, RequestHandler, Route, Routes, DEFAULT_ROUTE_SCORE};

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{watch, Mutex as AsyncMutex};

use crate::app::MountEnv;
use crate::dom::{LinkHandler, NodeId};
use crate::error::{Error, Result};
use crate::layout::MountedLayout;
use crate::shell::ShellContext;

/// Hops after which a redirect chain is reported as a loop.
pub const MAX_REDIRECTS: usize = 8;

tokio::task_local! {
    /// Epoch of the commit currently holding the active layout.
    static COMMITTING: u64;
}

fn in_commit() -> bool {
    COMMITTING.try_with(|_| ()).is_ok()
}

struct Active {
    layout: MountedLayout,
    hooks: Hooks,
    apps: BTreeSet<String>,
}

/// Epochs whose route change has finished, committed or not.
///
/// Epochs are handed out contiguously, so everything up to `floor` is
/// collapsed and only out-of-order stragglers are kept in `above`.
#[derive(Debug, Default)]
struct Settled {
    floor: u64,
    above: BTreeSet<u64>,
}

impl Settled {
    fn insert(&mut self, epoch: u64) {
        self.above.insert(epoch);
        while self.above.remove(&(self.floor + 1)) {
            self.floor += 1;
        }
    }

    fn contains(&self, epoch: u64) -> bool {
        epoch <= self.floor || self.above.contains(&epoch)
    }
}

struct RouterInner {
    routes: Routes,
    history: Arc<dyn History>,
    env: MountEnv,
    container: NodeId,
    base_path: String,
    debug: bool,
    epoch: AtomicU64,
    active: AsyncMutex<Option<Active>>,
    /// Location the page reflects; `None` while a swap is half done.
    committed: Mutex<Option<Location>>,
    settled: watch::Sender<Settled>,
    /// Epoch claimed by the latest history move.
    popped: watch::Sender<u64>,
}

/// Drives layouts from history changes and programmatic navigation.
#[derive(Clone)]
pub struct Router {
    inner: Arc<RouterInner>,
}

/// Weak reference to a [`Router`], handed to mounted apps.
#[derive(Clone, Default)]
pub struct RouterHandle {
    inner: Weak<RouterInner>,
}

impl std::fmt::Debug for RouterHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterHandle")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl RouterHandle {
    /// A handle not attached to any router.
    pub fn detached() -> Self {
        Self::default()
    }

    fn upgrade(&self) -> Result<Arc<RouterInner>> {
        self.inner.upgrade().ok_or(Error::RouterDropped)
    }

    /// Like [`Router::navigate`]. From inside a mount or route hook the
    /// change is queued behind the running commit and this returns at once.
    pub async fn navigate(&self, path: &str, state: State) -> Result<()> {
        self.upgrade()?.navigate(path.to_owned(), state, 0).await
    }

    pub async fn back(&self) -> Result<()> {
        self.upgrade()?.step(false).await
    }

    pub async fn forward(&self) -> Result<()> {
        self.upgrade()?.step(true).await
    }

    /// Current location, base path included.
    pub fn location(&self) -> Result<Location> {
        Ok(self.upgrade()?.history.location())
    }
}

impl Router {
    pub(crate) fn new(routes: Routes, history: Arc<dyn History>, shell: &ShellContext) -> Self {
        let (settled, _) = watch::channel(Settled::default());
        let (popped, _) = watch::channel(0);
        let inner = Arc::new_cyclic(|weak: &Weak<RouterInner>| RouterInner {
            routes,
            history: history.clone(),
            env: shell.mount_env(RouterHandle {
                inner: weak.clone(),
            }),
            container: shell.container,
            base_path: shell.options.base_path().to_owned(),
            debug: shell.options.debug,
            epoch: AtomicU64::new(0),
            active: AsyncMutex::new(None),
            committed: Mutex::new(None),
            settled,
            popped,
        });

        let weak = Arc::downgrade(&inner);
        history.subscribe(Arc::new(move |location: &Location| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let Ok(runtime) = tokio::runtime::Handle::try_current() else {
                tracing::warn!(target: "mosaic::router", path = %location, "history change outside of a runtime; ignored");
                return;
            };
            let epoch = inner.claim();
            inner.popped.send_replace(epoch);
            runtime.spawn(inner.run_detached(epoch, location.clone()));
        }));

        Self { inner }
    }

    /// Run the route change for the current history entry.
    pub async fn start(&self) -> Result<()> {
        let location = self.inner.history.location();
        self.inner.clone().route_change(location, 0).await
    }

    /// Navigate to `path` (relative to the base path) with `state` as query.
    ///
    /// Resolves once the resulting route change has committed or been
    /// superseded. Navigating to the location last committed does nothing.
    pub async fn navigate(&self, path: &str, state: State) -> Result<()> {
        self.inner.clone().navigate(path.to_owned(), state, 0).await
    }

    /// Go back one entry and wait for the route change it causes.
    pub async fn back(&self) -> Result<()> {
        self.inner.clone().step(false).await
    }

    /// Go forward one entry and wait for the route change it causes.
    pub async fn forward(&self) -> Result<()> {
        self.inner.clone().step(true).await
    }

    pub fn location(&self) -> Location {
        self.inner.history.location()
    }

    pub fn routes(&self) -> &Routes {
        &self.inner.routes
    }

    pub fn handle(&self) -> RouterHandle {
        RouterHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Names of the apps in the committed layout.
    pub async fn active_apps(&self) -> BTreeSet<String> {
        self.inner
            .active
            .lock()
            .await
            .as_ref()
            .map(|a| a.apps.clone())
            .unwrap_or_default()
    }

    /// Root node of the committed layout's template.
    pub async fn active_root(&self) -> Option<NodeId> {
        self.inner.active.lock().await.as_ref().map(|a| a.layout.root())
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("base_path", &self.inner.base_path)
            .field("routes", &self.inner.routes.middlewares().len())
            .field("epoch", &self.inner.epoch.load(Ordering::Acquire))
            .finish()
    }
}

impl RouterInner {
    fn with_base(&self, path: &str) -> String {
        if path == "/" && !self.base_path.is_empty() {
            self.base_path.clone()
        } else {
            format!("{}{}", self.base_path, path)
        }
    }

    fn strip_base<'a>(&self, path: &'a str) -> &'a str {
        match path.strip_prefix(self.base_path.as_str()) {
            Some("") => "/",
            Some(rest) if rest.starts_with('/') => rest,
            _ => path,
        }
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::Acquire) == epoch
    }

    /// Take the next epoch. Every claimed epoch must go through [`Self::run`].
    fn claim(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::AcqRel) + 1
    }

    fn navigate(self: Arc<Self>, path: String, state: State, hops: usize) -> BoxFuture<'static, Result<()>> {
        Box::pin(async move {
            if !path.starts_with('/') {
                return Err(Error::InvalidRoutePath(path));
            }
            if hops > MAX_REDIRECTS {
                return Err(Error::RedirectLoop { path });
            }
            let target = Location::new(self.with_base(&path), &state);
            if target != self.history.location() {
                self.history.push_state(target.clone());
            }
            if self.committed.lock().as_ref() == Some(&target) {
                return Ok(());
            }
            if in_commit() {
                let epoch = self.claim();
                if self.debug {
                    tracing::debug!(target: "mosaic::router", path = %target, epoch, "queued behind running commit");
                }
                tokio::spawn(self.run_detached(epoch, target));
                return Ok(());
            }
            self.route_change(target, hops).await
        })
    }

    async fn step(self: Arc<Self>, forward: bool) -> Result<()> {
        let mut popped = self.popped.subscribe();
        let moved = if forward {
            self.history.forward()
        } else {
            self.history.back()
        };
        if !moved || in_commit() {
            return Ok(());
        }
        popped.changed().await.map_err(|_| Error::RouterDropped)?;
        let epoch = *popped.borrow_and_update();
        let mut settled = self.settled.subscribe();
        let landed = settled.wait_for(|s| s.contains(epoch)).await.is_ok();
        if landed {
            Ok(())
        } else {
            Err(Error::RouterDropped)
        }
    }

    async fn route_change(self: Arc<Self>, location: Location, hops: usize) -> Result<()> {
        let epoch = self.claim();
        // Navigations issued in the same turn all take their epoch first.
        tokio::task::yield_now().await;
        self.run(epoch, location, hops).await
    }

    async fn run(self: Arc<Self>, epoch: u64, location: Location, hops: usize) -> Result<()> {
        let result = self.clone().commit(epoch, location, hops).await;
        self.settled.send_modify(|s| s.insert(epoch));
        result
    }

    async fn run_detached(self: Arc<Self>, epoch: u64, location: Location) {
        if let Err(e) = self.run(epoch, location, 0).await {
            tracing::warn!(target: "mosaic::router", error = %e, "route change failed");
        }
    }

    async fn commit(self: Arc<Self>, epoch: u64, location: Location, hops: usize) -> Result<()> {
        let path = self.strip_base(&location.path).to_owned();
        if self.debug {
            tracing::debug!(target: "mosaic::router", path = %path, epoch, "route change");
        }
        let mut ctx = RouteContext::new(path, location.state());
        self.routes.pipeline().execute(&mut ctx).await?;

        if !self.is_current(epoch) {
            if self.debug {
                tracing::debug!(target: "mosaic::router", path = %ctx.path, epoch, "superseded");
            }
            return Ok(());
        }
        if let Some(target) = ctx.redirect.take() {
            if self.debug {
                tracing::debug!(target: "mosaic::router", from = %ctx.path, to = %target, hops, "redirect");
            }
            return self.clone().navigate(target, State::new(), hops + 1).await;
        }
        let Some(matched) = ctx.take_best() else {
            return Ok(());
        };
        let props = matched.props.resolve().await?;

        let mut active = self.active.lock().await;
        if !self.is_current(epoch) {
            return Ok(());
        }
        let root = COMMITTING
            .scope(epoch, self.swap(&mut active, &location, matched, props))
            .await?;
        drop(active);

        if let Some(root) = root {
            self.bind_links(root);
        }
        if self.debug {
            tracing::debug!(target: "mosaic::router", path = %ctx.path, epoch, "committed");
        }
        Ok(())
    }

    /// Replace the active layout with the match's. Returns the new template
    /// root when something was mounted.
    async fn swap(
        &self,
        active: &mut Option<Active>,
        location: &Location,
        matched: Match,
        props: Value,
    ) -> Result<Option<NodeId>> {
        let names = matched
            .layout
            .as_ref()
            .map(|l| l.app_names())
            .unwrap_or_default();
        if matched.layout.is_some() && active.as_ref().is_some_and(|a| a.apps == names) {
            *self.committed.lock() = Some(location.clone());
            return Ok(None);
        }

        *self.committed.lock() = None;
        if let Some(previous) = active.take() {
            previous.hooks.run_before_unmount().await?;
            previous.layout.unmount(&self.env).await?;
            previous.hooks.run_after_unmount().await?;
        }

        let Some(layout) = matched.layout else {
            *self.committed.lock() = Some(location.clone());
            return Ok(None);
        };
        matched.hooks.run_before_mount(&props).await?;
        let mounted = layout.mount(&self.env, self.container, props.clone()).await?;
        let root = mounted.root();
        *active = Some(Active {
            layout: mounted,
            hooks: matched.hooks.clone(),
            apps: names,
        });
        matched.hooks.run_after_mount(&props).await?;
        *self.committed.lock() = Some(location.clone());
        Ok(Some(root))
    }

    fn bind_links(self: &Arc<Self>, root: NodeId) {
        let weak = Arc::downgrade(self);
        let handler: LinkHandler = Arc::new(move |href: &str| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let location = Location::parse(href);
            if !location.path.starts_with('/') {
                return;
            }
            let Ok(runtime) = tokio::runtime::Handle::try_current() else {
                return;
            };
            runtime.spawn(async move {
                let state = location.state();
                if let Err(e) = inner.navigate(location.path, state, 0).await {
                    tracing::warn!(target: "mosaic::router", error = %e, "link navigation failed");
                }
            });
        });
        let bound = self.env.document.intercept_links(root, handler);
        if self.debug {
            tracing::debug!(target: "mosaic::router", links = bound, "links bound");
        }
    }
}
