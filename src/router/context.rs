//! Per-navigation context and the matches routes contribute to it.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::layout::Layout;

/// Query-string state of a navigation.
pub type State = BTreeMap<String, String>;

// ---------------------------------------------------------------------------
// Props
// ---------------------------------------------------------------------------

type Producer = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync>;

/// Props for a match: a value, or an async producer evaluated at commit.
#[derive(Clone)]
pub enum Props {
    Value(Value),
    Producer(Producer),
}

impl Props {
    pub fn producer<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        Props::Producer(Arc::new(move || Box::pin(f())))
    }

    pub async fn resolve(&self) -> Result<Value> {
        match self {
            Props::Value(v) => Ok(v.clone()),
            Props::Producer(f) => f().await.map_err(|e| Error::hook("props", e)),
        }
    }
}

impl Default for Props {
    fn default() -> Self {
        Props::Value(Value::Null)
    }
}

impl From<Value> for Props {
    fn from(v: Value) -> Self {
        Props::Value(v)
    }
}

impl std::fmt::Debug for Props {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Props::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Props::Producer(_) => f.write_str("Producer"),
        }
    }
}

// ---------------------------------------------------------------------------
// Hooks
// ---------------------------------------------------------------------------

type MountHook = Arc<dyn Fn(Value) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;
type UnmountHook = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Optional callbacks around a route's layout mount and unmount.
#[derive(Clone, Default)]
pub struct Hooks {
    before_mount: Option<MountHook>,
    after_mount: Option<MountHook>,
    before_unmount: Option<UnmountHook>,
    after_unmount: Option<UnmountHook>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn before_mount<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.before_mount = Some(Arc::new(move |props| Box::pin(f(props))));
        self
    }

    pub fn after_mount<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.after_mount = Some(Arc::new(move |props| Box::pin(f(props))));
        self
    }

    pub fn before_unmount<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.before_unmount = Some(Arc::new(move || Box::pin(f())));
        self
    }

    pub fn after_unmount<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.after_unmount = Some(Arc::new(move || Box::pin(f())));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.before_mount.is_none()
            && self.after_mount.is_none()
            && self.before_unmount.is_none()
            && self.after_unmount.is_none()
    }

    pub(crate) async fn run_before_mount(&self, props: &Value) -> Result<()> {
        run_mount_hook("beforeMount", self.before_mount.as_ref(), props).await
    }

    pub(crate) async fn run_after_mount(&self, props: &Value) -> Result<()> {
        run_mount_hook("afterMount", self.after_mount.as_ref(), props).await
    }

    pub(crate) async fn run_before_unmount(&self) -> Result<()> {
        run_unmount_hook("beforeUnmount", self.before_unmount.as_ref()).await
    }

    pub(crate) async fn run_after_unmount(&self) -> Result<()> {
        run_unmount_hook("afterUnmount", self.after_unmount.as_ref()).await
    }
}

async fn run_mount_hook(name: &'static str, hook: Option<&MountHook>, props: &Value) -> Result<()> {
    match hook {
        Some(hook) => hook(props.clone()).await.map_err(|e| Error::hook(name, e)),
        None => Ok(()),
    }
}

async fn run_unmount_hook(name: &'static str, hook: Option<&UnmountHook>) -> Result<()> {
    match hook {
        Some(hook) => hook().await.map_err(|e| Error::hook(name, e)),
        None => Ok(()),
    }
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks")
            .field("before_mount", &self.before_mount.is_some())
            .field("after_mount", &self.after_mount.is_some())
            .field("before_unmount", &self.before_unmount.is_some())
            .field("after_unmount", &self.after_unmount.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Match / RouteContext
// ---------------------------------------------------------------------------

/// A candidate contributed by a route.
#[derive(Debug, Clone)]
pub struct Match {
    pub score: usize,
    /// `None` unmounts the active layout without mounting another.
    pub layout: Option<Layout>,
    pub props: Props,
    pub hooks: Hooks,
}

impl Match {
    pub fn new(score: usize, layout: Layout) -> Self {
        Self {
            score,
            layout: Some(layout),
            props: Props::default(),
            hooks: Hooks::default(),
        }
    }

    pub fn with_props(mut self, props: impl Into<Props>) -> Self {
        self.props = props.into();
        self
    }

    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }
}

/// What the pipeline sees for one navigation attempt.
#[derive(Debug, Clone, Default)]
pub struct RouteContext {
    /// Path with the base path removed; always starts with `/`.
    pub path: String,
    pub state: State,
    pub matches: Vec<Match>,
    /// Set by a middleware to send the router elsewhere.
    pub redirect: Option<String>,
}

impl RouteContext {
    pub fn new(path: impl Into<String>, state: State) -> Self {
        Self {
            path: path.into(),
            state,
            matches: Vec::new(),
            redirect: None,
        }
    }

    pub fn push_match(&mut self, m: Match) {
        self.matches.push(m);
    }

    /// Ask the router to navigate to `path` instead.
    pub fn redirect_to(&mut self, path: impl Into<String>) {
        self.redirect = Some(path.into());
    }

    /// Sort descending by score. Ties keep insertion order.
    pub fn sort_matches(&mut self) {
        self.matches.sort_by(|a, b| b.score.cmp(&a.score));
    }

    /// Remove and return the best match.
    pub fn take_best(&mut self) -> Option<Match> {
        self.sort_matches();
        if self.matches.is_empty() {
            None
        } else {
            Some(self.matches.remove(0))
        }
    }
}
