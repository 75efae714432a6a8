//! Route middlewares and the route table.

use std::sync::Arc;

use async_trait::async_trait;

use super::context::{Hooks, Match, Props, RouteContext};
use crate::error::{Error, Result};
use crate::layout::Layout;
use crate::pipeline::{Middleware, MiddlewareKind, Next, Pipeline};

/// Decides whether a prefix-matched route contributes, and with which props.
pub type RequestHandler = Arc<dyn Fn(&RouteContext) -> anyhow::Result<Option<Props>> + Send + Sync>;

/// Score contributed by the default route.
pub const DEFAULT_ROUTE_SCORE: usize = 0;

fn validate(path: &str) -> Result<()> {
    if path.starts_with('/') {
        Ok(())
    } else {
        Err(Error::InvalidRoutePath(path.to_owned()))
    }
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_owned()
    } else {
        trimmed.to_owned()
    }
}

/// Whether `path` lies under `prefix`, comparing whole segments and
/// ignoring ASCII case. The root prefix matches only the root.
pub fn path_matches(prefix: &str, path: &str) -> bool {
    let path = normalize(path);
    if prefix == "/" {
        return path == "/";
    }
    match path.get(..prefix.len()) {
        Some(head) if head.eq_ignore_ascii_case(prefix) => {
            matches!(path.as_bytes().get(prefix.len()), None | Some(b'/'))
        }
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Route
// ---------------------------------------------------------------------------

/// A path prefix bound to a layout.
#[derive(Clone)]
pub struct Route {
    path: String,
    layout: Layout,
    props: Props,
    hooks: Hooks,
    handler: Option<RequestHandler>,
    fallback: bool,
}

impl Route {
    /// Route `path` to `layout`. Fails unless `path` starts with `/`.
    pub fn new(path: impl Into<String>, layout: Layout) -> Result<Self> {
        let path = path.into();
        validate(&path)?;
        Ok(Self {
            path: normalize(&path),
            layout,
            props: Props::default(),
            hooks: Hooks::default(),
            handler: None,
            fallback: false,
        })
    }

    /// Route `path` to a single app inside a generated wrapper.
    pub fn app(path: impl Into<String>, app: impl Into<String>) -> Result<Self> {
        Self::new(path, Layout::for_app(app))
    }

    /// The default route: contributes only when nothing else matched, and
    /// always runs last.
    pub fn fallback(layout: Layout) -> Self {
        Self {
            path: "*".to_owned(),
            layout,
            props: Props::default(),
            hooks: Hooks::default(),
            handler: None,
            fallback: true,
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

    /// Consult `handler` on every prefix match.
    ///
    /// Returning `Some(props)` contributes the match with those props,
    /// `None` declines it.
    pub fn with_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&RouteContext) -> anyhow::Result<Option<Props>> + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    /// Score this route would contribute for `path`, ignoring any handler.
    pub fn score(&self, path: &str) -> Option<usize> {
        if self.fallback {
            return Some(DEFAULT_ROUTE_SCORE);
        }
        path_matches(&self.path, path).then_some(self.path.len())
    }

    fn contribution(&self, ctx: &RouteContext, score: usize) -> Result<Option<Match>> {
        let props = match &self.handler {
            Some(handler) => match handler(ctx).map_err(|e| Error::Middleware(e.into()))? {
                Some(props) => props,
                None => return Ok(None),
            },
            None => self.props.clone(),
        };
        Ok(Some(
            Match::new(score, self.layout.clone())
                .with_props(props)
                .with_hooks(self.hooks.clone()),
        ))
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("path", &self.path)
            .field("apps", &self.layout.app_names())
            .field("fallback", &self.fallback)
            .field("handler", &self.handler.is_some())
            .finish()
    }
}

#[async_trait]
impl Middleware<RouteContext> for Route {
    fn kind(&self) -> MiddlewareKind {
        if self.fallback {
            MiddlewareKind::Default
        } else {
            MiddlewareKind::Route
        }
    }

    async fn handle(&self, ctx: &mut RouteContext, next: Next<'_, RouteContext>) -> Result<()> {
        let eligible = if self.fallback {
            ctx.matches.is_empty()
        } else {
            path_matches(&self.path, &ctx.path)
        };
        if eligible {
            let score = self.score(&ctx.path).unwrap_or(DEFAULT_ROUTE_SCORE);
            if let Some(m) = self.contribution(ctx, score)? {
                ctx.push_match(m);
            }
        }
        next.run(ctx).await
    }
}

// ---------------------------------------------------------------------------
// Redirect
// ---------------------------------------------------------------------------

/// Sends navigations for exactly `from` to `to`, skipping later middlewares.
#[derive(Debug, Clone)]
pub struct Redirect {
    from: String,
    to: String,
}

impl Redirect {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Result<Self> {
        let (from, to) = (from.into(), to.into());
        validate(&from)?;
        validate(&to)?;
        Ok(Self {
            from: normalize(&from),
            to,
        })
    }
}

#[async_trait]
impl Middleware<RouteContext> for Redirect {
    fn kind(&self) -> MiddlewareKind {
        MiddlewareKind::Redirect
    }

    async fn handle(&self, ctx: &mut RouteContext, next: Next<'_, RouteContext>) -> Result<()> {
        if normalize(&ctx.path).eq_ignore_ascii_case(&self.from) {
            ctx.redirect_to(self.to.clone());
            return Ok(());
        }
        next.run(ctx).await
    }
}

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

/// The router's middleware chain. The default route, if any, stays last.
#[derive(Debug)]
pub struct Routes {
    pipeline: Pipeline<RouteContext>,
}

impl Routes {
    /// Build the table. Fails if more than one default route is supplied.
    pub fn new(routes: impl IntoIterator<Item = Route>) -> Result<Self> {
        let (fallbacks, routes): (Vec<Route>, Vec<Route>) =
            routes.into_iter().partition(Route::is_fallback);
        if fallbacks.len() > 1 {
            return Err(Error::MultipleDefaultRoutes(fallbacks.len()));
        }
        let mut pipeline = Pipeline::new();
        for route in routes.into_iter().chain(fallbacks) {
            pipeline.push(route);
        }
        Ok(Self { pipeline })
    }

    /// Add a middleware ahead of the default route.
    pub fn push(&mut self, middleware: impl Middleware<RouteContext> + 'static) -> Result<()> {
        let middleware: Arc<dyn Middleware<RouteContext>> = Arc::new(middleware);
        let has_default = self.has_default();
        if middleware.kind() == MiddlewareKind::Default {
            if has_default {
                return Err(Error::MultipleDefaultRoutes(2));
            }
            self.pipeline.push_shared(middleware);
        } else if has_default {
            self.pipeline.insert(self.pipeline.len() - 1, middleware);
        } else {
            self.pipeline.push_shared(middleware);
        }
        Ok(())
    }

    /// Shorthand for `push(Route::new(path, layout)?)`.
    pub fn route(&mut self, path: impl Into<String>, layout: Layout) -> Result<()> {
        self.push(Route::new(path, layout)?)
    }

    pub fn has_default(&self) -> bool {
        self.pipeline
            .middlewares()
            .last()
            .is_some_and(|m| m.kind() == MiddlewareKind::Default)
    }

    pub fn middlewares(&self) -> &[Arc<dyn Middleware<RouteContext>>] {
        self.pipeline.middlewares()
    }

    pub fn pipeline(&self) -> &Pipeline<RouteContext> {
        &self.pipeline
    }

    /// Run the chain for `path` without touching any page.
    pub async fn resolve(&self, path: &str) -> Result<RouteContext> {
        let mut ctx = RouteContext::new(path, Default::default());
        self.pipeline.execute(&mut ctx).await?;
        ctx.sort_matches();
        Ok(ctx)
    }
}
