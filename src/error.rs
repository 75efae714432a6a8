//! Crate-wide error type.
//!
//! Structural misconfiguration (duplicate app names, bad route paths, several
//! default routes) is reported synchronously at construction. Failures while a
//! navigation mounts or unmounts are returned to whoever awaits it.

use crate::dom::{NodeId, SelectorError};

/// Boxed error from user-supplied code (mountables, hooks, loaders).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("app `{0}` already exists")]
    DuplicateAppName(String),

    #[error("invalid route path `{0}`: paths must start with `/`")]
    InvalidRoutePath(String),

    #[error("only one default route is allowed, {0} were supplied")]
    MultipleDefaultRoutes(usize),

    #[error("next() called multiple times")]
    NextCalledTwice,

    #[error("cannot mount `{0}`: container is not defined")]
    ContainerMissing(String),

    #[error("app `{0}` is not registered")]
    AppNotFound(String),

    #[error("slot `{slot}` not found in layout template")]
    SlotNotFound { slot: String },

    #[error(transparent)]
    Selector(#[from] SelectorError),

    #[error("node {0:?} does not exist")]
    NodeNotFound(NodeId),

    #[error("node {child:?} is not a child of {parent:?}")]
    NotAChild { parent: NodeId, child: NodeId },

    #[error("cannot attach {child:?} under {parent:?}")]
    HierarchyRequest { parent: NodeId, child: NodeId },

    #[error("failed to resolve app `{app}`")]
    Resolve {
        app: String,
        #[source]
        source: BoxError,
    },

    #[error("failed to mount app `{app}`")]
    Mount {
        app: String,
        #[source]
        source: BoxError,
    },

    #[error("failed to unmount app `{app}`")]
    Unmount {
        app: String,
        #[source]
        source: BoxError,
    },

    #[error("{} app(s) failed to unmount: {}", .0.len(), summarize(.0))]
    LayoutUnmount(Vec<Error>),

    #[error("{hook} hook failed")]
    Hook {
        hook: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("middleware failed")]
    Middleware(#[source] BoxError),

    #[error("too many redirects while navigating to `{path}`")]
    RedirectLoop { path: String },

    #[error("router is no longer running")]
    RouterDropped,

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn mount(app: &str, source: anyhow::Error) -> Self {
        Error::Mount {
            app: app.to_owned(),
            source: source.into(),
        }
    }

    pub(crate) fn unmount(app: &str, source: anyhow::Error) -> Self {
        Error::Unmount {
            app: app.to_owned(),
            source: source.into(),
        }
    }

    pub(crate) fn resolve(app: &str, source: anyhow::Error) -> Self {
        Error::Resolve {
            app: app.to_owned(),
            source: source.into(),
        }
    }

    pub(crate) fn hook(hook: &'static str, source: anyhow::Error) -> Self {
        Error::Hook {
            hook,
            source: source.into(),
        }
    }
}

fn summarize(errors: &[Error]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T = (), E = Error> = std::result::Result<T, E>;
