//! # mosaic
//!
//! A navigation and lifecycle engine for composing independently built
//! micro-apps into one host page.
//!
//! A [`Shell`] owns a message bus, a registry of named [`App`]s and an
//! optional [`Router`]. Navigations run a middleware [`Pipeline`] over the
//! registered routes, pick the best-scoring match and swap the mounted
//! [`Layout`]: the old layout's apps are unmounted, a fresh copy of the new
//! template is attached and its apps mount concurrently into their slots.
//!
//! ## Core Systems
//!
//! - **[`event`]**: broadcast bus with per-app channels and deferred delivery
//! - **[`pipeline`]**: ordered async middleware with a `next` continuation
//! - **[`app`]**: lazily resolved mountables and the app registry
//! - **[`layout`]**: templates, slots and the sibling ready gate
//! - **[`router`]**: scoring routes, history, and epoch-guarded commits
//! - **[`dom`]**: the container capability and an in-memory page
//! - **[`shell`]**: bootstrap tying the pieces together
//!
//! ```no_run
//! use std::sync::Arc;
//! use mosaic::{bootstrap, App, AppRegistry, BootstrapConfig, Bootstrap, Route, Routes};
//! use mosaic::dom::{Element, MemoryDocument};
//! use mosaic::testing::TextApp;
//!
//! # async fn run() -> mosaic::Result<()> {
//! let doc = MemoryDocument::new();
//! let root = doc.create_root(&Element::new("div").id("root"));
//! let apps = AppRegistry::new([App::new("home", Bootstrap::object(TextApp::new("hi")))])?;
//! let routes = Routes::new([Route::app("/", "home")?])?;
//! let shell = bootstrap(BootstrapConfig::new(Arc::new(doc), root, apps).with_routes(routes)).await?;
//! assert_eq!(shell.mounted_apps()[0].name, "home");
//! # Ok(())
//! # }
//! ```

// Foundation
pub mod config;
pub mod dom;
pub mod error;
pub mod logging;

// Messaging and middleware
pub mod event;
pub mod pipeline;

// Apps and composition
pub mod app;
pub mod layout;
pub mod lifecycle;

// Navigation
pub mod router;

// Entry point
pub mod shell;

pub mod testing;

pub use app::{App, AppRegistry, Blank, Bootstrap, ModuleLoader, MountContext, Mountable, RenderHandle, UnmountContext};
pub use config::{BootstrapConfig, ShellOptions, Warnings};
pub use error::{Error, Result};
pub use event::{Dispatcher, Envelope, EventBus, Subscription};
pub use layout::{Layout, MountedLayout, ReadyGate};
pub use pipeline::{Middleware, MiddlewareKind, Next, Pipeline};
pub use router::{
    Hooks, Location, Match, MemoryHistory, Props, Redirect, Route, RouteContext, Router,
    RouterHandle, Routes, State,
};
pub use shell::{bootstrap, Shell};
