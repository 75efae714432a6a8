//! Integration tests for mosaic.
//!
//! These tests drive a shell from outside the crate over an in-memory page,
//! verifying that bootstrap, routing, layouts and the bus work together.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

use mosaic::dom::{Document, Element, MemoryDocument, NodeId};
use mosaic::event::LEAK_THRESHOLD;
use mosaic::router::History;
use mosaic::testing::{CallLog, MemoryLoader, TextApp};
use mosaic::{
    bootstrap, App, AppRegistry, Bootstrap, BootstrapConfig, Envelope, Error, EventBus, Hooks,
    Layout, Match, MemoryHistory, Middleware, MountContext, Mountable, Next, Props, Redirect,
    RenderHandle, Route, RouteContext, Routes, Shell, ShellOptions, UnmountContext,
};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn page() -> (MemoryDocument, NodeId) {
    let doc = MemoryDocument::new();
    let root = doc.create_root(&Element::new("div").id("root"));
    (doc, root)
}

fn three_column() -> Layout {
    Layout::new(
        Element::new("div")
            .class("row")
            .child(Element::new("div").id("navbar"))
            .child(
                Element::new("div")
                    .class("column")
                    .child(Element::new("div").id("left"))
                    .child(Element::new("div").id("right")),
            ),
    )
    .slot("navbar", "navbar")
    .slot("left", "left")
    .slot("right", "right")
}

fn text_apps(names: &[&str]) -> AppRegistry {
    AppRegistry::new(
        names
            .iter()
            .map(|n| App::new(*n, Bootstrap::object(TextApp::new(format!("rendered {n}"))))),
    )
    .unwrap()
}

fn recording_apps(log: &CallLog, names: &[&str]) -> AppRegistry {
    AppRegistry::new(
        names
            .iter()
            .map(|n| App::new(*n, Bootstrap::object(log.recording_app(n)))),
    )
    .unwrap()
}

fn logged_hooks(log: &CallLog, route: &'static str) -> Hooks {
    let (a, b, c, d) = (log.clone(), log.clone(), log.clone(), log.clone());
    Hooks::new()
        .before_mount(move |_| {
            let log = a.clone();
            async move {
                log.push(format!("{route}:beforeMount"));
                Ok(())
            }
        })
        .after_mount(move |_| {
            let log = b.clone();
            async move {
                log.push(format!("{route}:afterMount"));
                Ok(())
            }
        })
        .before_unmount(move || {
            let log = c.clone();
            async move {
                log.push(format!("{route}:beforeUnmount"));
                Ok(())
            }
        })
        .after_unmount(move || {
            let log = d.clone();
            async move {
                log.push(format!("{route}:afterUnmount"));
                Ok(())
            }
        })
}

async fn start(doc: &MemoryDocument, root: NodeId, apps: AppRegistry, routes: Routes) -> Shell {
    let config = BootstrapConfig::new(Arc::new(doc.clone()), root, apps).with_routes(routes);
    assert_ok!(bootstrap(config).await)
}

/// Yield until `done` holds, failing after a generous bound.
async fn settle<F: FnMut() -> bool>(mut done: F) {
    for _ in 0..1_000 {
        if done() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition never held");
}

/// Sleeps before continuing the chain when the path is `path`.
struct Slow {
    path: &'static str,
    delay: Duration,
}

#[async_trait]
impl Middleware<RouteContext> for Slow {
    async fn handle(&self, ctx: &mut RouteContext, next: Next<'_, RouteContext>) -> mosaic::Result<()> {
        if ctx.path == self.path {
            tokio::time::sleep(self.delay).await;
        }
        next.run(ctx).await
    }
}

/// Renders one link.
struct LinkApp {
    href: &'static str,
}

#[async_trait]
impl Mountable for LinkApp {
    async fn mount(&self, ctx: MountContext) -> anyhow::Result<RenderHandle> {
        let node = ctx
            .document
            .instantiate(&Element::new("nav").child(Element::new("a").attr("href", self.href).text("go")));
        ctx.document.append_child(ctx.container, node)?;
        Ok(RenderHandle::node(node))
    }

    async fn unmount(&self, ctx: UnmountContext) -> anyhow::Result<()> {
        ctx.remove_rendered()?;
        Ok(())
    }
}

/// Announces itself on the bus while mounting.
struct Greeter;

#[async_trait]
impl Mountable for Greeter {
    async fn mount(&self, ctx: MountContext) -> anyhow::Result<RenderHandle> {
        ctx.dispatch(json!({"hello": ctx.name}));
        Ok(RenderHandle::empty())
    }

    async fn unmount(&self, _ctx: UnmountContext) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Fails its first mount, then renders like a [`TextApp`].
struct FlakyOnce {
    failed: AtomicBool,
    inner: TextApp,
}

impl FlakyOnce {
    fn new(text: &str) -> Self {
        Self {
            failed: AtomicBool::new(false),
            inner: TextApp::new(text),
        }
    }
}

#[async_trait]
impl Mountable for FlakyOnce {
    async fn mount(&self, ctx: MountContext) -> anyhow::Result<RenderHandle> {
        if !self.failed.swap(true, Ordering::SeqCst) {
            anyhow::bail!("backend still warming up");
        }
        self.inner.mount(ctx).await
    }

    async fn unmount(&self, ctx: UnmountContext) -> anyhow::Result<()> {
        self.inner.unmount(ctx).await
    }
}

/// Sends every visitor to `/login` from inside its own mount.
struct Guard;

#[async_trait]
impl Mountable for Guard {
    async fn mount(&self, ctx: MountContext) -> anyhow::Result<RenderHandle> {
        ctx.router().navigate("/login", Default::default()).await?;
        Ok(RenderHandle::empty())
    }

    async fn unmount(&self, _ctx: UnmountContext) -> anyhow::Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Bootstrap and composition
// ---------------------------------------------------------------------------

#[tokio::test]
async fn bootstrap_mounts_initial_layout() {
    let (doc, root) = page();
    let routes = Routes::new([
        Route::new("/", three_column()).unwrap(),
        Route::app("/login", "login").unwrap(),
    ])
    .unwrap();
    let shell = start(&doc, root, text_apps(&["navbar", "left", "right", "login"]), routes).await;

    insta::assert_snapshot!(doc.inner_html(root), @r#"<div class="row"><div id="navbar"><div>rendered navbar</div></div><div class="column"><div id="left"><div>rendered left</div></div><div id="right"><div>rendered right</div></div></div></div>"#);
    let mut mounted: Vec<_> = shell.mounted_apps().into_iter().map(|m| m.name).collect();
    mounted.sort();
    assert_eq!(mounted, vec!["left", "navbar", "right"]);
}

#[tokio::test]
async fn single_app_route_gets_wrapper() {
    let (doc, root) = page();
    let routes = Routes::new([
        Route::new("/", three_column()).unwrap(),
        Route::app("/login", "login").unwrap(),
    ])
    .unwrap();
    let shell = start(&doc, root, text_apps(&["navbar", "left", "right", "login"]), routes).await;
    let router = shell.router().unwrap();

    assert_ok!(router.navigate("/login", Default::default()).await);
    insta::assert_snapshot!(doc.inner_html(root), @r#"<div id="login" data-mosaic="layout-auto-generated"><div>rendered login</div></div>"#);
    assert_eq!(router.active_apps().await.into_iter().collect::<Vec<_>>(), vec!["login"]);
    assert_eq!(shell.mounted_apps().len(), 1);
}

#[tokio::test]
async fn props_and_data_reach_apps() {
    let (doc, root) = page();
    let log = CallLog::new();
    let apps = AppRegistry::new([
        App::new("home", Bootstrap::object(log.recording_app("home"))).with_data(json!({"theme": "dark"})),
    ])
    .unwrap();
    let routes = Routes::new([Route::app("/", "home").unwrap().with_props(json!({"user": "ada"}))]).unwrap();
    let _shell = start(&doc, root, apps, routes).await;
    assert_eq!(
        log.entries(),
        vec![r#"home:mount {"name":"home","user":"ada"} data={"theme":"dark"}"#.to_string()]
    );
}

#[tokio::test]
async fn request_handler_supplies_props() {
    let (doc, root) = page();
    let log = CallLog::new();
    let route = Route::app("/user", "profile").unwrap().with_handler(|ctx: &RouteContext| {
        Ok(ctx
            .state
            .get("id")
            .map(|id| Props::from(json!({ "id": id }))))
    });
    let routes = Routes::new([route]).unwrap();
    let shell = start(&doc, root, recording_apps(&log, &["profile"]), routes).await;
    let router = shell.router().unwrap();

    assert_ok!(router.navigate("/user", Default::default()).await);
    assert_eq!(log.count("mount"), 0);

    let state = [("id".to_string(), "7".to_string())].into();
    assert_ok!(router.navigate("/user", state).await);
    assert_eq!(router.location().to_string(), "/user?id=7");
    assert_eq!(
        log.entries(),
        vec![r#"profile:mount {"id":"7","name":"profile"} data={}"#.to_string()]
    );
}

#[tokio::test]
async fn remote_apps_resolve_through_loader() {
    let (doc, root) = page();
    let loader = Arc::new(MemoryLoader::new().with_module("@apps/home", TextApp::new("remote home")));
    let apps = AppRegistry::new([App::new("home", Bootstrap::remote("@apps/home"))]).unwrap();
    let routes = Routes::new([Route::app("/", "home").unwrap()]).unwrap();
    let config = BootstrapConfig::new(Arc::new(doc.clone()), root, apps)
        .with_routes(routes)
        .with_loader(loader.clone());
    let shell = assert_ok!(bootstrap(config).await);

    assert_eq!(doc.text_content(root), "remote home");
    assert_eq!(loader.requests(), vec!["@apps/home"]);
    assert!(shell.apps().get("home").unwrap().is_resolved());
}

#[tokio::test]
async fn remote_app_without_loader_fails_bootstrap() {
    let (doc, root) = page();
    let apps = AppRegistry::new([App::new("home", Bootstrap::remote("@apps/home"))]).unwrap();
    let routes = Routes::new([Route::app("/", "home").unwrap()]).unwrap();
    let config = BootstrapConfig::new(Arc::new(doc.clone()), root, apps).with_routes(routes);
    let err = assert_err!(bootstrap(config).await);
    assert!(matches!(err, Error::Resolve { ref app, .. } if app == "home"));
    assert_eq!(doc.inner_html(root), "");
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[test]
fn structural_errors_are_synchronous() {
    let err = AppRegistry::new([
        App::new("a", Bootstrap::object(TextApp::new("1"))),
        App::new("a", Bootstrap::object(TextApp::new("2"))),
    ])
    .unwrap_err();
    assert!(matches!(err, Error::DuplicateAppName(ref n) if n == "a"));

    assert!(matches!(Route::app("login", "login"), Err(Error::InvalidRoutePath(_))));

    let err = Routes::new([Route::fallback(Layout::for_app("a")), Route::fallback(Layout::for_app("b"))]).unwrap_err();
    assert!(matches!(err, Error::MultipleDefaultRoutes(2)));
}

// ---------------------------------------------------------------------------
// Navigation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn hooks_wrap_unmount_and_mount_in_order() {
    let (doc, root) = page();
    let log = CallLog::new();
    let routes = Routes::new([
        Route::app("/", "home").unwrap().with_hooks(logged_hooks(&log, "root")),
        Route::app("/login", "login").unwrap().with_hooks(logged_hooks(&log, "login-route")),
    ])
    .unwrap();
    let shell = start(&doc, root, recording_apps(&log, &["home", "login"]), routes).await;
    assert_ok!(shell.router().unwrap().navigate("/login", Default::default()).await);

    assert_eq!(
        log.events(),
        vec![
            "root:beforeMount",
            "home:mount",
            "root:afterMount",
            "root:beforeUnmount",
            "home:unmount",
            "root:afterUnmount",
            "login-route:beforeMount",
            "login:mount",
            "login-route:afterMount",
        ]
    );
}

#[tokio::test]
async fn navigating_to_current_location_is_noop() {
    let (doc, root) = page();
    let log = CallLog::new();
    let routes = Routes::new([Route::app("/", "home").unwrap(), Route::app("/login", "login").unwrap()]).unwrap();
    let history = Arc::new(MemoryHistory::new());
    let config = BootstrapConfig::new(Arc::new(doc.clone()), root, recording_apps(&log, &["home", "login"]))
        .with_routes(routes)
        .with_history(history.clone());
    let shell = assert_ok!(bootstrap(config).await);
    let router = shell.router().unwrap();

    assert_ok!(router.navigate("/login", Default::default()).await);
    assert_ok!(router.navigate("/login", Default::default()).await);
    assert_eq!(history.len(), 2);
    assert_eq!(log.count("mount"), 2);
}

#[tokio::test]
async fn same_app_set_keeps_layout_mounted() {
    let (doc, root) = page();
    let log = CallLog::new();
    let routes = Routes::new([Route::app("/", "home").unwrap(), Route::app("/home", "home").unwrap()]).unwrap();
    let shell = start(&doc, root, recording_apps(&log, &["home"]), routes).await;
    let before = doc.inner_html(root);

    assert_ok!(shell.router().unwrap().navigate("/home", Default::default()).await);
    assert_eq!(shell.router().unwrap().location().path, "/home");
    assert_eq!(log.events(), vec!["home:mount"]);
    assert_eq!(doc.inner_html(root), before);
}

#[tokio::test]
async fn longest_prefix_wins_and_fallback_catches_rest() {
    let (doc, root) = page();
    let routes = Routes::new([
        Route::fallback(Layout::for_app("missing")),
        Route::app("/docs", "docs").unwrap(),
        Route::app("/docs/api", "api").unwrap(),
    ])
    .unwrap();
    let shell = start(&doc, root, text_apps(&["docs", "api", "missing"]), routes).await;
    let router = shell.router().unwrap();
    assert_eq!(router.active_apps().await.into_iter().collect::<Vec<_>>(), vec!["missing"]);

    assert_ok!(router.navigate("/DOCS/api/v2", Default::default()).await);
    assert_eq!(router.active_apps().await.into_iter().collect::<Vec<_>>(), vec!["api"]);

    assert_ok!(router.navigate("/docs/guide", Default::default()).await);
    assert_eq!(router.active_apps().await.into_iter().collect::<Vec<_>>(), vec!["docs"]);

    assert_ok!(router.navigate("/docsify", Default::default()).await);
    assert_eq!(doc.text_content(root), "rendered missing");
}

#[tokio::test]
async fn no_match_leaves_page_alone() {
    let (doc, root) = page();
    let routes = Routes::new([Route::app("/", "home").unwrap()]).unwrap();
    let shell = start(&doc, root, text_apps(&["home"]), routes).await;
    let router = shell.router().unwrap();

    assert_ok!(router.navigate("/nowhere", Default::default()).await);
    assert_eq!(router.location().path, "/nowhere");
    assert_eq!(doc.text_content(root), "rendered home");
}

#[tokio::test]
async fn match_without_layout_clears_page() {
    struct Blackout;

    #[async_trait]
    impl Middleware<RouteContext> for Blackout {
        async fn handle(&self, ctx: &mut RouteContext, next: Next<'_, RouteContext>) -> mosaic::Result<()> {
            if ctx.path == "/blank" {
                ctx.push_match(Match {
                    score: 100,
                    layout: None,
                    props: Props::default(),
                    hooks: Hooks::default(),
                });
            }
            next.run(ctx).await
        }
    }

    let (doc, root) = page();
    let mut routes = Routes::new([Route::app("/", "home").unwrap()]).unwrap();
    assert_ok!(routes.push(Blackout));
    let shell = start(&doc, root, text_apps(&["home"]), routes).await;
    let router = shell.router().unwrap();

    assert_ok!(router.navigate("/blank", Default::default()).await);
    assert_eq!(doc.inner_html(root), "");
    assert!(router.active_apps().await.is_empty());
    assert!(shell.mounted_apps().is_empty());
}

#[tokio::test]
async fn redirect_lands_on_target() {
    let (doc, root) = page();
    let mut routes = Routes::new([Route::app("/", "home").unwrap(), Route::app("/login", "login").unwrap()]).unwrap();
    assert_ok!(routes.push(Redirect::new("/old", "/login").unwrap()));
    let shell = start(&doc, root, text_apps(&["home", "login"]), routes).await;
    let router = shell.router().unwrap();

    assert_ok!(router.navigate("/Old/", Default::default()).await);
    assert_eq!(router.location().path, "/login");
    assert_eq!(doc.text_content(root), "rendered login");
}

#[tokio::test]
async fn failed_mount_is_reported_and_rolled_back() {
    let (doc, root) = page();
    let log = CallLog::new();
    let apps = AppRegistry::new([
        App::new("home", Bootstrap::object(log.recording_app("home"))),
        App::new("navbar", Bootstrap::object(log.recording_app("navbar"))),
        App::new("left", Bootstrap::object(log.failing_app("left"))),
        App::new("right", Bootstrap::object(log.recording_app("right"))),
    ])
    .unwrap();
    let routes = Routes::new([Route::app("/", "home").unwrap(), Route::new("/broken", three_column()).unwrap()]).unwrap();
    let shell = start(&doc, root, apps, routes).await;
    let router = shell.router().unwrap();

    let err = assert_err!(router.navigate("/broken", Default::default()).await);
    assert!(matches!(err, Error::Mount { ref app, .. } if app == "left"));
    assert_eq!(doc.inner_html(root), "");
    assert!(router.active_apps().await.is_empty());
    assert!(shell.mounted_apps().is_empty());
}

#[tokio::test(start_paused = true)]
async fn later_navigation_supersedes_slow_one() {
    let (doc, root) = page();
    let log = CallLog::new();
    let mut routes = Routes::new([
        Route::app("/", "home").unwrap(),
        Route::app("/a", "a").unwrap(),
        Route::app("/b", "b").unwrap(),
    ])
    .unwrap();
    assert_ok!(routes.push(Slow {
        path: "/a",
        delay: Duration::from_millis(50),
    }));
    let shell = start(&doc, root, recording_apps(&log, &["home", "a", "b"]), routes).await;
    let router = shell.router().unwrap();

    let (first, second) = tokio::join!(
        router.navigate("/a", Default::default()),
        router.navigate("/b", Default::default()),
    );
    assert_ok!(first);
    assert_ok!(second);

    assert_eq!(log.count("mount"), 2);
    assert!(!log.events().contains(&"a:mount".to_string()));
    assert_eq!(router.active_apps().await.into_iter().collect::<Vec<_>>(), vec!["b"]);
    assert_eq!(doc.text_content(root), "b");
}

#[tokio::test]
async fn retry_after_failed_mount_commits() {
    let (doc, root) = page();
    let apps = AppRegistry::new([
        App::new("home", Bootstrap::object(TextApp::new("rendered home"))),
        App::new("flaky", Bootstrap::object(FlakyOnce::new("rendered flaky"))),
    ])
    .unwrap();
    let routes = Routes::new([Route::app("/", "home").unwrap(), Route::app("/flaky", "flaky").unwrap()]).unwrap();
    let history = Arc::new(MemoryHistory::new());
    let config = BootstrapConfig::new(Arc::new(doc.clone()), root, apps)
        .with_routes(routes)
        .with_history(history.clone());
    let shell = assert_ok!(bootstrap(config).await);
    let router = shell.router().unwrap();

    let err = assert_err!(router.navigate("/flaky", Default::default()).await);
    assert!(matches!(err, Error::Mount { ref app, .. } if app == "flaky"));
    assert_eq!(doc.inner_html(root), "");

    assert_ok!(router.navigate("/flaky", Default::default()).await);
    assert_eq!(doc.text_content(root), "rendered flaky");
    assert_eq!(router.active_apps().await.into_iter().collect::<Vec<_>>(), vec!["flaky"]);
    // The retry reuses the entry pushed by the failed attempt.
    assert_eq!(history.len(), 2);
}

#[tokio::test]
async fn app_can_navigate_while_mounting() {
    let (doc, root) = page();
    let apps = AppRegistry::new([
        App::new("home", Bootstrap::object(TextApp::new("rendered home"))),
        App::new("private", Bootstrap::object(Guard)),
        App::new("login", Bootstrap::object(TextApp::new("rendered login"))),
    ])
    .unwrap();
    let routes = Routes::new([
        Route::app("/", "home").unwrap(),
        Route::app("/private", "private").unwrap(),
        Route::app("/login", "login").unwrap(),
    ])
    .unwrap();
    let shell = start(&doc, root, apps, routes).await;
    let router = shell.router().unwrap();

    let navigated = tokio::time::timeout(
        Duration::from_secs(2),
        router.navigate("/private", Default::default()),
    )
    .await;
    assert_ok!(assert_ok!(navigated));

    let page_text = doc.clone();
    settle(move || page_text.text_content(root) == "rendered login").await;
    assert_eq!(router.location().path, "/login");

    // The commit lock was released.
    assert_ok!(router.navigate("/", Default::default()).await);
    assert_eq!(doc.text_content(root), "rendered home");
}

#[tokio::test]
async fn redirect_cycle_is_cut_off() {
    let (doc, root) = page();
    let mut routes = Routes::new([Route::app("/", "home").unwrap()]).unwrap();
    assert_ok!(routes.push(Redirect::new("/a", "/b").unwrap()));
    assert_ok!(routes.push(Redirect::new("/b", "/a").unwrap()));
    let shell = start(&doc, root, text_apps(&["home"]), routes).await;
    let router = shell.router().unwrap();

    let err = assert_err!(router.navigate("/a", Default::default()).await);
    assert!(matches!(err, Error::RedirectLoop { .. }), "{err}");
    assert_eq!(doc.text_content(root), "rendered home");
}

#[tokio::test]
async fn back_and_forward_replay_layouts() {
    let (doc, root) = page();
    let routes = Routes::new([Route::app("/", "home").unwrap(), Route::app("/login", "login").unwrap()]).unwrap();
    let shell = start(&doc, root, text_apps(&["home", "login"]), routes).await;
    let router = shell.router().unwrap();

    assert_ok!(router.navigate("/login", Default::default()).await);
    assert_ok!(router.back().await);
    assert_eq!(router.location().path, "/");
    assert_eq!(doc.text_content(root), "rendered home");

    assert_ok!(router.forward().await);
    assert_eq!(doc.text_content(root), "rendered login");

    // Nothing further ahead.
    assert_ok!(router.forward().await);
    assert_eq!(router.location().path, "/login");
}

#[tokio::test(start_paused = true)]
async fn back_waits_for_its_own_route_change() {
    let (doc, root) = page();
    let mut routes = Routes::new([Route::app("/", "home").unwrap(), Route::app("/login", "login").unwrap()]).unwrap();
    assert_ok!(routes.push(Slow {
        path: "/",
        delay: Duration::from_millis(50),
    }));
    let shell = start(&doc, root, text_apps(&["home", "login"]), routes).await;
    let router = shell.router().unwrap();
    assert_ok!(router.navigate("/login", Default::default()).await);

    // A change for the current entry is already in flight and settles
    // first, superseded by the slow one going back.
    let (restarted, (back, text)) = tokio::join!(router.start(), async {
        let back = router.back().await;
        (back, doc.text_content(root))
    });
    assert_ok!(restarted);
    assert_ok!(back);
    assert_eq!(text, "rendered home");
    assert_eq!(router.location().path, "/");
}

#[tokio::test]
async fn base_path_is_added_and_stripped() {
    for base in ["/base", "/base/"] {
        let (doc, root) = page();
        let history = Arc::new(MemoryHistory::starting_at("/base"));
        let routes = Routes::new([Route::app("/", "home").unwrap(), Route::app("/login", "login").unwrap()]).unwrap();
        let config = BootstrapConfig::new(Arc::new(doc.clone()), root, text_apps(&["home", "login"]))
            .with_routes(routes)
            .with_history(history.clone())
            .with_options(ShellOptions::new().with_base_path(base));
        let shell = assert_ok!(bootstrap(config).await);
        let router = shell.router().unwrap();
        assert_eq!(doc.text_content(root), "rendered home", "{base}");

        assert_ok!(router.navigate("/login", Default::default()).await);
        assert_eq!(history.location().path, "/base/login");
        assert_eq!(doc.text_content(root), "rendered login");

        assert_ok!(router.navigate("/", Default::default()).await);
        assert_eq!(history.location().path, "/base", "{base}");
        assert_eq!(doc.text_content(root), "rendered home");
    }
}

#[tokio::test]
async fn link_clicks_navigate_in_place() {
    let (doc, root) = page();
    let apps = AppRegistry::new([
        App::new("home", Bootstrap::object(LinkApp { href: "/login?from=home" })),
        App::new("login", Bootstrap::object(TextApp::new("rendered login"))),
    ])
    .unwrap();
    let routes = Routes::new([Route::app("/", "home").unwrap(), Route::app("/login", "login").unwrap()]).unwrap();
    let shell = start(&doc, root, apps, routes).await;
    let router = shell.router().unwrap().clone();

    let anchor = doc.query_selector(root, "a").unwrap().unwrap();
    assert!(doc.click(anchor));
    let page_text = doc.clone();
    settle(move || page_text.text_content(root) == "rendered login").await;
    assert_eq!(router.location().to_string(), "/login?from=home");
}

#[tokio::test]
async fn manual_start_defers_initial_mount() {
    let (doc, root) = page();
    let routes = Routes::new([Route::app("/", "home").unwrap()]).unwrap();
    let config = BootstrapConfig::new(Arc::new(doc.clone()), root, text_apps(&["home"]))
        .with_routes(routes)
        .with_options(ShellOptions::new().with_manually_start_router(true));
    let shell = assert_ok!(bootstrap(config).await);
    assert_eq!(doc.inner_html(root), "");

    assert_ok!(shell.start_router().await);
    assert_eq!(doc.text_content(root), "rendered home");
}

// ---------------------------------------------------------------------------
// Messaging
// ---------------------------------------------------------------------------

#[tokio::test]
async fn shell_and_apps_share_the_bus() {
    let (doc, root) = page();
    let apps = AppRegistry::new([App::new("greeter", Bootstrap::object(Greeter))]).unwrap();
    let routes = Routes::new([Route::app("/", "greeter").unwrap()]).unwrap();
    let config = BootstrapConfig::new(Arc::new(doc.clone()), root, apps)
        .with_routes(routes)
        .with_options(ShellOptions::new().with_manually_start_router(true));
    let shell = assert_ok!(bootstrap(config).await);

    let seen: Arc<Mutex<Vec<Envelope>>> = Arc::default();
    let sink = seen.clone();
    let sub = shell.subscribe(move |envelope: &Envelope| {
        sink.lock().push(envelope.clone());
        Ok(())
    });

    assert_ok!(shell.start_router().await);
    let inbox = seen.clone();
    settle(move || inbox.lock().len() == 1).await;
    assert_eq!(seen.lock()[0].sender, "greeter");
    assert_eq!(seen.lock()[0].message, json!({"hello": "greeter"}));

    shell.dispatch(json!("ping"));
    let inbox = seen.clone();
    settle(move || inbox.lock().len() == 2).await;
    assert!(seen.lock()[1].is_from("shell"));

    sub.unsubscribe();
    shell.dispatch(json!("unheard"));
    tokio::task::yield_now().await;
    assert_eq!(seen.lock().len(), 2);
}

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl io::Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Capture {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

fn captured<F: FnOnce()>(f: F) -> String {
    let capture = Capture::default();
    let writer = capture.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    capture.text()
}

#[test]
fn leak_warning_fires_past_threshold() {
    let bus = EventBus::new(true, false);
    let output = captured(|| {
        for _ in 0..LEAK_THRESHOLD {
            let _ = bus.subscribe("nav", |_| Ok(()));
        }
    });
    assert!(!output.contains("possible memory leak"));

    let output = captured(|| {
        let _ = bus.subscribe("nav", |_| Ok(()));
    });
    assert!(output.contains("possible memory leak"), "{output}");
    assert!(output.contains("nav"));
    assert!(bus.leak_suspected("nav"));
}

#[test]
fn leak_warning_can_be_disabled() {
    let bus = EventBus::new(false, false);
    let output = captured(|| {
        for _ in 0..=LEAK_THRESHOLD {
            let _ = bus.subscribe("nav", |_| Ok(()));
        }
    });
    assert_eq!(output, "");
}
