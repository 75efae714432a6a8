//! Layouts: a template with apps anchored to slots inside it.
//!
//! A [`Layout`] is a description. Each mount instantiates a fresh copy of the
//! template and yields a [`MountedLayout`], which owns that copy and the
//! mounted apps until it is unmounted. Nothing is pooled between navigations.

pub mod ready;

pub use ready::{ready_gate, ReadyGate, ReadySignal};

use std::collections::BTreeSet;
use std::sync::Arc;

use futures::future::join_all;
use serde_json::Value;

use crate::app::{App, MountEnv};
use crate::dom::{Element, NodeId};
use crate::error::{Error, Result};

/// Attribute set on wrappers generated for single-app routes.
pub const AUTO_GENERATED_ATTR: &str = "data-mosaic";
pub const AUTO_GENERATED_VALUE: &str = "layout-auto-generated";

/// A template plus the app mounted into each of its slots.
#[derive(Debug, Clone)]
pub struct Layout {
    template: Element,
    slots: Vec<(String, String)>,
}

impl Layout {
    pub fn new(template: Element) -> Self {
        Self {
            template,
            slots: Vec::new(),
        }
    }

    /// Mount `app` into the element whose id is `key`.
    pub fn slot(mut self, key: impl Into<String>, app: impl Into<String>) -> Self {
        let key = key.into();
        let app = app.into();
        match self.slots.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = app,
            None => self.slots.push((key, app)),
        }
        self
    }

    /// Layout with a single generated `div` wrapping `app`.
    pub fn for_app(app: impl Into<String>) -> Self {
        let app = app.into();
        let wrapper = Element::new("div")
            .id(app.clone())
            .attr(AUTO_GENERATED_ATTR, AUTO_GENERATED_VALUE);
        Self::new(wrapper).slot(app.clone(), app)
    }

    pub fn template(&self) -> &Element {
        &self.template
    }

    /// `(slot key, app name)` pairs in declaration order.
    pub fn slots(&self) -> &[(String, String)] {
        &self.slots
    }

    /// Names of the apps this layout mounts.
    pub fn app_names(&self) -> BTreeSet<String> {
        self.slots.iter().map(|(_, app)| app.clone()).collect()
    }

    /// Whether this is a generated single-app wrapper.
    pub fn is_auto_generated(&self) -> bool {
        self.template.attribute(AUTO_GENERATED_ATTR) == Some(AUTO_GENERATED_VALUE)
    }

    /// Attach a fresh template under `container` and mount every app.
    ///
    /// Slots and apps are resolved before any app mounts; a missing one
    /// aborts the whole mount. Apps mount concurrently and share a ready gate
    /// that opens once all of them succeeded. On failure, apps that did mount
    /// are unmounted again and the template is removed.
    pub async fn mount(&self, env: &MountEnv, container: NodeId, props: Value) -> Result<MountedLayout> {
        let document = env.document.clone();
        let root = document.instantiate(&self.template);
        if let Err(e) = document.append_child(container, root) {
            document.discard(root);
            return Err(e);
        }

        let placed = match self.resolve_slots(env, root) {
            Ok(placed) => placed,
            Err(e) => {
                detach(env, container, root);
                return Err(e);
            }
        };

        let (signal, gate) = ready_gate();
        let results = join_all(
            placed
                .iter()
                .map(|(app, slot)| app.mount(env, Some(*slot), props.clone(), gate.clone())),
        )
        .await;

        let mut failure = None;
        let mut mounted = Vec::new();
        for ((app, _), result) in placed.iter().zip(results) {
            match result {
                Ok(_) => mounted.push(app.clone()),
                Err(e) if failure.is_none() => failure = Some(e),
                Err(e) => tracing::warn!(target: "mosaic::layout", error = %e, "sibling mount failed"),
            }
        }
        if let Some(error) = failure {
            drop(signal);
            for outcome in join_all(mounted.iter().map(|app| app.unmount(env))).await {
                if let Err(e) = outcome {
                    tracing::warn!(target: "mosaic::layout", error = %e, "cleanup after failed mount");
                }
            }
            detach(env, container, root);
            return Err(error);
        }

        signal.open();
        if env.debug {
            tracing::debug!(target: "mosaic::layout", apps = placed.len(), "layout mounted");
        }
        Ok(MountedLayout {
            container,
            root,
            apps: placed.into_iter().map(|(app, _)| app).collect(),
            ready: gate,
        })
    }

    fn resolve_slots(&self, env: &MountEnv, root: NodeId) -> Result<Vec<(Arc<App>, NodeId)>> {
        let mut placed = Vec::with_capacity(self.slots.len());
        for (key, name) in &self.slots {
            let app = env
                .registry
                .get(name)
                .ok_or_else(|| Error::AppNotFound(name.clone()))?;
            let slot = env
                .document
                .find_by_id(root, key)?
                .ok_or_else(|| Error::SlotNotFound { slot: key.clone() })?;
            placed.push((app, slot));
        }
        Ok(placed)
    }
}

fn detach(env: &MountEnv, container: NodeId, root: NodeId) {
    if let Err(e) = env.document.remove_child(container, root) {
        tracing::warn!(target: "mosaic::layout", error = %e, "template already detached");
    }
    env.document.discard(root);
}

/// A layout instance attached to the page.
#[derive(Debug)]
pub struct MountedLayout {
    container: NodeId,
    root: NodeId,
    apps: Vec<Arc<App>>,
    ready: ReadyGate,
}

impl MountedLayout {
    /// Root of the instantiated template.
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    pub fn app_names(&self) -> BTreeSet<String> {
        self.apps.iter().map(|a| a.name().to_owned()).collect()
    }

    pub fn ready(&self) -> &ReadyGate {
        &self.ready
    }

    /// Unmount every app concurrently, then remove the template.
    ///
    /// The template is detached only after every unmount has finished,
    /// successful or not. All failures are reported together.
    pub async fn unmount(self, env: &MountEnv) -> Result<()> {
        let results = join_all(self.apps.iter().map(|app| app.unmount(env))).await;
        let failures: Vec<Error> = results.into_iter().filter_map(Result::err).collect();
        detach(env, self.container, self.root);
        if env.debug {
            tracing::debug!(target: "mosaic::layout", apps = self.apps.len(), failed = failures.len(), "layout unmounted");
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::LayoutUnmount(failures))
        }
    }
}
