//! The container capability and its in-memory implementation.
//!
//! The core never touches a concrete page. Everything it needs from the host
//! (attaching templates, finding slots, rebinding links) goes through the
//! [`Document`] trait over opaque [`NodeId`] handles. [`MemoryDocument`] backs
//! the trait with the slotmap [`Dom`] and is what tests and headless hosts use.

use std::sync::Arc;

use parking_lot::Mutex;
use slotmap::SecondaryMap;

use super::element::{Child, Element};
use super::node::{NodeData, NodeId};
use super::selector::SelectorList;
use super::tree::Dom;
use crate::error::{Error, Result};

/// Callback receiving the `href` of an intercepted link click.
pub type LinkHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// Host page operations used by layouts, apps and the router.
pub trait Document: Send + Sync {
    /// Create a detached subtree from a markup description; returns its root.
    fn instantiate(&self, element: &Element) -> NodeId;

    /// Attach `child` (with its subtree) as the last child of `parent`.
    fn append_child(&self, parent: NodeId, child: NodeId) -> Result<()>;

    /// Detach `child` from `parent`. The subtree stays alive until discarded.
    fn remove_child(&self, parent: NodeId, child: NodeId) -> Result<()>;

    /// Free a subtree. No-op for unknown nodes.
    fn discard(&self, node: NodeId);

    /// Whether `node` is alive.
    fn contains(&self, node: NodeId) -> bool;

    /// Whether `node` itself is matched by `selector`.
    fn matches(&self, node: NodeId, selector: &str) -> Result<bool>;

    /// First descendant of `scope` matched by `selector`.
    fn query_selector(&self, scope: NodeId, selector: &str) -> Result<Option<NodeId>>;

    /// `scope` itself or its first descendant whose `id` is exactly `id`.
    fn find_by_id(&self, scope: NodeId, id: &str) -> Result<Option<NodeId>>;

    /// Route clicks on every `a[href]` inside `scope` through `handler`
    /// instead of a full page load. Returns how many links were bound.
    fn intercept_links(&self, scope: NodeId, handler: LinkHandler) -> usize;
}

struct DocumentState {
    dom: Dom,
    links: SecondaryMap<NodeId, LinkHandler>,
}

/// In-memory [`Document`] over a slotmap arena. Cheap to clone (shared).
#[derive(Clone)]
pub struct MemoryDocument {
    inner: Arc<Mutex<DocumentState>>,
}

impl MemoryDocument {
    /// Create an empty document.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(DocumentState {
                dom: Dom::new(),
                links: SecondaryMap::new(),
            })),
        }
    }

    /// Create a free-standing element to serve as a page container.
    pub fn create_root(&self, element: &Element) -> NodeId {
        self.instantiate(element)
    }

    /// Read access to the underlying tree.
    pub fn with_dom<R>(&self, f: impl FnOnce(&Dom) -> R) -> R {
        f(&self.inner.lock().dom)
    }

    /// Serialized children of `node`.
    pub fn inner_html(&self, node: NodeId) -> String {
        self.inner.lock().dom.inner_html(node)
    }

    /// Serialized `node` including itself.
    pub fn outer_html(&self, node: NodeId) -> String {
        self.inner.lock().dom.outer_html(node)
    }

    /// Concatenated text under `node`.
    pub fn text_content(&self, node: NodeId) -> String {
        self.inner.lock().dom.text_content(node)
    }

    /// Number of live nodes, attached or detached.
    pub fn node_count(&self) -> usize {
        self.inner.lock().dom.len()
    }

    /// Simulate a click on `node`.
    ///
    /// Returns `true` if the click was intercepted by a bound link handler.
    pub fn click(&self, node: NodeId) -> bool {
        let (handler, href) = {
            let state = self.inner.lock();
            let Some(href) = state.dom.get(node).and_then(|d| d.attr("href")) else {
                return false;
            };
            match state.links.get(node) {
                Some(handler) => (handler.clone(), href),
                None => return false,
            }
        };
        handler(&href);
        true
    }

    fn build(dom: &mut Dom, parent: Option<NodeId>, element: &Element) -> NodeId {
        let id = dom.insert(element.node_data());
        if let Some(parent) = parent {
            dom.append(parent, id);
        }
        for child in element.child_nodes() {
            match child {
                Child::Element(el) => {
                    Self::build(dom, Some(id), el);
                }
                Child::Text(text) => {
                    let text = dom.insert(NodeData::text(text.as_str()));
                    dom.append(id, text);
                }
            }
        }
        id
    }
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDocument")
            .field("nodes", &self.node_count())
            .finish()
    }
}

impl Document for MemoryDocument {
    fn instantiate(&self, element: &Element) -> NodeId {
        Self::build(&mut self.inner.lock().dom, None, element)
    }

    fn append_child(&self, parent: NodeId, child: NodeId) -> Result<()> {
        let mut state = self.inner.lock();
        for node in [parent, child] {
            if !state.dom.contains(node) {
                return Err(Error::NodeNotFound(node));
            }
        }
        if state.dom.append(parent, child) {
            Ok(())
        } else {
            Err(Error::HierarchyRequest { parent, child })
        }
    }

    fn remove_child(&self, parent: NodeId, child: NodeId) -> Result<()> {
        let mut state = self.inner.lock();
        if state.dom.parent(child) != Some(parent) {
            return Err(Error::NotAChild { parent, child });
        }
        state.dom.detach(child);
        Ok(())
    }

    fn discard(&self, node: NodeId) {
        let mut state = self.inner.lock();
        let doomed = state.dom.walk_depth_first(node);
        for id in doomed {
            state.links.remove(id);
        }
        state.dom.remove(node);
    }

    fn contains(&self, node: NodeId) -> bool {
        self.inner.lock().dom.contains(node)
    }

    fn matches(&self, node: NodeId, selector: &str) -> Result<bool> {
        let selector = SelectorList::parse(selector)?;
        let state = self.inner.lock();
        if !state.dom.contains(node) {
            return Err(Error::NodeNotFound(node));
        }
        Ok(selector.matches(&state.dom, node))
    }

    fn query_selector(&self, scope: NodeId, selector: &str) -> Result<Option<NodeId>> {
        let selector = SelectorList::parse(selector)?;
        let state = self.inner.lock();
        if !state.dom.contains(scope) {
            return Err(Error::NodeNotFound(scope));
        }
        Ok(state.dom.query_selector(scope, &selector))
    }

    fn find_by_id(&self, scope: NodeId, id: &str) -> Result<Option<NodeId>> {
        let state = self.inner.lock();
        let data = state.dom.get(scope).ok_or(Error::NodeNotFound(scope))?;
        if data.id.as_deref() == Some(id) {
            return Ok(Some(scope));
        }
        Ok(state.dom.query_by_id(scope, id))
    }

    fn intercept_links(&self, scope: NodeId, handler: LinkHandler) -> usize {
        let mut state = self.inner.lock();
        let anchors: Vec<NodeId> = state
            .dom
            .walk_depth_first(scope)
            .into_iter()
            .filter(|&id| {
                state
                    .dom
                    .get(id)
                    .is_some_and(|d| d.tag() == Some("a") && d.attr("href").is_some())
            })
            .collect();
        for &anchor in &anchors {
            state.links.insert(anchor, handler.clone());
        }
        anchors.len()
    }
}
