//! DOM queries scoped to a subtree: by id, by selector, by predicate.

use super::node::{NodeData, NodeId};
use super::selector::SelectorList;
use super::tree::Dom;

impl Dom {
    /// First descendant of `scope` whose `id` matches.
    pub fn query_by_id(&self, scope: NodeId, id: &str) -> Option<NodeId> {
        self.descendants(scope)
            .into_iter()
            .find(|&node| self.get(node).is_some_and(|d| d.id.as_deref() == Some(id)))
    }

    /// First descendant of `scope`, in document order, matched by `selector`.
    ///
    /// Like the browser's `Element.querySelector`, `scope` itself is never
    /// returned but combinators may look above it.
    pub fn query_selector(&self, scope: NodeId, selector: &SelectorList) -> Option<NodeId> {
        self.descendants(scope)
            .into_iter()
            .find(|&node| selector.matches(self, node))
    }

    /// All descendants of `scope` matched by `selector`, in document order.
    pub fn query_selector_all(&self, scope: NodeId, selector: &SelectorList) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|&node| selector.matches(self, node))
            .collect()
    }

    /// All descendants of `scope` satisfying an arbitrary predicate.
    pub fn query_all(&self, scope: NodeId, predicate: impl Fn(&NodeData) -> bool) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|&node| self.get(node).is_some_and(&predicate))
            .collect()
    }
}
