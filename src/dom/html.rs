//! HTML serialization of subtrees, for hosts and assertions.
//!
//! Attributes are written as `id`, then `class`, then the rest sorted by name,
//! so output is stable regardless of how nodes were built.

use std::fmt::Write;

use super::node::{NodeId, NodeKind};
use super::tree::Dom;

impl Dom {
    /// Serialize `node` and its subtree. Empty for a missing node.
    pub fn outer_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_node(&mut out, node);
        out
    }

    /// Serialize the children of `node`.
    pub fn inner_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        for &child in self.children(node) {
            self.write_node(&mut out, child);
        }
        out
    }

    /// Concatenated text of every text node under `node`.
    pub fn text_content(&self, node: NodeId) -> String {
        self.walk_depth_first(node)
            .into_iter()
            .filter_map(|id| match &self.get(id)?.kind {
                NodeKind::Text(text) => Some(text.as_str()),
                NodeKind::Element(_) => None,
            })
            .collect()
    }

    fn write_node(&self, out: &mut String, node: NodeId) {
        let Some(data) = self.get(node) else {
            return;
        };
        match &data.kind {
            NodeKind::Text(text) => out.push_str(&escape(text, false)),
            NodeKind::Element(tag) => {
                let _ = write!(out, "<{tag}");
                if let Some(id) = &data.id {
                    let _ = write!(out, " id=\"{}\"", escape(id, true));
                }
                if !data.classes.is_empty() {
                    let _ = write!(out, " class=\"{}\"", escape(&data.classes.join(" "), true));
                }
                for (name, value) in &data.attributes {
                    let _ = write!(out, " {name}=\"{}\"", escape(value, true));
                }
                out.push('>');
                for &child in self.children(node) {
                    self.write_node(out, child);
                }
                let _ = write!(out, "</{tag}>");
            }
        }
    }
}

fn escape(text: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use crate::dom::node::NodeData;
    use crate::dom::tree::Dom;

    #[test]
    fn attribute_order_is_stable() {
        let mut dom = Dom::new();
        let div = dom.insert(
            NodeData::element("div")
                .with_attr("data-z", "1")
                .with_class("row")
                .with_attr("aria-label", "x")
                .with_id("main"),
        );
        assert_eq!(
            dom.outer_html(div),
            r#"<div id="main" class="row" aria-label="x" data-z="1"></div>"#
        );
    }

    #[test]
    fn inner_html_and_text() {
        let mut dom = Dom::new();
        let root = dom.insert(NodeData::element("div"));
        let p = dom.insert_child(root, NodeData::element("p")).unwrap();
        dom.insert_child(p, NodeData::text("a < b & c")).unwrap();
        assert_eq!(dom.inner_html(root), "<p>a &lt; b &amp; c</p>");
        assert_eq!(dom.text_content(root), "a < b & c");
    }

    #[test]
    fn attribute_quotes_escaped() {
        let mut dom = Dom::new();
        let a = dom.insert(NodeData::element("a").with_attr("title", "say \"hi\""));
        assert_eq!(dom.outer_html(a), r#"<a title="say &quot;hi&quot;"></a>"#);
    }
}
