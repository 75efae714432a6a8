//! `Element`: a detached markup description instantiated into a document.
//!
//! Layout templates and rendered app output are both described as `Element`
//! trees. Instantiating one creates fresh nodes every time, so a template can
//! be mounted, torn down and mounted again without sharing node state.

use super::node::NodeData;

/// A child of an [`Element`]: another element or a text run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Child {
    Element(Element),
    Text(String),
}

/// Markup description of an element and its subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    tag: String,
    attributes: Vec<(String, String)>,
    children: Vec<Child>,
}

impl Element {
    /// Start describing an element with the given tag.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Set the `id` attribute (builder).
    pub fn id(self, id: impl Into<String>) -> Self {
        self.attr("id", id)
    }

    /// Add a class (builder). Repeated calls accumulate.
    pub fn class(mut self, class: impl Into<String>) -> Self {
        let class = class.into();
        match self.attributes.iter_mut().find(|(name, _)| name == "class") {
            Some((_, existing)) => {
                existing.push(' ');
                existing.push_str(&class);
            }
            None => self.attributes.push(("class".into(), class)),
        }
        self
    }

    /// Set an arbitrary attribute (builder). Later values win.
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((name, value)),
        }
        self
    }

    /// Append a child element (builder).
    pub fn child(mut self, child: Element) -> Self {
        self.children.push(Child::Element(child));
        self
    }

    /// Append several child elements (builder).
    pub fn children(mut self, children: impl IntoIterator<Item = Element>) -> Self {
        self.children
            .extend(children.into_iter().map(Child::Element));
        self
    }

    /// Append a text run (builder).
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Child::Text(text.into()));
        self
    }

    /// The tag name as written.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Value of an attribute, including `id` and `class`.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Direct children.
    pub fn child_nodes(&self) -> &[Child] {
        &self.children
    }

    /// Node data for this element alone (children excluded).
    pub(crate) fn node_data(&self) -> NodeData {
        self.attributes
            .iter()
            .fold(NodeData::element(&self.tag), |data, (name, value)| {
                data.with_attr(name.as_str(), value.as_str())
            })
    }
}
