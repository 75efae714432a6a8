//! Node types: NodeId, NodeKind, NodeData.

use std::collections::BTreeMap;

use slotmap::new_key_type;

new_key_type! {
    /// Opaque handle to a node of the host page. Copy, lightweight (u64).
    pub struct NodeId;
}

/// What a node is: an element with a tag name, or a run of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// An element such as `div` or `a`.
    Element(String),
    /// A text node.
    Text(String),
}

/// Data associated with a single node.
#[derive(Debug, Clone)]
pub struct NodeData {
    /// Element tag or text payload.
    pub kind: NodeKind,
    /// Optional unique id (`#id` selector).
    pub id: Option<String>,
    /// CSS classes (`.class` selector), in insertion order.
    pub classes: Vec<String>,
    /// Remaining attributes, sorted by name for stable serialization.
    pub attributes: BTreeMap<String, String>,
}

impl NodeData {
    /// Create element data with the given tag name.
    pub fn element(tag: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Element(tag.into().to_ascii_lowercase()),
            id: None,
            classes: Vec::new(),
            attributes: BTreeMap::new(),
        }
    }

    /// Create a text node.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Text(text.into()),
            id: None,
            classes: Vec::new(),
            attributes: BTreeMap::new(),
        }
    }

    /// Set the id (builder).
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Add a single CSS class (builder).
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        let class = class.into();
        if !self.classes.contains(&class) {
            self.classes.push(class);
        }
        self
    }

    /// Set an attribute (builder).
    ///
    /// `id` and `class` are routed to their dedicated fields.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(&name.into(), value.into());
        self
    }

    /// The tag name, or `None` for text nodes.
    pub fn tag(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Element(tag) => Some(tag),
            NodeKind::Text(_) => None,
        }
    }

    /// Whether this is an element node.
    pub fn is_element(&self) -> bool {
        matches!(self.kind, NodeKind::Element(_))
    }

    /// Check whether this node has a given CSS class.
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Add a CSS class. No-op if already present.
    pub fn add_class(&mut self, class: &str) {
        if !self.has_class(class) {
            self.classes.push(class.to_owned());
        }
    }

    /// Read an attribute. `id` and `class` are synthesized from their fields.
    pub fn attr(&self, name: &str) -> Option<String> {
        match name {
            "id" => self.id.clone(),
            "class" if !self.classes.is_empty() => Some(self.classes.join(" ")),
            "class" => None,
            _ => self.attributes.get(name).cloned(),
        }
    }

    /// Write an attribute. `class` replaces the whole class list.
    pub fn set_attr(&mut self, name: &str, value: String) {
        match name {
            "id" => self.id = Some(value),
            "class" => {
                self.classes.clear();
                for class in value.split_whitespace() {
                    self.add_class(class);
                }
            }
            _ => {
                self.attributes.insert(name.to_owned(), value);
            }
        }
    }
}
