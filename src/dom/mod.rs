//! Host page model: slotmap node arena, selectors, templates, and the
//! container capability the core drives.

pub mod document;
pub mod element;
pub mod html;
pub mod node;
pub mod query;
pub mod selector;
pub mod tree;

pub use document::{Document, LinkHandler, MemoryDocument};
pub use element::{Child, Element};
pub use node::{NodeData, NodeId, NodeKind};
pub use selector::{SelectorError, SelectorList};
pub use tree::Dom;
