//! Document Nodes
//!
//! Nodes live in an arena owned by the [`Document`](super::Document) and are
//! addressed by [`NodeId`]. A node removed from the tree stays in the arena
//! (detached) so handles held elsewhere never dangle.

use indexmap::IndexMap;

use super::event::Listener;
use crate::value::Value;

/// Handle to a node in a document arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Get the raw arena index.
    pub fn raw(&self) -> usize {
        self.0
    }
}

/// Elements that never have children or a closing tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// What a node is.
pub enum NodeData {
    Document,
    Element(ElementData),
    Text(String),
    Comment(String),
}

/// Element state: markup attributes plus the live property bag and the
/// listeners attached to it.
pub struct ElementData {
    pub(crate) tag: String,
    pub(crate) attrs: IndexMap<String, String>,
    pub(crate) props: IndexMap<String, Value>,
    pub(crate) listeners: Vec<Listener>,
}

impl ElementData {
    pub(crate) fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: IndexMap::new(),
            props: IndexMap::new(),
            listeners: Vec::new(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attrs(&self) -> &IndexMap<String, String> {
        &self.attrs
    }
}

/// A slot in the document arena.
pub struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) data: NodeData,
}

impl Node {
    pub(crate) fn new(data: NodeData) -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            data,
        }
    }

    pub fn data(&self) -> &NodeData {
        &self.data
    }

    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    pub(crate) fn as_element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }
}

/// Convert a `data-*` attribute suffix to its dataset key
/// (`user-id` becomes `userId`).
pub fn dataset_key(suffix: &str) -> String {
    let mut key = String::with_capacity(suffix.len());
    let mut upper = false;
    for ch in suffix.chars() {
        if ch == '-' {
            upper = true;
        } else if upper {
            key.extend(ch.to_uppercase());
            upper = false;
        } else {
            key.push(ch);
        }
    }
    key
}

/// Convert a dataset key back to its attribute suffix (`userId` becomes
/// `user-id`).
pub fn dataset_attr(key: &str) -> String {
    let mut attr = String::with_capacity(key.len() + 2);
    for ch in key.chars() {
        if ch.is_ascii_uppercase() {
            attr.push('-');
            attr.push(ch.to_ascii_lowercase());
        } else {
            attr.push(ch);
        }
    }
    attr
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataset_names_round_trip() {
        assert_eq!(dataset_key("user-id"), "userId");
        assert_eq!(dataset_attr("userId"), "user-id");
        assert_eq!(dataset_key("page"), "page");
    }
}
