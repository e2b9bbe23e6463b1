//! Document Arena
//!
//! The [`Document`] owns every node and implements the tree operations the
//! runtime needs: insertion, replacement, attribute and property access,
//! class and inline-style helpers, and HTML serialization.
//!
//! Node ids are never reused. A detached subtree can be freed with
//! [`Document::release`]; handles to freed nodes stay safe to hold, reads
//! through them find nothing and writes through them do nothing.

use std::collections::HashMap;

use indexmap::IndexMap;

use super::event::{EventTarget, Handler, Listener, ListenerId};
use super::node::{dataset_attr, dataset_key, is_void_element, ElementData, Node, NodeData, NodeId};
use super::parse::parse_fragment;
use crate::value::Value;

/// Where [`Document::insert_adjacent`] puts new nodes relative to a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjacentPosition {
    /// Before the target, as a sibling.
    BeforeBegin,
    /// Inside the target, before its first child.
    AfterBegin,
    /// Inside the target, after its last child.
    BeforeEnd,
    /// After the target, as a sibling.
    AfterEnd,
}

/// A live document.
pub struct Document {
    nodes: HashMap<NodeId, Node>,
    next_id: usize,
    root: NodeId,
    body: NodeId,
    window_listeners: Vec<Listener>,
}

impl Document {
    /// Create an empty document with a `<body>`.
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: HashMap::new(),
            next_id: 0,
            root: NodeId(0),
            body: NodeId(0),
            window_listeners: Vec::new(),
        };
        doc.root = doc.push(NodeData::Document);
        let body = doc.create_element("body");
        doc.append_child(doc.root, body);
        doc.body = body;
        doc
    }

    /// Create a document whose body holds the given markup.
    pub fn from_body_html(html: &str) -> Self {
        let mut doc = Self::new();
        for node in parse_fragment(&mut doc, html) {
            doc.append_child(doc.body, node);
        }
        doc
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    // ------------------------------------------------------------------
    // Node creation and structure
    // ------------------------------------------------------------------

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, Node::new(data));
        id
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeData::Element(ElementData::new(tag)))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_string()))
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Comment(text.to_string()))
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Whether `id` names a live (not released) node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Number of live nodes, attached or not.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.nodes.get(&id).and_then(Node::as_element)
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        self.nodes.get_mut(&id).and_then(Node::as_element_mut)
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(ElementData::tag)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(|node| node.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(&id)
            .map_or(&[][..], |node| node.children.as_slice())
    }

    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|&child| self.is_element(child))
            .collect()
    }

    /// Whether the node is attached to the document tree.
    pub fn is_connected(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == self.root {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Every node in the subtree rooted at `id`, in document order,
    /// including `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev());
        }
        out
    }

    /// Every element in the subtree rooted at `id`, in document order.
    pub fn elements_in(&self, id: NodeId) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|&node| self.is_element(node))
            .collect()
    }

    /// First connected element whose `id` attribute equals `id`.
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|&node| self.attr(node, "id") == Some(id))
    }

    /// Nearest inclusive ancestor element carrying `attr`.
    pub fn closest_with_attr(&self, id: NodeId, attr: &str) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(node) = current {
            if self.has_attr(node, attr) {
                return Some(node);
            }
            current = self.parent(node);
        }
        None
    }

    fn detach(&mut self, id: NodeId) {
        let parent = self.nodes.get_mut(&id).and_then(|node| node.parent.take());
        if let Some(parent) = parent.and_then(|parent| self.nodes.get_mut(&parent)) {
            parent.children.retain(|&child| child != id);
        }
    }

    /// Remove a node from its parent. The node stays usable, detached.
    pub fn remove(&mut self, id: NodeId) {
        self.detach(id);
    }

    /// Free the detached subtree rooted at `id`. Attached nodes are left
    /// alone. Returns how many nodes were freed.
    pub fn release(&mut self, id: NodeId) -> usize {
        if id == self.root || !self.contains(id) || self.parent(id).is_some() {
            return 0;
        }
        let subtree = self.descendants(id);
        for node in &subtree {
            self.nodes.remove(node);
        }
        subtree.len()
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.insert_before(parent, child, None);
    }

    /// Insert `child` into `parent` before `reference`, or at the end when
    /// there is no reference.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        if parent == child || !self.contains(parent) || !self.contains(child) {
            return;
        }
        self.detach(child);
        if let Some(node) = self.nodes.get_mut(&parent) {
            let index = reference
                .and_then(|r| node.children.iter().position(|&c| c == r))
                .unwrap_or(node.children.len());
            node.children.insert(index, child);
        }
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = Some(parent);
        }
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let index = siblings.iter().position(|&c| c == id)?;
        siblings.get(index + 1).copied()
    }

    /// Replace `old` with `replacements`, in order. Does nothing if `old` is
    /// detached.
    pub fn replace_with(&mut self, old: NodeId, replacements: &[NodeId]) {
        let Some(parent) = self.parent(old) else {
            return;
        };
        for &node in replacements {
            self.insert_before(parent, node, Some(old));
        }
        self.detach(old);
    }

    /// Replace every child of `parent` with `children`. Returns the old
    /// children, now detached.
    pub fn replace_children(&mut self, parent: NodeId, children: &[NodeId]) -> Vec<NodeId> {
        let old = self.children(parent).to_vec();
        for &node in &old {
            self.detach(node);
        }
        for &child in children {
            self.append_child(parent, child);
        }
        old
    }

    /// Replace the children of `parent` and free the old ones.
    fn replace_and_release(&mut self, parent: NodeId, children: &[NodeId]) {
        for old in self.replace_children(parent, children) {
            self.release(old);
        }
    }

    /// Insert nodes around or inside `target`, keeping their order.
    pub fn insert_adjacent(&mut self, target: NodeId, position: AdjacentPosition, nodes: &[NodeId]) {
        match position {
            AdjacentPosition::BeforeBegin | AdjacentPosition::AfterEnd => {
                let Some(parent) = self.parent(target) else {
                    return;
                };
                let reference = match position {
                    AdjacentPosition::BeforeBegin => Some(target),
                    _ => self.next_sibling(target),
                };
                for &node in nodes {
                    self.insert_before(parent, node, reference);
                }
            }
            AdjacentPosition::AfterBegin => {
                let reference = self.children(target).first().copied();
                for &node in nodes {
                    self.insert_before(target, node, reference);
                }
            }
            AdjacentPosition::BeforeEnd => {
                for &node in nodes {
                    self.append_child(target, node);
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)
            .and_then(|el| el.attrs.get(name))
            .map(String::as_str)
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.element(id).is_some_and(|el| el.attrs.contains_key(name))
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(el) = self.element_mut(id) {
            el.attrs.insert(name.to_ascii_lowercase(), value.to_string());
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let Some(el) = self.element_mut(id) {
            el.attrs.shift_remove(name);
        }
    }

    /// Set or remove an attribute depending on `value`.
    pub fn set_or_remove_attr(&mut self, id: NodeId, name: &str, value: Option<&str>) {
        match value {
            Some(value) => self.set_attr(id, name, value),
            None => self.remove_attr(id, name),
        }
    }

    fn toggle_attr(&mut self, id: NodeId, name: &str, on: bool) {
        if on {
            self.set_attr(id, name, "");
        } else {
            self.remove_attr(id, name);
        }
    }

    // ------------------------------------------------------------------
    // Classes, inline style and dataset
    // ------------------------------------------------------------------

    pub fn class_list(&self, id: NodeId) -> Vec<String> {
        self.attr(id, "class")
            .map(|classes| classes.split_whitespace().map(String::from).collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.class_list(id).iter().any(|c| c == class)
    }

    pub fn toggle_class(&mut self, id: NodeId, class: &str, on: bool) {
        let mut classes = self.class_list(id);
        let present = classes.iter().any(|c| c == class);
        if on == present {
            return;
        }
        if on {
            classes.push(class.to_string());
        } else {
            classes.retain(|c| c != class);
        }
        self.set_attr(id, "class", &classes.join(" "));
    }

    /// Inline style declarations in source order.
    pub fn style_map(&self, id: NodeId) -> IndexMap<String, String> {
        self.attr(id, "style")
            .map(|style| {
                style
                    .split(';')
                    .filter_map(|decl| decl.split_once(':'))
                    .map(|(prop, value)| (prop.trim().to_string(), value.trim().to_string()))
                    .filter(|(prop, _)| !prop.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn style_property(&self, id: NodeId, prop: &str) -> Option<String> {
        self.style_map(id).get(&css_property(prop)).cloned()
    }

    /// Set one inline style property. Accepts both `backgroundColor` and
    /// `background-color`; an empty value removes the declaration.
    pub fn set_style_property(&mut self, id: NodeId, prop: &str, value: Option<&str>) {
        let mut styles = self.style_map(id);
        let prop = css_property(prop);
        match value.filter(|v| !v.is_empty()) {
            Some(value) => {
                styles.insert(prop, value.to_string());
            }
            None => {
                styles.shift_remove(&prop);
            }
        }
        let style = styles
            .iter()
            .map(|(p, v)| format!("{p}: {v}"))
            .collect::<Vec<_>>()
            .join("; ");
        self.set_attr(id, "style", &style);
    }

    /// `data-*` attributes keyed by their camel-cased dataset name.
    pub fn dataset(&self, id: NodeId) -> IndexMap<String, String> {
        self.element(id)
            .map(|el| {
                el.attrs
                    .iter()
                    .filter_map(|(name, value)| {
                        name.strip_prefix("data-")
                            .map(|suffix| (dataset_key(suffix), value.clone()))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------

    /// Read an element property. Properties that were never assigned fall
    /// back to what the markup says.
    pub fn prop(&self, id: NodeId, name: &str) -> Value {
        let Some(el) = self.element(id) else {
            return Value::Null;
        };
        if let Some(value) = el.props.get(name) {
            return value.clone();
        }
        let attr_string = |attr: &str| Value::String(self.attr(id, attr).unwrap_or_default().to_string());
        match name {
            "textContent" | "innerText" => Value::String(self.text_content(id)),
            "innerHTML" => Value::String(self.inner_html(id)),
            "outerHTML" => Value::String(self.outer_html(id)),
            "value" if el.tag == "textarea" => Value::String(self.text_content(id)),
            "value" | "id" | "name" => attr_string(name),
            "className" => attr_string("class"),
            "checked" | "disabled" | "hidden" | "required" | "selected" => {
                Value::Bool(self.has_attr(id, name))
            }
            "tagName" => Value::String(el.tag.to_ascii_uppercase()),
            "type" => {
                let declared = self.attr(id, "type").map(str::to_ascii_lowercase);
                match declared {
                    Some(kind) => Value::String(kind),
                    None if el.tag == "input" => Value::from("text"),
                    None if el.tag == "button" => Value::from("submit"),
                    None => Value::from(""),
                }
            }
            "dataset" => Value::Object(
                self.dataset(id)
                    .into_iter()
                    .map(|(k, v)| (k, Value::String(v)))
                    .collect(),
            ),
            "files" => Value::Files(Vec::new()),
            other => self
                .attr(id, other)
                .map(|v| Value::String(v.to_string()))
                .unwrap_or_default(),
        }
    }

    /// Assign an element property.
    pub fn set_prop(&mut self, id: NodeId, name: &str, value: Value) {
        match name {
            "textContent" | "innerText" => {
                let text = match value {
                    Value::Null => String::new(),
                    other => other.to_display_string(),
                };
                self.set_text_content(id, &text);
            }
            "innerHTML" if self.contains(id) => {
                let nodes = parse_fragment(self, &value.to_display_string());
                self.replace_and_release(id, &nodes);
            }
            "className" => self.set_attr(id, "class", &value.to_display_string()),
            "id" => self.set_attr(id, "id", &value.to_display_string()),
            "disabled" | "hidden" | "required" => self.toggle_attr(id, name, value.is_truthy()),
            _ => {
                if let Some(el) = self.element_mut(id) {
                    el.props.insert(name.to_string(), value);
                }
            }
        }
    }

    /// Set one key of an object-valued property (`el.config.mode = ...`).
    pub fn set_prop_member(&mut self, id: NodeId, name: &str, member: &str, value: Value) {
        let mut object = match self.prop(id, name) {
            Value::Object(map) => map,
            _ => IndexMap::new(),
        };
        object.insert(member.to_string(), value);
        self.set_prop(id, name, Value::Object(object));
    }

    /// Assign a property path with at most one level of sub-addressing.
    ///
    /// `class.name` toggles a class, `style.prop` sets an inline style
    /// property, `dataset.key` sets a `data-*` attribute and any other
    /// `a.b` sets key `b` of object property `a`. A path without a dot is a
    /// plain property assignment.
    pub fn assign_path(&mut self, id: NodeId, path: &str, value: Value) {
        let Some((head, member)) = path.split_once('.') else {
            self.set_prop(id, path, value);
            return;
        };
        match head {
            "class" | "classList" => self.toggle_class(id, member, value.is_truthy()),
            "style" => {
                let text = match value {
                    Value::Null => None,
                    other => Some(other.to_display_string()),
                };
                self.set_style_property(id, member, text.as_deref());
            }
            "dataset" => {
                let name = format!("data-{}", dataset_attr(member));
                match value {
                    Value::Null => self.remove_attr(id, &name),
                    other => self.set_attr(id, &name, &other.to_display_string()),
                }
            }
            _ => self.set_prop_member(id, head, member, value),
        }
    }

    pub fn text_content(&self, id: NodeId) -> String {
        self.descendants(id)
            .into_iter()
            .filter_map(|node| match self.node(node).map(Node::data) {
                Some(NodeData::Text(text)) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn set_text_content(&mut self, id: NodeId, text: &str) {
        if !self.contains(id) {
            return;
        }
        let children = if text.is_empty() {
            Vec::new()
        } else {
            vec![self.create_text(text)]
        };
        self.replace_and_release(id, &children);
    }

    // ------------------------------------------------------------------
    // Listeners
    // ------------------------------------------------------------------

    pub fn add_listener(
        &mut self,
        target: EventTarget,
        event: &str,
        once: bool,
        handler: Handler,
    ) -> ListenerId {
        let listener = Listener {
            id: ListenerId::new(),
            event: event.to_string(),
            once,
            handler,
        };
        let id = listener.id;
        if let Some(list) = self.listeners_mut(target) {
            list.push(listener);
        }
        id
    }

    pub fn remove_listener(&mut self, target: EventTarget, id: ListenerId) {
        if let Some(list) = self.listeners_mut(target) {
            list.retain(|l| l.id != id);
        }
    }

    pub fn listener_count(&self, target: EventTarget, event: &str) -> usize {
        let list = match target {
            EventTarget::Window => Some(&self.window_listeners),
            EventTarget::Node(id) => self.element(id).map(|el| &el.listeners),
        };
        list.map(|l| l.iter().filter(|l| l.event == event).count())
            .unwrap_or(0)
    }

    fn listeners_mut(&mut self, target: EventTarget) -> Option<&mut Vec<Listener>> {
        match target {
            EventTarget::Window => Some(&mut self.window_listeners),
            EventTarget::Node(id) => self.element_mut(id).map(|el| &mut el.listeners),
        }
    }

    /// Snapshot the listeners for `event` on `target`, removing `once`
    /// listeners so they fire a single time.
    pub(crate) fn take_listeners(&mut self, target: EventTarget, event: &str) -> Vec<Listener> {
        let Some(list) = self.listeners_mut(target) else {
            return Vec::new();
        };
        let matching: Vec<Listener> = list.iter().filter(|l| l.event == event).cloned().collect();
        list.retain(|l| !(l.once && l.event == event));
        matching
    }

    // ------------------------------------------------------------------
    // Serialization
    // ------------------------------------------------------------------

    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_html(id, &mut out);
        out
    }

    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for &child in self.children(id) {
            self.write_html(child, &mut out);
        }
        out
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.node(id) else {
            return;
        };
        match &node.data {
            NodeData::Document => {
                for &child in self.children(id) {
                    self.write_html(child, out);
                }
            }
            NodeData::Text(text) => out.push_str(&escape_text(text)),
            NodeData::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            NodeData::Element(el) => {
                out.push('<');
                out.push_str(&el.tag);
                for (name, value) in &el.attrs {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&escape_attr(value));
                    out.push('"');
                }
                out.push('>');
                if is_void_element(&el.tag) {
                    return;
                }
                for &child in self.children(id) {
                    self.write_html(child, out);
                }
                out.push_str("</");
                out.push_str(&el.tag);
                out.push('>');
            }
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// `backgroundColor` -> `background-color`; already-dashed names pass
/// through.
fn css_property(prop: &str) -> String {
    if prop.contains('-') {
        prop.to_string()
    } else {
        dataset_attr(prop)
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_serializes_body() {
        let doc = Document::from_body_html(r#"<div id="a" class="x"><p>hi &amp; bye</p><br></div>"#);
        assert_eq!(
            doc.inner_html(doc.body()),
            r#"<div id="a" class="x"><p>hi &amp; bye</p><br></div>"#
        );
    }

    #[test]
    fn release_frees_detached_subtrees_only() {
        let mut doc = Document::from_body_html(r#"<div id="a"><p>x</p></div><span id="b"></span>"#);
        let a = doc.get_element_by_id("a").unwrap();
        let b = doc.get_element_by_id("b").unwrap();
        let before = doc.node_count();

        assert_eq!(doc.release(b), 0);
        assert_eq!(doc.release(doc.body()), 0);
        doc.remove(a);
        assert_eq!(doc.release(a), 3);
        assert_eq!(doc.node_count(), before - 3);
        assert_eq!(doc.release(a), 0);

        assert!(!doc.contains(a));
        assert_eq!(doc.outer_html(a), "");
        doc.set_attr(a, "class", "late");
        doc.append_child(a, b);
        assert_eq!(doc.parent(b), Some(doc.body()));
    }

    #[test]
    fn property_writes_free_replaced_children() {
        let mut doc = Document::from_body_html(r#"<p id="p">0</p>"#);
        let p = doc.get_element_by_id("p").unwrap();
        let before = doc.node_count();
        for i in 1..50 {
            doc.set_prop(p, "textContent", Value::from(i));
        }
        doc.set_prop(p, "innerHTML", Value::from("<b>49</b>"));
        assert_eq!(doc.node_count(), before + 1);
        assert_eq!(doc.inner_html(p), "<b>49</b>");
    }

    #[test]
    fn finds_connected_elements_by_id() {
        let mut doc = Document::from_body_html(r#"<div id="a"><span id="b"></span></div>"#);
        let b = doc.get_element_by_id("b").unwrap();
        assert!(doc.is_connected(b));
        doc.remove(b);
        assert!(!doc.is_connected(b));
        assert!(doc.get_element_by_id("b").is_none());
    }

    #[test]
    fn adjacent_insertion_positions() {
        let mut doc = Document::from_body_html(r#"<ul id="list"><li>b</li></ul>"#);
        let list = doc.get_element_by_id("list").unwrap();
        for (position, text) in [
            (AdjacentPosition::AfterBegin, "a"),
            (AdjacentPosition::BeforeEnd, "c"),
        ] {
            let li = doc.create_element("li");
            doc.set_text_content(li, text);
            doc.insert_adjacent(list, position, &[li]);
        }
        let before = doc.create_element("hr");
        doc.insert_adjacent(list, AdjacentPosition::BeforeBegin, &[before]);
        let after = doc.create_comment("end");
        doc.insert_adjacent(list, AdjacentPosition::AfterEnd, &[after]);

        assert_eq!(
            doc.inner_html(doc.body()),
            r#"<hr><ul id="list"><li>a</li><li>b</li><li>c</li></ul><!--end-->"#
        );
    }

    #[test]
    fn class_toggling_is_idempotent() {
        let mut doc = Document::from_body_html(r#"<div id="a" class="one"></div>"#);
        let a = doc.get_element_by_id("a").unwrap();
        doc.toggle_class(a, "two", true);
        doc.toggle_class(a, "two", true);
        doc.toggle_class(a, "one", false);
        assert_eq!(doc.attr(a, "class"), Some("two"));
    }

    #[test]
    fn style_properties_accept_camel_case() {
        let mut doc = Document::from_body_html(r#"<div id="a" style="color: red"></div>"#);
        let a = doc.get_element_by_id("a").unwrap();
        doc.set_style_property(a, "backgroundColor", Some("blue"));
        assert_eq!(doc.attr(a, "style"), Some("color: red; background-color: blue"));
        doc.set_style_property(a, "color", None);
        assert_eq!(doc.style_property(a, "background-color").as_deref(), Some("blue"));
        assert_eq!(doc.style_property(a, "color"), None);
    }

    #[test]
    fn properties_fall_back_to_markup() {
        let mut doc = Document::from_body_html(
            r#"<input id="n" type="Number" value="3" data-user-id="7"><textarea id="t">hey</textarea>"#,
        );
        let n = doc.get_element_by_id("n").unwrap();
        let t = doc.get_element_by_id("t").unwrap();
        assert_eq!(doc.prop(n, "value"), Value::from("3"));
        assert_eq!(doc.prop(n, "type"), Value::from("number"));
        assert_eq!(doc.prop(t, "value"), Value::from("hey"));
        assert_eq!(doc.dataset(n).get("userId").map(String::as_str), Some("7"));

        doc.set_prop(n, "value", Value::from("4"));
        doc.set_prop(n, "disabled", Value::Bool(true));
        assert_eq!(doc.prop(n, "value"), Value::from("4"));
        assert!(doc.has_attr(n, "disabled"));
    }

    #[test]
    fn text_content_replaces_children() {
        let mut doc = Document::from_body_html(r#"<p id="p"><b>old</b></p>"#);
        let p = doc.get_element_by_id("p").unwrap();
        doc.set_prop(p, "textContent", Value::from(5));
        assert_eq!(doc.outer_html(p), r#"<p id="p">5</p>"#);
    }

    #[test]
    fn assign_path_addresses_one_sub_property() {
        let mut doc = Document::from_body_html(r#"<div id="d"></div>"#);
        let d = doc.get_element_by_id("d").unwrap();
        doc.assign_path(d, "class.open", Value::from(true));
        doc.assign_path(d, "style.backgroundColor", Value::from("red"));
        doc.assign_path(d, "dataset.userId", Value::from(7));
        doc.assign_path(d, "title", Value::from("hi"));
        assert_eq!(
            doc.outer_html(d),
            r#"<div id="d" class="open" style="background-color: red" data-user-id="7"></div>"#
        );
        assert_eq!(doc.prop(d, "title"), Value::from("hi"));

        doc.assign_path(d, "class.open", Value::from(0));
        assert!(!doc.has_class(d, "open"));
    }
}
