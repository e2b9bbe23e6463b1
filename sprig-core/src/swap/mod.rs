//! Swap Engine
//!
//! Applies server fragments to the live document. Every top-level element
//! of a response is one fragment: its `id` names the element it targets and
//! an optional `sp-swap` attribute picks the [`SwapStrategy`].
//!
//! # Lifecycle
//!
//! 1. The target is looked up by id. A fragment without an id, with an
//!    unknown strategy or without a target is logged and skipped; sibling
//!    fragments are unaffected.
//!
//! 2. For the replacing strategies (`outer`, `inner`) the outgoing subtree
//!    is torn down first: bound elements receive `spdestroy`, their
//!    bindings are disposed and scopes anchored there are dropped.
//!
//! 3. The settle pass snapshots allow-listed attributes, the tree is
//!    edited, and the inserted elements are initialized.
//!
//! 4. The outgoing subtree and the emptied fragment wrapper are released
//!    from the document. The settle pass only touches incoming elements,
//!    so nothing outgoing is needed after the edit.

mod settle;
mod strategy;

pub use settle::Settle;
pub use strategy::SwapStrategy;

use tracing::{debug, warn};

use crate::dom::{parse_fragment, NodeId};
use crate::error::SwapError;
use crate::runtime::Runtime;

impl Runtime {
    /// Parse `html` and apply each top-level element as a fragment.
    /// Returns how many fragments were applied.
    pub fn swap_html(&self, html: &str) -> usize {
        let fragments: Vec<NodeId> = {
            let mut doc = self.dom().borrow_mut();
            let (elements, stray): (Vec<NodeId>, Vec<NodeId>) = parse_fragment(&mut doc, html)
                .into_iter()
                .partition(|node| doc.is_element(*node));
            for node in stray {
                doc.release(node);
            }
            elements
        };

        let mut applied = 0;
        for fragment in fragments {
            match self.apply_fragment(fragment) {
                Ok(()) => applied += 1,
                Err(err) => warn!(%err, "fragment skipped"),
            }
            // Attached fragments (outer swaps) are kept by `release`.
            self.dom().borrow_mut().release(fragment);
        }
        applied
    }

    /// Apply one detached fragment element to the document. The fragment
    /// element itself stays with the caller; only an `outer` swap attaches
    /// it.
    pub fn apply_fragment(&self, fragment: NodeId) -> Result<(), SwapError> {
        let swap_attr = self.config().attr("swap");
        let (id, strategy, target) = {
            let doc = self.dom().borrow();
            let id = doc
                .attr(fragment, "id")
                .filter(|id| !id.is_empty())
                .map(String::from)
                .ok_or_else(|| SwapError::MissingId {
                    tag: doc.tag(fragment).unwrap_or_default().to_string(),
                })?;
            let strategy: SwapStrategy = doc.attr(fragment, &swap_attr).unwrap_or_default().parse()?;
            let target = doc
                .get_element_by_id(&id)
                .ok_or_else(|| SwapError::NoTarget { id: id.clone() })?;
            (id, strategy, target)
        };
        self.dom().borrow_mut().remove_attr(fragment, &swap_attr);

        let attrs = &self.config().settle_attributes;
        match strategy {
            SwapStrategy::Outer => {
                self.teardown(target);
                let settle = Settle::capture(&self.dom().borrow(), &[target], &[fragment], attrs);
                {
                    let mut doc = self.dom().borrow_mut();
                    doc.replace_with(target, &[fragment]);
                    doc.release(target);
                }
                settle.schedule(self);
                self.init(fragment);
            }
            SwapStrategy::Inner => {
                let outgoing = self.dom().borrow().element_children(target);
                for child in &outgoing {
                    self.teardown(*child);
                }
                let incoming = self.dom().borrow().children(fragment).to_vec();
                let settle = Settle::capture(&self.dom().borrow(), &outgoing, &incoming, attrs);
                {
                    let mut doc = self.dom().borrow_mut();
                    for old in doc.replace_children(target, &incoming) {
                        doc.release(old);
                    }
                }
                settle.schedule(self);
                self.init_inserted(&incoming);
            }
            adjacent => {
                let incoming = self.dom().borrow().children(fragment).to_vec();
                if let Some(position) = adjacent.position() {
                    self.dom().borrow_mut().insert_adjacent(target, position, &incoming);
                }
                self.init_inserted(&incoming);
            }
        }

        debug!(id, %strategy, "fragment applied");
        Ok(())
    }

    /// Initialize the element nodes among `nodes`. Text and comments are
    /// left alone.
    fn init_inserted(&self, nodes: &[NodeId]) {
        let elements: Vec<NodeId> = {
            let doc = self.dom().borrow();
            nodes.iter().copied().filter(|node| doc.is_element(*node)).collect()
        };
        for element in elements {
            self.init(element);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use crate::value::Value;

    fn runtime(html: &str) -> Runtime {
        let rt = Runtime::new(Document::from_body_html(html));
        rt.start();
        rt
    }

    fn body(rt: &Runtime) -> String {
        let body = rt.dom().body();
        rt.dom().borrow().inner_html(body)
    }

    #[test]
    fn outer_replaces_the_target() {
        let rt = runtime(r#"<div id="a">old</div><p>keep</p>"#);
        assert_eq!(rt.swap_html(r#"<section id="a">new</section>"#), 1);
        assert_eq!(body(&rt), r#"<section id="a">new</section><p>keep</p>"#);
    }

    #[test]
    fn inner_replaces_children_only() {
        let rt = runtime(r#"<div id="panel" class="box"><p>old</p></div>"#);
        rt.swap_html(r#"<div id="panel" sp-swap="inner"><p>new</p></div>"#);
        assert_eq!(body(&rt), r#"<div id="panel" class="box"><p>new</p></div>"#);
    }

    #[test]
    fn adjacent_strategies_insert_children() {
        let rt = runtime(r#"<ul id="list"><li>b</li></ul>"#);
        rt.swap_html(r#"<ul id="list" sp-swap="prepend"><li>a</li></ul>"#);
        rt.swap_html(r#"<ul id="list" sp-swap="append"><li>c</li></ul>"#);
        rt.swap_html(r#"<div id="list" sp-swap="before"><h2>title</h2></div>"#);
        rt.swap_html(r#"<div id="list" sp-swap="afterend"><hr></div>"#);
        assert_eq!(
            body(&rt),
            r#"<h2>title</h2><ul id="list"><li>a</li><li>b</li><li>c</li></ul><hr>"#
        );
    }

    #[test]
    fn bad_fragments_are_skipped_without_touching_siblings() {
        let rt = runtime(r#"<div id="a">1</div><div id="b">2</div>"#);
        let applied = rt.swap_html(concat!(
            r#"<div id="ghost">x</div>"#,
            r#"<div>no id</div>"#,
            r#"<div id="a" sp-swap="sideways">y</div>"#,
            r#"<div id="b">3</div>"#,
        ));
        assert_eq!(applied, 1);
        assert_eq!(body(&rt), r#"<div id="a">1</div><div id="b">3</div>"#);
    }

    #[test]
    fn settle_plays_changed_attributes_over_two_frames() {
        let rt = runtime(r#"<div id="bar" class="w-10" style="width: 10%"></div>"#);
        rt.swap_html(r#"<div id="bar" class="w-50" style="width: 50%"></div>"#);
        let bar = rt.dom().get_element_by_id("bar").unwrap();
        let class = || rt.dom().attr(bar, "class");

        assert_eq!(class().as_deref(), Some("w-50"));
        rt.run_frame();
        assert_eq!(class().as_deref(), Some("w-10"));
        assert_eq!(rt.dom().attr(bar, "style").as_deref(), Some("width: 10%"));
        rt.run_frame();
        assert_eq!(class().as_deref(), Some("w-50"));
        assert_eq!(rt.pending_frames(), 0);
    }

    #[test]
    fn swapped_out_nodes_are_freed() {
        let rt = runtime(r#"<div id="a">x</div><ul id="list"><li>0</li></ul>"#);
        let nodes = || rt.dom().borrow().node_count();
        let before = nodes();

        for i in 0..200 {
            rt.swap_html(&format!(
                r#"<div id="a" data-n="{i}">x</div><!--sep--><ul id="list" sp-swap="inner"><li>{i}</li></ul>"#
            ));
        }
        rt.swap_html(r#"<div id="ghost">nothing</div>"#);
        rt.swap_html(r#"<ul id="list" sp-swap="append"><li>200</li></ul>"#);

        assert_eq!(nodes(), before + 2);
        assert_eq!(
            body(&rt),
            r#"<div id="a" data-n="199">x</div><ul id="list"><li>199</li><li>200</li></ul>"#
        );
    }

    #[test]
    fn stale_handles_to_freed_nodes_are_inert() {
        let rt = runtime(r#"<div id="a"><button id="b"></button></div>"#);
        let old = rt.dom().get_element_by_id("b").unwrap();
        rt.swap_html(r#"<div id="a"><button id="b"></button></div>"#);

        assert!(!rt.dom().borrow().contains(old));
        rt.dom().set_prop(old, "textContent", Value::from("late"));
        rt.dispatch(old, "error", Value::Null, true);
        assert_eq!(rt.dom().prop(old, "textContent"), Value::Null);
        assert_ne!(rt.dom().get_element_by_id("b"), Some(old));
    }

    #[test]
    fn settle_leaves_diverged_attributes_alone() {
        let rt = runtime(r#"<div id="bar" class="a"></div>"#);
        rt.swap_html(r#"<div id="bar" class="b"></div>"#);
        let bar = rt.dom().get_element_by_id("bar").unwrap();
        rt.dom().borrow_mut().set_attr(bar, "class", "c");
        rt.run_frame();
        rt.run_frame();
        assert_eq!(rt.dom().attr(bar, "class").as_deref(), Some("c"));
    }
}
