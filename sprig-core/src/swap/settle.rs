//! Settle Pass
//!
//! Swapping in server markup replaces elements outright, which would snap
//! any CSS transition that was running on the old element. The settle pass
//! pairs outgoing and incoming elements by id and, for each allow-listed
//! attribute whose value changes, plays the change back over two frames:
//!
//! 1. Before the swap, the outgoing value is recorded.
//! 2. On the next frame the old value is put on the new element, provided
//!    nothing has touched the attribute since the swap.
//! 3. On the frame after that the new value is restored, provided the old
//!    value is still in place, so the transition runs from old to new.

use indexmap::IndexMap;

use crate::dom::{Document, NodeId};
use crate::runtime::Runtime;

/// One attribute to carry across a swap.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Carry {
    element: NodeId,
    attr: String,
    old: Option<String>,
    new: Option<String>,
}

/// Attribute changes captured before a swap.
#[derive(Debug, Default)]
pub struct Settle {
    carries: Vec<Carry>,
}

impl Settle {
    /// Pair elements by id between the `outgoing` and `incoming` subtrees
    /// and record every allow-listed attribute that differs.
    pub fn capture(doc: &Document, outgoing: &[NodeId], incoming: &[NodeId], attrs: &[String]) -> Self {
        let mut by_id: IndexMap<String, NodeId> = IndexMap::new();
        for &root in outgoing {
            for el in doc.elements_in(root) {
                if let Some(id) = doc.attr(el, "id") {
                    by_id.entry(id.to_string()).or_insert(el);
                }
            }
        }

        let mut carries = Vec::new();
        for &root in incoming {
            for new_el in doc.elements_in(root) {
                let Some(old_el) = doc.attr(new_el, "id").and_then(|id| by_id.get(id)) else {
                    continue;
                };
                for attr in attrs {
                    let old = doc.attr(*old_el, attr).map(String::from);
                    let new = doc.attr(new_el, attr).map(String::from);
                    if old != new {
                        carries.push(Carry {
                            element: new_el,
                            attr: attr.clone(),
                            old,
                            new,
                        });
                    }
                }
            }
        }

        Self { carries }
    }

    pub fn is_empty(&self) -> bool {
        self.carries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.carries.len()
    }

    /// Schedule the two settle frames.
    pub fn schedule(self, rt: &Runtime) {
        if self.carries.is_empty() {
            return;
        }
        let weak = rt.downgrade();
        rt.request_frame(move || {
            let Some(rt) = weak.upgrade() else {
                return;
            };
            // Frame 1: show the old values where the new ones are untouched.
            let mut applied = Vec::new();
            {
                let mut doc = rt.dom().borrow_mut();
                for carry in self.carries {
                    if doc.attr(carry.element, &carry.attr) == carry.new.as_deref() {
                        doc.set_or_remove_attr(carry.element, &carry.attr, carry.old.as_deref());
                        applied.push(carry);
                    }
                }
            }

            let weak = rt.downgrade();
            rt.request_frame(move || {
                let Some(rt) = weak.upgrade() else {
                    return;
                };
                // Frame 2: hand over to the real values.
                let mut doc = rt.dom().borrow_mut();
                for carry in applied {
                    if doc.attr(carry.element, &carry.attr) == carry.old.as_deref() {
                        doc.set_or_remove_attr(carry.element, &carry.attr, carry.new.as_deref());
                    }
                }
            });
        });
    }
}
