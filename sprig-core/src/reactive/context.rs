//! Tracking Context
//!
//! The tracker records which binding is currently executing and which
//! element the current handler belongs to. Scope reads consult the first
//! slot to attribute dependencies; helpers consult the second to address
//! "this element" without it being passed around.
//!
//! # Implementation
//!
//! Both slots use strict save/restore: entering a frame returns a guard that
//! puts the previous value back when dropped. Frames therefore nest (an
//! event handler sets the element, a write inside it re-runs a binding that
//! sets the binding slot) and unwind correctly even if the computation
//! panics.

use std::cell::{Cell, RefCell};

use super::Binding;
use crate::dom::NodeId;

/// Single-threaded execution context shared by a runtime and its scopes.
#[derive(Default)]
pub struct Tracker {
    binding: RefCell<Option<Binding>>,
    element: Cell<Option<NodeId>>,
}

/// Restores the previous binding slot when dropped.
pub struct BindingFrame<'a> {
    tracker: &'a Tracker,
    previous: Option<Binding>,
}

impl Drop for BindingFrame<'_> {
    fn drop(&mut self) {
        *self.tracker.binding.borrow_mut() = self.previous.take();
    }
}

/// Restores the previous element slot when dropped.
pub struct ElementFrame<'a> {
    tracker: &'a Tracker,
    previous: Option<NodeId>,
}

impl Drop for ElementFrame<'_> {
    fn drop(&mut self) {
        self.tracker.element.set(self.previous);
    }
}

impl Tracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// The binding reads are currently attributed to, if any.
    pub fn current_binding(&self) -> Option<Binding> {
        self.binding.borrow().clone()
    }

    /// Check if reads are currently being attributed.
    pub fn is_tracking(&self) -> bool {
        self.binding.borrow().is_some()
    }

    /// The element the running handler belongs to, if any.
    pub fn current_element(&self) -> Option<NodeId> {
        self.element.get()
    }

    /// Make `binding` (or nothing) the attribution target until the frame
    /// is dropped.
    pub fn enter_binding(&self, binding: Option<Binding>) -> BindingFrame<'_> {
        let previous = self.binding.replace(binding);
        BindingFrame {
            tracker: self,
            previous,
        }
    }

    pub fn enter_element(&self, element: Option<NodeId>) -> ElementFrame<'_> {
        let previous = self.element.replace(element);
        ElementFrame {
            tracker: self,
            previous,
        }
    }

    /// Run `f` with `binding` as the attribution target.
    pub fn run_tracked<R>(&self, binding: &Binding, f: impl FnOnce() -> R) -> R {
        let _frame = self.enter_binding(Some(binding.clone()));
        f()
    }

    /// Run `f` with attribution suspended.
    pub fn untracked<R>(&self, f: impl FnOnce() -> R) -> R {
        let _frame = self.enter_binding(None);
        f()
    }

    /// Run `f` with `element` as the current element.
    pub fn run_with_element<R>(&self, element: NodeId, f: impl FnOnce() -> R) -> R {
        let _frame = self.enter_element(Some(element));
        f()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_restores_binding_after_frame() {
        let tracker = Tracker::new();
        let binding = Binding::new(None, || {});

        assert!(!tracker.is_tracking());
        tracker.run_tracked(&binding, || {
            assert_eq!(tracker.current_binding().map(|b| b.id()), Some(binding.id()));
        });
        assert!(tracker.current_binding().is_none());
    }

    #[test]
    fn nested_frames_compose() {
        let tracker = Tracker::new();
        let outer = Binding::new(None, || {});
        let inner = Binding::new(None, || {});

        tracker.run_tracked(&outer, || {
            tracker.run_tracked(&inner, || {
                assert_eq!(tracker.current_binding().map(|b| b.id()), Some(inner.id()));
            });
            assert_eq!(tracker.current_binding().map(|b| b.id()), Some(outer.id()));

            tracker.untracked(|| assert!(!tracker.is_tracking()));
            assert!(tracker.is_tracking());
        });
        assert!(!tracker.is_tracking());
    }

    #[test]
    fn element_and_binding_slots_are_independent() {
        let tracker = Tracker::new();
        let binding = Binding::new(None, || {});
        let el = NodeId(3);

        tracker.run_with_element(el, || {
            tracker.run_tracked(&binding, || {
                assert_eq!(tracker.current_element(), Some(el));
            });
            assert_eq!(tracker.current_element(), Some(el));
        });
        assert_eq!(tracker.current_element(), None);
    }
}
