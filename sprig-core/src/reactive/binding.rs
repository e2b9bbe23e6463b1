//! Binding Implementation
//!
//! A Binding is a zero-argument reactive computation: "set this property",
//! "toggle this class". It runs once when created, which establishes its
//! dependencies, and again whenever a property it read is written.
//!
//! # Re-entrancy
//!
//! A binding that writes a property it also reads would otherwise be
//! re-invoked from inside its own execution and recurse without bound. A
//! binding that is already running is skipped instead, so it re-runs exactly
//! once per external write.
//!
//! # Disposal
//!
//! Bindings remember the element they were declared on. When that element
//! is swapped out the binding is disposed; dependency sets drop disposed
//! bindings the next time they fan out.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::trace;

use super::Tracker;
use crate::dom::NodeId;

/// Unique identifier for a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingId(u64);

impl BindingId {
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for BindingId {
    fn default() -> Self {
        Self::new()
    }
}

struct BindingInner {
    id: BindingId,
    element: Option<NodeId>,
    run: Box<dyn Fn()>,
    running: Cell<bool>,
    disposed: Cell<bool>,
    run_count: Cell<usize>,
}

/// A reactive computation. Clones share state.
#[derive(Clone)]
pub struct Binding {
    inner: Rc<BindingInner>,
}

impl Binding {
    /// Create a binding without running it.
    pub fn new<F>(element: Option<NodeId>, run: F) -> Self
    where
        F: Fn() + 'static,
    {
        Self {
            inner: Rc::new(BindingInner {
                id: BindingId::new(),
                element,
                run: Box::new(run),
                running: Cell::new(false),
                disposed: Cell::new(false),
                run_count: Cell::new(0),
            }),
        }
    }

    pub fn id(&self) -> BindingId {
        self.inner.id
    }

    /// The element the binding was declared on.
    pub fn element(&self) -> Option<NodeId> {
        self.inner.element
    }

    /// Run the computation inside its own tracking frame.
    ///
    /// Does nothing when the binding is disposed or already running.
    pub fn execute(&self, tracker: &Tracker) {
        let inner = &self.inner;
        if inner.disposed.get() {
            return;
        }
        if inner.running.replace(true) {
            trace!(binding = ?inner.id, "skipping re-entrant binding run");
            return;
        }

        struct Running<'a>(&'a Cell<bool>);
        impl Drop for Running<'_> {
            fn drop(&mut self) {
                self.0.set(false);
            }
        }
        let _running = Running(&inner.running);

        tracker.run_tracked(self, || (inner.run)());
        inner.run_count.set(inner.run_count.get() + 1);
    }

    /// Stop the binding from ever running again.
    pub fn dispose(&self) {
        self.inner.disposed.set(true);
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.get()
    }

    /// Number of completed executions.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.get()
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("id", &self.inner.id)
            .field("element", &self.inner.element)
            .field("run_count", &self.run_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binding_ids_are_unique() {
        let a = Binding::new(None, || {});
        let b = Binding::new(None, || {});
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn execute_counts_runs() {
        let tracker = Tracker::new();
        let binding = Binding::new(None, || {});
        assert_eq!(binding.run_count(), 0);

        binding.execute(&tracker);
        binding.execute(&tracker);
        assert_eq!(binding.run_count(), 2);
    }

    #[test]
    fn disposed_binding_does_not_run() {
        let tracker = Tracker::new();
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        let binding = Binding::new(None, move || counter.set(counter.get() + 1));

        binding.execute(&tracker);
        binding.dispose();
        binding.execute(&tracker);
        assert_eq!(hits.get(), 1);
        assert!(binding.is_disposed());
    }

    #[test]
    fn execute_attributes_reads_to_itself() {
        let tracker = Rc::new(Tracker::new());
        let seen = Rc::new(Cell::new(None));
        let (t, s) = (tracker.clone(), seen.clone());
        let binding = Binding::new(None, move || s.set(t.current_binding().map(|b| b.id())));

        binding.execute(&tracker);
        assert_eq!(seen.get(), Some(binding.id()));
        assert!(!tracker.is_tracking());
    }

    #[test]
    fn clone_shares_state() {
        let tracker = Tracker::new();
        let a = Binding::new(Some(NodeId(1)), || {});
        let b = a.clone();

        a.execute(&tracker);
        assert_eq!(b.run_count(), 1);
        b.dispose();
        assert!(a.is_disposed());
        assert_eq!(a.element(), Some(NodeId(1)));
    }
}
