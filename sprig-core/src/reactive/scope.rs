//! Scope Implementation
//!
//! A Scope is the reactive data record anchored to one subtree root. It is
//! the store behind every expression evaluated inside that subtree.
//!
//! # How Scopes Work
//!
//! 1. [`Scope::get`] returns the stored value. If a binding is executing, the
//!    binding is added to the dependent set of that property.
//!
//! 2. [`Scope::set`] stores the value unconditionally (an unchanged value
//!    still notifies), then re-runs every dependent binding in the order it
//!    was first registered.
//!
//! 3. The fan-out suspends attribution for its whole duration. Each
//!    re-invoked binding opens its own tracking frame, so reads it performs
//!    are attributed to itself and never to whatever binding performed the
//!    write.
//!
//! # Memory
//!
//! The dependency graph owns the bindings. Closures stored in the record
//! hold a [`WeakScope`] so a record never keeps itself alive.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use tokio_util::sync::CancellationToken;

use super::{Binding, BindingId, Tracker};
use crate::dom::NodeId;
use crate::value::Value;

/// Name of the tracked flag that is `true` while a request is in flight.
pub const FETCHING: &str = "$fetching";

struct ScopeInner {
    element: Option<NodeId>,
    tracker: Rc<Tracker>,
    record: RefCell<IndexMap<String, Value>>,
    deps: RefCell<IndexMap<String, IndexMap<BindingId, Binding>>>,
    refs: RefCell<IndexMap<String, NodeId>>,
    abort: RefCell<CancellationToken>,
}

/// Handle to a reactive data record. Clones share state.
#[derive(Clone)]
pub struct Scope {
    inner: Rc<ScopeInner>,
}

/// Non-owning handle to a scope.
#[derive(Clone)]
pub struct WeakScope(Weak<ScopeInner>);

impl WeakScope {
    pub fn upgrade(&self) -> Option<Scope> {
        self.0.upgrade().map(|inner| Scope { inner })
    }
}

impl Scope {
    /// Create an empty scope anchored to `element`. A scope without an
    /// element is the detached fallback used outside any declared scope.
    pub fn new(element: Option<NodeId>, tracker: Rc<Tracker>) -> Self {
        let mut record = IndexMap::new();
        record.insert(FETCHING.to_string(), Value::Bool(false));
        Self {
            inner: Rc::new(ScopeInner {
                element,
                tracker,
                record: RefCell::new(record),
                deps: RefCell::new(IndexMap::new()),
                refs: RefCell::new(IndexMap::new()),
                abort: RefCell::new(CancellationToken::new()),
            }),
        }
    }

    pub fn downgrade(&self) -> WeakScope {
        WeakScope(Rc::downgrade(&self.inner))
    }

    pub fn ptr_eq(&self, other: &Scope) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// The element that declared this scope.
    pub fn element(&self) -> Option<NodeId> {
        self.inner.element
    }

    pub fn tracker(&self) -> &Rc<Tracker> {
        &self.inner.tracker
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.record.borrow().contains_key(key)
    }

    /// Read a property, recording a dependency if a binding is executing.
    pub fn get(&self, key: &str) -> Option<Value> {
        if let Some(binding) = self.inner.tracker.current_binding() {
            self.inner
                .deps
                .borrow_mut()
                .entry(key.to_string())
                .or_default()
                .entry(binding.id())
                .or_insert(binding);
        }
        self.inner.record.borrow().get(key).cloned()
    }

    /// Read a property without recording a dependency.
    pub fn get_untracked(&self, key: &str) -> Option<Value> {
        self.inner.record.borrow().get(key).cloned()
    }

    /// Write a property and re-run its dependents.
    pub fn set(&self, key: &str, value: Value) {
        self.inner
            .record
            .borrow_mut()
            .insert(key.to_string(), value);

        let dependents = self.live_dependents(key);
        if dependents.is_empty() {
            return;
        }

        let tracker = &self.inner.tracker;
        let _suspended = tracker.enter_binding(None);
        for binding in dependents {
            binding.execute(tracker);
        }
    }

    /// Update a property using its current (untracked) value.
    pub fn update(&self, key: &str, f: impl FnOnce(Value) -> Value) {
        let current = self.get_untracked(key).unwrap_or_default();
        self.set(key, f(current));
    }

    /// Insert initial values without notifying anyone.
    pub fn extend(&self, values: impl IntoIterator<Item = (String, Value)>) {
        self.inner.record.borrow_mut().extend(values);
    }

    /// Snapshot of the record, untracked.
    pub fn entries(&self) -> Vec<(String, Value)> {
        self.inner
            .record
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Dependents of `key` in registration order, with disposed bindings
    /// pruned.
    fn live_dependents(&self, key: &str) -> Vec<Binding> {
        let mut deps = self.inner.deps.borrow_mut();
        let Some(set) = deps.get_mut(key) else {
            return Vec::new();
        };
        set.retain(|_, binding| !binding.is_disposed());
        set.values().cloned().collect()
    }

    /// Number of live bindings depending on `key`.
    pub fn dependent_count(&self, key: &str) -> usize {
        self.inner
            .deps
            .borrow()
            .get(key)
            .map(|set| set.values().filter(|b| !b.is_disposed()).count())
            .unwrap_or(0)
    }

    /// Dispose every binding declared on `element`.
    pub fn dispose_bindings_for(&self, element: NodeId) {
        for set in self.inner.deps.borrow_mut().values_mut() {
            set.retain(|_, binding| {
                if binding.element() == Some(element) {
                    binding.dispose();
                    false
                } else {
                    true
                }
            });
        }
    }

    // ------------------------------------------------------------------
    // Refs
    // ------------------------------------------------------------------

    pub fn set_ref(&self, name: &str, element: NodeId) {
        self.inner
            .refs
            .borrow_mut()
            .insert(name.to_string(), element);
    }

    pub fn get_ref(&self, name: &str) -> Option<NodeId> {
        self.inner.refs.borrow().get(name).copied()
    }

    pub fn refs(&self) -> IndexMap<String, NodeId> {
        self.inner.refs.borrow().clone()
    }

    // ------------------------------------------------------------------
    // Cancellation
    // ------------------------------------------------------------------

    /// The token guarding the current request and pending debounced calls.
    pub fn abort_token(&self) -> CancellationToken {
        self.inner.abort.borrow().clone()
    }

    /// Cancel the current token and install a fresh one.
    pub fn renew_abort(&self) -> CancellationToken {
        let fresh = CancellationToken::new();
        let previous = self.inner.abort.replace(fresh.clone());
        previous.cancel();
        fresh
    }

    /// Cancel everything in flight for this scope.
    pub fn abort(&self) {
        self.inner.abort.borrow().cancel();
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("element", &self.inner.element)
            .field("record", &*self.inner.record.borrow())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn scope() -> Scope {
        Scope::new(None, Rc::new(Tracker::new()))
    }

    /// A binding that copies `from` into a shared cell every time it runs.
    fn mirror(scope: &Scope, from: &'static str) -> (Binding, Rc<RefCell<Value>>) {
        let seen = Rc::new(RefCell::new(Value::Null));
        let (s, out) = (scope.clone(), seen.clone());
        let binding = Binding::new(None, move || {
            *out.borrow_mut() = s.get(from).unwrap_or_default();
        });
        binding.execute(scope.tracker());
        (binding, seen)
    }

    #[test]
    fn write_reruns_dependents_synchronously() {
        let scope = scope();
        scope.extend([("count".to_string(), Value::from(0))]);
        let (binding, seen) = mirror(&scope, "count");

        scope.set("count", Value::from(5));
        assert_eq!(*seen.borrow(), Value::from(5));
        assert_eq!(binding.run_count(), 2);
    }

    #[test]
    fn unchanged_writes_still_notify() {
        let scope = scope();
        scope.extend([("count".to_string(), Value::from(1))]);
        let (binding, _) = mirror(&scope, "count");

        scope.set("count", Value::from(1));
        scope.set("count", Value::from(1));
        assert_eq!(binding.run_count(), 3);
    }

    #[test]
    fn dependents_run_once_per_write_in_registration_order() {
        let scope = scope();
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut bindings = Vec::new();
        for label in ["first", "second", "third"] {
            let (s, o) = (scope.clone(), order.clone());
            let binding = Binding::new(None, move || {
                s.get("x");
                o.borrow_mut().push(label);
            });
            binding.execute(scope.tracker());
            bindings.push(binding);
        }
        order.borrow_mut().clear();

        scope.set("x", Value::from(1));
        scope.set("x", Value::from(2));
        assert_eq!(*order.borrow(), ["first", "second", "third", "first", "second", "third"]);
    }

    #[test]
    fn writing_an_unread_property_does_not_self_trigger() {
        let scope = scope();
        let (s, runs) = (scope.clone(), Rc::new(Cell::new(0)));
        let counter = runs.clone();
        let binding = Binding::new(None, move || {
            counter.set(counter.get() + 1);
            let a = s.get("a").unwrap_or_default().to_number();
            s.set("b", Value::from(a * 2.0));
        });
        binding.execute(scope.tracker());
        assert_eq!(runs.get(), 1);
        assert_eq!(scope.dependent_count("b"), 0);

        scope.set("a", Value::from(4));
        assert_eq!(runs.get(), 2);
        assert_eq!(scope.get_untracked("b"), Some(Value::from(8)));
    }

    #[test]
    fn self_writing_binding_reruns_once_per_write() {
        let scope = scope();
        scope.extend([("n".to_string(), Value::from(0))]);
        let s = scope.clone();
        let binding = Binding::new(None, move || {
            let n = s.get("n").unwrap_or_default().to_number();
            s.set("n", Value::from(n + 1.0));
        });
        binding.execute(scope.tracker());
        assert_eq!(scope.get_untracked("n"), Some(Value::from(1)));

        scope.set("n", Value::from(10));
        assert_eq!(binding.run_count(), 2);
        assert_eq!(scope.get_untracked("n"), Some(Value::from(11)));
    }

    #[test]
    fn fan_out_does_not_misattribute_reads() {
        let scope = scope();
        // `writer` reads `a` and writes `b`; `reader` reads `b` and `c`.
        let s = scope.clone();
        let writer = Binding::new(None, move || {
            let a = s.get("a").unwrap_or_default();
            s.set("b", a);
        });
        let s = scope.clone();
        let reader = Binding::new(None, move || {
            s.get("b");
            s.get("c");
        });
        reader.execute(scope.tracker());
        writer.execute(scope.tracker());

        // The reader's read of `c` during the fan-out belongs to the reader.
        assert_eq!(scope.dependent_count("c"), 1);
        assert_eq!(scope.dependent_count("a"), 1);
        scope.set("c", Value::from(1));
        assert_eq!(writer.run_count(), 1);
        assert_eq!(reader.run_count(), 3);
    }

    #[test]
    fn disposed_bindings_are_pruned() {
        let scope = scope();
        let el = NodeId(7);
        let s = scope.clone();
        let binding = Binding::new(Some(el), move || {
            s.get("x");
        });
        binding.execute(scope.tracker());
        assert_eq!(scope.dependent_count("x"), 1);

        scope.dispose_bindings_for(el);
        assert!(binding.is_disposed());
        assert_eq!(scope.dependent_count("x"), 0);
        scope.set("x", Value::from(1));
        assert_eq!(binding.run_count(), 1);
    }

    #[test]
    fn renew_abort_cancels_previous_token() {
        let scope = scope();
        let first = scope.abort_token();
        let second = scope.renew_abort();
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
        scope.abort();
        assert!(second.is_cancelled());
    }

    #[test]
    fn fetching_flag_starts_false() {
        assert_eq!(scope().get(FETCHING), Some(Value::Bool(false)));
    }
}
