//! Reactive Store
//!
//! This module implements the reactive core: scopes, bindings and the
//! tracker that connects them.
//!
//! # Concepts
//!
//! ## Scopes
//!
//! A Scope is a record of named values anchored to one element. Reads made
//! while a binding executes register that binding as a dependent of the
//! property; writes re-run the dependents.
//!
//! ## Bindings
//!
//! A Binding is a side-effecting computation (set a property, toggle a
//! class) that runs once on creation and again whenever something it read
//! is written.
//!
//! ## Tracker
//!
//! The Tracker holds the "currently executing binding" and "current
//! element" slots. It is an explicit object shared by a runtime and its
//! scopes rather than ambient global state, which keeps the single-threaded
//! invariant visible: everything here is `Rc`/`RefCell` and `!Send`.
//!
//! # Implementation Notes
//!
//! Dependencies are discovered by running the computation, with no compile
//! step, the same "transparent reactivity" used by SolidJS and Vue. Unlike
//! a signal graph, dependencies are keyed by property name within a scope.

mod binding;
mod context;
mod scope;

pub use binding::{Binding, BindingId};
pub use context::{BindingFrame, ElementFrame, Tracker};
pub use scope::{Scope, WeakScope, FETCHING};
