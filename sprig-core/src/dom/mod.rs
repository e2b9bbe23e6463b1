//! Live Document
//!
//! An arena DOM standing in for the host page. The runtime only needs a
//! handful of document capabilities (tree edits, attributes, properties,
//! events and serialization) and this module provides exactly those.
//!
//! # Borrowing
//!
//! The document sits behind a [`Dom`] handle (`Rc<RefCell<Document>>`).
//! Listener callbacks and bindings re-enter the document, so a borrow is
//! never held while user code runs: [`Dom::dispatch`] snapshots the
//! listeners for each node on the propagation path, releases the borrow and
//! only then invokes them.

mod document;
mod event;
mod node;
mod parse;

pub use document::{AdjacentPosition, Document};
pub use event::{Event, EventTarget, Handler, Listener, ListenerId};
pub use node::{dataset_attr, dataset_key, is_void_element, ElementData, Node, NodeData, NodeId};
pub use parse::parse_fragment;

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use crate::value::Value;

/// Shared handle to the live document.
#[derive(Clone)]
pub struct Dom(Rc<RefCell<Document>>);

impl Dom {
    pub fn new(document: Document) -> Self {
        Self(Rc::new(RefCell::new(document)))
    }

    pub fn borrow(&self) -> Ref<'_, Document> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Document> {
        self.0.borrow_mut()
    }

    /// Run `f` with shared access to the document.
    pub fn with<R>(&self, f: impl FnOnce(&Document) -> R) -> R {
        f(&self.0.borrow())
    }

    /// Run `f` with exclusive access to the document.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut Document) -> R) -> R {
        f(&mut self.0.borrow_mut())
    }

    pub fn body(&self) -> NodeId {
        self.borrow().body()
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.borrow().get_element_by_id(id)
    }

    pub fn prop(&self, id: NodeId, name: &str) -> Value {
        self.borrow().prop(id, name)
    }

    pub fn set_prop(&self, id: NodeId, name: &str, value: Value) {
        self.borrow_mut().set_prop(id, name, value);
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<String> {
        self.borrow().attr(id, name).map(String::from)
    }

    pub fn outer_html(&self, id: NodeId) -> String {
        self.borrow().outer_html(id)
    }

    pub fn add_listener<F>(&self, target: EventTarget, event: &str, once: bool, handler: F) -> ListenerId
    where
        F: Fn(&mut Event) + 'static,
    {
        self.borrow_mut()
            .add_listener(target, event, once, Rc::new(handler))
    }

    /// Dispatch `event` at `target`. Bubbling events visit every ancestor
    /// and then the window, unless a listener stops propagation. Returns the
    /// event so callers can inspect `default_prevented`.
    pub fn dispatch(&self, target: NodeId, mut event: Event) -> Event {
        event.set_target(target);

        let mut path = vec![EventTarget::Node(target)];
        if event.bubbles() {
            let doc = self.borrow();
            let mut current = doc.parent(target);
            while let Some(node) = current {
                if doc.is_element(node) {
                    path.push(EventTarget::Node(node));
                }
                current = doc.parent(node);
            }
            if doc.is_connected(target) {
                path.push(EventTarget::Window);
            }
        }

        for hop in path {
            let listeners = self.borrow_mut().take_listeners(hop, event.name());
            for listener in listeners {
                (listener.handler)(&mut event);
            }
            if event.propagation_stopped() {
                break;
            }
        }

        event
    }

    /// Dispatch an event on the window only.
    pub fn dispatch_window(&self, mut event: Event) -> Event {
        let listeners = self
            .borrow_mut()
            .take_listeners(EventTarget::Window, event.name());
        for listener in listeners {
            (listener.handler)(&mut event);
        }
        event
    }
}
