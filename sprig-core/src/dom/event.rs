//! DOM Events
//!
//! Events are dispatched to a target element and, when they bubble, to each
//! ancestor and finally to the window. Listeners may stop propagation or
//! prevent the default action.

use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

use super::NodeId;
use crate::value::Value;

/// Unique identifier for a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}

/// Where a listener is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTarget {
    Window,
    Node(NodeId),
}

pub type Handler = Rc<dyn Fn(&mut Event)>;

/// A registered event listener.
#[derive(Clone)]
pub struct Listener {
    pub(crate) id: ListenerId,
    pub(crate) event: String,
    pub(crate) once: bool,
    pub(crate) handler: Handler,
}

/// An event in flight.
#[derive(Debug, Clone)]
pub struct Event {
    name: String,
    detail: Value,
    bubbles: bool,
    target: Option<NodeId>,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl Event {
    /// A bubbling event without detail, like a user `click` or `input`.
    pub fn new(name: &str) -> Self {
        Self::custom(name, Value::Null, true)
    }

    pub fn custom(name: &str, detail: Value, bubbles: bool) -> Self {
        Self {
            name: name.to_string(),
            detail,
            bubbles,
            target: None,
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn detail(&self) -> &Value {
        &self.detail
    }

    pub fn bubbles(&self) -> bool {
        self.bubbles
    }

    pub fn target(&self) -> Option<NodeId> {
        self.target
    }

    pub(crate) fn set_target(&mut self, target: NodeId) {
        self.target = Some(target);
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    /// The object handed to expression handlers as their first argument.
    pub fn to_value(&self) -> Value {
        let mut map = IndexMap::new();
        map.insert("type".to_string(), Value::String(self.name.clone()));
        map.insert(
            "target".to_string(),
            self.target.map(Value::Element).unwrap_or_default(),
        );
        map.insert("detail".to_string(), self.detail.clone());
        Value::Object(map)
    }
}
