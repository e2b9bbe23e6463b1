//! Runtime
//!
//! The runtime is the central coordinator. It owns the live document, the
//! tracker, every scope and the collaborators (transport and key-value
//! store), and it is the handle every processor, helper and async task goes
//! through.
//!
//! # How It Works
//!
//! 1. [`Runtime::start`] initializes the document body: scopes are created
//!    for `sp-data` elements, then refs, forms, bindings and class toggles
//!    are processed.
//!
//! 2. Bindings run once immediately and again whenever a scope property
//!    they read is written. Event listeners run handlers with the element
//!    slot of the tracker set.
//!
//! 3. Requests run as local tasks (`tokio::task::spawn_local`). Decoded
//!    fragments are swapped into the document, and inserted markup is
//!    initialized again.
//!
//! # Ownership
//!
//! The runtime is `!Send` and lives on one thread inside a
//! `tokio::task::LocalSet`. Everything it hands out (listeners, bindings,
//! helper closures, tasks) holds a [`WeakRuntime`], so dropping the last
//! [`Runtime`] tears the whole graph down.

pub(crate) mod helpers;
mod storage;

pub use storage::{KeyValueStore, MemoryStore};

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use indexmap::IndexMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};

use crate::config::RuntimeConfig;
use crate::dom::{Document, Dom, Event, EventTarget, ListenerId, NodeId};
use crate::error::ExprError;
use crate::expr::{parse_object, ObjectExpr};
use crate::fetch::{HttpTransport, Transport};
use crate::processors;
use crate::reactive::{Binding, Scope, Tracker};
use crate::value::{Function, Value};

type FrameCallback = Box<dyn FnOnce()>;

/// Per-element resources released when the element is swapped out.
#[derive(Default)]
struct ElementState {
    bindings: Vec<Binding>,
    window_listeners: Vec<ListenerId>,
    debounce: Option<CancellationToken>,
}

struct RuntimeInner {
    config: RuntimeConfig,
    dom: Dom,
    tracker: Rc<Tracker>,
    scopes: RefCell<HashMap<NodeId, Scope>>,
    detached: Scope,
    transport: Rc<dyn Transport>,
    store: Rc<dyn KeyValueStore>,
    helpers: IndexMap<String, Function>,
    elements: RefCell<HashMap<NodeId, ElementState>>,
    frames: RefCell<VecDeque<FrameCallback>>,
    compiled: RefCell<HashMap<String, Rc<ObjectExpr>>>,
    persisted: RefCell<HashSet<(Option<NodeId>, String)>>,
}

/// Handle to a runtime. Clones share state.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

/// Non-owning handle to a runtime.
#[derive(Clone)]
pub struct WeakRuntime(Weak<RuntimeInner>);

impl WeakRuntime {
    pub fn upgrade(&self) -> Option<Runtime> {
        self.0.upgrade().map(|inner| Runtime { inner })
    }
}

/// Builder for a [`Runtime`] with non-default collaborators.
#[derive(Default)]
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    transport: Option<Rc<dyn Transport>>,
    store: Option<Rc<dyn KeyValueStore>>,
    helpers: IndexMap<String, Function>,
}

impl RuntimeBuilder {
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Rc::new(transport));
        self
    }

    pub fn store(mut self, store: impl KeyValueStore + 'static) -> Self {
        self.store = Some(Rc::new(store));
        self
    }

    /// Make a host function callable from expressions under `name`.
    /// Built-in helpers take precedence.
    pub fn helper(mut self, name: &str, function: Function) -> Self {
        self.helpers.insert(name.to_string(), function);
        self
    }

    pub fn build(self, document: Document) -> Runtime {
        let tracker = Rc::new(Tracker::new());
        let detached = Scope::new(None, tracker.clone());
        Runtime {
            inner: Rc::new(RuntimeInner {
                config: self.config,
                dom: Dom::new(document),
                tracker,
                scopes: RefCell::new(HashMap::new()),
                detached,
                transport: self
                    .transport
                    .unwrap_or_else(|| Rc::new(HttpTransport::new())),
                store: self.store.unwrap_or_else(|| Rc::new(MemoryStore::new())),
                helpers: self.helpers,
                elements: RefCell::new(HashMap::new()),
                frames: RefCell::new(VecDeque::new()),
                compiled: RefCell::new(HashMap::new()),
                persisted: RefCell::new(HashSet::new()),
            }),
        }
    }
}

impl Runtime {
    /// Create a runtime with the default configuration and collaborators.
    pub fn new(document: Document) -> Self {
        Self::builder().build(document)
    }

    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::default()
    }

    pub fn downgrade(&self) -> WeakRuntime {
        WeakRuntime(Rc::downgrade(&self.inner))
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    pub fn dom(&self) -> &Dom {
        &self.inner.dom
    }

    pub fn tracker(&self) -> &Rc<Tracker> {
        &self.inner.tracker
    }

    pub fn transport(&self) -> Rc<dyn Transport> {
        self.inner.transport.clone()
    }

    pub fn store(&self) -> &Rc<dyn KeyValueStore> {
        &self.inner.store
    }

    /// Initialize the whole document body.
    pub fn start(&self) {
        self.init(self.inner.dom.body());
    }

    /// Initialize the subtree rooted at `base`, including `base` itself.
    pub fn init(&self, base: NodeId) {
        processors::init(self, base);
    }

    // ------------------------------------------------------------------
    // Scopes
    // ------------------------------------------------------------------

    /// The scope declared on `element` itself, if any.
    pub fn scope_at(&self, element: NodeId) -> Option<Scope> {
        self.inner.scopes.borrow().get(&element).cloned()
    }

    /// The nearest scope enclosing `element`, or the detached fallback.
    pub fn scope_for(&self, element: NodeId) -> Scope {
        let owner = self
            .inner
            .dom
            .borrow()
            .closest_with_attr(element, &self.inner.config.attr("data"));
        owner
            .and_then(|owner| self.scope_at(owner))
            .unwrap_or_else(|| self.inner.detached.clone())
    }

    /// The scope used for elements outside any declared scope.
    pub fn detached_scope(&self) -> &Scope {
        &self.inner.detached
    }

    pub fn scope_count(&self) -> usize {
        self.inner.scopes.borrow().len()
    }

    pub(crate) fn register_scope(&self, element: NodeId, scope: Scope) {
        let previous = self.inner.scopes.borrow_mut().insert(element, scope);
        drop(previous);
    }

    // ------------------------------------------------------------------
    // Bindings and element resources
    // ------------------------------------------------------------------

    /// Create a binding owned by `element` and run it once.
    pub fn bind(&self, element: NodeId, run: impl Fn() + 'static) -> Binding {
        let binding = Binding::new(Some(element), run);
        self.inner
            .elements
            .borrow_mut()
            .entry(element)
            .or_default()
            .bindings
            .push(binding.clone());
        binding.execute(&self.inner.tracker);
        binding
    }

    /// Record that `element` carries reactive behaviour, so it receives the
    /// destroy notification when swapped out.
    pub(crate) fn mark_bound(&self, element: NodeId) {
        self.inner.elements.borrow_mut().entry(element).or_default();
    }

    pub(crate) fn track_window_listener(&self, element: NodeId, listener: ListenerId) {
        self.inner
            .elements
            .borrow_mut()
            .entry(element)
            .or_default()
            .window_listeners
            .push(listener);
    }

    /// Number of live bindings owned by `element`.
    pub fn binding_count(&self, element: NodeId) -> usize {
        self.inner
            .elements
            .borrow()
            .get(&element)
            .map(|state| state.bindings.iter().filter(|b| !b.is_disposed()).count())
            .unwrap_or(0)
    }

    /// Release everything inside the subtree rooted at `root`: bound
    /// elements receive the destroy notification and lose their bindings,
    /// window listeners and pending debounced calls; scopes anchored in the
    /// subtree are dropped along with their `$persist` registrations.
    pub(crate) fn teardown(&self, root: NodeId) {
        let elements = self.inner.dom.borrow().elements_in(root);
        for element in elements {
            let state = self.inner.elements.borrow_mut().remove(&element);
            if let Some(state) = state {
                self.dispatch(element, "destroy", Value::Object(IndexMap::new()), false);
                for binding in &state.bindings {
                    binding.dispose();
                }
                let mut doc = self.inner.dom.borrow_mut();
                for listener in state.window_listeners {
                    doc.remove_listener(EventTarget::Window, listener);
                }
                if let Some(token) = state.debounce {
                    token.cancel();
                }
            }

            let scope = self.inner.scopes.borrow_mut().remove(&element);
            if let Some(scope) = scope {
                debug!(element = element.raw(), "scope discarded");
                self.inner
                    .persisted
                    .borrow_mut()
                    .retain(|(owner, _)| *owner != Some(element));
                drop(scope);
            }
        }
    }

    // ------------------------------------------------------------------
    // Handlers
    // ------------------------------------------------------------------

    /// Call `function` with `element` as the current element. Errors are
    /// logged, never propagated.
    pub fn invoke(&self, element: NodeId, function: &Function, args: Vec<Value>) -> Option<Value> {
        let _element = self.inner.tracker.enter_element(Some(element));
        match function.call(self, args) {
            Ok(value) => Some(value),
            Err(err) => {
                error!(element = element.raw(), %err, "handler failed");
                None
            }
        }
    }

    /// Call `function` after `delay`, replacing any call still pending for
    /// `element`. The call is dropped if the element's scope aborts first.
    pub(crate) fn debounce(&self, element: NodeId, function: Function, args: Vec<Value>, delay: Duration) {
        let token = self.scope_for(element).abort_token().child_token();
        let previous = self
            .inner
            .elements
            .borrow_mut()
            .entry(element)
            .or_default()
            .debounce
            .replace(token.clone());
        if let Some(previous) = previous {
            previous.cancel();
        }

        let rt = self.downgrade();
        tokio::task::spawn_local(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    trace!(element = element.raw(), "debounced call cancelled");
                }
                _ = tokio::time::sleep(delay) => {
                    if let Some(rt) = rt.upgrade() {
                        rt.invoke(element, &function, args);
                    }
                }
            }
        });
    }

    /// Dispatch a runtime event (`name` gets the event prefix) on `element`.
    pub fn dispatch(&self, element: NodeId, name: &str, detail: Value, bubbles: bool) -> Event {
        let event = Event::custom(&self.inner.config.event(name), detail, bubbles);
        self.inner.dom.dispatch(element, event)
    }

    /// A host-registered helper.
    pub(crate) fn helper(&self, name: &str) -> Option<Function> {
        self.inner.helpers.get(name).cloned()
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Load `name` from the key-value store and keep the store updated on
    /// every later write. The value returned is the stored one, else the
    /// scope's current value, else `fallback`.
    pub(crate) fn persist(&self, scope: &Scope, element: Option<NodeId>, name: &str, fallback: Value) -> Value {
        let stored = self.inner.store.get(name).map(|json| Value::from_json(&json));
        let value = match stored {
            Some(value) => {
                if scope.contains(name) {
                    scope.set(name, value.clone());
                }
                value
            }
            None => scope.get_untracked(name).unwrap_or(fallback),
        };

        let fresh = self
            .inner
            .persisted
            .borrow_mut()
            .insert((scope.element(), name.to_string()));
        if fresh {
            let weak = scope.downgrade();
            let store = self.inner.store.clone();
            let key = name.to_string();
            let write_back = move || {
                let Some(scope) = weak.upgrade() else {
                    return;
                };
                if let Some(value) = scope.get(&key) {
                    store.set(&key, value.to_json());
                }
            };
            match element {
                Some(element) => {
                    self.bind(element, write_back);
                }
                None => Binding::new(None, write_back).execute(&self.inner.tracker),
            }
        }

        value
    }

    // ------------------------------------------------------------------
    // Frames
    // ------------------------------------------------------------------

    /// Queue `callback` for the next animation frame.
    pub fn request_frame(&self, callback: impl FnOnce() + 'static) {
        self.inner.frames.borrow_mut().push_back(Box::new(callback));
    }

    /// Run the callbacks queued before this call. Callbacks queued while
    /// running wait for the next frame. Returns how many ran.
    pub fn run_frame(&self) -> usize {
        let callbacks: Vec<FrameCallback> = self.inner.frames.borrow_mut().drain(..).collect();
        let count = callbacks.len();
        for callback in callbacks {
            callback();
        }
        count
    }

    pub fn pending_frames(&self) -> usize {
        self.inner.frames.borrow().len()
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    /// Parse a declaration, reusing the cached AST for repeated sources.
    pub fn compile(&self, source: &str) -> Result<Rc<ObjectExpr>, ExprError> {
        if let Some(object) = self.inner.compiled.borrow().get(source) {
            return Ok(object.clone());
        }
        let object = Rc::new(parse_object(source)?);
        self.inner
            .compiled
            .borrow_mut()
            .insert(source.to_string(), object.clone());
        Ok(object)
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.inner.config)
            .field("scopes", &self.inner.scopes.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn runtime(html: &str) -> Runtime {
        Runtime::new(Document::from_body_html(html))
    }

    #[test]
    fn scope_lookup_walks_up_to_nearest_declaration() {
        let rt = runtime(r#"<div id="outer" sp-data="a: 1"><div id="inner" sp-data="b: 2"><p id="p"></p></div></div><p id="loose"></p>"#);
        rt.start();

        let dom = rt.dom();
        let p = dom.get_element_by_id("p").unwrap();
        let inner = dom.get_element_by_id("inner").unwrap();
        let loose = dom.get_element_by_id("loose").unwrap();

        assert_eq!(rt.scope_count(), 2);
        assert!(rt.scope_for(p).ptr_eq(&rt.scope_at(inner).unwrap()));
        assert!(rt.scope_for(loose).ptr_eq(rt.detached_scope()));
    }

    #[test]
    fn frames_run_in_order_and_defer_nested_requests() {
        let rt = runtime("");
        let log = Rc::new(RefCell::new(Vec::new()));

        let (l, weak) = (log.clone(), rt.downgrade());
        rt.request_frame(move || {
            l.borrow_mut().push("first");
            let l = l.clone();
            if let Some(rt) = weak.upgrade() {
                rt.request_frame(move || l.borrow_mut().push("nested"));
            }
        });
        let l = log.clone();
        rt.request_frame(move || l.borrow_mut().push("second"));

        assert_eq!(rt.run_frame(), 2);
        assert_eq!(*log.borrow(), ["first", "second"]);
        assert_eq!(rt.pending_frames(), 1);
        assert_eq!(rt.run_frame(), 1);
        assert_eq!(*log.borrow(), ["first", "second", "nested"]);
    }

    #[test]
    fn teardown_forgets_persisted_registrations() {
        let rt = runtime(r#"<div id="box"><div id="s" sp-data="theme: $persist('theme', 'light')"></div></div>"#);
        rt.start();
        assert_eq!(rt.inner.persisted.borrow().len(), 1);

        let box_ = rt.dom().get_element_by_id("box").unwrap();
        rt.teardown(box_);
        assert!(rt.inner.persisted.borrow().is_empty());
        assert_eq!(rt.scope_count(), 0);
    }

    #[test]
    fn compile_caches_by_source() {
        let rt = runtime("");
        let a = rt.compile("x: 1").unwrap();
        let b = rt.compile("x: 1").unwrap();
        assert!(Rc::ptr_eq(&a, &b));
        assert!(rt.compile("x: ").is_err());
    }

    #[test]
    fn bind_runs_immediately_and_is_released_on_teardown() {
        let rt = runtime(r#"<div id="box"><span id="s"></span></div>"#);
        let span = rt.dom().get_element_by_id("s").unwrap();
        let box_ = rt.dom().get_element_by_id("box").unwrap();
        let runs = Rc::new(Cell::new(0));

        let counter = runs.clone();
        let binding = rt.bind(span, move || counter.set(counter.get() + 1));
        assert_eq!(runs.get(), 1);
        assert_eq!(rt.binding_count(span), 1);

        rt.teardown(box_);
        assert!(binding.is_disposed());
        assert_eq!(rt.binding_count(span), 0);
    }

    #[test]
    fn invoke_sets_current_element_and_swallows_errors() {
        let rt = runtime(r#"<p id="p"></p>"#);
        let p = rt.dom().get_element_by_id("p").unwrap();
        let seen = Rc::new(Cell::new(None));

        let s = seen.clone();
        let observe = Function::native("observe", move |rt, _| {
            s.set(rt.tracker().current_element());
            Ok(Value::Null)
        });
        assert_eq!(rt.invoke(p, &observe, vec![]), Some(Value::Null));
        assert_eq!(seen.get(), Some(p));
        assert_eq!(rt.tracker().current_element(), None);

        let failing = Function::native("fail", |_, _| Err(crate::error::EvalError::ScopeGone));
        assert_eq!(rt.invoke(p, &failing, vec![]), None);
    }
}
