//! `sp-bind` entries.
//!
//! An event key (`onclick.prevent`) attaches a listener. Any other key is a
//! property path (`textContent`, `class.open`, `style.width`) kept in sync
//! by a binding.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use indexmap::IndexMap;
use tracing::error;

use super::modifiers::{EventKey, Modifier};
use crate::dom::{Event, EventTarget, NodeId};
use crate::runtime::Runtime;
use crate::value::{Function, Value};

pub(super) fn apply(rt: &Runtime, el: NodeId, key: &str, function: Function) {
    match EventKey::parse(key) {
        Some(event) => listen(rt, el, event, function),
        None => bind_property(rt, el, key, function),
    }
}

fn listen(rt: &Runtime, el: NodeId, key: EventKey, function: Function) {
    let weak = rt.downgrade();
    let delay = key
        .debounce()
        .map(|ms| Duration::from_millis(ms.unwrap_or(rt.config().default_debounce_ms)));
    let (prevent, stop) = (key.has(Modifier::Prevent), key.has(Modifier::Stop));

    let handler = move |event: &mut Event| {
        let Some(rt) = weak.upgrade() else {
            return;
        };
        if prevent {
            event.prevent_default();
        }
        if stop {
            event.stop_propagation();
        }

        let (arg, controls) = handler_event(event);
        match delay {
            Some(delay) => rt.debounce(el, function.clone(), vec![arg], delay),
            None => {
                if let Some(Value::Pending(pending)) = rt.invoke(el, &function, vec![arg]) {
                    if let Some(future) = pending.take() {
                        tokio::task::spawn_local(future);
                    }
                }
                controls.apply(event);
            }
        }
    };

    let target = if key.has(Modifier::Window) {
        EventTarget::Window
    } else {
        EventTarget::Node(el)
    };
    let listener = rt
        .dom()
        .add_listener(target, &key.event, key.has(Modifier::Once), handler);
    if target == EventTarget::Window {
        rt.track_window_listener(el, listener);
    }
    rt.mark_bound(el);
}

/// Flags set by the handler through `e.preventDefault()` and
/// `e.stopPropagation()`.
#[derive(Default)]
struct EventControls {
    prevent: Rc<Cell<bool>>,
    stop: Rc<Cell<bool>>,
}

impl EventControls {
    fn apply(&self, event: &mut Event) {
        if self.prevent.get() {
            event.prevent_default();
        }
        if self.stop.get() {
            event.stop_propagation();
        }
    }
}

/// The event as handlers see it.
fn handler_event(event: &Event) -> (Value, EventControls) {
    let controls = EventControls::default();
    let mut object = match event.to_value() {
        Value::Object(object) => object,
        _ => IndexMap::new(),
    };

    let prevent = controls.prevent.clone();
    object.insert(
        "preventDefault".to_string(),
        Value::Function(Function::native("preventDefault", move |_, _| {
            prevent.set(true);
            Ok(Value::Null)
        })),
    );
    let stop = controls.stop.clone();
    object.insert(
        "stopPropagation".to_string(),
        Value::Function(Function::native("stopPropagation", move |_, _| {
            stop.set(true);
            Ok(Value::Null)
        })),
    );

    (Value::Object(object), controls)
}

fn bind_property(rt: &Runtime, el: NodeId, path: &str, function: Function) {
    let weak = rt.downgrade();
    let path = path.to_string();
    // Bumped on every run, so only the latest asynchronous value lands.
    let generation = Rc::new(Cell::new(0u64));

    rt.bind(el, move || {
        let Some(rt) = weak.upgrade() else {
            return;
        };
        let run = generation.get() + 1;
        generation.set(run);

        match function.call(&rt, Vec::new()) {
            Ok(Value::Pending(pending)) => {
                let Some(future) = pending.take() else {
                    return;
                };
                let (weak, path, generation) = (rt.downgrade(), path.clone(), generation.clone());
                tokio::task::spawn_local(async move {
                    let value = future.await;
                    if generation.get() != run {
                        return;
                    }
                    if let Some(rt) = weak.upgrade() {
                        rt.dom().borrow_mut().assign_path(el, &path, value);
                    }
                });
            }
            Ok(value) => rt.dom().borrow_mut().assign_path(el, &path, value),
            Err(err) => error!(element = el.raw(), path = %path, %err, "binding failed"),
        }
    });
}
