//! Form sync.
//!
//! Named controls inside an `sp-form` element write a typed value into the
//! nearest scope on `input` and `change`, plus once at initialization.
//! Submit controls are disabled while the scope has a request in flight.

use super::query_attr;
use crate::dom::{Document, EventTarget, NodeId};
use crate::reactive::FETCHING;
use crate::runtime::Runtime;
use crate::value::Value;

pub(super) fn process(rt: &Runtime, base: NodeId) {
    let attr = rt.config().attr("form");
    for form in query_attr(rt, base, &attr) {
        let (inputs, submits) = {
            let doc = rt.dom().borrow();
            let descendants: Vec<NodeId> = doc.elements_in(form).into_iter().skip(1).collect();
            let inputs: Vec<NodeId> = descendants
                .iter()
                .copied()
                .filter(|el| doc.attr(*el, "name").is_some_and(|name| !name.is_empty()))
                .collect();
            let submits: Vec<NodeId> = descendants
                .into_iter()
                .filter(|el| is_submit_control(&doc, *el))
                .collect();
            (inputs, submits)
        };

        for input in inputs {
            sync_input(rt, input);
        }
        for submit in submits {
            bind_submit(rt, submit);
        }
    }
}

fn is_submit_control(doc: &Document, el: NodeId) -> bool {
    match doc.tag(el) {
        Some("button") => true,
        Some("input") => doc.attr(el, "type").is_some_and(|kind| kind.eq_ignore_ascii_case("submit")),
        _ => false,
    }
}

/// The value a control contributes, or `None` for an unchecked radio.
fn control_value(doc: &Document, el: NodeId) -> Option<Value> {
    let kind = doc.prop(el, "type").to_display_string();
    let value = match kind.as_str() {
        "checkbox" => Value::Bool(doc.prop(el, "checked").is_truthy()),
        "radio" => {
            if !doc.prop(el, "checked").is_truthy() {
                return None;
            }
            doc.prop(el, "value")
        }
        "file" => match doc.prop(el, "files") {
            files @ Value::Files(_) => files,
            _ => Value::Files(Vec::new()),
        },
        "number" | "range" => {
            let raw = doc.prop(el, "value").to_display_string();
            match raw.trim() {
                "" => Value::Null,
                trimmed => trimmed.parse::<f64>().map(Value::Number).unwrap_or(Value::Null),
            }
        }
        _ => Value::String(doc.prop(el, "value").to_display_string()),
    };
    Some(value)
}

fn sync_input(rt: &Runtime, input: NodeId) {
    let Some(name) = rt.dom().attr(input, "name") else {
        return;
    };
    let scope = rt.scope_for(input);

    let write = {
        let (rt, scope) = (rt.downgrade(), scope.downgrade());
        move || {
            let (Some(rt), Some(scope)) = (rt.upgrade(), scope.upgrade()) else {
                return;
            };
            let value = control_value(&rt.dom().borrow(), input);
            if let Some(value) = value {
                scope.set(&name, value);
            }
        }
    };

    write();
    for event in ["input", "change"] {
        let write = write.clone();
        rt.dom()
            .add_listener(EventTarget::Node(input), event, false, move |_| write());
    }
    rt.mark_bound(input);
}

fn bind_submit(rt: &Runtime, submit: NodeId) {
    let (weak_rt, scope) = (rt.downgrade(), rt.scope_for(submit).downgrade());
    rt.bind(submit, move || {
        let (Some(rt), Some(scope)) = (weak_rt.upgrade(), scope.upgrade()) else {
            return;
        };
        let fetching = scope.get(FETCHING).unwrap_or_default();
        rt.dom().set_prop(submit, "disabled", Value::Bool(fetching.is_truthy()));
    });
}
