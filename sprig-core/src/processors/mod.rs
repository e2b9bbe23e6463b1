//! Binding Processors
//!
//! Initialization scans a subtree for declaring attributes and wires each
//! declaration into the reactive store. Processors run in a fixed order so
//! later ones can rely on earlier ones:
//!
//! 1. `sp-data` creates scopes.
//! 2. `sp-ref` registers named elements.
//! 3. `sp-form` syncs named inputs into the scope.
//! 4. `sp-bind` binds properties and attaches event listeners.
//! 5. `sp-class` toggles classes.
//!
//! Elements inside an `sp-ignore` boundary (the boundary element included)
//! are skipped by every processor.

mod bind;
mod class;
mod data;
mod form;
mod modifiers;
mod refs;

pub use modifiers::{EventKey, Modifier};

use indexmap::IndexMap;

use crate::dom::NodeId;
use crate::expr;
use crate::runtime::Runtime;
use crate::value::{Function, Value};

/// Initialize the subtree rooted at `base`, `base` included.
pub(crate) fn init(rt: &Runtime, base: NodeId) {
    data::process(rt, base);
    refs::process(rt, base);
    form::process(rt, base);
    process_bindings(rt, base, "bind", bind::apply);
    process_bindings(rt, base, "class", class::apply);
}

/// Elements under `base` (inclusive) that carry `attr` and are not inside
/// an ignore boundary, in document order.
fn query_attr(rt: &Runtime, base: NodeId, attr: &str) -> Vec<NodeId> {
    let ignore = rt.config().attr("ignore");
    let doc = rt.dom().borrow();
    doc.elements_in(base)
        .into_iter()
        .filter(|el| doc.has_attr(*el, attr))
        .filter(|el| doc.closest_with_attr(*el, &ignore).is_none())
        .collect()
}

/// Evaluate the declaration on every element carrying `sp-<name>` and hand
/// each entry to `handler`. Every processed element then receives a
/// non-bubbling `spinit`.
fn process_bindings(rt: &Runtime, base: NodeId, name: &str, handler: fn(&Runtime, NodeId, &str, Function)) {
    let attr = rt.config().attr(name);
    for el in query_attr(rt, base, &attr) {
        let Some(source) = rt.dom().attr(el, &attr) else {
            continue;
        };
        let scope = rt.scope_for(el);
        for (key, function) in expr::evaluate_deferred(rt, &source, &scope, Some(el)) {
            handler(rt, el, &key, function);
        }
        rt.dispatch(el, "init", Value::Object(IndexMap::new()), false);
    }
}
