use tracing::error;

use crate::dom::NodeId;
use crate::runtime::Runtime;
use crate::value::Function;

/// `sp-class` entry: keep class `name` in sync with the truthiness of the
/// entry's value.
pub(super) fn apply(rt: &Runtime, el: NodeId, name: &str, function: Function) {
    let weak = rt.downgrade();
    let class = name.to_string();
    rt.bind(el, move || {
        let Some(rt) = weak.upgrade() else {
            return;
        };
        match function.call(&rt, Vec::new()) {
            Ok(value) => rt.dom().borrow_mut().toggle_class(el, &class, value.is_truthy()),
            Err(err) => error!(element = el.raw(), class = %class, %err, "class binding failed"),
        }
    });
}
