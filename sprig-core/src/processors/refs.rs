use super::query_attr;
use crate::dom::NodeId;
use crate::runtime::Runtime;

/// Register every `sp-ref` element in its scope's ref table.
pub(super) fn process(rt: &Runtime, base: NodeId) {
    let attr = rt.config().attr("ref");
    for el in query_attr(rt, base, &attr) {
        let Some(name) = rt.dom().attr(el, &attr).filter(|name| !name.trim().is_empty()) else {
            continue;
        };
        rt.scope_for(el).set_ref(name.trim(), el);
    }
}
