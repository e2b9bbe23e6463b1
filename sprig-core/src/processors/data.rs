use tracing::debug;

use super::query_attr;
use crate::dom::NodeId;
use crate::expr;
use crate::reactive::Scope;
use crate::runtime::Runtime;

/// Create a scope for every `sp-data` element.
///
/// The declaration is evaluated against the new, still empty scope, so the
/// arrow functions it contains read and write that scope. Evaluation runs
/// untracked with the element slot set.
pub(super) fn process(rt: &Runtime, base: NodeId) {
    let attr = rt.config().attr("data");
    for el in query_attr(rt, base, &attr) {
        let source = rt.dom().attr(el, &attr).unwrap_or_default();
        let scope = Scope::new(Some(el), rt.tracker().clone());

        let values = rt.tracker().untracked(|| {
            rt.tracker()
                .run_with_element(el, || expr::evaluate(rt, &source, &scope, Some(el)))
        });
        scope.extend(values);

        rt.register_scope(el, scope);
        rt.mark_bound(el);
        debug!(element = el.raw(), source = %source, "scope created");
    }
}
