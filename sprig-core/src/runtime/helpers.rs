//! Helper Members
//!
//! The `$`-prefixed names every expression can use. They resolve after arrow
//! parameters and scope properties, so a scope may shadow a helper.
//!
//! Helpers address "this element" through the tracker's element slot (set
//! while a handler runs), falling back to the element the expression was
//! declared on, then to the scope's own element.

use std::time::Duration;

use crate::dom::NodeId;
use crate::error::EvalError;
use crate::fetch::payload;
use crate::reactive::Scope;
use crate::runtime::Runtime;
use crate::value::{Function, Value};

/// Resolve `name` as a helper, then as a host-registered helper.
pub(crate) fn resolve(rt: &Runtime, scope: &Scope, this: Option<NodeId>, name: &str) -> Option<Value> {
    let element = rt
        .tracker()
        .current_element()
        .or(this)
        .or(scope.element())
        .unwrap_or_else(|| rt.dom().body());

    let helper = match name {
        "$el" => return Some(Value::Element(element)),
        "$refs" => {
            let refs = scope
                .refs()
                .into_iter()
                .map(|(name, el)| (name, Value::Element(el)))
                .collect();
            return Some(Value::Object(refs));
        }
        "$get" => request(scope, element, name, Some("GET")),
        "$post" => request(scope, element, name, Some("POST")),
        "$fetch" => request(scope, element, name, None),
        "$debounce" => Function::native(name, move |rt, args| {
            let mut args = args.into_iter();
            let function = match args.next() {
                Some(Value::Function(function)) => function,
                other => {
                    return Err(EvalError::Type(format!(
                        "$debounce expects a function, got {}",
                        other.unwrap_or_default().type_name()
                    )))
                }
            };
            let ms = args
                .next()
                .map(|ms| ms.to_number())
                .filter(|ms| ms.is_finite() && *ms >= 0.0)
                .map_or(rt.config().default_debounce_ms, |ms| ms as u64);
            rt.debounce(element, function, Vec::new(), Duration::from_millis(ms));
            Ok(Value::Null)
        }),
        "$dispatch" => Function::native(name, move |rt, args| {
            let mut args = args.into_iter();
            let event = args.next().unwrap_or_default().to_display_string();
            let detail = args.next().unwrap_or_default();
            rt.dispatch(element, &event, detail, true);
            Ok(Value::Null)
        }),
        "$data" => {
            let scope = scope.downgrade();
            Function::native(name, move |rt, _| {
                let scope = scope.upgrade().ok_or(EvalError::ScopeGone)?;
                Ok(Value::Object(payload::scope_data(rt, &scope)))
            })
        }
        "$dataset" => Function::native(name, move |rt, _| {
            Ok(Value::Object(payload::dataset(rt, element)))
        }),
        "$persist" => {
            let scope = scope.downgrade();
            Function::native(name, move |rt, args| {
                let scope = scope.upgrade().ok_or(EvalError::ScopeGone)?;
                let mut args = args.into_iter();
                let key = args.next().unwrap_or_default().to_display_string();
                let fallback = args.next().unwrap_or_default();
                Ok(rt.persist(&scope, Some(element), &key, fallback))
            })
        }
        _ => return rt.helper(name).map(Value::Function),
    };

    Some(Value::Function(helper))
}

/// `$get(url, data?)`, `$post(url, data?)` and `$fetch(url, method, data?)`.
fn request(scope: &Scope, element: NodeId, name: &str, method: Option<&'static str>) -> Function {
    let scope = scope.downgrade();
    Function::native(name, move |rt, args| {
        let scope = scope.upgrade().ok_or(EvalError::ScopeGone)?;
        let mut args = args.into_iter();
        let url = args.next().unwrap_or_default().to_display_string();
        let method = match method {
            Some(method) => method.to_string(),
            None => args.next().unwrap_or_default().to_display_string(),
        };
        let data = args.next();
        rt.request(&scope, element, &url, &method, data);
        Ok(Value::Null)
    })
}
