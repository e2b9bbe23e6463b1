//! Dynamic values.
//!
//! Scope records, expression results and element properties all hold a
//! [`Value`]. The type mirrors the small set of shapes the runtime needs:
//! primitives, arrays and objects of them, element handles, file lists and
//! callables.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use futures_util::future::LocalBoxFuture;
use indexmap::IndexMap;

use crate::dom::NodeId;
use crate::error::EvalError;
use crate::expr::Closure;
use crate::runtime::Runtime;

/// A runtime value.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(IndexMap<String, Value>),
    /// Handle to an element in the live document.
    Element(NodeId),
    /// Names of the files selected in a file input.
    Files(Vec<String>),
    Function(Function),
    /// A value that resolves asynchronously.
    Pending(Pending),
}

/// Signature of a function implemented in Rust.
pub type NativeCall = dyn Fn(&Runtime, Vec<Value>) -> Result<Value, EvalError>;

/// Something that can be called from an expression.
#[derive(Clone)]
pub enum Function {
    /// An arrow function (or deferred entry) from an expression.
    Closure(Rc<Closure>),
    /// A helper implemented in Rust.
    Native(NativeFn),
}

/// A named Rust callable.
#[derive(Clone)]
pub struct NativeFn {
    name: Rc<str>,
    call: Rc<NativeCall>,
}

impl NativeFn {
    pub fn new<F>(name: &str, call: F) -> Self
    where
        F: Fn(&Runtime, Vec<Value>) -> Result<Value, EvalError> + 'static,
    {
        Self {
            name: Rc::from(name),
            call: Rc::new(call),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Function {
    /// Wrap a Rust closure as a callable value.
    pub fn native<F>(name: &str, call: F) -> Self
    where
        F: Fn(&Runtime, Vec<Value>) -> Result<Value, EvalError> + 'static,
    {
        Function::Native(NativeFn::new(name, call))
    }

    /// Invoke the function. Extra arguments are ignored and missing ones
    /// are `null`.
    pub fn call(&self, rt: &Runtime, args: Vec<Value>) -> Result<Value, EvalError> {
        match self {
            Function::Closure(closure) => closure.call(rt, args),
            Function::Native(native) => (native.call)(rt, args),
        }
    }

    /// Number of declared parameters (native functions report zero).
    pub fn arity(&self) -> usize {
        match self {
            Function::Closure(closure) => closure.arity(),
            Function::Native(_) => 0,
        }
    }
}

/// An asynchronously resolving value.
///
/// The future can be taken exactly once; whoever takes it is responsible
/// for awaiting it.
#[derive(Clone)]
pub struct Pending(Rc<RefCell<Option<LocalBoxFuture<'static, Value>>>>);

impl Pending {
    pub fn new(future: LocalBoxFuture<'static, Value>) -> Self {
        Self(Rc::new(RefCell::new(Some(future))))
    }

    pub fn take(&self) -> Option<LocalBoxFuture<'static, Value>> {
        self.0.borrow_mut().take()
    }
}

impl Value {
    /// JavaScript-style truthiness.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Element(_) => "element",
            Value::Files(_) => "file list",
            Value::Function(_) => "function",
            Value::Pending(_) => "pending value",
        }
    }

    /// Strings, numbers and booleans.
    pub fn is_primitive(&self) -> bool {
        matches!(self, Value::String(_) | Value::Number(_) | Value::Bool(_))
    }

    /// Values that survive a round trip through a request payload.
    pub fn is_serializable(&self) -> bool {
        match self {
            Value::Array(items) => items.iter().all(Value::is_primitive),
            other => other.is_primitive(),
        }
    }

    /// JavaScript-style numeric coercion.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse().unwrap_or(f64::NAN)
                }
            }
            _ => f64::NAN,
        }
    }

    /// JavaScript-style string coercion.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::String(s) => s.clone(),
            Value::Array(items) => items
                .iter()
                .map(Value::to_display_string)
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(_) => "[object Object]".to_string(),
            Value::Element(id) => format!("[element {}]", id.raw()),
            Value::Files(files) => files.join(","),
            Value::Function(_) => "[function]".to_string(),
            Value::Pending(_) => "[pending]".to_string(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Strict equality (`===`). Functions and pending values compare by
    /// identity.
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Element(a), Value::Element(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.strict_eq(y))
            }
            (Value::Object(a), Value::Object(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| b.get(k).is_some_and(|w| v.strict_eq(w)))
            }
            (Value::Files(a), Value::Files(b)) => a == b,
            (Value::Function(Function::Closure(a)), Value::Function(Function::Closure(b))) => {
                Rc::ptr_eq(a, b)
            }
            (Value::Function(Function::Native(a)), Value::Function(Function::Native(b))) => {
                Rc::ptr_eq(&a.call, &b.call)
            }
            (Value::Pending(a), Value::Pending(b)) => Rc::ptr_eq(&a.0, &b.0),
            _ => false,
        }
    }

    /// Loose equality (`==`) for the supported primitive types.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Null, _) | (_, Value::Null) => false,
            (Value::String(_), Value::String(_)) => self.strict_eq(other),
            (a, b) if a.is_primitive() && b.is_primitive() => a.to_number() == b.to_number(),
            _ => self.strict_eq(other),
        }
    }

    /// Convert to JSON for persistence. Non-data values become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::String(s) => Json::String(s.clone()),
            Value::Array(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Object(map) => Json::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Value::Files(files) => {
                Json::Array(files.iter().cloned().map(Json::String).collect())
            }
            Value::Element(_) | Value::Function(_) | Value::Pending(_) => Json::Null,
        }
    }

    pub fn from_json(json: &serde_json::Value) -> Value {
        use serde_json::Value as Json;
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            Json::String(s) => Value::String(s.clone()),
            Json::Array(items) => Value::Array(items.iter().map(Value::from_json).collect()),
            Json::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }
}

/// Format a number the way JavaScript prints it for the common cases:
/// integral values without a fractional part.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let text = if n > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.strict_eq(other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Array(items) => f.debug_list().entries(items).finish(),
            Value::Object(map) => f.debug_map().entries(map).finish(),
            Value::Element(id) => write!(f, "Element({})", id.raw()),
            Value::Files(files) => f.debug_tuple("Files").field(files).finish(),
            Value::Function(Function::Native(native)) => write!(f, "[native {}]", native.name()),
            Value::Function(Function::Closure(_)) => write!(f, "[function]"),
            Value::Pending(_) => write!(f, "[pending]"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<NodeId> for Value {
    fn from(id: NodeId) -> Self {
        Value::Element(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_follows_js() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::from(0).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::Number(f64::NAN).is_truthy());
        assert!(Value::from("0").is_truthy());
        assert!(Value::Array(vec![]).is_truthy());
    }

    #[test]
    fn numbers_print_without_trailing_zero() {
        assert_eq!(Value::from(5).to_display_string(), "5");
        assert_eq!(Value::from(2.5).to_display_string(), "2.5");
        assert_eq!(Value::from(-3).to_display_string(), "-3");
    }

    #[test]
    fn loose_equality_coerces_primitives() {
        assert!(Value::from("5").loose_eq(&Value::from(5)));
        assert!(Value::from(true).loose_eq(&Value::from(1)));
        assert!(!Value::from("5").strict_eq(&Value::from(5)));
        assert!(!Value::Null.loose_eq(&Value::from(0)));
    }

    #[test]
    fn serializable_excludes_nested_values() {
        assert!(Value::from("a").is_serializable());
        assert!(Value::Array(vec![Value::from(1), Value::from("x")]).is_serializable());
        assert!(!Value::Array(vec![Value::Array(vec![])]).is_serializable());
        assert!(!Value::Null.is_serializable());
        assert!(!Value::Object(IndexMap::new()).is_serializable());
    }

    #[test]
    fn json_conversion_keeps_data() {
        let value = Value::Array(vec![Value::from(1), Value::from("two"), Value::from(false)]);
        assert_eq!(Value::from_json(&value.to_json()), value);
    }
}
