//! Expression Interpreter
//!
//! Walks the AST against a scope. Identifier lookup goes arrow parameters
//! first, then the scope record (a tracked read), then the helper table.
//! Assignments to identifiers write through the scope, so they notify
//! dependents exactly like any other write.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::ast::*;
use crate::dom::NodeId;
use crate::error::EvalError;
use crate::reactive::{Scope, WeakScope};
use crate::runtime::{helpers, Runtime};
use crate::value::{Function, Value};

/// Arrow parameters visible to a closure body.
pub(crate) struct Frame {
    vars: RefCell<IndexMap<String, Value>>,
    parent: Option<Rc<Frame>>,
}

impl Frame {
    fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.vars.borrow().get(name) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|parent| parent.lookup(name))
    }

    /// Assign to an existing parameter. Returns false if no frame declares
    /// `name`.
    fn assign(&self, name: &str, value: Value) -> bool {
        if let Some(slot) = self.vars.borrow_mut().get_mut(name) {
            *slot = value;
            return true;
        }
        self.parent
            .as_ref()
            .is_some_and(|parent| parent.assign(name, value))
    }
}

/// A callable produced by an arrow function or a deferred declaration
/// entry. It holds its scope weakly.
pub struct Closure {
    arrow: Rc<ArrowFn>,
    scope: WeakScope,
    this: Option<NodeId>,
    frame: Option<Rc<Frame>>,
}

impl Closure {
    pub fn new(arrow: Rc<ArrowFn>, scope: &Scope, this: Option<NodeId>) -> Self {
        Self {
            arrow,
            scope: scope.downgrade(),
            this,
            frame: None,
        }
    }

    /// A zero-parameter closure that evaluates `expr` when called.
    pub fn thunk(expr: Expr, scope: &Scope, this: Option<NodeId>) -> Self {
        let arrow = ArrowFn {
            params: Vec::new(),
            body: Body::Expr(expr),
        };
        Self::new(Rc::new(arrow), scope, this)
    }

    pub fn arity(&self) -> usize {
        self.arrow.params.len()
    }

    pub fn call(&self, rt: &Runtime, args: Vec<Value>) -> Result<Value, EvalError> {
        let scope = self.scope.upgrade().ok_or(EvalError::ScopeGone)?;

        let mut args = args.into_iter();
        let vars = self
            .arrow
            .params
            .iter()
            .map(|param| (param.clone(), args.next().unwrap_or_default()))
            .collect();
        let frame = Rc::new(Frame {
            vars: RefCell::new(vars),
            parent: self.frame.clone(),
        });

        let interp = Interpreter {
            rt,
            scope: &scope,
            this: self.this,
            frame: Some(frame),
        };
        match &self.arrow.body {
            Body::Expr(expr) => interp.eval(expr),
            Body::Block(statements) => {
                for statement in statements {
                    interp.eval(statement)?;
                }
                Ok(Value::Null)
            }
        }
    }
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("params", &self.arrow.params)
            .field("this", &self.this)
            .finish()
    }
}

pub(crate) struct Interpreter<'a> {
    pub(crate) rt: &'a Runtime,
    pub(crate) scope: &'a Scope,
    pub(crate) this: Option<NodeId>,
    pub(crate) frame: Option<Rc<Frame>>,
}

impl Interpreter<'_> {
    pub(crate) fn eval(&self, expr: &Expr) -> Result<Value, EvalError> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                Literal::Null => Value::Null,
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Number(n) => Value::Number(*n),
                Literal::String(s) => Value::String(s.clone()),
            }),
            Expr::Ident(name) => self.lookup(name),
            Expr::This => Ok(self.this.map(Value::Element).unwrap_or_default()),
            Expr::Array(items) => Ok(Value::Array(
                items.iter().map(|item| self.eval(item)).collect::<Result<_, _>>()?,
            )),
            Expr::Object(fields) => {
                let mut map = IndexMap::new();
                for (key, value) in fields {
                    map.insert(key.clone(), self.eval(value)?);
                }
                Ok(Value::Object(map))
            }
            Expr::Member { object, property } => {
                let target = self.eval(object)?;
                self.member(&target, property)
            }
            Expr::Index { object, index } => {
                let target = self.eval(object)?;
                let key = self.eval(index)?;
                self.index(&target, &key)
            }
            Expr::Call { callee, args } => self.call(callee, args),
            Expr::Unary { op, operand } => {
                let value = self.eval(operand)?;
                Ok(match op {
                    UnaryOp::Not => Value::Bool(!value.is_truthy()),
                    UnaryOp::Neg => Value::Number(-value.to_number()),
                    UnaryOp::Plus => Value::Number(value.to_number()),
                })
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                Ok(binary(*op, &left, &right))
            }
            Expr::Logical { op, left, right } => {
                let left = self.eval(left)?;
                match (op, left.is_truthy()) {
                    (LogicalOp::And, false) | (LogicalOp::Or, true) => Ok(left),
                    _ => self.eval(right),
                }
            }
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test)?.is_truthy() {
                    self.eval(consequent)
                } else {
                    self.eval(alternate)
                }
            }
            Expr::Assign { op, target, value } => {
                let rhs = self.eval(value)?;
                let result = match op {
                    AssignOp::Assign => rhs,
                    AssignOp::Add => binary(BinaryOp::Add, &self.eval(target)?, &rhs),
                    AssignOp::Sub => binary(BinaryOp::Sub, &self.eval(target)?, &rhs),
                };
                self.assign(target, result.clone())?;
                Ok(result)
            }
            Expr::Update { op, prefix, target } => {
                let old = self.eval(target)?.to_number();
                let new = match op {
                    UpdateOp::Increment => old + 1.0,
                    UpdateOp::Decrement => old - 1.0,
                };
                self.assign(target, Value::Number(new))?;
                Ok(Value::Number(if *prefix { new } else { old }))
            }
            Expr::Arrow(arrow) => Ok(Value::Function(Function::Closure(Rc::new(Closure {
                arrow: arrow.clone(),
                scope: self.scope.downgrade(),
                this: self.this,
                frame: self.frame.clone(),
            })))),
        }
    }

    fn lookup(&self, name: &str) -> Result<Value, EvalError> {
        if let Some(value) = self.frame.as_ref().and_then(|frame| frame.lookup(name)) {
            return Ok(value);
        }
        if self.scope.contains(name) {
            return Ok(self.scope.get(name).unwrap_or_default());
        }
        helpers::resolve(self.rt, self.scope, self.this, name).ok_or_else(|| EvalError::Undefined {
            name: name.to_string(),
        })
    }

    // ------------------------------------------------------------------
    // Assignment
    // ------------------------------------------------------------------

    fn assign(&self, target: &Expr, value: Value) -> Result<(), EvalError> {
        match target {
            Expr::Ident(name) => {
                let in_frame = self
                    .frame
                    .as_ref()
                    .is_some_and(|frame| frame.assign(name, value.clone()));
                if !in_frame {
                    self.scope.set(name, value);
                }
                Ok(())
            }
            Expr::Member { object, property } => {
                self.assign_key(object, Value::String(property.clone()), value)
            }
            Expr::Index { object, index } => {
                let key = self.eval(index)?;
                self.assign_key(object, key, value)
            }
            other => Err(EvalError::BadAssignment {
                target: other.describe(),
            }),
        }
    }

    /// Assign `object[key] = value`. Element targets write through the
    /// document; object and array targets are copied, modified and written
    /// back to where they came from.
    fn assign_key(&self, object: &Expr, key: Value, value: Value) -> Result<(), EvalError> {
        let key_text = key.to_display_string();

        if let Expr::Member {
            object: owner,
            property: group,
        } = object
        {
            if matches!(group.as_str(), "style" | "dataset" | "classList") {
                if let Value::Element(id) = self.eval(owner)? {
                    let path = format!("{group}.{key_text}");
                    self.rt.dom().borrow_mut().assign_path(id, &path, value);
                    return Ok(());
                }
            }
        }

        match self.eval(object)? {
            Value::Element(id) => {
                self.rt.dom().borrow_mut().set_prop(id, &key_text, value);
                Ok(())
            }
            Value::Object(mut map) => {
                map.insert(key_text, value);
                self.assign(object, Value::Object(map))
            }
            Value::Array(mut items) => {
                let index = key.to_number();
                if index < 0.0 || index.fract() != 0.0 || !index.is_finite() {
                    return Err(EvalError::Type(format!("invalid array index {key_text}")));
                }
                // Writes may replace an item or append one, never open a gap.
                if index > items.len() as f64 {
                    return Err(EvalError::Type(format!(
                        "array index {key_text} out of bounds for length {}",
                        items.len()
                    )));
                }
                let index = index as usize;
                match items.get_mut(index) {
                    Some(slot) => *slot = value,
                    None => items.push(value),
                }
                self.assign(object, Value::Array(items))
            }
            other => Err(EvalError::BadAssignment {
                target: format!("{}.{key_text} on {}", object.describe(), other.type_name()),
            }),
        }
    }

    // ------------------------------------------------------------------
    // Member access
    // ------------------------------------------------------------------

    fn member(&self, target: &Value, property: &str) -> Result<Value, EvalError> {
        Ok(match (target, property) {
            (Value::Null, _) => {
                return Err(EvalError::BadMember {
                    member: property.to_string(),
                    target: "null".to_string(),
                })
            }
            (Value::Object(map), _) => map.get(property).cloned().unwrap_or_default(),
            (Value::Array(items), "length") => Value::from(items.len() as f64),
            (Value::Files(files), "length") => Value::from(files.len() as f64),
            (Value::String(s), "length") => Value::from(s.chars().count() as f64),
            (Value::Element(id), _) => self.element_member(*id, property),
            _ => Value::Null,
        })
    }

    fn element_member(&self, id: NodeId, property: &str) -> Value {
        let doc = self.rt.dom().borrow();
        match property {
            "style" => Value::Object(
                doc.style_map(id)
                    .into_iter()
                    .map(|(k, v)| (k, Value::String(v)))
                    .collect(),
            ),
            "classList" => Value::Array(doc.class_list(id).into_iter().map(Value::String).collect()),
            "parentElement" => doc
                .parent(id)
                .filter(|parent| doc.is_element(*parent))
                .map(Value::Element)
                .unwrap_or_default(),
            "children" => Value::Array(
                doc.element_children(id)
                    .into_iter()
                    .map(Value::Element)
                    .collect(),
            ),
            _ => doc.prop(id, property),
        }
    }

    fn index(&self, target: &Value, key: &Value) -> Result<Value, EvalError> {
        let position = || {
            let n = key.to_number();
            (n >= 0.0 && n.fract() == 0.0).then_some(n as usize)
        };
        Ok(match target {
            Value::Array(items) => position()
                .and_then(|i| items.get(i).cloned())
                .unwrap_or_default(),
            Value::Files(files) => position()
                .and_then(|i| files.get(i).cloned())
                .map(Value::String)
                .unwrap_or_default(),
            Value::String(s) => position()
                .and_then(|i| s.chars().nth(i))
                .map(|ch| Value::String(ch.to_string()))
                .unwrap_or_default(),
            other => self.member(other, &key.to_display_string())?,
        })
    }

    // ------------------------------------------------------------------
    // Calls
    // ------------------------------------------------------------------

    fn call(&self, callee: &Expr, args: &[Expr]) -> Result<Value, EvalError> {
        if let Expr::Member { object, property } = callee {
            let receiver = self.eval(object)?;
            let args = self.eval_args(args)?;
            if let Value::Object(map) = &receiver {
                if let Some(Value::Function(function)) = map.get(property) {
                    return function.call(self.rt, args);
                }
            }
            return self.method(&receiver, property, args).ok_or_else(|| EvalError::NotCallable {
                callee: callee.describe(),
            })?;
        }

        match self.eval(callee)? {
            Value::Function(function) => {
                let args = self.eval_args(args)?;
                function.call(self.rt, args)
            }
            _ => Err(EvalError::NotCallable {
                callee: callee.describe(),
            }),
        }
    }

    fn eval_args(&self, args: &[Expr]) -> Result<Vec<Value>, EvalError> {
        args.iter().map(|arg| self.eval(arg)).collect()
    }

    /// Built-in methods. `None` means the receiver has no such method.
    fn method(&self, receiver: &Value, name: &str, args: Vec<Value>) -> Option<Result<Value, EvalError>> {
        let arg = |i: usize| args.get(i).cloned().unwrap_or_default();
        let text_arg = |i: usize| arg(i).to_display_string();

        let value = match (receiver, name) {
            (_, "toString") => Value::String(receiver.to_display_string()),
            (Value::String(s), "toUpperCase") => Value::String(s.to_uppercase()),
            (Value::String(s), "toLowerCase") => Value::String(s.to_lowercase()),
            (Value::String(s), "trim") => Value::String(s.trim().to_string()),
            (Value::String(s), "includes") => Value::Bool(s.contains(&text_arg(0))),
            (Value::String(s), "startsWith") => Value::Bool(s.starts_with(&text_arg(0))),
            (Value::String(s), "endsWith") => Value::Bool(s.ends_with(&text_arg(0))),
            (Value::String(s), "split") => {
                let separator = text_arg(0);
                let parts: Vec<Value> = if separator.is_empty() {
                    s.chars().map(|ch| Value::String(ch.to_string())).collect()
                } else {
                    s.split(separator.as_str()).map(Value::from).collect()
                };
                Value::Array(parts)
            }
            (Value::Array(items), "includes") => {
                let needle = arg(0);
                Value::Bool(items.iter().any(|item| item.strict_eq(&needle)))
            }
            (Value::Array(items), "indexOf") => {
                let needle = arg(0);
                let found = items.iter().position(|item| item.strict_eq(&needle));
                Value::Number(found.map_or(-1.0, |i| i as f64))
            }
            (Value::Array(items), "join") => {
                let separator = match arg(0) {
                    Value::Null => ",".to_string(),
                    other => other.to_display_string(),
                };
                Value::String(
                    items
                        .iter()
                        .map(Value::to_display_string)
                        .collect::<Vec<_>>()
                        .join(&separator),
                )
            }
            (Value::Number(n), "toFixed") => {
                let digits = arg(0).to_number();
                let digits = if digits.is_finite() { digits.clamp(0.0, 20.0) as usize } else { 0 };
                Value::String(format!("{n:.digits$}"))
            }
            (Value::Element(id), "getAttribute") => self
                .rt
                .dom()
                .attr(*id, &text_arg(0))
                .map(Value::String)
                .unwrap_or_default(),
            (Value::Element(id), "hasAttribute") => {
                Value::Bool(self.rt.dom().borrow().has_attr(*id, &text_arg(0)))
            }
            (Value::Element(id), "setAttribute") => {
                self.rt
                    .dom()
                    .borrow_mut()
                    .set_attr(*id, &text_arg(0), &text_arg(1));
                Value::Null
            }
            (Value::Element(id), "removeAttribute") => {
                self.rt.dom().borrow_mut().remove_attr(*id, &text_arg(0));
                Value::Null
            }
            _ => return None,
        };
        Some(Ok(value))
    }
}

/// Binary operators with JavaScript coercion rules for the supported
/// value shapes.
fn binary(op: BinaryOp, left: &Value, right: &Value) -> Value {
    let numeric = |f: fn(f64, f64) -> f64| Value::Number(f(left.to_number(), right.to_number()));
    let compare = |f: fn(std::cmp::Ordering) -> bool| {
        let ordering = match (left, right) {
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            _ => left.to_number().partial_cmp(&right.to_number()),
        };
        Value::Bool(ordering.is_some_and(f))
    };

    match op {
        BinaryOp::Add => match (left, right) {
            (Value::Number(_) | Value::Bool(_) | Value::Null, Value::Number(_) | Value::Bool(_) | Value::Null) => {
                numeric(|a, b| a + b)
            }
            _ => Value::String(format!(
                "{}{}",
                left.to_display_string(),
                right.to_display_string()
            )),
        },
        BinaryOp::Sub => numeric(|a, b| a - b),
        BinaryOp::Mul => numeric(|a, b| a * b),
        BinaryOp::Div => numeric(|a, b| a / b),
        BinaryOp::Mod => numeric(|a, b| a % b),
        BinaryOp::Lt => compare(|o| o.is_lt()),
        BinaryOp::Le => compare(|o| o.is_le()),
        BinaryOp::Gt => compare(|o| o.is_gt()),
        BinaryOp::Ge => compare(|o| o.is_ge()),
        BinaryOp::Eq => Value::Bool(left.loose_eq(right)),
        BinaryOp::NotEq => Value::Bool(!left.loose_eq(right)),
        BinaryOp::StrictEq => Value::Bool(left.strict_eq(right)),
        BinaryOp::StrictNotEq => Value::Bool(!left.strict_eq(right)),
    }
}
