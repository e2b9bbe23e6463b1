//! Expression Evaluator
//!
//! Attribute values are short object-literal bodies:
//!
//! ```text
//! count: 0, inc: () => count++, "class.active": count > 3
//! ```
//!
//! The source is parsed once (the runtime caches the AST by source text)
//! and interpreted against a [`Scope`]. Evaluation never fails past this
//! module's boundary: a malformed or throwing declaration is logged with its
//! source and produces an empty mapping, so the rest of initialization
//! proceeds.
//!
//! Two evaluation modes exist:
//!
//! - [`evaluate`] computes every entry immediately. Used for scope
//!   declarations.
//! - [`evaluate_deferred`] turns every entry into a callable without
//!   running anything. Used for bindings, where each entry must run inside
//!   its own tracking frame.

mod ast;
mod eval;
mod lexer;
mod parser;

pub use ast::{ArrowFn, AssignOp, BinaryOp, Body, Entry, Expr, Literal, LogicalOp, ObjectExpr, UnaryOp, UpdateOp};
pub use eval::Closure;
pub use lexer::{tokenize, Punct, Token, TokenKind};
pub use parser::{parse_expr, parse_object};

use std::rc::Rc;

use indexmap::IndexMap;
use tracing::error;

use crate::dom::NodeId;
use crate::error::Error;
use crate::reactive::Scope;
use crate::runtime::Runtime;
use crate::value::{Function, Value};
use eval::Interpreter;

/// Evaluate a declaration eagerly. Returns an empty mapping (after logging)
/// if the source does not parse or any entry fails.
pub fn evaluate(rt: &Runtime, source: &str, scope: &Scope, this: Option<NodeId>) -> IndexMap<String, Value> {
    let result = rt.compile(source).map_err(Error::from).and_then(|object| {
        let interp = Interpreter {
            rt,
            scope,
            this,
            frame: None,
        };
        object
            .entries
            .iter()
            .map(|entry| Ok((entry.key.clone(), interp.eval(&entry.value)?)))
            .collect::<Result<IndexMap<_, _>, Error>>()
    });

    result.unwrap_or_else(|err| {
        error!(source, %err, "expression failed");
        IndexMap::new()
    })
}

/// Turn each entry of a declaration into a callable. Arrow functions keep
/// their parameters; any other entry becomes a zero-argument thunk.
pub fn evaluate_deferred(
    rt: &Runtime,
    source: &str,
    scope: &Scope,
    this: Option<NodeId>,
) -> IndexMap<String, Function> {
    let object = match rt.compile(source) {
        Ok(object) => object,
        Err(err) => {
            error!(source, %err, "expression failed");
            return IndexMap::new();
        }
    };

    object
        .entries
        .iter()
        .map(|entry| {
            let closure = match &entry.value {
                Expr::Arrow(arrow) => Closure::new(arrow.clone(), scope, this),
                other => Closure::thunk(other.clone(), scope, this),
            };
            (entry.key.clone(), Function::Closure(Rc::new(closure)))
        })
        .collect()
}

/// Evaluate a single expression against `scope`.
pub fn eval_expr(rt: &Runtime, source: &str, scope: &Scope, this: Option<NodeId>) -> Result<Value, Error> {
    let expr = parse_expr(source)?;
    let interp = Interpreter {
        rt,
        scope,
        this,
        frame: None,
    };
    Ok(interp.eval(&expr)?)
}
