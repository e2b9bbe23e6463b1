//! Error types.
//!
//! Every failure in the runtime is recoverable: expression errors degrade a
//! single declaration, network errors become `error` events on the
//! originating element, and swap errors skip a single fragment. These enums
//! exist so the degradation sites can log something precise.

use thiserror::Error;

/// Lexing or parsing failure for an expression string.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },

    #[error("unterminated string starting at offset {offset}")]
    UnterminatedString { offset: usize },

    #[error("unexpected {found} at offset {offset}, expected {expected}")]
    UnexpectedToken {
        found: String,
        expected: &'static str,
        offset: usize,
    },

    #[error("unexpected end of expression, expected {expected}")]
    UnexpectedEnd { expected: &'static str },

    #[error("invalid assignment target at offset {offset}")]
    InvalidAssignment { offset: usize },
}

/// Failure while interpreting a parsed expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("{name} is not defined")]
    Undefined { name: String },

    #[error("{callee} is not a function")]
    NotCallable { callee: String },

    #[error("cannot read '{member}' of {target}")]
    BadMember { member: String, target: String },

    #[error("cannot assign to {target}")]
    BadAssignment { target: String },

    #[error("type error: {0}")]
    Type(String),

    #[error("the scope this function belongs to has been discarded")]
    ScopeGone,

    #[error("the runtime has been shut down")]
    RuntimeGone,
}

/// Failure of a framework-originated network request.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid request url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("relative request url '{url}' needs a configured base_url")]
    RelativeUrl { url: String },

    #[error("failed to encode request payload: {0}")]
    Encode(#[from] serde_urlencoded::ser::Error),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("{status_text}: {body}")]
    Status {
        status: u16,
        status_text: String,
        body: String,
    },
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Transport(err.to_string())
    }
}

/// Failure to apply one decoded fragment.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SwapError {
    #[error("fragment <{tag}> has no id")]
    MissingId { tag: String },

    #[error("no element matches fragment id '{id}'")]
    NoTarget { id: String },

    #[error("unknown swap strategy '{strategy}'")]
    UnknownStrategy { strategy: String },
}

/// Invalid runtime configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid runtime config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Any error the runtime can produce.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Expr(#[from] ExprError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Swap(#[from] SwapError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
