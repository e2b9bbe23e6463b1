//! Sprig Core
//!
//! This crate provides the runtime for Sprig, an attribute-driven reactive
//! page runtime. It implements:
//!
//! - A small expression language evaluated against reactive scopes
//! - Reactive scopes with implicit dependency tracking
//! - Binding processors for `sp-data`, `sp-bind`, `sp-class`, `sp-ref` and
//!   `sp-form` declarations
//! - A fetch pipeline that streams server HTML into the page
//! - A swap engine with a settle pass for CSS transitions
//!
//! The runtime is single-threaded. Asynchronous work (requests, debounced
//! handlers, awaited binding values) runs on a `tokio::task::LocalSet`.
//!
//! # Architecture
//!
//! - `dom`: the live document (arena tree, events, serialization)
//! - `expr`: lexer, parser and interpreter for declarations
//! - `reactive`: scopes, bindings and the tracking context
//! - `processors`: initialization of declarative attributes
//! - `fetch`: request payloads, transport and the streaming decoder
//! - `swap`: fragment application and the settle pass
//! - `runtime`: the coordinator tying everything together
//!
//! # Example
//!
//! ```rust,ignore
//! use sprig_core::{Document, Event, Runtime};
//!
//! let rt = Runtime::new(Document::from_body_html(
//!     r#"<div sp-data="count: 0">
//!          <button id="inc" sp-bind="onclick: () => count++"></button>
//!          <span id="out" sp-bind="textContent: count"></span>
//!        </div>"#,
//! ));
//! rt.start();
//!
//! let button = rt.dom().get_element_by_id("inc").unwrap();
//! rt.dom().dispatch(button, Event::new("click"));
//!
//! let out = rt.dom().get_element_by_id("out").unwrap();
//! assert_eq!(rt.dom().borrow().text_content(out), "1");
//! ```

pub mod config;
pub mod dom;
pub mod error;
pub mod expr;
pub mod fetch;
mod processors;
pub mod reactive;
pub mod runtime;
pub mod swap;
pub mod value;

pub use config::RuntimeConfig;
pub use dom::{Document, Dom, Event, EventTarget, NodeId};
pub use error::{ConfigError, Error, EvalError, ExprError, FetchError, Result, SwapError};
pub use fetch::{FetchRequest, FetchResponse, FieldType, HttpTransport, Payload, Schema, Transport};
pub use processors::{EventKey, Modifier};
pub use reactive::{Binding, Scope, Tracker};
pub use runtime::{KeyValueStore, MemoryStore, Runtime, RuntimeBuilder};
pub use swap::SwapStrategy;
pub use value::{Function, Pending, Value};
