//! Request payloads.
//!
//! A request carries three layers of data, later layers overriding earlier
//! ones: the scope's own serializable properties, the `data-*` values from
//! the originating element up to its scope root, and whatever the caller
//! passed. Only primitives and arrays of primitives travel; arrays encode
//! as repeated keys.
//!
//! The wire format carries no types. [`Payload::schema`] records the type of
//! every field so [`Payload::from_query_with`] can decode a query string back
//! into exactly the encoded values. [`Payload::from_query`] infers types and
//! is for queries whose shape is unknown.

use indexmap::IndexMap;

use crate::dom::NodeId;
use crate::error::FetchError;
use crate::reactive::Scope;
use crate::runtime::Runtime;
use crate::value::{format_number, Value};

/// The scope's serializable properties: alphabetic names only, with
/// zero-argument functions evaluated (untracked) as computed values.
pub fn scope_data(rt: &Runtime, scope: &Scope) -> IndexMap<String, Value> {
    scope
        .entries()
        .into_iter()
        .filter(|(key, _)| !key.is_empty() && key.chars().all(|ch| ch.is_ascii_alphabetic()))
        .filter_map(|(key, value)| {
            let value = match value {
                Value::Function(function) if function.arity() == 0 => {
                    rt.tracker().untracked(|| function.call(rt, Vec::new())).ok()?
                }
                other => other,
            };
            value.is_serializable().then_some((key, value))
        })
        .collect()
}

/// `data-*` values from `element` up to and including the nearest scope
/// root. Ancestors override nearer elements.
pub fn dataset(rt: &Runtime, element: NodeId) -> IndexMap<String, Value> {
    let data_attr = rt.config().attr("data");
    let doc = rt.dom().borrow();
    let mut merged = IndexMap::new();
    let mut current = Some(element);
    while let Some(el) = current {
        for (key, value) in doc.dataset(el) {
            merged.insert(key, Value::String(value));
        }
        if doc.has_attr(el, &data_attr) {
            break;
        }
        current = doc.parent(el).filter(|parent| doc.is_element(*parent));
    }
    merged
}

/// The declared type of one payload field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    String,
    Number,
    Bool,
    /// An array with one type per item. Empty arrays have no items.
    Array(Vec<FieldType>),
}

impl FieldType {
    /// The type of a serializable value.
    pub fn of(value: &Value) -> Option<Self> {
        Some(match value {
            Value::String(_) => Self::String,
            Value::Number(_) => Self::Number,
            Value::Bool(_) => Self::Bool,
            Value::Array(items) => Self::Array(items.iter().map(Self::of).collect::<Option<_>>()?),
            _ => return None,
        })
    }

    /// Decode one raw query value. A value that does not parse as the
    /// declared type is kept as a string.
    fn decode(&self, raw: &str) -> Value {
        match self {
            Self::Number => raw
                .parse::<f64>()
                .map_or_else(|_| Value::String(raw.to_string()), Value::Number),
            Self::Bool if raw == "true" => Value::Bool(true),
            Self::Bool if raw == "false" => Value::Bool(false),
            _ => Value::String(raw.to_string()),
        }
    }
}

/// Field types by name, in payload order.
pub type Schema = IndexMap<String, FieldType>;

/// Flat request data ready for encoding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload {
    fields: IndexMap<String, Value>,
}

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect the three layers for a request issued from `origin`.
    pub fn collect(rt: &Runtime, scope: &Scope, origin: NodeId, extra: Option<&Value>) -> Self {
        let mut payload = Self::new();
        payload.merge(scope_data(rt, scope));
        payload.merge(dataset(rt, origin));
        if let Some(Value::Object(extra)) = extra {
            payload.merge(extra.clone());
        }
        payload
    }

    /// Insert every serializable value of `values`, overriding existing
    /// keys.
    pub fn merge(&mut self, values: impl IntoIterator<Item = (String, Value)>) {
        for (key, value) in values {
            if value.is_serializable() {
                self.fields.insert(key, value);
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &IndexMap<String, Value> {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Encode as `application/x-www-form-urlencoded`.
    pub fn to_query(&self) -> Result<String, FetchError> {
        let mut pairs: Vec<(&str, String)> = Vec::new();
        for (key, value) in &self.fields {
            match value {
                Value::Array(items) => {
                    pairs.extend(items.iter().map(|item| (key.as_str(), item.to_display_string())))
                }
                other => pairs.push((key.as_str(), other.to_display_string())),
            }
        }
        Ok(serde_urlencoded::to_string(pairs)?)
    }

    /// The type of every field.
    pub fn schema(&self) -> Schema {
        self.fields
            .iter()
            .filter_map(|(key, value)| Some((key.clone(), FieldType::of(value)?)))
            .collect()
    }

    /// Decode a query string without a schema. Repeated keys become arrays;
    /// `true`/`false` become booleans and canonical numbers become numbers.
    /// Strings that look like numbers or booleans, single-item arrays and
    /// empty arrays do not survive; use [`Payload::from_query_with`] when
    /// the shape is known.
    pub fn from_query(query: &str) -> Self {
        Self::from_query_with(query, &Schema::new())
    }

    /// Decode a query string produced by [`Payload::to_query`], using
    /// `schema` for the fields it names. Keys the schema does not name are
    /// decoded as by [`Payload::from_query`].
    pub fn from_query_with(query: &str, schema: &Schema) -> Self {
        let mut raw = group_pairs(query);
        let mut fields = IndexMap::new();

        for (key, field) in schema {
            let values = raw.shift_remove(key).unwrap_or_default();
            let value = match field {
                FieldType::Array(items) => Value::Array(
                    values
                        .iter()
                        .enumerate()
                        .map(|(i, value)| items.get(i).map_or_else(|| infer(value), |item| item.decode(value)))
                        .collect(),
                ),
                scalar => match values.first() {
                    Some(value) => scalar.decode(value),
                    None => continue,
                },
            };
            fields.insert(key.clone(), value);
        }

        for (key, values) in raw {
            let mut values: Vec<Value> = values.iter().map(|value| infer(value)).collect();
            let value = if values.len() == 1 {
                values.remove(0)
            } else {
                Value::Array(values)
            };
            fields.insert(key, value);
        }

        Self { fields }
    }
}

/// Raw query values grouped by key, in first-seen order.
fn group_pairs(query: &str) -> IndexMap<String, Vec<String>> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query).unwrap_or_default();
    let mut grouped: IndexMap<String, Vec<String>> = IndexMap::new();
    for (key, value) in pairs {
        grouped.entry(key).or_default().push(value);
    }
    grouped
}

fn infer(raw: &str) -> Value {
    match raw {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    match raw.parse::<f64>() {
        Ok(n) if n.is_finite() && format_number(n) == raw => Value::Number(n),
        _ => Value::String(raw.to_string()),
    }
}
