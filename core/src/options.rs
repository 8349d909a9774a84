//! Per-call request options: query parameters and body fields.
//!
//! Both maps hold scalar values only. Insertion order is preserved and
//! inserting an existing key replaces its value in place, which is also how
//! the dispatcher layers caller parameters over the credentials.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Number, Value};

use crate::error::InvalidArgument;

/// A scalar or date parameter value.
///
/// `Float` accepts any `f64`, but NaN and infinities have no JSON form: the
/// dispatcher rejects them with [`InvalidArgument::NonFiniteNumber`] before
/// sending.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    String(String),
    Int(i64),
    /// Integers above `i64::MAX`.
    UInt(u64),
    Float(f64),
    Bool(bool),
    Date(DateTime<Utc>),
}

impl QueryValue {
    /// Text form used on the query string. Dates use ISO-8601 UTC with
    /// millisecond precision.
    pub fn render(&self) -> String {
        match self {
            QueryValue::String(s) => s.clone(),
            QueryValue::Int(n) => n.to_string(),
            QueryValue::UInt(n) => n.to_string(),
            QueryValue::Float(n) => n.to_string(),
            QueryValue::Bool(b) => b.to_string(),
            QueryValue::Date(d) => d.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// JSON form used in request bodies. `None` for non-finite floats.
    pub fn to_json(&self) -> Option<Value> {
        let value = match self {
            QueryValue::String(s) => Value::String(s.clone()),
            QueryValue::Int(n) => Value::from(*n),
            QueryValue::UInt(n) => Value::from(*n),
            QueryValue::Float(n) => Value::Number(Number::from_f64(*n)?),
            QueryValue::Bool(b) => Value::Bool(*b),
            QueryValue::Date(_) => Value::String(self.render()),
        };
        Some(value)
    }

    fn is_finite(&self) -> bool {
        match self {
            QueryValue::Float(n) => n.is_finite(),
            _ => true,
        }
    }

    fn from_json(field: &'static str, key: &str, value: Value) -> Result<Option<Self>, InvalidArgument> {
        let value = match value {
            Value::Null => return Ok(None),
            Value::String(s) => QueryValue::String(s),
            Value::Bool(b) => QueryValue::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    QueryValue::Int(i)
                } else if let Some(u) = n.as_u64() {
                    QueryValue::UInt(u)
                } else {
                    match n.as_f64().filter(|f| f.is_finite()) {
                        Some(f) => QueryValue::Float(f),
                        None => {
                            return Err(InvalidArgument::NonFiniteNumber {
                                field,
                                key: key.to_string(),
                            })
                        }
                    }
                }
            }
            Value::Array(_) | Value::Object(_) => {
                return Err(InvalidArgument::NonScalarValue {
                    field,
                    key: key.to_string(),
                })
            }
        };
        Ok(Some(value))
    }
}

impl From<&str> for QueryValue {
    fn from(v: &str) -> Self {
        QueryValue::String(v.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(v: String) -> Self {
        QueryValue::String(v)
    }
}

impl From<&String> for QueryValue {
    fn from(v: &String) -> Self {
        QueryValue::String(v.clone())
    }
}

impl From<i64> for QueryValue {
    fn from(v: i64) -> Self {
        QueryValue::Int(v)
    }
}

impl From<i32> for QueryValue {
    fn from(v: i32) -> Self {
        QueryValue::Int(v.into())
    }
}

impl From<u32> for QueryValue {
    fn from(v: u32) -> Self {
        QueryValue::Int(v.into())
    }
}

impl From<u64> for QueryValue {
    fn from(v: u64) -> Self {
        match i64::try_from(v) {
            Ok(i) => QueryValue::Int(i),
            Err(_) => QueryValue::UInt(v),
        }
    }
}

impl From<f64> for QueryValue {
    fn from(v: f64) -> Self {
        QueryValue::Float(v)
    }
}

impl From<bool> for QueryValue {
    fn from(v: bool) -> Self {
        QueryValue::Bool(v)
    }
}

impl From<DateTime<Utc>> for QueryValue {
    fn from(v: DateTime<Utc>) -> Self {
        QueryValue::Date(v)
    }
}

/// Ordered string-keyed map of [`QueryValue`]s.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(Vec<(String, QueryValue)>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace `key`. A replaced key keeps its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<QueryValue>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &QueryValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Overlay every entry of `other` onto `self`.
    pub fn extend_from(&mut self, other: &Params) {
        for (k, v) in &other.0 {
            self.insert(k.clone(), v.clone());
        }
    }

    /// Pairs with values rendered for a query string.
    pub fn rendered(&self) -> Vec<(String, String)> {
        self.0.iter().map(|(k, v)| (k.clone(), v.render())).collect()
    }

    /// JSON object with the same entries, for a request body.
    ///
    /// Fails on the first NaN or infinite float, naming `field` and the key.
    pub fn to_json(&self, field: &'static str) -> Result<Map<String, Value>, InvalidArgument> {
        let mut map = Map::new();
        for (key, value) in &self.0 {
            let json = value.to_json().ok_or_else(|| InvalidArgument::NonFiniteNumber {
                field,
                key: key.clone(),
            })?;
            map.insert(key.clone(), json);
        }
        Ok(map)
    }

    /// Reject NaN and infinite floats, which have no faithful text form.
    pub(crate) fn check_finite(&self, field: &'static str) -> Result<(), InvalidArgument> {
        match self.0.iter().find(|(_, v)| !v.is_finite()) {
            Some((key, _)) => Err(InvalidArgument::NonFiniteNumber {
                field,
                key: key.clone(),
            }),
            None => Ok(()),
        }
    }

    fn from_json(field: &'static str, value: Value) -> Result<Self, InvalidArgument> {
        let map = match value {
            Value::Object(map) => map,
            other => {
                return Err(InvalidArgument::FieldNotObject {
                    field,
                    found: json_type_name(&other),
                })
            }
        };
        let mut params = Params::new();
        for (key, value) in map {
            if let Some(v) = QueryValue::from_json(field, &key, value)? {
                params.insert(key, v);
            }
        }
        Ok(params)
    }
}

impl<K: Into<String>, V: Into<QueryValue>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

/// Options accepted by [`Trello::request`](crate::Trello::request).
///
/// `query` is merged over the credentials to form the query string; `data`
/// becomes the JSON body of POST and PUT requests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    pub query: Params,
    pub data: Params,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.query.insert(key, value);
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.data.insert(key, value);
        self
    }

    /// Set `key` only when `value` is present.
    pub fn with_query_opt<V: Into<QueryValue>>(self, key: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(v) => self.with_query(key, v),
            None => self,
        }
    }
}

/// Options coming from dynamic JSON. Unknown top-level fields are ignored,
/// mirroring how the service ignores parameters it does not know.
impl TryFrom<Value> for RequestOptions {
    type Error = InvalidArgument;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let mut map: Map<String, Value> = match value {
            Value::Object(map) => map,
            other => {
                return Err(InvalidArgument::OptionsNotObject {
                    found: json_type_name(&other),
                })
            }
        };
        let query = match map.remove("query") {
            Some(v) => Params::from_json("query", v)?,
            None => Params::new(),
        };
        let data = match map.remove("data") {
            Some(v) => Params::from_json("data", v)?,
            None => Params::new(),
        };
        Ok(RequestOptions { query, data })
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
