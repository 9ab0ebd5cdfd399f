//! Row values
//!
//! `Value` is the rich type the DSL hands back to callers: SQLite only stores
//! NULL/INTEGER/REAL/TEXT/BLOB, everything else is emulated and rebuilt by the
//! converter on read.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value as Json};
use std::cmp::Ordering;

use super::adapter::SqlValue;
use super::definition::ColumnType;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(DateTime<Utc>),
    IntegerSet(Vec<i64>),
    TextSet(Vec<String>),
    /// Nested record, produced by one-to-one joins
    Record(Row),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Real(f) => Some(*f),
            Value::Bool(b) => Some(*b as i64 as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Row> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Build a value from a JSON document value.
    ///
    /// Arrays of integers become `IntegerSet`, arrays of strings `TextSet`; an
    /// empty array is an empty `IntegerSet` (both serialize to `[]`).
    pub fn from_json(json: &Json) -> Value {
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => n.as_f64().map(Value::Real).unwrap_or(Value::Null),
            },
            Json::String(s) => Value::Text(s.clone()),
            Json::Array(items) => {
                if let Some(ints) = items.iter().map(|v| v.as_i64()).collect::<Option<Vec<_>>>() {
                    Value::IntegerSet(ints)
                } else if let Some(texts) = items
                    .iter()
                    .map(|v| v.as_str().map(str::to_string))
                    .collect::<Option<Vec<_>>>()
                {
                    Value::TextSet(texts)
                } else {
                    Value::Text(json.to_string())
                }
            }
            Json::Object(map) => Value::Record(Row::from_json_object(map)),
        }
    }

    pub fn to_json(&self) -> Json {
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Integer(i) => Json::from(*i),
            Value::Real(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::Text(s) => Json::String(s.clone()),
            Value::Blob(b) => Json::String(STANDARD.encode(b)),
            Value::Date(d) => Json::String(d.to_string()),
            Value::Time(t) => Json::String(t.to_string()),
            Value::DateTime(dt) => Json::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Value::IntegerSet(v) => Json::from(v.clone()),
            Value::TextSet(v) => Json::from(v.clone()),
            Value::Record(r) => r.to_json(),
        }
    }

    /// Store representation, independent of the target column.
    pub fn to_param(&self) -> SqlValue {
        match self {
            Value::Null => SqlValue::Null,
            Value::Bool(b) => SqlValue::Bool(*b),
            Value::Integer(i) => SqlValue::Integer(*i),
            Value::Real(f) => SqlValue::Real(*f),
            Value::Text(s) => SqlValue::Text(s.clone()),
            Value::Blob(b) => SqlValue::Blob(b.clone()),
            Value::Date(d) => SqlValue::Text(d.to_string()),
            Value::Time(t) => SqlValue::Text(t.to_string()),
            Value::DateTime(dt) => {
                SqlValue::Text(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            Value::IntegerSet(_) | Value::TextSet(_) | Value::Record(_) => {
                SqlValue::Text(self.to_json().to_string())
            }
        }
    }

    /// Store representation for a column of the given type.
    ///
    /// Set columns always receive a JSON array text: a scalar becomes a
    /// one-element array and NULL stays NULL.
    pub fn to_sql(&self, column_type: &ColumnType) -> SqlValue {
        if !column_type.is_set() {
            return self.to_param();
        }

        match self {
            Value::Null => SqlValue::Null,
            Value::IntegerSet(_) | Value::TextSet(_) => self.to_param(),
            scalar => SqlValue::Text(Json::Array(vec![scalar.to_json()]).to_string()),
        }
    }

    /// Loose comparison against a bound filter value, used for client-side
    /// filtering of results. `None` when the two are not comparable.
    pub fn compare_param(&self, other: &SqlValue) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, SqlValue::Null) => Some(Ordering::Equal),
            (Value::Null, _) | (_, SqlValue::Null) => None,
            (Value::Text(a), SqlValue::Text(b)) => Some(a.as_str().cmp(b.as_str())),
            (Value::Blob(a), SqlValue::Blob(b)) => Some(a.cmp(b)),
            (Value::Date(_) | Value::Time(_) | Value::DateTime(_), SqlValue::Text(b)) => {
                match self.to_param() {
                    SqlValue::Text(a) => Some(a.as_str().cmp(b.as_str())),
                    _ => None,
                }
            }
            (Value::Bool(a), SqlValue::Bool(b)) => Some(a.cmp(b)),
            _ => {
                let a = self.as_f64()?;
                let b = other.as_f64()?;
                a.partial_cmp(&b)
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<SqlValue> for Value {
    fn from(value: SqlValue) -> Self {
        match value {
            SqlValue::Null => Value::Null,
            SqlValue::Integer(i) => Value::Integer(i),
            SqlValue::Real(f) => Value::Real(f),
            SqlValue::Text(s) => Value::Text(s),
            SqlValue::Bool(b) => Value::Bool(b),
            SqlValue::Blob(b) => Value::Blob(b),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Real(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Blob(b)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<NaiveTime> for Value {
    fn from(t: NaiveTime) -> Self {
        Value::Time(t)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(dt: DateTime<Utc>) -> Self {
        Value::DateTime(dt)
    }
}

impl From<Vec<i64>> for Value {
    fn from(v: Vec<i64>) -> Self {
        Value::IntegerSet(v)
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Value::TextSet(v)
    }
}

impl From<Vec<&str>> for Value {
    fn from(v: Vec<&str>) -> Self {
        Value::TextSet(v.into_iter().map(str::to_string).collect())
    }
}

impl From<Row> for Value {
    fn from(r: Row) -> Self {
        Value::Record(r)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(o: Option<T>) -> Self {
        o.map(Into::into).unwrap_or(Value::Null)
    }
}

/// An ordered record: column name → value.
///
/// Inserting an existing key replaces its value in place, so rows read from
/// a join keep the last value seen for a duplicated column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    fields: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.insert(name, value.into());
        self
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.fields.iter_mut().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.fields.iter().any(|(k, _)| k == name)
    }

    pub fn insert(&mut self, name: &str, value: Value) -> Option<Value> {
        match self.get_mut(name) {
            Some(slot) => Some(std::mem::replace(slot, value)),
            None => {
                self.fields.push((name.to_string(), value));
                None
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let idx = self.fields.iter().position(|(k, _)| k == name)?;
        Some(self.fields.remove(idx).1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn from_json_object(map: &Map<String, Json>) -> Row {
        map.iter()
            .map(|(k, v)| (k.clone(), Value::from_json(v)))
            .collect()
    }

    pub fn to_json(&self) -> Json {
        let map: Map<String, Json> = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        Json::Object(map)
    }

    /// Map the row onto a caller type through its serde representation.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.to_json())
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (k, v) in iter {
            row.insert(&k.into(), v);
        }
        row
    }
}

impl IntoIterator for Row {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}
