//! Store Adapter Layer
//!
//! The statement-execution primitives the query engine runs on. Everything
//! above this layer builds SQL text plus a parameter list; everything below
//! it is the embedded store.

pub mod dialect;
pub mod sqlite;

pub use dialect::{DialectGenerator, SqlDialect};
pub use sqlite::SqliteAdapter;

use serde::{Deserialize, Serialize};
use std::fmt;

use super::value::Row;

/// Universal result type for adapter operations
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Core store adapter trait
pub trait DatabaseAdapter: Send + Sync {
    /// Which SQL dialect this adapter speaks
    fn dialect(&self) -> SqlDialect;

    /// Execute a statement that modifies data or schema
    fn run(&self, sql: &str, params: &[SqlValue]) -> AdapterResult<ExecResult>;

    /// Execute a query that returns rows
    fn query(&self, sql: &str, params: &[SqlValue]) -> AdapterResult<Vec<Row>>;

    /// Execute a query and keep only its first row
    fn query_one(&self, sql: &str, params: &[SqlValue]) -> AdapterResult<Option<Row>> {
        Ok(self.query(sql, params)?.into_iter().next())
    }

    /// Execute several parameterless statements
    fn execute_batch(&self, sql: &str) -> AdapterResult<()>;

    fn begin(&self) -> AdapterResult<()>;
    fn commit(&self) -> AdapterResult<()>;
    fn rollback(&self) -> AdapterResult<()>;

    /// Column metadata of a table, empty when the table does not exist
    fn describe_table(&self, name: &str) -> AdapterResult<Vec<ColumnInfo>>;

    /// Version string reported by the store
    fn server_version(&self) -> AdapterResult<String>;
}

/// SQL value for parameterized statements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Bool(bool),
    Blob(Vec<u8>),
}

impl SqlValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SqlValue::Integer(i) => Some(*i as f64),
            SqlValue::Real(f) => Some(*f),
            SqlValue::Bool(b) => Some(*b as i64 as f64),
            _ => None,
        }
    }

    /// Scalar JSON value as a bindable parameter. Arrays and objects have no
    /// scalar form.
    pub fn from_json(json: &serde_json::Value) -> Option<SqlValue> {
        match json {
            serde_json::Value::Null => Some(SqlValue::Null),
            serde_json::Value::Bool(b) => Some(SqlValue::Bool(*b)),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Some(SqlValue::Integer(i)),
                None => n.as_f64().map(SqlValue::Real),
            },
            serde_json::Value::String(s) => Some(SqlValue::Text(s.clone())),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
        }
    }
}

impl From<i64> for SqlValue {
    fn from(i: i64) -> Self {
        SqlValue::Integer(i)
    }
}

impl From<i32> for SqlValue {
    fn from(i: i32) -> Self {
        SqlValue::Integer(i as i64)
    }
}

impl From<f64> for SqlValue {
    fn from(f: f64) -> Self {
        SqlValue::Real(f)
    }
}

impl From<bool> for SqlValue {
    fn from(b: bool) -> Self {
        SqlValue::Bool(b)
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        SqlValue::Text(s.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        SqlValue::Text(s)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(o: Option<T>) -> Self {
        o.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

/// Result from an INSERT/UPDATE/DELETE-type statement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecResult {
    pub affected_rows: u64,
    pub last_insert_id: Option<i64>,
}

/// One column as described by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub declared_type: String,
    pub not_null: bool,
    pub primary_key: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "ASC"),
            SortDirection::Desc => write!(f, "DESC"),
        }
    }
}

/// Store adapter errors
#[derive(Debug)]
pub enum AdapterError {
    Connection(String),
    Query(String),
    Schema(String),
    Transaction(String),
}

impl fmt::Display for AdapterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdapterError::Connection(e) => write!(f, "Connection error: {}", e),
            AdapterError::Query(e) => write!(f, "Query error: {}", e),
            AdapterError::Schema(e) => write!(f, "Schema error: {}", e),
            AdapterError::Transaction(e) => write!(f, "Transaction error: {}", e),
        }
    }
}

impl std::error::Error for AdapterError {}
