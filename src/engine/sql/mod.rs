//! SQL generation
//!
//! Every compiler appends its literals to one shared parameter list and
//! refers to them with numbered placeholders, so fragments compiled
//! separately (SET, WHERE, HAVING) can be joined into one statement.

pub mod filter;
pub mod insert;
pub mod remove;
pub mod select;
pub mod update;

pub use filter::{compile, compile_for, compile_into, CompiledFilter};

use super::adapter::dialect::quote_ident;
use super::adapter::SqlValue;
use super::definition::{ColumnType, Table};
use super::error::{Result, VdbaError};
use super::value::Value;

/// SQL text plus the values bound to its placeholders
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl Statement {
    pub fn new(sql: String, params: Vec<SqlValue>) -> Self {
        Self { sql, params }
    }
}

/// Append a value and return its placeholder
pub(crate) fn bind(params: &mut Vec<SqlValue>, value: SqlValue) -> String {
    params.push(value);
    format!("?{}", params.len())
}

/// `col` → `"col"`, `table.col` → `"table"."col"`
pub(crate) fn quote_column(name: &str) -> String {
    match name.split_once('.') {
        Some((table, column)) => format!("{}.{}", quote_ident(table), quote_ident(column)),
        None => quote_ident(name),
    }
}

/// Column scope of a statement: one table, or a source and a join target.
pub(crate) struct Scope<'a> {
    pub source: &'a Table,
    pub target: Option<&'a Table>,
}

impl<'a> Scope<'a> {
    pub fn single(table: &'a Table) -> Self {
        Self { source: table, target: None }
    }

    /// Table owning a column reference and the bare column name, `None`
    /// when no table in scope has it
    pub fn owner<'c>(&self, column: &'c str) -> Option<(&'a Table, &'c str)> {
        let mut candidates = std::iter::once(self.source).chain(self.target);
        match column.split_once('.') {
            Some((table, col)) => candidates
                .find(|t| t.name() == table.to_lowercase() && t.has_column(col))
                .map(|t| (t, col)),
            None => candidates.find(|t| t.has_column(column)).map(|t| (t, column)),
        }
    }

    pub fn owned<'c>(&self, column: &'c str) -> Result<(&'a Table, &'c str)> {
        self.owner(column)
            .ok_or_else(|| VdbaError::invalid(format!("Unknown column '{}'", column)))
    }

    /// Render a column reference. Joined statements qualify every column
    /// with its owning table; qualified references always use the table's
    /// store identifier.
    pub fn render(&self, column: &str) -> String {
        match self.owner(column) {
            Some((table, col)) if self.target.is_some() || column.contains('.') => {
                format!("{}.{}", table.sql_qn(), quote_ident(col))
            }
            _ => quote_column(column),
        }
    }

    pub fn column_type(&self, column: &str) -> Option<ColumnType> {
        self.owner(column)
            .and_then(|(table, col)| table.column_type(col))
            .cloned()
    }
}

/// The four textual positions an element can take in a serialized set:
/// only entry, first, middle and last.
///
/// `element` is a SQL expression yielding the element's JSON encoding.
/// Sets are stored as compact JSON arrays (`[1,2,3]`, `["a","b"]`), the
/// same text these patterns are built against.
pub(crate) struct SetPatterns {
    pub element: String,
    pub only: String,
    pub first: String,
    pub middle: String,
    pub last: String,
}

impl SetPatterns {
    pub fn new(element: &str) -> Self {
        Self {
            element: element.to_string(),
            only: format!("'[' || {} || ']'", element),
            first: format!("'[' || {} || ','", element),
            middle: format!("',' || {} || ','", element),
            last: format!("',' || {} || ']'", element),
        }
    }

    /// Element bound as a parameter and JSON-encoded by the store
    pub fn bound(params: &mut Vec<SqlValue>, value: SqlValue) -> Self {
        let placeholder = bind(params, value);
        Self::new(&format!("json_quote({})", placeholder))
    }

    /// True when `column` holds the element anywhere
    pub fn contains(&self, column: &str) -> String {
        format!(
            "(instr({c}, {}) > 0 or instr({c}, {}) > 0 or instr({c}, {}) > 0 or instr({c}, {}) > 0)",
            self.only,
            self.first,
            self.middle,
            self.last,
            c = column
        )
    }
}

/// Coerce a scalar to the element type of a set column
pub(crate) fn set_element(column_type: &ColumnType, value: &Value) -> Result<Value> {
    let element = match (column_type, value) {
        (ColumnType::IntegerSet, Value::Integer(i)) => Some(Value::Integer(*i)),
        (ColumnType::IntegerSet, Value::Bool(b)) => Some(Value::Integer(*b as i64)),
        (ColumnType::IntegerSet, Value::Real(f)) if f.fract() == 0.0 => Some(Value::Integer(*f as i64)),
        (ColumnType::IntegerSet, Value::Text(s)) => s.trim().parse::<i64>().ok().map(Value::Integer),
        (ColumnType::TextSet, Value::Text(s)) => Some(Value::Text(s.clone())),
        (ColumnType::TextSet, Value::Integer(i)) => Some(Value::Text(i.to_string())),
        (ColumnType::TextSet, Value::Real(f)) => Some(Value::Text(f.to_string())),
        (ColumnType::TextSet, Value::Bool(b)) => Some(Value::Text(b.to_string())),
        _ => None,
    };
    element.ok_or_else(|| {
        VdbaError::invalid(format!("Value {} is not a valid {} element", value.to_json(), column_type))
    })
}

/// A membership operand in the form `$add`/`$del` store it for a column of
/// the given type. Columns that are not sets get the operand unchanged.
pub(crate) fn set_operand(column_type: Option<&ColumnType>, value: &SqlValue) -> Result<SqlValue> {
    match column_type {
        Some(column_type) if column_type.is_set() => {
            Ok(set_element(column_type, &Value::from(value.clone()))?.to_param())
        }
        _ => Ok(value.clone()),
    }
}

/// Store representation of a value written into a column of the given type.
///
/// Set columns receive a compact JSON array of correctly typed elements; a
/// scalar becomes a one-element set and NULL stays NULL.
pub(crate) fn write_value(column_type: &ColumnType, value: &Value) -> Result<SqlValue> {
    if !column_type.is_set() {
        return Ok(value.to_sql(column_type));
    }

    let elements: Vec<Value> = match value {
        Value::Null => return Ok(SqlValue::Null),
        Value::IntegerSet(items) => items
            .iter()
            .map(|i| set_element(column_type, &Value::Integer(*i)))
            .collect::<Result<_>>()?,
        Value::TextSet(items) => items
            .iter()
            .map(|s| set_element(column_type, &Value::Text(s.clone())))
            .collect::<Result<_>>()?,
        scalar => vec![set_element(column_type, scalar)?],
    };

    let set = match column_type {
        ColumnType::IntegerSet => Value::IntegerSet(elements.iter().filter_map(Value::as_i64).collect()),
        _ => Value::TextSet(
            elements
                .iter()
                .filter_map(|e| e.as_str().map(str::to_string))
                .collect(),
        ),
    };
    Ok(set.to_sql(column_type))
}
