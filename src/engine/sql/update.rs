//! Update-expression compiler
//!
//! Set columns are edited in place with CASE/instr/replace over their JSON
//! text, using the same element patterns as `$contains`, so no
//! read-modify-write round trip is needed.

use serde_json::Value as Json;

use super::filter::compile_for;
use super::{bind, quote_column, set_element, write_value, SetPatterns, Statement};
use crate::engine::adapter::dialect::is_identifier;
use crate::engine::adapter::SqlValue;
use crate::engine::definition::{ColumnType, Table};
use crate::engine::error::{Result, VdbaError};
use crate::engine::filter::Filter;
use crate::engine::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateExpr {
    Set(Value),
    /// `$inc`, or `$add` on a numeric column
    Inc(Value),
    Dec(Value),
    Mul(Value),
    /// Concatenation on text, element insertion on sets
    Add(Value),
    /// `$del` / `$remove`: element removal on sets
    Del(Value),
}

impl UpdateExpr {
    fn name(&self) -> &'static str {
        match self {
            UpdateExpr::Set(_) => "$set",
            UpdateExpr::Inc(_) => "$inc",
            UpdateExpr::Dec(_) => "$dec",
            UpdateExpr::Mul(_) => "$mul",
            UpdateExpr::Add(_) => "$add",
            UpdateExpr::Del(_) => "$del",
        }
    }

    /// Bare values are `$set`; an object must hold exactly one operator.
    pub fn parse(expr: &Json) -> Result<UpdateExpr> {
        let map = match expr {
            Json::Object(map) => map,
            other => return Ok(UpdateExpr::Set(Value::from_json(other))),
        };

        let mut ops = map.iter();
        let (op, operand) = match (ops.next(), ops.next()) {
            (Some(entry), None) => entry,
            _ => {
                return Err(VdbaError::invalid(
                    "An update expression must hold exactly one operator",
                ))
            }
        };

        let operand = Value::from_json(operand);
        let parsed = match op.as_str() {
            "$set" => UpdateExpr::Set(operand),
            "$inc" => UpdateExpr::Inc(operand),
            "$dec" => UpdateExpr::Dec(operand),
            "$mul" => UpdateExpr::Mul(operand),
            "$add" => UpdateExpr::Add(operand),
            "$del" | "$remove" => UpdateExpr::Del(operand),
            other => return Err(VdbaError::UnknownOperator(other.to_string())),
        };
        Ok(parsed)
    }
}

/// Ordered column → update expression map
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Changes {
    entries: Vec<(String, UpdateExpr)>,
}

impl Changes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(doc: &Json) -> Result<Changes> {
        let map = doc
            .as_object()
            .ok_or_else(|| VdbaError::invalid("Update changes must be an object"))?;

        let mut changes = Changes::new();
        for (column, expr) in map {
            changes = changes.with(column, UpdateExpr::parse(expr)?);
        }
        Ok(changes)
    }

    pub fn with(mut self, column: &str, expr: UpdateExpr) -> Self {
        self.entries.push((column.to_string(), expr));
        self
    }

    pub fn set(self, column: &str, value: impl Into<Value>) -> Self {
        self.with(column, UpdateExpr::Set(value.into()))
    }

    pub fn inc(self, column: &str, value: impl Into<Value>) -> Self {
        self.with(column, UpdateExpr::Inc(value.into()))
    }

    pub fn dec(self, column: &str, value: impl Into<Value>) -> Self {
        self.with(column, UpdateExpr::Dec(value.into()))
    }

    pub fn mul(self, column: &str, value: impl Into<Value>) -> Self {
        self.with(column, UpdateExpr::Mul(value.into()))
    }

    pub fn add(self, column: &str, value: impl Into<Value>) -> Self {
        self.with(column, UpdateExpr::Add(value.into()))
    }

    pub fn del(self, column: &str, value: impl Into<Value>) -> Self {
        self.with(column, UpdateExpr::Del(value.into()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &UpdateExpr)> {
        self.entries.iter().map(|(c, e)| (c.as_str(), e))
    }
}

fn unsupported(column: &str, column_type: &ColumnType, expr: &UpdateExpr) -> VdbaError {
    VdbaError::invalid(format!(
        "Operator {} is not supported on {} column '{}'",
        expr.name(),
        column_type,
        column
    ))
}

fn numeric(column: &str, value: &Value) -> Result<SqlValue> {
    match value {
        Value::Integer(_) | Value::Real(_) => Ok(value.to_param()),
        other => Err(VdbaError::invalid(format!(
            "Column '{}' expects a numeric operand, got {}",
            column,
            other.to_json()
        ))),
    }
}

/// Compile one `column = ...` SET fragment, appending literals to `params`.
pub fn compile_column_update(
    column: &str,
    column_type: &ColumnType,
    expr: &UpdateExpr,
    params: &mut Vec<SqlValue>,
) -> Result<String> {
    let col = quote_column(column);

    let rhs = match (column_type, expr) {
        (_, UpdateExpr::Set(v)) => bind(params, write_value(column_type, v)?),

        (ColumnType::Integer | ColumnType::Real, UpdateExpr::Inc(v) | UpdateExpr::Add(v)) => {
            format!("{} + {}", col, bind(params, numeric(column, v)?))
        }
        (ColumnType::Integer | ColumnType::Real, UpdateExpr::Dec(v)) => {
            format!("{} - {}", col, bind(params, numeric(column, v)?))
        }
        (ColumnType::Integer | ColumnType::Real, UpdateExpr::Mul(v)) => {
            format!(
                "cast({} * {} as {})",
                col,
                bind(params, numeric(column, v)?),
                column_type.declared_name()
            )
        }

        (ColumnType::Text, UpdateExpr::Add(v)) => {
            format!("{} || {}", col, bind(params, v.to_param()))
        }

        (ColumnType::IntegerSet | ColumnType::TextSet, UpdateExpr::Add(v)) => {
            let element = set_element(column_type, v)?;
            let p = SetPatterns::bound(params, element.to_param());
            format!(
                "(CASE WHEN {c} is null or {c} = '[]' or {c} = {only} THEN {only} \
                 WHEN instr({c}, {first}) > 0 or instr({c}, {middle}) > 0 or instr({c}, {last}) > 0 THEN {c} \
                 ELSE substr({c}, 1, length({c}) - 1) || ',' || {e} || ']' END)",
                c = col,
                only = p.only,
                first = p.first,
                middle = p.middle,
                last = p.last,
                e = p.element
            )
        }
        (ColumnType::IntegerSet | ColumnType::TextSet, UpdateExpr::Del(v)) => {
            let element = set_element(column_type, v)?;
            let p = SetPatterns::bound(params, element.to_param());
            format!(
                "(CASE WHEN {c} is null THEN null WHEN {c} = '[]' THEN '[]' WHEN {c} = {only} THEN '[]' \
                 WHEN instr({c}, {first}) > 0 THEN replace({c}, {first}, '[') \
                 WHEN instr({c}, {middle}) > 0 THEN replace({c}, {middle}, ',') \
                 WHEN instr({c}, {last}) > 0 THEN replace({c}, {last}, ']') ELSE {c} END)",
                c = col,
                only = p.only,
                first = p.first,
                middle = p.middle,
                last = p.last
            )
        }

        (column_type, expr) => return Err(unsupported(column, column_type, expr)),
    };

    Ok(format!("{} = {}", col, rhs))
}

/// `UPDATE <qn> SET ... WHERE <filter>`
pub fn compile_update(table: &Table, changes: &Changes, filter: &Filter) -> Result<Statement> {
    if changes.is_empty() {
        return Err(VdbaError::invalid("Nothing to update"));
    }

    let mut params = Vec::new();
    let mut assignments = Vec::new();
    for (column, expr) in changes.iter() {
        if !is_identifier(column) {
            return Err(VdbaError::invalid(format!("Invalid column name '{}'", column)));
        }
        let column_type = table.column_type(column).ok_or_else(|| {
            VdbaError::invalid(format!("Table '{}' has no column '{}'", table.qn(), column))
        })?;
        assignments.push(compile_column_update(column, column_type, expr, &mut params)?);
    }

    let where_clause = compile_for(table, filter, &mut params)?;
    let sql = format!(
        "UPDATE {} SET {} WHERE {}",
        table.sql_qn(),
        assignments.join(", "),
        where_clause
    );
    Ok(Statement::new(sql, params))
}
