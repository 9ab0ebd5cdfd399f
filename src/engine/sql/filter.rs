//! Filter compiler
//!
//! Turns a `Filter` into a WHERE/HAVING expression. Literals only ever reach
//! the statement as bound parameters.

use super::{bind, quote_column, set_operand, Scope, SetPatterns};
use crate::engine::adapter::dialect::is_column_ref;
use crate::engine::adapter::SqlValue;
use crate::engine::definition::{ColumnType, Table};
use crate::engine::error::{Result, VdbaError};
use crate::engine::filter::{Filter, Predicate};

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFilter {
    pub expression: String,
    pub parameters: Vec<SqlValue>,
}

pub fn compile(filter: &Filter) -> Result<CompiledFilter> {
    let mut parameters = Vec::new();
    let expression = compile_into(filter, &mut parameters)?;
    Ok(CompiledFilter { expression, parameters })
}

/// Compile against an existing parameter list, numbering placeholders after
/// the values already in it.
pub fn compile_into(filter: &Filter, params: &mut Vec<SqlValue>) -> Result<String> {
    compile_scoped(filter, params, &quote_column, &|_| None)
}

/// Compile a filter on the columns of one table. Set membership operands
/// are coerced to the column's element type.
pub fn compile_for(table: &Table, filter: &Filter, params: &mut Vec<SqlValue>) -> Result<String> {
    let scope = Scope::single(table);
    compile_scoped(filter, params, &|c| scope.render(c), &|c| scope.column_type(c))
}

/// Compile with a caller-provided column renderer (used to qualify columns
/// in multi-table statements) and column type lookup.
pub(crate) fn compile_scoped(
    filter: &Filter,
    params: &mut Vec<SqlValue>,
    render: &dyn Fn(&str) -> String,
    column_type: &dyn Fn(&str) -> Option<ColumnType>,
) -> Result<String> {
    if filter.is_empty() {
        // always-true, still a well-formed parameterized expression
        let a = bind(params, SqlValue::Bool(true));
        let b = bind(params, SqlValue::Bool(true));
        return Ok(format!("{} = {}", a, b));
    }

    let mut conjuncts = Vec::with_capacity(filter.conditions().len());
    for cond in filter.conditions() {
        if !is_column_ref(&cond.column) {
            return Err(VdbaError::invalid(format!("Invalid column name '{}'", cond.column)));
        }
        if cond.predicates.is_empty() {
            return Err(VdbaError::invalid(format!("No operator given for column '{}'", cond.column)));
        }

        let column = render(&cond.column);
        let kind = column_type(&cond.column);
        let parts = cond
            .predicates
            .iter()
            .map(|p| compile_predicate(&column, kind.as_ref(), p, params))
            .collect::<Result<Vec<_>>>()?;
        conjuncts.push(format!("({})", parts.join(" and ")));
    }

    Ok(conjuncts.join(" and "))
}

fn compile_predicate(
    column: &str,
    column_type: Option<&ColumnType>,
    predicate: &Predicate,
    params: &mut Vec<SqlValue>,
) -> Result<String> {
    let sql = match predicate {
        Predicate::Eq(SqlValue::Null) => format!("{} is null", column),
        Predicate::Ne(SqlValue::Null) => format!("{} is not null", column),
        Predicate::Eq(v) => comparison(column, "=", v, params),
        Predicate::Ne(v) => comparison(column, "<>", v, params),
        Predicate::Lt(v) => comparison(column, "<", v, params),
        Predicate::Le(v) => comparison(column, "<=", v, params),
        Predicate::Gt(v) => comparison(column, ">", v, params),
        Predicate::Ge(v) => comparison(column, ">=", v, params),
        Predicate::Like(v) => comparison(column, "like", v, params),
        Predicate::NotLike(v) => comparison(column, "not like", v, params),
        Predicate::In(items) => format!("{} in ({})", column, placeholders(items, params)),
        Predicate::NotIn(items) => format!("{} not in ({})", column, placeholders(items, params)),
        Predicate::Contains(v) => {
            SetPatterns::bound(params, set_operand(column_type, v)?).contains(column)
        }
        Predicate::NotContains(v) => {
            let contains = SetPatterns::bound(params, set_operand(column_type, v)?).contains(column);
            format!("({} is null or not{})", column, contains)
        }
    };
    Ok(sql)
}

fn comparison(column: &str, op: &str, value: &SqlValue, params: &mut Vec<SqlValue>) -> String {
    format!("{} {} {}", column, op, bind(params, value.clone()))
}

fn placeholders(items: &[SqlValue], params: &mut Vec<SqlValue>) -> String {
    items
        .iter()
        .map(|v| bind(params, v.clone()))
        .collect::<Vec<_>>()
        .join(", ")
}
