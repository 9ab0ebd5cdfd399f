//! Select and aggregation assembler
//!
//! Builds SELECT statements for the four query shapes (simple or joined,
//! plain or aggregated) and adapts the rows they return.

use super::filter::{compile_for, compile_scoped};
use super::{Scope, Statement};
use crate::engine::adapter::dialect::{is_column_ref, is_identifier, quote_ident};
use crate::engine::adapter::{SortDirection, SqlValue};
use crate::engine::converter::{adapt_joined, cast_row, cast_selected, JoinShape};
use crate::engine::definition::Table;
use crate::engine::error::{Result, VdbaError};
use crate::engine::filter::Filter;
use crate::engine::query::group::{AggOp, GroupBy};
use crate::engine::query::join::Join;
use crate::engine::value::Row;

/// `LIMIT count OFFSET start`; no count means no upper bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Limit {
    pub count: Option<u64>,
    pub start: u64,
}

/// Everything a query carries besides its source table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySpec {
    pub filter: Filter,
    pub group: Option<GroupBy>,
    pub order: Vec<(String, SortDirection)>,
    pub limit: Option<Limit>,
    pub joins: Vec<Join>,
}

impl QuerySpec {
    /// The single supported join, if any
    pub fn join(&self) -> Result<Option<&Join>> {
        match self.joins.as_slice() {
            [] => Ok(None),
            [join] => Ok(Some(join)),
            _ => Err(VdbaError::invalid("Only one join per query is supported")),
        }
    }

    pub fn is_aggregate(&self) -> bool {
        self.group.is_some()
    }
}

fn check_ref(column: &str) -> Result<()> {
    if is_column_ref(column) {
        Ok(())
    } else {
        Err(VdbaError::invalid(format!("Invalid column name '{}'", column)))
    }
}

fn order_clause(spec: &QuerySpec, render: &dyn Fn(&str) -> String) -> Result<String> {
    if spec.order.is_empty() {
        return Ok(String::new());
    }
    let parts = spec
        .order
        .iter()
        .map(|(column, dir)| {
            check_ref(column)?;
            Ok(format!("{} {}", render(column), dir))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(format!(" ORDER BY {}", parts.join(", ")))
}

fn limit_clause(limit: Option<Limit>) -> String {
    match limit {
        None => String::new(),
        Some(Limit { count: Some(count), start }) => format!(" LIMIT {} OFFSET {}", count, start),
        Some(Limit { count: None, start }) => format!(" LIMIT -1 OFFSET {}", start),
    }
}

fn from_clause(source: &Table, join: Option<(&Join, &Table)>) -> Result<String> {
    let Some((join, target)) = join else {
        return Ok(source.sql_qn().to_string());
    };

    if !source.has_column(&join.source_column) {
        return Err(VdbaError::invalid(format!(
            "Table '{}' has no join column '{}'",
            source.qn(),
            join.source_column
        )));
    }
    if !target.has_column(&join.target_column) {
        return Err(VdbaError::invalid(format!(
            "Table '{}' has no join column '{}'",
            target.qn(),
            join.target_column
        )));
    }

    Ok(format!(
        "{src} INNER JOIN {tgt} ON {src}.{sc} = {tgt}.{tc}",
        src = source.sql_qn(),
        tgt = target.sql_qn(),
        sc = quote_ident(&join.source_column),
        tc = quote_ident(&join.target_column)
    ))
}

/// Select list of a plain joined query: source columns under their own
/// names, target columns aliased `target.column`.
fn joined_columns(source: &Table, target: &Table) -> String {
    let src = source
        .columns()
        .iter()
        .map(|c| format!("{}.{} AS {}", source.sql_qn(), quote_ident(&c.name), quote_ident(&c.name)));
    let tgt = target.columns().iter().map(|c| {
        format!(
            "{}.{} AS {}",
            target.sql_qn(),
            quote_ident(&c.name),
            quote_ident(&JoinShape::alias(target, &c.name))
        )
    });
    src.chain(tgt).collect::<Vec<_>>().join(", ")
}

fn aggregate_parts(group: &GroupBy, scope: &Scope<'_>) -> Result<(Vec<String>, Vec<String>)> {
    if group.columns.is_empty() && group.operations.is_empty() {
        return Err(VdbaError::invalid("Group by needs columns or aggregations"));
    }

    let mut select = Vec::new();
    let mut group_cols = Vec::new();
    for column in &group.columns {
        check_ref(column)?;
        let (_, bare) = scope.owned(column)?;
        let rendered = scope.render(column);
        if scope.target.is_some() {
            select.push(format!("{} AS {}", rendered, quote_ident(bare)));
        } else {
            select.push(rendered.clone());
        }
        group_cols.push(rendered);
    }

    for op in &group.operations {
        if !is_identifier(&op.alias) {
            return Err(VdbaError::invalid(format!("Invalid aggregation alias '{}'", op.alias)));
        }
        let argument = if op.column == "*" {
            if op.op != AggOp::Count {
                return Err(VdbaError::invalid(format!("{}(*) is not supported", op.op)));
            }
            "*".to_string()
        } else {
            check_ref(&op.column)?;
            scope.owned(&op.column)?;
            scope.render(&op.column)
        };
        select.push(format!("{}({}) AS {}", op.op, argument, quote_ident(&op.alias)));
    }

    Ok((select, group_cols))
}

/// Build the SELECT for a query. `target` is the resolved join target and
/// must be given whenever the query has a join.
pub fn build_select(spec: &QuerySpec, source: &Table, target: Option<&Table>) -> Result<Statement> {
    let join = match (spec.join()?, target) {
        (Some(join), Some(target)) => Some((join, target)),
        (Some(_), None) => return Err(VdbaError::invalid("Join target is not resolved")),
        (None, _) => None,
    };
    let scope = Scope {
        source,
        target: join.map(|(_, t)| t),
    };
    let render = |c: &str| scope.render(c);
    let column_type = |c: &str| scope.column_type(c);

    let mut params: Vec<SqlValue> = Vec::new();
    let from = from_clause(source, join)?;

    let sql = match &spec.group {
        None => {
            let columns = match join {
                Some((_, target)) => joined_columns(source, target),
                None => "*".to_string(),
            };
            let where_clause = compile_scoped(&spec.filter, &mut params, &render, &column_type)?;
            format!(
                "SELECT {} FROM {} WHERE {}{}{}",
                columns,
                from,
                where_clause,
                order_clause(spec, &render)?,
                limit_clause(spec.limit)
            )
        }
        Some(group) => {
            let (select, group_cols) = aggregate_parts(group, &scope)?;
            let where_clause = compile_scoped(&spec.filter, &mut params, &render, &column_type)?;

            let mut sql = format!("SELECT {} FROM {} WHERE {}", select.join(", "), from, where_clause);
            if !group_cols.is_empty() {
                sql.push_str(&format!(" GROUP BY {}", group_cols.join(", ")));
            }

            let having = group.having_filter();
            if !having.is_empty() {
                let expr = compile_scoped(&having, &mut params, &|alias: &str| quote_ident(alias), &|_| None)?;
                sql.push_str(&format!(" HAVING {}", expr));
            }

            let aliases: Vec<&str> = group.operations.iter().map(|o| o.alias.as_str()).collect();
            let order_render = |c: &str| {
                if aliases.contains(&c) {
                    quote_ident(c)
                } else {
                    scope.render(c)
                }
            };
            sql.push_str(&order_clause(spec, &order_render)?);
            sql.push_str(&limit_clause(spec.limit));
            sql
        }
    };

    Ok(Statement::new(sql, params))
}

/// `SELECT count(*) AS "count" FROM <qn> WHERE <filter>`
pub fn build_count(table: &Table, filter: &Filter) -> Result<Statement> {
    let mut params = Vec::new();
    let where_clause = compile_for(table, filter, &mut params)?;
    Ok(Statement::new(
        format!("SELECT count(*) AS \"count\" FROM {} WHERE {}", table.sql_qn(), where_clause),
        params,
    ))
}

/// Convert the raw rows of a query built by `build_select`.
pub fn adapt_rows(rows: Vec<Row>, spec: &QuerySpec, source: &Table, target: Option<&Table>) -> Result<Vec<Row>> {
    let join = spec.join()?;
    let scope = Scope { source, target };

    if let Some(group) = &spec.group {
        let owned: Vec<(&Table, &str)> = group
            .columns
            .iter()
            .filter_map(|c| scope.owner(c))
            .collect();
        return Ok(rows
            .into_iter()
            .map(|mut row| {
                for (table, column) in &owned {
                    cast_selected(&mut row, table, &[*column]);
                }
                row
            })
            .collect());
    }

    let rows = match (join, target) {
        (Some(join), Some(target)) => {
            let shape = JoinShape {
                target,
                mode: join.mode,
                source_column: &join.source_column,
                target_column: &join.target_column,
            };
            rows.into_iter().map(|row| adapt_joined(row, source, &shape)).collect()
        }
        _ => rows
            .into_iter()
            .map(|mut row| {
                cast_row(&mut row, source);
                row
            })
            .collect(),
    };
    Ok(rows)
}
