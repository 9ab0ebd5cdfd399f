//! DELETE statements

use super::filter::compile_for;
use super::Statement;
use crate::engine::definition::Table;
use crate::engine::error::Result;
use crate::engine::filter::Filter;

pub fn build_remove(table: &Table, filter: &Filter) -> Result<Statement> {
    let mut params = Vec::new();
    let where_clause = compile_for(table, filter, &mut params)?;
    Ok(Statement::new(
        format!("DELETE FROM {} WHERE {}", table.sql_qn(), where_clause),
        params,
    ))
}

pub fn build_truncate(table: &Table) -> Statement {
    Statement::new(format!("DELETE FROM {}", table.sql_qn()), Vec::new())
}
