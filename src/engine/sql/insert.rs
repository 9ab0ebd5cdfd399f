//! INSERT statements

use super::{bind, write_value, Statement};
use crate::engine::adapter::dialect::quote_ident;
use crate::engine::definition::Table;
use crate::engine::error::{Result, VdbaError};
use crate::engine::value::Row;

/// `INSERT INTO <qn>(cols) VALUES(?1, ...)`. Every column must exist in the
/// table; an empty row inserts the column defaults.
pub fn build_insert(table: &Table, row: &Row) -> Result<Statement> {
    if row.is_empty() {
        return Ok(Statement::new(
            format!("INSERT INTO {} DEFAULT VALUES", table.sql_qn()),
            Vec::new(),
        ));
    }

    let mut params = Vec::with_capacity(row.len());
    let mut columns = Vec::with_capacity(row.len());
    let mut placeholders = Vec::with_capacity(row.len());

    for (name, value) in row.iter() {
        let column_type = table.column_type(name).ok_or_else(|| {
            VdbaError::invalid(format!("Table '{}' has no column '{}'", table.qn(), name))
        })?;
        columns.push(quote_ident(name));
        placeholders.push(bind(&mut params, write_value(column_type, value)?));
    }

    Ok(Statement::new(
        format!(
            "INSERT INTO {}({}) VALUES({})",
            table.sql_qn(),
            columns.join(", "),
            placeholders.join(", ")
        ),
        params,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::adapter::SqlValue;
    use crate::engine::definition::{Column, ColumnType};
    use chrono::NaiveDate;

    fn table() -> Table {
        Table::new(
            "default",
            "people",
            vec![
                Column::new("id", ColumnType::Integer).primary_key(),
                Column::new("name", ColumnType::Text),
                Column::new("born", ColumnType::Date),
                Column::new("tags", ColumnType::TextSet),
            ],
        )
    }

    #[test]
    fn test_insert_serializes_rich_values() {
        let row = Row::new()
            .with("name", "ann")
            .with("born", NaiveDate::from_ymd_opt(1990, 1, 2).unwrap())
            .with("tags", vec!["a", "b"]);
        let stmt = build_insert(&table(), &row).unwrap();

        assert_eq!(stmt.sql, "INSERT INTO \"people\"(\"name\", \"born\", \"tags\") VALUES(?1, ?2, ?3)");
        assert_eq!(
            stmt.params,
            vec![
                SqlValue::Text("ann".into()),
                SqlValue::Text("1990-01-02".into()),
                SqlValue::Text(r#"["a","b"]"#.into()),
            ]
        );
    }

    #[test]
    fn test_insert_rejects_unknown_column() {
        let err = build_insert(&table(), &Row::new().with("age", 3)).unwrap_err();
        assert!(matches!(err, VdbaError::InvalidArgument(_)));
    }

    #[test]
    fn test_insert_defaults() {
        let stmt = build_insert(&table(), &Row::new()).unwrap();
        assert_eq!(stmt.sql, "INSERT INTO \"people\" DEFAULT VALUES");
    }
}
