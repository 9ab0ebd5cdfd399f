//! Table and schema definitions

use serde::Serialize;

use super::column::{Column, ColumnType};
use crate::engine::adapter::dialect::quote_ident;

pub const DEFAULT_SCHEMA: &str = "default";

/// Unquoted backend name of a table. The default schema is elided, any other
/// schema is folded into the table name as `schema.table`.
pub fn qualified_name(schema: &str, table: &str) -> String {
    let schema = schema.to_lowercase();
    let table = table.to_lowercase();
    if schema == DEFAULT_SCHEMA {
        table
    } else {
        format!("{}.{}", schema, table)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schema {
    pub database: String,
    pub name: String,
}

impl Schema {
    pub fn new(database: &str, name: &str) -> Self {
        Self {
            database: database.to_string(),
            name: name.to_lowercase(),
        }
    }

    /// SQLite has no namespaces; only the default one maps to plain names.
    pub fn is_default(&self) -> bool {
        self.name == DEFAULT_SCHEMA
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    schema: String,
    name: String,
    columns: Vec<Column>,
    #[serde(skip)]
    set_columns: Vec<String>,
    #[serde(skip)]
    adaptable_columns: Vec<String>,
    #[serde(skip)]
    sql_qn: String,
}

impl Table {
    pub fn new(schema: &str, name: &str, columns: Vec<Column>) -> Self {
        let schema = schema.to_lowercase();
        let name = name.to_lowercase();

        let set_columns = columns
            .iter()
            .filter(|c| c.column_type.is_set())
            .map(|c| c.name.clone())
            .collect();
        let adaptable_columns = columns
            .iter()
            .filter(|c| c.column_type.is_adaptable())
            .map(|c| c.name.clone())
            .collect();
        let sql_qn = quote_ident(&qualified_name(&schema, &name));

        Self {
            schema,
            name,
            columns,
            set_columns,
            adaptable_columns,
            sql_qn,
        }
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unquoted qualified name, as given to metadata calls
    pub fn qn(&self) -> String {
        qualified_name(&self.schema, &self.name)
    }

    /// Quoted qualified name, as written into statements
    pub fn sql_qn(&self) -> &str {
        &self.sql_qn
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_type(&self, name: &str) -> Option<&ColumnType> {
        self.column(name).map(|c| &c.column_type)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// True when every named column exists
    pub fn check_columns(&self, names: &[&str]) -> bool {
        names.iter().all(|n| self.has_column(n))
    }

    pub fn set_columns(&self) -> &[String] {
        &self.set_columns
    }

    pub fn adaptable_columns(&self) -> &[String] {
        &self.adaptable_columns
    }

    pub fn is_adaptable(&self, name: &str) -> bool {
        self.adaptable_columns.iter().any(|c| c == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> Table {
        Table::new(
            "default",
            "Users",
            vec![
                Column::new("id", ColumnType::Integer).primary_key(),
                Column::new("name", ColumnType::Text),
                Column::new("active", ColumnType::Boolean),
                Column::new("tags", ColumnType::TextSet),
                Column::new("born", ColumnType::Date),
            ],
        )
    }

    #[test]
    fn test_derived_column_sets() {
        let t = users();
        assert_eq!(t.name(), "users");
        assert_eq!(t.set_columns(), &["tags".to_string()]);
        assert_eq!(t.adaptable_columns(), &["active", "tags", "born"]);
        assert!(!t.is_adaptable("name"));
        assert!(t.check_columns(&["id", "name"]));
        assert!(!t.check_columns(&["id", "nope"]));
    }

    #[test]
    fn test_qualified_names() {
        assert_eq!(users().sql_qn(), "\"users\"");
        let t = Table::new("Sales", "Orders", vec![]);
        assert_eq!(t.qn(), "sales.orders");
        assert_eq!(t.sql_qn(), "\"sales.orders\"");
        assert!(Schema::new("db", "DEFAULT").is_default());
    }
}
