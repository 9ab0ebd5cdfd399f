//! Database Facade
//! Table lookup and data-definition statements for one connection

use std::sync::Arc;

use tracing::info;

use super::adapter::dialect::{check_identifier, ColumnDef, IndexOptions, TableOptions};
use super::adapter::{DialectGenerator, SqlValue};
use super::connection::Connection;
use super::definition::{qualified_name, Schema, Table};
use super::error::{Result, VdbaError};
use super::table::TableHandle;

pub struct Database<'c> {
    conn: &'c Connection,
}

impl<'c> Database<'c> {
    pub(crate) fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    fn generator(&self) -> Result<DialectGenerator> {
        Ok(DialectGenerator::new(self.conn.adapter()?.dialect()))
    }

    pub fn name(&self) -> String {
        self.conn.config().database.display().to_string()
    }

    pub fn schema(&self, name: &str) -> Result<Schema> {
        check_identifier("Schema", name)?;
        let mut cache = self.conn.cache();
        if let Some(schema) = cache.get_schema(name) {
            return Ok(schema.clone());
        }
        let schema = Schema::new(&self.name(), name);
        Ok(cache.add_schema(schema).clone())
    }

    /// Definition of `schema.table`, `None` when the table does not exist
    pub fn find_table(&self, schema: &str, table: &str) -> Result<Option<Arc<Table>>> {
        check_identifier("Schema", schema)?;
        check_identifier("Table", table)?;
        self.conn.load_table(schema, table)
    }

    /// Handle on an existing table
    pub fn table(&self, schema: &str, name: &str) -> Result<TableHandle<'c>> {
        match self.find_table(schema, name)? {
            Some(table) => Ok(TableHandle::new(self.conn, table)),
            None => Err(VdbaError::invalid(format!(
                "Table doesn't exist: {}",
                qualified_name(schema, name)
            ))),
        }
    }

    /// Whether the table exists and has every one of `columns`
    pub fn has_table(&self, schema: &str, table: &str, columns: &[&str]) -> Result<bool> {
        Ok(self
            .find_table(schema, table)?
            .is_some_and(|t| t.check_columns(columns)))
    }

    pub fn has_tables(&self, schema: &str, tables: &[&str]) -> Result<bool> {
        for table in tables {
            if self.find_table(schema, table)?.is_none() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn create_table(
        &self,
        schema: &str,
        table: &str,
        columns: &[ColumnDef],
        options: TableOptions,
    ) -> Result<()> {
        let sql = self.generator()?.create_table(schema, table, columns, options)?;
        self.conn.adapter()?.execute_batch(&sql)?;
        info!(table = %qualified_name(schema, table), columns = columns.len(), "Table created");
        Ok(())
    }

    /// Drop a table. The cached definition is forgotten even when the
    /// statement fails.
    pub fn drop_table(&self, schema: &str, table: &str) -> Result<()> {
        check_identifier("Schema", schema)?;
        check_identifier("Table", table)?;
        let sql = self.generator()?.drop_table(schema, table);
        let result = self.conn.adapter()?.execute_batch(&sql);
        self.conn.cache().invalidate(schema, table);
        result?;
        info!(table = %qualified_name(schema, table), "Table dropped");
        Ok(())
    }

    pub fn create_index(
        &self,
        schema: &str,
        table: &str,
        index: &str,
        columns: &[&str],
        options: IndexOptions,
    ) -> Result<()> {
        check_identifier("Schema", schema)?;
        let sql = self.generator()?.create_index(schema, table, index, columns, options)?;
        self.conn.adapter()?.execute_batch(&sql)?;
        info!(index = %qualified_name(schema, index), table = %qualified_name(schema, table), "Index created");
        Ok(())
    }

    pub fn drop_index(&self, schema: &str, index: &str) -> Result<()> {
        check_identifier("Schema", schema)?;
        check_identifier("Index", index)?;
        let sql = self.generator()?.drop_index(schema, index);
        self.conn.adapter()?.execute_batch(&sql)?;
        info!(index = %qualified_name(schema, index), "Index dropped");
        Ok(())
    }

    /// Name of the table an index belongs to
    pub fn find_index(&self, schema: &str, index: &str) -> Result<Option<String>> {
        check_identifier("Schema", schema)?;
        check_identifier("Index", index)?;
        let sql = self.generator()?.find_index();
        let name = SqlValue::Text(qualified_name(schema, index));
        let row = self.conn.query_one(sql, &[name])?;
        Ok(row.and_then(|r| r.get("tbl_name").and_then(|v| v.as_str().map(str::to_string))))
    }

    pub fn has_index(&self, schema: &str, index: &str) -> Result<bool> {
        Ok(self.find_index(schema, index)?.is_some())
    }

    /// SQLite has no namespaces; a schema is only a table name prefix.
    pub fn create_schema(&self, name: &str) -> Result<Schema> {
        self.schema(name)
    }

    pub fn drop_schema(&self, name: &str) -> Result<()> {
        check_identifier("Schema", name)?;
        self.conn.adapter()?;
        if self.conn.cache().invalidate_schema(name) {
            info!(schema = %name.to_lowercase(), "Schema dropped");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::ConnectionConfig;
    use crate::engine::definition::ColumnType;

    fn open() -> Connection {
        Connection::open(ConnectionConfig::in_memory()).unwrap()
    }

    fn users() -> Vec<ColumnDef> {
        vec![
            ColumnDef::new("id", "sequence"),
            ColumnDef::new("name", "text").required(),
            ColumnDef::new("tags", "set<text>"),
        ]
    }

    #[test]
    fn test_create_and_find_table() {
        let conn = open();
        let db = conn.database().unwrap();
        db.create_table("default", "users", &users(), TableOptions::default()).unwrap();

        let table = db.find_table("default", "users").unwrap().unwrap();
        assert_eq!(table.column_type("tags"), Some(&ColumnType::TextSet));
        assert!(table.column("id").unwrap().primary_key);
        assert!(db.has_table("default", "users", &["id", "name"]).unwrap());
        assert!(!db.has_table("default", "users", &["id", "age"]).unwrap());
        assert!(!db.has_tables("default", &["users", "orders"]).unwrap());
        assert!(db.find_table("default", "orders").unwrap().is_none());
    }

    #[test]
    fn test_named_schema_prefixes_table() {
        let conn = open();
        let db = conn.database().unwrap();
        db.create_schema("sales").unwrap();
        db.create_table("sales", "orders", &[ColumnDef::new("id", "integer")], TableOptions::default())
            .unwrap();

        let table = db.find_table("sales", "orders").unwrap().unwrap();
        assert_eq!(table.sql_qn(), "\"sales.orders\"");
        assert!(db.find_table("default", "orders").unwrap().is_none());
    }

    #[test]
    fn test_drop_table_invalidates_cache() {
        let conn = open();
        let db = conn.database().unwrap();
        db.create_table("default", "users", &users(), TableOptions::default()).unwrap();
        let before = db.find_table("default", "users").unwrap().unwrap();

        db.drop_table("default", "users").unwrap();
        assert!(db.find_table("default", "users").unwrap().is_none());

        db.create_table("default", "users", &[ColumnDef::new("id", "integer")], TableOptions::default())
            .unwrap();
        let after = db.find_table("default", "users").unwrap().unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(after.columns().len(), 1);
    }

    #[test]
    fn test_indexes() {
        let conn = open();
        let db = conn.database().unwrap();
        db.create_table("default", "users", &users(), TableOptions::default()).unwrap();

        let options = IndexOptions { unique: true, if_not_exists: false };
        db.create_index("default", "users", "users_name", &["name"], options).unwrap();
        assert_eq!(db.find_index("default", "users_name").unwrap().as_deref(), Some("users"));
        assert!(db.has_index("default", "users_name").unwrap());

        db.drop_index("default", "users_name").unwrap();
        assert!(!db.has_index("default", "users_name").unwrap());
    }

    #[test]
    fn test_table_handle_requires_table() {
        let conn = open();
        let db = conn.database().unwrap();
        assert!(matches!(db.table("default", "nope"), Err(VdbaError::InvalidArgument(_))));
        assert!(matches!(db.find_table("default", "a b"), Err(VdbaError::InvalidArgument(_))));
    }
}
