//! Table Handle
//!
//! Reads, writes and query building on one table. Every statement is
//! validated against the table definition before anything reaches the store.

use std::sync::Arc;

use tracing::debug;

use super::connection::Connection;
use super::definition::Table;
use super::error::Result;
use super::filter::Filter;
use super::query::join::JoinTarget;
use super::query::Query;
use super::result::ResultSet;
use super::sql::insert::build_insert;
use super::sql::remove::{build_remove, build_truncate};
use super::sql::select::build_count;
use super::sql::update::{compile_update, Changes};
use super::value::{Row, Value};

#[derive(Debug, Clone, Copy, Default)]
pub struct InsertOptions {
    /// Report the rowid of each inserted row
    pub return_id: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    /// Rows to change; an empty filter changes every row
    pub filter: Filter,
}

impl UpdateOptions {
    pub fn filter(filter: Filter) -> Self {
        Self { filter }
    }
}

#[derive(Clone)]
pub struct TableHandle<'c> {
    conn: &'c Connection,
    table: Arc<Table>,
}

impl<'c> TableHandle<'c> {
    pub(crate) fn new(conn: &'c Connection, table: Arc<Table>) -> Self {
        Self { conn, table }
    }

    pub fn definition(&self) -> &Arc<Table> {
        &self.table
    }

    pub fn query(&self) -> Query<'c> {
        Query::new(self.conn, Arc::clone(&self.table))
    }

    pub fn find(&self, filter: Filter) -> Result<ResultSet> {
        self.query().filter(filter).find()
    }

    pub fn find_one(&self, filter: Filter) -> Result<Option<Row>> {
        self.query().filter(filter).find_one()
    }

    pub fn find_all(&self) -> Result<ResultSet> {
        self.query().find_all()
    }

    pub fn join(&self, target: impl Into<JoinTarget>, source_column: &str, target_column: Option<&str>) -> Query<'c> {
        self.query().join(target, source_column, target_column)
    }

    pub fn join_one_to_one(
        &self,
        target: impl Into<JoinTarget>,
        source_column: &str,
        target_column: Option<&str>,
    ) -> Query<'c> {
        self.query().join_one_to_one(target, source_column, target_column)
    }

    pub fn join_one_to_many(
        &self,
        target: impl Into<JoinTarget>,
        source_column: &str,
        target_column: Option<&str>,
    ) -> Query<'c> {
        self.query().join_one_to_many(target, source_column, target_column)
    }

    /// Number of rows matching `filter`
    pub fn count(&self, filter: &Filter) -> Result<u64> {
        let statement = build_count(&self.table, filter)?;
        let row = self.conn.query_one(&statement.sql, &statement.params)?;
        let count = row
            .as_ref()
            .and_then(|r| r.get("count"))
            .and_then(Value::as_i64)
            .unwrap_or(0);
        Ok(count.max(0) as u64)
    }

    /// Insert one row; the rowid is returned when `options.return_id` is set
    pub fn insert(&self, row: &Row, options: InsertOptions) -> Result<Option<i64>> {
        let statement = build_insert(&self.table, row)?;
        let result = self.conn.run(&statement)?;
        Ok(result.last_insert_id.filter(|_| options.return_id))
    }

    /// Insert several rows in one transaction. The first failure rolls the
    /// whole batch back. Rowids are reported when `options.return_id` is set.
    pub fn insert_many(&self, rows: &[Row], options: InsertOptions) -> Result<Vec<i64>> {
        let statements = rows
            .iter()
            .map(|row| build_insert(&self.table, row))
            .collect::<Result<Vec<_>>>()?;
        if statements.is_empty() {
            return Ok(Vec::new());
        }

        debug!(table = %self.table.qn(), rows = statements.len(), "Batch insert");
        let ids = self.conn.transaction(|adapter| {
            let mut ids = Vec::with_capacity(statements.len());
            for statement in &statements {
                let result = adapter.run(&statement.sql, &statement.params)?;
                ids.extend(result.last_insert_id);
            }
            Ok(ids)
        })?;

        Ok(if options.return_id { ids } else { Vec::new() })
    }

    /// Apply `changes` to the rows `options.filter` selects; returns the number of rows changed
    pub fn update(&self, changes: &Changes, options: UpdateOptions) -> Result<u64> {
        let statement = compile_update(&self.table, changes, &options.filter)?;
        Ok(self.conn.run(&statement)?.affected_rows)
    }

    pub fn remove(&self, filter: &Filter) -> Result<u64> {
        let statement = build_remove(&self.table, filter)?;
        Ok(self.conn.run(&statement)?.affected_rows)
    }

    pub fn truncate(&self) -> Result<u64> {
        let statement = build_truncate(&self.table);
        Ok(self.conn.run(&statement)?.affected_rows)
    }
}

impl std::fmt::Debug for TableHandle<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableHandle").field("table", &self.table.qn()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::adapter::dialect::{ColumnDef, TableOptions};
    use crate::engine::config::ConnectionConfig;
    use crate::engine::error::VdbaError;

    fn setup() -> Connection {
        let conn = Connection::open(ConnectionConfig::in_memory()).unwrap();
        conn.database()
            .unwrap()
            .create_table(
                "default",
                "items",
                &[
                    ColumnDef::new("id", "sequence"),
                    ColumnDef::new("name", "text").unique(),
                    ColumnDef::new("qty", "integer"),
                    ColumnDef::new("active", "boolean"),
                ],
                TableOptions::default(),
            )
            .unwrap();
        conn
    }

    fn item(name: &str, qty: i64) -> Row {
        Row::new().with("name", name).with("qty", qty).with("active", true)
    }

    #[test]
    fn test_insert_find_update_remove() {
        let conn = setup();
        let items = conn.database().unwrap().table("default", "items").unwrap();

        let id = items.insert(&item("bolt", 10), InsertOptions { return_id: true }).unwrap();
        assert_eq!(id, Some(1));
        assert_eq!(items.insert(&item("nut", 5), InsertOptions::default()).unwrap(), None);

        let bolt = items.find_one(Filter::new().eq("name", "bolt")).unwrap().unwrap();
        assert_eq!(bolt.get("active"), Some(&Value::Bool(true)));

        let changed = items
            .update(
                &Changes::new().inc("qty", 5i64),
                UpdateOptions::filter(Filter::new().eq("name", "bolt")),
            )
            .unwrap();
        assert_eq!(changed, 1);
        let bolt = items.find_one(Filter::new().eq("name", "bolt")).unwrap().unwrap();
        assert_eq!(bolt.get("qty"), Some(&Value::Integer(15)));

        assert_eq!(items.count(&Filter::new()).unwrap(), 2);
        assert_eq!(items.remove(&Filter::new().lt("qty", 10i64)).unwrap(), 1);
        assert_eq!(items.truncate().unwrap(), 1);
        assert!(items.find_all().unwrap().is_empty());
    }

    #[test]
    fn test_insert_many_rolls_back_on_failure() {
        let conn = setup();
        let items = conn.database().unwrap().table("default", "items").unwrap();

        let ids = items
            .insert_many(&[item("a", 1), item("b", 2)], InsertOptions { return_id: true })
            .unwrap();
        assert_eq!(ids, vec![1, 2]);

        // "a" violates the unique constraint half way through
        let err = items
            .insert_many(&[item("c", 3), item("a", 4)], InsertOptions::default())
            .unwrap_err();
        assert!(matches!(err, VdbaError::Store(_)));
        assert_eq!(items.count(&Filter::new()).unwrap(), 2);
    }

    #[test]
    fn test_insert_many_rejects_unknown_columns_before_io() {
        let conn = setup();
        let items = conn.database().unwrap().table("default", "items").unwrap();

        let rows = [item("a", 1), Row::new().with("colour", "red")];
        let err = items.insert_many(&rows, InsertOptions::default()).unwrap_err();
        assert!(matches!(err, VdbaError::InvalidArgument(_)));
        assert_eq!(items.count(&Filter::new()).unwrap(), 0);
    }
}
