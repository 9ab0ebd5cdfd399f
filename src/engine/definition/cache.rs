//! Schema definition cache
//!
//! Memoizes table metadata per connection. Entries are only dropped by
//! explicit invalidation (DDL drops); creating a table never touches it.

use std::collections::HashMap;
use std::sync::Arc;

use super::table::{Schema, Table};
use crate::engine::error::Result;

#[derive(Debug)]
struct SchemaEntry {
    schema: Schema,
    tables: HashMap<String, Arc<Table>>,
}

#[derive(Debug)]
pub struct DefinitionCache {
    database: String,
    schemas: HashMap<String, SchemaEntry>,
}

impl DefinitionCache {
    pub fn new(database: &str) -> Self {
        Self {
            database: database.to_string(),
            schemas: HashMap::new(),
        }
    }

    pub fn has_schema(&self, schema: &str) -> bool {
        self.schemas.contains_key(&schema.to_lowercase())
    }

    pub fn get_schema(&self, schema: &str) -> Option<&Schema> {
        self.schemas.get(&schema.to_lowercase()).map(|e| &e.schema)
    }

    pub fn add_schema(&mut self, schema: Schema) -> &Schema {
        let entry = self
            .schemas
            .entry(schema.name.clone())
            .or_insert_with(|| SchemaEntry {
                schema,
                tables: HashMap::new(),
            });
        &entry.schema
    }

    /// Forget a schema and every table cached under it
    pub fn invalidate_schema(&mut self, schema: &str) -> bool {
        self.schemas.remove(&schema.to_lowercase()).is_some()
    }

    pub fn has_table(&self, schema: &str, table: &str) -> bool {
        self.get_table(schema, table).is_some()
    }

    pub fn get_table(&self, schema: &str, table: &str) -> Option<Arc<Table>> {
        self.schemas
            .get(&schema.to_lowercase())
            .and_then(|e| e.tables.get(&table.to_lowercase()))
            .cloned()
    }

    /// Cache a table; the last write for a name wins.
    pub fn add_table(&mut self, table: Table) -> Arc<Table> {
        let database = self.database.clone();
        let entry = self
            .schemas
            .entry(table.schema().to_string())
            .or_insert_with(|| SchemaEntry {
                schema: Schema::new(&database, table.schema()),
                tables: HashMap::new(),
            });
        let table = Arc::new(table);
        entry.tables.insert(table.name().to_string(), Arc::clone(&table));
        table
    }

    pub fn invalidate(&mut self, schema: &str, table: &str) -> Option<Arc<Table>> {
        self.schemas
            .get_mut(&schema.to_lowercase())
            .and_then(|e| e.tables.remove(&table.to_lowercase()))
    }

    /// Read-through lookup. A loader answering `None` (no such table)
    /// leaves the cache untouched.
    pub fn get_or_load<F>(&mut self, schema: &str, table: &str, loader: F) -> Result<Option<Arc<Table>>>
    where
        F: FnOnce() -> Result<Option<Table>>,
    {
        if let Some(cached) = self.get_table(schema, table) {
            return Ok(Some(cached));
        }
        Ok(loader()?.map(|t| self.add_table(t)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::definition::{Column, ColumnType};

    fn table(name: &str) -> Table {
        Table::new("default", name, vec![Column::new("id", ColumnType::Integer)])
    }

    #[test]
    fn test_get_or_load_calls_loader_once() {
        let mut cache = DefinitionCache::new("main");
        let mut calls = 0;

        let first = cache
            .get_or_load("default", "users", || {
                calls += 1;
                Ok(Some(table("users")))
            })
            .unwrap()
            .unwrap();
        let second = cache
            .get_or_load("default", "USERS", || {
                calls += 1;
                Ok(Some(table("users")))
            })
            .unwrap()
            .unwrap();

        assert_eq!(calls, 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.get_schema("default").unwrap().database, "main");
    }

    #[test]
    fn test_absent_table_is_not_cached() {
        let mut cache = DefinitionCache::new("main");
        let found = cache.get_or_load("default", "ghost", || Ok(None)).unwrap();
        assert!(found.is_none());
        assert!(!cache.has_table("default", "ghost"));
    }

    #[test]
    fn test_invalidation() {
        let mut cache = DefinitionCache::new("main");
        cache.add_table(table("a"));
        cache.add_table(table("b"));

        assert!(cache.invalidate("default", "a").is_some());
        assert!(!cache.has_table("default", "a"));
        assert!(cache.has_table("default", "b"));

        assert!(cache.invalidate_schema("default"));
        assert!(!cache.has_schema("default"));
    }
}
