//! Table metadata: column types, tables, schemas and the per-connection cache

pub mod cache;
pub mod column;
pub mod table;

pub use cache::DefinitionCache;
pub use column::{Column, ColumnType};
pub use table::{qualified_name, Schema, Table, DEFAULT_SCHEMA};
