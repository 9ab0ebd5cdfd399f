//! vdba - document-style query and update language over SQLite
//!
//! Filters, updates and aggregations are written as Mongo-like documents (or
//! built with typed builders), compiled to parameterized SQL and run against
//! an embedded SQLite database. Rows come back with their declared types
//! restored: booleans, dates, sets and nested join records.

pub mod engine;

pub use engine::{
    Changes, Column, ColumnType, Connection, ConnectionConfig, Database, Filter, GroupBy, InsertOptions, JoinMode,
    Query, Registry, Result, ResultSet, Row, TableHandle, UpdateExpr, UpdateOptions, Value, VdbaError,
};
