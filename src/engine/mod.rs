// vdba Engine - Core module structure
pub mod adapter;
pub mod cli;
pub mod config;
pub mod connection;
pub mod converter;
pub mod database;
pub mod definition;
pub mod error;
pub mod filter;
pub mod query;
pub mod registry;
pub mod result;
pub mod sql;
pub mod table;
pub mod value;

pub use adapter::{DatabaseAdapter, SortDirection, SqlValue, SqliteAdapter};
pub use config::ConnectionConfig;
pub use connection::{Connection, Server};
pub use database::Database;
pub use definition::{Column, ColumnType, Schema, Table};
pub use error::{Result, VdbaError};
pub use filter::{Filter, Predicate};
pub use query::{GroupBy, JoinMode, Query};
pub use registry::{Driver, Registry, SqliteDriver};
pub use result::{ResultOptions, ResultSet};
pub use sql::update::{Changes, UpdateExpr};
pub use table::{InsertOptions, TableHandle, UpdateOptions};
pub use value::{Row, Value};
