//! SQLite Adapter
//!
//! Implements DatabaseAdapter for SQLite using rusqlite + r2d2.
//! The pool holds exactly one connection: transaction control is issued as
//! separate statements and must land on the same connection as the work it
//! wraps.

use r2d2::{ManageConnection, Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::{ToSql, ValueRef};
use rusqlite::OpenFlags;
use std::path::PathBuf;

use super::dialect::SqlDialect;
use super::{AdapterError, AdapterResult, ColumnInfo, DatabaseAdapter, ExecResult, SqlValue};
use crate::engine::config::{ConnectionConfig, OpenMode};
use crate::engine::value::{Row, Value};

type DbPool = Pool<SqliteConnectionManager>;
type DbConn = PooledConnection<SqliteConnectionManager>;

pub struct SqliteAdapter {
    pool: DbPool,
    db_path: PathBuf,
}

impl SqliteAdapter {
    pub fn open(config: &ConnectionConfig) -> AdapterResult<Self> {
        let manager = if config.is_memory() {
            SqliteConnectionManager::memory()
        } else {
            let mut flags = OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX;
            match config.mode {
                OpenMode::Readonly => flags |= OpenFlags::SQLITE_OPEN_READ_ONLY,
                OpenMode::Readwrite => {
                    flags |= OpenFlags::SQLITE_OPEN_READ_WRITE;
                    if config.create {
                        flags |= OpenFlags::SQLITE_OPEN_CREATE;
                    }
                }
            }
            SqliteConnectionManager::file(&config.database).with_flags(flags)
        };
        let manager = manager.with_init(|c| c.execute_batch("PRAGMA foreign_keys=ON"));

        // Fail fast on a missing or unreadable file instead of waiting out the
        // pool's checkout timeout.
        let probe = manager
            .connect()
            .map_err(|e| AdapterError::Connection(e.to_string()))?;
        drop(probe);

        let pool = Pool::builder()
            .max_size(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .build(manager)
            .map_err(|e| AdapterError::Connection(e.to_string()))?;

        Ok(Self {
            pool,
            db_path: config.database.clone(),
        })
    }

    pub fn in_memory() -> AdapterResult<Self> {
        Self::open(&ConnectionConfig::in_memory())
    }

    pub fn path(&self) -> &PathBuf {
        &self.db_path
    }

    fn get_conn(&self) -> AdapterResult<DbConn> {
        self.pool
            .get()
            .map_err(|e| AdapterError::Connection(e.to_string()))
    }

    fn bind(params: &[SqlValue]) -> Vec<Box<dyn ToSql>> {
        params
            .iter()
            .map(|p| -> Box<dyn ToSql> {
                match p {
                    SqlValue::Null => Box::new(rusqlite::types::Null),
                    SqlValue::Integer(i) => Box::new(*i),
                    SqlValue::Real(f) => Box::new(*f),
                    SqlValue::Text(s) => Box::new(s.clone()),
                    SqlValue::Bool(b) => Box::new(*b as i64),
                    SqlValue::Blob(b) => Box::new(b.clone()),
                }
            })
            .collect()
    }

    /// Convert a rusqlite ValueRef to a raw row value
    fn value_ref_to_value(val: ValueRef<'_>) -> Value {
        match val {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(f) => Value::Real(f),
            ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).to_string()),
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        }
    }
}

impl DatabaseAdapter for SqliteAdapter {
    fn dialect(&self) -> SqlDialect {
        SqlDialect::Sqlite
    }

    fn run(&self, sql: &str, params: &[SqlValue]) -> AdapterResult<ExecResult> {
        tracing::debug!(sql, params = params.len(), "run");
        let conn = self.get_conn()?;

        let param_values = Self::bind(params);
        let param_refs: Vec<&dyn ToSql> = param_values.iter().map(|p| p.as_ref()).collect();

        let affected = conn
            .execute(sql, param_refs.as_slice())
            .map_err(|e| AdapterError::Query(e.to_string()))?;

        Ok(ExecResult {
            affected_rows: affected as u64,
            last_insert_id: Some(conn.last_insert_rowid()),
        })
    }

    fn query(&self, sql: &str, params: &[SqlValue]) -> AdapterResult<Vec<Row>> {
        tracing::debug!(sql, params = params.len(), "query");
        let conn = self.get_conn()?;

        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| AdapterError::Query(e.to_string()))?;
        let column_names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();

        let param_values = Self::bind(params);
        let param_refs: Vec<&dyn ToSql> = param_values.iter().map(|p| p.as_ref()).collect();

        let rows = stmt
            .query_map(param_refs.as_slice(), |row| {
                let mut out = Row::new();
                for (i, name) in column_names.iter().enumerate() {
                    out.insert(name, Self::value_ref_to_value(row.get_ref(i)?));
                }
                Ok(out)
            })
            .map_err(|e| AdapterError::Query(e.to_string()))?
            .collect::<Result<Vec<Row>, _>>()
            .map_err(|e| AdapterError::Query(e.to_string()))?;

        Ok(rows)
    }

    fn execute_batch(&self, sql: &str) -> AdapterResult<()> {
        tracing::debug!(sql, "batch");
        let conn = self.get_conn()?;
        conn.execute_batch(sql)
            .map_err(|e| AdapterError::Query(e.to_string()))
    }

    fn begin(&self) -> AdapterResult<()> {
        self.execute_batch("BEGIN")
            .map_err(|e| AdapterError::Transaction(e.to_string()))
    }

    fn commit(&self) -> AdapterResult<()> {
        self.execute_batch("COMMIT")
            .map_err(|e| AdapterError::Transaction(e.to_string()))
    }

    fn rollback(&self) -> AdapterResult<()> {
        self.execute_batch("ROLLBACK")
            .map_err(|e| AdapterError::Transaction(e.to_string()))
    }

    fn describe_table(&self, name: &str) -> AdapterResult<Vec<ColumnInfo>> {
        let conn = self.get_conn()?;

        let mut stmt = conn
            .prepare("SELECT name, type, \"notnull\", pk FROM pragma_table_info(?1) ORDER BY cid")
            .map_err(|e| AdapterError::Schema(e.to_string()))?;

        let columns = stmt
            .query_map([name], |row| {
                let not_null: i64 = row.get(2)?;
                let pk: i64 = row.get(3)?;
                Ok(ColumnInfo {
                    name: row.get(0)?,
                    declared_type: row.get(1)?,
                    not_null: not_null != 0,
                    primary_key: pk != 0,
                })
            })
            .map_err(|e| AdapterError::Schema(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| AdapterError::Schema(e.to_string()))?;

        Ok(columns)
    }

    fn server_version(&self) -> AdapterResult<String> {
        let conn = self.get_conn()?;
        conn.query_row("SELECT sqlite_version()", [], |row| row.get(0))
            .map_err(|e| AdapterError::Query(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_run_and_query() {
        let adapter = SqliteAdapter::in_memory().unwrap();
        adapter
            .execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT NOT NULL, data BLOB)")
            .unwrap();

        let res = adapter
            .run(
                "INSERT INTO t(name, data) VALUES(?1, ?2)",
                &[SqlValue::Text("a".into()), SqlValue::Blob(vec![1, 2])],
            )
            .unwrap();
        assert_eq!(res.affected_rows, 1);
        assert_eq!(res.last_insert_id, Some(1));

        let row = adapter
            .query_one("SELECT * FROM t WHERE id = ?1", &[SqlValue::Integer(1)])
            .unwrap()
            .unwrap();
        assert_eq!(row.get("name"), Some(&Value::Text("a".into())));
        assert_eq!(row.get("data"), Some(&Value::Blob(vec![1, 2])));
    }

    #[test]
    fn test_transactions_share_connection() {
        let adapter = SqliteAdapter::in_memory().unwrap();
        adapter.execute_batch("CREATE TABLE t (id INTEGER)").unwrap();

        adapter.begin().unwrap();
        adapter.run("INSERT INTO t VALUES (1)", &[]).unwrap();
        adapter.rollback().unwrap();

        assert!(adapter.query("SELECT * FROM t", &[]).unwrap().is_empty());
    }

    #[test]
    fn test_describe_table() {
        let adapter = SqliteAdapter::in_memory().unwrap();
        adapter
            .execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY, tags setoftext NOT NULL)")
            .unwrap();

        let cols = adapter.describe_table("t").unwrap();
        assert_eq!(cols.len(), 2);
        assert!(cols[0].primary_key);
        assert_eq!(cols[1].declared_type, "setoftext");
        assert!(cols[1].not_null);

        assert!(adapter.describe_table("missing").unwrap().is_empty());
    }

    #[test]
    fn test_readonly_does_not_create() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.db");
        let config = ConnectionConfig::new(&path).readonly();

        assert!(SqliteAdapter::open(&config).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_server_version() {
        let adapter = SqliteAdapter::in_memory().unwrap();
        assert!(adapter.server_version().unwrap().starts_with('3'));
    }
}
