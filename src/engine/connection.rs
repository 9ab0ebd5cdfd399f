//! Connection
//!
//! Owns the store adapter, the definition cache and what the store reported
//! about itself. Everything else borrows the connection.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tracing::{debug, info};

use super::adapter::{DatabaseAdapter, ExecResult, SqlValue, SqliteAdapter};
use super::config::ConnectionConfig;
use super::database::Database;
use super::definition::{qualified_name, Column, DefinitionCache, Table};
use super::error::{Result, VdbaError};
use super::sql::Statement;
use super::value::Row;

/// What the store reported about itself when the connection opened
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Server {
    pub version: String,
    pub host: String,
    pub port: Option<u16>,
}

impl Server {
    pub fn new(version: &str) -> Self {
        Self {
            version: version.to_string(),
            host: "localhost".to_string(),
            port: None,
        }
    }
}

pub struct Connection {
    config: ConnectionConfig,
    adapter: Option<Box<dyn DatabaseAdapter>>,
    cache: Mutex<DefinitionCache>,
    server: Server,
}

impl Connection {
    /// Open an SQLite connection
    pub fn open(config: ConnectionConfig) -> Result<Self> {
        let adapter = SqliteAdapter::open(&config)?;
        Self::with_adapter(config, Box::new(adapter))
    }

    /// Wrap an already opened adapter
    pub fn with_adapter(config: ConnectionConfig, adapter: Box<dyn DatabaseAdapter>) -> Result<Self> {
        let version = adapter.server_version()?;
        let database = config.database.display().to_string();
        info!(database = %database, dialect = %adapter.dialect(), version = %version, "Connection opened");

        Ok(Self {
            cache: Mutex::new(DefinitionCache::new(&database)),
            server: Server::new(&version),
            adapter: Some(adapter),
            config,
        })
    }

    /// Drop the adapter and forget every cached definition. Closing twice is a no-op.
    pub fn close(&mut self) {
        if self.adapter.take().is_some() {
            let database = self.config.database.display().to_string();
            *self.cache() = DefinitionCache::new(&database);
            info!(database = %database, "Connection closed");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.adapter.is_some()
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn server(&self) -> Result<&Server> {
        self.adapter()?;
        Ok(&self.server)
    }

    pub fn database(&self) -> Result<Database<'_>> {
        self.adapter()?;
        Ok(Database::new(self))
    }

    pub(crate) fn adapter(&self) -> Result<&dyn DatabaseAdapter> {
        self.adapter.as_deref().ok_or(VdbaError::NotConnected)
    }

    pub(crate) fn cache(&self) -> MutexGuard<'_, DefinitionCache> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Cached table definition, read from the store on a miss.
    /// `None` when the table does not exist.
    pub(crate) fn load_table(&self, schema: &str, table: &str) -> Result<Option<Arc<Table>>> {
        let adapter = self.adapter()?;
        if let Some(cached) = self.cache().get_table(schema, table) {
            return Ok(Some(cached));
        }

        // The lock is not held across the metadata read
        let qn = qualified_name(schema, table);
        debug!(table = %qn, "Loading table definition");
        let info = adapter.describe_table(&qn)?;
        if info.is_empty() {
            return Ok(None);
        }
        let columns = info.iter().map(Column::from_info).collect();
        let loaded = Table::new(schema, table, columns);

        Ok(self.cache().get_or_load(schema, table, || Ok(Some(loaded)))?)
    }

    pub(crate) fn run(&self, statement: &Statement) -> Result<ExecResult> {
        Ok(self.adapter()?.run(&statement.sql, &statement.params)?)
    }

    pub(crate) fn query(&self, statement: &Statement) -> Result<Vec<Row>> {
        Ok(self.adapter()?.query(&statement.sql, &statement.params)?)
    }

    pub(crate) fn query_one(&self, sql: &str, params: &[SqlValue]) -> Result<Option<Row>> {
        Ok(self.adapter()?.query_one(sql, params)?)
    }

    /// Run `body` between BEGIN and COMMIT, rolling back when it fails.
    /// A failed rollback is logged and the original error is returned.
    pub(crate) fn transaction<T, F>(&self, body: F) -> Result<T>
    where
        F: FnOnce(&dyn DatabaseAdapter) -> Result<T>,
    {
        let adapter = self.adapter()?;
        adapter.begin()?;
        match body(adapter) {
            Ok(value) => {
                adapter.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = adapter.rollback() {
                    tracing::warn!(error = %rollback, "Rollback failed");
                }
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("database", &self.config.database)
            .field("connected", &self.is_connected())
            .field("server", &self.server)
            .finish()
    }
}
