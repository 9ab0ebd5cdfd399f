//! Driver Registry
//!
//! Maps driver names and aliases to the code that opens connections. The
//! application builds one registry at startup and passes it where needed.

use std::collections::HashMap;
use std::sync::Arc;

use super::adapter::SqlDialect;
use super::config::ConnectionConfig;
use super::connection::Connection;
use super::error::{Result, VdbaError};

/// A backend able to open connections
pub trait Driver: Send + Sync {
    fn name(&self) -> String;

    fn aliases(&self) -> Vec<String> {
        Vec::new()
    }

    fn connect(&self, config: ConnectionConfig) -> Result<Connection>;
}

/// Embedded SQLite backend
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDriver;

impl Driver for SqliteDriver {
    fn name(&self) -> String {
        SqlDialect::Sqlite.to_string()
    }

    fn aliases(&self) -> Vec<String> {
        vec!["sqlite3".to_string()]
    }

    fn connect(&self, config: ConnectionConfig) -> Result<Connection> {
        Connection::open(config)
    }
}

#[derive(Default, Clone)]
pub struct Registry {
    drivers: HashMap<String, Arc<dyn Driver>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in driver
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(SqliteDriver));
        registry
    }

    /// Register a driver under its name and aliases; later registrations win
    pub fn register(&mut self, driver: Arc<dyn Driver>) {
        for key in std::iter::once(driver.name()).chain(driver.aliases()) {
            self.drivers.insert(key.to_lowercase(), Arc::clone(&driver));
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Driver>> {
        self.drivers.get(&name.to_lowercase()).cloned()
    }

    pub fn has(&self, name: &str) -> bool {
        self.drivers.contains_key(&name.to_lowercase())
    }

    /// Registered names and aliases, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.drivers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn connect(&self, driver: &str, config: ConnectionConfig) -> Result<Connection> {
        self.get(driver)
            .ok_or_else(|| VdbaError::invalid(format!("Unknown driver: {}", driver)))?
            .connect(config)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry").field("drivers", &self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_aliases() {
        let registry = Registry::with_defaults();
        assert_eq!(registry.names(), vec!["sqlite", "sqlite3"]);
        assert!(registry.has("SQLite3"));

        let conn = registry.connect("sqlite3", ConnectionConfig::in_memory()).unwrap();
        assert!(conn.is_connected());
    }

    #[test]
    fn test_unknown_driver() {
        let registry = Registry::new();
        assert!(registry.get("sqlite").is_none());
        assert!(matches!(
            registry.connect("postgres", ConnectionConfig::in_memory()),
            Err(VdbaError::InvalidArgument(_))
        ));
    }
}
