//! vdba CLI Module
//! Command-line interface for querying a database file

pub mod formatter;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::adapter::SortDirection;
use super::config::{ConfigError, ConnectionConfig};
use super::definition::DEFAULT_SCHEMA;
use super::error::{Result, VdbaError};

#[derive(Parser, Debug)]
#[command(name = "vdba")]
#[command(version)]
#[command(about = "Query SQLite tables with a document-style filter language", long_about = None)]
pub struct Cli {
    /// Database file (an in-memory database when omitted)
    #[arg(short, long, global = true)]
    pub database: Option<PathBuf>,

    /// Connection config file (JSON); overrides --database
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Schema the table lives in
    #[arg(short, long, global = true, default_value = DEFAULT_SCHEMA)]
    pub schema: String,

    /// Output format (json for scripting)
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Open the database read-only
    #[arg(long, global = true)]
    pub readonly: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the columns of a table
    Describe {
        /// Table name
        table: String,
    },

    /// Find rows in a table
    Find {
        /// Table name
        table: String,

        /// Filter document, e.g. '{"age": {"$gt": 21}}'
        #[arg(long)]
        filter: Option<String>,

        /// Sort column, `col` or `col:desc`; repeatable
        #[arg(long)]
        sort: Vec<String>,

        /// Maximum number of rows
        #[arg(short, long)]
        limit: Option<u64>,

        /// Rows to skip
        #[arg(long, default_value = "0")]
        offset: u64,
    },

    /// Count rows in a table
    Count {
        /// Table name
        table: String,

        /// Filter document
        #[arg(long)]
        filter: Option<String>,
    },

    /// Show the SQLite version
    Version,
}

impl Cli {
    pub fn connection_config(&self) -> std::result::Result<ConnectionConfig, ConfigError> {
        let config = match (&self.config, &self.database) {
            (Some(path), _) => ConnectionConfig::load(path)?,
            (None, Some(database)) => ConnectionConfig::new(database),
            (None, None) => ConnectionConfig::in_memory(),
        };
        Ok(if self.readonly { config.readonly() } else { config })
    }
}

/// `col` or `col:asc|desc`
pub fn parse_sort(arg: &str) -> Result<(String, SortDirection)> {
    let (column, direction) = match arg.split_once(':') {
        Some((column, dir)) => match dir.to_lowercase().as_str() {
            "asc" => (column, SortDirection::Asc),
            "desc" => (column, SortDirection::Desc),
            _ => return Err(VdbaError::invalid(format!("Invalid sort direction '{}'", dir))),
        },
        None => (arg, SortDirection::Asc),
    };
    if column.is_empty() {
        return Err(VdbaError::invalid("Sort column is empty"));
    }
    Ok((column.to_string(), direction))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::OpenMode;

    #[test]
    fn test_parse_find() {
        let cli = Cli::parse_from([
            "vdba", "-d", "shop.db", "find", "items", "--filter", r#"{"qty":{"$gt":1}}"#, "--sort", "qty:desc",
            "--limit", "5",
        ]);
        assert_eq!(cli.schema, "default");
        match cli.command {
            Commands::Find { table, filter, sort, limit, offset } => {
                assert_eq!(table, "items");
                assert!(filter.is_some());
                assert_eq!(sort, vec!["qty:desc"]);
                assert_eq!(limit, Some(5));
                assert_eq!(offset, 0);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_connection_config() {
        let cli = Cli::parse_from(["vdba", "--readonly", "-d", "shop.db", "version"]);
        let config = cli.connection_config().unwrap();
        assert_eq!(config.database, PathBuf::from("shop.db"));
        assert_eq!(config.mode, OpenMode::Readonly);

        let cli = Cli::parse_from(["vdba", "version"]);
        assert!(cli.connection_config().unwrap().is_memory());
    }

    #[test]
    fn test_parse_sort() {
        assert_eq!(parse_sort("name").unwrap(), ("name".to_string(), SortDirection::Asc));
        assert_eq!(parse_sort("age:DESC").unwrap(), ("age".to_string(), SortDirection::Desc));
        assert!(parse_sort("age:sideways").is_err());
        assert!(parse_sort(":desc").is_err());
    }
}
