//! vdba Error Types

use thiserror::Error;

use super::adapter::AdapterError;
use super::config::ConfigError;

#[derive(Error, Debug)]
pub enum VdbaError {
    /// Missing or malformed filter, column, or map argument. Raised before any I/O.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unknown operator: {0}")]
    UnknownOperator(String),

    #[error("Target table doesn't exist: {schema}.{table}")]
    TargetTableNotFound { schema: String, table: String },

    #[error("Store execution error: {0}")]
    Store(#[from] AdapterError),

    #[error("Not connected")]
    NotConnected,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl VdbaError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        VdbaError::InvalidArgument(message.into())
    }
}

pub type Result<T> = std::result::Result<T, VdbaError>;
