//! Column definitions and logical column types

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::engine::adapter::ColumnInfo;

/// Logical column type. SQLite stores every one of these with its own
/// storage classes; the ones without a native form are "adaptable".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    Text,
    Integer,
    Real,
    Boolean,
    Date,
    Time,
    DateTime,
    Blob,
    IntegerSet,
    TextSet,
    /// Declared type with no DSL meaning; handled as a plain column
    Other(String),
}

impl ColumnType {
    /// Parse a declared type name, as written in a column definition or
    /// reported by the store.
    pub fn parse(declared: &str) -> ColumnType {
        match declared.trim().to_lowercase().as_str() {
            "text" => ColumnType::Text,
            "integer" | "sequence" => ColumnType::Integer,
            "real" => ColumnType::Real,
            "boolean" | "bool" => ColumnType::Boolean,
            "date" => ColumnType::Date,
            "time" => ColumnType::Time,
            "datetime" => ColumnType::DateTime,
            "blob" => ColumnType::Blob,
            "setofinteger" | "set<integer>" => ColumnType::IntegerSet,
            "setoftext" | "set<text>" => ColumnType::TextSet,
            _ => ColumnType::Other(declared.trim().to_string()),
        }
    }

    /// Type name as stored in the table definition
    pub fn declared_name(&self) -> &str {
        match self {
            ColumnType::Text => "text",
            ColumnType::Integer => "integer",
            ColumnType::Real => "real",
            ColumnType::Boolean => "boolean",
            ColumnType::Date => "date",
            ColumnType::Time => "time",
            ColumnType::DateTime => "datetime",
            ColumnType::Blob => "blob",
            ColumnType::IntegerSet => "setofinteger",
            ColumnType::TextSet => "setoftext",
            ColumnType::Other(name) => name,
        }
    }

    pub fn is_set(&self) -> bool {
        matches!(self, ColumnType::IntegerSet | ColumnType::TextSet)
    }

    pub fn is_adaptable(&self) -> bool {
        matches!(
            self,
            ColumnType::Boolean
                | ColumnType::Date
                | ColumnType::Time
                | ColumnType::DateTime
                | ColumnType::Blob
                | ColumnType::IntegerSet
                | ColumnType::TextSet
        )
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Real)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::IntegerSet => write!(f, "set<integer>"),
            ColumnType::TextSet => write!(f, "set<text>"),
            other => write!(f, "{}", other.declared_name()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
    pub required: bool,
    pub primary_key: bool,
    pub unique: bool,
}

impl Column {
    pub fn new(name: &str, column_type: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            column_type,
            required: false,
            primary_key: false,
            unique: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Primary keys are always required and unique.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.required = true;
        self.unique = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn from_info(info: &ColumnInfo) -> Self {
        let column = Column::new(&info.name, ColumnType::parse(&info.declared_type));
        let column = if info.not_null { column.required() } else { column };
        if info.primary_key {
            column.primary_key()
        } else {
            column
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_declared_types() {
        assert_eq!(ColumnType::parse("SETOFTEXT"), ColumnType::TextSet);
        assert_eq!(ColumnType::parse("set<integer>"), ColumnType::IntegerSet);
        assert_eq!(ColumnType::parse("sequence"), ColumnType::Integer);
        assert_eq!(ColumnType::parse("VARCHAR(20)"), ColumnType::Other("VARCHAR(20)".into()));
        assert_eq!(ColumnType::IntegerSet.to_string(), "set<integer>");
        assert_eq!(ColumnType::IntegerSet.declared_name(), "setofinteger");
    }

    #[test]
    fn test_primary_key_implies_required_and_unique() {
        let info = ColumnInfo {
            name: "id".into(),
            declared_type: "integer".into(),
            not_null: false,
            primary_key: true,
        };
        let col = Column::from_info(&info);
        assert!(col.required && col.unique && col.primary_key);
    }
}
