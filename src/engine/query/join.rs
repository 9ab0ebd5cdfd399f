//! Join descriptions

use std::sync::Arc;

use crate::engine::definition::Table;

/// Cardinality mode; decides how joined rows are shaped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinMode {
    /// Flat rows, no shaping
    None,
    /// Target columns nested under the target table name
    OneToOne,
    /// Flat rows, grouped by the caller
    OneToMany,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
}

/// A join target is either a table name, resolved through the definition
/// cache when the query runs, or an already loaded table.
#[derive(Debug, Clone, PartialEq)]
pub enum JoinTarget {
    /// `table` or `schema.table`
    Name(String),
    Table(Arc<Table>),
}

impl From<&str> for JoinTarget {
    fn from(name: &str) -> Self {
        JoinTarget::Name(name.to_string())
    }
}

impl From<String> for JoinTarget {
    fn from(name: String) -> Self {
        JoinTarget::Name(name)
    }
}

impl From<Arc<Table>> for JoinTarget {
    fn from(table: Arc<Table>) -> Self {
        JoinTarget::Table(table)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub mode: JoinMode,
    pub target: JoinTarget,
    pub source_column: String,
    pub target_column: String,
}

impl Join {
    /// Inner join; the target column defaults to the source column.
    pub fn new(mode: JoinMode, target: impl Into<JoinTarget>, source_column: &str, target_column: Option<&str>) -> Self {
        Self {
            kind: JoinKind::Inner,
            mode,
            target: target.into(),
            source_column: source_column.to_string(),
            target_column: target_column.unwrap_or(source_column).to_string(),
        }
    }
}

/// Split a join target name into (schema, table), defaulting the schema.
pub(crate) fn split_target<'a>(name: &'a str, default_schema: &'a str) -> (&'a str, &'a str) {
    match name.split_once('.') {
        Some((schema, table)) => (schema, table),
        None => (default_schema, name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_column_defaults_to_source() {
        let j = Join::new(JoinMode::OneToOne, "profiles", "user_id", None);
        assert_eq!(j.target_column, "user_id");
        assert_eq!(j.target, JoinTarget::Name("profiles".into()));
    }

    #[test]
    fn test_split_target() {
        assert_eq!(split_target("crm.users", "default"), ("crm", "users"));
        assert_eq!(split_target("users", "sales"), ("sales", "users"));
    }
}
