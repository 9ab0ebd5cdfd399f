//! SQL Dialect Generator
//!
//! Identifier handling and data-definition statements for the store.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::engine::definition::{qualified_name, ColumnType};
use crate::engine::error::{Result, VdbaError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlDialect {
    Sqlite,
}

impl fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlDialect::Sqlite => write!(f, "sqlite"),
        }
    }
}

impl SqlDialect {
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sqlite" | "sqlite3" => Some(SqlDialect::Sqlite),
            _ => None,
        }
    }
}

/// Quote an identifier, doubling any embedded quote
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A column name, optionally qualified by one table name (`table.column`)
pub fn is_column_ref(name: &str) -> bool {
    match name.split_once('.') {
        Some((table, column)) => is_identifier(table) && is_identifier(column),
        None => is_identifier(name),
    }
}

pub(crate) fn check_identifier(kind: &str, name: &str) -> Result<()> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(VdbaError::invalid(format!("{} name '{}' is not a valid identifier", kind, name)))
    }
}

/// Column definition for CREATE TABLE
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    /// Logical type name: `text`, `integer`, `sequence`, `set<text>`, ...
    #[serde(rename = "type")]
    pub col_type: String,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub required: bool,
    /// SQL expression
    #[serde(default)]
    pub default_value: Option<String>,
    /// SQL expression
    #[serde(default)]
    pub check: Option<String>,
    /// `table.column` or `schema.table.column`
    #[serde(default)]
    pub references: Option<String>,
}

impl ColumnDef {
    pub fn new(name: &str, col_type: &str) -> Self {
        Self {
            name: name.to_string(),
            col_type: col_type.to_string(),
            ..Default::default()
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, expr: &str) -> Self {
        self.default_value = Some(expr.to_string());
        self
    }

    pub fn check(mut self, expr: &str) -> Self {
        self.check = Some(expr.to_string());
        self
    }

    pub fn references(mut self, target: &str) -> Self {
        self.references = Some(target.to_string());
        self
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TableOptions {
    pub temporary: bool,
    pub if_not_exists: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IndexOptions {
    pub unique: bool,
    pub if_not_exists: bool,
}

/// SQL dialect-aware code generator
pub struct DialectGenerator {
    pub dialect: SqlDialect,
}

impl DialectGenerator {
    pub fn new(dialect: SqlDialect) -> Self {
        Self { dialect }
    }

    pub fn quote_ident(&self, name: &str) -> String {
        quote_ident(name)
    }

    /// Quoted qualified name of a table or index
    pub fn qualified(&self, schema: &str, name: &str) -> String {
        quote_ident(&qualified_name(schema, name))
    }

    /// Map a logical type to the declared type written into the table
    /// definition. Set types keep a recognizable name so metadata reads can
    /// restore them.
    pub fn map_type(&self, logical: &str) -> Result<String> {
        match ColumnType::parse(logical) {
            ColumnType::Other(name) => {
                let valid = !name.is_empty()
                    && name
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '_' | '(' | ')' | ','));
                if valid {
                    Ok(name)
                } else {
                    Err(VdbaError::invalid(format!("Invalid column type '{}'", logical)))
                }
            }
            known => Ok(known.declared_name().to_string()),
        }
    }

    /// `table.column` or `schema.table.column` → `REFERENCES "qn"("column")`
    fn references_clause(&self, schema: &str, target: &str) -> Result<String> {
        let parts: Vec<&str> = target.split('.').collect();
        let (ref_schema, ref_table, ref_column) = match parts.as_slice() {
            [table, column] => (schema, *table, *column),
            [schema, table, column] => (*schema, *table, *column),
            _ => {
                return Err(VdbaError::invalid(format!(
                    "Invalid reference '{}', expected table.column or schema.table.column",
                    target
                )))
            }
        };
        check_identifier("Schema", ref_schema)?;
        check_identifier("Table", ref_table)?;
        check_identifier("Column", ref_column)?;

        Ok(format!(
            " REFERENCES {}({}) ON DELETE CASCADE ON UPDATE CASCADE",
            self.qualified(ref_schema, ref_table),
            self.quote_ident(ref_column)
        ))
    }

    fn column_def(&self, schema: &str, col: &ColumnDef) -> Result<String> {
        check_identifier("Column", &col.name)?;

        let mut def = if col.col_type.trim().eq_ignore_ascii_case("sequence") {
            format!("{} integer PRIMARY KEY AUTOINCREMENT", self.quote_ident(&col.name))
        } else {
            let mut def = format!("{} {}", self.quote_ident(&col.name), self.map_type(&col.col_type)?);
            if col.primary_key {
                def.push_str(" PRIMARY KEY");
            }
            def
        };

        if col.unique && !col.primary_key {
            def.push_str(" UNIQUE");
        }
        if col.required {
            def.push_str(" NOT NULL");
        }
        if let Some(ref default) = col.default_value {
            if !default.is_empty() {
                def.push_str(&format!(" DEFAULT({})", default));
            }
        }
        if let Some(ref check) = col.check {
            if !check.is_empty() {
                def.push_str(&format!(" CHECK({})", check));
            }
        }
        if let Some(ref target) = col.references {
            def.push_str(&self.references_clause(schema, target)?);
        }

        Ok(def)
    }

    /// Generate CREATE TABLE SQL
    pub fn create_table(
        &self,
        schema: &str,
        table: &str,
        columns: &[ColumnDef],
        options: TableOptions,
    ) -> Result<String> {
        check_identifier("Schema", schema)?;
        check_identifier("Table", table)?;
        if columns.is_empty() {
            return Err(VdbaError::invalid(format!("Table '{}' needs at least one column", table)));
        }

        let col_defs = columns
            .iter()
            .map(|c| self.column_def(schema, c))
            .collect::<Result<Vec<_>>>()?;

        Ok(format!(
            "CREATE {}TABLE {}{}({})",
            if options.temporary { "TEMPORARY " } else { "" },
            if options.if_not_exists { "IF NOT EXISTS " } else { "" },
            self.qualified(schema, table),
            col_defs.join(", ")
        ))
    }

    pub fn drop_table(&self, schema: &str, table: &str) -> String {
        format!("DROP TABLE IF EXISTS {}", self.qualified(schema, table))
    }

    /// Generate CREATE INDEX SQL
    pub fn create_index(
        &self,
        schema: &str,
        table: &str,
        index: &str,
        columns: &[&str],
        options: IndexOptions,
    ) -> Result<String> {
        check_identifier("Index", index)?;
        check_identifier("Table", table)?;
        if columns.is_empty() {
            return Err(VdbaError::invalid(format!("Index '{}' needs at least one column", index)));
        }
        for c in columns {
            check_identifier("Column", c)?;
        }

        let col_list: Vec<String> = columns.iter().map(|c| self.quote_ident(c)).collect();
        Ok(format!(
            "CREATE {}INDEX {}{} ON {}({})",
            if options.unique { "UNIQUE " } else { "" },
            if options.if_not_exists { "IF NOT EXISTS " } else { "" },
            self.qualified(schema, index),
            self.qualified(schema, table),
            col_list.join(", ")
        ))
    }

    pub fn drop_index(&self, schema: &str, index: &str) -> String {
        format!("DROP INDEX IF EXISTS {}", self.qualified(schema, index))
    }

    /// Index lookup; binds the unquoted qualified index name as `?1`
    pub fn find_index(&self) -> &'static str {
        "SELECT tbl_name FROM sqlite_master WHERE type = 'index' and name = ?1"
    }
}
