//! Type converter and result adapter
//!
//! Rebuilds DSL types from what SQLite actually stored, and reshapes joined
//! rows according to the join mode.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value as Json;

use super::adapter::SqlValue;
use super::definition::{ColumnType, Table};
use super::query::join::JoinMode;
use super::value::{Row, Value};

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"];
const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M"];

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .ok()
        .or_else(|| parse_datetime(s).map(|dt| dt.date_naive()))
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    TIME_FORMATS
        .iter()
        .find_map(|f| NaiveTime::parse_from_str(s.trim(), f).ok())
        .or_else(|| parse_datetime(s).map(|dt| dt.time()))
}

fn parse_set(s: &str, column_type: &ColumnType) -> Option<Value> {
    let items = match serde_json::from_str::<Json>(s).ok()? {
        Json::Array(items) => items,
        _ => return None,
    };
    match column_type {
        ColumnType::IntegerSet => items
            .iter()
            .map(Json::as_i64)
            .collect::<Option<Vec<_>>>()
            .map(Value::IntegerSet),
        _ => items
            .iter()
            .map(|j| match j {
                Json::String(s) => Some(s.clone()),
                Json::Null => None,
                other => Some(other.to_string()),
            })
            .collect::<Option<Vec<_>>>()
            .map(Value::TextSet),
    }
}

/// Coerce a stored value to the column's logical type.
///
/// NULL stays NULL for every type. `Err` hands back the raw value when it
/// cannot be converted.
pub fn cast_value(column_type: &ColumnType, raw: Value) -> Result<Value, Value> {
    let converted = match (column_type, &raw) {
        (_, Value::Null) => return Ok(Value::Null),

        (ColumnType::Boolean, Value::Bool(b)) => Some(Value::Bool(*b)),
        (ColumnType::Boolean, Value::Integer(i)) => Some(Value::Bool(*i != 0)),
        (ColumnType::Boolean, Value::Real(f)) => Some(Value::Bool(*f != 0.0)),
        (ColumnType::Boolean, Value::Text(s)) => Some(Value::Bool(!s.is_empty())),
        (ColumnType::Boolean, Value::Blob(b)) => Some(Value::Bool(!b.is_empty())),

        (ColumnType::Date, Value::Date(_)) => Some(raw.clone()),
        (ColumnType::Date, Value::Text(s)) => parse_date(s).map(Value::Date),
        (ColumnType::Date, Value::Integer(ms)) => {
            DateTime::from_timestamp_millis(*ms).map(|dt| Value::Date(dt.date_naive()))
        }

        (ColumnType::Time, Value::Time(_)) => Some(raw.clone()),
        (ColumnType::Time, Value::Text(s)) => parse_time(s).map(Value::Time),
        (ColumnType::Time, Value::Integer(ms)) => {
            DateTime::from_timestamp_millis(*ms).map(|dt| Value::Time(dt.time()))
        }

        (ColumnType::DateTime, Value::DateTime(_)) => Some(raw.clone()),
        (ColumnType::DateTime, Value::Text(s)) => parse_datetime(s).map(Value::DateTime),
        (ColumnType::DateTime, Value::Integer(ms)) => {
            DateTime::from_timestamp_millis(*ms).map(Value::DateTime)
        }

        (ColumnType::Integer, Value::Integer(_)) => Some(raw.clone()),
        (ColumnType::Integer, Value::Real(f)) => Some(Value::Integer(f.trunc() as i64)),
        (ColumnType::Integer, Value::Bool(b)) => Some(Value::Integer(*b as i64)),
        (ColumnType::Integer, Value::Text(s)) => s.trim().parse().ok().map(Value::Integer),

        (ColumnType::Real, Value::Real(_)) => Some(raw.clone()),
        (ColumnType::Real, Value::Integer(i)) => Some(Value::Real(*i as f64)),
        (ColumnType::Real, Value::Text(s)) => s.trim().parse().ok().map(Value::Real),

        (ColumnType::IntegerSet | ColumnType::TextSet, Value::Text(s)) => parse_set(s, column_type),
        (ColumnType::IntegerSet, Value::IntegerSet(_)) | (ColumnType::TextSet, Value::TextSet(_)) => {
            Some(raw.clone())
        }

        (ColumnType::Text, Value::Text(_)) => Some(raw.clone()),
        (ColumnType::Text, Value::Blob(b)) => Some(Value::Text(String::from_utf8_lossy(b).to_string())),
        (ColumnType::Text, other) => match other.to_param() {
            SqlValue::Text(s) => Some(Value::Text(s)),
            SqlValue::Integer(i) => Some(Value::Text(i.to_string())),
            SqlValue::Real(f) => Some(Value::Text(f.to_string())),
            SqlValue::Bool(b) => Some(Value::Text(b.to_string())),
            _ => None,
        },

        (ColumnType::Blob, Value::Blob(_)) => Some(raw.clone()),
        (ColumnType::Blob, Value::Text(s)) => Some(Value::Blob(s.as_bytes().to_vec())),

        (ColumnType::Other(_), _) => Some(raw.clone()),
        _ => None,
    };

    converted.ok_or(raw)
}

/// Cast the named columns of a row in place, using the table's types.
fn cast_columns<'a>(row: &mut Row, table: &Table, columns: impl Iterator<Item = &'a str>) {
    for name in columns {
        let Some(column_type) = table.column_type(name) else {
            continue;
        };
        let Some(slot) = row.get_mut(name) else {
            continue;
        };
        let raw = std::mem::replace(slot, Value::Null);
        *slot = match cast_value(column_type, raw) {
            Ok(v) => v,
            Err(raw) => {
                tracing::warn!(
                    table = table.name(),
                    column = name,
                    declared = %column_type,
                    "stored value does not convert to its declared type, keeping raw value"
                );
                raw
            }
        };
    }
}

/// Cast a row's adaptable columns; plain columns are left untouched.
pub fn cast_row(row: &mut Row, table: &Table) {
    cast_columns(row, table, table.adaptable_columns().iter().map(String::as_str));
}

/// Cast a subset of columns (group columns of an aggregate row)
pub fn cast_selected(row: &mut Row, table: &Table, columns: &[&str]) {
    let adaptable: Vec<&str> = columns
        .iter()
        .copied()
        .filter(|c| table.is_adaptable(c))
        .collect();
    cast_columns(row, table, adaptable.into_iter());
}

/// How a joined row must be reshaped
#[derive(Debug, Clone)]
pub struct JoinShape<'a> {
    pub target: &'a Table,
    pub mode: JoinMode,
    pub source_column: &'a str,
    pub target_column: &'a str,
}

impl JoinShape<'_> {
    /// Alias under which a target column is selected
    pub fn alias(target: &Table, column: &str) -> String {
        format!("{}.{}", target.name(), column)
    }
}

/// Cast and reshape one raw joined row.
///
/// Target columns arrive aliased `target.column`. One-to-one joins nest them
/// in a record keyed by the target table name; the other modes flatten them,
/// keeping the prefix only where a bare name would collide with a source
/// column. The target join column is dropped when it has the same name as
/// the source join column, as both carry the same value.
pub fn adapt_joined(raw: Row, source: &Table, shape: &JoinShape<'_>) -> Row {
    let prefix = format!("{}.", shape.target.name());
    let mut source_part = Row::new();
    let mut target_part = Row::new();

    for (key, value) in raw {
        match key.strip_prefix(&prefix) {
            Some(column) if shape.target.has_column(column) => {
                target_part.insert(column, value);
            }
            _ => {
                source_part.insert(&key, value);
            }
        }
    }

    cast_row(&mut source_part, source);
    cast_row(&mut target_part, shape.target);

    if shape.source_column == shape.target_column {
        target_part.remove(shape.target_column);
    }

    match shape.mode {
        JoinMode::OneToOne => {
            source_part.insert(shape.target.name(), Value::Record(target_part));
        }
        JoinMode::None | JoinMode::OneToMany => {
            for (column, value) in target_part {
                if source_part.contains_key(&column) {
                    source_part.insert(&JoinShape::alias(shape.target, &column), value);
                } else {
                    source_part.insert(&column, value);
                }
            }
        }
    }

    source_part
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::definition::Column;

    fn users() -> Table {
        Table::new(
            "default",
            "users",
            vec![
                Column::new("id", ColumnType::Integer).primary_key(),
                Column::new("name", ColumnType::Text),
                Column::new("active", ColumnType::Boolean),
            ],
        )
    }

    fn profiles() -> Table {
        Table::new(
            "default",
            "profiles",
            vec![
                Column::new("id", ColumnType::Integer).primary_key(),
                Column::new("name", ColumnType::Text),
                Column::new("tags", ColumnType::TextSet),
            ],
        )
    }

    #[test]
    fn test_cast_scalars() {
        assert_eq!(cast_value(&ColumnType::Boolean, Value::Integer(0)), Ok(Value::Bool(false)));
        assert_eq!(cast_value(&ColumnType::Boolean, Value::Text("0".into())), Ok(Value::Bool(true)));
        assert_eq!(cast_value(&ColumnType::Boolean, Value::Null), Ok(Value::Null));
        assert_eq!(cast_value(&ColumnType::Integer, Value::Text(" 42 ".into())), Ok(Value::Integer(42)));
        assert_eq!(cast_value(&ColumnType::Real, Value::Integer(2)), Ok(Value::Real(2.0)));
        assert_eq!(cast_value(&ColumnType::Text, Value::Integer(7)), Ok(Value::Text("7".into())));
    }

    #[test]
    fn test_cast_dates() {
        let d = NaiveDate::from_ymd_opt(2020, 2, 29).unwrap();
        assert_eq!(cast_value(&ColumnType::Date, Value::Text("2020-02-29".into())), Ok(Value::Date(d)));

        let dt = d.and_hms_opt(10, 30, 0).unwrap().and_utc();
        assert_eq!(
            cast_value(&ColumnType::DateTime, Value::Text("2020-02-29 10:30:00".into())),
            Ok(Value::DateTime(dt))
        );
        assert_eq!(
            cast_value(&ColumnType::DateTime, Value::Text("2020-02-29T10:30:00Z".into())),
            Ok(Value::DateTime(dt))
        );
        assert_eq!(
            cast_value(&ColumnType::DateTime, Value::Integer(dt.timestamp_millis())),
            Ok(Value::DateTime(dt))
        );
        assert_eq!(
            cast_value(&ColumnType::Time, Value::Text("10:30".into())),
            Ok(Value::Time(NaiveTime::from_hms_opt(10, 30, 0).unwrap()))
        );
        assert_eq!(
            cast_value(&ColumnType::Date, Value::Text("yesterday".into())),
            Err(Value::Text("yesterday".into()))
        );
    }

    #[test]
    fn test_cast_sets() {
        assert_eq!(
            cast_value(&ColumnType::TextSet, Value::Text(r#"["a","b"]"#.into())),
            Ok(Value::TextSet(vec!["a".into(), "b".into()]))
        );
        assert_eq!(
            cast_value(&ColumnType::IntegerSet, Value::Text("[1,2,3]".into())),
            Ok(Value::IntegerSet(vec![1, 2, 3]))
        );
        assert!(cast_value(&ColumnType::IntegerSet, Value::Text("[1,".into())).is_err());
    }

    #[test]
    fn test_cast_row_only_touches_adaptable_columns() {
        let mut row = Row::new().with("id", "1").with("active", 1);
        cast_row(&mut row, &users());
        assert_eq!(row.get("id"), Some(&Value::Text("1".into())));
        assert_eq!(row.get("active"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_one_to_one_nesting_drops_shared_join_column() {
        let (u, p) = (users(), profiles());
        let raw = Row::new()
            .with("id", 1)
            .with("name", "x")
            .with("active", 0)
            .with("profiles.id", 1)
            .with("profiles.name", "y")
            .with("profiles.tags", r#"["a"]"#);
        let shape = JoinShape { target: &p, mode: JoinMode::OneToOne, source_column: "id", target_column: "id" };

        let row = adapt_joined(raw, &u, &shape);
        assert_eq!(row.keys().collect::<Vec<_>>(), vec!["id", "name", "active", "profiles"]);
        assert_eq!(row.get("active"), Some(&Value::Bool(false)));

        let nested = row.get("profiles").and_then(Value::as_record).unwrap();
        assert_eq!(nested.keys().collect::<Vec<_>>(), vec!["name", "tags"]);
        assert_eq!(nested.get("tags"), Some(&Value::TextSet(vec!["a".into()])));
    }

    #[test]
    fn test_one_to_many_rows_stay_flat() {
        let (u, p) = (users(), profiles());
        let raw = Row::new()
            .with("id", 1)
            .with("name", "x")
            .with("active", 1)
            .with("profiles.id", 1)
            .with("profiles.name", "y")
            .with("profiles.tags", "[]");
        let shape = JoinShape { target: &p, mode: JoinMode::OneToMany, source_column: "id", target_column: "id" };

        let row = adapt_joined(raw, &u, &shape);
        assert_eq!(
            row.keys().collect::<Vec<_>>(),
            vec!["id", "name", "active", "profiles.name", "tags"]
        );
        assert_eq!(row.get("tags"), Some(&Value::TextSet(vec![])));
    }
}
