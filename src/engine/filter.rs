//! Filter model
//!
//! Mongo-style filter documents are parsed once into `Filter`; the SQL
//! compiler and the client-side matcher both work on this closed form.

use serde_json::Value as Json;
use std::cmp::Ordering;

use super::adapter::dialect::is_column_ref;
use super::adapter::SqlValue;
use super::definition::ColumnType;
use super::error::{Result, VdbaError};
use super::sql::set_element;
use super::value::{Row, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Eq(SqlValue),
    Ne(SqlValue),
    Lt(SqlValue),
    Le(SqlValue),
    Gt(SqlValue),
    Ge(SqlValue),
    Like(SqlValue),
    NotLike(SqlValue),
    In(Vec<SqlValue>),
    NotIn(Vec<SqlValue>),
    /// Membership in a set column
    Contains(SqlValue),
    NotContains(SqlValue),
}

impl Predicate {
    /// Build a predicate from an operator key and its JSON operand
    pub fn parse(op: &str, operand: &Json) -> Result<Predicate> {
        let predicate = match op {
            "$eq" => Predicate::Eq(scalar(op, operand)?),
            "$ne" => Predicate::Ne(scalar(op, operand)?),
            "$lt" => Predicate::Lt(scalar(op, operand)?),
            "$le" => Predicate::Le(scalar(op, operand)?),
            "$gt" => Predicate::Gt(scalar(op, operand)?),
            "$ge" => Predicate::Ge(scalar(op, operand)?),
            "$like" => Predicate::Like(scalar(op, operand)?),
            "$notLike" | "$nlike" => Predicate::NotLike(scalar(op, operand)?),
            "$in" => Predicate::In(list(op, operand)?),
            "$notIn" | "$nin" => Predicate::NotIn(list(op, operand)?),
            "$contains" | "$contain" => Predicate::Contains(scalar(op, operand)?),
            "$notContains" | "$notContain" | "$ncontains" => {
                Predicate::NotContains(scalar(op, operand)?)
            }
            other => return Err(VdbaError::UnknownOperator(other.to_string())),
        };
        Ok(predicate)
    }

    /// Evaluate against a (possibly missing) value with SQL semantics:
    /// comparisons involving NULL are false.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Predicate::Eq(SqlValue::Null) => value.is_null(),
            Predicate::Ne(SqlValue::Null) => !value.is_null(),
            Predicate::Eq(p) => value.compare_param(p) == Some(Ordering::Equal),
            Predicate::Ne(p) => !value.is_null() && value.compare_param(p) != Some(Ordering::Equal),
            Predicate::Lt(p) => value.compare_param(p) == Some(Ordering::Less),
            Predicate::Le(p) => matches!(value.compare_param(p), Some(Ordering::Less | Ordering::Equal)),
            Predicate::Gt(p) => value.compare_param(p) == Some(Ordering::Greater),
            Predicate::Ge(p) => matches!(value.compare_param(p), Some(Ordering::Greater | Ordering::Equal)),
            Predicate::Like(p) => like_value(value, p) == Some(true),
            Predicate::NotLike(p) => like_value(value, p) == Some(false),
            Predicate::In(items) => {
                !value.is_null() && items.iter().any(|p| value.compare_param(p) == Some(Ordering::Equal))
            }
            Predicate::NotIn(items) => {
                !value.is_null() && items.iter().all(|p| value.compare_param(p) != Some(Ordering::Equal))
            }
            Predicate::Contains(p) => set_contains(value, p),
            Predicate::NotContains(p) => value.is_null() || !set_contains(value, p),
        }
    }
}

fn scalar(op: &str, operand: &Json) -> Result<SqlValue> {
    SqlValue::from_json(operand)
        .ok_or_else(|| VdbaError::invalid(format!("Operator {} expects a scalar value", op)))
}

fn list(op: &str, operand: &Json) -> Result<Vec<SqlValue>> {
    let items = operand
        .as_array()
        .ok_or_else(|| VdbaError::invalid(format!("Operator {} expects an array", op)))?;
    items.iter().map(|item| scalar(op, item)).collect()
}

fn like_value(value: &Value, pattern: &SqlValue) -> Option<bool> {
    let pattern = as_text(pattern.clone())?;
    let text = as_text(value.to_param())?;
    Some(like_match(&text, &pattern))
}

fn as_text(value: SqlValue) -> Option<String> {
    match value {
        SqlValue::Null | SqlValue::Blob(_) => None,
        SqlValue::Text(s) => Some(s),
        SqlValue::Integer(i) => Some(i.to_string()),
        SqlValue::Real(f) => Some(f.to_string()),
        SqlValue::Bool(b) => Some((b as i64).to_string()),
    }
}

/// SQL LIKE: `%` any run, `_` one character, ASCII case-insensitive
pub fn like_match(text: &str, pattern: &str) -> bool {
    let t: Vec<char> = text.chars().map(|c| c.to_ascii_lowercase()).collect();
    let p: Vec<char> = pattern.chars().map(|c| c.to_ascii_lowercase()).collect();

    // dp[j]: pattern[..j] matches the text prefix consumed so far
    let mut dp = vec![false; p.len() + 1];
    dp[0] = true;
    for j in 1..=p.len() {
        dp[j] = dp[j - 1] && p[j - 1] == '%';
    }

    for tc in &t {
        let mut next = vec![false; p.len() + 1];
        for j in 1..=p.len() {
            next[j] = match p[j - 1] {
                '%' => next[j - 1] || dp[j],
                '_' => dp[j - 1],
                pc => dp[j - 1] && pc == *tc,
            };
        }
        dp = next;
    }
    dp[p.len()]
}

/// Set membership, with the element coerced the way the store compares it
fn set_contains(value: &Value, element: &SqlValue) -> bool {
    let coerced = |column_type: &ColumnType| set_element(column_type, &Value::from(element.clone()));
    match value {
        Value::IntegerSet(items) => match coerced(&ColumnType::IntegerSet) {
            Ok(Value::Integer(i)) => items.contains(&i),
            _ => false,
        },
        Value::TextSet(items) => match coerced(&ColumnType::TextSet) {
            Ok(Value::Text(s)) => items.contains(&s),
            _ => false,
        },
        Value::Text(raw) => match serde_json::from_str::<Json>(raw) {
            Ok(Json::Array(items)) => items
                .iter()
                .any(|j| Value::from_json(j).compare_param(element) == Some(Ordering::Equal)),
            _ => false,
        },
        _ => false,
    }
}

/// All predicates applying to one column
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: String,
    pub predicates: Vec<Predicate>,
}

/// Conjunction of per-column conditions. Empty matches every row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a filter document. `null` is the empty filter.
    pub fn parse(doc: &Json) -> Result<Filter> {
        let map = match doc {
            Json::Null => return Ok(Filter::new()),
            Json::Object(map) => map,
            _ => return Err(VdbaError::invalid("Filter must be an object")),
        };

        let mut filter = Filter::new();
        for (column, spec) in map {
            if !is_column_ref(column) {
                return Err(VdbaError::invalid(format!("Invalid column name '{}'", column)));
            }
            match spec {
                Json::Object(ops) => {
                    if ops.is_empty() {
                        return Err(VdbaError::invalid(format!("No operator given for column '{}'", column)));
                    }
                    for (op, operand) in ops {
                        filter = filter.push(column, Predicate::parse(op, operand)?);
                    }
                }
                literal => filter = filter.push(column, Predicate::parse("$eq", literal)?),
            }
        }
        Ok(filter)
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Add a predicate, merging it into an existing condition on the column
    pub fn push(mut self, column: &str, predicate: Predicate) -> Self {
        match self.conditions.iter_mut().find(|c| c.column == column) {
            Some(cond) => cond.predicates.push(predicate),
            None => self.conditions.push(Condition {
                column: column.to_string(),
                predicates: vec![predicate],
            }),
        }
        self
    }

    pub fn eq(self, column: &str, value: impl Into<SqlValue>) -> Self {
        self.push(column, Predicate::Eq(value.into()))
    }

    pub fn ne(self, column: &str, value: impl Into<SqlValue>) -> Self {
        self.push(column, Predicate::Ne(value.into()))
    }

    pub fn lt(self, column: &str, value: impl Into<SqlValue>) -> Self {
        self.push(column, Predicate::Lt(value.into()))
    }

    pub fn le(self, column: &str, value: impl Into<SqlValue>) -> Self {
        self.push(column, Predicate::Le(value.into()))
    }

    pub fn gt(self, column: &str, value: impl Into<SqlValue>) -> Self {
        self.push(column, Predicate::Gt(value.into()))
    }

    pub fn ge(self, column: &str, value: impl Into<SqlValue>) -> Self {
        self.push(column, Predicate::Ge(value.into()))
    }

    pub fn like(self, column: &str, pattern: &str) -> Self {
        self.push(column, Predicate::Like(pattern.into()))
    }

    pub fn not_like(self, column: &str, pattern: &str) -> Self {
        self.push(column, Predicate::NotLike(pattern.into()))
    }

    pub fn is_in<V: Into<SqlValue>>(self, column: &str, values: impl IntoIterator<Item = V>) -> Self {
        self.push(column, Predicate::In(values.into_iter().map(Into::into).collect()))
    }

    pub fn not_in<V: Into<SqlValue>>(self, column: &str, values: impl IntoIterator<Item = V>) -> Self {
        self.push(column, Predicate::NotIn(values.into_iter().map(Into::into).collect()))
    }

    pub fn contains(self, column: &str, element: impl Into<SqlValue>) -> Self {
        self.push(column, Predicate::Contains(element.into()))
    }

    pub fn not_contains(self, column: &str, element: impl Into<SqlValue>) -> Self {
        self.push(column, Predicate::NotContains(element.into()))
    }

    /// Client-side evaluation against an already adapted row.
    ///
    /// Qualified column names (`table.col`) fall back to the bare column
    /// name, then to the nested record of a one-to-one join.
    pub fn matches(&self, row: &Row) -> bool {
        self.conditions.iter().all(|cond| {
            let value = lookup(row, &cond.column);
            cond.predicates.iter().all(|p| p.matches(&value))
        })
    }
}

fn lookup(row: &Row, column: &str) -> Value {
    if let Some(v) = row.get(column) {
        return v.clone();
    }
    if let Some((table, col)) = column.split_once('.') {
        if let Some(v) = row.get(table).and_then(Value::as_record).and_then(|r| r.get(col)) {
            return v.clone();
        }
        if let Some(v) = row.get(col) {
            return v.clone();
        }
    }
    Value::Null
}

impl TryFrom<&Json> for Filter {
    type Error = VdbaError;

    fn try_from(doc: &Json) -> Result<Self> {
        Filter::parse(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_implicit_eq_and_merge() {
        let f = Filter::parse(&json!({"name": "x", "age": {"$gt": 1, "$le": 9}})).unwrap();
        assert_eq!(f.conditions().len(), 2);
        assert_eq!(f.conditions()[0].predicates, vec![Predicate::Eq("x".into())]);
        assert_eq!(
            f.conditions()[1].predicates,
            vec![Predicate::Gt(1.into()), Predicate::Le(9.into())]
        );
    }

    #[test]
    fn test_parse_aliases() {
        let f = Filter::parse(&json!({"a": {"$nin": [1, 2], "$nlike": "x%"}, "t": {"$contain": "z"}})).unwrap();
        assert_eq!(
            f.conditions()[0].predicates,
            vec![Predicate::NotIn(vec![1.into(), 2.into()]), Predicate::NotLike("x%".into())]
        );
        assert_eq!(f.conditions()[1].predicates, vec![Predicate::Contains("z".into())]);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            Filter::parse(&json!({"a": {"$regex": "x"}})),
            Err(VdbaError::UnknownOperator(op)) if op == "$regex"
        ));
        assert!(matches!(Filter::parse(&json!([1])), Err(VdbaError::InvalidArgument(_))));
        assert!(matches!(Filter::parse(&json!({"a": {"$in": 3}})), Err(VdbaError::InvalidArgument(_))));
        assert!(matches!(Filter::parse(&json!({"a;--": 1})), Err(VdbaError::InvalidArgument(_))));
        assert!(matches!(Filter::parse(&json!({"a": {}})), Err(VdbaError::InvalidArgument(_))));
        assert!(Filter::parse(&Json::Null).unwrap().is_empty());
    }

    #[test]
    fn test_builder_matches_parser() {
        let built = Filter::new().gt("age", 18).like("name", "a%");
        let parsed = Filter::parse(&json!({"age": {"$gt": 18}, "name": {"$like": "a%"}})).unwrap();
        assert_eq!(built, parsed);
    }

    #[test]
    fn test_like_match() {
        assert!(like_match("Alice", "a%"));
        assert!(like_match("bob", "_o_"));
        assert!(!like_match("bob", "_o"));
        assert!(like_match("", "%"));
        assert!(like_match("50%", "50%"));
    }

    #[test]
    fn test_matches_sql_semantics() {
        let row = Row::new()
            .with("age", 30)
            .with("name", "Ann")
            .with("nick", Value::Null)
            .with("tags", vec!["a", "b"]);

        assert!(Filter::new().ge("age", 30).lt("age", 31).matches(&row));
        assert!(Filter::new().eq("nick", SqlValue::Null).matches(&row));
        assert!(!Filter::new().ne("nick", "x").matches(&row));
        assert!(!Filter::new().not_in("nick", [1]).matches(&row));
        assert!(Filter::new().not_in("age", [1, 2]).matches(&row));
        assert!(Filter::new().like("name", "an%").matches(&row));
        assert!(Filter::new().contains("tags", "b").matches(&row));
        assert!(Filter::new().not_contains("tags", "c").matches(&row));
        assert!(Filter::new().not_contains("nick", "c").matches(&row));
        assert!(Filter::new().matches(&row));
    }

    #[test]
    fn test_set_membership_coerces_element() {
        let row = Row::new()
            .with("tags", vec!["a", "3"])
            .with("nums", vec![1i64, 2]);

        assert!(Filter::new().contains("tags", 3i64).matches(&row));
        assert!(Filter::new().contains("nums", "2").matches(&row));
        assert!(!Filter::new().contains("nums", "two").matches(&row));
        assert!(Filter::new().not_contains("nums", "3").matches(&row));
    }
}
