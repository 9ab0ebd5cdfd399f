//! Query results
//!
//! Rows come back already adapted. `find`, `map` and `limit` work on the
//! fetched rows only and never go back to the store.

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::filter::Filter;
use super::query::join::JoinMode;
use super::value::Row;

/// How a result was produced
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultOptions {
    /// Qualified name of the source table
    pub table: String,
    #[serde(skip)]
    pub join_mode: Option<JoinMode>,
    pub aggregate: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultSet {
    rows: Vec<Row>,
    #[serde(skip)]
    options: ResultOptions,
}

impl ResultSet {
    pub fn new(rows: Vec<Row>, options: ResultOptions) -> Self {
        Self { rows, options }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }

    pub fn options(&self) -> &ResultOptions {
        &self.options
    }

    /// Rows matching `filter`, same semantics as the SQL filter
    pub fn find(&self, filter: &Filter) -> ResultSet {
        ResultSet {
            rows: self.rows.iter().filter(|r| filter.matches(r)).cloned().collect(),
            options: self.options.clone(),
        }
    }

    pub fn map<T, F: FnMut(&Row) -> T>(&self, f: F) -> Vec<T> {
        self.rows.iter().map(f).collect()
    }

    /// Map every row onto `T` through serde
    pub fn map_into<T: DeserializeOwned>(&self) -> Result<Vec<T>, serde_json::Error> {
        self.rows.iter().map(Row::deserialize).collect()
    }

    /// At most `count` rows starting at `start`
    pub fn limit(&self, count: usize, start: usize) -> ResultSet {
        ResultSet {
            rows: self.rows.iter().skip(start).take(count).cloned().collect(),
            options: self.options.clone(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(self.rows.iter().map(Row::to_json).collect())
    }
}

impl IntoIterator for ResultSet {
    type Item = Row;
    type IntoIter = std::vec::IntoIter<Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    fn sample() -> ResultSet {
        let rows = (1..=5)
            .map(|i| Row::new().with("id", i as i64).with("even", i % 2 == 0))
            .collect();
        ResultSet::new(rows, ResultOptions::default())
    }

    #[test]
    fn test_find_and_limit() {
        let rs = sample();
        let evens = rs.find(&Filter::new().eq("even", true));
        assert_eq!(evens.map(|r| r.get("id").and_then(|v| v.as_i64())), vec![Some(2), Some(4)]);

        let page = rs.limit(2, 3);
        assert_eq!(page.len(), 2);
        assert_eq!(page.first().and_then(|r| r.get("id")).and_then(|v| v.as_i64()), Some(4));
        assert!(rs.limit(2, 10).is_empty());
    }

    #[test]
    fn test_map_into() {
        #[derive(Deserialize)]
        struct Item {
            id: i64,
            even: bool,
        }
        let items: Vec<Item> = sample().map_into().unwrap();
        assert_eq!(items.len(), 5);
        assert!(items[1].even && items[1].id == 2);
    }
}
