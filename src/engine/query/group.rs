//! Grouping and aggregation

use std::fmt;

use crate::engine::filter::{Filter, Predicate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggOp {
    Sum,
    Count,
    Min,
    Max,
    Avg,
}

impl fmt::Display for AggOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggOp::Sum => write!(f, "sum"),
            AggOp::Count => write!(f, "count"),
            AggOp::Min => write!(f, "min"),
            AggOp::Max => write!(f, "max"),
            AggOp::Avg => write!(f, "avg"),
        }
    }
}

/// `op(column) AS alias`, optionally filtered after aggregation
#[derive(Debug, Clone, PartialEq)]
pub struct AggOperation {
    pub op: AggOp,
    /// Source column, or `*` for `count(*)`
    pub column: String,
    pub alias: String,
    pub filter: Option<Vec<Predicate>>,
}

impl AggOperation {
    pub fn new(op: AggOp, column: &str, alias: &str) -> Self {
        Self {
            op,
            column: column.to_string(),
            alias: alias.to_string(),
            filter: None,
        }
    }

    /// Keep only groups whose aggregate satisfies the predicate
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter.get_or_insert_with(Vec::new).push(predicate);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupBy {
    pub columns: Vec<String>,
    pub operations: Vec<AggOperation>,
}

impl GroupBy {
    pub fn new<S: AsRef<str>>(columns: &[S]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            operations: Vec::new(),
        }
    }

    pub fn aggregate(mut self, operation: AggOperation) -> Self {
        self.operations.push(operation);
        self
    }

    pub fn sum(self, column: &str, alias: &str) -> Self {
        self.aggregate(AggOperation::new(AggOp::Sum, column, alias))
    }

    pub fn count(self, column: &str, alias: &str) -> Self {
        self.aggregate(AggOperation::new(AggOp::Count, column, alias))
    }

    pub fn min(self, column: &str, alias: &str) -> Self {
        self.aggregate(AggOperation::new(AggOp::Min, column, alias))
    }

    pub fn max(self, column: &str, alias: &str) -> Self {
        self.aggregate(AggOperation::new(AggOp::Max, column, alias))
    }

    pub fn avg(self, column: &str, alias: &str) -> Self {
        self.aggregate(AggOperation::new(AggOp::Avg, column, alias))
    }

    /// Attach a post-aggregation predicate to the operation named `alias`
    pub fn having(mut self, alias: &str, predicate: Predicate) -> Self {
        if let Some(op) = self.operations.iter_mut().find(|o| o.alias == alias) {
            op.filter.get_or_insert_with(Vec::new).push(predicate);
        }
        self
    }

    /// Union of the per-alias filters
    pub fn having_filter(&self) -> Filter {
        let mut filter = Filter::new();
        for op in &self.operations {
            for predicate in op.filter.iter().flatten() {
                filter = filter.push(&op.alias, predicate.clone());
            }
        }
        filter
    }
}
