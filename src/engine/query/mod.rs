//! Query Model
//!
//! `Query` collects filter, grouping, ordering, paging and join state through
//! consuming builder calls. One terminal call (`find`, `find_one`,
//! `find_all`) executes it.

pub mod group;
pub mod join;

use std::sync::Arc;

pub use crate::engine::sql::select::{Limit, QuerySpec};
pub use group::{AggOp, AggOperation, GroupBy};
pub use join::{Join, JoinKind, JoinMode, JoinTarget};

use crate::engine::adapter::SortDirection;
use crate::engine::connection::Connection;
use crate::engine::definition::Table;
use crate::engine::error::{Result, VdbaError};
use crate::engine::filter::Filter;
use crate::engine::result::{ResultOptions, ResultSet};
use crate::engine::sql::select::{adapt_rows, build_select};
use crate::engine::value::Row;

#[must_use = "a query does nothing until find, find_one or find_all runs it"]
#[derive(Debug, Clone)]
pub struct Query<'c> {
    conn: &'c Connection,
    source: Arc<Table>,
    spec: QuerySpec,
}

impl<'c> Query<'c> {
    pub(crate) fn new(conn: &'c Connection, source: Arc<Table>) -> Self {
        Self {
            conn,
            source,
            spec: QuerySpec::default(),
        }
    }

    pub fn spec(&self) -> &QuerySpec {
        &self.spec
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.spec.filter = filter;
        self
    }

    /// Parse a filter document such as `{"age": {"$gt": 21}}`
    pub fn filter_json(self, filter: &serde_json::Value) -> Result<Self> {
        Ok(self.filter(Filter::parse(filter)?))
    }

    /// Ascending order on `column`; later calls add tie-breakers
    pub fn sort(self, column: &str) -> Self {
        self.order_by(column, SortDirection::Asc)
    }

    pub fn sort_desc(self, column: &str) -> Self {
        self.order_by(column, SortDirection::Desc)
    }

    /// Ordering a column twice keeps its first position with the new direction
    pub fn order_by(mut self, column: &str, direction: SortDirection) -> Self {
        match self.spec.order.iter_mut().find(|(c, _)| c == column) {
            Some(entry) => entry.1 = direction,
            None => self.spec.order.push((column.to_string(), direction)),
        }
        self
    }

    pub fn limit(mut self, count: u64, start: u64) -> Self {
        self.spec.limit = Some(Limit {
            count: Some(count),
            start,
        });
        self
    }

    /// Skip `start` rows, keeping any count already set
    pub fn offset(mut self, start: u64) -> Self {
        let count = self.spec.limit.and_then(|l| l.count);
        self.spec.limit = Some(Limit { count, start });
        self
    }

    pub fn group_by(mut self, group: GroupBy) -> Self {
        self.spec.group = Some(group);
        self
    }

    /// Flat inner join
    pub fn join(self, target: impl Into<JoinTarget>, source_column: &str, target_column: Option<&str>) -> Self {
        self.join_with(JoinMode::None, target, source_column, target_column)
    }

    /// Inner join nesting the target columns under the target table name
    pub fn join_one_to_one(
        self,
        target: impl Into<JoinTarget>,
        source_column: &str,
        target_column: Option<&str>,
    ) -> Self {
        self.join_with(JoinMode::OneToOne, target, source_column, target_column)
    }

    pub fn join_one_to_many(
        self,
        target: impl Into<JoinTarget>,
        source_column: &str,
        target_column: Option<&str>,
    ) -> Self {
        self.join_with(JoinMode::OneToMany, target, source_column, target_column)
    }

    fn join_with(
        mut self,
        mode: JoinMode,
        target: impl Into<JoinTarget>,
        source_column: &str,
        target_column: Option<&str>,
    ) -> Self {
        self.spec
            .joins
            .push(Join::new(mode, target, source_column, target_column));
        self
    }

    pub fn find(self) -> Result<ResultSet> {
        SelectEngine::new(self.conn).execute(&self.spec, &self.source)
    }

    /// First matching row. Keeps any offset already set.
    pub fn find_one(mut self) -> Result<Option<Row>> {
        let start = self.spec.limit.map(|l| l.start).unwrap_or(0);
        self.spec.limit = Some(Limit { count: Some(1), start });
        Ok(self.find()?.into_rows().into_iter().next())
    }

    /// Every row; any filter set so far is dropped
    pub fn find_all(mut self) -> Result<ResultSet> {
        self.spec.filter = Filter::new();
        self.find()
    }
}

/// Executes select specs: resolves the join target through the definition
/// cache, runs the statement and adapts the rows.
pub(crate) struct SelectEngine<'c> {
    conn: &'c Connection,
}

impl<'c> SelectEngine<'c> {
    pub(crate) fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    fn resolve(&self, target: &JoinTarget, source: &Table) -> Result<Arc<Table>> {
        match target {
            JoinTarget::Table(table) => Ok(Arc::clone(table)),
            JoinTarget::Name(name) => {
                let (schema, table) = join::split_target(name, source.schema());
                self.conn
                    .load_table(schema, table)?
                    .ok_or_else(|| VdbaError::TargetTableNotFound {
                        schema: schema.to_lowercase(),
                        table: table.to_lowercase(),
                    })
            }
        }
    }

    pub(crate) fn execute(&self, spec: &QuerySpec, source: &Table) -> Result<ResultSet> {
        let join = spec.join()?;
        let target = join.map(|j| self.resolve(&j.target, source)).transpose()?;

        let statement = build_select(spec, source, target.as_deref())?;
        let rows = self.conn.query(&statement)?;
        let rows = adapt_rows(rows, spec, source, target.as_deref())?;

        Ok(ResultSet::new(
            rows,
            ResultOptions {
                table: source.qn(),
                join_mode: join.map(|j| j.mode),
                aggregate: spec.is_aggregate(),
            },
        ))
    }
}
