//! Query Executor
//!
//! The seam between search functions and a concrete query engine. An engine
//! receives a predicate, a page window (which carries the sort keys) and an
//! optional team join, and answers with rows and, on request, the exact
//! unwindowed total.

use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use mq_core::{SearchError, SearchResult};
use mq_models::{Member, MemberWithTeam, Team};
use mq_queries::{
    Aggregate, AggregateFn, Field, JoinSpec, PageRequest, Predicate, Projection, SortOrder,
    Tuple, Value, ValueKind,
};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{FromRow, PgPool, Postgres, Row};

use crate::error::{classify, db_error};
use crate::pager::TotalCount;
use crate::sql::{self, SqlParam, SqlStatement};

/// Whether an engine call must report the exact total
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CountPolicy {
    Exact,
    #[default]
    Skip,
}

/// Rows of one window plus the total, when it was asked for
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutput<T> {
    pub rows: Vec<T>,
    pub total: TotalCount,
}

impl<T> QueryOutput<T> {
    pub fn new(rows: Vec<T>, total: TotalCount) -> Self {
        Self { rows, total }
    }
}

/// A query engine over members and teams
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Member rows matching `predicate` inside the page window. A team
    /// filter or sort key implies an inner join along the relation.
    async fn execute(
        &self,
        predicate: &Predicate,
        page: &PageRequest,
        count: CountPolicy,
    ) -> SearchResult<QueryOutput<Member>>;

    /// Member rows paired with the team chosen by `join`. `predicate` is
    /// applied after the join.
    async fn execute_join(
        &self,
        predicate: &Predicate,
        page: &PageRequest,
        join: &JoinSpec,
        count: CountPolicy,
    ) -> SearchResult<QueryOutput<MemberWithTeam>>;

    /// Unwindowed number of member rows matching `predicate`
    async fn count(&self, predicate: &Predicate) -> SearchResult<u64>;

    /// Unwindowed number of joined rows, as `execute_join` would produce them
    async fn count_join(&self, predicate: &Predicate, join: &JoinSpec) -> SearchResult<u64>;

    /// Scalar aggregate over the members matching `predicate`
    async fn aggregate(
        &self,
        predicate: &Predicate,
        aggregate: Aggregate,
    ) -> SearchResult<Option<Value>>;

    /// One tuple of `projections` per member row matching `predicate`,
    /// windowed and ordered like `execute`
    async fn project(
        &self,
        predicate: &Predicate,
        page: &PageRequest,
        projections: &[Projection],
    ) -> SearchResult<Vec<Tuple>>;
}

/// Member row from database
#[derive(Debug, Clone, FromRow)]
pub struct MemberRow {
    pub member_id: i64,
    pub username: Option<String>,
    pub age: i32,
    pub team_id: Option<i64>,
}

impl From<MemberRow> for Member {
    fn from(row: MemberRow) -> Self {
        Member {
            id: Some(row.member_id),
            username: row.username,
            age: row.age,
            team_id: row.team_id,
        }
    }
}

/// Member row with the joined team columns
#[derive(Debug, Clone, FromRow)]
pub struct MemberTeamRow {
    pub member_id: i64,
    pub username: Option<String>,
    pub age: i32,
    pub team_id: Option<i64>,
    pub joined_team_id: Option<i64>,
    pub team_name: Option<String>,
}

impl From<MemberTeamRow> for MemberWithTeam {
    fn from(row: MemberTeamRow) -> Self {
        let team = row.joined_team_id.map(|id| Team {
            id: Some(id),
            name: row.team_name.unwrap_or_default(),
        });
        MemberWithTeam {
            member: Member {
                id: Some(row.member_id),
                username: row.username,
                age: row.age,
                team_id: row.team_id,
            },
            team,
        }
    }
}

/// PostgreSQL query engine
pub struct PgQueryExecutor<'a> {
    pool: &'a PgPool,
    timeout: Duration,
}

impl<'a> PgQueryExecutor<'a> {
    pub fn new(pool: &'a PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// Run one engine call under the configured timeout, classifying failures
    async fn timed<T, F>(&self, operation: &'static str, call: F) -> SearchResult<T>
    where
        F: Future<Output = Result<T, sqlx::Error>> + Send,
        T: Send,
    {
        let started = Instant::now();
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                let err = classify(e, started.elapsed());
                tracing::warn!(operation, code = err.error_code(), "query failed: {}", err);
                Err(err)
            }
            Err(_) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                tracing::warn!(operation, elapsed_ms, "query timed out");
                Err(SearchError::QueryTimeout { elapsed_ms })
            }
        }
    }

    async fn fetch_rows<O>(&self, operation: &'static str, stmt: &SqlStatement) -> SearchResult<Vec<O>>
    where
        O: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        tracing::debug!(operation, sql = %stmt.sql, params = stmt.params.len(), "executing");
        let mut query = sqlx::query_as::<_, O>(&stmt.sql);
        for param in &stmt.params {
            query = match param {
                SqlParam::Int(v) => query.bind(*v),
                SqlParam::Float(v) => query.bind(*v),
                SqlParam::Text(v) => query.bind(v.clone()),
            };
        }
        self.timed(operation, query.fetch_all(self.pool)).await
    }

    async fn fetch_scalar(&self, operation: &'static str, stmt: &SqlStatement) -> SearchResult<PgRow> {
        tracing::debug!(operation, sql = %stmt.sql, params = stmt.params.len(), "executing");
        self.timed(operation, raw_query(stmt).fetch_one(self.pool)).await
    }

    async fn fetch_raw(&self, operation: &'static str, stmt: &SqlStatement) -> SearchResult<Vec<PgRow>> {
        tracing::debug!(operation, sql = %stmt.sql, params = stmt.params.len(), "executing");
        self.timed(operation, raw_query(stmt).fetch_all(self.pool)).await
    }

    async fn fetch_count(&self, stmt: &SqlStatement) -> SearchResult<u64> {
        let row = self.fetch_scalar("count", stmt).await?;
        let count: i64 = row.try_get(0).map_err(db_error)?;
        Ok(count.max(0) as u64)
    }
}

fn raw_query(stmt: &SqlStatement) -> Query<'_, Postgres, PgArguments> {
    let mut query = sqlx::query(&stmt.sql);
    for param in &stmt.params {
        query = match param {
            SqlParam::Int(v) => query.bind(*v),
            SqlParam::Float(v) => query.bind(*v),
            SqlParam::Text(v) => query.bind(v.clone()),
        };
    }
    query
}

/// Decode one projected row; column `i` holds `projections[i]`
fn decode_tuple(row: &PgRow, projections: &[Projection]) -> Result<Tuple, sqlx::Error> {
    projections
        .iter()
        .enumerate()
        .map(|(i, projection)| {
            Ok(match projection.kind() {
                ValueKind::Int => row.try_get::<Option<i64>, _>(i)?.map(Value::Int),
                ValueKind::Float => row.try_get::<Option<f64>, _>(i)?.map(Value::Float),
                ValueKind::Text => row.try_get::<Option<String>, _>(i)?.map(Value::Str),
            })
        })
        .collect()
}

fn decode_aggregate(row: &PgRow, aggregate: &Aggregate) -> Result<Option<Value>, sqlx::Error> {
    let text = matches!(aggregate.field, Field::Username | Field::TeamName);
    let value = match aggregate.func {
        AggregateFn::Avg => row.try_get::<Option<f64>, _>(0)?.map(Value::Float),
        AggregateFn::Max | AggregateFn::Min if text => {
            row.try_get::<Option<String>, _>(0)?.map(Value::Str)
        }
        _ => row.try_get::<Option<i64>, _>(0)?.map(Value::Int),
    };
    Ok(value)
}

#[async_trait]
impl<'a> QueryExecutor for PgQueryExecutor<'a> {
    async fn execute(
        &self,
        predicate: &Predicate,
        page: &PageRequest,
        count: CountPolicy,
    ) -> SearchResult<QueryOutput<Member>> {
        let stmt = sql::build_select(predicate, page, None);
        let rows: Vec<MemberRow> = self.fetch_rows("execute", &stmt).await?;

        let total = match count {
            CountPolicy::Exact => {
                let count = sql::build_count(predicate, &page.sort, None);
                TotalCount::Exact(self.fetch_count(&count).await?)
            }
            CountPolicy::Skip => TotalCount::Unknown,
        };
        Ok(QueryOutput::new(
            rows.into_iter().map(Member::from).collect(),
            total,
        ))
    }

    async fn execute_join(
        &self,
        predicate: &Predicate,
        page: &PageRequest,
        join: &JoinSpec,
        count: CountPolicy,
    ) -> SearchResult<QueryOutput<MemberWithTeam>> {
        let stmt = sql::build_select(predicate, page, Some(join));
        let rows: Vec<MemberTeamRow> = self.fetch_rows("execute_join", &stmt).await?;

        let total = match count {
            CountPolicy::Exact => TotalCount::Exact(self.count_join(predicate, join).await?),
            CountPolicy::Skip => TotalCount::Unknown,
        };
        Ok(QueryOutput::new(
            rows.into_iter().map(MemberWithTeam::from).collect(),
            total,
        ))
    }

    async fn count(&self, predicate: &Predicate) -> SearchResult<u64> {
        self.fetch_count(&sql::build_count(predicate, &SortOrder::new(), None)).await
    }

    async fn count_join(&self, predicate: &Predicate, join: &JoinSpec) -> SearchResult<u64> {
        self.fetch_count(&sql::build_count(predicate, &SortOrder::new(), Some(join))).await
    }

    async fn aggregate(
        &self,
        predicate: &Predicate,
        aggregate: Aggregate,
    ) -> SearchResult<Option<Value>> {
        let stmt = sql::build_aggregate(predicate, &aggregate);
        let row = self.fetch_scalar("aggregate", &stmt).await?;
        decode_aggregate(&row, &aggregate).map_err(db_error)
    }

    async fn project(
        &self,
        predicate: &Predicate,
        page: &PageRequest,
        projections: &[Projection],
    ) -> SearchResult<Vec<Tuple>> {
        let stmt = sql::build_projection(predicate, page, projections);
        let rows = self.fetch_raw("project", &stmt).await?;
        rows.iter()
            .map(|row| decode_tuple(row, projections))
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_error)
    }
}
