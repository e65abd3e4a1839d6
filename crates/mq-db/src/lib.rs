//! # mq-db
//!
//! Query engines and search entry points for Member Query.
//!
//! This crate runs the queries built by `mq-queries`:
//!
//! - The `QueryExecutor` seam with an in-memory engine and a PostgreSQL
//!   engine (SQLx)
//! - Paging with exact or optimized totals
//! - Search functions over members and their teams
//! - Repository pattern for member/team CRUD
//!
//! ## Example
//!
//! ```ignore
//! use mq_core::AppConfig;
//! use mq_db::{search_page_complex, Database};
//! use mq_queries::{MemberSearchCondition, PageRequest};
//!
//! let config = AppConfig::load()?;
//! let db = Database::connect(&config.database).await?;
//! let engine = db.executor(config.search.query_timeout());
//!
//! let condition = MemberSearchCondition::new().with_team_name("teamB");
//! let page = search_page_complex(&engine, &condition, &PageRequest::of(0, 20)).await?;
//! ```

pub mod error;
pub mod members;
pub mod memory;
pub mod pager;
pub mod pool;
pub mod query_executor;
pub mod repository;
pub mod search;
pub mod sql;
pub mod teams;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports
pub use error::{classify, db_error};
pub use members::PgMemberRepository;
pub use memory::{MemoryMemberRepository, MemoryStore, MemoryTeamRepository, QueryStats};
pub use pager::{build_optimized, build_simple, proven_total, PageResult, TotalCount};
pub use pool::{Database, PoolStats};
pub use query_executor::{CountPolicy, MemberRow, MemberTeamRow, PgQueryExecutor, QueryExecutor, QueryOutput};
pub use repository::{MemberRepository, Repository};
pub use search::{
    aggregate, fetch, fetch_first, fetch_joined, fetch_page, find_members_with_team, search,
    search_members, search_page, search_page_complex, search_page_simple, select_tuples,
};
pub use sql::{SqlParam, SqlStatement};
pub use teams::{PgTeamRepository, TeamRow};
