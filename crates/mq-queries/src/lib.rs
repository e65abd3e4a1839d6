//! # mq-queries
//!
//! Query system for Member Query.
//!
//! This crate builds the engine-independent half of a member search: typed
//! predicates, sort keys, page windows and join descriptions. Nothing here
//! performs I/O.
//!
//! ## Structure
//!
//! - `condition` - Optional search filters supplied by callers
//! - `composer` - Turns a condition into a predicate
//! - `filters` - Fields, values, clauses and predicates
//! - `aggregate` - Scalar aggregates and subquery bodies
//! - `sorts` - Sort orders, directions and NULL placement
//! - `page` - Offset/limit windows
//! - `projection` - Select-list columns for tuple queries
//! - `join` - Member/team join descriptions
//! - `query` / `builder` - Fluent API for constructing queries
//!
//! ## Example
//!
//! ```
//! use mq_queries::{compose, MemberSearchCondition, Field};
//!
//! let condition = MemberSearchCondition::new()
//!     .with_team_name("teamB")
//!     .with_age_goe(35)
//!     .with_age_loe(40);
//!
//! let predicate = compose(&condition);
//! assert_eq!(predicate.len(), 3);
//! assert_eq!(predicate.clauses()[0], Field::TeamName.eq("teamB"));
//! ```

pub mod aggregate;
pub mod builder;
pub mod composer;
pub mod condition;
pub mod filters;
pub mod join;
pub mod page;
pub mod projection;
pub mod query;
pub mod sorts;
pub mod source;

// Re-exports for convenience
pub use aggregate::{Aggregate, AggregateFn};
pub use builder::{presets, QueryBuilder};
pub use composer::compose;
pub use condition::MemberSearchCondition;
pub use filters::{Clause, Field, FieldSource, Operand, Predicate, Value};
pub use join::{JoinKind, JoinOn, JoinSpec};
pub use page::PageRequest;
pub use projection::{CaseExpr, Projection, Tuple, ValueKind};
pub use query::MemberQuery;
pub use sorts::{default_member_sort, NullsOrdering, SortCriterion, SortDirection, SortOrder};
pub use source::JoinedRef;
