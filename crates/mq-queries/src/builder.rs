//! Query Builder
//!
//! Provides a fluent API for constructing member queries with filters,
//! joins, sorts, and a page window.

use crate::aggregate::Aggregate;
use crate::condition::MemberSearchCondition;
use crate::filters::{Clause, Field, Predicate, Value};
use crate::join::JoinSpec;
use crate::page::PageRequest;
use crate::query::MemberQuery;
use crate::sorts::{SortCriterion, SortOrder};

/// Builder for constructing queries fluently
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    predicate: Predicate,
    sorts: SortOrder,
    offset: u64,
    limit: u64,
    join: Option<JoinSpec>,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryBuilder {
    /// Create a new query builder: no filters, no order, unpaged
    pub fn new() -> Self {
        Self {
            predicate: Predicate::always_true(),
            sorts: SortOrder::new(),
            offset: 0,
            limit: PageRequest::UNBOUNDED,
            join: None,
        }
    }

    // ========== Filters ==========

    /// Add a where-clause; several calls are AND-combined
    pub fn filter(mut self, clause: Clause) -> Self {
        self.predicate = self.predicate.and(clause);
        self
    }

    /// AND an entire predicate onto the current one
    pub fn where_predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = self.predicate.and_all(predicate);
        self
    }

    /// Apply a search condition (unset fields add nothing)
    pub fn condition(self, condition: &MemberSearchCondition) -> Self {
        self.where_predicate(crate::composer::compose(condition))
    }

    pub fn username(self, username: impl Into<String>) -> Self {
        self.filter(Field::Username.eq(Value::Str(username.into())))
    }

    pub fn age(self, age: i32) -> Self {
        self.filter(Field::Age.eq(age))
    }

    pub fn age_between(self, low: i32, high: i32) -> Self {
        self.filter(Field::Age.between(low, high))
    }

    pub fn team_name(self, name: impl Into<String>) -> Self {
        self.filter(Field::TeamName.eq(Value::Str(name.into())))
    }

    // ========== Joins ==========

    pub fn join(mut self, join: JoinSpec) -> Self {
        self.join = Some(join);
        self
    }

    pub fn inner_join_team(self) -> Self {
        self.join(JoinSpec::inner())
    }

    pub fn left_join_team(self) -> Self {
        self.join(JoinSpec::left())
    }

    // ========== Sorting ==========

    /// Replace the sort order
    pub fn sort(mut self, sorts: SortOrder) -> Self {
        self.sorts = sorts;
        self
    }

    /// Append a sort criterion
    pub fn order_by(mut self, criterion: SortCriterion) -> Self {
        self.sorts.add(criterion);
        self
    }

    pub fn order_by_asc(self, field: Field) -> Self {
        self.order_by(SortCriterion::asc(field))
    }

    pub fn order_by_desc(self, field: Field) -> Self {
        self.order_by(SortCriterion::desc(field))
    }

    // ========== Paging ==========

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    /// Take window and sort keys from a page request
    pub fn page(mut self, page: &PageRequest) -> Self {
        self.offset = page.offset;
        self.limit = page.limit;
        if !page.sort.is_empty() {
            self.sorts = page.sort.clone();
        }
        self
    }

    /// Build the query
    pub fn build(self) -> MemberQuery {
        MemberQuery {
            predicate: self.predicate,
            page: PageRequest::new(self.offset, self.limit).with_sort(self.sorts),
            join: self.join,
        }
    }
}

/// Commonly used queries
pub mod presets {
    use super::*;

    /// All members of one team, ordered by id
    pub fn team_members(team_name: impl Into<String>) -> MemberQuery {
        QueryBuilder::new()
            .inner_join_team()
            .team_name(team_name)
            .order_by_asc(Field::MemberId)
            .build()
    }

    /// Members whose age equals the maximum age
    pub fn oldest_members() -> MemberQuery {
        QueryBuilder::new()
            .filter(Field::Age.eq_subquery(Aggregate::max(Field::Age)))
            .order_by_asc(Field::MemberId)
            .build()
    }

    /// Members at or above the average age
    pub fn at_least_average_age() -> MemberQuery {
        QueryBuilder::new()
            .filter(Field::Age.goe_subquery(Aggregate::avg(Field::Age)))
            .order_by_asc(Field::Age)
            .build()
    }

    /// Every member with the team attached where one matches `team_name`
    pub fn members_with_team_named(team_name: impl Into<String>) -> MemberQuery {
        QueryBuilder::new()
            .join(JoinSpec::left().on_filter(Field::TeamName.eq(Value::Str(team_name.into()))))
            .order_by_asc(Field::MemberId)
            .build()
    }
}
