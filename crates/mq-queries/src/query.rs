//! Query Model
//!
//! A `MemberQuery` is everything an engine needs for one round-trip: the
//! where-predicate, the ordered window, and an optional team join.

use serde::{Deserialize, Serialize};

use crate::filters::Predicate;
use crate::join::JoinSpec;
use crate::page::PageRequest;
use crate::sorts::SortOrder;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberQuery {
    pub predicate: Predicate,
    pub page: PageRequest,
    pub join: Option<JoinSpec>,
}

impl Default for MemberQuery {
    fn default() -> Self {
        Self {
            predicate: Predicate::always_true(),
            page: PageRequest::unpaged(),
            join: None,
        }
    }
}

impl MemberQuery {
    pub fn new(predicate: Predicate, page: PageRequest) -> Self {
        Self {
            predicate,
            page,
            join: None,
        }
    }

    pub fn has_filters(&self) -> bool {
        !self.predicate.is_match_all()
    }

    pub fn has_custom_sort(&self) -> bool {
        !self.page.sort.is_empty()
    }

    pub fn sort(&self) -> &SortOrder {
        &self.page.sort
    }

    pub fn is_joined(&self) -> bool {
        self.join.is_some()
    }

    /// Whether the query needs the team row, either explicitly joined or
    /// because a filter or sort key reads a team attribute
    pub fn needs_team(&self) -> bool {
        self.is_joined() || self.predicate.references_team() || self.page.sort.references_team()
    }
}
