//! Member model
//!
//! Table: member

use mq_core::traits::{Entity, Id, Identifiable};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Member entity
///
/// A member belongs to at most one team, referenced by `team_id`.
/// `username` is nullable; sort keys may place such members first or last.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: Option<Id>,
    pub username: Option<String>,
    pub age: i32,
    pub team_id: Option<Id>,
}

impl Identifiable for Member {
    fn id(&self) -> Option<Id> {
        self.id
    }
}

impl Entity for Member {
    const TABLE_NAME: &'static str = "member";
    const TYPE_NAME: &'static str = "Member";

    fn with_id(mut self, id: Id) -> Self {
        self.id = Some(id);
        self
    }
}

impl Member {
    /// Create a member without a team
    pub fn new(username: impl Into<String>, age: i32) -> Self {
        Self {
            username: Some(username.into()),
            age,
            ..Default::default()
        }
    }

    /// Create a member that belongs to `team_id`
    pub fn in_team(username: impl Into<String>, age: i32, team_id: Id) -> Self {
        Self {
            team_id: Some(team_id),
            ..Self::new(username, age)
        }
    }

    pub fn has_team(&self) -> bool {
        self.team_id.is_some()
    }

    /// Move the member to another team (or out of any team)
    pub fn change_team(&mut self, team_id: Option<Id>) {
        self.team_id = team_id;
    }
}

/// DTO for creating a member
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewMember {
    #[validate(length(min = 1))]
    pub username: Option<String>,
    #[validate(range(min = 0))]
    pub age: i32,
    pub team_id: Option<Id>,
}

impl NewMember {
    pub fn new(username: impl Into<String>, age: i32, team_id: Option<Id>) -> Self {
        Self {
            username: Some(username.into()),
            age,
            team_id,
        }
    }

    /// A member whose username is NULL
    pub fn anonymous(age: i32) -> Self {
        Self {
            username: None,
            age,
            team_id: None,
        }
    }
}

impl From<NewMember> for Member {
    fn from(dto: NewMember) -> Self {
        Self {
            id: None,
            username: dto.username,
            age: dto.age,
            team_id: dto.team_id,
        }
    }
}
