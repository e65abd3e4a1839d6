//! Team model
//!
//! Table: team

use mq_core::traits::{Entity, Id, Identifiable};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Team entity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: Option<Id>,
    pub name: String,
}

impl Identifiable for Team {
    fn id(&self) -> Option<Id> {
        self.id
    }
}

impl Entity for Team {
    const TABLE_NAME: &'static str = "team";
    const TYPE_NAME: &'static str = "Team";

    fn with_id(mut self, id: Id) -> Self {
        self.id = Some(id);
        self
    }
}

impl Team {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }
}

/// DTO for creating a team
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Validate)]
pub struct NewTeam {
    #[validate(length(min = 1))]
    pub name: String,
}

impl NewTeam {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl From<NewTeam> for Team {
    fn from(dto: NewTeam) -> Self {
        Team::new(dto.name)
    }
}
