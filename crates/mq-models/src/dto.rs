//! Projections
//!
//! Flattened row shapes returned by searches. Engines populate these
//! directly from joined columns.

use mq_core::traits::Id;
use serde::{Deserialize, Serialize};

use crate::member::Member;
use crate::team::Team;

/// Member joined with its (optional) team, as a flat row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberTeamDto {
    pub member_id: Option<Id>,
    pub username: Option<String>,
    pub age: i32,
    pub team_id: Option<Id>,
    pub team_name: Option<String>,
}

/// Username and age only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberDto {
    pub username: Option<String>,
    pub age: i32,
}

/// A member fetched together with its team in one round-trip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberWithTeam {
    pub member: Member,
    /// `None` when the member has no team or a left join found no match
    pub team: Option<Team>,
}

impl MemberWithTeam {
    pub fn team_name(&self) -> Option<&str> {
        self.team.as_ref().map(|t| t.name.as_str())
    }
}

impl From<MemberWithTeam> for MemberTeamDto {
    fn from(row: MemberWithTeam) -> Self {
        let (team_id, team_name) = match row.team {
            Some(team) => (team.id, Some(team.name)),
            None => (None, None),
        };
        Self {
            member_id: row.member.id,
            username: row.member.username,
            age: row.member.age,
            team_id,
            team_name,
        }
    }
}

impl From<&Member> for MemberDto {
    fn from(member: &Member) -> Self {
        Self {
            username: member.username.clone(),
            age: member.age,
        }
    }
}

impl From<Member> for MemberDto {
    fn from(member: Member) -> Self {
        Self {
            username: member.username,
            age: member.age,
        }
    }
}
