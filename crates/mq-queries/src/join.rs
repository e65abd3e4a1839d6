//! Member/team join descriptions

use mq_models::{Member, Team};
use serde::{Deserialize, Serialize};

use crate::filters::{Clause, Predicate};
use crate::source::JoinedRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinKind {
    /// Only members with a matching team
    Inner,
    /// Every member; team columns are NULL when nothing matches
    #[default]
    Left,
}

/// How a member row is paired with a team row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinOn {
    /// Along the foreign key: `member.team_id = team.id`
    #[default]
    Relation,
    /// Unrelated (theta) join: `member.username = team.name`
    UsernameEqTeamName,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct JoinSpec {
    pub kind: JoinKind,
    pub on: JoinOn,
    /// Extra conditions appended to the ON clause. For left joins they only
    /// decide which team gets attached, never which members are returned.
    pub filter: Predicate,
}

impl JoinSpec {
    /// `join member.team team`
    pub fn inner() -> Self {
        Self {
            kind: JoinKind::Inner,
            ..Default::default()
        }
    }

    /// `left join member.team team`
    pub fn left() -> Self {
        Self {
            kind: JoinKind::Left,
            ..Default::default()
        }
    }

    /// `from member, team where member.username = team.name`
    pub fn theta() -> Self {
        Self {
            kind: JoinKind::Inner,
            on: JoinOn::UsernameEqTeamName,
            filter: Predicate::always_true(),
        }
    }

    /// `left join team on member.username = team.name`
    pub fn left_unrelated() -> Self {
        Self {
            kind: JoinKind::Left,
            on: JoinOn::UsernameEqTeamName,
            filter: Predicate::always_true(),
        }
    }

    /// Append a condition to the ON clause
    pub fn on_filter(mut self, clause: Clause) -> Self {
        self.filter = self.filter.and(clause);
        self
    }

    pub fn is_left(&self) -> bool {
        self.kind == JoinKind::Left
    }

    /// Whether `team` satisfies the ON clause for `member`
    pub fn pairs(&self, member: &Member, team: &Team) -> bool {
        let related = match self.on {
            JoinOn::Relation => member.team_id.is_some() && member.team_id == team.id,
            JoinOn::UsernameEqTeamName => member.username.as_deref() == Some(team.name.as_str()),
        };
        related && self.filter.matches(&JoinedRef::new(member, Some(team)))
    }
}
