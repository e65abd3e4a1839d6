//! Attribute access for the member/team records

use mq_models::{Member, MemberTeamDto, MemberWithTeam, Team};

use crate::filters::{Field, FieldSource, Value};

/// A member paired with the team row it was joined to, if any
#[derive(Debug, Clone, Copy)]
pub struct JoinedRef<'a> {
    pub member: &'a Member,
    pub team: Option<&'a Team>,
}

impl<'a> JoinedRef<'a> {
    pub fn new(member: &'a Member, team: Option<&'a Team>) -> Self {
        Self { member, team }
    }
}

fn member_field(member: &Member, field: Field) -> Option<Value> {
    match field {
        Field::MemberId => member.id.map(Value::from),
        Field::Username => member.username.as_deref().map(Value::from),
        Field::Age => Some(Value::from(member.age)),
        Field::TeamId => member.team_id.map(Value::from),
        Field::TeamName => None,
    }
}

impl FieldSource for JoinedRef<'_> {
    fn field_value(&self, field: Field) -> Option<Value> {
        match field {
            Field::TeamName => self.team.map(|t| Value::from(t.name.as_str())),
            other => member_field(self.member, other),
        }
    }
}

/// Without a join, team attributes read as NULL
impl FieldSource for Member {
    fn field_value(&self, field: Field) -> Option<Value> {
        member_field(self, field)
    }
}

impl FieldSource for MemberWithTeam {
    fn field_value(&self, field: Field) -> Option<Value> {
        JoinedRef::new(&self.member, self.team.as_ref()).field_value(field)
    }
}

impl FieldSource for MemberTeamDto {
    fn field_value(&self, field: Field) -> Option<Value> {
        match field {
            Field::MemberId => self.member_id.map(Value::from),
            Field::Username => self.username.as_deref().map(Value::from),
            Field::Age => Some(Value::from(self.age)),
            Field::TeamId => self.team_id.map(Value::from),
            Field::TeamName => self.team_name.as_deref().map(Value::from),
        }
    }
}
