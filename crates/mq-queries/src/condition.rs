//! Member search condition
//!
//! The set of optional filters a caller can pass to a member search. Every
//! field is independent; leaving one unset means "do not filter on it".

use mq_core::error::ValidationErrors;
use mq_core::result::{validation_result, ValidationResult};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MemberSearchCondition {
    /// Exact username
    pub username: Option<String>,
    /// Exact team name
    pub team_name: Option<String>,
    /// Minimum age, inclusive
    #[validate(range(min = 0, message = "must not be negative"))]
    pub age_goe: Option<i32>,
    /// Maximum age, inclusive
    #[validate(range(min = 0, message = "must not be negative"))]
    pub age_loe: Option<i32>,
}

impl MemberSearchCondition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_team_name(mut self, team_name: impl Into<String>) -> Self {
        self.team_name = Some(team_name.into());
        self
    }

    pub fn with_age_goe(mut self, age: i32) -> Self {
        self.age_goe = Some(age);
        self
    }

    pub fn with_age_loe(mut self, age: i32) -> Self {
        self.age_loe = Some(age);
        self
    }

    /// Whether no filter is set at all
    pub fn is_empty(&self) -> bool {
        text(&self.username).is_none()
            && text(&self.team_name).is_none()
            && self.age_goe.is_none()
            && self.age_loe.is_none()
    }

    /// Username, if set to something other than blank text
    pub fn username_text(&self) -> Option<&str> {
        text(&self.username)
    }

    /// Team name, if set to something other than blank text
    pub fn team_name_text(&self) -> Option<&str> {
        text(&self.team_name)
    }

    /// Run field validation and report failures keyed by field name
    pub fn check(&self) -> ValidationResult {
        match self.validate() {
            Ok(()) => Ok(()),
            Err(failures) => validation_result(ValidationErrors::from(failures)),
        }
    }
}

fn text(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}
