//! # mq-models
//!
//! Domain models for Member Query.
//!
//! `Member` and `Team` are plain records. The many-to-one relation from a
//! member to its team is an explicit `team_id` foreign key; teams hold no
//! references back to their members.

pub use mq_core::traits::{Entity, Id, Identifiable};

pub mod member;
pub mod team;
pub mod dto;

// Re-exports for convenience
pub use member::{Member, NewMember};
pub use team::{NewTeam, Team};
pub use dto::{MemberDto, MemberTeamDto, MemberWithTeam};
