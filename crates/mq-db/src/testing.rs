//! Shared test fixtures

use mq_models::{NewMember, NewTeam};

use crate::memory::MemoryStore;

/// teamA holds member1 (10) and member2 (20); teamB holds member3 (30) and
/// member4 (40)
pub fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();
    let team_a = store.insert_team(NewTeam::new("teamA")).id;
    let team_b = store.insert_team(NewTeam::new("teamB")).id;

    store.insert_member(NewMember::new("member1", 10, team_a));
    store.insert_member(NewMember::new("member2", 20, team_a));
    store.insert_member(NewMember::new("member3", 30, team_b));
    store.insert_member(NewMember::new("member4", 40, team_b));
    store
}
