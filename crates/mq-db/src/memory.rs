//! In-memory engine
//!
//! A complete query engine over members and teams held in process. It
//! follows SQL semantics where they matter for search results: NULL never
//! matches a comparison, left joins keep unmatched members, and subqueries
//! are evaluated once over all members before the outer filter runs.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use mq_core::{Entity, Id, SearchError, SearchResult};
use mq_models::{Member, MemberWithTeam, NewMember, NewTeam, Team};
use mq_queries::{
    Aggregate, FieldSource, JoinSpec, PageRequest, Predicate, Projection, Tuple, Value,
};
use parking_lot::{Mutex, RwLock};

use crate::pager::TotalCount;
use crate::query_executor::{CountPolicy, QueryExecutor, QueryOutput};
use crate::repository::{validate_new, MemberRepository, Repository};

#[derive(Debug, Default)]
struct Tables {
    members: BTreeMap<Id, Member>,
    teams: BTreeMap<Id, Team>,
    next_member_id: Id,
    next_team_id: Id,
}

impl Tables {
    fn snapshot(&self) -> (Vec<Member>, Vec<Team>) {
        (
            self.members.values().cloned().collect(),
            self.teams.values().cloned().collect(),
        )
    }
}

/// Number of engine calls served, per kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryStats {
    pub selects: u64,
    pub counts: u64,
    pub aggregates: u64,
}

#[derive(Debug, Default)]
struct Counters {
    selects: AtomicU64,
    counts: AtomicU64,
    aggregates: AtomicU64,
}

/// Thread-safe in-memory store and query engine
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    faults: Mutex<VecDeque<SearchError>>,
    counters: Counters,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next engine call fail with `error`. Several queued faults are
    /// served in order.
    pub fn fail_next(&self, error: SearchError) {
        self.faults.lock().push_back(error);
    }

    fn check_fault(&self) -> SearchResult<()> {
        match self.faults.lock().pop_front() {
            Some(err) => {
                tracing::warn!(code = err.error_code(), "injected failure: {}", err);
                Err(err)
            }
            None => Ok(()),
        }
    }

    pub fn stats(&self) -> QueryStats {
        QueryStats {
            selects: self.counters.selects.load(Ordering::Relaxed),
            counts: self.counters.counts.load(Ordering::Relaxed),
            aggregates: self.counters.aggregates.load(Ordering::Relaxed),
        }
    }

    // ========== Storage ==========

    pub fn insert_team(&self, team: NewTeam) -> Team {
        let mut tables = self.tables.write();
        tables.next_team_id += 1;
        let id = tables.next_team_id;
        let team = Team {
            id: Some(id),
            ..Team::from(team)
        };
        tables.teams.insert(id, team.clone());
        team
    }

    pub fn insert_member(&self, member: NewMember) -> Member {
        let mut tables = self.tables.write();
        tables.next_member_id += 1;
        let id = tables.next_member_id;
        let member = Member {
            id: Some(id),
            ..Member::from(member)
        };
        tables.members.insert(id, member.clone());
        member
    }

    /// Replace a stored member; `None` if the id is unknown
    pub fn update_member(&self, member: &Member) -> Option<Member> {
        let id = member.id?;
        let mut tables = self.tables.write();
        let slot = tables.members.get_mut(&id)?;
        *slot = member.clone();
        Some(member.clone())
    }

    pub fn member(&self, id: Id) -> Option<Member> {
        self.tables.read().members.get(&id).cloned()
    }

    pub fn team(&self, id: Id) -> Option<Team> {
        self.tables.read().teams.get(&id).cloned()
    }

    pub fn members(&self) -> Vec<Member> {
        self.tables.read().members.values().cloned().collect()
    }

    pub fn teams(&self) -> Vec<Team> {
        self.tables.read().teams.values().cloned().collect()
    }

    pub fn remove_member(&self, id: Id) -> Option<Member> {
        self.tables.write().members.remove(&id)
    }

    /// Remove a team; its members are left without a team
    pub fn remove_team(&self, id: Id) -> Option<Team> {
        let mut tables = self.tables.write();
        let team = tables.teams.remove(&id)?;
        for member in tables.members.values_mut() {
            if member.team_id == Some(id) {
                member.change_team(None);
            }
        }
        Some(team)
    }

    pub fn member_count(&self) -> usize {
        self.tables.read().members.len()
    }

    pub fn team_count(&self) -> usize {
        self.tables.read().teams.len()
    }

    // ========== Evaluation ==========

    /// Members matching `predicate`, each with the team a relation join
    /// attaches. Team-reading filters and sort keys imply an inner join.
    fn filter_members(
        members: &[Member],
        teams: &[Team],
        predicate: &Predicate,
        reads_team: bool,
    ) -> Vec<MemberWithTeam> {
        let predicate = resolve(predicate, members, teams);
        let rows = if reads_team || predicate.references_team() {
            join_rows(members, teams, &JoinSpec::inner())
        } else {
            members
                .iter()
                .map(|m| MemberWithTeam {
                    member: m.clone(),
                    team: None,
                })
                .collect()
        };
        rows.into_iter().filter(|row| predicate.matches(row)).collect()
    }

    fn filter_joined(
        members: &[Member],
        teams: &[Team],
        predicate: &Predicate,
        join: &JoinSpec,
    ) -> Vec<MemberWithTeam> {
        let predicate = resolve(predicate, members, teams);
        join_rows(members, teams, join)
            .into_iter()
            .filter(|row| predicate.matches(row))
            .collect()
    }
}

/// Pair members with teams in member-id order, one row per match
fn join_rows(members: &[Member], teams: &[Team], join: &JoinSpec) -> Vec<MemberWithTeam> {
    let mut rows = Vec::with_capacity(members.len());
    for member in members {
        let before = rows.len();
        for team in teams.iter().filter(|t| join.pairs(member, t)) {
            rows.push(MemberWithTeam {
                member: member.clone(),
                team: Some(team.clone()),
            });
        }
        if rows.len() == before && join.is_left() {
            rows.push(MemberWithTeam {
                member: member.clone(),
                team: None,
            });
        }
    }
    rows
}

/// Evaluate an aggregate over every member, joining teams when it reads one
fn evaluate(aggregate: &Aggregate, members: &[Member], teams: &[Team]) -> Option<Value> {
    if aggregate.field.requires_team() {
        let rows = join_rows(members, teams, &JoinSpec::inner());
        aggregate.compute(rows.iter().map(|r| r.field_value(aggregate.field)))
    } else {
        aggregate.compute(members.iter().map(|m| m.field_value(aggregate.field)))
    }
}

/// Replace uncorrelated subqueries with their values
fn resolve(predicate: &Predicate, members: &[Member], teams: &[Team]) -> Predicate {
    if !predicate.has_subqueries() {
        return predicate.clone();
    }
    predicate.resolve_subqueries(|aggregate| evaluate(aggregate, members, teams))
}

fn window<T: FieldSource>(
    mut rows: Vec<T>,
    page: &PageRequest,
    count: CountPolicy,
) -> QueryOutput<T> {
    page.sort.sort_rows(&mut rows);
    let total = match count {
        CountPolicy::Exact => TotalCount::Exact(rows.len() as u64),
        CountPolicy::Skip => TotalCount::Unknown,
    };
    QueryOutput::new(page.slice(rows), total)
}

#[async_trait]
impl QueryExecutor for MemoryStore {
    async fn execute(
        &self,
        predicate: &Predicate,
        page: &PageRequest,
        count: CountPolicy,
    ) -> SearchResult<QueryOutput<Member>> {
        self.check_fault()?;
        self.counters.selects.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(%predicate, offset = page.offset, limit = page.limit, "memory execute");

        let (members, teams) = self.tables.read().snapshot();
        let rows = Self::filter_members(&members, &teams, predicate, page.sort.references_team());
        let output = window(rows, page, count);
        Ok(QueryOutput::new(
            output.rows.into_iter().map(|r| r.member).collect(),
            output.total,
        ))
    }

    async fn execute_join(
        &self,
        predicate: &Predicate,
        page: &PageRequest,
        join: &JoinSpec,
        count: CountPolicy,
    ) -> SearchResult<QueryOutput<MemberWithTeam>> {
        self.check_fault()?;
        self.counters.selects.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(%predicate, kind = ?join.kind, on = ?join.on, "memory execute_join");

        let (members, teams) = self.tables.read().snapshot();
        let rows = Self::filter_joined(&members, &teams, predicate, join);
        Ok(window(rows, page, count))
    }

    async fn count(&self, predicate: &Predicate) -> SearchResult<u64> {
        self.check_fault()?;
        self.counters.counts.fetch_add(1, Ordering::Relaxed);

        let (members, teams) = self.tables.read().snapshot();
        Ok(Self::filter_members(&members, &teams, predicate, false).len() as u64)
    }

    async fn count_join(&self, predicate: &Predicate, join: &JoinSpec) -> SearchResult<u64> {
        self.check_fault()?;
        self.counters.counts.fetch_add(1, Ordering::Relaxed);

        let (members, teams) = self.tables.read().snapshot();
        Ok(Self::filter_joined(&members, &teams, predicate, join).len() as u64)
    }

    async fn aggregate(
        &self,
        predicate: &Predicate,
        aggregate: Aggregate,
    ) -> SearchResult<Option<Value>> {
        self.check_fault()?;
        self.counters.aggregates.fetch_add(1, Ordering::Relaxed);

        let (members, teams) = self.tables.read().snapshot();
        let rows = Self::filter_members(&members, &teams, predicate, false);
        let rows = if aggregate.field.requires_team() && !predicate.references_team() {
            let matched: Vec<Member> = rows.into_iter().map(|r| r.member).collect();
            join_rows(&matched, &teams, &JoinSpec::inner())
        } else {
            rows
        };
        Ok(aggregate.compute(rows.iter().map(|r| r.field_value(aggregate.field))))
    }

    async fn project(
        &self,
        predicate: &Predicate,
        page: &PageRequest,
        projections: &[Projection],
    ) -> SearchResult<Vec<Tuple>> {
        self.check_fault()?;
        self.counters.selects.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(%predicate, columns = projections.len(), "memory project");

        let (members, teams) = self.tables.read().snapshot();
        let reads_team =
            page.sort.references_team() || projections.iter().any(Projection::references_team);
        let rows = Self::filter_members(&members, &teams, predicate, reads_team);
        let rows = window(rows, page, CountPolicy::Skip).rows;

        // Subquery columns are uncorrelated: one value for every row
        let subqueries: Vec<(Aggregate, Option<Value>)> = projections
            .iter()
            .filter_map(|p| match p {
                Projection::Subquery(aggregate) => {
                    Some((*aggregate, evaluate(aggregate, &members, &teams)))
                }
                _ => None,
            })
            .collect();
        let subquery = |aggregate: &Aggregate| {
            subqueries
                .iter()
                .find(|(a, _)| a == aggregate)
                .and_then(|(_, value)| value.clone())
        };

        Ok(rows
            .iter()
            .map(|row| {
                projections
                    .iter()
                    .map(|p| p.evaluate(row, subquery))
                    .collect()
            })
            .collect())
    }
}

// ========== Repositories ==========

impl MemoryStore {
    /// Member CRUD over this store
    pub fn member_repository(&self) -> MemoryMemberRepository<'_> {
        MemoryMemberRepository { store: self }
    }

    /// Team CRUD over this store
    pub fn team_repository(&self) -> MemoryTeamRepository<'_> {
        MemoryTeamRepository { store: self }
    }
}

pub struct MemoryMemberRepository<'a> {
    store: &'a MemoryStore,
}

pub struct MemoryTeamRepository<'a> {
    store: &'a MemoryStore,
}

#[async_trait]
impl<'a> Repository<Member, NewMember> for MemoryMemberRepository<'a> {
    async fn save(&self, dto: NewMember) -> SearchResult<Member> {
        self.store.check_fault()?;
        validate_new(&dto)?;
        Ok(self.store.insert_member(dto))
    }

    async fn find_by_id(&self, id: Id) -> SearchResult<Option<Member>> {
        self.store.check_fault()?;
        Ok(self.store.member(id))
    }

    async fn find_all(&self) -> SearchResult<Vec<Member>> {
        self.store.check_fault()?;
        Ok(self.store.members())
    }

    async fn count(&self) -> SearchResult<u64> {
        self.store.check_fault()?;
        Ok(self.store.member_count() as u64)
    }

    async fn delete(&self, id: Id) -> SearchResult<()> {
        self.store.check_fault()?;
        self.store
            .remove_member(id)
            .map(|_| ())
            .ok_or(SearchError::NotFound {
                entity: Member::TYPE_NAME,
                id,
            })
    }
}

#[async_trait]
impl<'a> MemberRepository for MemoryMemberRepository<'a> {
    async fn find_by_username(&self, username: &str) -> SearchResult<Vec<Member>> {
        self.store.check_fault()?;
        Ok(self
            .store
            .members()
            .into_iter()
            .filter(|m| m.username.as_deref() == Some(username))
            .collect())
    }

    async fn update(&self, member: &Member) -> SearchResult<Member> {
        self.store.check_fault()?;
        self.store
            .update_member(member)
            .ok_or(SearchError::NotFound {
                entity: Member::TYPE_NAME,
                id: member.id.unwrap_or_default(),
            })
    }
}

#[async_trait]
impl<'a> Repository<Team, NewTeam> for MemoryTeamRepository<'a> {
    async fn save(&self, dto: NewTeam) -> SearchResult<Team> {
        self.store.check_fault()?;
        validate_new(&dto)?;
        Ok(self.store.insert_team(dto))
    }

    async fn find_by_id(&self, id: Id) -> SearchResult<Option<Team>> {
        self.store.check_fault()?;
        Ok(self.store.team(id))
    }

    async fn find_all(&self) -> SearchResult<Vec<Team>> {
        self.store.check_fault()?;
        Ok(self.store.teams())
    }

    async fn count(&self) -> SearchResult<u64> {
        self.store.check_fault()?;
        Ok(self.store.team_count() as u64)
    }

    async fn delete(&self, id: Id) -> SearchResult<()> {
        self.store.check_fault()?;
        self.store
            .remove_team(id)
            .map(|_| ())
            .ok_or(SearchError::NotFound {
                entity: Team::TYPE_NAME,
                id,
            })
    }
}
