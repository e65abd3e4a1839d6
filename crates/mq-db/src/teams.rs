//! Teams repository
//!
//! Table: team(team_id, name)

use async_trait::async_trait;
use mq_core::{Entity, Id, SearchError, SearchResult};
use mq_models::{NewTeam, Team};
use sqlx::{FromRow, PgPool};

use crate::error::db_error;
use crate::repository::{validate_new, Repository};

/// Team row from database
#[derive(Debug, Clone, FromRow)]
pub struct TeamRow {
    pub team_id: i64,
    pub name: String,
}

impl From<TeamRow> for Team {
    fn from(row: TeamRow) -> Self {
        Team {
            id: Some(row.team_id),
            name: row.name,
        }
    }
}

/// Team repository
pub struct PgTeamRepository {
    pool: PgPool,
}

impl PgTeamRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_name(&self, name: &str) -> SearchResult<Option<Team>> {
        let row = sqlx::query_as::<_, TeamRow>(
            "SELECT team_id, name FROM team WHERE name = $1 ORDER BY team_id LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(Team::from))
    }
}

#[async_trait]
impl Repository<Team, NewTeam> for PgTeamRepository {
    async fn save(&self, dto: NewTeam) -> SearchResult<Team> {
        validate_new(&dto)?;

        let row = sqlx::query_as::<_, TeamRow>(
            "INSERT INTO team (name) VALUES ($1) RETURNING team_id, name",
        )
        .bind(&dto.name)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: Id) -> SearchResult<Option<Team>> {
        let row = sqlx::query_as::<_, TeamRow>("SELECT team_id, name FROM team WHERE team_id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(row.map(Team::from))
    }

    async fn find_all(&self) -> SearchResult<Vec<Team>> {
        let rows = sqlx::query_as::<_, TeamRow>("SELECT team_id, name FROM team ORDER BY team_id")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(rows.into_iter().map(Team::from).collect())
    }

    async fn count(&self) -> SearchResult<u64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM team")
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(count.max(0) as u64)
    }

    /// Members of the team are left without a team (`ON DELETE SET NULL`)
    async fn delete(&self, id: Id) -> SearchResult<()> {
        let result = sqlx::query("DELETE FROM team WHERE team_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(SearchError::NotFound {
                entity: Team::TYPE_NAME,
                id,
            });
        }
        Ok(())
    }
}
