//! Members repository
//!
//! Table: member(member_id, username, age, team_id)

use async_trait::async_trait;
use mq_core::{Entity, Id, SearchError, SearchResult};
use mq_models::{Member, NewMember};
use sqlx::PgPool;

use crate::error::db_error;
use crate::query_executor::MemberRow;
use crate::repository::{validate_new, MemberRepository, Repository};

/// Member repository
pub struct PgMemberRepository {
    pool: PgPool,
}

impl PgMemberRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Members of one team, in id order
    pub async fn find_by_team(&self, team_id: Id) -> SearchResult<Vec<Member>> {
        let rows = sqlx::query_as::<_, MemberRow>(
            r#"
            SELECT member_id, username, age, team_id
            FROM member
            WHERE team_id = $1
            ORDER BY member_id
            "#,
        )
        .bind(team_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows.into_iter().map(Member::from).collect())
    }
}

#[async_trait]
impl Repository<Member, NewMember> for PgMemberRepository {
    async fn save(&self, dto: NewMember) -> SearchResult<Member> {
        validate_new(&dto)?;

        let row = sqlx::query_as::<_, MemberRow>(
            r#"
            INSERT INTO member (username, age, team_id)
            VALUES ($1, $2, $3)
            RETURNING member_id, username, age, team_id
            "#,
        )
        .bind(&dto.username)
        .bind(dto.age)
        .bind(dto.team_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;

        tracing::debug!(member_id = row.member_id, "member saved");
        Ok(row.into())
    }

    async fn find_by_id(&self, id: Id) -> SearchResult<Option<Member>> {
        let row = sqlx::query_as::<_, MemberRow>(
            "SELECT member_id, username, age, team_id FROM member WHERE member_id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(Member::from))
    }

    async fn find_all(&self) -> SearchResult<Vec<Member>> {
        let rows = sqlx::query_as::<_, MemberRow>(
            "SELECT member_id, username, age, team_id FROM member ORDER BY member_id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows.into_iter().map(Member::from).collect())
    }

    async fn count(&self) -> SearchResult<u64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM member")
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(count.max(0) as u64)
    }

    async fn delete(&self, id: Id) -> SearchResult<()> {
        let result = sqlx::query("DELETE FROM member WHERE member_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(SearchError::NotFound {
                entity: Member::TYPE_NAME,
                id,
            });
        }
        Ok(())
    }

    async fn exists(&self, id: Id) -> SearchResult<bool> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM member WHERE member_id = $1")
                .bind(id)
                .fetch_one(&self.pool)
                .await
                .map_err(db_error)?;

        Ok(count > 0)
    }
}

#[async_trait]
impl MemberRepository for PgMemberRepository {
    async fn find_by_username(&self, username: &str) -> SearchResult<Vec<Member>> {
        let rows = sqlx::query_as::<_, MemberRow>(
            r#"
            SELECT member_id, username, age, team_id
            FROM member
            WHERE username = $1
            ORDER BY member_id
            "#,
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows.into_iter().map(Member::from).collect())
    }

    async fn update(&self, member: &Member) -> SearchResult<Member> {
        let id = member.id.ok_or(SearchError::NotFound {
            entity: Member::TYPE_NAME,
            id: 0,
        })?;

        let row = sqlx::query_as::<_, MemberRow>(
            r#"
            UPDATE member
            SET username = $2, age = $3, team_id = $4
            WHERE member_id = $1
            RETURNING member_id, username, age, team_id
            "#,
        )
        .bind(id)
        .bind(&member.username)
        .bind(member.age)
        .bind(member.team_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.map(Member::from).ok_or(SearchError::NotFound {
            entity: Member::TYPE_NAME,
            id,
        })
    }
}
