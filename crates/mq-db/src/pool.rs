//! Database connection pool management
//!
//! Provides PostgreSQL connection pooling using SQLx.

use std::time::Duration;

use mq_core::{DatabaseConfig, SearchResult};
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::error::db_error;
use crate::members::PgMemberRepository;
use crate::query_executor::PgQueryExecutor;
use crate::teams::PgTeamRepository;

/// Tables used by the PostgreSQL engine
pub const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS team (
        team_id BIGSERIAL PRIMARY KEY,
        name VARCHAR(255) NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS member (
        member_id BIGSERIAL PRIMARY KEY,
        username VARCHAR(255),
        age INTEGER NOT NULL CHECK (age >= 0),
        team_id BIGINT REFERENCES team (team_id) ON DELETE SET NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS member_team_id_idx ON member (team_id)",
];

/// Database connection pool
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool
    pub async fn connect(config: &DatabaseConfig) -> SearchResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .connect(&config.url)
            .await
            .map_err(db_error)?;

        tracing::info!(
            "Database pool created with {} max connections",
            config.max_connections
        );

        Ok(Self { pool })
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the member and team tables if they are missing
    pub async fn ensure_schema(&self) -> SearchResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(db_error)?;
        }
        tracing::debug!("Schema ensured");
        Ok(())
    }

    /// Query engine over this pool; every call is bounded by `timeout`
    pub fn executor(&self, timeout: Duration) -> PgQueryExecutor<'_> {
        PgQueryExecutor::new(&self.pool, timeout)
    }

    pub fn members(&self) -> PgMemberRepository {
        PgMemberRepository::new(self.pool.clone())
    }

    pub fn teams(&self) -> PgTeamRepository {
        PgTeamRepository::new(self.pool.clone())
    }

    /// Check if the database is reachable
    pub async fn ping(&self) -> SearchResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    /// Close the connection pool
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("Database pool closed");
    }

    /// Get pool statistics
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            size: self.pool.size(),
            idle: self.pool.num_idle(),
        }
    }
}

/// Pool statistics
#[derive(Debug, Clone)]
pub struct PoolStats {
    pub size: u32,
    pub idle: usize,
}
