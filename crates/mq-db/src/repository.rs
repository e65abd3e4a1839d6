//! Repository traits
//!
//! Provides generic CRUD operations for members and teams, independent of
//! the store behind them.

use async_trait::async_trait;
use mq_core::{Entity, Id, SearchError, SearchResult, ValidationErrors};
use mq_models::{Member, NewMember};
use validator::Validate;

/// Base repository trait for CRUD operations
#[async_trait]
pub trait Repository<T: Entity, NewT: Send + 'static>: Send + Sync {
    /// Insert a new entity and return it with its assigned id
    async fn save(&self, dto: NewT) -> SearchResult<T>;

    /// Find an entity by ID
    async fn find_by_id(&self, id: Id) -> SearchResult<Option<T>>;

    /// All entities in id order
    async fn find_all(&self) -> SearchResult<Vec<T>>;

    /// Count all entities
    async fn count(&self) -> SearchResult<u64>;

    /// Delete an entity by ID
    async fn delete(&self, id: Id) -> SearchResult<()>;

    /// Check if an entity exists
    async fn exists(&self, id: Id) -> SearchResult<bool> {
        Ok(self.find_by_id(id).await?.is_some())
    }

    /// Find an entity that must exist
    async fn get(&self, id: Id) -> SearchResult<T> {
        self.find_by_id(id).await?.ok_or(SearchError::NotFound {
            entity: T::TYPE_NAME,
            id,
        })
    }
}

/// Member-specific lookups
#[async_trait]
pub trait MemberRepository: Repository<Member, NewMember> {
    async fn find_by_username(&self, username: &str) -> SearchResult<Vec<Member>>;

    /// Persist changes to an existing member
    async fn update(&self, member: &Member) -> SearchResult<Member>;
}

/// Run the derive-based validation of a creation DTO
pub fn validate_new<T: Validate>(dto: &T) -> SearchResult<()> {
    dto.validate()
        .map_err(|failures| SearchError::from(ValidationErrors::from(failures)))
}
