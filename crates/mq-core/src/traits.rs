//! Core traits shared by entities and engines

/// Primary key type
pub type Id = i64;

/// Trait for entities that have a primary key
pub trait Identifiable {
    fn id(&self) -> Option<Id>;
    fn is_persisted(&self) -> bool {
        self.id().is_some()
    }
    fn is_new_record(&self) -> bool {
        !self.is_persisted()
    }
}

/// Base trait for all domain entities
pub trait Entity: Identifiable + Clone + Send + Sync {
    /// The database table name
    const TABLE_NAME: &'static str;

    /// Human-readable type name for error messages
    const TYPE_NAME: &'static str;

    /// Return a copy of the entity carrying the given primary key
    fn with_id(self, id: Id) -> Self;
}
