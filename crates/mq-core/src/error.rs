//! Core error types for Member Query
//!
//! Every failure a search can surface is one of the `SearchError` variants.
//! The predicate composer and the pager never produce errors; everything
//! else originates in a query engine and is propagated unchanged.

use std::collections::BTreeMap;
use thiserror::Error;

use crate::traits::Id;

/// Error type for all search and storage operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    /// The search condition failed validation before reaching the engine
    #[error("Invalid search condition: {0}")]
    InvalidCondition(#[from] ValidationErrors),

    /// The engine could not be reached (pool closed, I/O failure, ...)
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// The engine did not answer within the configured timeout
    #[error("Query timed out after {elapsed_ms}ms")]
    QueryTimeout { elapsed_ms: u64 },

    /// Opaque failure reported by the engine
    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Not found: {entity} with id={id}")]
    NotFound { entity: &'static str, id: Id },
}

impl SearchError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable(message.into())
    }

    pub fn engine(message: impl Into<String>) -> Self {
        Self::Engine(message.into())
    }

    /// Stable machine-readable code for the error
    pub fn error_code(&self) -> &'static str {
        match self {
            SearchError::InvalidCondition(_) => "invalid_condition",
            SearchError::StoreUnavailable(_) => "store_unavailable",
            SearchError::QueryTimeout { .. } => "query_timeout",
            SearchError::Engine(_) => "engine_error",
            SearchError::NotFound { .. } => "not_found",
        }
    }

    /// Whether retrying the same call may succeed.
    ///
    /// No retries happen inside this workspace; callers use this to decide
    /// their own backoff policy.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SearchError::StoreUnavailable(_) | SearchError::QueryTimeout { .. }
        )
    }
}

/// Validation errors collection, keyed by field name
#[derive(Error, Debug, Default, Clone, PartialEq, Eq)]
#[error("{}", self.full_messages().join(", "))]
pub struct ValidationErrors {
    /// Field-specific errors: field_name -> messages
    pub errors: BTreeMap<String, Vec<String>>,
    /// Errors not tied to a specific field
    pub base_errors: Vec<String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn add_base(&mut self, message: impl Into<String>) {
        self.base_errors.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.base_errors.is_empty()
    }

    /// Check if there are errors for a specific field
    pub fn has_error(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    /// Get errors for a specific field
    pub fn get(&self, field: &str) -> Option<&Vec<String>> {
        self.errors.get(field)
    }

    pub fn merge(&mut self, other: ValidationErrors) {
        for (field, messages) in other.errors {
            self.errors.entry(field).or_default().extend(messages);
        }
        self.base_errors.extend(other.base_errors);
    }

    pub fn full_messages(&self) -> Vec<String> {
        let mut messages = self.base_errors.clone();
        for (field, field_messages) in &self.errors {
            for msg in field_messages {
                messages.push(format!("{} {}", field, msg));
            }
        }
        messages
    }
}

/// Derive-based validation failures, flattened to one message per error.
/// A missing message falls back to the validator code.
impl From<validator::ValidationErrors> for ValidationErrors {
    fn from(failures: validator::ValidationErrors) -> Self {
        let mut errors = Self::new();
        for (field, field_errors) in failures.field_errors() {
            for error in field_errors {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| error.code.to_string());
                errors.add(field, message);
            }
        }
        errors
    }
}
