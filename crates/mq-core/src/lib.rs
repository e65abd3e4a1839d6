//! # mq-core
//!
//! Core types, traits, and utilities for Member Query.
//!
//! This crate provides the foundational building blocks used across all other crates:
//! - The search error taxonomy (`SearchError`) and field-level validation errors
//! - Result type aliases
//! - Core traits (`Identifiable`, `Entity`)
//! - Configuration types

pub mod error;
pub mod result;
pub mod traits;
pub mod config;

pub use error::*;
pub use result::*;
pub use traits::*;
pub use config::{AppConfig, ConfigError, CountStrategy, DatabaseConfig, SearchConfig};
