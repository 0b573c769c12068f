//! # smart-entity: ActiveRecord-style entities
//!
//! Static finders (`find`, `find_one`, `first_or_new`, `update_or_create`,
//! `destroy`, `find_pairs`, ...) on every entity type, plus `to_array()`, an
//! object-graph serializer that expands eager-serialize relations and breaks
//! cycles using declared relationship metadata.
//!
//! The persistence framework itself stays outside: every operation takes a
//! [`PersistenceManager`] handle, and [`InMemoryManager`] is a complete
//! substitute for tests.

pub mod config;
pub mod containers;
pub mod entity;
pub mod error;
pub mod finder;
pub mod memory;
pub mod metadata;
pub mod persistence;
pub mod query;
pub mod registry;
pub mod serializer;

#[cfg(test)]
mod test_fixtures;

// Re-export core traits and types
pub use config::*;
pub use containers::*;
pub use entity::*;
pub use error::*;
pub use finder::*;
pub use memory::*;
pub use metadata::*;
pub use persistence::*;
pub use query::*;
pub use registry::*;
pub use serializer::*;
