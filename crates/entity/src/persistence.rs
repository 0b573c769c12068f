//! Persistence manager interface
//!
//! The entity layer never talks to a database directly. Every lookup and
//! write goes through a [`PersistenceManager`] handle passed in by the
//! caller, which owns identity allocation, caching and transactions.

use serde_json::Value;

use crate::entity::Row;
use crate::error::PersistenceError;
use crate::query::{Criteria, OrderBy, PairsQuery};

/// Result type alias for persistence manager calls
pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Operations the entity layer needs from the underlying persistence framework
pub trait PersistenceManager {
    /// Fetch one row by identity
    fn find(&self, entity_type: &str, id: i64) -> PersistenceResult<Option<Row>>;

    /// Fetch every row matching `criteria`, sorted by `order_by`
    fn find_by(
        &self,
        entity_type: &str,
        criteria: &Criteria,
        order_by: &OrderBy,
    ) -> PersistenceResult<Vec<Row>>;

    /// Fetch the first row matching `criteria`
    fn find_one_by(&self, entity_type: &str, criteria: &Criteria) -> PersistenceResult<Option<Row>> {
        Ok(self
            .find_by(entity_type, criteria, &OrderBy::default())?
            .into_iter()
            .next())
    }

    /// Schedule a row for insert (`id == None`) or update, returning its identity
    fn persist(&self, entity_type: &str, id: Option<i64>, row: Row) -> PersistenceResult<i64>;

    /// Schedule a row for removal
    fn remove(&self, entity_type: &str, id: i64) -> PersistenceResult<()>;

    /// Write every scheduled change
    fn flush(&self) -> PersistenceResult<()>;

    /// Execute a key/value projection, rows in query order
    fn select_pairs(&self, query: &PairsQuery) -> PersistenceResult<Vec<(Value, Value)>>;
}
