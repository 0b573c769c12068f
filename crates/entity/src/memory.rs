//! In-memory persistence manager
//!
//! A complete [`PersistenceManager`] backed by process memory: committed
//! tables per entity type plus a pending unit of work that `flush` applies.
//! Used as the substitute manager in tests and for prototyping.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Mutex, MutexGuard};
use dashmap::DashMap;
use serde_json::Value;

use crate::entity::{Row, ID_FIELD};
use crate::error::PersistenceError;
use crate::persistence::{PersistenceManager, PersistenceResult};
use crate::query::{Criteria, OrderBy, OrderDirection, PairsQuery};

#[derive(Debug, Clone)]
enum PendingOp {
    Write { entity_type: String, id: i64, row: Row },
    Remove { entity_type: String, id: i64 },
}

/// Thread-safe in-memory persistence manager
#[derive(Debug, Default)]
pub struct InMemoryManager {
    tables: DashMap<String, BTreeMap<i64, Row>>,
    sequences: DashMap<String, i64>,
    pending: Mutex<Vec<PendingOp>>,
    flush_count: AtomicU64,
}

impl InMemoryManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a committed row directly, bypassing the unit of work
    pub fn insert_row(&self, entity_type: &str, id: i64, mut row: Row) {
        row.insert(ID_FIELD.to_string(), Value::from(id));
        self.tables
            .entry(entity_type.to_string())
            .or_default()
            .insert(id, row);
        let mut sequence = self.sequences.entry(entity_type.to_string()).or_insert(0);
        *sequence = (*sequence).max(id);
    }

    /// Number of committed rows for an entity type
    pub fn len(&self, entity_type: &str) -> usize {
        self.tables
            .get(entity_type)
            .map(|table| table.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self, entity_type: &str) -> bool {
        self.len(entity_type) == 0
    }

    /// How many times `flush` has run
    pub fn flush_count(&self) -> u64 {
        self.flush_count.load(AtomicOrdering::Relaxed)
    }

    /// Number of changes waiting for the next flush
    pub fn pending_len(&self) -> usize {
        self.pending().map(|pending| pending.len()).unwrap_or(0)
    }

    fn pending(&self) -> PersistenceResult<MutexGuard<'_, Vec<PendingOp>>> {
        self.pending
            .lock()
            .map_err(|e| PersistenceError::Backend(format!("Unit of work lock poisoned: {}", e)))
    }

    fn next_id(&self, entity_type: &str) -> i64 {
        let mut sequence = self.sequences.entry(entity_type.to_string()).or_insert(0);
        *sequence += 1;
        *sequence
    }

    fn rows(&self, entity_type: &str) -> Vec<Row> {
        self.tables
            .get(entity_type)
            .map(|table| table.values().cloned().collect())
            .unwrap_or_default()
    }

    fn select(&self, entity_type: &str, criteria: &Criteria, order_by: &OrderBy) -> Vec<Row> {
        let mut rows: Vec<Row> = self
            .rows(entity_type)
            .into_iter()
            .filter(|row| criteria.matches(row))
            .collect();
        if !order_by.is_empty() {
            rows.sort_by(|a, b| compare_rows(a, b, order_by));
        }
        rows
    }
}

impl PersistenceManager for InMemoryManager {
    fn find(&self, entity_type: &str, id: i64) -> PersistenceResult<Option<Row>> {
        Ok(self
            .tables
            .get(entity_type)
            .and_then(|table| table.get(&id).cloned()))
    }

    fn find_by(
        &self,
        entity_type: &str,
        criteria: &Criteria,
        order_by: &OrderBy,
    ) -> PersistenceResult<Vec<Row>> {
        Ok(self.select(entity_type, criteria, order_by))
    }

    fn persist(&self, entity_type: &str, id: Option<i64>, mut row: Row) -> PersistenceResult<i64> {
        let id = id.unwrap_or_else(|| self.next_id(entity_type));
        row.insert(ID_FIELD.to_string(), Value::from(id));
        tracing::debug!("Scheduling write of {} #{}", entity_type, id);
        self.pending()?.push(PendingOp::Write {
            entity_type: entity_type.to_string(),
            id,
            row,
        });
        Ok(id)
    }

    fn remove(&self, entity_type: &str, id: i64) -> PersistenceResult<()> {
        tracing::debug!("Scheduling removal of {} #{}", entity_type, id);
        self.pending()?.push(PendingOp::Remove {
            entity_type: entity_type.to_string(),
            id,
        });
        Ok(())
    }

    fn flush(&self) -> PersistenceResult<()> {
        let ops: Vec<PendingOp> = self.pending()?.drain(..).collect();
        tracing::debug!("Flushing {} pending change(s)", ops.len());

        for op in ops {
            match op {
                PendingOp::Write { entity_type, id, row } => {
                    self.tables.entry(entity_type).or_default().insert(id, row);
                }
                PendingOp::Remove { entity_type, id } => {
                    if let Some(mut table) = self.tables.get_mut(&entity_type) {
                        table.remove(&id);
                    }
                }
            }
        }

        self.flush_count.fetch_add(1, AtomicOrdering::Relaxed);
        Ok(())
    }

    fn select_pairs(&self, query: &PairsQuery) -> PersistenceResult<Vec<(Value, Value)>> {
        self.select(&query.entity_type, &query.criteria, &query.order_by)
            .into_iter()
            .map(|row| {
                let column = |field: &str| {
                    row.get(field).cloned().ok_or_else(|| PersistenceError::UnknownField {
                        entity_type: query.entity_type.clone(),
                        field: field.to_string(),
                    })
                };
                Ok((column(&query.key_field)?, column(&query.value_field)?))
            })
            .collect()
    }
}

fn compare_rows(a: &Row, b: &Row, order_by: &OrderBy) -> Ordering {
    for (field, direction) in order_by.columns() {
        let ordering = compare_values(
            a.get(field).unwrap_or(&Value::Null),
            b.get(field).unwrap_or(&Value::Null),
        );
        let ordering = match direction {
            OrderDirection::Asc => ordering,
            OrderDirection::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn value_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over values: null < bool < number < string, then by content
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => value_rank(a).cmp(&value_rank(b)),
    }
}
