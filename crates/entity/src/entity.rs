//! Entity traits - Identity, declared fields and row hydration
//!
//! [`Entity`] is implemented per entity type and carries the static parts
//! (type name, metadata, row mapping). [`EntityObject`] is its object-safe
//! face, used by the serializer to walk a graph of mixed entity types.

use std::fmt::Debug;
use serde_json::Value;

use crate::containers::{MaterializeMany, MaterializeOne};
use crate::error::{ModelError, ModelResult};
use crate::metadata::{EntityMetadata, FieldShape};

/// Storage shape of an entity: ordered column name -> value
pub type Row = serde_json::Map<String, Value>;

/// Name of the identity field
pub const ID_FIELD: &str = "id";

/// Runtime value of one declared field
pub enum FieldValue<'a> {
    /// A plain value, copied as-is into serialized output
    Scalar(Value),
    /// A single related entity behind a lazy reference
    Single(&'a dyn MaterializeOne),
    /// A collection of related entities behind a lazy collection
    Collection(&'a dyn MaterializeMany),
}

impl FieldValue<'_> {
    pub fn shape(&self) -> FieldShape {
        match self {
            FieldValue::Scalar(_) => FieldShape::Scalar,
            FieldValue::Single(_) => FieldShape::Single,
            FieldValue::Collection(_) => FieldShape::Collection,
        }
    }
}

impl Debug for FieldValue<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Scalar(value) => f.debug_tuple("Scalar").field(value).finish(),
            FieldValue::Single(_) => f.write_str("Single(..)"),
            FieldValue::Collection(_) => f.write_str("Collection(..)"),
        }
    }
}

/// Trait for persistence-backed entity types
pub trait Entity: Debug + Default + 'static {
    /// Short type name; relation targets refer to entities by this name
    fn entity_type() -> &'static str;

    /// Declared field metadata for this type
    fn metadata() -> EntityMetadata;

    /// Identity, `None` until the entity has been persisted
    fn id(&self) -> Option<i64>;

    /// Assign the identity handed out by the persistence manager
    fn set_id(&mut self, id: i64);

    /// Runtime value of a declared field
    fn field(&self, name: &str) -> Option<FieldValue<'_>>;

    /// Assign a field from a plain value
    fn set_field(&mut self, name: &str, value: Value) -> ModelResult<()>;

    /// Hydrate an entity from a stored row
    fn from_row(row: &Row) -> ModelResult<Self>;

    /// Dehydrate into a row (without the identity column)
    fn to_row(&self) -> Row;
}

/// Object-safe view of an entity, used while walking a graph
pub trait EntityObject: Debug {
    fn type_name(&self) -> &'static str;

    fn identity(&self) -> Option<i64>;

    fn field_value(&self, name: &str) -> Option<FieldValue<'_>>;
}

impl<T: Entity> EntityObject for T {
    fn type_name(&self) -> &'static str {
        T::entity_type()
    }

    fn identity(&self) -> Option<i64> {
        self.id()
    }

    fn field_value(&self, name: &str) -> Option<FieldValue<'_>> {
        self.field(name)
    }
}

/// Read an optional integer column
pub fn row_i64(row: &Row, column: &str) -> ModelResult<Option<i64>> {
    match row.get(column) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value.as_i64().map(Some).ok_or_else(|| {
            ModelError::Serialization(format!(
                "Column '{}' holds {} where an integer was expected",
                column, value
            ))
        }),
    }
}

/// Read an optional list of integer ids
pub fn row_ids(row: &Row, column: &str) -> ModelResult<Vec<i64>> {
    match row.get(column) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_i64().ok_or_else(|| {
                    ModelError::Serialization(format!(
                        "Column '{}' contains non-integer id {}",
                        column, item
                    ))
                })
            })
            .collect(),
        Some(other) => Err(ModelError::Serialization(format!(
            "Column '{}' holds {} where a list of ids was expected",
            column, other
        ))),
    }
}

/// Read a column as a value, `Null` when absent
pub fn row_value(row: &Row, column: &str) -> Value {
    row.get(column).cloned().unwrap_or(Value::Null)
}
