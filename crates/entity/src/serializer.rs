//! Object-graph serializer with cycle protection
//!
//! Converts an entity and, transitively, its eager-serialize relations into an
//! ordered mapping. Cycles are broken by declared relationship symmetry: when
//! `B` is reached from an `A`, every field of `B` whose declared target is
//! `A`'s type is left out of `B`'s own serialization.
//!
//! Symmetry only catches the first hop back to the same *type*. A longer loop
//! through a third type (`A -> B -> C -> A`) is not caught by it; such graphs
//! run into `max_depth`, or terminate under [`CycleProtection::VisitedPath`].

use std::collections::{BTreeMap, BTreeSet};
use serde::ser::{Serialize, SerializeMap, Serializer as SerdeSerializer};
use serde_json::Value;

use crate::config::{CycleProtection, SerializerConfig};
use crate::entity::{Entity, EntityObject, FieldValue};
use crate::error::{ModelError, ModelResult};
use crate::metadata::EntityMetadata;
use crate::persistence::PersistenceManager;
use crate::registry::MetadataRegistry;

/// Field names skipped while serializing one entity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet {
    fields: BTreeSet<String>,
}

impl ExclusionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn insert(&mut self, field: impl Into<String>) {
        self.fields.insert(field.into());
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains(field)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(String::as_str)
    }
}

/// One value of a serialized entity
#[derive(Debug, Clone, PartialEq)]
pub enum SerializedValue {
    /// Plain value copied from the entity
    Scalar(Value),
    /// A single related entity
    Nested(SerializedEntity),
    /// A related collection keyed by each item's identity
    Keyed(BTreeMap<i64, SerializedEntity>),
}

impl SerializedValue {
    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            SerializedValue::Scalar(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_nested(&self) -> Option<&SerializedEntity> {
        match self {
            SerializedValue::Nested(entity) => Some(entity),
            _ => None,
        }
    }

    pub fn as_keyed(&self) -> Option<&BTreeMap<i64, SerializedEntity>> {
        match self {
            SerializedValue::Keyed(items) => Some(items),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            SerializedValue::Scalar(value) => value.clone(),
            SerializedValue::Nested(entity) => entity.to_json(),
            SerializedValue::Keyed(items) => Value::Object(
                items
                    .iter()
                    .map(|(id, item)| (id.to_string(), item.to_json()))
                    .collect(),
            ),
        }
    }
}

impl Serialize for SerializedValue {
    fn serialize<S: SerdeSerializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SerializedValue::Scalar(value) => value.serialize(serializer),
            SerializedValue::Nested(entity) => entity.serialize(serializer),
            SerializedValue::Keyed(items) => {
                let mut map = serializer.serialize_map(Some(items.len()))?;
                for (id, item) in items {
                    map.serialize_entry(id, item)?;
                }
                map.end()
            }
        }
    }
}

/// Ordered field name -> value mapping produced by the serializer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SerializedEntity {
    fields: Vec<(String, SerializedValue)>,
}

impl SerializedEntity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field, replacing an existing value in place
    pub fn insert(&mut self, name: impl Into<String>, value: SerializedValue) {
        let name = name.into();
        match self.fields.iter_mut().find(|(field, _)| *field == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&SerializedValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(field, _)| field.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SerializedValue)> {
        self.fields.iter().map(|(field, value)| (field.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Render as a JSON object; keyed collections use the id's decimal string
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(field, value)| (field.clone(), value.to_json()))
                .collect(),
        )
    }
}

impl Serialize for SerializedEntity {
    fn serialize<S: SerdeSerializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (field, value) in &self.fields {
            map.serialize_entry(field, value)?;
        }
        map.end()
    }
}

type Path = Vec<(&'static str, Option<i64>)>;

/// Serializer over an entity graph.
///
/// Borrows the metadata registry and the persistence manager used to
/// materialize lazy relations; holds no state between calls.
pub struct Serializer<'a> {
    registry: &'a MetadataRegistry,
    manager: &'a dyn PersistenceManager,
    config: SerializerConfig,
}

impl<'a> Serializer<'a> {
    pub fn new(registry: &'a MetadataRegistry, manager: &'a dyn PersistenceManager) -> Self {
        Self {
            registry,
            manager,
            config: SerializerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SerializerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &SerializerConfig {
        &self.config
    }

    /// Serialize `entity`, skipping the fields in `excluded`
    pub fn serialize(
        &self,
        entity: &dyn EntityObject,
        excluded: &ExclusionSet,
    ) -> ModelResult<SerializedEntity> {
        let mut path = Path::new();
        self.serialize_at(entity, excluded, &mut path)
    }

    /// Fields of `item` that point back at `caller_type`
    pub fn exclusion_set(
        &self,
        caller_type: &str,
        item: &dyn EntityObject,
    ) -> ModelResult<ExclusionSet> {
        let metadata = self.registry.metadata(item.type_name())?;
        let excluded = ExclusionSet::from_fields(
            metadata
                .relations()
                .filter(|field| field.points_to(caller_type))
                .map(|field| field.name.as_str()),
        );
        tracing::trace!(
            "Excluding {:?} from {} reached from {}",
            excluded,
            item.type_name(),
            caller_type
        );
        Ok(excluded)
    }

    fn serialize_at(
        &self,
        entity: &dyn EntityObject,
        excluded: &ExclusionSet,
        path: &mut Path,
    ) -> ModelResult<SerializedEntity> {
        if path.len() > self.config.max_depth {
            tracing::warn!(
                "Serialization of {} exceeded max depth {}",
                entity.type_name(),
                self.config.max_depth
            );
            return Err(ModelError::Serialization(format!(
                "Maximum serialization depth {} exceeded at {} (possible relationship cycle)",
                self.config.max_depth,
                entity.type_name()
            )));
        }

        let metadata = self.registry.metadata(entity.type_name())?;
        path.push((entity.type_name(), entity.identity()));
        let result = self.serialize_fields(entity, &metadata, excluded, path);
        path.pop();
        result
    }

    fn serialize_fields(
        &self,
        entity: &dyn EntityObject,
        metadata: &EntityMetadata,
        excluded: &ExclusionSet,
        path: &mut Path,
    ) -> ModelResult<SerializedEntity> {
        let mut output = SerializedEntity::new();

        for field in &metadata.fields {
            if excluded.contains(&field.name) {
                continue;
            }

            let value = entity.field_value(&field.name).ok_or_else(|| {
                ModelError::Metadata(format!(
                    "{} declares field '{}' but does not expose it",
                    metadata.entity_type, field.name
                ))
            })?;

            if value.shape() != field.shape() {
                return Err(ModelError::Metadata(format!(
                    "{}.{} is declared {:?} but holds a {:?} value",
                    metadata.entity_type,
                    field.name,
                    field.shape(),
                    value.shape()
                )));
            }

            match value {
                FieldValue::Scalar(raw) => {
                    output.insert(field.name.as_str(), SerializedValue::Scalar(raw));
                }
                _ if !field.eager_serialize => {}
                FieldValue::Single(reference) => {
                    let Some(related) = reference.materialize_one(self.manager)? else {
                        output.insert(field.name.as_str(), SerializedValue::Scalar(Value::Null));
                        continue;
                    };
                    if self.is_on_path(related, path) {
                        tracing::trace!("Skipping {}.{}: already on path", metadata.entity_type, field.name);
                        continue;
                    }
                    let exclusion = self.exclusion_set(entity.type_name(), related)?;
                    let nested = self.serialize_at(related, &exclusion, path)?;
                    output.insert(field.name.as_str(), SerializedValue::Nested(nested));
                }
                FieldValue::Collection(collection) => {
                    let mut items = BTreeMap::new();
                    for item in collection.materialize_many(self.manager)? {
                        let id = item.identity().ok_or(ModelError::MissingPrimaryKey)?;
                        if self.is_on_path(item, path) {
                            continue;
                        }
                        let exclusion = self.exclusion_set(entity.type_name(), item)?;
                        items.insert(id, self.serialize_at(item, &exclusion, path)?);
                    }
                    output.insert(field.name.as_str(), SerializedValue::Keyed(items));
                }
            }
        }

        Ok(output)
    }

    fn is_on_path(&self, entity: &dyn EntityObject, path: &Path) -> bool {
        if self.config.cycle_protection != CycleProtection::VisitedPath {
            return false;
        }
        match entity.identity() {
            Some(id) => path.contains(&(entity.type_name(), Some(id))),
            None => false,
        }
    }
}

/// `to_array` on every entity type
pub trait ToArray: Entity {
    /// Serialize this entity with nothing excluded
    fn to_array(&self, serializer: &Serializer<'_>) -> ModelResult<SerializedEntity> {
        serializer.serialize(self, &ExclusionSet::new())
    }

    /// Serialize this entity without the given fields
    fn to_array_excluding(
        &self,
        serializer: &Serializer<'_>,
        exclude: &[&str],
    ) -> ModelResult<SerializedEntity> {
        serializer.serialize(self, &ExclusionSet::from_fields(exclude.iter().copied()))
    }
}

impl<T: Entity> ToArray for T {}
