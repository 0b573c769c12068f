//! Metadata Registry - Read-only lookup of declared relationship metadata
//!
//! Populated once at startup, one entry per entity type, then shared by the
//! serializer. Lookups are deterministic and side-effect free.

use std::sync::Arc;
use dashmap::DashMap;
use serde::Serialize;

use crate::entity::Entity;
use crate::error::{ModelError, ModelResult};
use crate::metadata::{EntityMetadata, RelationKind};

/// One relation field as reported by [`MetadataRegistry::relations_of`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationDescriptor {
    pub field: String,
    pub kind: RelationKind,
    pub target: String,
}

/// Registry statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub entity_types: usize,
    pub relation_fields: usize,
    pub eager_fields: usize,
}

/// Thread-safe registry of entity metadata keyed by entity type name
#[derive(Debug, Clone, Default)]
pub struct MetadataRegistry {
    entities: Arc<DashMap<String, Arc<EntityMetadata>>>,
}

impl MetadataRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the metadata an entity type declares about itself
    pub fn register_entity<T: Entity>(&self) -> ModelResult<()> {
        self.register(T::metadata())
    }

    /// Register metadata for an entity type.
    ///
    /// Registering identical metadata twice is a no-op; registering different
    /// metadata under a name that is already taken is rejected.
    pub fn register(&self, metadata: EntityMetadata) -> ModelResult<()> {
        metadata.validate()?;

        if let Some(existing) = self.entities.get(&metadata.entity_type) {
            if **existing == metadata {
                return Ok(());
            }
            return Err(ModelError::Configuration(format!(
                "Entity type '{}' is already registered with different metadata",
                metadata.entity_type
            )));
        }

        tracing::debug!(
            "Registering entity metadata for '{}' ({} fields)",
            metadata.entity_type,
            metadata.fields.len()
        );
        self.entities
            .insert(metadata.entity_type.clone(), Arc::new(metadata));
        Ok(())
    }

    /// Full metadata for an entity type
    pub fn metadata(&self, entity_type: &str) -> ModelResult<Arc<EntityMetadata>> {
        self.entities
            .get(entity_type)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| {
                ModelError::Metadata(format!(
                    "No metadata registered for entity type '{}'",
                    entity_type
                ))
            })
    }

    /// Relation fields of an entity type in declaration order
    pub fn relations_of(&self, entity_type: &str) -> ModelResult<Vec<RelationDescriptor>> {
        let metadata = self.metadata(entity_type)?;
        Ok(metadata
            .relations()
            .map(|field| RelationDescriptor {
                field: field.name.clone(),
                kind: field.kind,
                target: field.target.clone().unwrap_or_default(),
            })
            .collect())
    }

    /// Whether `field` of `entity_type` carries the eager-serialize marker.
    ///
    /// Inspection API for callers; the serializer reads the same flag from the
    /// [`EntityMetadata`] it already holds for the entity being walked.
    pub fn is_eager_serialize(&self, entity_type: &str, field: &str) -> ModelResult<bool> {
        let metadata = self.metadata(entity_type)?;
        Ok(metadata
            .get(field)
            .map(|field| field.eager_serialize)
            .unwrap_or(false))
    }

    pub fn contains(&self, entity_type: &str) -> bool {
        self.entities.contains_key(entity_type)
    }

    /// Get statistics about the registry
    pub fn stats(&self) -> RegistryStats {
        self.entities
            .iter()
            .fold(RegistryStats::default(), |mut stats, entry| {
                stats.entity_types += 1;
                stats.relation_fields += entry.value().relations().count();
                stats.eager_fields += entry
                    .value()
                    .fields
                    .iter()
                    .filter(|field| field.eager_serialize)
                    .count();
                stats
            })
    }
}
