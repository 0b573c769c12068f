//! Field Metadata - Static per-type relationship declarations
//!
//! Every entity type declares its fields once, together with the relationship
//! kind, the related entity type and the eager-serialize marker. The shape of
//! each field (scalar, single relation, collection) is fixed here so the
//! serializer never has to probe values at runtime.

use std::collections::HashSet;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Defines the kind of relationship a field declares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationKind {
    /// Plain column, no relationship
    None,
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
}

impl RelationKind {
    /// Returns true for every kind except `None`
    pub fn is_relation(self) -> bool {
        !matches!(self, Self::None)
    }

    /// The runtime shape a field of this kind must hold
    pub fn shape(self) -> FieldShape {
        match self {
            Self::None => FieldShape::Scalar,
            Self::OneToOne | Self::ManyToOne => FieldShape::Single,
            Self::OneToMany | Self::ManyToMany => FieldShape::Collection,
        }
    }
}

/// Runtime shape of a declared field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldShape {
    Scalar,
    Single,
    Collection,
}

/// Metadata for one declared field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMetadata {
    /// Field name as exposed by the entity
    pub name: String,

    /// Declared relationship kind
    pub kind: RelationKind,

    /// Related entity type name (relations only)
    pub target: Option<String>,

    /// Whether the field is recursively expanded during serialization
    pub eager_serialize: bool,
}

impl FieldMetadata {
    /// Create metadata for a plain scalar field
    pub fn scalar(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: RelationKind::None,
            target: None,
            eager_serialize: false,
        }
    }

    /// Create metadata for a relation field
    pub fn relation(name: impl Into<String>, kind: RelationKind, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            target: Some(target.into()),
            eager_serialize: false,
        }
    }

    pub fn shape(&self) -> FieldShape {
        self.kind.shape()
    }

    /// True if this field is a relation whose declared target is `type_name`
    pub fn points_to(&self, type_name: &str) -> bool {
        self.kind.is_relation() && self.target.as_deref() == Some(type_name)
    }

    fn validate(&self, entity_type: &str) -> ModelResult<()> {
        if self.name.is_empty() {
            return Err(ModelError::Metadata(format!(
                "Entity '{}' declares a field with an empty name",
                entity_type
            )));
        }

        match (self.kind.is_relation(), self.target.as_deref()) {
            (true, None) | (true, Some("")) => Err(ModelError::Metadata(format!(
                "Relation field '{}.{}' of kind {:?} must name a target entity",
                entity_type, self.name, self.kind
            ))),
            (false, Some(target)) => Err(ModelError::Metadata(format!(
                "Scalar field '{}.{}' cannot target entity '{}'",
                entity_type, self.name, target
            ))),
            _ => Ok(()),
        }
    }
}

/// Declared field metadata of one entity type, in declaration order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMetadata {
    /// Short type name, compared against relation targets
    pub entity_type: String,

    /// Declared fields, in declaration order
    pub fields: Vec<FieldMetadata>,
}

impl EntityMetadata {
    /// Start declaring metadata for an entity type
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            fields: Vec::new(),
        }
    }

    /// Declare a scalar field
    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.fields.push(FieldMetadata::scalar(name));
        self
    }

    /// Declare a relation field of the given kind
    pub fn relation(mut self, name: impl Into<String>, kind: RelationKind, target: impl Into<String>) -> Self {
        self.fields.push(FieldMetadata::relation(name, kind, target));
        self
    }

    pub fn one_to_one(self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.relation(name, RelationKind::OneToOne, target)
    }

    pub fn one_to_many(self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.relation(name, RelationKind::OneToMany, target)
    }

    pub fn many_to_one(self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.relation(name, RelationKind::ManyToOne, target)
    }

    pub fn many_to_many(self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.relation(name, RelationKind::ManyToMany, target)
    }

    /// Put the eager-serialize marker on the most recently declared field
    pub fn eager(mut self) -> Self {
        if let Some(last) = self.fields.last_mut() {
            last.eager_serialize = true;
        }
        self
    }

    /// Look up a declared field by name
    pub fn get(&self, name: &str) -> Option<&FieldMetadata> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Relation fields only, in declaration order
    pub fn relations(&self) -> impl Iterator<Item = &FieldMetadata> {
        self.fields.iter().filter(|field| field.kind.is_relation())
    }

    /// Validate the declarations for consistency
    pub fn validate(&self) -> ModelResult<()> {
        if self.entity_type.is_empty() {
            return Err(ModelError::Metadata(
                "Entity metadata must name its entity type".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            field.validate(&self.entity_type)?;
            if !seen.insert(field.name.as_str()) {
                return Err(ModelError::Metadata(format!(
                    "Entity '{}' declares field '{}' more than once",
                    self.entity_type, field.name
                )));
            }
        }

        Ok(())
    }
}
