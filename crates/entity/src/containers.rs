//! Relation containers - Lazy single references and collections
//!
//! A container remembers how to find its related entities and materializes
//! them through the persistence manager on first use. Materializing an
//! already-loaded container is a no-op.

use once_cell::unsync::OnceCell;

use crate::entity::{Entity, EntityObject};
use crate::error::{ModelError, ModelResult};
use crate::persistence::PersistenceManager;
use crate::query::{Criteria, OrderBy};

/// Capability of a single-relation field: force the load, expose the entity
pub trait MaterializeOne {
    fn materialize_one<'a>(
        &'a self,
        manager: &dyn PersistenceManager,
    ) -> ModelResult<Option<&'a dyn EntityObject>>;
}

/// Capability of a collection field: force the load, expose the items
pub trait MaterializeMany {
    fn materialize_many<'a>(
        &'a self,
        manager: &dyn PersistenceManager,
    ) -> ModelResult<Vec<&'a dyn EntityObject>>;
}

/// Lazy reference to at most one related entity.
///
/// The entity is boxed once loaded, so a type may reference itself and two
/// types may reference each other.
#[derive(Debug, Clone)]
pub struct Reference<T> {
    target_id: Option<i64>,
    loaded: OnceCell<Option<Box<T>>>,
}

impl<T: Entity> Default for Reference<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: Entity> Reference<T> {
    /// A reference that points nowhere
    pub fn empty() -> Self {
        Self {
            target_id: None,
            loaded: OnceCell::new(),
        }
    }

    /// An unloaded reference to the entity with the given id
    pub fn to(id: i64) -> Self {
        Self {
            target_id: Some(id),
            loaded: OnceCell::new(),
        }
    }

    /// Build from a nullable id column
    pub fn from_id(id: Option<i64>) -> Self {
        id.map(Self::to).unwrap_or_else(Self::empty)
    }

    /// A reference that already holds its entity
    pub fn loaded(entity: T) -> Self {
        Self {
            target_id: entity.id(),
            loaded: OnceCell::with_value(Some(Box::new(entity))),
        }
    }

    /// Identity of the referenced entity, if any
    pub fn id(&self) -> Option<i64> {
        self.get().and_then(Entity::id).or(self.target_id)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.get().is_some()
    }

    /// The referenced entity if it has been materialized
    pub fn get(&self) -> Option<&T> {
        self.loaded.get().and_then(Option::as_deref)
    }

    /// Materialize the reference and return the entity
    pub fn load(&self, manager: &dyn PersistenceManager) -> ModelResult<Option<&T>> {
        let loaded = self.loaded.get_or_try_init(|| match self.target_id {
            None => Ok(None),
            Some(id) => {
                tracing::trace!("Materializing {} #{}", T::entity_type(), id);
                let row = manager.find(T::entity_type(), id)?.ok_or_else(|| {
                    ModelError::EntityNotFound(format!(
                        "{} #{} referenced but not found",
                        T::entity_type(),
                        id
                    ))
                })?;
                T::from_row(&row).map(|entity| Some(Box::new(entity)))
            }
        })?;
        Ok(loaded.as_deref())
    }
}

impl<T: Entity> MaterializeOne for Reference<T> {
    fn materialize_one<'a>(
        &'a self,
        manager: &dyn PersistenceManager,
    ) -> ModelResult<Option<&'a dyn EntityObject>> {
        Ok(self.load(manager)?.map(|entity| entity as &dyn EntityObject))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum CollectionSource {
    /// Items whose `field` column holds the owner's id
    Inverse { field: String, owner: Option<i64> },
    /// Items listed by id on the owning side
    Ids(Vec<i64>),
}

/// Lazy collection of related entities
#[derive(Debug, Clone)]
pub struct Collection<T> {
    source: CollectionSource,
    loaded: OnceCell<Vec<T>>,
}

impl<T: Entity> Default for Collection<T> {
    fn default() -> Self {
        Self::of_ids(Vec::new())
    }
}

impl<T: Entity> Collection<T> {
    /// Collection resolved by the inverse side: every `T` whose `field` is `owner`
    pub fn inverse(field: impl Into<String>, owner: Option<i64>) -> Self {
        Self {
            source: CollectionSource::Inverse {
                field: field.into(),
                owner,
            },
            loaded: OnceCell::new(),
        }
    }

    /// Collection resolved from a list of ids held by the owner
    pub fn of_ids(ids: Vec<i64>) -> Self {
        Self {
            source: CollectionSource::Ids(ids),
            loaded: OnceCell::new(),
        }
    }

    /// A collection that already holds its items
    pub fn loaded(items: Vec<T>) -> Self {
        let ids = items.iter().filter_map(Entity::id).collect();
        Self {
            source: CollectionSource::Ids(ids),
            loaded: OnceCell::with_value(items),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.get().is_some()
    }

    /// Items if the collection has been materialized
    pub fn get(&self) -> Option<&[T]> {
        self.loaded.get().map(Vec::as_slice)
    }

    /// Ids known without touching the persistence manager
    pub fn ids(&self) -> Vec<i64> {
        match (self.loaded.get(), &self.source) {
            (Some(items), _) => items.iter().filter_map(Entity::id).collect(),
            (None, CollectionSource::Ids(ids)) => ids.clone(),
            (None, CollectionSource::Inverse { .. }) => Vec::new(),
        }
    }

    /// Materialize the collection and return its items
    pub fn load(&self, manager: &dyn PersistenceManager) -> ModelResult<&[T]> {
        let items = self.loaded.get_or_try_init(|| self.fetch(manager))?;
        Ok(items.as_slice())
    }

    fn fetch(&self, manager: &dyn PersistenceManager) -> ModelResult<Vec<T>> {
        match &self.source {
            CollectionSource::Inverse { owner: None, .. } => Ok(Vec::new()),
            CollectionSource::Inverse {
                field,
                owner: Some(owner),
            } => {
                tracing::trace!(
                    "Materializing {} collection where {} = {}",
                    T::entity_type(),
                    field,
                    owner
                );
                let criteria = Criteria::new().eq(field.as_str(), *owner);
                manager
                    .find_by(T::entity_type(), &criteria, &OrderBy::default())?
                    .iter()
                    .map(T::from_row)
                    .collect()
            }
            CollectionSource::Ids(ids) => ids
                .iter()
                .map(|id| {
                    let row = manager.find(T::entity_type(), *id)?.ok_or_else(|| {
                        ModelError::EntityNotFound(format!(
                            "{} #{} listed in collection but not found",
                            T::entity_type(),
                            id
                        ))
                    })?;
                    T::from_row(&row)
                })
                .collect(),
        }
    }
}

impl<T: Entity> MaterializeMany for Collection<T> {
    fn materialize_many<'a>(
        &'a self,
        manager: &dyn PersistenceManager,
    ) -> ModelResult<Vec<&'a dyn EntityObject>> {
        Ok(self
            .load(manager)?
            .iter()
            .map(|item| item as &dyn EntityObject)
            .collect())
    }
}
