//! Finder façade - ActiveRecord-style static helpers on every entity type
//!
//! `Product::find(&pm, 7)`, `Product::update_or_create(&pm, criteria, update)`
//! and friends translate flexible argument shapes into persistence manager
//! calls. The manager handle is always passed in explicitly.

use serde_json::Value;

use crate::entity::{Entity, Row, ID_FIELD};
use crate::error::{ModelError, ModelResult};
use crate::persistence::PersistenceManager;
use crate::query::{Criteria, FindOptions, OrderBy, PairsArg, PairsQuery};

/// Result of [`Finder::find`], shaped after the options that produced it
#[derive(Debug, Clone, PartialEq)]
pub enum Found<T> {
    /// Lookup by identity
    Single(Option<T>),
    /// Lookup by criteria (or everything)
    Many(Vec<T>),
    /// Lookup by a list of ids: one slot per requested id, in order
    Slots(Vec<Option<T>>),
}

impl<T> Found<T> {
    /// True when no entity was found; a list of unresolved ids counts as empty
    pub fn is_empty(&self) -> bool {
        match self {
            Found::Single(entity) => entity.is_none(),
            Found::Many(entities) => entities.is_empty(),
            Found::Slots(slots) => slots.iter().all(Option::is_none),
        }
    }

    /// Every entity found, dropping empty slots
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Found::Single(entity) => entity.into_iter().collect(),
            Found::Many(entities) => entities,
            Found::Slots(slots) => slots.into_iter().flatten().collect(),
        }
    }

    pub fn single(self) -> Option<T> {
        match self {
            Found::Single(entity) => entity,
            Found::Many(entities) => entities.into_iter().next(),
            Found::Slots(slots) => slots.into_iter().flatten().next(),
        }
    }
}

/// Ordered key -> value map returned by [`Finder::find_pairs`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pairs {
    entries: Vec<(Value, Value)>,
}

impl Pairs {
    /// Insert a pair; an existing key keeps its position and takes the new value
    pub fn insert(&mut self, key: Value, value: Value) {
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
    }

    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(key, _)| key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.entries.iter().map(|(key, value)| (key, value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render as a JSON object, stringifying non-string keys
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.entries
                .iter()
                .map(|(key, value)| {
                    let key = match key {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (key, value.clone())
                })
                .collect(),
        )
    }
}

impl FromIterator<(Value, Value)> for Pairs {
    fn from_iter<I: IntoIterator<Item = (Value, Value)>>(iter: I) -> Self {
        let mut pairs = Pairs::default();
        for (key, value) in iter {
            pairs.insert(key, value);
        }
        pairs
    }
}

fn assign<T: Entity>(entity: &mut T, field: &str, value: Value) -> ModelResult<()> {
    if field == ID_FIELD {
        return Err(ModelError::Validation(format!(
            "{}.{} is assigned by the persistence layer and is read-only",
            T::entity_type(),
            ID_FIELD
        )));
    }
    entity.set_field(field, value)
}

fn not_found<T: Entity>() -> ModelError {
    ModelError::EntityNotFound(format!(
        "No {} found matching this filter",
        T::entity_type()
    ))
}

/// Static finders and persistence helpers for every [`Entity`]
pub trait Finder: Entity {
    /// Every stored entity of this type
    fn all(manager: &dyn PersistenceManager) -> ModelResult<Vec<Self>> {
        manager
            .find_by(Self::entity_type(), &Criteria::new(), &OrderBy::default())?
            .iter()
            .map(Self::from_row)
            .collect()
    }

    /// Find by id, by list of ids, by criteria, or everything
    fn find(
        manager: &dyn PersistenceManager,
        options: impl Into<FindOptions>,
    ) -> ModelResult<Found<Self>> {
        let options = options.into();
        tracing::debug!("{}::find({:?})", Self::entity_type(), options);

        match options {
            FindOptions::ById(id) => {
                let row = manager.find(Self::entity_type(), id)?;
                Ok(Found::Single(row.as_ref().map(Self::from_row).transpose()?))
            }
            FindOptions::ByCriteria(criteria) => {
                let rows = manager.find_by(Self::entity_type(), &criteria, &OrderBy::default())?;
                Ok(Found::Many(
                    rows.iter().map(Self::from_row).collect::<ModelResult<_>>()?,
                ))
            }
            FindOptions::ByIdList(ids) => {
                let mut slots = Vec::with_capacity(ids.len());
                for id in ids {
                    let row = manager.find(Self::entity_type(), id)?;
                    slots.push(row.as_ref().map(Self::from_row).transpose()?);
                }
                Ok(Found::Slots(slots))
            }
            FindOptions::All => Self::all(manager).map(Found::Many),
        }
    }

    /// Find exactly one entity
    fn find_one(
        manager: &dyn PersistenceManager,
        options: impl Into<FindOptions>,
    ) -> ModelResult<Option<Self>> {
        let options = options.into();
        let row = match &options {
            FindOptions::ById(id) => manager.find(Self::entity_type(), *id)?,
            FindOptions::ByCriteria(criteria) => {
                manager.find_one_by(Self::entity_type(), criteria)?
            }
            FindOptions::All => manager.find_one_by(Self::entity_type(), &Criteria::new())?,
            FindOptions::ByIdList(ids) => {
                let mut first = None;
                for id in ids {
                    if let Some(row) = manager.find(Self::entity_type(), *id)? {
                        first = Some(row);
                        break;
                    }
                }
                first
            }
        };
        row.as_ref().map(Self::from_row).transpose()
    }

    /// Find entities or fail with `EntityNotFound` when nothing matched
    fn find_or_fail(
        manager: &dyn PersistenceManager,
        options: impl Into<FindOptions>,
    ) -> ModelResult<Found<Self>> {
        let found = Self::find(manager, options)?;
        if found.is_empty() {
            return Err(not_found::<Self>());
        }
        Ok(found)
    }

    /// Find one entity or fail with `EntityNotFound`
    fn first_or_fail(
        manager: &dyn PersistenceManager,
        options: impl Into<FindOptions>,
    ) -> ModelResult<Self> {
        Self::find_one(manager, options)?.ok_or_else(not_found::<Self>)
    }

    /// New, unpersisted entity with fields assigned from the criteria entries
    fn create(options: impl Into<FindOptions>) -> ModelResult<Self> {
        let mut entity = Self::default();
        if let FindOptions::ByCriteria(criteria) = options.into() {
            for (field, value) in criteria.iter() {
                if field == ID_FIELD {
                    continue;
                }
                assign(&mut entity, field, value.clone())?;
            }
        }
        Ok(entity)
    }

    /// Find one entity or build a new unpersisted one from the options
    fn first_or_new(
        manager: &dyn PersistenceManager,
        options: impl Into<FindOptions>,
    ) -> ModelResult<Self> {
        let options = options.into();
        match Self::find_one(manager, options.clone())? {
            Some(entity) => Ok(entity),
            None => Self::create(options),
        }
    }

    /// `first_or_new`, then save
    fn first_or_create(
        manager: &dyn PersistenceManager,
        options: impl Into<FindOptions>,
    ) -> ModelResult<Self> {
        let mut entity = Self::first_or_new(manager, options)?;
        entity.save(manager)?;
        Ok(entity)
    }

    /// `first_or_new`, apply every `update` entry, then save
    fn update_or_create(
        manager: &dyn PersistenceManager,
        options: impl Into<FindOptions>,
        update: Row,
    ) -> ModelResult<Self> {
        let mut entity = Self::first_or_new(manager, options)?;
        for (field, value) in update {
            assign(&mut entity, &field, value)?;
        }
        entity.save(manager)?;
        Ok(entity)
    }

    /// Delete every entity `find` resolves for the options
    fn destroy(
        manager: &dyn PersistenceManager,
        options: impl Into<FindOptions>,
    ) -> ModelResult<()> {
        for entity in Self::find(manager, options)?.into_vec() {
            entity.delete(manager)?;
        }
        Ok(())
    }

    /// Key -> value pairs, filtered and ordered.
    ///
    /// Arguments are positional `(criteria, value, order_by, key)`; see
    /// [`PairsQuery::resolve`] for how shorter call shapes are interpreted.
    fn find_pairs(
        manager: &dyn PersistenceManager,
        criteria: impl Into<PairsArg>,
        value: impl Into<PairsArg>,
        order_by: impl Into<PairsArg>,
        key: impl Into<PairsArg>,
    ) -> ModelResult<Pairs> {
        let query = PairsQuery::resolve(
            Self::entity_type(),
            criteria.into(),
            value.into(),
            order_by.into(),
            key.into(),
        )?;
        tracing::debug!(
            "{}::find_pairs({} => {})",
            Self::entity_type(),
            query.key_field,
            query.value_field
        );

        let rows = manager
            .select_pairs(&query)
            .map_err(|err| ModelError::QueryExecution {
                entity_type: Self::entity_type().to_string(),
                source: Box::new(err),
            })?;
        Ok(rows.into_iter().collect())
    }

    /// Persist this entity and flush, assigning its id on first save
    fn save(&mut self, manager: &dyn PersistenceManager) -> ModelResult<()> {
        let id = manager.persist(Self::entity_type(), self.id(), self.to_row())?;
        manager.flush()?;
        if self.id() != Some(id) {
            self.set_id(id);
        }
        tracing::debug!("Saved {} #{}", Self::entity_type(), id);
        Ok(())
    }

    /// Remove this entity and flush
    fn delete(self, manager: &dyn PersistenceManager) -> ModelResult<()> {
        let id = self.id().ok_or(ModelError::MissingPrimaryKey)?;
        manager.remove(Self::entity_type(), id)?;
        manager.flush()?;
        tracing::debug!("Deleted {} #{}", Self::entity_type(), id);
        Ok(())
    }
}

impl<T: Entity> Finder for T {}
