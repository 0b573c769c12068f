//! Query inputs - Criteria, ordering and finder argument shapes
//!
//! Finders accept several argument shapes (an id, a list of ids, a filter).
//! These are modelled as tagged unions with `From` conversions so call sites
//! stay short: `Product::find(&pm, 7)`, `Product::find(&pm, vec![7, 3])`.

use std::fmt;
use serde_json::Value;

use crate::entity::{Row, ID_FIELD};
use crate::error::{ModelError, ModelResult};

/// Equality filter: every listed field must equal its value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    conditions: Row,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality condition
    pub fn eq<T: Into<Value>>(mut self, field: &str, value: T) -> Self {
        self.conditions.insert(field.to_string(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.conditions.iter()
    }

    /// True if `row` satisfies every condition
    pub fn matches(&self, row: &Row) -> bool {
        self.conditions
            .iter()
            .all(|(field, expected)| row.get(field).unwrap_or(&Value::Null) == expected)
    }

    pub fn as_row(&self) -> &Row {
        &self.conditions
    }
}

impl From<Row> for Criteria {
    fn from(conditions: Row) -> Self {
        Self { conditions }
    }
}

/// Order by direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderDirection::Asc => write!(f, "ASC"),
            OrderDirection::Desc => write!(f, "DESC"),
        }
    }
}

impl std::str::FromStr for OrderDirection {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ASC" => Ok(OrderDirection::Asc),
            "DESC" => Ok(OrderDirection::Desc),
            _ => Err(ModelError::Query(format!(
                "Invalid order direction '{}', expected ASC or DESC",
                s
            ))),
        }
    }
}

/// Ordered list of (field, direction) sort keys
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderBy {
    columns: Vec<(String, OrderDirection)>,
}

impl OrderBy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn asc(mut self, field: &str) -> Self {
        self.columns.push((field.to_string(), OrderDirection::Asc));
        self
    }

    pub fn desc(mut self, field: &str) -> Self {
        self.columns.push((field.to_string(), OrderDirection::Desc));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[(String, OrderDirection)] {
        &self.columns
    }

    /// Parse a `field -> "ASC" | "DESC"` mapping
    pub fn from_row(row: &Row) -> ModelResult<Self> {
        let mut order = Self::new();
        for (field, direction) in row {
            let direction = match direction {
                Value::String(s) => s.parse()?,
                Value::Null => OrderDirection::Asc,
                other => {
                    return Err(ModelError::Query(format!(
                        "Invalid order direction {} for field '{}'",
                        other, field
                    )))
                }
            };
            order.columns.push((field.clone(), direction));
        }
        Ok(order)
    }
}

/// Argument shape accepted by `find`, `find_one` and friends
#[derive(Debug, Clone, Default, PartialEq)]
pub enum FindOptions {
    /// Fetch one entity by identity
    ById(i64),
    /// Fetch every entity matching the filter
    ByCriteria(Criteria),
    /// Fetch each id in turn, one slot per id
    ByIdList(Vec<i64>),
    /// No filter
    #[default]
    All,
}

impl From<i64> for FindOptions {
    fn from(id: i64) -> Self {
        FindOptions::ById(id)
    }
}

impl From<Vec<i64>> for FindOptions {
    fn from(ids: Vec<i64>) -> Self {
        FindOptions::ByIdList(ids)
    }
}

impl From<&[i64]> for FindOptions {
    fn from(ids: &[i64]) -> Self {
        FindOptions::ByIdList(ids.to_vec())
    }
}

impl From<Criteria> for FindOptions {
    fn from(criteria: Criteria) -> Self {
        FindOptions::ByCriteria(criteria)
    }
}

impl From<Row> for FindOptions {
    fn from(row: Row) -> Self {
        FindOptions::ByCriteria(row.into())
    }
}

impl From<()> for FindOptions {
    fn from(_: ()) -> Self {
        FindOptions::All
    }
}

/// One positional argument of `find_pairs`
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PairsArg {
    #[default]
    Unset,
    /// A mapping: criteria or ordering depending on position
    Map(Row),
    /// A plain value: a field name
    Scalar(Value),
}

impl PairsArg {
    fn is_map(&self) -> bool {
        matches!(self, PairsArg::Map(_))
    }

    fn is_empty(&self) -> bool {
        match self {
            PairsArg::Unset | PairsArg::Scalar(Value::Null) => true,
            PairsArg::Scalar(Value::String(s)) => s.is_empty(),
            PairsArg::Map(map) => map.is_empty(),
            PairsArg::Scalar(_) => false,
        }
    }

    fn into_map(self) -> Row {
        match self {
            PairsArg::Map(map) => map,
            _ => Row::new(),
        }
    }

    fn field_name(&self) -> Option<String> {
        match self {
            PairsArg::Scalar(Value::String(s)) => Some(s.clone()),
            PairsArg::Scalar(Value::Null) | PairsArg::Unset | PairsArg::Map(_) => None,
            PairsArg::Scalar(other) => Some(other.to_string()),
        }
    }
}

impl From<Row> for PairsArg {
    fn from(map: Row) -> Self {
        PairsArg::Map(map)
    }
}

impl From<Criteria> for PairsArg {
    fn from(criteria: Criteria) -> Self {
        PairsArg::Map(criteria.conditions)
    }
}

impl From<&str> for PairsArg {
    fn from(field: &str) -> Self {
        PairsArg::Scalar(Value::String(field.to_string()))
    }
}

impl From<String> for PairsArg {
    fn from(field: String) -> Self {
        PairsArg::Scalar(Value::String(field))
    }
}

impl From<i64> for PairsArg {
    fn from(value: i64) -> Self {
        PairsArg::Scalar(value.into())
    }
}

impl From<()> for PairsArg {
    fn from(_: ()) -> Self {
        PairsArg::Unset
    }
}

/// Fully resolved key/value projection query
#[derive(Debug, Clone, PartialEq)]
pub struct PairsQuery {
    pub entity_type: String,
    pub criteria: Criteria,
    pub value_field: String,
    pub order_by: OrderBy,
    pub key_field: String,
}

impl PairsQuery {
    /// Resolve positional `(criteria, value, order_by, key)` arguments.
    ///
    /// A leading non-mapping shifts every argument one slot to the right and
    /// leaves the criteria empty. A non-mapping in the ordering slot becomes
    /// the key and leaves the ordering empty, except an unset ordering in an
    /// unshifted call, which is an empty ordering. An empty key means `id`.
    pub fn resolve(
        entity_type: &str,
        criteria: PairsArg,
        value: PairsArg,
        order_by: PairsArg,
        key: PairsArg,
    ) -> ModelResult<Self> {
        let shifted = !criteria.is_map();
        let (criteria, value, mut order_by, mut key) = if shifted {
            (PairsArg::Map(Row::new()), criteria, value, order_by)
        } else {
            (criteria, value, order_by, key)
        };

        match order_by {
            PairsArg::Map(_) => {}
            PairsArg::Unset if !shifted => order_by = PairsArg::Map(Row::new()),
            other => {
                key = other;
                order_by = PairsArg::Map(Row::new());
            }
        }

        let key_field = if key.is_empty() {
            ID_FIELD.to_string()
        } else {
            key.field_name().ok_or_else(|| {
                ModelError::Query(format!("find_pairs key must be a field name, got {:?}", key))
            })?
        };

        let value_field = value.field_name().ok_or_else(|| {
            ModelError::Query(format!("find_pairs requires a value field, got {:?}", value))
        })?;

        let criteria = Criteria::from(criteria.into_map());
        let order_by = OrderBy::from_row(&order_by.into_map())?;

        Ok(Self {
            entity_type: entity_type.to_string(),
            criteria,
            value_field,
            order_by,
            key_field,
        })
    }
}
