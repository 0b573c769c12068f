//! Entity fixtures shared by unit tests
//!
//! `Category` references itself through `parent` and owns `products`;
//! `Product` points back at its `Category`. `Account` and `Profile` hold a
//! one-to-one reference to each other.

use serde_json::{json, Value};

use crate::containers::{Collection, Reference};
use crate::entity::{row_i64, row_value, Entity, FieldValue, Row, ID_FIELD};
use crate::error::{ModelError, ModelResult};
use crate::metadata::EntityMetadata;
use crate::registry::MetadataRegistry;

#[derive(Debug, Clone, Default)]
pub struct Category {
    pub id: Option<i64>,
    pub name: String,
    pub parent: Reference<Category>,
    pub products: Collection<Product>,
}

impl Category {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            products: Collection::inverse("category", None),
            ..Default::default()
        }
    }
}

impl Entity for Category {
    fn entity_type() -> &'static str {
        "Category"
    }

    fn metadata() -> EntityMetadata {
        EntityMetadata::new("Category")
            .field(ID_FIELD)
            .field("name")
            .many_to_one("parent", "Category")
            .eager()
            .one_to_many("products", "Product")
            .eager()
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
        self.products = Collection::inverse("category", Some(id));
    }

    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "id" => Some(FieldValue::Scalar(json!(self.id))),
            "name" => Some(FieldValue::Scalar(json!(self.name))),
            "parent" => Some(FieldValue::Single(&self.parent)),
            "products" => Some(FieldValue::Collection(&self.products)),
            _ => None,
        }
    }

    fn set_field(&mut self, name: &str, value: Value) -> ModelResult<()> {
        match (name, value) {
            ("name", Value::String(s)) => self.name = s,
            ("parent", Value::Null) => self.parent = Reference::empty(),
            ("parent", Value::Number(n)) if n.is_i64() => {
                self.parent = Reference::from_id(n.as_i64())
            }
            (name, value) => {
                return Err(ModelError::Validation(format!(
                    "Category.{} cannot be set to {}",
                    name, value
                )))
            }
        }
        Ok(())
    }

    fn from_row(row: &Row) -> ModelResult<Self> {
        let id = row_i64(row, ID_FIELD)?;
        Ok(Self {
            id,
            name: row_value(row, "name").as_str().unwrap_or_default().to_string(),
            parent: Reference::from_id(row_i64(row, "parent")?),
            products: Collection::inverse("category", id),
        })
    }

    fn to_row(&self) -> Row {
        let mut row = Row::new();
        row.insert("name".to_string(), json!(self.name));
        row.insert("parent".to_string(), json!(self.parent.id()));
        row
    }
}

#[derive(Debug, Clone, Default)]
pub struct Product {
    pub id: Option<i64>,
    pub name: String,
    pub price: i64,
    pub category: Reference<Category>,
}

impl Product {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }
}

impl Entity for Product {
    fn entity_type() -> &'static str {
        "Product"
    }

    fn metadata() -> EntityMetadata {
        EntityMetadata::new("Product")
            .field(ID_FIELD)
            .field("name")
            .field("price")
            .many_to_one("category", "Category")
            .eager()
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "id" => Some(FieldValue::Scalar(json!(self.id))),
            "name" => Some(FieldValue::Scalar(json!(self.name))),
            "price" => Some(FieldValue::Scalar(json!(self.price))),
            "category" => Some(FieldValue::Single(&self.category)),
            _ => None,
        }
    }

    fn set_field(&mut self, name: &str, value: Value) -> ModelResult<()> {
        match (name, value) {
            ("name", Value::String(s)) => self.name = s,
            ("price", Value::Number(n)) if n.is_i64() => self.price = n.as_i64().unwrap_or_default(),
            ("category", value) => self.category = Reference::from_id(value.as_i64()),
            (name, value) => {
                return Err(ModelError::Validation(format!(
                    "Product.{} cannot be set to {}",
                    name, value
                )))
            }
        }
        Ok(())
    }

    fn from_row(row: &Row) -> ModelResult<Self> {
        Ok(Self {
            id: row_i64(row, ID_FIELD)?,
            name: row_value(row, "name").as_str().unwrap_or_default().to_string(),
            price: row_i64(row, "price")?.unwrap_or_default(),
            category: Reference::from_id(row_i64(row, "category")?),
        })
    }

    fn to_row(&self) -> Row {
        let mut row = Row::new();
        row.insert("name".to_string(), json!(self.name));
        row.insert("price".to_string(), json!(self.price));
        row.insert("category".to_string(), json!(self.category.id()));
        row
    }
}

#[derive(Debug, Clone, Default)]
pub struct Account {
    pub id: Option<i64>,
    pub login: String,
    pub profile: Reference<Profile>,
}

impl Entity for Account {
    fn entity_type() -> &'static str {
        "Account"
    }

    fn metadata() -> EntityMetadata {
        EntityMetadata::new("Account")
            .field(ID_FIELD)
            .field("login")
            .one_to_one("profile", "Profile")
            .eager()
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "id" => Some(FieldValue::Scalar(json!(self.id))),
            "login" => Some(FieldValue::Scalar(json!(self.login))),
            "profile" => Some(FieldValue::Single(&self.profile)),
            _ => None,
        }
    }

    fn set_field(&mut self, name: &str, value: Value) -> ModelResult<()> {
        match (name, value) {
            ("login", Value::String(s)) => self.login = s,
            ("profile", value) => self.profile = Reference::from_id(value.as_i64()),
            (name, value) => {
                return Err(ModelError::Validation(format!(
                    "Account.{} cannot be set to {}",
                    name, value
                )))
            }
        }
        Ok(())
    }

    fn from_row(row: &Row) -> ModelResult<Self> {
        Ok(Self {
            id: row_i64(row, ID_FIELD)?,
            login: row_value(row, "login").as_str().unwrap_or_default().to_string(),
            profile: Reference::from_id(row_i64(row, "profile")?),
        })
    }

    fn to_row(&self) -> Row {
        let mut row = Row::new();
        row.insert("login".to_string(), json!(self.login));
        row.insert("profile".to_string(), json!(self.profile.id()));
        row
    }
}

#[derive(Debug, Clone, Default)]
pub struct Profile {
    pub id: Option<i64>,
    pub bio: String,
    pub account: Reference<Account>,
}

impl Entity for Profile {
    fn entity_type() -> &'static str {
        "Profile"
    }

    fn metadata() -> EntityMetadata {
        EntityMetadata::new("Profile")
            .field(ID_FIELD)
            .field("bio")
            .one_to_one("account", "Account")
            .eager()
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "id" => Some(FieldValue::Scalar(json!(self.id))),
            "bio" => Some(FieldValue::Scalar(json!(self.bio))),
            "account" => Some(FieldValue::Single(&self.account)),
            _ => None,
        }
    }

    fn set_field(&mut self, name: &str, value: Value) -> ModelResult<()> {
        match (name, value) {
            ("bio", Value::String(s)) => self.bio = s,
            ("account", value) => self.account = Reference::from_id(value.as_i64()),
            (name, value) => {
                return Err(ModelError::Validation(format!(
                    "Profile.{} cannot be set to {}",
                    name, value
                )))
            }
        }
        Ok(())
    }

    fn from_row(row: &Row) -> ModelResult<Self> {
        Ok(Self {
            id: row_i64(row, ID_FIELD)?,
            bio: row_value(row, "bio").as_str().unwrap_or_default().to_string(),
            account: Reference::from_id(row_i64(row, "account")?),
        })
    }

    fn to_row(&self) -> Row {
        let mut row = Row::new();
        row.insert("bio".to_string(), json!(self.bio));
        row.insert("account".to_string(), json!(self.account.id()));
        row
    }
}

/// Registry with every fixture type registered
pub fn registry() -> MetadataRegistry {
    let registry = MetadataRegistry::new();
    registry
        .register_entity::<Category>()
        .expect("Category metadata is valid");
    registry
        .register_entity::<Product>()
        .expect("Product metadata is valid");
    registry
        .register_entity::<Account>()
        .expect("Account metadata is valid");
    registry
        .register_entity::<Profile>()
        .expect("Profile metadata is valid");
    registry
}
