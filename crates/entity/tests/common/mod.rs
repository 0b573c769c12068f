//! Library fixtures for integration tests
//!
//! Author --books--> Book --tags--> Tag
//!   ^                 |
//!   |              publisher
//!   |                 v
//!   +---authors--- Publisher
//!
//! `Author <-> Book` is a symmetric pair, `Book -> Publisher -> Author` closes
//! a three-type loop that declared-type exclusion alone does not break.

#![allow(dead_code)]

use serde_json::{json, Value};
use smart_entity::{
    row_i64, row_ids, row_value, Collection, Entity, EntityMetadata, FieldValue, Finder,
    InMemoryManager, MetadataRegistry, ModelError, ModelResult, Reference, Row, ID_FIELD,
};

fn reject(entity: &str, field: &str, value: &Value) -> ModelError {
    ModelError::Validation(format!("{}.{} cannot be set to {}", entity, field, value))
}

fn string_column(row: &Row, column: &str) -> String {
    row_value(row, column).as_str().unwrap_or_default().to_string()
}

#[derive(Debug, Clone, Default)]
pub struct Author {
    pub id: Option<i64>,
    pub name: String,
    pub age: Option<i64>,
    pub books: Collection<Book>,
    pub publisher: Reference<Publisher>,
}

impl Entity for Author {
    fn entity_type() -> &'static str {
        "Author"
    }

    fn metadata() -> EntityMetadata {
        EntityMetadata::new("Author")
            .field(ID_FIELD)
            .field("name")
            .field("age")
            .one_to_many("books", "Book")
            .eager()
            .many_to_one("publisher", "Publisher")
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
        self.books = Collection::inverse("author", Some(id));
    }

    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "id" => Some(FieldValue::Scalar(json!(self.id))),
            "name" => Some(FieldValue::Scalar(json!(self.name))),
            "age" => Some(FieldValue::Scalar(json!(self.age))),
            "books" => Some(FieldValue::Collection(&self.books)),
            "publisher" => Some(FieldValue::Single(&self.publisher)),
            _ => None,
        }
    }

    fn set_field(&mut self, name: &str, value: Value) -> ModelResult<()> {
        match (name, &value) {
            ("name", Value::String(s)) => self.name = s.clone(),
            ("age", Value::Null) => self.age = None,
            ("age", Value::Number(n)) if n.is_i64() => self.age = n.as_i64(),
            ("publisher", _) => self.publisher = Reference::from_id(value.as_i64()),
            _ => return Err(reject("Author", name, &value)),
        }
        Ok(())
    }

    fn from_row(row: &Row) -> ModelResult<Self> {
        let id = row_i64(row, ID_FIELD)?;
        Ok(Self {
            id,
            name: string_column(row, "name"),
            age: row_i64(row, "age")?,
            books: Collection::inverse("author", id),
            publisher: Reference::from_id(row_i64(row, "publisher")?),
        })
    }

    fn to_row(&self) -> Row {
        let mut row = Row::new();
        row.insert("name".to_string(), json!(self.name));
        row.insert("age".to_string(), json!(self.age));
        row.insert("publisher".to_string(), json!(self.publisher.id()));
        row
    }
}

#[derive(Debug, Clone, Default)]
pub struct Book {
    pub id: Option<i64>,
    pub title: String,
    pub author: Reference<Author>,
    pub tags: Collection<Tag>,
    pub publisher: Reference<Publisher>,
}

impl Entity for Book {
    fn entity_type() -> &'static str {
        "Book"
    }

    fn metadata() -> EntityMetadata {
        EntityMetadata::new("Book")
            .field(ID_FIELD)
            .field("title")
            .many_to_one("author", "Author")
            .eager()
            .many_to_many("tags", "Tag")
            .eager()
            .many_to_one("publisher", "Publisher")
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
            "title" => Some(FieldValue::Scalar(json!(self.title))),
            "author" => Some(FieldValue::Single(&self.author)),
            "tags" => Some(FieldValue::Collection(&self.tags)),
            "publisher" => Some(FieldValue::Single(&self.publisher)),
            _ => None,
        }
    }

    fn set_field(&mut self, name: &str, value: Value) -> ModelResult<()> {
        match (name, &value) {
            ("title", Value::String(s)) => self.title = s.clone(),
            ("author", _) => self.author = Reference::from_id(value.as_i64()),
            ("publisher", _) => self.publisher = Reference::from_id(value.as_i64()),
            _ => return Err(reject("Book", name, &value)),
        }
        Ok(())
    }

    fn from_row(row: &Row) -> ModelResult<Self> {
        Ok(Self {
            id: row_i64(row, ID_FIELD)?,
            title: string_column(row, "title"),
            author: Reference::from_id(row_i64(row, "author")?),
            tags: Collection::of_ids(row_ids(row, "tags")?),
            publisher: Reference::from_id(row_i64(row, "publisher")?),
        })
    }

    fn to_row(&self) -> Row {
        let mut row = Row::new();
        row.insert("title".to_string(), json!(self.title));
        row.insert("author".to_string(), json!(self.author.id()));
        row.insert("tags".to_string(), json!(self.tags.ids()));
        row.insert("publisher".to_string(), json!(self.publisher.id()));
        row
    }
}

#[derive(Debug, Clone, Default)]
pub struct Tag {
    pub id: Option<i64>,
    pub label: String,
}

impl Entity for Tag {
    fn entity_type() -> &'static str {
        "Tag"
    }

    fn metadata() -> EntityMetadata {
        EntityMetadata::new("Tag").field(ID_FIELD).field("label")
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
            "label" => Some(FieldValue::Scalar(json!(self.label))),
            _ => None,
        }
    }

    fn set_field(&mut self, name: &str, value: Value) -> ModelResult<()> {
        match (name, &value) {
            ("label", Value::String(s)) => self.label = s.clone(),
            _ => return Err(reject("Tag", name, &value)),
        }
        Ok(())
    }

    fn from_row(row: &Row) -> ModelResult<Self> {
        Ok(Self {
            id: row_i64(row, ID_FIELD)?,
            label: string_column(row, "label"),
        })
    }

    fn to_row(&self) -> Row {
        let mut row = Row::new();
        row.insert("label".to_string(), json!(self.label));
        row
    }
}

#[derive(Debug, Clone, Default)]
pub struct Publisher {
    pub id: Option<i64>,
    pub name: String,
    pub authors: Collection<Author>,
}

impl Entity for Publisher {
    fn entity_type() -> &'static str {
        "Publisher"
    }

    fn metadata() -> EntityMetadata {
        EntityMetadata::new("Publisher")
            .field(ID_FIELD)
            .field("name")
            .one_to_many("authors", "Author")
            .eager()
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
        self.authors = Collection::inverse("publisher", Some(id));
    }

    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "id" => Some(FieldValue::Scalar(json!(self.id))),
            "name" => Some(FieldValue::Scalar(json!(self.name))),
            "authors" => Some(FieldValue::Collection(&self.authors)),
            _ => None,
        }
    }

    fn set_field(&mut self, name: &str, value: Value) -> ModelResult<()> {
        match (name, &value) {
            ("name", Value::String(s)) => self.name = s.clone(),
            _ => return Err(reject("Publisher", name, &value)),
        }
        Ok(())
    }

    fn from_row(row: &Row) -> ModelResult<Self> {
        let id = row_i64(row, ID_FIELD)?;
        Ok(Self {
            id,
            name: string_column(row, "name"),
            authors: Collection::inverse("publisher", id),
        })
    }

    fn to_row(&self) -> Row {
        let mut row = Row::new();
        row.insert("name".to_string(), json!(self.name));
        row
    }
}

pub fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {}", other),
    }
}

pub fn registry() -> MetadataRegistry {
    let registry = MetadataRegistry::new();
    registry.register_entity::<Author>().unwrap();
    registry.register_entity::<Book>().unwrap();
    registry.register_entity::<Tag>().unwrap();
    registry.register_entity::<Publisher>().unwrap();
    registry
}

/// Ids of a seeded library
pub struct Library {
    pub tolkien: i64,
    pub herbert: i64,
    pub hobbit: i64,
    pub rings: i64,
    pub dune: i64,
    pub fantasy: i64,
    pub classic: i64,
}

/// Two authors, three books, two tags; no publishers
pub fn seed_library(manager: &InMemoryManager) -> Library {
    let fantasy = Tag::first_or_create(manager, row(json!({"label": "fantasy"}))).unwrap();
    let classic = Tag::first_or_create(manager, row(json!({"label": "classic"}))).unwrap();

    let tolkien = Author::update_or_create(
        manager,
        row(json!({"name": "Tolkien"})),
        row(json!({"age": 81})),
    )
    .unwrap();
    let herbert = Author::update_or_create(
        manager,
        row(json!({"name": "Herbert"})),
        row(json!({"age": 65})),
    )
    .unwrap();

    let book = |title: &str, author: &Author, tags: Vec<i64>| {
        let mut book = Book::create(row(json!({"title": title}))).unwrap();
        book.author = Reference::from_id(author.id);
        book.tags = Collection::of_ids(tags);
        book.save(manager).unwrap();
        book.id.unwrap()
    };

    let hobbit = book("The Hobbit", &tolkien, vec![fantasy.id.unwrap(), classic.id.unwrap()]);
    let rings = book("The Lord of the Rings", &tolkien, vec![fantasy.id.unwrap()]);
    let dune = book("Dune", &herbert, vec![classic.id.unwrap()]);

    Library {
        tolkien: tolkien.id.unwrap(),
        herbert: herbert.id.unwrap(),
        hobbit,
        rings,
        dune,
        fantasy: fantasy.id.unwrap(),
        classic: classic.id.unwrap(),
    }
}

/// Put every author and the given books under one publisher, closing the
/// `Book -> Publisher -> Author -> Book` loop. Returns the publisher id.
pub fn link_publisher(manager: &InMemoryManager, books: &[i64]) -> i64 {
    let publisher = Publisher::first_or_create(manager, row(json!({"name": "Allen & Unwin"})))
        .unwrap()
        .id
        .unwrap();

    for mut author in Author::all(manager).unwrap() {
        author.publisher = Reference::to(publisher);
        author.save(manager).unwrap();
    }
    for id in books {
        Book::update_or_create(manager, *id, row(json!({"publisher": publisher}))).unwrap();
    }
    publisher
}
