//! Entity descriptors and the metadata lookups the compiler relies on.
//!
//! Every entity a query touches is described once, statically, by an
//! [`EntitySchema`]: its table name and, per property, the mapped column,
//! declared [`DataKind`] and primary-key flag. The [`entity!`] macro
//! declares a marker type together with its descriptor:
//!
//! ```
//! use paramquery::entity;
//! use paramquery::schema::Entity;
//!
//! entity! {
//!     pub struct Student => "PQ_Student" {
//!         Id: Int => "student_id" [primary_key],
//!         FirstName: Text => "first_name",
//!     }
//! }
//!
//! assert_eq!(Student::entity().table_name(), "PQ_Student");
//! ```
//!
//! Descriptors can also be loaded at run time from TOML, see [`Schema`].

use std::fmt;
use std::fs;
use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ast::ColumnRef;
use crate::error::{QueryError, QueryResult};

/// Declared kind of an entity property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataKind {
    Int,
    Decimal,
    Text,
    Char,
    DateTime,
    Bool,
}

impl DataKind {
    pub fn is_numeric(self) -> bool {
        matches!(self, DataKind::Int | DataKind::Decimal)
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataKind::Int => "int",
            DataKind::Decimal => "decimal",
            DataKind::Text => "text",
            DataKind::Char => "char",
            DataKind::DateTime => "datetime",
            DataKind::Bool => "bool",
        };
        write!(f, "{}", name)
    }
}

/// One property of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub name: String,
    /// Database column; the property name is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    pub kind: DataKind,
    #[serde(default)]
    pub primary_key: bool,
}

impl FieldSchema {
    pub fn new(name: impl Into<String>, kind: DataKind) -> Self {
        Self {
            name: name.into(),
            column: None,
            kind,
            primary_key: false,
        }
    }

    /// Map the property to a differently named column.
    pub fn mapped_to(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    /// Mark the property as the entity's primary key.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn column_name(&self) -> &str {
        self.column.as_deref().unwrap_or(&self.name)
    }
}

/// Static description of an entity (one table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySchema {
    pub name: String,
    /// Database table; the entity name is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(default, rename = "field")]
    pub fields: Vec<FieldSchema>,
}

impl EntitySchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: None,
            fields: Vec::new(),
        }
    }

    pub fn mapped_to(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn field(mut self, field: FieldSchema) -> Self {
        self.fields.push(field);
        self
    }

    pub fn table_name(&self) -> &str {
        self.table.as_deref().unwrap_or(&self.name)
    }

    /// Look up a property by name (case-sensitive).
    pub fn find(&self, property: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == property)
    }

    /// First property flagged as primary key.
    pub fn key_field(&self) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.primary_key)
    }

    fn validate(&self) -> QueryResult<()> {
        for (i, field) in self.fields.iter().enumerate() {
            if self.fields[..i].iter().any(|f| f.name == field.name) {
                return Err(QueryError::Config(format!(
                    "Entity \"{}\" declares property \"{}\" more than once",
                    self.name, field.name
                )));
            }
        }
        Ok(())
    }
}

/// Shared handle to an entity descriptor. Two handles are the same
/// entity when their names match.
#[derive(Clone)]
pub struct EntityRef(Arc<EntitySchema>);

impl EntityRef {
    pub fn new(schema: EntitySchema) -> Self {
        Self(Arc::new(schema))
    }

    /// Column reference to one of this entity's properties.
    pub fn col(&self, property: &str) -> ColumnRef {
        ColumnRef::property(self.clone(), property)
    }
}

impl Deref for EntityRef {
    type Target = EntitySchema;

    fn deref(&self) -> &EntitySchema {
        &self.0
    }
}

impl PartialEq for EntityRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.name == other.0.name
    }
}

impl Eq for EntityRef {}

impl fmt::Debug for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityRef({})", self.0.name)
    }
}

impl From<EntitySchema> for EntityRef {
    fn from(schema: EntitySchema) -> Self {
        Self::new(schema)
    }
}

/// Binds a Rust marker type to its entity descriptor.
///
/// Usually implemented through [`entity!`](crate::entity).
pub trait Entity {
    fn entity() -> EntityRef;

    /// Column reference to `property` of this entity.
    fn col(property: &str) -> ColumnRef {
        ColumnRef::property(Self::entity(), property)
    }
}

/// Declare entity marker types together with their schema.
///
/// Each property is `Name: Kind`, optionally followed by `=> "column"` and
/// `[primary_key]`. The struct may be followed by `=> "table"`.
#[macro_export]
macro_rules! entity {
    ($(
        $(#[$meta:meta])*
        $vis:vis struct $name:ident $(=> $table:literal)? {
            $( $field:ident : $kind:ident $(=> $column:literal)? $([$flag:ident])? ),* $(,)?
        }
    )+) => {$(
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default)]
        $vis struct $name;

        impl $crate::schema::Entity for $name {
            fn entity() -> $crate::schema::EntityRef {
                static SCHEMA: ::std::sync::LazyLock<$crate::schema::EntityRef> =
                    ::std::sync::LazyLock::new(|| {
                        let schema = $crate::schema::EntitySchema::new(stringify!($name));
                        $( let schema = schema.mapped_to($table); )?
                        $(
                            let schema = schema.field({
                                let field = $crate::schema::FieldSchema::new(
                                    stringify!($field),
                                    $crate::schema::DataKind::$kind,
                                );
                                $( let field = field.mapped_to($column); )?
                                $( let field = field.$flag(); )?
                                field
                            });
                        )*
                        $crate::schema::EntityRef::new(schema)
                    });
                SCHEMA.clone()
            }
        }
    )+};
}

/// Metadata lookups used while compiling a query.
///
/// The default [`SchemaResolver`] reads the descriptors as declared;
/// custom resolvers can apply naming conventions on top.
pub trait MetadataResolver {
    /// Database name of the entity's table.
    fn table_name(&self, entity: &EntitySchema) -> String;

    /// Database column of `property`. Fails when the property does not exist.
    fn column_name(&self, entity: &EntitySchema, property: &str) -> QueryResult<String>;

    fn data_kind(&self, entity: &EntitySchema, property: &str) -> QueryResult<DataKind>;

    fn is_primary_key(&self, entity: &EntitySchema, property: &str) -> QueryResult<bool>;

    /// Property name of the entity's primary key.
    fn primary_key(&self, entity: &EntitySchema) -> QueryResult<String>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaResolver;

impl SchemaResolver {
    fn field<'a>(entity: &'a EntitySchema, property: &str) -> QueryResult<&'a FieldSchema> {
        entity
            .find(property)
            .ok_or_else(|| QueryError::property_not_found(&entity.name, property))
    }
}

impl MetadataResolver for SchemaResolver {
    fn table_name(&self, entity: &EntitySchema) -> String {
        entity.table_name().to_string()
    }

    fn column_name(&self, entity: &EntitySchema, property: &str) -> QueryResult<String> {
        Ok(Self::field(entity, property)?.column_name().to_string())
    }

    fn data_kind(&self, entity: &EntitySchema, property: &str) -> QueryResult<DataKind> {
        Ok(Self::field(entity, property)?.kind)
    }

    fn is_primary_key(&self, entity: &EntitySchema, property: &str) -> QueryResult<bool> {
        Ok(Self::field(entity, property)?.primary_key)
    }

    fn primary_key(&self, entity: &EntitySchema) -> QueryResult<String> {
        entity
            .key_field()
            .map(|f| f.name.clone())
            .ok_or_else(|| QueryError::MissingPrimaryKey(entity.name.clone()))
    }
}

#[derive(Debug, Deserialize)]
struct SchemaFile {
    #[serde(default)]
    entity: Vec<EntitySchema>,
}

/// A set of entity descriptors loaded at run time.
///
/// ```toml
/// [[entity]]
/// name = "Student"
/// table = "PQ_Student"
///
/// [[entity.field]]
/// name = "Id"
/// column = "student_id"
/// kind = "int"
/// primary_key = true
/// ```
#[derive(Debug, Clone, Default)]
pub struct Schema {
    entities: Vec<EntityRef>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(content: &str) -> QueryResult<Self> {
        let file: SchemaFile = toml::from_str(content)?;
        let mut schema = Self::new();
        for entity in file.entity {
            schema.insert(entity)?;
        }
        Ok(schema)
    }

    pub fn load(path: &Path) -> QueryResult<Self> {
        let content = fs::read_to_string(path)?;
        let schema = Self::from_toml_str(&content)?;
        tracing::info!("Loaded {} entity schemas from {}", schema.len(), path.display());
        Ok(schema)
    }

    pub fn insert(&mut self, entity: impl Into<EntityRef>) -> QueryResult<()> {
        let entity = entity.into();
        entity.validate()?;
        if self.entities.iter().any(|e| e.name == entity.name) {
            return Err(QueryError::Config(format!(
                "Entity \"{}\" is defined more than once",
                entity.name
            )));
        }
        tracing::debug!("Loaded schema for entity: {}", entity.name);
        self.entities.push(entity);
        Ok(())
    }

    pub fn get(&self, name: &str) -> QueryResult<EntityRef> {
        self.entities
            .iter()
            .find(|e| e.name == name)
            .cloned()
            .ok_or_else(|| QueryError::Config(format!("Entity \"{}\" is not defined in the schema", name)))
    }

    pub fn entities(&self) -> &[EntityRef] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
