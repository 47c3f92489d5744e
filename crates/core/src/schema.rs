//! Entity schema metadata.
//!
//! A [`SchemaModel`] describes every entity a data context knows about: its
//! columns in declaration order and the foreign keys that relate it to
//! principal entities. Models are plain data so they can be introspected from
//! a database, built by hand, or loaded from JSON.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::DEFAULT_KEY_PROPERTY;

/// Compile-time token for an entity, used by the typed context and rule
/// builder overloads.
pub trait Entity {
    /// Name of the entity in the schema model (the table name for SQL stores).
    const NAME: &'static str;
}

/// Storage class of a column's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Text,
    Integer,
    Float,
    Numeric,
    Boolean,
    Uuid,
    Timestamp,
    Date,
    Json,
    Bytes,
    Other,
}

impl ValueKind {
    /// Only text columns carry a meaningful character length.
    pub const fn is_string_like(self) -> bool {
        matches!(self, Self::Text)
    }
}

/// Metadata for a single entity column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub name: String,
    pub kind: ValueKind,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub foreign_key: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
}

fn default_nullable() -> bool {
    true
}

impl ColumnMeta {
    /// A nullable column with no constraints.
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: true,
            primary_key: false,
            unique: false,
            foreign_key: false,
            max_length: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Marks the column as (part of) the primary key. Primary key columns are
    /// never nullable.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn foreign_key(mut self) -> Self {
        self.foreign_key = true;
        self
    }

    pub fn max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }
}

/// A relationship from dependent columns to the principal entity they
/// reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Dependent columns on the owning entity.
    pub columns: Vec<String>,
    /// Name of the referenced entity.
    pub principal: String,
    /// Referenced columns, paired by position with `columns`.
    #[serde(default)]
    pub principal_columns: Vec<String>,
}

impl ForeignKeyMeta {
    /// A single-column foreign key referencing the principal's default key.
    pub fn new(column: impl Into<String>, principal: impl Into<String>) -> Self {
        Self {
            name: None,
            columns: vec![column.into()],
            principal: principal.into(),
            principal_columns: Vec::new(),
        }
    }

    pub fn references(mut self, principal_column: impl Into<String>) -> Self {
        self.principal_columns = vec![principal_column.into()];
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn covers(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// The principal property that `column` must match.
    ///
    /// Falls back to [`DEFAULT_KEY_PROPERTY`] when the referenced columns are
    /// not recorded.
    pub fn principal_column_for(&self, column: &str) -> &str {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|idx| self.principal_columns.get(idx))
            .map_or(DEFAULT_KEY_PROPERTY, String::as_str)
    }
}

/// Schema metadata for one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMeta {
    pub name: String,
    pub columns: Vec<ColumnMeta>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeyMeta>,
}

impl EntityMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    pub fn column(mut self, column: ColumnMeta) -> Self {
        self.columns.push(column);
        self
    }

    pub fn foreign_key(mut self, fk: ForeignKeyMeta) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    /// Find a column by its name.
    pub fn find_column(&self, name: &str) -> Option<&ColumnMeta> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Find the foreign key whose dependent columns include `column`.
    pub fn foreign_key_for(&self, column: &str) -> Option<&ForeignKeyMeta> {
        self.foreign_keys.iter().find(|fk| fk.covers(column))
    }

    pub fn primary_key(&self) -> impl Iterator<Item = &ColumnMeta> {
        self.columns.iter().filter(|c| c.primary_key)
    }
}

/// All entities known to a data context, keyed by entity name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaModel {
    #[serde(default)]
    entities: BTreeMap<String, EntityMeta>,
}

impl SchemaModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a model from its JSON description.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Add an entity, replacing any previous entity with the same name.
    pub fn with_entity(mut self, entity: EntityMeta) -> Self {
        self.insert(entity);
        self
    }

    pub fn insert(&mut self, entity: EntityMeta) {
        self.entities.insert(entity.name.clone(), entity);
    }

    pub fn find_entity(&self, name: &str) -> Option<&EntityMeta> {
        self.entities.get(name)
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntityMeta> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
