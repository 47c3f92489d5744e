//! Query predicates and the query source capability.
//!
//! Rules that need to look at stored data build a [`Predicate`] and hand it to
//! a [`QuerySource`], which answers whether any row satisfies it. Each store
//! interprets predicates in its own terms (a row scan, a SQL `EXISTS`).

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::QueryError;
use crate::types::Record;

/// A condition over the rows of one entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `item.<property> == <value>` for rows of `entity`.
    Equals {
        entity: String,
        property: String,
        value: Value,
    },
}

impl Predicate {
    pub fn equals(entity: impl Into<String>, property: impl Into<String>, value: Value) -> Self {
        Self::Equals {
            entity: entity.into(),
            property: property.into(),
            value,
        }
    }

    /// The entity whose rows this predicate ranges over.
    pub fn entity(&self) -> &str {
        match self {
            Self::Equals { entity, .. } => entity,
        }
    }

    /// Every property the predicate reads.
    pub fn properties(&self) -> impl Iterator<Item = &str> {
        match self {
            Self::Equals { property, .. } => std::iter::once(property.as_str()),
        }
    }

    /// Evaluate against a single in-memory row. Absent properties read as null.
    pub fn matches(&self, row: &Record) -> bool {
        match self {
            Self::Equals {
                property, value, ..
            } => values_equal(row.get(property).unwrap_or(&Value::Null), value),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equals {
                entity,
                property,
                value,
            } => write!(f, "{entity}: item.{property} == {value}"),
        }
    }
}

/// Equality that treats numbers by value, so `1` equals `1.0`.
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => {
            if let (Some(l), Some(r)) = (l.as_i64(), r.as_i64()) {
                l == r
            } else if let (Some(l), Some(r)) = (l.as_u64(), r.as_u64()) {
                l == r
            } else {
                l.as_f64() == r.as_f64()
            }
        }
        _ => left == right,
    }
}

/// A queryable collection of rows for one entity.
#[async_trait]
pub trait QuerySource: Send + Sync + fmt::Debug {
    /// Name of the entity whose rows this source holds.
    fn entity(&self) -> &str;

    /// Whether any row satisfies `predicate`.
    async fn any(&self, predicate: &Predicate) -> Result<bool, QueryError>;
}

/// Query sources are shared between a context and every rule that uses them.
pub type SharedSource = Arc<dyn QuerySource>;

/// Reject predicates aimed at a different entity than the source holds.
pub fn ensure_entity(source: &dyn QuerySource, predicate: &Predicate) -> Result<(), QueryError> {
    if predicate.entity() == source.entity() {
        Ok(())
    } else {
        Err(QueryError::EntityMismatch {
            expected: predicate.entity().to_string(),
            actual: source.entity().to_string(),
        })
    }
}
