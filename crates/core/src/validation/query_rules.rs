//! Uniqueness and reference-existence rules backed by a query source.
//!
//! Each rule builds `item.<property> == <candidate>` over the source's entity
//! when the rule runs. Uniqueness passes when no row matches; a foreign key
//! passes when some row does. The `_for` variants take the entity name at
//! runtime, for callers that only learn it from schema metadata.

use super::builder::RuleBuilder;
use super::rules::QueryExpectation;
use crate::query::SharedSource;
use crate::schema::Entity;
use crate::types::DEFAULT_KEY_PROPERTY;

pub trait QueryRuleExt: Sized {
    fn is_unique_for(self, source: SharedSource, entity: &str, property: &str) -> Self;

    fn is_foreign_key_for(self, source: SharedSource, entity: &str, property: &str) -> Self;

    fn is_unique<E: Entity>(self, source: SharedSource, property: &str) -> Self {
        self.is_unique_for(source, E::NAME, property)
    }

    fn is_foreign_key<E: Entity>(self, source: SharedSource, property: &str) -> Self {
        self.is_foreign_key_for(source, E::NAME, property)
    }

    /// Foreign key against the principal's default key property.
    fn references<E: Entity>(self, source: SharedSource) -> Self {
        self.is_foreign_key::<E>(source, DEFAULT_KEY_PROPERTY)
    }
}

impl QueryRuleExt for RuleBuilder<'_> {
    fn is_unique_for(self, source: SharedSource, entity: &str, property: &str) -> Self {
        self.must_query(source, entity, property, QueryExpectation::NoMatch)
            .with_message(format!("{property} must be unique"))
    }

    fn is_foreign_key_for(self, source: SharedSource, entity: &str, property: &str) -> Self {
        self.must_query(source, entity, property, QueryExpectation::AnyMatch)
            .with_message(format!("{property} is not valid"))
    }
}
