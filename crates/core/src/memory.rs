//! In-memory data context.
//!
//! Holds rows as serialized records and answers predicates with a linear scan.
//! Useful for tests and for embedding validators where the reference data
//! already lives in process.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::context::DataContext;
use crate::error::{QueryError, SchemaError};
use crate::query::{ensure_entity, Predicate, QuerySource, SharedSource};
use crate::schema::{EntityMeta, SchemaModel};
use crate::types::Record;

/// Rows of one entity, shared between the context and any rules using them.
#[derive(Debug)]
pub struct InMemorySet {
    meta: EntityMeta,
    rows: RwLock<Vec<Record>>,
}

impl InMemorySet {
    fn new(meta: EntityMeta) -> Self {
        Self {
            meta,
            rows: RwLock::new(Vec::new()),
        }
    }

    pub async fn insert(&self, row: Record) {
        self.rows.write().await.push(row);
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }
}

#[async_trait]
impl QuerySource for InMemorySet {
    fn entity(&self) -> &str {
        &self.meta.name
    }

    async fn any(&self, predicate: &Predicate) -> Result<bool, QueryError> {
        ensure_entity(self, predicate)?;
        if let Some(property) = predicate
            .properties()
            .find(|p| self.meta.find_column(p).is_none())
        {
            return Err(QueryError::UnknownProperty {
                entity: self.meta.name.clone(),
                property: property.to_string(),
            });
        }

        let rows = self.rows.read().await;
        Ok(rows.iter().any(|row| predicate.matches(row)))
    }
}

/// A [`DataContext`] backed by process memory.
///
/// Every entity in the model gets a set, unless it was registered with
/// [`InMemoryContext::without_set`].
#[derive(Debug, Default)]
pub struct InMemoryContext {
    model: SchemaModel,
    sets: HashMap<String, Arc<InMemorySet>>,
}

impl InMemoryContext {
    pub fn new(model: SchemaModel) -> Self {
        let sets = model
            .entities()
            .map(|meta| (meta.name.clone(), Arc::new(InMemorySet::new(meta.clone()))))
            .collect();
        Self { model, sets }
    }

    /// Drop the collection for `entity` while keeping its metadata.
    pub fn without_set(mut self, entity: &str) -> Self {
        self.sets.remove(entity);
        self
    }

    /// Direct access to an entity's rows, for seeding.
    pub fn rows(&self, entity: &str) -> Option<&Arc<InMemorySet>> {
        self.sets.get(entity)
    }

    /// Append a row to `entity`.
    pub async fn insert(&self, entity: &str, row: Record) -> Result<(), SchemaError> {
        let set = self
            .sets
            .get(entity)
            .ok_or_else(|| SchemaError::entity_not_found(entity))?;
        set.insert(row).await;
        Ok(())
    }
}

impl DataContext for InMemoryContext {
    fn model(&self) -> &SchemaModel {
        &self.model
    }

    fn set_for(&self, entity: &str) -> Option<SharedSource> {
        self.sets
            .get(entity)
            .map(|set| Arc::clone(set) as SharedSource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnMeta, Entity, ValueKind};
    use assert_matches::assert_matches;
    use serde_json::json;

    struct Users;

    impl Entity for Users {
        const NAME: &'static str = "users";
    }

    fn context() -> InMemoryContext {
        InMemoryContext::new(
            SchemaModel::new().with_entity(
                EntityMeta::new("users")
                    .column(ColumnMeta::new("id", ValueKind::Integer).primary_key())
                    .column(ColumnMeta::new("email", ValueKind::Text)),
            ),
        )
    }

    fn user(id: i64, email: &str) -> Record {
        json!({"id": id, "email": email})
            .as_object()
            .cloned()
            .unwrap()
    }

    #[tokio::test]
    async fn any_finds_inserted_row() {
        let ctx = context();
        ctx.insert("users", user(1, "a@b.com")).await.unwrap();

        let set = ctx.set::<Users>().unwrap();
        let hit = Predicate::equals("users", "email", json!("a@b.com"));
        let miss = Predicate::equals("users", "email", json!("x@y.com"));
        assert!(set.any(&hit).await.unwrap());
        assert!(!set.any(&miss).await.unwrap());
    }

    #[tokio::test]
    async fn any_rejects_other_entity() {
        let ctx = context();
        let set = ctx.set_for("users").unwrap();
        let err = set
            .any(&Predicate::equals("orders", "id", json!(1)))
            .await
            .unwrap_err();
        assert_matches!(err, QueryError::EntityMismatch { .. });
    }

    #[tokio::test]
    async fn any_rejects_unknown_property() {
        let ctx = context();
        let set = ctx.set_for("users").unwrap();
        let err = set
            .any(&Predicate::equals("users", "nickname", json!("x")))
            .await
            .unwrap_err();
        assert_matches!(err, QueryError::UnknownProperty { property, .. } if property == "nickname");
    }

    #[tokio::test]
    async fn insert_into_unknown_entity_fails() {
        let ctx = context();
        let err = ctx.insert("orders", Record::new()).await.unwrap_err();
        assert_matches!(err, SchemaError::EntityNotFound { entity } if entity == "orders");
    }

    #[test]
    fn without_set_keeps_metadata() {
        let ctx = context().without_set("users");
        assert!(ctx.model().find_entity("users").is_some());
        assert!(ctx.set_for("users").is_none());
    }
}
