use std::sync::Arc;

use dtoguard_core::context::DataContext;
use dtoguard_core::query::SharedSource;
use dtoguard_core::schema::SchemaModel;
use sqlx::PgPool;

use crate::introspect::load_model;
use crate::source::PgTable;

/// A [`DataContext`] over one PostgreSQL schema.
///
/// The schema model is introspected once, when the context is loaded; tables
/// created afterwards are invisible until the context is reloaded.
#[derive(Debug, Clone)]
pub struct PgContext {
    pool: PgPool,
    schema: String,
    model: SchemaModel,
}

impl PgContext {
    /// Introspect `schema` and build a context for its tables.
    pub async fn load(pool: PgPool, schema: impl Into<String>) -> Result<Self, sqlx::Error> {
        let schema = schema.into();
        let model = load_model(&pool, &schema).await?;
        Ok(Self {
            pool,
            schema,
            model,
        })
    }

    /// Build a context from a model obtained elsewhere.
    pub fn from_model(pool: PgPool, schema: impl Into<String>, model: SchemaModel) -> Self {
        Self {
            pool,
            schema: schema.into(),
            model,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }
}

impl DataContext for PgContext {
    fn model(&self) -> &SchemaModel {
        &self.model
    }

    fn set_for(&self, entity: &str) -> Option<SharedSource> {
        let meta = self.model.find_entity(entity)?;
        Some(Arc::new(PgTable::new(
            self.pool.clone(),
            self.schema.clone(),
            meta.clone(),
        )))
    }
}
