//! PostgreSQL adapter for schema-driven DTO validation.
//!
//! Introspects a database schema into a [`dtoguard_core::schema::SchemaModel`]
//! and answers query predicates with `SELECT EXISTS` statements.

use sqlx::postgres::PgPoolOptions;

pub mod config;
pub mod context;
pub mod introspect;
pub mod source;

pub use config::DbConfig;
pub use context::PgContext;
pub use source::PgTable;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL, with the default pool size.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    create_pool_with(&DbConfig::new(database_url)).await
}

/// Create a connection pool sized by `config`.
pub async fn create_pool_with(config: &DbConfig) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
}

/// Verify the pool can reach the database.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await
        .map(|_| ())
}
