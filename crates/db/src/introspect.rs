//! Schema introspection.
//!
//! Reads tables, columns, primary keys, single-column unique indexes and
//! foreign keys from `information_schema` and `pg_catalog`, then assembles
//! them into a [`SchemaModel`]. Assembly is pure so it can be tested without
//! a database.

use std::collections::BTreeMap;

use dtoguard_core::schema::{ColumnMeta, EntityMeta, ForeignKeyMeta, SchemaModel, ValueKind};
use sqlx::PgPool;

/// A row from `information_schema.columns`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ColumnRow {
    pub table_name: String,
    pub column_name: String,
    pub is_nullable: String,
    pub data_type: String,
    pub character_maximum_length: Option<i32>,
}

/// One dependent/principal column pair of a foreign key constraint.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ForeignKeyRow {
    pub constraint_name: String,
    pub table_name: String,
    pub column_name: String,
    pub principal_table: String,
    pub principal_column: String,
}

/// Raw catalog rows for one schema.
#[derive(Debug, Clone, Default)]
pub struct CatalogRows {
    pub tables: Vec<String>,
    pub columns: Vec<ColumnRow>,
    /// `(table, column)` pairs belonging to primary keys.
    pub primary_keys: Vec<(String, String)>,
    /// `(table, column)` pairs covered by a single-column unique index.
    pub unique_columns: Vec<(String, String)>,
    /// Foreign key column pairs, ordered by constraint then key position.
    pub foreign_keys: Vec<ForeignKeyRow>,
}

/// Load the schema model for every base table in `schema`.
pub async fn load_model(pool: &PgPool, schema: &str) -> Result<SchemaModel, sqlx::Error> {
    let rows = fetch_catalog(pool, schema).await?;
    let model = assemble_model(rows);
    tracing::info!(schema, entities = model.len(), "Introspected schema model");
    Ok(model)
}

/// Fetch the raw catalog rows for `schema`.
pub async fn fetch_catalog(pool: &PgPool, schema: &str) -> Result<CatalogRows, sqlx::Error> {
    let tables: Vec<String> = sqlx::query_scalar(
        "SELECT table_name::text \
         FROM information_schema.tables \
         WHERE table_schema = $1 \
           AND table_type = 'BASE TABLE' \
           AND table_name != '_sqlx_migrations' \
         ORDER BY table_name",
    )
    .bind(schema)
    .fetch_all(pool)
    .await?;

    let columns = sqlx::query_as::<_, ColumnRow>(
        "SELECT table_name::text AS table_name, \
                column_name::text AS column_name, \
                is_nullable::text AS is_nullable, \
                data_type::text AS data_type, \
                character_maximum_length::int AS character_maximum_length \
         FROM information_schema.columns \
         WHERE table_schema = $1 \
         ORDER BY table_name, ordinal_position",
    )
    .bind(schema)
    .fetch_all(pool)
    .await?;

    let primary_keys: Vec<(String, String)> = sqlx::query_as(
        "SELECT tc.table_name::text, kcu.column_name::text \
         FROM information_schema.table_constraints tc \
         JOIN information_schema.key_column_usage kcu \
             ON tc.constraint_name = kcu.constraint_name \
             AND tc.table_schema = kcu.table_schema \
             AND tc.table_name = kcu.table_name \
         WHERE tc.constraint_type = 'PRIMARY KEY' \
           AND tc.table_schema = $1",
    )
    .bind(schema)
    .fetch_all(pool)
    .await?;

    let unique_columns: Vec<(String, String)> = sqlx::query_as(
        "SELECT t.relname::text, a.attname::text \
         FROM pg_index i \
         JOIN pg_class t ON t.oid = i.indrelid \
         JOIN pg_namespace n ON n.oid = t.relnamespace \
         JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = i.indkey[0] \
         WHERE n.nspname = $1 \
           AND i.indisunique \
           AND NOT i.indisprimary \
           AND i.indnatts = 1",
    )
    .bind(schema)
    .fetch_all(pool)
    .await?;

    let foreign_keys = sqlx::query_as::<_, ForeignKeyRow>(
        "SELECT con.conname::text AS constraint_name, \
                src.relname::text AS table_name, \
                sa.attname::text AS column_name, \
                dst.relname::text AS principal_table, \
                da.attname::text AS principal_column \
         FROM pg_constraint con \
         JOIN pg_class src ON src.oid = con.conrelid \
         JOIN pg_namespace n ON n.oid = src.relnamespace \
         JOIN pg_class dst ON dst.oid = con.confrelid \
         CROSS JOIN LATERAL unnest(con.conkey, con.confkey) \
             WITH ORDINALITY AS k(src_attnum, dst_attnum, ord) \
         JOIN pg_attribute sa ON sa.attrelid = src.oid AND sa.attnum = k.src_attnum \
         JOIN pg_attribute da ON da.attrelid = dst.oid AND da.attnum = k.dst_attnum \
         WHERE con.contype = 'f' \
           AND n.nspname = $1 \
         ORDER BY con.conname, k.ord",
    )
    .bind(schema)
    .fetch_all(pool)
    .await?;

    Ok(CatalogRows {
        tables,
        columns,
        primary_keys,
        unique_columns,
        foreign_keys,
    })
}

/// Map a PostgreSQL `data_type` to the value kind rules reason about.
pub fn value_kind(data_type: &str) -> ValueKind {
    match data_type {
        "text" | "character varying" | "character" | "citext" => ValueKind::Text,
        "smallint" | "integer" | "bigint" => ValueKind::Integer,
        "real" | "double precision" => ValueKind::Float,
        "numeric" => ValueKind::Numeric,
        "boolean" => ValueKind::Boolean,
        "uuid" => ValueKind::Uuid,
        "timestamp with time zone" | "timestamp without time zone" => ValueKind::Timestamp,
        "date" => ValueKind::Date,
        "json" | "jsonb" => ValueKind::Json,
        "bytea" => ValueKind::Bytes,
        _ => ValueKind::Other,
    }
}

/// Assemble catalog rows into a schema model.
///
/// Rows for tables not listed in `tables` (views, other schemas) are dropped.
pub fn assemble_model(rows: CatalogRows) -> SchemaModel {
    let mut entities: BTreeMap<String, EntityMeta> = rows
        .tables
        .iter()
        .map(|t| (t.clone(), EntityMeta::new(t.clone())))
        .collect();

    let contains = |pairs: &[(String, String)], table: &str, column: &str| {
        pairs.iter().any(|(t, c)| t == table && c == column)
    };

    for row in rows.columns {
        let Some(entity) = entities.get_mut(&row.table_name) else {
            continue;
        };
        let kind = value_kind(&row.data_type);
        let mut column = ColumnMeta::new(row.column_name.clone(), kind);
        column.nullable = row.is_nullable == "YES";
        column.max_length = row
            .character_maximum_length
            .and_then(|len| usize::try_from(len).ok());
        if contains(&rows.primary_keys, &row.table_name, &row.column_name) {
            column = column.primary_key();
        }
        column.unique = contains(&rows.unique_columns, &row.table_name, &row.column_name);
        column.foreign_key = rows
            .foreign_keys
            .iter()
            .any(|fk| fk.table_name == row.table_name && fk.column_name == row.column_name);
        entity.columns.push(column);
    }

    for row in rows.foreign_keys {
        let Some(entity) = entities.get_mut(&row.table_name) else {
            continue;
        };
        let existing = entity
            .foreign_keys
            .iter_mut()
            .find(|fk| fk.name.as_deref() == Some(row.constraint_name.as_str()));
        match existing {
            Some(fk) => {
                fk.columns.push(row.column_name);
                fk.principal_columns.push(row.principal_column);
            }
            None => entity.foreign_keys.push(
                ForeignKeyMeta::new(row.column_name, row.principal_table)
                    .references(row.principal_column)
                    .named(row.constraint_name),
            ),
        }
    }

    entities
        .into_values()
        .fold(SchemaModel::new(), SchemaModel::with_entity)
}
