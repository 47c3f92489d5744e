//! Integration tests for the PostgreSQL context.
//!
//! Requires a reachable database (`DATABASE_URL`).
//! - Pool creation and health check
//! - Introspection of columns, unique indexes and foreign keys
//! - Uniqueness and foreign key rules issuing real queries

use serde::Serialize;
use sqlx::PgPool;

use dtoguard_core::context::DataContext;
use dtoguard_core::dto::Dto;
use dtoguard_core::schema::{Entity, ValueKind};
use dtoguard_core::validation::{EntityValidator, RuleKind};
use dtoguard_db::{create_pool_with, health_check, DbConfig, PgContext};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Members;

impl Entity for Members {
    const NAME: &'static str = "members";
}

struct Notes;

impl Entity for Notes {
    const NAME: &'static str = "notes";
}

#[derive(Serialize)]
struct CreateMember {
    handle: String,
    email: String,
}

impl Dto for CreateMember {
    const FIELDS: &'static [&'static str] = &["handle", "email"];
}

#[derive(Serialize)]
struct CreateNote {
    body: String,
    member_id: i64,
}

impl Dto for CreateNote {
    const FIELDS: &'static [&'static str] = &["body", "member_id"];
}

/// Same shape as `CreateNote`, with a key type wider than the column.
#[derive(Serialize)]
struct ImportNote {
    body: String,
    member_id: u64,
}

impl Dto for ImportNote {
    const FIELDS: &'static [&'static str] = &["body", "member_id"];
}

async fn setup(pool: &PgPool) -> PgContext {
    for statement in [
        "CREATE TABLE members (
             id BIGSERIAL PRIMARY KEY,
             handle VARCHAR(16) NOT NULL,
             email TEXT NOT NULL UNIQUE
         )",
        "CREATE TABLE notes (
             id BIGSERIAL PRIMARY KEY,
             body TEXT NOT NULL,
             member_id BIGINT NOT NULL REFERENCES members(id) ON DELETE CASCADE ON UPDATE CASCADE
         )",
        "INSERT INTO members (handle, email) VALUES ('ada', 'ada@example.com')",
    ] {
        sqlx::query(statement).execute(pool).await.unwrap();
    }

    PgContext::load(pool.clone(), "public").await.unwrap()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = false)]
async fn health_check_succeeds(pool: PgPool) {
    health_check(&pool).await.unwrap();
}

#[tokio::test]
async fn pool_from_environment_is_healthy() {
    let config = DbConfig::from_env().expect("DATABASE_URL must be set");
    let pool = create_pool_with(&config).await.unwrap();
    health_check(&pool).await.unwrap();
}

#[sqlx::test(migrations = false)]
async fn introspects_tables(pool: PgPool) {
    let ctx = setup(&pool).await;

    let members = ctx.model().find_entity("members").unwrap();
    let handle = members.find_column("handle").unwrap();
    assert_eq!(handle.kind, ValueKind::Text);
    assert_eq!(handle.max_length, Some(16));
    assert!(!handle.nullable);
    assert!(members.find_column("email").unwrap().unique);
    assert!(members.find_column("id").unwrap().primary_key);
    assert!(!members.find_column("id").unwrap().unique);

    let notes = ctx.model().find_entity("notes").unwrap();
    let fk = notes.foreign_key_for("member_id").unwrap();
    assert_eq!(fk.principal, "members");
    assert_eq!(fk.principal_column_for("member_id"), "id");
}

#[sqlx::test(migrations = false)]
async fn derives_rules_from_database(pool: PgPool) {
    let ctx = setup(&pool).await;
    let v = EntityValidator::<CreateMember, Members, _>::new(&ctx, &[], &[]).unwrap();

    assert_eq!(
        v.describe(),
        vec![
            ("handle".to_string(), RuleKind::NotNull),
            ("handle".to_string(), RuleKind::Length { min: 1, max: 16 }),
            ("email".to_string(), RuleKind::NotNull),
            (
                "email".to_string(),
                RuleKind::Unique {
                    entity: "members".to_string(),
                    property: "email".to_string()
                }
            ),
        ]
    );
}

#[sqlx::test(migrations = false)]
async fn uniqueness_queries_the_table(pool: PgPool) {
    let ctx = setup(&pool).await;
    let v = EntityValidator::<CreateMember, Members, _>::new(&ctx, &[], &[]).unwrap();

    let taken = v
        .validate(&CreateMember {
            handle: "imposter".to_string(),
            email: "ada@example.com".to_string(),
        })
        .await
        .unwrap();
    assert!(!taken.is_valid);
    assert_eq!(taken.errors[0].message, "email must be unique");

    let free = v
        .validate(&CreateMember {
            handle: "grace".to_string(),
            email: "grace@example.com".to_string(),
        })
        .await
        .unwrap();
    assert!(free.is_valid);
}

#[sqlx::test(migrations = false)]
async fn foreign_key_queries_the_principal(pool: PgPool) {
    let ctx = setup(&pool).await;
    let v = EntityValidator::<CreateNote, Notes, _>::new(&ctx, &[], &[]).unwrap();

    let known = v
        .validate(&CreateNote {
            body: "hello".to_string(),
            member_id: 1,
        })
        .await
        .unwrap();
    assert!(known.is_valid);

    let unknown = v
        .validate(&CreateNote {
            body: "hello".to_string(),
            member_id: 404,
        })
        .await
        .unwrap();
    assert!(!unknown.is_valid);
    assert_eq!(unknown.errors[0].field, "member_id");
    assert_eq!(unknown.errors[0].message, "id is not valid");
}

#[sqlx::test(migrations = false)]
async fn foreign_key_outside_the_key_range_is_invalid(pool: PgPool) {
    let ctx = setup(&pool).await;
    let v = EntityValidator::<ImportNote, Notes, _>::new(&ctx, &[], &[]).unwrap();

    let result = v
        .validate(&ImportNote {
            body: "hello".to_string(),
            member_id: u64::MAX,
        })
        .await
        .unwrap();
    assert!(!result.is_valid);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].field, "member_id");
    assert_eq!(result.errors[0].message, "id is not valid");
}
