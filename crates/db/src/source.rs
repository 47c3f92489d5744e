//! Query source over a PostgreSQL table.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use dtoguard_core::error::QueryError;
use dtoguard_core::query::{ensure_entity, Predicate, QuerySource};
use dtoguard_core::schema::{EntityMeta, ValueKind};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

/// A candidate value converted to the type its column is compared as.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    NaiveTimestamp(NaiveDateTime),
    /// Compared against the column cast to text.
    AsText(String),
}

impl BoundValue {
    /// Whether the column must be cast to text for the comparison.
    pub fn casts_column(&self) -> bool {
        matches!(self, Self::AsText(_))
    }
}

/// Convert a JSON candidate into the bind type for a column of `kind`.
///
/// Returns `Ok(None)` for a scalar no row of such a column can hold, such as
/// `1.5` or `u64::MAX` against an integer column: the predicate can never
/// match and no query is needed.
pub fn bind_value(
    property: &str,
    kind: ValueKind,
    value: &Value,
) -> Result<Option<BoundValue>, QueryError> {
    let unsupported = |reason: &str| QueryError::UnsupportedValue {
        property: property.to_string(),
        reason: reason.to_string(),
    };

    let bound = match (kind, value) {
        (_, Value::Null) => return Err(unsupported("null never equals a stored value")),
        (_, Value::Array(_) | Value::Object(_)) => {
            return Err(unsupported("expected a scalar value"))
        }
        (ValueKind::Text, Value::String(s)) => Some(BoundValue::Text(s.clone())),
        (ValueKind::Integer, Value::Number(n)) => integer_of(n).map(BoundValue::Integer),
        (ValueKind::Integer, Value::String(s)) => s.trim().parse().ok().map(BoundValue::Integer),
        (ValueKind::Float, Value::Number(n)) => n.as_f64().map(BoundValue::Float),
        (ValueKind::Boolean, Value::Bool(b)) => Some(BoundValue::Boolean(*b)),
        (ValueKind::Uuid, Value::String(s)) => Uuid::parse_str(s).ok().map(BoundValue::Uuid),
        (ValueKind::Timestamp, Value::String(s)) => timestamp_of(s),
        (ValueKind::Integer | ValueKind::Float | ValueKind::Uuid | ValueKind::Timestamp, _) => {
            None
        }
        (ValueKind::Boolean, _) => None,
        (_, Value::String(s)) => Some(BoundValue::AsText(s.clone())),
        (_, Value::Number(n)) => Some(BoundValue::AsText(n.to_string())),
        (_, Value::Bool(b)) => Some(BoundValue::AsText(b.to_string())),
    };
    Ok(bound)
}

/// An `i64` equal to `n`, if there is one. Integral floats such as `2.0` count.
fn integer_of(n: &serde_json::Number) -> Option<i64> {
    if let Some(i) = n.as_i64() {
        return Some(i);
    }
    if n.is_u64() {
        return None;
    }
    let f = n.as_f64()?;
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

/// RFC 3339 timestamps bind with their offset, offset-less ones as naive.
fn timestamp_of(s: &str) -> Option<BoundValue> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(BoundValue::Timestamp(ts.with_timezone(&Utc)));
    }
    s.parse::<NaiveDateTime>()
        .ok()
        .map(BoundValue::NaiveTimestamp)
}

/// Quote an SQL identifier, doubling embedded quotes.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// `SELECT EXISTS` over rows of `schema.table` where `column` equals `$1`.
pub fn exists_sql(schema: &str, table: &str, column: &str, cast_to_text: bool) -> String {
    let lhs = if cast_to_text {
        format!("{}::text", quote_ident(column))
    } else {
        quote_ident(column)
    };
    format!(
        "SELECT EXISTS (SELECT 1 FROM {}.{} WHERE {lhs} = $1)",
        quote_ident(schema),
        quote_ident(table)
    )
}

/// The rows of one table, answering predicates with `SELECT EXISTS`.
#[derive(Debug, Clone)]
pub struct PgTable {
    pool: PgPool,
    schema: String,
    meta: EntityMeta,
}

impl PgTable {
    pub fn new(pool: PgPool, schema: impl Into<String>, meta: EntityMeta) -> Self {
        Self {
            pool,
            schema: schema.into(),
            meta,
        }
    }

    pub fn meta(&self) -> &EntityMeta {
        &self.meta
    }
}

#[async_trait]
impl QuerySource for PgTable {
    fn entity(&self) -> &str {
        &self.meta.name
    }

    async fn any(&self, predicate: &Predicate) -> Result<bool, QueryError> {
        ensure_entity(self, predicate)?;

        let Predicate::Equals {
            property, value, ..
        } = predicate;
        let column = self
            .meta
            .find_column(property)
            .ok_or_else(|| QueryError::UnknownProperty {
                entity: self.meta.name.clone(),
                property: property.clone(),
            })?;

        let Some(bound) = bind_value(property, column.kind, value)? else {
            tracing::debug!(
                entity = %self.meta.name,
                property = %property,
                %value,
                "Candidate outside the column's domain, no row can match"
            );
            return Ok(false);
        };
        let sql = exists_sql(&self.schema, &self.meta.name, &column.name, bound.casts_column());
        tracing::debug!(%sql, entity = %self.meta.name, property = %property, "Issuing existence query");

        let query = sqlx::query_scalar::<_, bool>(&sql);
        let query = match bound {
            BoundValue::Text(v) | BoundValue::AsText(v) => query.bind(v),
            BoundValue::Integer(v) => query.bind(v),
            BoundValue::Float(v) => query.bind(v),
            BoundValue::Boolean(v) => query.bind(v),
            BoundValue::Uuid(v) => query.bind(v),
            BoundValue::Timestamp(v) => query.bind(v),
            BoundValue::NaiveTimestamp(v) => query.bind(v),
        };

        query
            .fetch_one(&self.pool)
            .await
            .map_err(|e| QueryError::Backend(Box::new(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn quotes_identifiers() {
        assert_eq!(quote_ident("users"), "\"users\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn builds_exists_sql() {
        assert_eq!(
            exists_sql("public", "users", "email", false),
            "SELECT EXISTS (SELECT 1 FROM \"public\".\"users\" WHERE \"email\" = $1)"
        );
        assert_eq!(
            exists_sql("public", "orders", "total", true),
            "SELECT EXISTS (SELECT 1 FROM \"public\".\"orders\" WHERE \"total\"::text = $1)"
        );
    }

    #[test]
    fn binds_by_column_kind() {
        assert_eq!(
            bind_value("email", ValueKind::Text, &json!("a@b.com")).unwrap(),
            Some(BoundValue::Text("a@b.com".to_string()))
        );
        assert_eq!(
            bind_value("id", ValueKind::Integer, &json!(42)).unwrap(),
            Some(BoundValue::Integer(42))
        );
        assert_eq!(
            bind_value("id", ValueKind::Integer, &json!("42")).unwrap(),
            Some(BoundValue::Integer(42))
        );
        assert_eq!(
            bind_value("id", ValueKind::Integer, &json!(7.0)).unwrap(),
            Some(BoundValue::Integer(7))
        );
        assert_eq!(
            bind_value("active", ValueKind::Boolean, &json!(true)).unwrap(),
            Some(BoundValue::Boolean(true))
        );
        assert_eq!(
            bind_value("total", ValueKind::Numeric, &json!(9.5)).unwrap(),
            Some(BoundValue::AsText("9.5".to_string()))
        );
    }

    #[test]
    fn parses_uuid_and_timestamp() {
        let id = "67e55044-10b1-426f-9247-bb680e5fe0c8";
        assert_eq!(
            bind_value("ref", ValueKind::Uuid, &json!(id)).unwrap(),
            Some(BoundValue::Uuid(Uuid::parse_str(id).unwrap()))
        );
        assert_matches!(
            bind_value("at", ValueKind::Timestamp, &json!("2024-05-01T10:00:00+02:00")).unwrap(),
            Some(BoundValue::Timestamp(ts)) if ts.to_rfc3339() == "2024-05-01T08:00:00+00:00"
        );
    }

    #[test]
    fn binds_offsetless_timestamps_as_naive() {
        let at = chrono::NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let value = serde_json::to_value(at).unwrap();
        assert_eq!(value, json!("2024-05-01T10:00:00"));

        assert_eq!(
            bind_value("at", ValueKind::Timestamp, &value).unwrap(),
            Some(BoundValue::NaiveTimestamp(at))
        );
    }

    #[test]
    fn values_no_row_can_hold_bind_to_nothing() {
        for value in [json!(u64::MAX), json!(1.5), json!("forty-two"), json!(true)] {
            assert_eq!(bind_value("id", ValueKind::Integer, &value).unwrap(), None);
        }
        assert_eq!(
            bind_value("ref", ValueKind::Uuid, &json!("not-a-uuid")).unwrap(),
            None
        );
        assert_eq!(
            bind_value("at", ValueKind::Timestamp, &json!("yesterday")).unwrap(),
            None
        );
    }

    #[test]
    fn rejects_null_and_composite_values() {
        assert_matches!(
            bind_value("tags", ValueKind::Json, &json!(["a"])),
            Err(QueryError::UnsupportedValue { .. })
        );
        assert_matches!(
            bind_value("meta", ValueKind::Text, &json!({"a": 1})),
            Err(QueryError::UnsupportedValue { .. })
        );
        assert_matches!(
            bind_value("id", ValueKind::Integer, &Value::Null),
            Err(QueryError::UnsupportedValue { .. })
        );
    }
}
