/// Failures raised while deriving rules from entity metadata.
///
/// All variants are construction-time and fatal: a validator is either built
/// completely or not at all.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error(
        "Entity not found: {entity} couldn't be found on context, add {entity} to the context model"
    )]
    EntityNotFound { entity: String },

    #[error("Entity column not found: {column} isn't a foreign key property of {entity}")]
    EntityColumnNotFound { entity: String, column: String },

    #[error("Unmapped column: {entity}.{column} has no DTO property named {property}")]
    UnmappedColumn {
        entity: String,
        column: String,
        property: String,
    },
}

impl SchemaError {
    pub(crate) fn entity_not_found(entity: &str) -> Self {
        Self::EntityNotFound {
            entity: entity.to_string(),
        }
    }
}

/// Failures raised by a query source while answering a predicate.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("Entity mismatch: predicate targets {expected} but the source holds {actual}")]
    EntityMismatch { expected: String, actual: String },

    #[error("Unknown property: {entity} has no property {property}")]
    UnknownProperty { entity: String, property: String },

    #[error("Unsupported value for {property}: {reason}")]
    UnsupportedValue { property: String, reason: String },

    #[error("Query failed: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Failures raised while validating a DTO instance.
///
/// Rule violations are not errors; they are reported through
/// [`ValidationResult`](crate::validation::rules::ValidationResult).
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Failed to serialize DTO: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("DTO must serialize to an object, got {0}")]
    NotAnObject(&'static str),

    #[error(transparent)]
    Query(#[from] QueryError),
}
