/// A serialized row or DTO instance, keyed by property name.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Identifying property assumed for a principal entity when a foreign key
/// does not name its referenced column.
pub const DEFAULT_KEY_PROPERTY: &str = "id";
