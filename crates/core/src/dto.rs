use serde::Serialize;
use serde_json::Value;

use crate::error::ValidationError;
use crate::types::Record;

/// A data-transfer object that can be validated.
///
/// `FIELDS` lists the declared properties by their serialized names; the
/// entity validator only binds rules to properties listed here.
pub trait Dto: Serialize {
    const FIELDS: &'static [&'static str];

    fn has_field(name: &str) -> bool {
        Self::FIELDS.contains(&name)
    }
}

/// Serialize a DTO into the record that rules are evaluated against.
pub fn to_record<D: Dto>(dto: &D) -> Result<Record, ValidationError> {
    match serde_json::to_value(dto)? {
        Value::Object(map) => Ok(map),
        Value::Null => Err(ValidationError::NotAnObject("null")),
        Value::Bool(_) => Err(ValidationError::NotAnObject("bool")),
        Value::Number(_) => Err(ValidationError::NotAnObject("number")),
        Value::String(_) => Err(ValidationError::NotAnObject("string")),
        Value::Array(_) => Err(ValidationError::NotAnObject("array")),
    }
}
