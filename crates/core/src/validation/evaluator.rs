//! Rule evaluator.
//!
//! Not-null, length and `must` checks are pure; query-backed rules issue one
//! round trip to their source per evaluation.

use serde_json::Value;
use validator::ValidateLength;

use super::rules::{Check, FieldViolation, QueryExpectation, Rule, ValidationResult};
use crate::error::QueryError;
use crate::query::{Predicate, SharedSource};
use crate::types::Record;

/// Evaluate all rules against a single serialized DTO.
pub async fn evaluate_rules(
    rules: &[Rule],
    record: &Record,
) -> Result<ValidationResult, QueryError> {
    let mut errors = Vec::new();

    for rule in rules {
        if let Some(violation) = evaluate_single_rule(rule, record).await? {
            errors.push(violation);
        }
    }

    Ok(ValidationResult {
        is_valid: errors.is_empty(),
        errors,
    })
}

async fn evaluate_single_rule(
    rule: &Rule,
    record: &Record,
) -> Result<Option<FieldViolation>, QueryError> {
    let value = record.get(&rule.field);

    let passed = match &rule.check {
        Check::NotNull => evaluate_not_null(value),
        Check::Length { min, max } => evaluate_length(value, *min, *max),
        Check::Must(predicate) => predicate(value.unwrap_or(&Value::Null)),
        Check::Query {
            source,
            entity,
            property,
            expect,
        } => evaluate_query(source, entity, property, *expect, value).await?,
    };

    Ok((!passed).then(|| violation(rule, value)))
}

fn violation(rule: &Rule, value: Option<&Value>) -> FieldViolation {
    FieldViolation {
        field: rule.field.clone(),
        rule_type: rule.rule_type().to_string(),
        message: rule
            .message
            .clone()
            .unwrap_or_else(|| default_message(rule, value)),
        value: value.cloned(),
    }
}

fn default_message(rule: &Rule, value: Option<&Value>) -> String {
    let field = &rule.field;
    match &rule.check {
        Check::NotNull => format!("{field} must not be null"),
        Check::Length { min, max } => {
            let len = value
                .and_then(Value::as_str)
                .map_or(0, |s| s.chars().count());
            format!("{field} must be between {min} and {max} characters, got {len}")
        }
        Check::Must(_) => format!("{field} does not satisfy the required condition"),
        Check::Query {
            property,
            expect: QueryExpectation::NoMatch,
            ..
        } => format!("{property} must be unique"),
        Check::Query {
            property,
            expect: QueryExpectation::AnyMatch,
            ..
        } => format!("{property} is not valid"),
    }
}

fn evaluate_not_null(value: Option<&Value>) -> bool {
    !matches!(value, None | Some(Value::Null))
}

fn evaluate_length(value: Option<&Value>, min: usize, max: usize) -> bool {
    match value.and_then(Value::as_str) {
        Some(s) => s.validate_length(Some(min as u64), Some(max as u64), None),
        None => true,
    }
}

async fn evaluate_query(
    source: &SharedSource,
    entity: &str,
    property: &str,
    expect: QueryExpectation,
    value: Option<&Value>,
) -> Result<bool, QueryError> {
    // Presence is the not-null rule's concern.
    let value = match value {
        None | Some(Value::Null) => return Ok(true),
        Some(v) => v.clone(),
    };

    let predicate = Predicate::equals(entity, property, value);
    let found = source.any(&predicate).await?;
    tracing::debug!(%predicate, found, "Evaluated query rule");

    Ok(match expect {
        QueryExpectation::NoMatch => !found,
        QueryExpectation::AnyMatch => found,
    })
}
