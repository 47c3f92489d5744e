//! Validation rule and result types.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::query::SharedSource;

/// Whether a query-backed rule passes when rows match or when none do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryExpectation {
    /// Passes when no row matches (uniqueness).
    NoMatch,
    /// Passes when at least one row matches (reference existence).
    AnyMatch,
}

pub(crate) type MustFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

pub(crate) enum Check {
    NotNull,
    Length {
        min: usize,
        max: usize,
    },
    Must(MustFn),
    Query {
        source: SharedSource,
        entity: String,
        property: String,
        expect: QueryExpectation,
    },
}

impl fmt::Debug for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotNull => f.write_str("NotNull"),
            Self::Length { min, max } => f
                .debug_struct("Length")
                .field("min", min)
                .field("max", max)
                .finish(),
            Self::Must(_) => f.write_str("Must(..)"),
            Self::Query {
                source,
                entity,
                property,
                expect,
            } => f
                .debug_struct("Query")
                .field("source", source)
                .field("entity", entity)
                .field("property", property)
                .field("expect", expect)
                .finish(),
        }
    }
}

/// A single check bound to a DTO property.
#[derive(Debug)]
pub struct Rule {
    pub(crate) field: String,
    pub(crate) check: Check,
    pub(crate) message: Option<String>,
}

impl Rule {
    pub(crate) fn new(field: String, check: Check) -> Self {
        Self {
            field,
            check,
            message: None,
        }
    }

    /// The DTO property this rule validates.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Custom failure message, if one was attached.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn kind(&self) -> RuleKind {
        match &self.check {
            Check::NotNull => RuleKind::NotNull,
            Check::Length { min, max } => RuleKind::Length {
                min: *min,
                max: *max,
            },
            Check::Must(_) => RuleKind::Must,
            Check::Query {
                entity,
                property,
                expect: QueryExpectation::NoMatch,
                ..
            } => RuleKind::Unique {
                entity: entity.clone(),
                property: property.clone(),
            },
            Check::Query {
                entity,
                property,
                expect: QueryExpectation::AnyMatch,
                ..
            } => RuleKind::ForeignKey {
                entity: entity.clone(),
                property: property.clone(),
            },
        }
    }

    pub fn rule_type(&self) -> &'static str {
        match &self.check {
            Check::NotNull => "not_null",
            Check::Length { .. } => "length",
            Check::Must(_) => "must",
            Check::Query {
                expect: QueryExpectation::NoMatch,
                ..
            } => "unique",
            Check::Query {
                expect: QueryExpectation::AnyMatch,
                ..
            } => "foreign_key",
        }
    }
}

/// Inspectable description of a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleKind {
    NotNull,
    Length { min: usize, max: usize },
    Must,
    Unique { entity: String, property: String },
    ForeignKey { entity: String, property: String },
}

/// Aggregated result of evaluating all rules against one DTO.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<FieldViolation>,
}

impl ValidationResult {
    /// Violations reported for `field`.
    pub fn errors_for<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a FieldViolation> {
        self.errors.iter().filter(move |e| e.field == field)
    }
}

/// A single field-level rule violation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    pub rule_type: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}
