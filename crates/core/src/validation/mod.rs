//! Rule registration and evaluation.
//!
//! [`builder::Validator`] holds the rules for a DTO type, [`query_rules`] adds
//! the data-backed checks, and [`entity::EntityValidator`] derives a full rule
//! set from entity schema metadata.

pub mod builder;
pub mod entity;
pub mod evaluator;
pub mod mapping;
pub mod query_rules;
pub mod rules;

pub use builder::{RuleBuilder, Validator};
pub use entity::{EntityValidator, EntityValidatorBuilder};
pub use mapping::MappingConfig;
pub use query_rules::QueryRuleExt;
pub use rules::{FieldViolation, QueryExpectation, Rule, RuleKind, ValidationResult};
