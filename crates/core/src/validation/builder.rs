//! Fluent rule registration.

use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::Value;

use super::evaluator::evaluate_rules;
use super::rules::{Check, QueryExpectation, Rule, RuleKind, ValidationResult};
use crate::dto::{to_record, Dto};
use crate::error::ValidationError;
use crate::query::SharedSource;

/// An ordered set of rules over the properties of `D`.
pub struct Validator<D> {
    rules: Vec<Rule>,
    _dto: PhantomData<fn(&D)>,
}

impl<D> Default for Validator<D> {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            _dto: PhantomData,
        }
    }
}

impl<D> std::fmt::Debug for Validator<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator")
            .field("rules", &self.rules)
            .finish()
    }
}

impl<D: Dto> Validator<D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start attaching rules to `field`.
    pub fn rule_for(&mut self, field: impl Into<String>) -> RuleBuilder<'_> {
        RuleBuilder {
            rules: &mut self.rules,
            field: field.into(),
            last: None,
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// `(field, kind)` for every registered rule, in registration order.
    pub fn describe(&self) -> Vec<(String, RuleKind)> {
        self.rules
            .iter()
            .map(|r| (r.field.clone(), r.kind()))
            .collect()
    }

    /// Evaluate every rule against `dto`.
    ///
    /// All rules run; a failing rule does not stop the ones after it. Query
    /// failures abort validation and are returned as errors.
    pub async fn validate(&self, dto: &D) -> Result<ValidationResult, ValidationError> {
        let record = to_record(dto)?;
        Ok(evaluate_rules(&self.rules, &record).await?)
    }
}

/// Attaches rules to one property of a [`Validator`].
pub struct RuleBuilder<'a> {
    rules: &'a mut Vec<Rule>,
    field: String,
    last: Option<usize>,
}

impl RuleBuilder<'_> {
    pub fn field(&self) -> &str {
        &self.field
    }

    fn push(mut self, check: Check) -> Self {
        self.rules.push(Rule::new(self.field.clone(), check));
        self.last = Some(self.rules.len() - 1);
        self
    }

    /// Fails when the value is null or absent.
    pub fn not_null(self) -> Self {
        self.push(Check::NotNull)
    }

    /// Fails when a string value has fewer than `min` or more than `max`
    /// characters. Null and non-string values pass.
    pub fn length(self, min: usize, max: usize) -> Self {
        self.push(Check::Length { min, max })
    }

    /// Fails when `predicate` returns false. Absent values are passed as null.
    pub fn must<F>(self, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.push(Check::Must(Arc::new(predicate)))
    }

    /// Checks `item.<property> == value` against `source` at validation time.
    pub fn must_query(
        self,
        source: SharedSource,
        entity: impl Into<String>,
        property: impl Into<String>,
        expect: QueryExpectation,
    ) -> Self {
        self.push(Check::Query {
            source,
            entity: entity.into(),
            property: property.into(),
            expect,
        })
    }

    /// Replace the failure message of the most recently attached rule.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        if let Some(idx) = self.last {
            self.rules[idx].message = Some(message.into());
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Signup {
        name: Option<String>,
        age: u32,
    }

    impl Dto for Signup {
        const FIELDS: &'static [&'static str] = &["name", "age"];
    }

    #[test]
    fn rules_register_in_order() {
        let mut v = Validator::<Signup>::new();
        v.rule_for("name").not_null().length(1, 10);
        v.rule_for("age").must(|a| a.as_u64().is_some_and(|a| a >= 18));

        assert_eq!(
            v.describe(),
            vec![
                ("name".to_string(), RuleKind::NotNull),
                ("name".to_string(), RuleKind::Length { min: 1, max: 10 }),
                ("age".to_string(), RuleKind::Must),
            ]
        );
    }

    #[test]
    fn with_message_applies_to_last_rule() {
        let mut v = Validator::<Signup>::new();
        v.rule_for("name")
            .not_null()
            .length(1, 10)
            .with_message("name is too long");

        assert_eq!(v.rules()[0].message(), None);
        assert_eq!(v.rules()[1].message(), Some("name is too long"));
    }

    #[test]
    fn with_message_without_rule_is_a_no_op() {
        let mut v = Validator::<Signup>::new();
        v.rule_for("name").with_message("ignored");
        assert!(v.rules().is_empty());
    }

    #[tokio::test]
    async fn validate_reports_every_failure() {
        let mut v = Validator::<Signup>::new();
        v.rule_for("name").not_null();
        v.rule_for("age")
            .must(|a| a.as_u64().is_some_and(|a| a >= 18))
            .with_message("must be an adult");

        let result = v
            .validate(&Signup {
                name: None,
                age: 12,
            })
            .await
            .unwrap();

        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 2);
        assert_eq!(result.errors[0].rule_type, "not_null");
        assert_eq!(result.errors[1].message, "must be an adult");
    }
}
