//! Column-to-property mapping for the entity validator.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// How entity columns are matched to DTO properties.
///
/// Columns map to the property of the same name unless renamed. Ignored
/// columns are skipped whatever their mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingConfig {
    /// Entity column names to skip.
    #[serde(default)]
    pub ignore: HashSet<String>,
    /// Entity column name -> DTO property name.
    #[serde(default)]
    pub rename: HashMap<String, String>,
    /// Fail construction when a non-ignored column has no DTO property,
    /// instead of skipping it.
    #[serde(default)]
    pub require_all_columns: bool,
}

impl MappingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ignore(mut self, column: impl Into<String>) -> Self {
        self.ignore.insert(column.into());
        self
    }

    pub fn rename(mut self, column: impl Into<String>, property: impl Into<String>) -> Self {
        self.rename.insert(column.into(), property.into());
        self
    }

    pub fn require_all_columns(mut self, required: bool) -> Self {
        self.require_all_columns = required;
        self
    }

    pub fn is_ignored(&self, column: &str) -> bool {
        self.ignore.contains(column)
    }

    /// The DTO property that `column` binds to.
    pub fn property_for<'a>(&'a self, column: &'a str) -> &'a str {
        self.rename.get(column).map_or(column, String::as_str)
    }
}
