//! Schema-driven DTO validation.
//!
//! Derives validation rules for a data-transfer object from the schema
//! metadata of the entity it maps to, and evaluates them against a data
//! context. Pure logic: stores plug in through [`context::DataContext`] and
//! [`query::QuerySource`].

pub mod context;
pub mod dto;
pub mod error;
pub mod memory;
pub mod query;
pub mod schema;
pub mod types;
pub mod validation;
