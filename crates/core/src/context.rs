//! The data context capability.
//!
//! A context is the aggregate root that owns a [`SchemaModel`] and hands out
//! one query source per entity. The entity may be named at runtime
//! ([`DataContext::set_for`]) or at compile time ([`DataContext::set`]); the
//! typed form dispatches through [`Entity::NAME`].

use crate::query::SharedSource;
use crate::schema::{Entity, SchemaModel};

pub trait DataContext {
    /// Schema metadata for every entity the context knows.
    fn model(&self) -> &SchemaModel;

    /// The queryable collection for `entity`, or `None` if the context has no
    /// collection for it.
    fn set_for(&self, entity: &str) -> Option<SharedSource>;

    /// Typed counterpart of [`DataContext::set_for`].
    fn set<E: Entity>(&self) -> Option<SharedSource>
    where
        Self: Sized,
    {
        self.set_for(E::NAME)
    }
}
