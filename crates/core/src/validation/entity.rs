//! Validators derived from entity schema metadata.
//!
//! [`EntityValidator`] walks the columns of an entity once, at construction,
//! and registers the rules its metadata implies on the matching DTO
//! properties:
//!
//! - non-nullable, non-key columns get a not-null rule
//! - text columns with a max length `L` get a length rule `[1, L]`
//! - columns under a unique index get a uniqueness query against the entity
//! - foreign key columns get an existence query against the principal entity

use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};

use super::builder::Validator;
use super::mapping::MappingConfig;
use super::query_rules::QueryRuleExt;
use crate::context::DataContext;
use crate::dto::Dto;
use crate::error::SchemaError;
use crate::schema::{ColumnMeta, Entity, EntityMeta};

/// A [`Validator`] for DTO `D` whose rules come from entity `E` in context `C`.
///
/// Dereferences to the underlying validator, so further rules can be added
/// with [`Validator::rule_for`] after construction.
pub struct EntityValidator<D, E, C> {
    validator: Validator<D>,
    _entity: PhantomData<fn() -> (E, C)>,
}

impl<D, E, C> EntityValidator<D, E, C>
where
    D: Dto,
    E: Entity,
    C: DataContext,
{
    /// Build from an ignore list and a column -> property rename table.
    ///
    /// # Errors
    ///
    /// - [`SchemaError::EntityNotFound`] if `E`, or the principal of one of its
    ///   foreign keys, has no metadata or collection in `context`.
    /// - [`SchemaError::EntityColumnNotFound`] if a column flagged as a
    ///   foreign key is not covered by any foreign key of `E`.
    pub fn new(
        context: &C,
        ignore: &[&str],
        mappings: &[(&str, &str)],
    ) -> Result<Self, SchemaError> {
        let config = MappingConfig {
            ignore: ignore.iter().map(|c| (*c).to_string()).collect(),
            rename: mappings
                .iter()
                .map(|(c, p)| ((*c).to_string(), (*p).to_string()))
                .collect(),
            require_all_columns: false,
        };
        Self::with_config(context, &config)
    }

    /// Build from a full [`MappingConfig`].
    pub fn with_config(context: &C, config: &MappingConfig) -> Result<Self, SchemaError> {
        let entity = context
            .model()
            .find_entity(E::NAME)
            .ok_or_else(|| SchemaError::entity_not_found(E::NAME))?;

        let mut validator = Validator::<D>::new();
        for column in &entity.columns {
            attach_column_rules(&mut validator, context, entity, column, config)?;
        }

        tracing::debug!(
            entity = E::NAME,
            rules = validator.rules().len(),
            "Built entity validator"
        );

        Ok(Self {
            validator,
            _entity: PhantomData,
        })
    }

    /// Start a builder with an empty [`MappingConfig`].
    pub fn builder() -> EntityValidatorBuilder<D, E, C> {
        EntityValidatorBuilder {
            config: MappingConfig::new(),
            _target: PhantomData,
        }
    }

    pub fn into_inner(self) -> Validator<D> {
        self.validator
    }
}

/// Collects mapping options, then builds an [`EntityValidator`].
pub struct EntityValidatorBuilder<D, E, C> {
    config: MappingConfig,
    _target: PhantomData<fn() -> (D, E, C)>,
}

impl<D, E, C> EntityValidatorBuilder<D, E, C>
where
    D: Dto,
    E: Entity,
    C: DataContext,
{
    pub fn ignore(mut self, column: impl Into<String>) -> Self {
        self.config = self.config.ignore(column);
        self
    }

    pub fn map(mut self, column: impl Into<String>, property: impl Into<String>) -> Self {
        self.config = self.config.rename(column, property);
        self
    }

    pub fn require_all_columns(mut self, required: bool) -> Self {
        self.config = self.config.require_all_columns(required);
        self
    }

    pub fn config(&self) -> &MappingConfig {
        &self.config
    }

    /// See [`EntityValidator::new`] for the errors.
    pub fn build(self, context: &C) -> Result<EntityValidator<D, E, C>, SchemaError> {
        EntityValidator::with_config(context, &self.config)
    }
}

fn attach_column_rules<D: Dto, C: DataContext>(
    validator: &mut Validator<D>,
    context: &C,
    entity: &EntityMeta,
    column: &ColumnMeta,
    config: &MappingConfig,
) -> Result<(), SchemaError> {
    let property = config.property_for(&column.name);

    if config.is_ignored(&column.name) {
        tracing::debug!(entity = %entity.name, column = %column.name, "Column ignored");
        return Ok(());
    }
    if !D::has_field(property) {
        if config.require_all_columns {
            return Err(SchemaError::UnmappedColumn {
                entity: entity.name.clone(),
                column: column.name.clone(),
                property: property.to_string(),
            });
        }
        tracing::debug!(
            entity = %entity.name,
            column = %column.name,
            property,
            "No matching DTO property, column skipped"
        );
        return Ok(());
    }

    if !column.nullable && !column.primary_key {
        validator.rule_for(property).not_null();
        tracing::debug!(property, "Attached not-null rule");
    }

    if column.kind.is_string_like() {
        match column.max_length {
            Some(max) if max >= 1 => {
                validator.rule_for(property).length(1, max);
                tracing::debug!(property, max, "Attached length rule");
            }
            Some(max) => {
                tracing::warn!(
                    entity = %entity.name,
                    column = %column.name,
                    max,
                    "Declared max length below 1, no length rule attached"
                );
            }
            None => {}
        }
    }

    if column.unique {
        let source = context
            .set_for(&entity.name)
            .ok_or_else(|| SchemaError::entity_not_found(&entity.name))?;
        validator
            .rule_for(property)
            .is_unique_for(source, &entity.name, &column.name);
        tracing::debug!(property, column = %column.name, "Attached uniqueness rule");
    }

    if column.foreign_key {
        let fk = entity.foreign_key_for(&column.name).ok_or_else(|| {
            SchemaError::EntityColumnNotFound {
                entity: entity.name.clone(),
                column: column.name.clone(),
            }
        })?;
        let source = context
            .set_for(&fk.principal)
            .ok_or_else(|| SchemaError::entity_not_found(&fk.principal))?;
        let key = fk.principal_column_for(&column.name);
        validator
            .rule_for(property)
            .is_foreign_key_for(source, &fk.principal, key);
        tracing::debug!(
            property,
            principal = %fk.principal,
            key,
            "Attached foreign key rule"
        );
    }

    Ok(())
}

impl<D, E, C> Deref for EntityValidator<D, E, C> {
    type Target = Validator<D>;

    fn deref(&self) -> &Self::Target {
        &self.validator
    }
}

impl<D, E, C> DerefMut for EntityValidator<D, E, C> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.validator
    }
}

impl<D, E, C> std::fmt::Debug for EntityValidator<D, E, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityValidator")
            .field("validator", &self.validator)
            .finish()
    }
}
