//! Core Model Trait - Base definition for database entities
//!
//! A model is a plain struct that embeds a [`ModelState`] and declares its
//! persistable fields through [`Model::fields`]. Everything else (table name,
//! primary key column, protected and guarded sets, custom SQL) has a default
//! that can be overridden per type.

use crate::model::custom::{CustomInsert, CustomUpdate};
use crate::model::fields::Field;
use crate::model::metadata::default_table_name;
use crate::model::primary_key::PrimaryKey;
use crate::model::state::ModelState;

/// Core trait for database models
pub trait Model: Send + Sync + Sized + 'static {
    /// Persistable fields, in column order.
    ///
    /// Evaluated once per type by the metadata registry.
    fn fields() -> Vec<Field<Self>>;

    fn state(&self) -> &ModelState;

    fn state_mut(&mut self) -> &mut ModelState;

    /// Table name for this model
    ///
    /// Defaults to the lowercased type name with an `s` appended. There is no
    /// irregular plural handling: `Library` maps to `librarys`, so override it.
    fn table_name() -> String {
        default_table_name::<Self>()
    }

    /// Primary key column name
    fn primary_key_name() -> &'static str {
        "id"
    }

    /// Optional alias used when selecting from the table
    fn alias() -> Option<&'static str> {
        None
    }

    /// Fields the generic INSERT never binds. The primary key is always protected.
    fn protected_fields() -> &'static [&'static str] {
        &[]
    }

    /// Fields left out of [`crate::ModelMetadata::to_json`]
    fn guarded_fields() -> &'static [&'static str] {
        &[]
    }

    /// Custom INSERT capability, if this model provides one
    fn as_custom_insert(&self) -> Option<&dyn CustomInsert> {
        None
    }

    /// Custom UPDATE capability, if this model provides one
    fn as_custom_update(&self) -> Option<&dyn CustomUpdate> {
        None
    }

    /// Get the primary key value for this model instance
    fn primary_key(&self) -> Option<&PrimaryKey> {
        self.state().primary_key()
    }

    /// Set the primary key value; never recorded as a change
    fn set_primary_key(&mut self, key: Option<PrimaryKey>) {
        self.state_mut().set_primary_key(key);
    }

    fn is_persisted(&self) -> bool {
        self.state().is_persisted()
    }

    /// Record that `field` changed, optionally under a custom placeholder name
    fn record_change(&mut self, field: &str, placeholder: Option<&str>) {
        self.state_mut().record_change(field, placeholder);
    }

    fn reset_changes(&mut self) {
        self.state_mut().reset_changes();
    }

    /// Run `f` with change tracking suppressed.
    ///
    /// The lock flag is restored to its previous value when `f` returns,
    /// returns an error, or panics.
    fn with_lock<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        struct Restore<'a, M: Model> {
            model: &'a mut M,
            previous: bool,
        }

        impl<M: Model> Drop for Restore<'_, M> {
            fn drop(&mut self) {
                self.model.state_mut().set_locked(self.previous);
            }
        }

        let previous = self.state().is_locked();
        self.state_mut().set_locked(true);
        let mut guard = Restore {
            model: self,
            previous,
        };
        f(&mut *guard.model)
    }
}
