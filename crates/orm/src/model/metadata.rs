//! Model metadata and the per-type metadata registry
//!
//! [`ModelMetadata`] is everything the engine needs to know about a model type:
//! table, primary key column, alias, the ordered field registry and the
//! protected/guarded sets. It is computed once per type by a
//! [`MetadataRegistry`] and shared read-only afterwards.

use std::any::{Any, TypeId};
use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value as JsonValue;
use tracing::{debug, trace};

use crate::backends::{DatabaseValue, ParamKind, Row};
use crate::error::{ModelError, ModelResult};
use crate::model::core_trait::Model;
use crate::model::fields::Field;
use crate::model::primary_key::PrimaryKey;

/// Type name without module path or generic arguments
pub(crate) fn simple_type_name<M>() -> &'static str {
    let full = std::any::type_name::<M>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Default table name: lowercased simple type name plus `s`
pub fn default_table_name<M>() -> String {
    format!("{}s", simple_type_name::<M>().to_lowercase())
}

/// Static description of a model type
pub struct ModelMetadata<M: Model> {
    model_name: &'static str,
    table: String,
    alias: Option<&'static str>,
    primary_key: &'static str,
    fields: Vec<Field<M>>,
    protected: HashSet<&'static str>,
    guarded: HashSet<&'static str>,
}

impl<M: Model> ModelMetadata<M> {
    pub fn build() -> Self {
        let primary_key = M::primary_key_name();
        let mut protected: HashSet<&'static str> = M::protected_fields().iter().copied().collect();
        protected.insert(primary_key);

        Self {
            model_name: simple_type_name::<M>(),
            table: M::table_name(),
            alias: M::alias(),
            primary_key,
            fields: M::fields(),
            protected,
            guarded: M::guarded_fields().iter().copied().collect(),
        }
    }

    pub fn model_name(&self) -> &'static str {
        self.model_name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn alias(&self) -> Option<&'static str> {
        self.alias
    }

    pub fn primary_key(&self) -> &'static str {
        self.primary_key
    }

    /// Field names in declaration order
    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(Field::name)
    }

    pub fn field(&self, name: &str) -> Option<&Field<M>> {
        self.fields.iter().find(|f| f.name() == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Declared parameter kind of a field, `String` when undeclared
    pub fn kind_for(&self, name: &str) -> ParamKind {
        self.field(name).map(Field::param_kind).unwrap_or_default()
    }

    pub fn is_protected(&self, name: &str) -> bool {
        self.protected.contains(name)
    }

    pub fn is_guarded(&self, name: &str) -> bool {
        self.guarded.contains(name)
    }

    /// Fields the generic INSERT writes: every field that is not protected
    pub fn insertable_fields(&self) -> impl Iterator<Item = &Field<M>> + '_ {
        self.fields.iter().filter(|f| !self.is_protected(f.name()))
    }

    /// Read a field (or the primary key column) by name
    pub fn get(&self, model: &M, name: &str) -> ModelResult<DatabaseValue> {
        if name == self.primary_key {
            return Ok(model
                .primary_key()
                .map(PrimaryKey::to_value)
                .unwrap_or(DatabaseValue::Null));
        }
        self.field(name)
            .map(|field| field.read(model))
            .ok_or_else(|| ModelError::unknown_field(self.model_name, name))
    }

    /// Write a field by name and record the change.
    ///
    /// The primary key column is routed to the model state and never recorded.
    pub fn set(&self, model: &mut M, name: &str, value: impl Into<DatabaseValue>) -> ModelResult<()> {
        let value = value.into();
        if name == self.primary_key {
            let key = PrimaryKey::from_value(value)?;
            model.set_primary_key(key);
            return Ok(());
        }

        let field = self
            .field(name)
            .ok_or_else(|| ModelError::unknown_field(self.model_name, name))?;
        field.write(model, value)?;
        model.record_change(field.name(), None);
        Ok(())
    }

    /// Assign several fields at once, recording each as changed
    pub fn fill<I, K, V>(&self, model: &mut M, values: I) -> ModelResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<DatabaseValue>,
    {
        for (name, value) in values {
            self.set(model, name.as_ref(), value)?;
        }
        Ok(())
    }

    /// Build a model from a row without marking anything as changed.
    ///
    /// Columns the model does not know are ignored.
    pub fn hydrate(&self, row: Row) -> ModelResult<M>
    where
        M: Default,
    {
        let mut model = M::default();
        model.with_lock(|model| {
            for (column, value) in row {
                if column == self.primary_key || self.has_field(&column) {
                    self.set(model, &column, value)?;
                } else {
                    trace!("Skipping column '{}' unknown to {}", column, self.model_name);
                }
            }
            Ok::<_, ModelError>(())
        })?;
        Ok(model)
    }

    /// Copy database-assigned values of a freshly inserted row into `model`.
    ///
    /// Applies the primary key and every registered, non-protected column.
    /// Runs under the lock so nothing becomes a pending change. Returns the
    /// number of columns applied.
    pub(crate) fn reconcile(&self, model: &mut M, row: Row) -> ModelResult<usize> {
        model.with_lock(|model| {
            let mut applied = 0;
            for (column, value) in row {
                let known = column == self.primary_key
                    || (self.has_field(&column) && !self.is_protected(&column));
                if !known {
                    trace!("Not reconciling column '{}' of '{}'", column, self.table);
                    continue;
                }
                self.set(model, &column, value)?;
                applied += 1;
            }
            Ok(applied)
        })
    }

    /// JSON object of the model without its guarded fields
    pub fn to_json(&self, model: &M) -> JsonValue {
        let mut map = serde_json::Map::new();
        if !self.is_guarded(self.primary_key) {
            let key = model
                .primary_key()
                .map(PrimaryKey::to_value)
                .unwrap_or(DatabaseValue::Null);
            map.insert(self.primary_key.to_string(), key.to_json());
        }
        for field in self.fields.iter().filter(|f| !self.is_guarded(f.name())) {
            map.insert(field.name().to_string(), field.read(model).to_json());
        }
        JsonValue::Object(map)
    }
}

impl<M: Model> std::fmt::Debug for ModelMetadata<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelMetadata")
            .field("model", &self.model_name)
            .field("table", &self.table)
            .field("primary_key", &self.primary_key)
            .field("fields", &self.fields)
            .finish()
    }
}

/// Lazily populated, per-type metadata cache
///
/// Each type's metadata is built at most once, even under concurrent access:
/// the entry's shard stays locked while it is being built.
#[derive(Default)]
pub struct MetadataRegistry {
    entries: DashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<M: Model>(&self) -> ModelResult<Arc<ModelMetadata<M>>> {
        let erased = self
            .entries
            .entry(TypeId::of::<M>())
            .or_insert_with(|| {
                let metadata = ModelMetadata::<M>::build();
                debug!(
                    "Resolved metadata for {}: table '{}', {} fields",
                    metadata.model_name(),
                    metadata.table(),
                    metadata.fields.len()
                );
                Arc::new(metadata) as Arc<dyn Any + Send + Sync>
            })
            .value()
            .clone();

        erased.downcast::<ModelMetadata<M>>().map_err(|_| {
            ModelError::Configuration(format!(
                "metadata registry entry for {} has an unexpected type",
                simple_type_name::<M>()
            ))
        })
    }

    pub fn contains<M: Model>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<M>())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for MetadataRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataRegistry")
            .field("types", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::state::ModelState;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static FIELD_LISTINGS: AtomicUsize = AtomicUsize::new(0);

    #[derive(Debug, Default)]
    struct Library {
        state: ModelState,
        name: String,
        secret: Option<String>,
        visits: i64,
    }

    impl Model for Library {
        fn fields() -> Vec<Field<Self>> {
            FIELD_LISTINGS.fetch_add(1, Ordering::SeqCst);
            vec![
                Field::new("name", |l: &Library| l.name.clone().into(), |l, v| {
                    l.name = v.extract()?;
                    Ok(())
                }),
                Field::new("secret", |l: &Library| l.secret.clone().into(), |l, v| {
                    l.secret = v.extract()?;
                    Ok(())
                }),
                Field::new("visits", |l: &Library| l.visits.into(), |l, v| {
                    l.visits = v.extract()?;
                    Ok(())
                })
                .kind(ParamKind::Int),
            ]
        }

        fn state(&self) -> &ModelState {
            &self.state
        }

        fn state_mut(&mut self) -> &mut ModelState {
            &mut self.state
        }

        fn protected_fields() -> &'static [&'static str] {
            &["visits"]
        }

        fn guarded_fields() -> &'static [&'static str] {
            &["secret"]
        }
    }

    mod nested {
        pub struct Wrapper<T>(pub T);
    }

    #[test]
    fn test_default_table_name_is_naive_plural() {
        assert_eq!(default_table_name::<Library>(), "librarys");
        assert_eq!(default_table_name::<nested::Wrapper<Library>>(), "wrappers");
    }

    #[test]
    fn test_metadata_is_built_once_per_type() {
        let registry = MetadataRegistry::new();
        let before = FIELD_LISTINGS.load(Ordering::SeqCst);

        let first = registry.get::<Library>().unwrap();
        let second = registry.get::<Library>().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(FIELD_LISTINGS.load(Ordering::SeqCst), before + 1);
        assert_eq!(registry.len(), 1);
        assert!(registry.contains::<Library>());
    }

    #[test]
    fn test_metadata_sets() {
        let meta = ModelMetadata::<Library>::build();

        assert_eq!(meta.table(), "librarys");
        assert_eq!(meta.primary_key(), "id");
        assert!(meta.is_protected("id"));
        assert!(meta.is_protected("visits"));
        assert!(meta.is_guarded("secret"));
        assert_eq!(meta.kind_for("visits"), ParamKind::Int);
        assert_eq!(meta.kind_for("name"), ParamKind::String);
        assert_eq!(
            meta.insertable_fields().map(Field::name).collect::<Vec<_>>(),
            vec!["name", "secret"]
        );
    }

    #[test]
    fn test_set_records_change_and_primary_key_does_not() {
        let meta = ModelMetadata::<Library>::build();
        let mut library = Library::default();

        meta.set(&mut library, "name", "Central").unwrap();
        meta.set(&mut library, "id", 4i64).unwrap();

        assert_eq!(library.name, "Central");
        assert_eq!(library.primary_key(), Some(&PrimaryKey::Integer(4)));
        assert_eq!(
            library.state().changes().fields().collect::<Vec<_>>(),
            vec!["name"]
        );
    }

    #[test]
    fn test_unknown_field() {
        let meta = ModelMetadata::<Library>::build();
        let mut library = Library::default();

        let err = meta.set(&mut library, "nickname", "x").unwrap_err();
        assert_eq!(err, ModelError::unknown_field("Library", "nickname"));
        assert!(meta.get(&library, "nickname").is_err());
    }

    #[test]
    fn test_type_mismatch_leaves_no_change() {
        let meta = ModelMetadata::<Library>::build();
        let mut library = Library::default();

        let err = meta.set(&mut library, "visits", "many").unwrap_err();
        assert!(matches!(err, ModelError::TypeMismatch { .. }));
        assert!(!library.state().is_dirty());
    }

    #[test]
    fn test_hydrate_marks_nothing_changed() {
        let meta = ModelMetadata::<Library>::build();
        let row = Row::new()
            .with("id", 3i64)
            .with("name", "Central")
            .with("visits", 12i64)
            .with("opened_at", "1901-01-01");

        let library = meta.hydrate(row).unwrap();
        assert_eq!(library.primary_key(), Some(&PrimaryKey::Integer(3)));
        assert_eq!(library.name, "Central");
        assert_eq!(library.visits, 12);
        assert!(!library.state().is_dirty());
        assert!(!library.state().is_locked());
    }

    #[test]
    fn test_reconcile_skips_protected_columns() {
        let meta = ModelMetadata::<Library>::build();
        let mut library = Library {
            name: "Central".into(),
            visits: 1,
            ..Default::default()
        };

        let row = Row::new()
            .with("id", 9i64)
            .with("name", "Central")
            .with("visits", 500i64);
        let applied = meta.reconcile(&mut library, row).unwrap();

        assert_eq!(applied, 2);
        assert_eq!(library.primary_key(), Some(&PrimaryKey::Integer(9)));
        assert_eq!(library.visits, 1);
        assert!(!library.state().is_dirty());
    }

    #[test]
    fn test_to_json_omits_guarded_fields() {
        let meta = ModelMetadata::<Library>::build();
        let mut library = Library {
            name: "Central".into(),
            secret: Some("vault".into()),
            visits: 2,
            ..Default::default()
        };
        library.set_primary_key(Some(PrimaryKey::Integer(1)));

        assert_eq!(
            meta.to_json(&library),
            serde_json::json!({"id": 1, "name": "Central", "visits": 2})
        );
    }

    #[test]
    fn test_fill_records_every_field() {
        let meta = ModelMetadata::<Library>::build();
        let mut library = Library::default();

        meta.fill(&mut library, [("name", DatabaseValue::from("Central")), ("visits", 3i64.into())])
            .unwrap();

        assert_eq!(library.visits, 3);
        assert_eq!(library.state().changes().len(), 2);
    }
}
