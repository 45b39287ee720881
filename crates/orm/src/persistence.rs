//! Persistence engine
//!
//! [`Persistence`] owns the driver, the per-type metadata registry and the
//! observer registries. A save runs as one transaction:
//!
//! 1. the model's pending changes are taken as a snapshot;
//! 2. a new model is INSERTed, a persisted one UPDATEd, with either the
//!    model's custom SQL or generated SQL;
//! 3. observers are notified around the statement, then the transaction commits;
//! 4. after an insert the fresh row is read back and its database-assigned
//!    values (primary key, defaults) are copied into the model under the lock;
//!    a row without a primary key value fails the save.
//!
//! If anything before the commit fails, the transaction is rolled back and the
//! snapshot is put back on the model so the save can be retried.

use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::backends::Driver;
use crate::binding::Bindings;
use crate::error::{ModelError, ModelResult};
use crate::events::{ModelEvent, ModelObserver};
use crate::model::custom::CustomStatement;
use crate::model::{ChangeSet, MetadataRegistry, Model, ModelMetadata, PrimaryKey};
use crate::observers::ObserverManager;
use crate::query::{FluentQuery, QueryOperator, Select};
use crate::transaction::Transaction;

/// What a successful save did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Inserted,
    Updated,
    /// Persisted model without pending changes; nothing was sent
    Unchanged,
}

/// A statement ready for the driver
struct Statement {
    sql: String,
    bindings: Bindings,
}

pub struct Persistence {
    driver: Arc<dyn Driver>,
    metadata: MetadataRegistry,
    observers: ObserverManager,
}

impl Persistence {
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        Self {
            driver,
            metadata: MetadataRegistry::new(),
            observers: ObserverManager::new(),
        }
    }

    pub fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }

    /// Register an observer for model type `M`
    pub fn observe<M: Model>(&mut self, observer: impl ModelObserver<M> + 'static) -> &mut Self {
        self.observers.register_for_model::<M>(Box::new(observer));
        self
    }

    pub fn metadata<M: Model>(&self) -> ModelResult<Arc<ModelMetadata<M>>> {
        self.metadata.get::<M>()
    }

    /// Insert or update `model`, propagating every error.
    pub async fn save_or_fail<M: Model>(&self, model: &mut M) -> ModelResult<SaveOutcome> {
        let meta = self.metadata::<M>()?;
        let changes = model.state_mut().take_changes();
        let inserting = !model.is_persisted();

        if !inserting && model.as_custom_update().is_none() && changes.is_empty() {
            debug!("No pending changes on {}, skipping save", meta.model_name());
            return Ok(SaveOutcome::Unchanged);
        }

        if let Err(err) = self.write(&meta, model, &changes).await {
            model.state_mut().restore_changes(changes);
            return Err(err);
        }

        if inserting {
            self.reconcile(&meta, model).await?;
            Ok(SaveOutcome::Inserted)
        } else {
            Ok(SaveOutcome::Updated)
        }
    }

    /// Like [`save_or_fail`](Self::save_or_fail), but driver failures become `Ok(false)`.
    ///
    /// Programming errors (malformed custom SQL, unknown fields, type
    /// mismatches, reconciliation failures) still propagate.
    pub async fn save<M: Model>(&self, model: &mut M) -> ModelResult<bool> {
        match self.save_or_fail(model).await {
            Ok(_) => Ok(true),
            Err(err) if err.is_driver_failure() => {
                warn!("Save failed in the database: {}", err);
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    /// Delete the row behind `model` and mark the model as new again.
    ///
    /// Returns the number of rows the driver reports as affected.
    pub async fn delete<M: Model>(&self, model: &mut M) -> ModelResult<u64> {
        let meta = self.metadata::<M>()?;
        let key = model
            .primary_key()
            .cloned()
            .ok_or(ModelError::MissingPrimaryKey)?;

        let pk = meta.primary_key();
        let mut bindings = Bindings::new();
        bindings.bind_inferred(format!(":{}", pk), key.to_value());
        let statement = Statement {
            sql: format!("DELETE FROM {} WHERE {} = :{}", meta.table(), pk, pk),
            bindings,
        };

        let mut tx = Transaction::begin(self.driver()).await?;
        let outcome = self.run_delete(&mut tx, &statement, model).await;
        let affected = Self::finish(tx, outcome).await?;

        debug!("Deleted {} {} ({} row(s))", meta.model_name(), key, affected);
        model.set_primary_key(None);
        model.reset_changes();
        Ok(affected)
    }

    /// Start a SELECT over the model's table, using its alias if it has one
    pub fn query<M: Model>(&self) -> ModelResult<Select> {
        let meta = self.metadata::<M>()?;
        Ok(Select::with_alias(meta.table(), meta.alias()))
    }

    /// Run `query` and hydrate every returned row into an `M`
    pub async fn fetch_all<M, Q>(&self, query: &Q) -> ModelResult<Vec<M>>
    where
        M: Model + Default,
        Q: FluentQuery + ?Sized,
    {
        let meta = self.metadata::<M>()?;
        query.validate()?;
        let sql = query.to_sql();
        debug!("Fetching {} with: {}", meta.model_name(), sql);
        let rows = self.driver.fetch_all(&sql, query.bindings()).await?;
        rows.into_iter().map(|row| meta.hydrate(row)).collect()
    }

    /// Run `query` and hydrate the first row, if any.
    ///
    /// A query without a LIMIT is sent with `LIMIT 1`.
    pub async fn fetch_first<M, Q>(&self, query: &Q) -> ModelResult<Option<M>>
    where
        M: Model + Default,
        Q: FluentQuery + ?Sized,
    {
        let meta = self.metadata::<M>()?;
        query.validate()?;
        let mut sql = query.to_sql();
        if query.row_limit().is_none() {
            sql.push_str(" LIMIT 1");
        }
        let rows = self.driver.fetch_all(&sql, query.bindings()).await?;
        rows.into_iter().next().map(|row| meta.hydrate(row)).transpose()
    }

    /// Load a model by primary key
    pub async fn find<M>(&self, key: impl Into<PrimaryKey>) -> ModelResult<Option<M>>
    where
        M: Model + Default,
    {
        let meta = self.metadata::<M>()?;
        let key: PrimaryKey = key.into();
        let query = self
            .query::<M>()?
            .where_(meta.primary_key(), QueryOperator::Equal, key.to_value());
        self.fetch_first(&query).await
    }

    /// Load a model by primary key, failing with `NotFound` when it does not exist
    pub async fn find_or_fail<M>(&self, key: impl Into<PrimaryKey>) -> ModelResult<M>
    where
        M: Model + Default,
    {
        match self.find::<M>(key).await? {
            Some(model) => Ok(model),
            None => Err(ModelError::NotFound(self.metadata::<M>()?.table().to_string())),
        }
    }

    /// JSON projection of `model` without its guarded fields
    pub fn to_json<M: Model>(&self, model: &M) -> ModelResult<JsonValue> {
        Ok(self.metadata::<M>()?.to_json(model))
    }

    async fn write<M: Model>(&self, meta: &ModelMetadata<M>, model: &M, changes: &ChangeSet) -> ModelResult<()> {
        let mut tx = Transaction::begin(self.driver()).await?;
        let outcome = self.run_save(&mut tx, meta, model, changes).await;
        Self::finish(tx, outcome).await
    }

    async fn run_save<M: Model>(
        &self,
        tx: &mut Transaction,
        meta: &ModelMetadata<M>,
        model: &M,
        changes: &ChangeSet,
    ) -> ModelResult<()> {
        let (before, after) = if model.is_persisted() {
            (ModelEvent::Updating, ModelEvent::Updated)
        } else {
            (ModelEvent::Creating, ModelEvent::Created)
        };

        let statement = if model.is_persisted() {
            Self::update_statement(meta, model, changes)?
        } else {
            Self::insert_statement(meta, model)?
        };
        self.observers.notify(before, model).await;
        tx.execute(&statement.sql, &statement.bindings).await?;
        self.observers.notify(after, model).await;
        Ok(())
    }

    async fn run_delete<M: Model>(&self, tx: &mut Transaction, statement: &Statement, model: &M) -> ModelResult<u64> {
        self.observers.notify(ModelEvent::Deleting, model).await;
        let affected = tx.execute(&statement.sql, &statement.bindings).await?;
        self.observers.notify(ModelEvent::Deleted, model).await;
        Ok(affected)
    }

    /// Commit on success; roll back on failure and return the statement error.
    async fn finish<T>(tx: Transaction, outcome: ModelResult<T>) -> ModelResult<T> {
        match outcome {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!("Rollback after failed statement also failed: {}", rollback_err);
                }
                Err(err)
            }
        }
    }

    fn insert_statement<M: Model>(meta: &ModelMetadata<M>, model: &M) -> ModelResult<Statement> {
        if let Some(custom) = model.as_custom_insert() {
            let CustomStatement { sql, bindings } = CustomStatement::from_insert(meta.table(), custom)?;
            return Ok(Statement { sql, bindings });
        }

        let mut columns = Vec::new();
        let mut bindings = Bindings::new();
        for field in meta.insertable_fields() {
            columns.push(field.name());
            bindings.bind(format!(":{}", field.name()), field.read(model), field.param_kind());
        }

        let sql = if columns.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", meta.table())
        } else {
            format!(
                "INSERT INTO {}({}) VALUES ({})",
                meta.table(),
                columns.join(", "),
                bindings.placeholders().collect::<Vec<_>>().join(", ")
            )
        };
        Ok(Statement { sql, bindings })
    }

    fn update_statement<M: Model>(
        meta: &ModelMetadata<M>,
        model: &M,
        changes: &ChangeSet,
    ) -> ModelResult<Statement> {
        if let Some(custom) = model.as_custom_update() {
            let CustomStatement { sql, bindings } = CustomStatement::from_update(meta.table(), custom)?;
            return Ok(Statement { sql, bindings });
        }

        let key = model.primary_key().ok_or(ModelError::MissingPrimaryKey)?;
        let pk = meta.primary_key();
        let key_placeholder = format!(":{}", pk);
        if let Some((field, _)) = changes.iter().find(|(_, p)| *p == key_placeholder) {
            return Err(ModelError::Query(format!(
                "placeholder {} of changed field '{}' collides with the primary key of '{}'",
                key_placeholder,
                field,
                meta.table()
            )));
        }

        let mut assignments = Vec::with_capacity(changes.len());
        let mut bindings = Bindings::new();
        for (field, placeholder) in changes.iter() {
            let value = meta.get(model, field)?;
            bindings.bind(placeholder, value, meta.kind_for(field));
            assignments.push(format!("{} = {}", field, placeholder));
        }
        bindings.bind_inferred(key_placeholder, key.to_value());

        Ok(Statement {
            sql: format!(
                "UPDATE {} SET {} WHERE {} = :{}",
                meta.table(),
                assignments.join(", "),
                pk,
                pk
            ),
            bindings,
        })
    }

    /// Copy the freshly inserted row back into `model`
    async fn reconcile<M: Model>(&self, meta: &ModelMetadata<M>, model: &mut M) -> ModelResult<()> {
        let mut rows = self
            .driver
            .last_inserted_row(meta.table(), meta.primary_key())
            .await?;

        let found = rows.len();
        let row = match (found, rows.pop()) {
            (1, Some(row)) => row,
            _ => {
                return Err(ModelError::ReconciliationCardinality {
                    table: meta.table().to_string(),
                    found,
                })
            }
        };

        let applied = meta.reconcile(model, row)?;
        if !model.is_persisted() {
            return Err(ModelError::UnreconciledPrimaryKey {
                table: meta.table().to_string(),
                primary_key: meta.primary_key().to_string(),
            });
        }
        debug!(
            "Reconciled {} column(s) of new {} row",
            applied,
            meta.model_name()
        );
        Ok(())
    }
}

impl std::fmt::Debug for Persistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Persistence")
            .field("metadata", &self.metadata)
            .field("observers", &self.observers)
            .finish()
    }
}
