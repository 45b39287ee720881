//! Transaction Management
//!
//! Wraps a [`DriverTransaction`] with commit/rollback bookkeeping and a
//! drop-time warning when it is abandoned without either.

use tracing::{debug, warn};

use crate::backends::{Driver, DriverTransaction};
use crate::binding::Bindings;
use crate::error::{ModelError, ModelResult};

/// High-level transaction wrapper
pub struct Transaction {
    inner: Option<Box<dyn DriverTransaction>>,
    committed: bool,
    statements: usize,
}

impl Transaction {
    /// Begin a transaction on `driver`
    pub async fn begin(driver: &dyn Driver) -> ModelResult<Transaction> {
        debug!("Beginning transaction");
        let inner = driver.begin().await?;
        Ok(Transaction {
            inner: Some(inner),
            committed: false,
            statements: 0,
        })
    }

    /// Stage `sql`, bind every entry in order, and execute it.
    pub async fn execute(&mut self, sql: &str, bindings: &Bindings) -> ModelResult<u64> {
        let tx = self
            .inner
            .as_mut()
            .ok_or_else(|| ModelError::Transaction("Transaction has been consumed".to_string()))?;

        debug!("Executing statement with {} binding(s): {}", bindings.len(), sql);
        tx.sql(sql);
        for entry in bindings {
            tx.bind_value(&entry.placeholder, entry.value.clone(), entry.kind);
        }
        let affected = tx.execute().await?;
        self.statements += 1;
        Ok(affected)
    }

    /// Commit the transaction
    pub async fn commit(mut self) -> ModelResult<()> {
        if let Some(tx) = self.inner.take() {
            debug!("Committing transaction after {} statement(s)", self.statements);
            tx.commit().await?;
            self.committed = true;
            debug!("Transaction committed successfully");
            Ok(())
        } else {
            Err(ModelError::Transaction("Transaction has already been consumed".to_string()))
        }
    }

    /// Rollback the transaction
    pub async fn rollback(mut self) -> ModelResult<()> {
        if let Some(tx) = self.inner.take() {
            debug!("Rolling back transaction");
            tx.rollback().await?;
            debug!("Transaction rolled back successfully");
            Ok(())
        } else {
            Err(ModelError::Transaction("Transaction has already been consumed".to_string()))
        }
    }

    /// Check if the transaction has been committed
    pub fn is_committed(&self) -> bool {
        self.committed
    }

    /// Check if the transaction is still active (not committed or rolled back)
    pub fn is_active(&self) -> bool {
        self.inner.is_some()
    }

    /// Number of statements executed so far
    pub fn statement_count(&self) -> usize {
        self.statements
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.inner.take().is_some() && !self.committed {
            // Can't await here; the driver's own transaction rolls back when dropped.
            warn!("Transaction dropped without explicit commit or rollback");
        }
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("active", &self.is_active())
            .field("committed", &self.committed)
            .field("statements", &self.statements)
            .finish()
    }
}
