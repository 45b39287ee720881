//! Model lifecycle events
//!
//! Observers are notified while a save or delete runs. Hooks cannot veto or
//! modify the operation; every hook defaults to a no-op.

use async_trait::async_trait;

/// Lifecycle point an observer is notified at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelEvent {
    Creating,
    Created,
    Updating,
    Updated,
    Deleting,
    Deleted,
}

impl std::fmt::Display for ModelEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ModelEvent::Creating => "creating",
            ModelEvent::Created => "created",
            ModelEvent::Updating => "updating",
            ModelEvent::Updated => "updated",
            ModelEvent::Deleting => "deleting",
            ModelEvent::Deleted => "deleted",
        };
        f.write_str(name)
    }
}

#[async_trait]
pub trait ModelObserver<M: Send + Sync>: Send + Sync {
    /// Before the INSERT of a new model is executed
    async fn creating(&self, _model: &M) {}

    /// After the INSERT succeeded, before commit
    async fn created(&self, _model: &M) {}

    /// Before the UPDATE of a persisted model is executed
    async fn updating(&self, _model: &M) {}

    /// After the UPDATE succeeded, before commit
    async fn updated(&self, _model: &M) {}

    async fn deleting(&self, _model: &M) {}

    async fn deleted(&self, _model: &M) {}
}
