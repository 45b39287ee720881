use std::any::{Any, TypeId};
use std::collections::HashMap;

use tracing::trace;

use crate::events::{ModelEvent, ModelObserver};

/// Observers of one model type, notified in registration order
pub struct ObserverRegistry<M: Send + Sync> {
    observers: Vec<Box<dyn ModelObserver<M>>>,
}

impl<M: Send + Sync> ObserverRegistry<M> {
    pub fn new() -> Self {
        Self {
            observers: Vec::new(),
        }
    }

    pub fn register(&mut self, observer: Box<dyn ModelObserver<M>>) {
        self.observers.push(observer);
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    pub async fn notify(&self, event: ModelEvent, model: &M) {
        for observer in &self.observers {
            match event {
                ModelEvent::Creating => observer.creating(model).await,
                ModelEvent::Created => observer.created(model).await,
                ModelEvent::Updating => observer.updating(model).await,
                ModelEvent::Updated => observer.updated(model).await,
                ModelEvent::Deleting => observer.deleting(model).await,
                ModelEvent::Deleted => observer.deleted(model).await,
            }
        }
    }
}

impl<M: Send + Sync> Default for ObserverRegistry<M> {
    fn default() -> Self {
        Self::new()
    }
}

/// Observer registries keyed by model type
#[derive(Default)]
pub struct ObserverManager {
    model_observers: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl ObserverManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_for_model<M: Send + Sync + 'static>(&mut self, observer: Box<dyn ModelObserver<M>>) {
        self.model_observers
            .entry(TypeId::of::<M>())
            .or_insert_with(|| Box::new(ObserverRegistry::<M>::new()) as Box<dyn Any + Send + Sync>);

        if let Some(registry) = self.get_registry_for_mut::<M>() {
            registry.register(observer);
        }
    }

    pub fn has_observers_for<M: 'static>(&self) -> bool {
        self.model_observers.contains_key(&TypeId::of::<M>())
    }

    pub fn get_registry_for<M: Send + Sync + 'static>(&self) -> Option<&ObserverRegistry<M>> {
        self.model_observers
            .get(&TypeId::of::<M>())?
            .downcast_ref::<ObserverRegistry<M>>()
    }

    pub fn get_registry_for_mut<M: Send + Sync + 'static>(&mut self) -> Option<&mut ObserverRegistry<M>> {
        self.model_observers
            .get_mut(&TypeId::of::<M>())?
            .downcast_mut::<ObserverRegistry<M>>()
    }

    /// Notify every observer of `M`; a no-op when none are registered
    pub async fn notify<M: Send + Sync + 'static>(&self, event: ModelEvent, model: &M) {
        if let Some(registry) = self.get_registry_for::<M>() {
            trace!(
                "Notifying {} observer(s) of {}",
                registry.observer_count(),
                event
            );
            registry.notify(event, model).await;
        }
    }
}

impl std::fmt::Debug for ObserverManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverManager")
            .field("types", &self.model_observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq)]
    struct TestUser {
        name: String,
    }

    impl Default for TestUser {
        fn default() -> Self {
            Self {
                name: "Test User".to_string(),
            }
        }
    }

    struct OtherModel;

    #[derive(Debug, Clone, Default)]
    struct EventTracker {
        events: Arc<Mutex<Vec<String>>>,
    }

    impl EventTracker {
        fn track(&self, event: String) {
            self.events.lock().unwrap().push(event);
        }

        fn get_events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    struct TrackingObserver {
        tracker: EventTracker,
        name: &'static str,
    }

    #[async_trait]
    impl ModelObserver<TestUser> for TrackingObserver {
        async fn creating(&self, model: &TestUser) {
            self.tracker
                .track(format!("{}: creating {}", self.name, model.name));
        }

        async fn created(&self, model: &TestUser) {
            self.tracker
                .track(format!("{}: created {}", self.name, model.name));
        }

        async fn deleted(&self, model: &TestUser) {
            self.tracker
                .track(format!("{}: deleted {}", self.name, model.name));
        }
    }

    fn observer(name: &'static str, tracker: &EventTracker) -> Box<dyn ModelObserver<TestUser>> {
        Box::new(TrackingObserver {
            tracker: tracker.clone(),
            name,
        })
    }

    #[tokio::test]
    async fn test_observer_registry_execution_order() {
        let mut registry = ObserverRegistry::<TestUser>::new();
        let tracker = EventTracker::default();

        registry.register(observer("observer1", &tracker));
        registry.register(observer("observer2", &tracker));
        assert_eq!(registry.observer_count(), 2);

        registry.notify(ModelEvent::Creating, &TestUser::default()).await;

        assert_eq!(
            tracker.get_events(),
            vec![
                "observer1: creating Test User".to_string(),
                "observer2: creating Test User".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_observer_registry_routes_events() {
        let mut registry = ObserverRegistry::<TestUser>::new();
        let tracker = EventTracker::default();
        registry.register(observer("observer1", &tracker));

        let user = TestUser::default();
        registry.notify(ModelEvent::Created, &user).await;
        registry.notify(ModelEvent::Updating, &user).await;
        registry.notify(ModelEvent::Deleted, &user).await;

        assert_eq!(
            tracker.get_events(),
            vec![
                "observer1: created Test User".to_string(),
                "observer1: deleted Test User".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_observer_manager_register_model_observer() {
        let mut manager = ObserverManager::new();
        let tracker = EventTracker::default();
        assert!(!manager.has_observers_for::<TestUser>());

        manager.register_for_model::<TestUser>(observer("first", &tracker));
        manager.register_for_model::<TestUser>(observer("second", &tracker));

        assert!(manager.has_observers_for::<TestUser>());
        assert!(!manager.has_observers_for::<OtherModel>());
        assert_eq!(
            manager
                .get_registry_for::<TestUser>()
                .map(ObserverRegistry::observer_count),
            Some(2)
        );
    }

    #[tokio::test]
    async fn test_observer_manager_notify() {
        let mut manager = ObserverManager::new();
        let tracker = EventTracker::default();
        manager.register_for_model::<TestUser>(observer("model_observer", &tracker));

        manager.notify(ModelEvent::Creating, &TestUser::default()).await;

        assert_eq!(
            tracker.get_events(),
            vec!["model_observer: creating Test User".to_string()]
        );
    }

    #[tokio::test]
    async fn test_notify_without_observers_is_a_no_op() {
        let manager = ObserverManager::new();
        manager.notify(ModelEvent::Created, &TestUser::default()).await;
        assert!(manager.get_registry_for::<TestUser>().is_none());
    }
}
