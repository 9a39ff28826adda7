use std::{
    collections::HashMap,
    fmt::Display,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use log::debug;
use parking_lot::RwLock;

/// A stable identifier for an entity in the game.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug, PartialOrd, Ord)]
pub struct EntityId(pub u64);

impl Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Something that wants to know when entities join or leave the game.
pub trait LifecycleListener: Send + Sync {
    /// Called after an entity has been added to the directory.
    fn entity_attached(&self, entity: EntityId);

    /// Called after an entity has been removed from the directory.
    fn entity_detached(&self, entity: EntityId);
}

/// Keeps track of which entities exist, and tells listeners when that changes.
#[derive(Default)]
pub struct EntityDirectory {
    next_id: AtomicU64,
    names: RwLock<HashMap<EntityId, String>>,
    listeners: RwLock<Vec<Arc<dyn LifecycleListener>>>,
}

impl EntityDirectory {
    /// Creates an empty directory.
    pub fn new() -> EntityDirectory {
        EntityDirectory::default()
    }

    /// Registers a listener to be told about entities being added and removed.
    pub fn subscribe(&self, listener: Arc<dyn LifecycleListener>) {
        self.listeners.write().push(listener);
    }

    /// Adds an entity with the provided name. Returns the ID of the entity.
    pub fn add(&self, name: impl Into<String>) -> EntityId {
        let id = EntityId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let name = name.into();
        debug!("Adding entity {id} ({name})");
        self.names.write().insert(id, name);

        for listener in self.listeners() {
            listener.entity_attached(id);
        }

        id
    }

    /// Removes an entity. Returns whether the entity was present.
    pub fn remove(&self, entity: EntityId) -> bool {
        let removed = self.names.write().remove(&entity);
        if removed.is_none() {
            return false;
        }

        debug!("Removed entity {entity}");
        for listener in self.listeners() {
            listener.entity_detached(entity);
        }

        true
    }

    /// Determines whether the provided entity is in the directory.
    pub fn contains(&self, entity: EntityId) -> bool {
        self.names.read().contains_key(&entity)
    }

    /// Gets the name of the provided entity, if it exists.
    pub fn get_name(&self, entity: EntityId) -> Option<String> {
        self.names.read().get(&entity).cloned()
    }

    /// Gets all the entities currently in the directory.
    pub fn entities(&self) -> Vec<EntityId> {
        let mut ids = self.names.read().keys().copied().collect::<Vec<_>>();
        ids.sort();
        ids
    }

    fn listeners(&self) -> Vec<Arc<dyn LifecycleListener>> {
        self.listeners.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;

    #[derive(Default)]
    struct RecordingListener {
        events: Mutex<Vec<(EntityId, bool)>>,
    }

    impl LifecycleListener for RecordingListener {
        fn entity_attached(&self, entity: EntityId) {
            self.events.lock().push((entity, true));
        }

        fn entity_detached(&self, entity: EntityId) {
            self.events.lock().push((entity, false));
        }
    }

    #[test]
    fn add_and_remove_notify_listeners() {
        let directory = EntityDirectory::new();
        let listener = Arc::new(RecordingListener::default());
        directory.subscribe(listener.clone());

        let first = directory.add("Player 0");
        let second = directory.add("Player 1");
        assert_ne!(first, second);
        assert_eq!(Some("Player 1".to_string()), directory.get_name(second));

        assert!(directory.remove(first));
        assert!(!directory.contains(first));
        assert_eq!(vec![second], directory.entities());

        assert_eq!(
            vec![(first, true), (second, true), (first, false)],
            *listener.events.lock()
        );
    }

    #[test]
    fn remove_twice_only_notifies_once() {
        let directory = EntityDirectory::new();
        let listener = Arc::new(RecordingListener::default());
        directory.subscribe(listener.clone());

        let id = directory.add("Player 0");
        assert!(directory.remove(id));
        assert!(!directory.remove(id));

        assert_eq!(2, listener.events.lock().len());
    }
}
