use std::{collections::HashMap, sync::Arc, time::Instant};

use log::debug;
use parking_lot::{Mutex, RwLock};
use strum::IntoEnumIterator;

use crate::{clamp_vital, EntityId, Result, VitalKind, VitalsError};

/// The current value of one vital of one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct VitalRecord {
    /// The entity the vital belongs to.
    pub entity: EntityId,
    /// Which vital this is.
    pub kind: VitalKind,
    /// The current value. Always within `VITAL_MIN..=VITAL_MAX`.
    pub value: f32,
    /// When the value was last written.
    pub last_updated: Instant,
}

/// A record plus whether it has been removed from the store while someone still held a handle to it.
#[derive(Debug)]
struct RecordCell {
    record: VitalRecord,
    detached: bool,
}

type SharedRecord = Arc<Mutex<RecordCell>>;

/// The result of a read-modify-write on a single record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordUpdate {
    /// The value before the update.
    pub old_value: f32,
    /// The value after the update, after clamping.
    pub new_value: f32,
}

/// Storage for the vitals of every tracked entity.
///
/// Each record has its own lock, so writes to different vitals never wait on each other.
/// The map lock is only held long enough to find a record.
pub struct VitalStore {
    initial_value: f32,
    records: RwLock<HashMap<EntityId, HashMap<VitalKind, SharedRecord>>>,
}

impl VitalStore {
    /// Creates an empty store. Newly attached entities get `initial_value` for every vital.
    pub fn new(initial_value: f32) -> VitalStore {
        VitalStore {
            initial_value: clamp_vital(initial_value),
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Creates records for every vital of the provided entity. Returns false if the entity was already attached.
    pub fn attach(&self, entity: EntityId) -> bool {
        let mut records = self.records.write();
        if records.contains_key(&entity) {
            return false;
        }

        let now = Instant::now();
        let entity_records = VitalKind::iter()
            .map(|kind| {
                let cell = RecordCell {
                    record: VitalRecord {
                        entity,
                        kind,
                        value: self.initial_value,
                        last_updated: now,
                    },
                    detached: false,
                };
                (kind, Arc::new(Mutex::new(cell)))
            })
            .collect();
        records.insert(entity, entity_records);
        debug!("Attached vitals for entity {entity}");

        true
    }

    /// Destroys all the records of the provided entity. Detaching an entity that isn't attached does nothing.
    ///
    /// Returns whether the entity was attached.
    pub fn detach(&self, entity: EntityId) -> bool {
        let removed = self.records.write().remove(&entity);
        match removed {
            Some(entity_records) => {
                // anyone still holding one of these will see it as gone
                for record in entity_records.values() {
                    record.lock().detached = true;
                }
                debug!("Detached vitals for entity {entity}");
                true
            }
            None => false,
        }
    }

    /// Determines whether the provided entity has vitals in this store.
    pub fn is_attached(&self, entity: EntityId) -> bool {
        self.records.read().contains_key(&entity)
    }

    /// Gets all the entities with vitals in this store.
    pub fn entities(&self) -> Vec<EntityId> {
        let mut entities = self.records.read().keys().copied().collect::<Vec<_>>();
        entities.sort();
        entities
    }

    /// Gets a copy of the record for the provided vital.
    pub fn get(&self, entity: EntityId, kind: VitalKind) -> Result<VitalRecord> {
        let record = self.find(entity, kind)?;
        let cell = record.lock();
        if cell.detached {
            return Err(VitalsError::NotFound { entity, kind });
        }

        Ok(cell.record.clone())
    }

    /// Sets the provided vital to the provided value, clamped into the allowed range.
    pub fn set(&self, entity: EntityId, kind: VitalKind, value: f32) -> Result<RecordUpdate> {
        self.update(entity, kind, |_| value)
    }

    /// Replaces the provided vital's value with the result of `change_fn` applied to it, clamped into the allowed range.
    ///
    /// The record is locked for the whole read-modify-write, so concurrent updates to the same vital never lose writes.
    pub fn update<F>(&self, entity: EntityId, kind: VitalKind, change_fn: F) -> Result<RecordUpdate>
    where
        F: FnOnce(f32) -> f32,
    {
        let record = self.find(entity, kind)?;
        let mut cell = record.lock();
        if cell.detached {
            return Err(VitalsError::NotFound { entity, kind });
        }

        let old_value = cell.record.value;
        let new_value = clamp_vital(change_fn(old_value));
        cell.record.value = new_value;
        cell.record.last_updated = Instant::now();

        Ok(RecordUpdate {
            old_value,
            new_value,
        })
    }

    /// Finds the shared handle for a record. The map lock is released before this returns.
    fn find(&self, entity: EntityId, kind: VitalKind) -> Result<SharedRecord> {
        self.records
            .read()
            .get(&entity)
            .and_then(|entity_records| entity_records.get(&kind))
            .cloned()
            .ok_or(VitalsError::NotFound { entity, kind })
    }
}
