use std::time::Duration;

use strum::IntoEnumIterator;

use crate::{Animation, AttachedObject, EntityId, Result, VitalKind, VitalStore};

/// A message from the game, such as the result of a command, a change to something the player is holding, etc.
#[derive(Debug, Clone, PartialEq)]
pub enum GameMessage {
    Message(String),
    Error(String),
    /// A short pop-up style notification, like `+20 FOOD`.
    Notification(String),
    Help(Vec<String>),
    Vitals(VitalsDescription),
    ObjectAttached {
        object: AttachedObject,
        duration: Duration,
    },
    ObjectRemoved {
        uid: String,
    },
    Animation {
        animation: Animation,
        duration: Duration,
    },
    Sound(String),
}

/// The current vitals of an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct VitalsDescription {
    /// The value of each vital, in a fixed order.
    pub values: Vec<(VitalKind, f32)>,
}

impl VitalsDescription {
    /// Describes the vitals of the provided entity.
    pub fn from_store(store: &VitalStore, entity: EntityId) -> Result<VitalsDescription> {
        let values = VitalKind::iter()
            .map(|kind| store.get(entity, kind).map(|record| (kind, record.value)))
            .collect::<Result<Vec<_>>>()?;

        Ok(VitalsDescription { values })
    }

    /// Gets the value of the provided vital.
    pub fn get(&self, kind: VitalKind) -> Option<f32> {
        self.values
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, value)| *value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_vitals() {
        let store = VitalStore::new(100.0);
        let entity = EntityId(3);
        store.attach(entity);
        store.set(entity, VitalKind::Water, 45.0).unwrap();

        let description = VitalsDescription::from_store(&store, entity).unwrap();

        assert_eq!(
            vec![(VitalKind::Food, 100.0), (VitalKind::Water, 45.0)],
            description.values
        );
        assert_eq!(Some(45.0), description.get(VitalKind::Water));
    }

    #[test]
    fn describe_untracked() {
        let store = VitalStore::new(100.0);

        assert!(VitalsDescription::from_store(&store, EntityId(3)).is_err());
    }
}
