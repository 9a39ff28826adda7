use std::{collections::HashMap, sync::Arc};

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use strum::EnumIter;

use crate::{
    AdjustMode, ConsumedItem, EffectAttachmentController, EntityId, Presentation, VitalKind,
    VitalsEngine,
};

/// An effect an item can have when consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectKind {
    /// Restores food.
    Food,
    /// Restores water.
    Water,
}

impl EffectKind {
    /// The vital this effect changes.
    pub fn vital_kind(self) -> VitalKind {
        match self {
            EffectKind::Food => VitalKind::Food,
            EffectKind::Water => VitalKind::Water,
        }
    }
}

/// Signature of a function that applies an effect to an entity.
pub type EffectHandleFn = Box<dyn Fn(EntityId, &ConsumedItem) + Send + Sync>;

/// The handlers for each kind of effect.
#[derive(Default)]
pub struct EffectRegistry {
    handlers: HashMap<EffectKind, EffectHandleFn>,
}

impl EffectRegistry {
    pub fn new() -> EffectRegistry {
        EffectRegistry::default()
    }

    /// Sets the handler for an effect, replacing any existing one.
    pub fn add_effect<F>(&mut self, effect: EffectKind, handler: F)
    where
        F: Fn(EntityId, &ConsumedItem) + Send + Sync + 'static,
    {
        if self.handlers.insert(effect, Box::new(handler)).is_some() {
            warn!("Replaced handler for effect {effect:?}");
        }
    }

    /// Applies an effect to an entity. Returns false if nothing handles the effect.
    pub fn apply(&self, effect: EffectKind, entity: EntityId, item: &ConsumedItem) -> bool {
        match self.handlers.get(&effect) {
            Some(handler) => {
                handler(entity, item);
                true
            }
            None => {
                debug!("No handler for effect {effect:?}");
                false
            }
        }
    }
}

/// The effects of eating and drinking.
pub struct VitalsEffects {
    engine: Arc<VitalsEngine>,
    controller: Arc<EffectAttachmentController>,
    presentation: Arc<dyn Presentation>,
}

impl VitalsEffects {
    /// Adds the food and water effects to the provided registry.
    pub fn register(
        registry: &mut EffectRegistry,
        engine: Arc<VitalsEngine>,
        controller: Arc<EffectAttachmentController>,
        presentation: Arc<dyn Presentation>,
    ) {
        let effects = Arc::new(VitalsEffects {
            engine,
            controller,
            presentation,
        });

        for (effect, kind) in [
            (EffectKind::Food, VitalKind::Food),
            (EffectKind::Water, VitalKind::Water),
        ] {
            let effects = Arc::clone(&effects);
            registry.add_effect(effect, move |entity, item| {
                effects.handle_vitals_change(entity, item, kind)
            });
        }
    }

    /// Changes the vital by the item's amount, tells the entity about it, and shows them consuming the item.
    fn handle_vitals_change(&self, entity: EntityId, item: &ConsumedItem, kind: VitalKind) {
        let Some(amount) = item.amount() else {
            return;
        };

        let adjustment = match self
            .engine
            .adjust_vital(entity, kind, amount, AdjustMode::Add)
        {
            Ok(a) => a,
            Err(e) if e.is_not_found() => {
                debug!("Not applying {} to untracked entity {entity}", item.name);
                return;
            }
            Err(e) => {
                warn!("Failed to apply {} to entity {entity}: {e}", item.name);
                return;
            }
        };

        let sign = if amount >= 0.0 { "+" } else { "" };
        self.presentation
            .notify(entity, &format!("{sign}{amount} {kind}"));

        if let Some(sound) = item.data.as_ref().and_then(|d| d.sound.as_ref()) {
            self.presentation.play_sound_3d(entity, sound);
        }

        self.controller.on_consumed(&adjustment, item);
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use crate::{
        presentation::recording::{PresentationCall, RecordingPresentation},
        EffectProfiles, ItemDefinition, VitalStore,
    };

    use super::*;

    struct Setup {
        registry: EffectRegistry,
        engine: Arc<VitalsEngine>,
        presentation: Arc<RecordingPresentation>,
    }

    fn setup() -> Setup {
        let presentation = Arc::new(RecordingPresentation::default());
        let store = Arc::new(VitalStore::new(70.0));
        let engine = Arc::new(VitalsEngine::new(Arc::clone(&store), Vec::new()));
        let controller = EffectAttachmentController::new(
            presentation.clone(),
            EffectProfiles::default(),
            store,
        );
        let mut registry = EffectRegistry::new();
        VitalsEffects::register(
            &mut registry,
            Arc::clone(&engine),
            controller,
            presentation.clone(),
        );

        Setup {
            registry,
            engine,
            presentation,
        }
    }

    #[test]
    fn eating_restores_food_and_notifies() {
        let setup = setup();
        let entity = EntityId(1);
        setup.engine.store().attach(entity);
        let sandwich = ItemDefinition::new("sandwich", EffectKind::Food, 20.0).item;

        assert!(setup.registry.apply(EffectKind::Food, entity, &sandwich));

        assert_eq!(
            90.0,
            setup.engine.get_vital(entity, VitalKind::Food).unwrap()
        );
        assert_eq!(
            70.0,
            setup.engine.get_vital(entity, VitalKind::Water).unwrap()
        );
        let calls = setup.presentation.calls();
        assert_eq!(
            PresentationCall::Notify(entity, "+20 FOOD".to_string()),
            calls[0]
        );
        assert_eq!(
            vec!["vital-effect-prop-prop_sandwich_01".to_string()],
            setup.presentation.attached_uids(entity)
        );
    }

    #[test]
    fn drinking_plays_sound() {
        let setup = setup();
        let entity = EntityId(1);
        setup.engine.store().attach(entity);
        let cola = ItemDefinition::new("cola", EffectKind::Water, 15.0)
            .with_model("prop_ecola_can")
            .with_sound("cola_open")
            .item;

        setup.registry.apply(EffectKind::Water, entity, &cola);

        let calls = setup.presentation.calls();
        assert_eq!(
            PresentationCall::Notify(entity, "+15 WATER".to_string()),
            calls[0]
        );
        assert_eq!(
            PresentationCall::Sound(entity, "cola_open".to_string()),
            calls[1]
        );
        assert_eq!(
            vec!["vital-effect-prop-prop_ecola_can".to_string()],
            setup.presentation.attached_uids(entity)
        );
    }

    #[test]
    fn item_without_amount_does_nothing() {
        let setup = setup();
        let entity = EntityId(1);
        setup.engine.store().attach(entity);
        let mut rock = ItemDefinition::new("rock", EffectKind::Food, 20.0).item;
        rock.data = None;

        setup.registry.apply(EffectKind::Food, entity, &rock);

        assert_eq!(
            70.0,
            setup.engine.get_vital(entity, VitalKind::Food).unwrap()
        );
        assert!(setup.presentation.calls().is_empty());
    }

    #[test]
    fn untracked_entity_does_nothing() {
        let setup = setup();
        let sandwich = ItemDefinition::new("sandwich", EffectKind::Food, 20.0).item;

        setup.registry.apply(EffectKind::Food, EntityId(5), &sandwich);

        assert!(setup.presentation.calls().is_empty());
    }

    #[test]
    fn missing_handler() {
        let registry = EffectRegistry::new();
        let sandwich = ItemDefinition::new("sandwich", EffectKind::Food, 20.0).item;

        assert!(!registry.apply(EffectKind::Food, EntityId(1), &sandwich));
    }

    #[test]
    fn handler_can_be_replaced() {
        let mut registry = EffectRegistry::new();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let first_calls = Arc::clone(&calls);
        registry.add_effect(EffectKind::Water, move |_, _| first_calls.lock().push(1));
        let second_calls = Arc::clone(&calls);
        registry.add_effect(EffectKind::Water, move |_, _| second_calls.lock().push(2));
        let water = ItemDefinition::new("water bottle", EffectKind::Water, 25.0).item;

        registry.apply(EffectKind::Water, EntityId(1), &water);

        assert_eq!(vec![2], *calls.lock());
    }
}
