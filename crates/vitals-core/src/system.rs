use std::sync::{Arc, Weak};

use log::{debug, info};

use crate::{
    CommandRegistry, CommandReply, EffectAttachmentController, EffectRegistry,
    EntityDirectory, EntityId, ItemDefinition, LifecycleListener, Permissions, Presentation,
    Result, VitalClock, VitalStore, VitalsCommands, VitalsConfig, VitalsDescription,
    VitalsEffects, VitalsEngine,
};

/// Everything needed to track and show the vitals of entities, wired together.
pub struct VitalsSystem {
    config: VitalsConfig,
    engine: Arc<VitalsEngine>,
    controller: Arc<EffectAttachmentController>,
    effects: EffectRegistry,
    commands: CommandRegistry,
}

impl VitalsSystem {
    /// Sets up vitals tracking with the provided configuration, showing things through `presentation`.
    pub fn new(config: VitalsConfig, presentation: Arc<dyn Presentation>) -> Arc<VitalsSystem> {
        let store = Arc::new(VitalStore::new(config.initial_value));
        let engine = Arc::new(VitalsEngine::new(
            Arc::clone(&store),
            config.thresholds.clone(),
        ));
        let controller = EffectAttachmentController::new(
            Arc::clone(&presentation),
            config.effects.clone(),
            store,
        );

        let mut effects = EffectRegistry::new();
        VitalsEffects::register(
            &mut effects,
            Arc::clone(&engine),
            Arc::clone(&controller),
            presentation,
        );

        let mut commands = CommandRegistry::new();
        VitalsCommands::register(&mut commands, Arc::clone(&engine));

        info!(
            "Vitals plugin loaded: ticking every {:?}, {} thresholds",
            config.tick_interval(),
            config.thresholds.len()
        );

        Arc::new(VitalsSystem {
            config,
            engine,
            controller,
            effects,
            commands,
        })
    }

    pub fn config(&self) -> &VitalsConfig {
        &self.config
    }

    pub fn engine(&self) -> &Arc<VitalsEngine> {
        &self.engine
    }

    pub fn store(&self) -> &Arc<VitalStore> {
        self.engine.store()
    }

    pub fn controller(&self) -> &Arc<EffectAttachmentController> {
        &self.controller
    }

    /// Builds the clock that decays vitals for the entities in the provided directory.
    ///
    /// Entities the clock fails on are detached through this system, so their effects get cleared too.
    pub fn clock(self: &Arc<Self>, directory: &Arc<EntityDirectory>) -> VitalClock {
        let listener: Arc<dyn LifecycleListener> = Arc::clone(self) as Arc<dyn LifecycleListener>;
        let listener: Weak<dyn LifecycleListener> = Arc::downgrade(&listener);

        VitalClock::new(Arc::clone(&self.engine), &self.config)
            .with_directory(directory)
            .with_detach_listener(listener)
    }

    /// Has an entity consume an item. Returns false if nothing handles the item's effect.
    pub fn consume(&self, entity: EntityId, item: &ItemDefinition) -> bool {
        debug!("Entity {entity} is consuming {}", item.item.name);
        self.effects.apply(item.effect, entity, &item.item)
    }

    /// Handles a command like `/setfood 50`. Returns `None` if the input isn't a command.
    pub fn handle_command(
        &self,
        entity: EntityId,
        permissions: Permissions,
        input: &str,
    ) -> Option<CommandReply> {
        self.commands.handle(entity, permissions, input)
    }

    /// The usage descriptions of the commands available with the provided permissions.
    pub fn command_usages(&self, permissions: Permissions) -> Vec<String> {
        self.commands.usages(permissions)
    }

    /// Describes the current vitals of an entity.
    pub fn describe(&self, entity: EntityId) -> Result<VitalsDescription> {
        VitalsDescription::from_store(self.store(), entity)
    }
}

impl LifecycleListener for VitalsSystem {
    fn entity_attached(&self, entity: EntityId) {
        if self.store().attach(entity) {
            debug!("Tracking vitals for entity {entity}");
        }
    }

    fn entity_detached(&self, entity: EntityId) {
        let had_vitals = self.store().detach(entity);
        let had_effect = self.controller.clear(entity);
        debug!("Stopped tracking entity {entity} (vitals: {had_vitals}, effect: {had_effect})");
    }
}

#[cfg(test)]
mod tests {
    use std::{
        thread,
        time::{Duration, Instant},
    };

    use parking_lot::Mutex;

    use crate::{
        presentation::recording::{PresentationCall, RecordingPresentation},
        AdjustMode, AttachmentState, EffectKind, ThresholdFilter, VitalKind,
    };

    use super::*;

    struct Setup {
        system: Arc<VitalsSystem>,
        directory: Arc<EntityDirectory>,
        presentation: Arc<RecordingPresentation>,
    }

    fn setup(config: VitalsConfig) -> Setup {
        let presentation = Arc::new(RecordingPresentation::default());
        let system = VitalsSystem::new(config, presentation.clone());
        let directory = Arc::new(EntityDirectory::new());
        directory.subscribe(system.clone());

        Setup {
            system,
            directory,
            presentation,
        }
    }

    #[test]
    fn decay_then_starve_once() {
        let setup = setup(VitalsConfig::default());
        let starving = Arc::new(Mutex::new(Vec::new()));
        let starving_for_handler = Arc::clone(&starving);
        setup.system.engine().subscribers().add_handler(
            ThresholdFilter::Named {
                kind: VitalKind::Food,
                name: "starving".to_string(),
            },
            move |crossed| starving_for_handler.lock().push(crossed.entity),
        );
        let entity = setup.directory.add("Bob");
        let clock = setup.system.clock(&setup.directory);

        assert_eq!(
            100.0,
            setup.system.engine().get_vital(entity, VitalKind::Food).unwrap()
        );

        for _ in 0..5 {
            clock.tick();
        }
        assert_eq!(
            95.0,
            setup.system.engine().get_vital(entity, VitalKind::Food).unwrap()
        );
        assert_eq!(
            95.0,
            setup.system.engine().get_vital(entity, VitalKind::Water).unwrap()
        );

        let reply = setup
            .system
            .handle_command(entity, Permissions::ADMIN, "/setfood 0");
        assert_eq!(
            Some(CommandReply::Message("Set FOOD to 0.".to_string())),
            reply
        );
        assert_eq!(vec![entity], *starving.lock());

        clock.tick();
        assert_eq!(
            0.0,
            setup.system.engine().get_vital(entity, VitalKind::Food).unwrap()
        );
        assert_eq!(vec![entity], *starving.lock());
    }

    #[test]
    fn eating_shows_sandwich() {
        let setup = setup(VitalsConfig::default());
        let entity = setup.directory.add("Alice");
        setup
            .system
            .handle_command(entity, Permissions::ADMIN, "/setfood 70");
        let sandwich = ItemDefinition::new("sandwich", EffectKind::Food, 20.0);

        assert!(setup.system.consume(entity, &sandwich));

        assert_eq!(
            90.0,
            setup.system.engine().get_vital(entity, VitalKind::Food).unwrap()
        );
        assert!(setup
            .presentation
            .calls()
            .contains(&PresentationCall::Notify(entity, "+20 FOOD".to_string())));
        assert_eq!(
            vec!["vital-effect-prop-prop_sandwich_01".to_string()],
            setup.presentation.attached_uids(entity)
        );
    }

    #[test]
    fn removing_entity_clears_everything() {
        let setup = setup(VitalsConfig::default());
        let entity = setup.directory.add("Alice");
        let water = ItemDefinition::new("water bottle", EffectKind::Water, 25.0);
        setup.system.consume(entity, &water);

        assert!(setup.directory.remove(entity));

        assert!(!setup.system.store().is_attached(entity));
        assert_eq!(AttachmentState::Idle, setup.system.controller().state(entity));
        assert!(setup.presentation.attached_uids(entity).is_empty());
        assert!(setup.system.describe(entity).is_err());
    }

    #[test]
    fn effect_arriving_after_removal_is_dropped() {
        let setup = setup(VitalsConfig::default());
        let entity = setup.directory.add("Alice");
        let sandwich = ItemDefinition::new("sandwich", EffectKind::Food, 20.0);
        let adjustment = setup
            .system
            .engine()
            .adjust_vital(entity, VitalKind::Food, 20.0, AdjustMode::Add)
            .unwrap();

        assert!(setup.directory.remove(entity));
        let object = setup
            .system
            .controller()
            .on_consumed(&adjustment, &sandwich.item);

        assert!(object.is_none());
        assert_eq!(AttachmentState::Idle, setup.system.controller().state(entity));
        assert!(setup.presentation.attached_uids(entity).is_empty());
    }

    #[test]
    fn clock_detaches_orphaned_entities() {
        let setup = setup(VitalsConfig::default());
        let entity = EntityId(77);
        setup.system.entity_attached(entity);
        let food = ItemDefinition::new("sandwich", EffectKind::Food, 20.0);
        setup.system.consume(entity, &food);

        let report = setup.system.clock(&setup.directory).tick();

        assert_eq!(vec![entity], report.detached);
        assert!(!setup.system.store().is_attached(entity));
        assert_eq!(AttachmentState::Idle, setup.system.controller().state(entity));
    }

    #[test]
    fn running_clock_decays() {
        let mut config = VitalsConfig::default();
        config.tick_interval_ms = 5;
        let setup = setup(config);
        let entity = setup.directory.add("Alice");

        let handle = setup.system.clock(&setup.directory).start();
        let deadline = Instant::now() + Duration::from_secs(5);
        while setup.system.engine().get_vital(entity, VitalKind::Food).unwrap() >= 100.0
            && Instant::now() < deadline
        {
            thread::sleep(Duration::from_millis(5));
        }
        handle.stop();

        assert!(setup.system.engine().get_vital(entity, VitalKind::Food).unwrap() < 100.0);
    }
}
