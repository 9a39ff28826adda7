use std::{
    sync::{Arc, Weak},
    thread::{self, JoinHandle},
    time::Duration,
};

use flume::{RecvTimeoutError, Sender};
use log::{debug, error, trace, warn};
use strum::IntoEnumIterator;

use crate::{
    AdjustMode, EntityDirectory, EntityId, LifecycleListener, VitalKind, VitalsConfig,
    VitalsEngine, VitalsError,
};

/// What happened during one decay tick.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TickReport {
    /// How many entities had their vitals decayed.
    pub decayed: usize,
    /// The entities that were detached because decaying them failed.
    pub detached: Vec<EntityId>,
}

/// Makes vitals decay over time.
pub struct VitalClock {
    engine: Arc<VitalsEngine>,
    interval: Duration,
    decay_rates: Vec<(VitalKind, f32)>,
    directory: Option<Weak<EntityDirectory>>,
    detach_listener: Option<Weak<dyn LifecycleListener>>,
}

impl VitalClock {
    /// Creates a clock that decays vitals through the provided engine at the configured rates.
    pub fn new(engine: Arc<VitalsEngine>, config: &VitalsConfig) -> VitalClock {
        VitalClock {
            engine,
            interval: config.tick_interval(),
            decay_rates: VitalKind::iter()
                .map(|kind| (kind, config.decay_per_tick(kind)))
                .collect(),
            directory: None,
            detach_listener: None,
        }
    }

    /// Only decays entities that are still in the provided directory. Entities that aren't get detached.
    pub fn with_directory(mut self, directory: &Arc<EntityDirectory>) -> VitalClock {
        self.directory = Some(Arc::downgrade(directory));
        self
    }

    /// Detaches failing entities through the provided listener instead of just removing their vitals.
    pub fn with_detach_listener(mut self, listener: Weak<dyn LifecycleListener>) -> VitalClock {
        self.detach_listener = Some(listener);
        self
    }

    /// The time between ticks.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Decays every vital of every tracked entity once.
    ///
    /// These adjustments are silent: nothing is shown to the entities. An entity that fails is logged and
    /// detached, and the rest of the batch carries on.
    pub fn tick(&self) -> TickReport {
        let entities = self.engine.store().entities();
        trace!("Decaying vitals for {} entities", entities.len());

        let mut report = TickReport::default();
        for entity in entities {
            match self.decay(entity) {
                Ok(()) => report.decayed += 1,
                Err(e) => {
                    warn!("Failed to decay vitals for entity {entity}, detaching it: {e}");
                    self.detach(entity);
                    report.detached.push(entity);
                }
            }
        }

        report
    }

    fn decay(&self, entity: EntityId) -> Result<(), VitalsError> {
        if let Some(directory) = self.directory.as_ref().and_then(Weak::upgrade) {
            if !directory.contains(entity) {
                return Err(VitalsError::EntityNotFound(entity));
            }
        }

        for (kind, rate) in &self.decay_rates {
            self.engine
                .adjust_vital(entity, *kind, -rate, AdjustMode::Add)?;
        }

        Ok(())
    }

    fn detach(&self, entity: EntityId) {
        match self.detach_listener.as_ref().and_then(Weak::upgrade) {
            Some(listener) => listener.entity_detached(entity),
            None => {
                self.engine.store().detach(entity);
            }
        }
    }

    /// Starts ticking on a separate thread. The clock stops when the returned handle is stopped or dropped.
    pub fn start(self) -> ClockHandle {
        let (stop_sender, stop_receiver) = flume::bounded::<()>(1);
        let interval = self.interval;

        let thread = thread::Builder::new()
            .name("vital clock".to_string())
            .spawn(move || loop {
                match stop_receiver.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        self.tick();
                    }
                    // told to stop, or the handle is gone
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                        debug!("Vital clock stopping");
                        break;
                    }
                }
            });

        let thread = match thread {
            Ok(t) => Some(t),
            Err(e) => {
                error!("Failed to spawn vital clock thread: {e}");
                None
            }
        };

        ClockHandle {
            stop_sender: Some(stop_sender),
            thread,
        }
    }
}

/// A handle to a running clock.
pub struct ClockHandle {
    stop_sender: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl ClockHandle {
    /// Determines whether the clock thread is running.
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stops the clock and waits for its thread to finish.
    pub fn stop(mut self) {
        self.shut_down();
    }

    fn shut_down(&mut self) {
        if let Some(sender) = self.stop_sender.take() {
            // the thread may already be gone, in which case there's nobody to tell
            let _ = sender.send(());
        }

        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Vital clock thread panicked");
            }
        }
    }
}

impl Drop for ClockHandle {
    fn drop(&mut self) {
        self.shut_down();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use parking_lot::Mutex;

    use crate::VitalStore;

    use super::*;

    fn config(food_rate: f32, water_rate: f32) -> VitalsConfig {
        let mut config = VitalsConfig::default();
        config.tick_interval_ms = 10;
        config.vitals.food.decay_per_tick = food_rate;
        config.vitals.water.decay_per_tick = water_rate;
        config
    }

    fn engine() -> Arc<VitalsEngine> {
        Arc::new(VitalsEngine::new(Arc::new(VitalStore::new(100.0)), Vec::new()))
    }

    #[test]
    fn tick_decays_every_vital() {
        let engine = engine();
        engine.store().attach(EntityId(1));
        engine.store().attach(EntityId(2));
        let clock = VitalClock::new(Arc::clone(&engine), &config(1.0, 2.0));

        for _ in 0..5 {
            let report = clock.tick();
            assert_eq!(2, report.decayed);
        }

        for entity in [EntityId(1), EntityId(2)] {
            assert_eq!(95.0, engine.get_vital(entity, VitalKind::Food).unwrap());
            assert_eq!(90.0, engine.get_vital(entity, VitalKind::Water).unwrap());
        }
    }

    #[test]
    fn tick_stops_at_zero() {
        let engine = engine();
        engine.store().attach(EntityId(1));
        let clock = VitalClock::new(Arc::clone(&engine), &config(60.0, 0.0));

        clock.tick();
        clock.tick();

        assert_eq!(0.0, engine.get_vital(EntityId(1), VitalKind::Food).unwrap());
        assert_eq!(100.0, engine.get_vital(EntityId(1), VitalKind::Water).unwrap());
    }

    #[test]
    fn entity_missing_from_directory_is_detached_without_stopping_batch() {
        let engine = engine();
        let directory = Arc::new(EntityDirectory::new());
        let alive = directory.add("alive");
        let gone = EntityId(alive.0 + 100);
        engine.store().attach(alive);
        engine.store().attach(gone);
        let clock =
            VitalClock::new(Arc::clone(&engine), &config(1.0, 1.0)).with_directory(&directory);

        let report = clock.tick();

        assert_eq!(1, report.decayed);
        assert_eq!(vec![gone], report.detached);
        assert!(!engine.store().is_attached(gone));
        assert_eq!(99.0, engine.get_vital(alive, VitalKind::Food).unwrap());
    }

    #[derive(Default)]
    struct DetachRecorder {
        detached: Mutex<Vec<EntityId>>,
    }

    impl LifecycleListener for DetachRecorder {
        fn entity_attached(&self, _: EntityId) {}

        fn entity_detached(&self, entity: EntityId) {
            self.detached.lock().push(entity);
        }
    }

    #[test]
    fn failures_go_through_detach_listener() {
        let engine = engine();
        let directory = Arc::new(EntityDirectory::new());
        engine.store().attach(EntityId(42));
        let recorder = Arc::new(DetachRecorder::default());
        let listener: Arc<dyn LifecycleListener> = recorder.clone();
        let clock = VitalClock::new(Arc::clone(&engine), &config(1.0, 1.0))
            .with_directory(&directory)
            .with_detach_listener(Arc::downgrade(&listener));

        clock.tick();

        assert_eq!(vec![EntityId(42)], *recorder.detached.lock());
    }

    #[test]
    fn running_clock_ticks_and_stops() {
        let engine = engine();
        engine.store().attach(EntityId(1));
        let handle = VitalClock::new(Arc::clone(&engine), &config(1.0, 1.0)).start();

        let deadline = Instant::now() + Duration::from_secs(5);
        while engine.get_vital(EntityId(1), VitalKind::Food).unwrap() >= 100.0
            && Instant::now() < deadline
        {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(handle.is_running());
        handle.stop();
        let value_after_stop = engine.get_vital(EntityId(1), VitalKind::Food).unwrap();
        thread::sleep(Duration::from_millis(50));

        assert!(value_after_stop < 100.0);
        assert_eq!(
            value_after_stop,
            engine.get_vital(EntityId(1), VitalKind::Food).unwrap()
        );
    }
}
