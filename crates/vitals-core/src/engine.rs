use std::sync::Arc;

use float_cmp::approx_eq;
use log::{debug, info};

use crate::{
    EntityId, Result, Threshold, ThresholdCrossed, ThresholdSubscribers, VitalKind, VitalStore,
    VITAL_MAX, VITAL_MIN,
};

/// A type of change to a vital.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjustMode {
    /// The amount should be added to the current value.
    Add,
    /// The value should be set to the amount.
    Set,
}

/// What happened when a vital was adjusted.
#[derive(Debug, Clone, PartialEq)]
pub struct VitalAdjustment {
    /// The entity the vital belongs to.
    pub entity: EntityId,
    /// The vital that was adjusted.
    pub kind: VitalKind,
    /// The value before the adjustment.
    pub old_value: f32,
    /// The value after the adjustment.
    pub new_value: f32,
    /// The thresholds this adjustment crossed.
    pub crossed: Vec<Threshold>,
}

impl VitalAdjustment {
    /// Determines whether the adjustment actually changed the value.
    pub fn changed(&self) -> bool {
        !approx_eq!(f32, self.old_value, self.new_value)
    }

    /// Determines whether the adjustment raised the value.
    pub fn increased(&self) -> bool {
        self.changed() && self.new_value > self.old_value
    }
}

/// Clamps an arbitrary integer, like one typed into a command, into the range of a vital.
pub fn normalize_vital(raw_value: i64) -> f32 {
    // both bounds are whole numbers, so the clamped value converts exactly
    raw_value.clamp(VITAL_MIN as i64, VITAL_MAX as i64) as f32
}

/// Applies changes to vitals and raises threshold events.
pub struct VitalsEngine {
    store: Arc<VitalStore>,
    thresholds: Vec<Threshold>,
    subscribers: ThresholdSubscribers,
}

impl VitalsEngine {
    /// Creates an engine that changes vitals in the provided store and watches for the provided thresholds.
    pub fn new(store: Arc<VitalStore>, thresholds: Vec<Threshold>) -> VitalsEngine {
        VitalsEngine {
            store,
            thresholds,
            subscribers: ThresholdSubscribers::new(),
        }
    }

    /// The store this engine changes.
    pub fn store(&self) -> &Arc<VitalStore> {
        &self.store
    }

    /// The handlers that get told about threshold crossings.
    pub fn subscribers(&self) -> &ThresholdSubscribers {
        &self.subscribers
    }

    /// See [`normalize_vital`].
    pub fn normalize_vital(&self, raw_value: i64) -> f32 {
        normalize_vital(raw_value)
    }

    /// Gets the current value of a vital.
    pub fn get_vital(&self, entity: EntityId, kind: VitalKind) -> Result<f32> {
        Ok(self.store.get(entity, kind)?.value)
    }

    /// Changes a vital, clamping the result.
    ///
    /// With `AdjustMode::Add`, `amount` is added to the value current at the time the change is applied.
    /// With `AdjustMode::Set`, `amount` becomes the new value.
    ///
    /// Every threshold crossed by the change is sent to the registered handlers before this returns.
    pub fn adjust_vital(
        &self,
        entity: EntityId,
        kind: VitalKind,
        amount: f32,
        mode: AdjustMode,
    ) -> Result<VitalAdjustment> {
        let update = self.store.update(entity, kind, |current| match mode {
            AdjustMode::Add => current + amount,
            AdjustMode::Set => amount,
        })?;

        let crossed = self
            .thresholds
            .iter()
            .filter(|t| t.kind == kind && t.is_crossed_by(update.old_value, update.new_value))
            .cloned()
            .collect::<Vec<_>>();

        debug!(
            "Adjusted {kind} of entity {entity} ({mode:?} {amount}): {} -> {}",
            update.old_value, update.new_value
        );

        // the record lock is released by now, so handlers are free to adjust vitals themselves
        for threshold in &crossed {
            info!(
                "Entity {entity} crossed {kind} threshold {} ({})",
                threshold.name, threshold.value
            );
            self.subscribers.dispatch(&ThresholdCrossed {
                entity,
                threshold: threshold.clone(),
                old_value: update.old_value,
                new_value: update.new_value,
            });
        }

        Ok(VitalAdjustment {
            entity,
            kind,
            old_value: update.old_value,
            new_value: update.new_value,
            crossed,
        })
    }
}
