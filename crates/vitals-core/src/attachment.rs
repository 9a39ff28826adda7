use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Weak,
    },
    time::Instant,
};

use log::debug;
use parking_lot::Mutex;

use crate::{
    timer::ExpiryTimer, Animation, AnimationFlags, AttachedObject, ConsumedItem, EffectProfile,
    EffectProfiles, EntityId, Presentation, VitalAdjustment, VitalKind, VitalStore,
};

const UID_PREFIX: &str = "vital-effect-prop-";

/// The object and animation an entity is showing while consuming something.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveEffect {
    /// The held object.
    pub object: AttachedObject,
    /// The vital the consumed item restored.
    pub kind: VitalKind,
    /// When the effect ends by itself.
    pub expire_at: Instant,
    /// Identifies this particular installation, so a stale expiry can't remove a newer effect.
    token: u64,
}

/// The state of an entity's attachment slot.
#[derive(Debug, Clone, PartialEq)]
pub enum AttachmentState {
    /// Nothing is attached.
    Idle,
    /// An object is attached.
    Attached(ActiveEffect),
}

/// Builds the ID of the held object for the provided model.
pub fn attachment_uid(model: &str) -> String {
    format!("{UID_PREFIX}{model}")
}

/// One entity's slot. `None` means idle.
type SharedSlot = Arc<Mutex<Option<ActiveEffect>>>;

/// Shows entities holding what they're eating or drinking, one thing at a time.
///
/// Each entity's slot has its own lock, so showing effects to one entity never waits on another.
/// The map lock is only held long enough to find a slot.
pub struct EffectAttachmentController {
    presentation: Arc<dyn Presentation>,
    profiles: EffectProfiles,
    store: Arc<VitalStore>,
    slots: Mutex<HashMap<EntityId, SharedSlot>>,
    next_token: AtomicU64,
    timer: ExpiryTimer<EntityId>,
}

impl EffectAttachmentController {
    /// Creates a controller that shows effects through the provided presentation layer.
    ///
    /// Only entities attached to `store` can have effects installed.
    pub fn new(
        presentation: Arc<dyn Presentation>,
        profiles: EffectProfiles,
        store: Arc<VitalStore>,
    ) -> Arc<EffectAttachmentController> {
        Arc::new_cyclic(|controller: &Weak<EffectAttachmentController>| {
            let controller = controller.clone();
            let timer = ExpiryTimer::start(
                "attachment expiry",
                move |entity: EntityId, token: u64| {
                    if let Some(controller) = controller.upgrade() {
                        controller.expire(entity, token);
                    }
                },
            );

            EffectAttachmentController {
                presentation,
                profiles,
                store,
                slots: Mutex::new(HashMap::new()),
                next_token: AtomicU64::new(0),
                timer,
            }
        })
    }

    /// Shows the effect for an item that was just consumed, replacing any effect already showing.
    ///
    /// Nothing happens if the item has no amount, or if the entity isn't tracked (anymore).
    /// Returns the newly attached object, if any.
    pub fn on_consumed(
        &self,
        adjustment: &VitalAdjustment,
        item: &ConsumedItem,
    ) -> Option<AttachedObject> {
        let amount = item.amount()?;
        if amount <= 0.0 {
            return None;
        }

        let entity = adjustment.entity;
        let Some(slot) = self.tracked_slot(entity) else {
            debug!("Not showing {} on untracked entity {entity}", item.name);
            return None;
        };

        let profile = self.profiles.get(adjustment.kind);
        let object = build_object(profile, item);
        let duration = profile.duration();
        let animation = Animation {
            dict: profile.animation_dict.clone(),
            name: profile.animation_name.clone(),
            flags: AnimationFlags::UPPERBODY_ONLY | AnimationFlags::ENABLE_PLAYER_CONTROL,
        };

        let mut slot = slot.lock();
        // the entity may have been detached while waiting for the slot
        if !self.store.is_attached(entity) {
            debug!("Entity {entity} was detached before {} could be shown", item.name);
            return None;
        }

        if let Some(previous) = slot.take() {
            debug!(
                "Replacing {} with {} on entity {entity}",
                previous.object.uid, object.uid
            );
            self.presentation
                .remove_object(entity, &previous.object.uid);
        }

        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let expire_at = Instant::now() + duration;
        self.presentation.attach_object(entity, &object, duration);
        self.presentation
            .play_animation(entity, &animation, duration);
        *slot = Some(ActiveEffect {
            object: object.clone(),
            kind: adjustment.kind,
            expire_at,
            token,
        });
        // replaces the expiry of whatever was attached before
        self.timer.schedule(entity, expire_at, token);
        debug!("Attached {} to entity {entity} for {duration:?}", object.uid);

        Some(object)
    }

    /// Ends the effect installed with the provided token, if it's still the one showing.
    ///
    /// Returns whether anything was removed.
    pub fn expire(&self, entity: EntityId, token: u64) -> bool {
        let Some(slot) = self.slots.lock().get(&entity).cloned() else {
            return false;
        };

        let mut slot = slot.lock();
        if !slot.as_ref().is_some_and(|active| active.token == token) {
            return false;
        }

        if let Some(active) = slot.take() {
            debug!("{} on entity {entity} expired", active.object.uid);
            self.presentation.remove_object(entity, &active.object.uid);
        }
        true
    }

    /// Removes whatever effect the entity is showing and forgets its expiry. Used when the entity leaves,
    /// after its vitals have been detached.
    ///
    /// Returns whether anything was removed.
    pub fn clear(&self, entity: EntityId) -> bool {
        let Some(slot) = self.slots.lock().remove(&entity) else {
            return false;
        };

        let mut slot = slot.lock();
        self.timer.cancel(entity);
        match slot.take() {
            Some(active) => {
                debug!("Cleared {} from entity {entity}", active.object.uid);
                self.presentation.remove_object(entity, &active.object.uid);
                true
            }
            None => false,
        }
    }

    /// Gets the state of the provided entity's slot.
    pub fn state(&self, entity: EntityId) -> AttachmentState {
        let Some(slot) = self.slots.lock().get(&entity).cloned() else {
            return AttachmentState::Idle;
        };

        let slot = slot.lock();
        match slot.as_ref() {
            Some(active) => AttachmentState::Attached(active.clone()),
            None => AttachmentState::Idle,
        }
    }

    /// Finds the slot of a tracked entity, creating it if needed.
    ///
    /// Untracked entities never get a slot, so one can't be left behind after `clear`.
    fn tracked_slot(&self, entity: EntityId) -> Option<SharedSlot> {
        let mut slots = self.slots.lock();
        if !self.store.is_attached(entity) {
            return None;
        }

        Some(Arc::clone(slots.entry(entity).or_default()))
    }
}

/// Picks the object to hold for an item, using the defaults for whatever the item doesn't specify.
fn build_object(profile: &EffectProfile, item: &ConsumedItem) -> AttachedObject {
    let data = item.data.as_ref();
    let model = item.model.clone().unwrap_or_else(|| profile.model.clone());

    AttachedObject {
        uid: attachment_uid(&model),
        model,
        bone: data.and_then(|d| d.bone).unwrap_or(profile.bone),
        pos: data.and_then(|d| d.pos).unwrap_or(profile.pos),
        rot: data.and_then(|d| d.rot).unwrap_or(profile.rot),
    }
}
