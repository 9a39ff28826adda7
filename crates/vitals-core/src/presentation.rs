use std::time::Duration;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::EntityId;

/// A position or rotation in 3D space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Vec3 {
        Vec3 { x, y, z }
    }
}

/// An object held by an entity, like a sandwich in their hand.
#[derive(Debug, Clone, PartialEq)]
pub struct AttachedObject {
    /// Identifies the object so it can be removed later.
    pub uid: String,
    /// The model of the object.
    pub model: String,
    /// The bone the object is attached to.
    pub bone: u32,
    /// The offset of the object from the bone.
    pub pos: Vec3,
    /// The rotation of the object.
    pub rot: Vec3,
}

bitflags! {
    /// How an animation should be played.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AnimationFlags: u32 {
        const REPEAT = 1;
        const STOP_LAST_FRAME = 2;
        const UPPERBODY_ONLY = 16;
        const ENABLE_PLAYER_CONTROL = 32;
        const CANCELABLE = 128;
    }
}

/// An animation to play on an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    /// The dictionary the animation is in.
    pub dict: String,
    /// The name of the animation within the dictionary.
    pub name: String,
    /// How to play the animation.
    pub flags: AnimationFlags,
}

/// The things the vitals system can show to players. None of these report back whether they worked.
pub trait Presentation: Send + Sync {
    /// Makes the entity hold an object for the provided duration.
    fn attach_object(&self, entity: EntityId, object: &AttachedObject, duration: Duration);

    /// Makes the entity stop holding the object with the provided ID.
    fn remove_object(&self, entity: EntityId, uid: &str);

    /// Plays an animation on the entity for the provided duration.
    fn play_animation(&self, entity: EntityId, animation: &Animation, duration: Duration);

    /// Plays a sound at the entity's position.
    fn play_sound_3d(&self, entity: EntityId, sound: &str);

    /// Shows a short notification to the entity.
    fn notify(&self, entity: EntityId, text: &str);
}
