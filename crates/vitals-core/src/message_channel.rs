use std::{collections::HashMap, time::Duration};

use flume::Sender;
use log::debug;
use parking_lot::RwLock;

use crate::{Animation, AttachedObject, EntityId, GameMessage, Presentation};

/// Presents things to players by sending them messages.
#[derive(Default)]
pub struct ChannelPresentation {
    senders: RwLock<HashMap<EntityId, Sender<GameMessage>>>,
}

impl ChannelPresentation {
    pub fn new() -> ChannelPresentation {
        ChannelPresentation::default()
    }

    /// Registers a message sender for an entity, replacing any existing one for that entity.
    pub fn register(&self, entity: EntityId, sender: Sender<GameMessage>) {
        self.senders.write().insert(entity, sender);
    }

    /// Forgets the message sender for an entity.
    pub fn unregister(&self, entity: EntityId) {
        self.senders.write().remove(&entity);
    }

    /// Sends a message to an entity, if it can receive messages.
    pub fn send_message(&self, entity: EntityId, message: GameMessage) {
        if let Some(sender) = self.senders.read().get(&entity) {
            if sender.send(message).is_err() {
                debug!("Message receiver for entity {entity} has been dropped");
            }
        }
    }
}

impl Presentation for ChannelPresentation {
    fn attach_object(&self, entity: EntityId, object: &AttachedObject, duration: Duration) {
        self.send_message(
            entity,
            GameMessage::ObjectAttached {
                object: object.clone(),
                duration,
            },
        );
    }

    fn remove_object(&self, entity: EntityId, uid: &str) {
        self.send_message(
            entity,
            GameMessage::ObjectRemoved {
                uid: uid.to_string(),
            },
        );
    }

    fn play_animation(&self, entity: EntityId, animation: &Animation, duration: Duration) {
        self.send_message(
            entity,
            GameMessage::Animation {
                animation: animation.clone(),
                duration,
            },
        );
    }

    fn play_sound_3d(&self, entity: EntityId, sound: &str) {
        self.send_message(entity, GameMessage::Sound(sound.to_string()));
    }

    fn notify(&self, entity: EntityId, text: &str) {
        self.send_message(entity, GameMessage::Notification(text.to_string()));
    }
}
