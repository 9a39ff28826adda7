use flume::{Receiver, Sender};
use itertools::Itertools;
use log::{debug, info};
use std::{sync::Arc, thread};

mod attachment;
pub use attachment::*;

mod clock;
pub use clock::*;

mod command;
pub use command::*;

mod config;
pub use config::*;

mod directory;
pub use directory::*;

mod effect;
pub use effect::*;

mod engine;
pub use engine::*;

mod error;
pub use error::*;

mod game_message;
pub use game_message::*;

mod input;
use input::*;

mod item;
pub use item::*;

mod message_channel;
pub use message_channel::*;

mod presentation;
pub use presentation::*;

mod store;
pub use store::*;

mod system;
pub use system::*;

mod threshold;
pub use threshold::*;

mod timer;

mod vital;
pub use vital::*;

/// The things every player can type, besides slash commands.
const BASIC_USAGES: [&str; 4] = ["eat [item]", "drink [item]", "vitals", "help"];

/// Everything a player's input thread needs.
#[derive(Clone)]
struct PlayerContext {
    directory: Arc<EntityDirectory>,
    system: Arc<VitalsSystem>,
    presentation: Arc<ChannelPresentation>,
    items: Arc<ItemCatalog>,
    permissions: Permissions,
}

pub struct Game {
    context: PlayerContext,
    _clock: ClockHandle,
}

impl Game {
    /// Creates a game with the provided configuration and starts its clock.
    pub fn new(config: VitalsConfig) -> Game {
        let permissions = if config.server.grant_admin {
            Permissions::ADMIN
        } else {
            Permissions::empty()
        };
        let items = Arc::new(ItemCatalog::new(config.items.clone()));

        let presentation = Arc::new(ChannelPresentation::new());
        let system = VitalsSystem::new(config, presentation.clone());
        let directory = Arc::new(EntityDirectory::new());
        directory.subscribe(system.clone());

        let threshold_presentation = Arc::clone(&presentation);
        system
            .engine()
            .subscribers()
            .add_handler(ThresholdFilter::Any, move |crossed| {
                if let Some(message) = &crossed.threshold.message {
                    threshold_presentation
                        .send_message(crossed.entity, GameMessage::Message(message.clone()));
                }
            });

        let clock = system.clock(&directory).start();

        Game {
            context: PlayerContext {
                directory,
                system,
                presentation,
                items,
                permissions,
            },
            _clock: clock,
        }
    }

    /// Adds a player to the game. Dropping the returned sender removes them.
    pub fn add_player(&self, name: String) -> (Sender<String>, Receiver<GameMessage>) {
        // create channels for communication between the player and the game
        let (commands_sender, commands_receiver) = flume::unbounded::<String>();
        let (messages_sender, messages_receiver) = flume::unbounded::<GameMessage>();

        let context = self.context.clone();
        let player_id = context.directory.add(name.clone());
        context.presentation.register(player_id, messages_sender);
        info!("{name} joined as entity {player_id}");

        let thread_context = context.clone();
        thread::Builder::new()
            .name(format!("command receiver for player {player_id}"))
            .spawn(move || {
                loop {
                    let input = match commands_receiver.recv() {
                        Ok(i) => i,
                        Err(_) => {
                            debug!("Command sender for player {player_id} has been dropped");
                            break;
                        }
                    };
                    debug!("Received input from {player_id}: {input:?}");
                    handle_input(&thread_context, player_id, &input);
                }

                match thread_context.directory.get_name(player_id) {
                    Some(name) => info!("{name} left"),
                    None => info!("Entity {player_id} left"),
                }
                thread_context.directory.remove(player_id);
                thread_context.presentation.unregister(player_id);
            })
            .unwrap_or_else(|e| {
                panic!("failed to spawn thread to handle input for player {player_id}: {e}")
            });

        context.presentation.send_message(
            player_id,
            GameMessage::Message(format!("Welcome, {name}! Type 'help' to see what you can do.")),
        );
        send_vitals(&context, player_id);

        (commands_sender, messages_receiver)
    }
}

fn handle_input(context: &PlayerContext, entity: EntityId, input: &str) {
    let message = match parse_input(input) {
        Input::Command(command) => {
            match context
                .system
                .handle_command(entity, context.permissions, &command)
            {
                Some(CommandReply::Message(m)) => GameMessage::Message(m),
                Some(CommandReply::Error(e)) => GameMessage::Error(e),
                Some(CommandReply::Silent) | None => return,
            }
        }
        Input::Consume { effect, item } => match consume(context, entity, effect, &item) {
            Ok(()) => return,
            Err(e) => GameMessage::Error(e),
        },
        Input::Vitals => {
            send_vitals(context, entity);
            return;
        }
        Input::Help => GameMessage::Help(usages(context)),
        Input::Unknown(_) => GameMessage::Error("I don't understand that.".to_string()),
    };

    context.presentation.send_message(entity, message);
}

/// Has the entity eat or drink the named item, or describes why it can't.
fn consume(
    context: &PlayerContext,
    entity: EntityId,
    effect: EffectKind,
    item_name: &str,
) -> std::result::Result<(), String> {
    let Some(item) = context.items.find(item_name) else {
        return Err(format!("There's no {item_name} here."));
    };

    if item.effect != effect {
        return Err(format!(
            "You can't {} the {}. Try to {} it instead.",
            verb(effect),
            item.item.name,
            verb(item.effect)
        ));
    }

    if !context.system.consume(entity, item) {
        return Err(format!("Nothing happens when you {} that.", verb(effect)));
    }

    Ok(())
}

fn verb(effect: EffectKind) -> &'static str {
    match effect {
        EffectKind::Food => "eat",
        EffectKind::Water => "drink",
    }
}

fn send_vitals(context: &PlayerContext, entity: EntityId) {
    let message = match context.system.describe(entity) {
        Ok(description) => GameMessage::Vitals(description),
        Err(e) => GameMessage::Error(e.to_string()),
    };

    context.presentation.send_message(entity, message);
}

fn usages(context: &PlayerContext) -> Vec<String> {
    let mut usages = BASIC_USAGES.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    usages.extend(context.system.command_usages(context.permissions));

    for effect in [EffectKind::Food, EffectKind::Water] {
        let names = context
            .items
            .with_effect(effect)
            .map(|item| &item.item.name)
            .join(", ");
        if !names.is_empty() {
            usages.push(format!("Things you can {}: {names}", verb(effect)));
        }
    }

    usages
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(2);

    fn game() -> Game {
        let mut config = VitalsConfig::default();
        // long enough that decay never interferes
        config.tick_interval_ms = 60 * 60 * 1000;
        Game::new(config)
    }

    /// Receives messages until one matches, failing if it takes too long.
    fn receive_until(
        receiver: &Receiver<GameMessage>,
        mut matches: impl FnMut(&GameMessage) -> bool,
    ) -> GameMessage {
        loop {
            let message = receiver
                .recv_timeout(TIMEOUT)
                .expect("should receive a matching message");
            if matches(&message) {
                return message;
            }
        }
    }

    #[test]
    fn new_player_gets_vitals() {
        let game = game();
        let (_sender, receiver) = game.add_player("Bob".to_string());

        let message = receive_until(&receiver, |m| matches!(m, GameMessage::Vitals(_)));

        let GameMessage::Vitals(description) = message else {
            panic!("expected vitals");
        };
        assert_eq!(Some(100.0), description.get(VitalKind::Food));
        assert_eq!(Some(100.0), description.get(VitalKind::Water));
    }

    #[test]
    fn eat_after_setting_food() {
        let game = game();
        let (sender, receiver) = game.add_player("Bob".to_string());

        sender.send("/setfood 70".to_string()).unwrap();
        sender.send("eat the sandwich".to_string()).unwrap();

        receive_until(&receiver, |m| {
            *m == GameMessage::Notification("+20 FOOD".to_string())
        });
        let attached = receive_until(&receiver, |m| {
            matches!(m, GameMessage::ObjectAttached { .. })
        });
        let GameMessage::ObjectAttached { object, duration } = attached else {
            panic!("expected an attached object");
        };
        assert_eq!("vital-effect-prop-prop_sandwich_01", object.uid);
        assert_eq!(Duration::from_millis(6000), duration);
    }

    #[test]
    fn threshold_message_is_sent() {
        let game = game();
        let (sender, receiver) = game.add_player("Bob".to_string());

        sender.send("/setwater 0".to_string()).unwrap();

        receive_until(&receiver, |m| {
            *m == GameMessage::Message("You are dying of thirst!".to_string())
        });
    }

    #[test]
    fn wrong_verb() {
        let game = game();
        let (sender, receiver) = game.add_player("Bob".to_string());

        sender.send("drink sandwich".to_string()).unwrap();

        let message = receive_until(&receiver, |m| matches!(m, GameMessage::Error(_)));
        assert_eq!(
            GameMessage::Error("You can't drink the sandwich. Try to eat it instead.".to_string()),
            message
        );
    }

    #[test]
    fn leaving_removes_player() {
        let game = game();
        let (sender, receiver) = game.add_player("Bob".to_string());
        receive_until(&receiver, |m| matches!(m, GameMessage::Vitals(_)));
        let entity = game.context.directory.entities()[0];

        drop(sender);

        // the input thread cleans up after noticing the sender is gone
        let deadline = std::time::Instant::now() + TIMEOUT;
        while game.context.system.store().is_attached(entity) && std::time::Instant::now() < deadline
        {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(!game.context.directory.contains(entity));
        assert!(!game.context.system.store().is_attached(entity));
    }
}
