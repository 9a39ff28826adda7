use std::{collections::BTreeMap, sync::Arc};

use bitflags::bitflags;
use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;

use crate::{normalize_vital, AdjustMode, EntityId, VitalKind, VitalsEngine};

const NAME_CAPTURE: &str = "name";
const ARGS_CAPTURE: &str = "args";

lazy_static! {
    static ref COMMAND_PATTERN: Regex = Regex::new(r"^/(?P<name>\S+)(\s+(?P<args>.*))?$").unwrap();
    static ref LEADING_INT_PATTERN: Regex =
        Regex::new(r"^\s*(?P<sign>[+-]?)(?P<digits>\d+)").unwrap();
}

bitflags! {
    /// What an entity is allowed to do.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Permissions: u32 {
        const ADMIN = 1;
    }
}

/// What to tell the entity that used a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandReply {
    /// Nothing.
    Silent,
    /// A normal message.
    Message(String),
    /// Something went wrong.
    Error(String),
}

/// Signature of a function that performs a command. Receives everything after the command name.
pub type CommandHandleFn = Box<dyn Fn(EntityId, &str) -> CommandReply + Send + Sync>;

struct Command {
    usage: String,
    permission: Permissions,
    handle_fn: CommandHandleFn,
}

/// The commands entities can use, like `/setfood 50`.
#[derive(Default)]
pub struct CommandRegistry {
    commands: BTreeMap<String, Command>,
}

impl CommandRegistry {
    pub fn new() -> CommandRegistry {
        CommandRegistry::default()
    }

    /// Adds a command. `permission` is what an entity needs to use it; empty means anyone can.
    pub fn add_command<F>(&mut self, name: &str, usage: &str, permission: Permissions, handler: F)
    where
        F: Fn(EntityId, &str) -> CommandReply + Send + Sync + 'static,
    {
        self.commands.insert(
            name.to_lowercase(),
            Command {
                usage: usage.to_string(),
                permission,
                handle_fn: Box::new(handler),
            },
        );
    }

    /// Performs the command in the provided input. Returns `None` if the input isn't a command at all.
    pub fn handle(
        &self,
        entity: EntityId,
        permissions: Permissions,
        input: &str,
    ) -> Option<CommandReply> {
        let captures = COMMAND_PATTERN.captures(input.trim())?;
        let name = captures.name(NAME_CAPTURE)?.as_str().to_lowercase();
        let args = captures
            .name(ARGS_CAPTURE)
            .map(|args_match| args_match.as_str())
            .unwrap_or("");

        let Some(command) = self.commands.get(&name) else {
            return Some(CommandReply::Error(format!("Unknown command: /{name}")));
        };

        if !permissions.contains(command.permission) {
            debug!("Entity {entity} isn't allowed to use /{name}");
            return Some(CommandReply::Error(format!(
                "You don't have permission to use /{name}."
            )));
        }

        Some((command.handle_fn)(entity, args))
    }

    /// The usage descriptions of the commands available with the provided permissions.
    pub fn usages(&self, permissions: Permissions) -> Vec<String> {
        self.commands
            .values()
            .filter(|command| permissions.contains(command.permission))
            .map(|command| command.usage.clone())
            .collect()
    }
}

/// Parses the integer at the start of the provided string, ignoring anything after it.
///
/// Numbers too big to fit are saturated.
pub fn parse_leading_int(input: &str) -> Option<i64> {
    let captures = LEADING_INT_PATTERN.captures(input)?;
    let negative = captures.name("sign").is_some_and(|s| s.as_str() == "-");
    let digits = captures.name("digits")?.as_str();

    let number = format!("{}{digits}", if negative { "-" } else { "" });
    match number.parse::<i64>() {
        Ok(n) => Some(n),
        Err(_) if negative => Some(i64::MIN),
        Err(_) => Some(i64::MAX),
    }
}

/// The admin commands for setting vitals.
pub struct VitalsCommands;

impl VitalsCommands {
    /// Adds `/setfood` and `/setwater` to the provided registry.
    pub fn register(registry: &mut CommandRegistry, engine: Arc<VitalsEngine>) {
        for (name, kind) in [("setfood", VitalKind::Food), ("setwater", VitalKind::Water)] {
            let usage = format!("/{name} [amount]");
            let engine = Arc::clone(&engine);
            let usage_for_handler = usage.clone();
            registry.add_command(name, &usage, Permissions::ADMIN, move |entity, args| {
                set_vital(&engine, entity, kind, args, &usage_for_handler)
            });
        }
    }
}

fn set_vital(
    engine: &VitalsEngine,
    entity: EntityId,
    kind: VitalKind,
    args: &str,
    usage: &str,
) -> CommandReply {
    let Some(raw_value) = parse_leading_int(args) else {
        return CommandReply::Message(usage.to_string());
    };

    let value = normalize_vital(raw_value);
    match engine.adjust_vital(entity, kind, value, AdjustMode::Set) {
        Ok(adjustment) => CommandReply::Message(format!("Set {kind} to {}.", adjustment.new_value)),
        Err(e) if e.is_not_found() => {
            debug!("Ignoring set of {kind} for untracked entity {entity}");
            CommandReply::Silent
        }
        Err(e) => {
            warn!("Failed to set {kind} for entity {entity}: {e}");
            CommandReply::Silent
        }
    }
}
