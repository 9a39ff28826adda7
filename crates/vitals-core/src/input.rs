use lazy_static::lazy_static;
use regex::Regex;

use crate::EffectKind;

const NAME_CAPTURE: &str = "name";

lazy_static! {
    static ref EAT_PATTERN: Regex = Regex::new(r"^(eat|consume) (the )?(?P<name>.+)$").unwrap();
    static ref DRINK_PATTERN: Regex = Regex::new(r"^(drink|sip) (the )?(?P<name>.+)$").unwrap();
    static ref VITALS_PATTERN: Regex = Regex::new(r"^(vitals|status|stats)$").unwrap();
    static ref HELP_PATTERN: Regex = Regex::new(r"^(help|\?)$").unwrap();
}

/// Something a player asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// A slash command, like `/setfood 50`.
    Command(String),
    /// Eat or drink the named item.
    Consume { effect: EffectKind, item: String },
    /// Show current vitals.
    Vitals,
    Help,
    Unknown(String),
}

/// Parses a line of input from a player.
pub fn parse_input(input: &str) -> Input {
    let input = input.trim();
    if input.starts_with('/') {
        return Input::Command(input.to_string());
    }

    let lowercase = input.to_lowercase();
    if let Some(item) = name_from(&EAT_PATTERN, &lowercase) {
        return Input::Consume {
            effect: EffectKind::Food,
            item,
        };
    }

    if let Some(item) = name_from(&DRINK_PATTERN, &lowercase) {
        return Input::Consume {
            effect: EffectKind::Water,
            item,
        };
    }

    if VITALS_PATTERN.is_match(&lowercase) {
        return Input::Vitals;
    }

    if HELP_PATTERN.is_match(&lowercase) {
        return Input::Help;
    }

    Input::Unknown(input.to_string())
}

fn name_from(pattern: &Regex, input: &str) -> Option<String> {
    pattern
        .captures(input)
        .and_then(|captures| captures.name(NAME_CAPTURE))
        .map(|name| name.as_str().trim().to_string())
        .filter(|name| !name.is_empty())
}
