use crossterm::style::{style, Color, Stylize};
use itertools::Itertools;
use voca_rs::Voca;

use vitals_core::*;

use crate::text_bar::TextBar;

const INDENT: &str = "  ";

/// Transforms the provided message into a string for display.
pub fn message_to_string(message: GameMessage) -> String {
    match message {
        GameMessage::Error(e) => style(e._capitalize(false)).red().to_string(),
        GameMessage::Message(m) => m._capitalize(false),
        GameMessage::Notification(n) => style(n).bold().to_string(),
        GameMessage::Help(usages) => help_to_string(&usages),
        GameMessage::Vitals(vitals) => vitals_to_string(&vitals),
        GameMessage::ObjectAttached { object, duration } => style(format!(
            "(You're holding {} for {}s.)",
            object.model,
            duration.as_secs()
        ))
        .dark_grey()
        .to_string(),
        GameMessage::ObjectRemoved { uid } => {
            style(format!("(You put away {uid}.)")).dark_grey().to_string()
        }
        GameMessage::Animation { animation, .. } => {
            style(format!("(*{} {}*)", animation.dict, animation.name))
                .dark_grey()
                .to_string()
        }
        GameMessage::Sound(sound) => style(format!("*{sound}*")).italic().to_string(),
    }
}

/// Transforms the provided usages into a string for display.
fn help_to_string(usages: &[String]) -> String {
    format!(
        "Available actions:\n{}",
        usages
            .iter()
            .map(|usage| format!("{INDENT}{usage}"))
            .join("\n")
    )
}

/// Transforms the provided vitals description into a string for display.
fn vitals_to_string(vitals: &VitalsDescription) -> String {
    vitals
        .values
        .iter()
        .map(|(kind, value)| {
            let bar = TextBar {
                value: *value,
                max: VITAL_MAX,
                color: vital_kind_to_color(*kind),
            };
            format!("{:<7}{bar}", format!("{}:", vital_kind_to_bar_title(*kind)))
        })
        .join("\n")
}

/// Determines the bar title to use for a vital.
fn vital_kind_to_bar_title(kind: VitalKind) -> &'static str {
    match kind {
        VitalKind::Food => "Food",
        VitalKind::Water => "Water",
    }
}

/// Determines the bar color to use for a vital.
fn vital_kind_to_color(kind: VitalKind) -> Color {
    match kind {
        VitalKind::Food => Color::Yellow,
        VitalKind::Water => Color::Blue,
    }
}
