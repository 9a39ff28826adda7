use std::fmt::Display;

use crossterm::style::{style, Stylize};

const BAR_LENGTH: usize = 20;
const BAR_START: &str = "[";
const BAR_END: &str = "]";
const BAR_FILLED: &str = "|";
const BAR_EMPTY: &str = " ";

/// Describes a bar that can be rendered as text.
pub struct TextBar {
    /// The current value
    pub value: f32,
    /// The highest the value can be
    pub max: f32,
    /// The color of the bar
    pub color: crossterm::style::Color,
}

impl Display for TextBar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let values = style(format!(" {:.0}/{:.0}", self.value, self.max))
            .dark_grey()
            .to_string();

        format!("{BAR_START}{}{BAR_END}{values}", self.contents()).fmt(f)
    }
}

impl TextBar {
    /// Builds the middle part of the bar.
    fn contents(&self) -> String {
        let num_filled = self.num_filled();
        let num_empty = BAR_LENGTH.saturating_sub(num_filled);

        format!(
            "{}{}",
            style(BAR_FILLED.repeat(num_filled)).with(self.color),
            BAR_EMPTY.repeat(num_empty)
        )
    }

    fn num_filled(&self) -> usize {
        if self.max <= 0.0 {
            return 0;
        }

        let fraction = (self.value / self.max).clamp(0.0, 1.0);
        (BAR_LENGTH as f32 * fraction).round() as usize
    }
}
