use std::fmt::Display;

use serde::{Deserialize, Serialize};
use strum::EnumIter;

/// The lowest value a vital can have.
pub const VITAL_MIN: f32 = 0.0;

/// The highest value a vital can have.
pub const VITAL_MAX: f32 = 100.0;

/// A kind of vital tracked for every entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VitalKind {
    /// How non-hungry the entity is.
    Food,
    /// How non-thirsty the entity is.
    Water,
}

impl Display for VitalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let string = match self {
            VitalKind::Food => "FOOD",
            VitalKind::Water => "WATER",
        };

        string.fmt(f)
    }
}

/// Forces the provided value into the allowed range for vitals.
pub fn clamp_vital(value: f32) -> f32 {
    if value.is_nan() {
        return VITAL_MIN;
    }

    value.clamp(VITAL_MIN, VITAL_MAX)
}
