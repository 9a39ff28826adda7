//! Configuration for the vitals system, loadable from TOML.

use std::{fs, path::Path, time::Duration};

use log::info;
use serde::Deserialize;

use crate::{
    item::ItemDefinition, Result, Threshold, Vec3, VitalKind, VitalsError, VITAL_MAX,
    VITAL_MIN,
};

/// The bone ID of the right hand.
pub const SKEL_R_HAND: u32 = 57005;

/// Configuration for the vitals system.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct VitalsConfig {
    /// How long to wait between decay ticks, in milliseconds.
    ///
    /// Every tracked entity loses `decay_per_tick` of each vital once per interval.
    pub tick_interval_ms: u64,
    /// The value every vital starts at when an entity is attached.
    pub initial_value: f32,
    /// How fast each vital decays.
    pub vitals: DecayRates,
    /// The thresholds that raise events when crossed.
    pub thresholds: Vec<Threshold>,
    /// What consuming an item of each kind looks like.
    pub effects: EffectProfiles,
    /// Options for the game server.
    pub server: ServerOptions,
    /// The items players can consume.
    pub items: Vec<ItemDefinition>,
}

/// Decay settings for each vital.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DecayRates {
    pub food: DecayConfig,
    pub water: DecayConfig,
}

/// Decay settings for a single vital.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DecayConfig {
    /// How much is subtracted from the vital each decay tick.
    pub decay_per_tick: f32,
}

/// Consumption effect settings for each kind of item.
///
/// Fields missing from a kind's table keep that kind's default.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "EffectProfileOverrides")]
pub struct EffectProfiles {
    pub food: EffectProfile,
    pub water: EffectProfile,
}

/// What consuming one kind of item looks like.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EffectProfile {
    /// How long the held object and the animation last, in milliseconds.
    pub duration_ms: u64,
    /// The animation dictionary to play from.
    pub animation_dict: String,
    /// The animation to play.
    pub animation_name: String,
    /// The object to hold if the item doesn't have its own model.
    pub model: String,
    /// The bone to attach the object to if the item doesn't say.
    pub bone: u32,
    /// The offset of the object from the bone if the item doesn't say.
    pub pos: Vec3,
    /// The rotation of the object if the item doesn't say.
    pub rot: Vec3,
}

/// The effect settings a config file gives, for each kind of item.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EffectProfileOverrides {
    food: EffectProfileOverride,
    water: EffectProfileOverride,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct EffectProfileOverride {
    duration_ms: Option<u64>,
    animation_dict: Option<String>,
    animation_name: Option<String>,
    model: Option<String>,
    bone: Option<u32>,
    pos: Option<Vec3>,
    rot: Option<Vec3>,
}

impl EffectProfileOverride {
    /// Replaces the fields of `base` that this override sets.
    fn apply(self, base: EffectProfile) -> EffectProfile {
        EffectProfile {
            duration_ms: self.duration_ms.unwrap_or(base.duration_ms),
            animation_dict: self.animation_dict.unwrap_or(base.animation_dict),
            animation_name: self.animation_name.unwrap_or(base.animation_name),
            model: self.model.unwrap_or(base.model),
            bone: self.bone.unwrap_or(base.bone),
            pos: self.pos.unwrap_or(base.pos),
            rot: self.rot.unwrap_or(base.rot),
        }
    }
}

impl From<EffectProfileOverrides> for EffectProfiles {
    fn from(overrides: EffectProfileOverrides) -> Self {
        let defaults = EffectProfiles::default();
        EffectProfiles {
            food: overrides.food.apply(defaults.food),
            water: overrides.water.apply(defaults.water),
        }
    }
}

/// Options for the game server.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerOptions {
    /// The address to listen on.
    pub address: String,
    /// Whether every player that connects gets admin permissions. Meant for local play.
    pub grant_admin: bool,
}

impl Default for VitalsConfig {
    fn default() -> Self {
        VitalsConfig {
            tick_interval_ms: 60_000,
            initial_value: VITAL_MAX,
            vitals: DecayRates::default(),
            thresholds: default_thresholds(),
            effects: EffectProfiles::default(),
            server: ServerOptions::default(),
            items: ItemDefinition::defaults(),
        }
    }
}

impl Default for DecayRates {
    fn default() -> Self {
        DecayRates {
            food: DecayConfig::default(),
            water: DecayConfig::default(),
        }
    }
}

impl Default for DecayConfig {
    fn default() -> Self {
        DecayConfig {
            decay_per_tick: 1.0,
        }
    }
}

impl Default for EffectProfiles {
    fn default() -> Self {
        EffectProfiles {
            food: EffectProfile {
                duration_ms: 6000,
                animation_dict: "amb@code_human_wander_eating_donut@male@idle_a".to_string(),
                animation_name: "idle_c".to_string(),
                model: "prop_sandwich_01".to_string(),
                bone: SKEL_R_HAND,
                pos: Vec3::new(0.15, -0.02, -0.05),
                rot: Vec3::new(-180.0, -150.0, -95.0),
            },
            water: EffectProfile {
                duration_ms: 5000,
                animation_dict: "amb@world_human_drinking@beer@male@idle_a".to_string(),
                animation_name: "idle_c".to_string(),
                model: "prop_ld_flow_bottle".to_string(),
                bone: SKEL_R_HAND,
                pos: Vec3::new(0.13, 0.0, -0.05),
                rot: Vec3::new(100.0, -220.0, 180.0),
            },
        }
    }
}

impl Default for ServerOptions {
    fn default() -> Self {
        ServerOptions {
            address: "0.0.0.0:8080".to_string(),
            grant_admin: true,
        }
    }
}

fn default_thresholds() -> Vec<Threshold> {
    vec![
        Threshold::falling(VitalKind::Food, 25.0, "very_hungry")
            .with_message("You feel very hungry."),
        Threshold::falling(VitalKind::Food, 0.0, "starving").with_message("You are starving!"),
        Threshold::falling(VitalKind::Water, 25.0, "very_thirsty")
            .with_message("You feel very thirsty."),
        Threshold::falling(VitalKind::Water, 0.0, "dehydrated")
            .with_message("You are dying of thirst!"),
    ]
}

impl EffectProfiles {
    /// The settings for items that restore the provided vital.
    pub fn get(&self, kind: VitalKind) -> &EffectProfile {
        match kind {
            VitalKind::Food => &self.food,
            VitalKind::Water => &self.water,
        }
    }
}

impl EffectProfile {
    /// How long the held object and the animation last.
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

impl VitalsConfig {
    /// Parses a config from TOML. Missing fields get their default values.
    pub fn from_toml_str(contents: &str) -> Result<VitalsConfig> {
        let config: VitalsConfig = toml::from_str(contents)?;
        config.validate()?;

        Ok(config)
    }

    /// Loads a config from the TOML file at the provided path.
    pub fn load(path: impl AsRef<Path>) -> Result<VitalsConfig> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let config = VitalsConfig::from_toml_str(&contents)?;
        info!("Loaded vitals config from {}", path.display());

        Ok(config)
    }

    /// The time between decay ticks.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// How much the provided vital decays per tick.
    pub fn decay_per_tick(&self, kind: VitalKind) -> f32 {
        match kind {
            VitalKind::Food => self.vitals.food.decay_per_tick,
            VitalKind::Water => self.vitals.water.decay_per_tick,
        }
    }

    /// Checks the config for values that make no sense.
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_ms == 0 {
            return Err(VitalsError::Config(
                "tick_interval_ms must be greater than 0".to_string(),
            ));
        }

        if !(VITAL_MIN..=VITAL_MAX).contains(&self.initial_value) {
            return Err(VitalsError::Config(format!(
                "initial_value ({}) must be between {VITAL_MIN} and {VITAL_MAX}",
                self.initial_value
            )));
        }

        for (kind, rate) in [
            (VitalKind::Food, self.vitals.food.decay_per_tick),
            (VitalKind::Water, self.vitals.water.decay_per_tick),
        ] {
            if rate.is_nan() || rate < 0.0 {
                return Err(VitalsError::Config(format!(
                    "decay_per_tick for {kind} ({rate}) must not be negative"
                )));
            }
        }

        for threshold in &self.thresholds {
            if !(VITAL_MIN..=VITAL_MAX).contains(&threshold.value) {
                return Err(VitalsError::Config(format!(
                    "threshold {} ({}) must be between {VITAL_MIN} and {VITAL_MAX}",
                    threshold.name, threshold.value
                )));
            }
        }

        for (kind, profile) in [
            (VitalKind::Food, &self.effects.food),
            (VitalKind::Water, &self.effects.water),
        ] {
            if profile.duration_ms == 0 {
                return Err(VitalsError::Config(format!(
                    "effect duration_ms for {kind} must be greater than 0"
                )));
            }
        }

        Ok(())
    }
}
