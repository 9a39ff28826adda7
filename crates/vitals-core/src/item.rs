use serde::Deserialize;

use crate::{EffectKind, Vec3};

/// The consumption data of an item.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct ItemData {
    /// How much consuming the item changes the vital by.
    pub amount: Option<f32>,
    /// The sound to play when the item is consumed.
    pub sound: Option<String>,
    /// The bone to attach the item to while consuming it.
    pub bone: Option<u32>,
    /// The offset of the held item from the bone.
    pub pos: Option<Vec3>,
    /// The rotation of the held item.
    pub rot: Option<Vec3>,
}

/// An item that an entity is consuming.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConsumedItem {
    /// The name of the item.
    pub name: String,
    /// The model of the item, for holding it.
    #[serde(default)]
    pub model: Option<String>,
    /// The consumption data, if the item has any.
    #[serde(default)]
    pub data: Option<ItemData>,
}

impl ConsumedItem {
    /// The amount consuming the item changes a vital by. Items without a usable amount do nothing when consumed.
    pub fn amount(&self) -> Option<f32> {
        self.data
            .as_ref()
            .and_then(|data| data.amount)
            .filter(|amount| amount.is_finite() && *amount != 0.0)
    }
}

/// An item that can be consumed, and what consuming it does.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ItemDefinition {
    /// The effect consuming the item has.
    pub effect: EffectKind,
    #[serde(flatten)]
    pub item: ConsumedItem,
}

impl ItemDefinition {
    /// Creates a definition with just a name and an amount.
    pub fn new(name: &str, effect: EffectKind, amount: f32) -> ItemDefinition {
        ItemDefinition {
            effect,
            item: ConsumedItem {
                name: name.to_string(),
                model: None,
                data: Some(ItemData {
                    amount: Some(amount),
                    ..ItemData::default()
                }),
            },
        }
    }

    /// Sets the model of the item.
    pub fn with_model(mut self, model: &str) -> ItemDefinition {
        self.item.model = Some(model.to_string());
        self
    }

    /// Sets the sound played when consuming the item.
    pub fn with_sound(mut self, sound: &str) -> ItemDefinition {
        if let Some(data) = self.item.data.as_mut() {
            data.sound = Some(sound.to_string());
        }
        self
    }

    /// The items available when none are configured.
    pub fn defaults() -> Vec<ItemDefinition> {
        vec![
            ItemDefinition::new("sandwich", EffectKind::Food, 20.0),
            ItemDefinition::new("burger", EffectKind::Food, 35.0).with_model("prop_cs_burger_01"),
            ItemDefinition::new("water bottle", EffectKind::Water, 25.0),
            ItemDefinition::new("cola", EffectKind::Water, 15.0)
                .with_model("prop_ecola_can")
                .with_sound("cola_open"),
        ]
    }
}

/// The set of items that can be consumed.
#[derive(Debug, Clone, Default)]
pub struct ItemCatalog {
    items: Vec<ItemDefinition>,
}

impl ItemCatalog {
    pub fn new(items: Vec<ItemDefinition>) -> ItemCatalog {
        ItemCatalog { items }
    }

    /// Finds the item with the provided name, ignoring case.
    pub fn find(&self, name: &str) -> Option<&ItemDefinition> {
        let name = name.trim();
        self.items
            .iter()
            .find(|definition| definition.item.name.eq_ignore_ascii_case(name))
    }

    /// Finds the items with the provided effect.
    pub fn with_effect(&self, effect: EffectKind) -> impl Iterator<Item = &ItemDefinition> {
        self.items
            .iter()
            .filter(move |definition| definition.effect == effect)
    }
}
