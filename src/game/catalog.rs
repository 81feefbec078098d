//! Spell and Item Catalog
//!
//! Read-only definitions the reducer looks names up in. Balancing data lives
//! outside the engine; callers build a catalog and inject it, the reducer
//! never hardcodes a table.

use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};

use crate::game::state::EquipmentSlot;

/// Damage category of a spell, used for resistances.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpellCategory {
    /// Fire damage
    Fire,
    /// Frost damage
    Frost,
    /// Lightning damage
    Lightning,
    /// Arcane damage
    Arcane,
    /// Healing
    Holy,
}

/// What a spell does when cast.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "amount", rename_all = "snake_case")]
pub enum SpellEffect {
    /// Offensive spell with base damage.
    Damage(i32),
    /// Self-cast heal amount.
    Heal(i32),
}

/// Static spell definition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpellDef {
    /// Unique spell name.
    pub name: String,
    /// Damage category.
    pub category: SpellCategory,
    /// Cast effect.
    pub effect: SpellEffect,
    /// Shop price in gold.
    pub cost: u32,
}

impl SpellDef {
    /// Base damage if offensive.
    pub fn base_damage(&self) -> Option<i32> {
        match self.effect {
            SpellEffect::Damage(amount) => Some(amount),
            SpellEffect::Heal(_) => None,
        }
    }

    /// Heal amount if defensive.
    pub fn heal_amount(&self) -> Option<i32> {
        match self.effect {
            SpellEffect::Heal(amount) => Some(amount),
            SpellEffect::Damage(_) => None,
        }
    }
}

/// Static item definition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemDef {
    /// Unique item name.
    pub name: String,
    /// Slot the item occupies.
    pub slot: EquipmentSlot,
    /// Multiplier applied to outgoing spell damage (1.0 = none).
    pub damage_modifier: f64,
    /// Flat reduction of incoming damage.
    pub armor: i32,
    /// Passive bonus to maximum health.
    pub health_bonus: i32,
    /// Incoming damage multipliers per spell category.
    #[serde(default)]
    pub resistances: BTreeMap<SpellCategory, f64>,
    /// Shop price in gold.
    pub cost: u32,
}

impl ItemDef {
    /// Create a plain item with no modifiers.
    pub fn new(name: impl Into<String>, slot: EquipmentSlot, cost: u32) -> Self {
        Self {
            name: name.into(),
            slot,
            damage_modifier: 1.0,
            armor: 0,
            health_bonus: 0,
            resistances: BTreeMap::new(),
            cost,
        }
    }

    /// Set the outgoing damage multiplier.
    pub fn with_damage_modifier(mut self, modifier: f64) -> Self {
        self.damage_modifier = modifier;
        self
    }

    /// Set the armor value.
    pub fn with_armor(mut self, armor: i32) -> Self {
        self.armor = armor;
        self
    }

    /// Set the passive health bonus.
    pub fn with_health_bonus(mut self, bonus: i32) -> Self {
        self.health_bonus = bonus;
        self
    }

    /// Register a resistance multiplier for a category.
    pub fn with_resistance(mut self, category: SpellCategory, multiplier: f64) -> Self {
        self.resistances.insert(category, multiplier);
        self
    }

    /// Resistance multiplier for a category (1.0 when none registered).
    pub fn resistance(&self, category: SpellCategory) -> f64 {
        self.resistances.get(&category).copied().unwrap_or(1.0)
    }
}

/// Lookup table of every spell and item known to a session.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    spells: BTreeMap<String, SpellDef>,
    items: BTreeMap<String, ItemDef>,
}

impl Catalog {
    /// Empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a spell definition.
    pub fn with_spell(
        mut self,
        name: impl Into<String>,
        category: SpellCategory,
        effect: SpellEffect,
        cost: u32,
    ) -> Self {
        let name = name.into();
        self.spells.insert(name.clone(), SpellDef { name, category, effect, cost });
        self
    }

    /// Add an item definition.
    pub fn with_item(mut self, item: ItemDef) -> Self {
        self.items.insert(item.name.clone(), item);
        self
    }

    /// Look up a spell.
    pub fn spell(&self, name: &str) -> Option<&SpellDef> {
        self.spells.get(name)
    }

    /// Look up an item.
    pub fn item(&self, name: &str) -> Option<&ItemDef> {
        self.items.get(name)
    }

    /// All spell names in sorted order.
    pub fn spell_names(&self) -> Vec<String> {
        self.spells.keys().cloned().collect()
    }

    /// All item names in sorted order.
    pub fn item_names(&self) -> Vec<String> {
        self.items.keys().cloned().collect()
    }

    /// Small built-in table for demos and tests.
    pub fn starter() -> Self {
        Self::new()
            .with_spell("Fireball", SpellCategory::Fire, SpellEffect::Damage(20), 10)
            .with_spell("Frostbolt", SpellCategory::Frost, SpellEffect::Damage(15), 8)
            .with_spell("Chain Lightning", SpellCategory::Lightning, SpellEffect::Damage(25), 14)
            .with_spell("Arcane Missile", SpellCategory::Arcane, SpellEffect::Damage(10), 5)
            .with_spell("Heal", SpellCategory::Holy, SpellEffect::Heal(20), 10)
            .with_item(
                ItemDef::new("Iron Sword", EquipmentSlot::Weapon, 15).with_damage_modifier(1.25),
            )
            .with_item(
                ItemDef::new("Chainmail", EquipmentSlot::Armor, 20)
                    .with_armor(5)
                    .with_health_bonus(20),
            )
            .with_item(
                ItemDef::new("Ember Amulet", EquipmentSlot::Accessory, 12)
                    .with_resistance(SpellCategory::Fire, 0.5),
            )
            .with_item(
                ItemDef::new("Leather Cap", EquipmentSlot::Head, 6)
                    .with_armor(2)
                    .with_health_bonus(10),
            )
            .with_item(
                ItemDef::new("Wizard Hat", EquipmentSlot::Head, 18).with_damage_modifier(1.1),
            )
    }
}
