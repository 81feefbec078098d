//! Combat Math
//!
//! Damage, armor, resistance and health formulas over an equipment loadout.
//! Shared by the reducer and the outbound mapper so both compute the same
//! numbers for a cast.

use crate::game::catalog::{Catalog, SpellCategory};
use crate::game::state::{Equipment, BASE_MAX_HEALTH};

/// Product of damage modifiers of all equipped items (1.0 when none).
pub fn damage_modifier(equipment: &Equipment, catalog: &Catalog) -> f64 {
    equipment
        .equipped()
        .filter_map(|name| catalog.item(name))
        .map(|item| item.damage_modifier)
        .product()
}

/// Sum of armor of all equipped items.
pub fn total_armor(equipment: &Equipment, catalog: &Catalog) -> i32 {
    equipment
        .equipped()
        .filter_map(|name| catalog.item(name))
        .map(|item| item.armor)
        .sum()
}

/// Product of resistance multipliers for a category (1.0 when none or unknown).
pub fn resistance_multiplier(
    equipment: &Equipment,
    catalog: &Catalog,
    category: Option<SpellCategory>,
) -> f64 {
    let Some(category) = category else {
        return 1.0;
    };
    equipment
        .equipped()
        .filter_map(|name| catalog.item(name))
        .map(|item| item.resistance(category))
        .product()
}

/// Maximum health for a loadout: base plus passive bonuses.
pub fn max_health(equipment: &Equipment, catalog: &Catalog) -> i32 {
    BASE_MAX_HEALTH
        + equipment
            .equipped()
            .filter_map(|name| catalog.item(name))
            .map(|item| item.health_bonus)
            .sum::<i32>()
}

/// Damage dealt by an offensive cast: `floor(base * modifier)`.
pub fn outgoing_damage(base_damage: i32, equipment: &Equipment, catalog: &Catalog) -> i32 {
    (base_damage as f64 * damage_modifier(equipment, catalog)).floor() as i32
}

/// Damage taken from an incoming spell.
///
/// `max(1, base - armor)` scaled by the resistance product for the spell's
/// category and floored.
pub fn incoming_damage(
    base_damage: i32,
    spell: &str,
    equipment: &Equipment,
    catalog: &Catalog,
) -> i32 {
    let after_armor = base_damage.saturating_sub(total_armor(equipment, catalog)).max(1);
    let category = catalog.spell(spell).map(|def| def.category);
    let multiplier = resistance_multiplier(equipment, catalog, category);
    (after_armor as f64 * multiplier).floor() as i32
}
