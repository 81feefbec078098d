//! Reducer
//!
//! `apply(state, event, catalog) -> state'`. Pure, total and deterministic:
//! no I/O, no clock reads, no randomness. Every handler returns `None` when
//! the event changes nothing (unknown entity, unaffordable purchase, spell
//! not in hand) and the reducer then hands back the input state unchanged.

use chrono::{DateTime, Utc};

use crate::game::catalog::Catalog;
use crate::game::combat;
use crate::game::events::{GameEvent, GameEventData};
use crate::game::state::{DuelState, Equipment, EquipmentSlot, OPPONENT_START_HEALTH};

/// Apply one event to a state, producing the next state.
///
/// # Determinism
///
/// The result depends only on `state`, `event` and `catalog`. The log
/// timestamp comes from `event.at`, never from the system clock.
pub fn apply(state: &DuelState, event: &GameEvent, catalog: &Catalog) -> DuelState {
    let at = event.at;
    let next = match &event.data {
        GameEventData::SpellCast { spell, target } => spell_cast(state, at, spell, target, catalog),
        GameEventData::SelfCast { spell } => self_cast(state, at, spell, catalog),
        GameEventData::ItemEquipped { slot, item } => item_equipped(state, at, *slot, item, catalog),

        GameEventData::SpellReceived { attacker, spell, damage } => {
            spell_received(state, at, attacker, spell, *damage, catalog)
        }
        GameEventData::OpponentJoined { name } => opponent_joined(state, at, name),
        GameEventData::OpponentLeft { name } => opponent_left(state, at, name),
        GameEventData::OpponentHealthChanged { name, current_health, max_health } => {
            opponent_health_changed(state, at, name, *current_health, *max_health)
        }
        GameEventData::OpponentEquipmentChanged { name, equipment } => {
            opponent_equipment_changed(state, name, equipment)
        }
        GameEventData::OpponentGoldChanged { name, gold } => opponent_gold_changed(state, name, *gold),

        GameEventData::SpellDrawn { spell } => spell_drawn(state, spell),
        GameEventData::SpellConsumed { spell } => spell_consumed(state, spell),
        GameEventData::ItemDrawn { item } => item_drawn(state, item),
        GameEventData::ItemConsumed { item } => item_consumed(state, item),
        GameEventData::ShopRefreshed { spells, items } => shop_refreshed(state, spells, items),

        GameEventData::GoldEarned { amount } => gold_earned(state, *amount),
        GameEventData::SpellPurchased { spell, cost } => spell_purchased(state, at, spell, *cost),
        GameEventData::ItemPurchased { item, cost } => item_purchased(state, at, item, *cost),

        GameEventData::GameStarted { player_name } => Some(game_started(at, player_name)),
        GameEventData::LogsPruned { keep } => logs_pruned(state, *keep),
    };

    next.unwrap_or_else(|| state.clone())
}

/// Fold a sequence of events over a state.
pub fn replay<'a, I>(state: DuelState, events: I, catalog: &Catalog) -> DuelState
where
    I: IntoIterator<Item = &'a GameEvent>,
{
    events
        .into_iter()
        .fold(state, |acc, event| apply(&acc, event, catalog))
}

// =============================================================================
// LOCAL INPUT
// =============================================================================

fn spell_cast(
    state: &DuelState,
    at: DateTime<Utc>,
    spell: &str,
    target: &str,
    catalog: &Catalog,
) -> Option<DuelState> {
    if !state.available_spells.contains(spell) {
        return None;
    }
    let base = catalog.spell(spell)?.base_damage()?;
    let damage = combat::outgoing_damage(base, &state.equipped_items, catalog);

    let mut next = state.clone();
    next.available_spells.remove(spell);
    next.combat_logs
        .push(at, format!("You cast {spell} at {target} for {damage} damage!"));
    Some(next)
}

fn self_cast(state: &DuelState, at: DateTime<Utc>, spell: &str, catalog: &Catalog) -> Option<DuelState> {
    if !state.available_spells.contains(spell) {
        return None;
    }
    let heal = catalog.spell(spell)?.heal_amount()?;

    let mut next = state.clone();
    next.available_spells.remove(spell);
    next.health = (next.health + heal).min(next.max_health);
    let healed = next.health - state.health;
    next.combat_logs
        .push(at, format!("You cast {spell} and healed for {healed}!"));
    Some(next)
}

fn item_equipped(
    state: &DuelState,
    at: DateTime<Utc>,
    slot: EquipmentSlot,
    item: &str,
    catalog: &Catalog,
) -> Option<DuelState> {
    let def = catalog.item(item)?;
    if def.slot != slot {
        return None;
    }

    let mut next = state.clone();
    next.equipped_items.set(slot, Some(item.to_string()));
    next.available_items.remove(item);

    let new_max = combat::max_health(&next.equipped_items, catalog);
    let delta = new_max - state.max_health;
    next.max_health = new_max;
    next.health = (state.health + delta).clamp(0, new_max);

    next.combat_logs.push(at, format!("You equipped {item} ({slot})"));
    Some(next)
}

// =============================================================================
// NETWORK
// =============================================================================

fn spell_received(
    state: &DuelState,
    at: DateTime<Utc>,
    attacker: &str,
    spell: &str,
    damage: i32,
    catalog: &Catalog,
) -> Option<DuelState> {
    let effective = combat::incoming_damage(damage, spell, &state.equipped_items, catalog);

    let mut next = state.clone();
    next.health = state.health.saturating_sub(effective).max(0);
    next.combat_logs.push(
        at,
        format!("{attacker} hit you with {spell} for {effective} damage!"),
    );
    if state.health > 0 && next.health <= 0 {
        next.combat_logs
            .push(at, format!("You have been defeated by {attacker}!"));
    }
    Some(next)
}

fn opponent_joined(state: &DuelState, at: DateTime<Utc>, name: &str) -> Option<DuelState> {
    if name == state.player_name || state.has_opponent(name) {
        return None;
    }

    let mut next = state.clone();
    next.opponents.insert(name.to_string(), OPPONENT_START_HEALTH);
    next.combat_logs.push(at, format!("{name} has joined the battle!"));
    Some(next)
}

fn opponent_left(state: &DuelState, at: DateTime<Utc>, name: &str) -> Option<DuelState> {
    if !state.has_opponent(name) {
        return None;
    }

    let mut next = state.clone();
    next.opponents.remove(name);
    next.opponent_equipment.remove(name);
    next.opponent_gold.remove(name);
    next.combat_logs.push(at, format!("{name} has left the battle."));
    Some(next)
}

fn opponent_health_changed(
    state: &DuelState,
    at: DateTime<Utc>,
    name: &str,
    current_health: i32,
    max_health: i32,
) -> Option<DuelState> {
    let previous = *state.opponents.get(name)?;

    // Peer-reported values are untrusted: keep health inside [0, max].
    let max_health = max_health.max(0);
    let current_health = current_health.clamp(0, max_health.max(1));

    let mut next = state.clone();
    let delta = i64::from(current_health) - i64::from(previous);
    if delta < 0 {
        next.combat_logs.push(
            at,
            format!("{name} took {} damage ({current_health}/{max_health})", -delta),
        );
    } else if delta > 0 {
        next.combat_logs.push(
            at,
            format!("{name} healed for {delta} ({current_health}/{max_health})"),
        );
    }

    if current_health <= 0 {
        next.opponents.remove(name);
        next.opponent_equipment.remove(name);
        next.opponent_gold.remove(name);
        next.combat_logs.push(at, format!("{name} has been defeated!"));
    } else {
        next.opponents.insert(name.to_string(), current_health);
    }
    Some(next)
}

fn opponent_equipment_changed(state: &DuelState, name: &str, equipment: &Equipment) -> Option<DuelState> {
    if !state.has_opponent(name) || state.opponent_equipment.get(name) == Some(equipment) {
        return None;
    }

    let mut next = state.clone();
    next.opponent_equipment.insert(name.to_string(), equipment.clone());
    Some(next)
}

fn opponent_gold_changed(state: &DuelState, name: &str, gold: u32) -> Option<DuelState> {
    if !state.has_opponent(name) || state.opponent_gold.get(name) == Some(&gold) {
        return None;
    }

    let mut next = state.clone();
    next.opponent_gold.insert(name.to_string(), gold);
    Some(next)
}

// =============================================================================
// TIMERS
// =============================================================================

fn spell_drawn(state: &DuelState, spell: &str) -> Option<DuelState> {
    if state.available_spells.contains(spell) {
        return None;
    }
    let mut next = state.clone();
    next.available_spells.insert(spell.to_string());
    Some(next)
}

fn spell_consumed(state: &DuelState, spell: &str) -> Option<DuelState> {
    if !state.available_spells.contains(spell) {
        return None;
    }
    let mut next = state.clone();
    next.available_spells.remove(spell);
    Some(next)
}

fn item_drawn(state: &DuelState, item: &str) -> Option<DuelState> {
    if state.available_items.contains(item) {
        return None;
    }
    let mut next = state.clone();
    next.available_items.insert(item.to_string());
    Some(next)
}

fn item_consumed(state: &DuelState, item: &str) -> Option<DuelState> {
    if !state.available_items.contains(item) {
        return None;
    }
    let mut next = state.clone();
    next.available_items.remove(item);
    Some(next)
}

fn shop_refreshed(state: &DuelState, spells: &[String], items: &[String]) -> Option<DuelState> {
    let mut next = state.clone();
    next.shop_spells = spells.to_vec();
    next.shop_items = items.to_vec();
    Some(next)
}

// =============================================================================
// ECONOMY
// =============================================================================

fn gold_earned(state: &DuelState, amount: u32) -> Option<DuelState> {
    if amount == 0 {
        return None;
    }
    let mut next = state.clone();
    next.gold = state.gold.saturating_add(amount);
    Some(next)
}

fn spell_purchased(state: &DuelState, at: DateTime<Utc>, spell: &str, cost: u32) -> Option<DuelState> {
    if state.gold < cost {
        return None;
    }
    let mut next = state.clone();
    next.gold -= cost;
    next.available_spells.insert(spell.to_string());
    next.combat_logs.push(at, format!("You bought {spell} for {cost} gold"));
    Some(next)
}

fn item_purchased(state: &DuelState, at: DateTime<Utc>, item: &str, cost: u32) -> Option<DuelState> {
    if state.gold < cost {
        return None;
    }
    let mut next = state.clone();
    next.gold -= cost;
    next.available_items.insert(item.to_string());
    next.combat_logs.push(at, format!("You bought {item} for {cost} gold"));
    Some(next)
}

// =============================================================================
// LIFECYCLE
// =============================================================================

fn game_started(at: DateTime<Utc>, player_name: &str) -> DuelState {
    let mut fresh = DuelState::new(player_name);
    fresh.combat_logs.push(at, format!("{player_name} entered the arena"));
    fresh
}

fn logs_pruned(state: &DuelState, keep: usize) -> Option<DuelState> {
    if state.combat_logs.len() <= keep {
        return None;
    }
    let mut next = state.clone();
    next.combat_logs.prune(keep);
    Some(next)
}

// =============================================================================
// TESTS
// =============================================================================
