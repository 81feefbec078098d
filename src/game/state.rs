//! Duel State Definitions
//!
//! Immutable snapshot of one player's simulation. Uses BTreeMap/BTreeSet for
//! deterministic iteration and hashing.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use serde::{Serialize, Deserialize};

use crate::core::hash::{StateHash, StateHasher, compute_state_hash};
use crate::game::log::CombatLog;

/// Maximum health with nothing equipped.
pub const BASE_MAX_HEALTH: i32 = 100;

/// Health assigned to an opponent when first seen.
pub const OPPONENT_START_HEALTH: i32 = 100;

// =============================================================================
// EQUIPMENT
// =============================================================================

/// Fixed set of equipment slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum EquipmentSlot {
    /// Damage modifiers
    Weapon = 0,
    /// Armor and health bonuses
    Armor = 1,
    /// Rings, amulets, wards
    Accessory = 2,
    /// Helmets and hats
    Head = 3,
}

impl EquipmentSlot {
    /// All slots in canonical order.
    pub const ALL: [EquipmentSlot; 4] = [
        EquipmentSlot::Weapon,
        EquipmentSlot::Armor,
        EquipmentSlot::Accessory,
        EquipmentSlot::Head,
    ];

    /// Slot name as used on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            EquipmentSlot::Weapon => "Weapon",
            EquipmentSlot::Armor => "Armor",
            EquipmentSlot::Accessory => "Accessory",
            EquipmentSlot::Head => "Head",
        }
    }
}

impl fmt::Display for EquipmentSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EquipmentSlot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EquipmentSlot::ALL
            .into_iter()
            .find(|slot| slot.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown equipment slot: {s}"))
    }
}

/// Item name per slot. Serialized as `{"Weapon": name|null, ...}`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Equipment {
    /// Weapon slot
    #[serde(default)]
    pub weapon: Option<String>,
    /// Armor slot
    #[serde(default)]
    pub armor: Option<String>,
    /// Accessory slot
    #[serde(default)]
    pub accessory: Option<String>,
    /// Head slot
    #[serde(default)]
    pub head: Option<String>,
}

impl Equipment {
    /// Item in a slot.
    pub fn get(&self, slot: EquipmentSlot) -> Option<&str> {
        match slot {
            EquipmentSlot::Weapon => self.weapon.as_deref(),
            EquipmentSlot::Armor => self.armor.as_deref(),
            EquipmentSlot::Accessory => self.accessory.as_deref(),
            EquipmentSlot::Head => self.head.as_deref(),
        }
    }

    /// Put an item in a slot, returning the displaced one.
    pub fn set(&mut self, slot: EquipmentSlot, item: Option<String>) -> Option<String> {
        let target = match slot {
            EquipmentSlot::Weapon => &mut self.weapon,
            EquipmentSlot::Armor => &mut self.armor,
            EquipmentSlot::Accessory => &mut self.accessory,
            EquipmentSlot::Head => &mut self.head,
        };
        std::mem::replace(target, item)
    }

    /// Names of all equipped items in slot order.
    pub fn equipped(&self) -> impl Iterator<Item = &str> {
        EquipmentSlot::ALL.into_iter().filter_map(move |slot| self.get(slot))
    }

    /// True when no slot is filled.
    pub fn is_empty(&self) -> bool {
        self.equipped().next().is_none()
    }

    fn hash_into(&self, hasher: &mut StateHasher) {
        for slot in EquipmentSlot::ALL {
            hasher.update_opt_str(self.get(slot));
        }
    }
}

// =============================================================================
// DUEL STATE
// =============================================================================

/// Complete simulation state of the local player.
///
/// Owned by the loop coordinator and replaced wholesale on every event;
/// everyone else sees it through a shared read-only snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DuelState {
    /// Local player identity (also the sender id on the wire)
    pub player_name: String,

    /// Current health, 0..=max_health
    pub health: i32,

    /// Maximum health, base plus equipment bonuses
    pub max_health: i32,

    /// Last known health of every tracked opponent
    pub opponents: BTreeMap<String, i32>,

    /// Last reported equipment per opponent
    pub opponent_equipment: BTreeMap<String, Equipment>,

    /// Last reported gold per opponent
    pub opponent_gold: BTreeMap<String, u32>,

    /// Recent combat messages
    pub combat_logs: CombatLog,

    /// Spells in hand
    pub available_spells: BTreeSet<String>,

    /// Items in inventory (not equipped)
    pub available_items: BTreeSet<String>,

    /// Equipped items
    pub equipped_items: Equipment,

    /// Gold balance
    pub gold: u32,

    /// Spells for sale in the current rotation
    pub shop_spells: Vec<String>,

    /// Items for sale in the current rotation
    pub shop_items: Vec<String>,
}

impl DuelState {
    /// Fresh state for a player entering the arena.
    pub fn new(player_name: impl Into<String>) -> Self {
        Self {
            player_name: player_name.into(),
            health: BASE_MAX_HEALTH,
            max_health: BASE_MAX_HEALTH,
            opponents: BTreeMap::new(),
            opponent_equipment: BTreeMap::new(),
            opponent_gold: BTreeMap::new(),
            combat_logs: CombatLog::new(),
            available_spells: BTreeSet::new(),
            available_items: BTreeSet::new(),
            equipped_items: Equipment::default(),
            gold: 0,
            shop_spells: Vec::new(),
            shop_items: Vec::new(),
        }
    }

    /// True once health has dropped to zero.
    pub fn is_game_over(&self) -> bool {
        self.health <= 0
    }

    /// True if the opponent is currently tracked.
    pub fn has_opponent(&self, name: &str) -> bool {
        self.opponents.contains_key(name)
    }

    /// Names of tracked opponents in sorted order.
    pub fn opponent_names(&self) -> impl Iterator<Item = &str> {
        self.opponents.keys().map(String::as_str)
    }

    /// Deterministic fingerprint of the full state.
    pub fn fingerprint(&self) -> StateHash {
        compute_state_hash(&self.player_name, |hasher| {
            hasher.update_i32(self.health);
            hasher.update_i32(self.max_health);
            hasher.update_u32(self.gold);

            hasher.update_u32(self.opponents.len() as u32);
            for (name, health) in &self.opponents {
                hasher.update_str(name);
                hasher.update_i32(*health);
            }
            hasher.update_u32(self.opponent_equipment.len() as u32);
            for (name, equipment) in &self.opponent_equipment {
                hasher.update_str(name);
                equipment.hash_into(hasher);
            }
            hasher.update_u32(self.opponent_gold.len() as u32);
            for (name, gold) in &self.opponent_gold {
                hasher.update_str(name);
                hasher.update_u32(*gold);
            }

            hasher.update_u32(self.combat_logs.len() as u32);
            for entry in self.combat_logs.iter() {
                hasher.update_str(entry);
            }

            for set in [&self.available_spells, &self.available_items] {
                hasher.update_u32(set.len() as u32);
                for name in set {
                    hasher.update_str(name);
                }
            }
            self.equipped_items.hash_into(hasher);

            for list in [&self.shop_spells, &self.shop_items] {
                hasher.update_u32(list.len() as u32);
                for name in list {
                    hasher.update_str(name);
                }
            }
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
