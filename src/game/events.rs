//! Game Events
//!
//! Everything that can change a [`DuelState`](crate::game::state::DuelState),
//! as one tagged union. Producers stamp each event with its occurrence time so
//! the reducer never reads a clock.

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

use crate::game::state::{Equipment, EquipmentSlot};

/// Which kind of producer an event comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventOrigin {
    /// Player actions observed by the filesystem collaborator
    LocalInput,
    /// Translated from peer wire messages
    Network,
    /// Periodic draws and shop rotation
    Timer,
    /// Gold income and purchases
    Economy,
    /// Session start and housekeeping
    Lifecycle,
}

/// Event payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEventData {
    // ---- local input ----
    /// Offensive spell cast at an opponent.
    SpellCast {
        /// Spell name
        spell: String,
        /// Opponent name
        target: String,
    },
    /// Spell cast on self (heal).
    SelfCast {
        /// Spell name
        spell: String,
    },
    /// Item moved into an equipment slot.
    ItemEquipped {
        /// Destination slot
        slot: EquipmentSlot,
        /// Item name
        item: String,
    },

    // ---- network ----
    /// An opponent's attack landed on us.
    SpellReceived {
        /// Sender of the attack
        attacker: String,
        /// Spell name
        spell: String,
        /// Damage before our armor and resistances
        damage: i32,
    },
    /// Opponent announced presence.
    OpponentJoined {
        /// Opponent name
        name: String,
    },
    /// Opponent announced departure.
    OpponentLeft {
        /// Opponent name
        name: String,
    },
    /// Opponent reported its health.
    OpponentHealthChanged {
        /// Opponent name
        name: String,
        /// Reported health
        current_health: i32,
        /// Reported maximum health
        max_health: i32,
    },
    /// Opponent reported its equipment.
    OpponentEquipmentChanged {
        /// Opponent name
        name: String,
        /// Reported loadout
        equipment: Equipment,
    },
    /// Opponent reported its gold.
    OpponentGoldChanged {
        /// Opponent name
        name: String,
        /// Reported gold
        gold: u32,
    },

    // ---- timers ----
    /// A spell was dealt into the hand.
    SpellDrawn {
        /// Spell name
        spell: String,
    },
    /// A spell left the hand without being cast.
    SpellConsumed {
        /// Spell name
        spell: String,
    },
    /// An item was dealt into the inventory.
    ItemDrawn {
        /// Item name
        item: String,
    },
    /// An item left the inventory.
    ItemConsumed {
        /// Item name
        item: String,
    },
    /// New shop rotation.
    ShopRefreshed {
        /// Spells on offer
        spells: Vec<String>,
        /// Items on offer
        items: Vec<String>,
    },

    // ---- economy ----
    /// Gold income.
    GoldEarned {
        /// Gold added
        amount: u32,
    },
    /// Attempt to buy a spell.
    SpellPurchased {
        /// Spell name
        spell: String,
        /// Price in gold
        cost: u32,
    },
    /// Attempt to buy an item.
    ItemPurchased {
        /// Item name
        item: String,
        /// Price in gold
        cost: u32,
    },

    // ---- lifecycle ----
    /// Reset to a fresh state.
    GameStarted {
        /// Local player name
        player_name: String,
    },
    /// Shrink the combat log to the newest `keep` entries.
    LogsPruned {
        /// Entries to keep
        keep: usize,
    },
}

impl GameEventData {
    /// Producer category of this event.
    pub fn origin(&self) -> EventOrigin {
        use GameEventData::*;
        match self {
            SpellCast { .. } | SelfCast { .. } | ItemEquipped { .. } => EventOrigin::LocalInput,
            SpellReceived { .. }
            | OpponentJoined { .. }
            | OpponentLeft { .. }
            | OpponentHealthChanged { .. }
            | OpponentEquipmentChanged { .. }
            | OpponentGoldChanged { .. } => EventOrigin::Network,
            SpellDrawn { .. }
            | SpellConsumed { .. }
            | ItemDrawn { .. }
            | ItemConsumed { .. }
            | ShopRefreshed { .. } => EventOrigin::Timer,
            GoldEarned { .. } | SpellPurchased { .. } | ItemPurchased { .. } => {
                EventOrigin::Economy
            }
            GameStarted { .. } | LogsPruned { .. } => EventOrigin::Lifecycle,
        }
    }

    /// Short variant name for logging.
    pub fn kind(&self) -> &'static str {
        use GameEventData::*;
        match self {
            SpellCast { .. } => "spell_cast",
            SelfCast { .. } => "self_cast",
            ItemEquipped { .. } => "item_equipped",
            SpellReceived { .. } => "spell_received",
            OpponentJoined { .. } => "opponent_joined",
            OpponentLeft { .. } => "opponent_left",
            OpponentHealthChanged { .. } => "opponent_health_changed",
            OpponentEquipmentChanged { .. } => "opponent_equipment_changed",
            OpponentGoldChanged { .. } => "opponent_gold_changed",
            SpellDrawn { .. } => "spell_drawn",
            SpellConsumed { .. } => "spell_consumed",
            ItemDrawn { .. } => "item_drawn",
            ItemConsumed { .. } => "item_consumed",
            ShopRefreshed { .. } => "shop_refreshed",
            GoldEarned { .. } => "gold_earned",
            SpellPurchased { .. } => "spell_purchased",
            ItemPurchased { .. } => "item_purchased",
            GameStarted { .. } => "game_started",
            LogsPruned { .. } => "logs_pruned",
        }
    }
}

/// A game event with its occurrence time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    /// When the producer observed the event
    pub at: DateTime<Utc>,

    /// Event data
    pub data: GameEventData,
}

impl GameEvent {
    /// Create an event stamped with an explicit time.
    pub fn new(at: DateTime<Utc>, data: GameEventData) -> Self {
        Self { at, data }
    }

    /// Create an event stamped with the current wall-clock time.
    pub fn now(data: GameEventData) -> Self {
        Self::new(Utc::now(), data)
    }

    /// Producer category.
    pub fn origin(&self) -> EventOrigin {
        self.data.origin()
    }

    /// Create a spell-cast event.
    pub fn spell_cast(spell: impl Into<String>, target: impl Into<String>) -> Self {
        Self::now(GameEventData::SpellCast {
            spell: spell.into(),
            target: target.into(),
        })
    }

    /// Create a self-cast event.
    pub fn self_cast(spell: impl Into<String>) -> Self {
        Self::now(GameEventData::SelfCast { spell: spell.into() })
    }

    /// Create an item-equipped event.
    pub fn item_equipped(slot: EquipmentSlot, item: impl Into<String>) -> Self {
        Self::now(GameEventData::ItemEquipped { slot, item: item.into() })
    }

    /// Create a game-started event.
    pub fn game_started(player_name: impl Into<String>) -> Self {
        Self::now(GameEventData::GameStarted {
            player_name: player_name.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origins() {
        assert_eq!(GameEvent::spell_cast("Fireball", "bob").origin(), EventOrigin::LocalInput);
        assert_eq!(
            GameEventData::OpponentLeft { name: "bob".into() }.origin(),
            EventOrigin::Network
        );
        assert_eq!(
            GameEventData::ShopRefreshed { spells: vec![], items: vec![] }.origin(),
            EventOrigin::Timer
        );
        assert_eq!(GameEventData::GoldEarned { amount: 5 }.origin(), EventOrigin::Economy);
        assert_eq!(GameEventData::LogsPruned { keep: 3 }.origin(), EventOrigin::Lifecycle);
    }

    #[test]
    fn test_event_json_tag() {
        let event = GameEventData::SpellReceived {
            attacker: "bob".into(),
            spell: "Fireball".into(),
            damage: 15,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"spell_received\""));
        assert_eq!(event.kind(), "spell_received");

        let parsed: GameEventData = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }
}
