//! Protocol Messages
//!
//! Wire format exchanged between peers through the shared feed. JSON with a
//! `type` discriminator and camelCase fields; timestamps are RFC 3339.

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

use crate::game::events::{GameEvent, GameEventData};
use crate::game::state::Equipment;

/// Target id that addresses every peer.
pub const GLOBAL_TARGET: &str = "global";

// =============================================================================
// PEER <-> PEER MESSAGES
// =============================================================================

/// Messages published to the shared feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum WireMessage {
    /// Offensive spell aimed at one peer.
    Attack {
        /// Publishing player
        sender_id: String,
        /// Addressed player
        target_id: String,
        /// Spell name
        spell_name: String,
        /// Damage after the sender's modifiers
        damage: i32,
        /// When the sender published
        timestamp: DateTime<Utc>,
    },

    /// Presence announcement.
    Join {
        /// Publishing player
        sender_id: String,
        /// Display name
        player_name: String,
        /// When the sender published
        timestamp: DateTime<Utc>,
    },

    /// Departure announcement.
    Leave {
        /// Publishing player
        sender_id: String,
        /// When the sender published
        timestamp: DateTime<Utc>,
    },

    /// Sender's health after a change.
    HealthChanged {
        /// Publishing player
        sender_id: String,
        /// Health after the change
        current_health: i32,
        /// Maximum health
        max_health: i32,
        /// When the sender published
        timestamp: DateTime<Utc>,
    },

    /// Sender's equipment after a change.
    ItemsState {
        /// Publishing player
        sender_id: String,
        /// Current loadout
        equipped_items: Equipment,
        /// When the sender published
        timestamp: DateTime<Utc>,
    },

    /// Sender's gold after a change.
    GoldState {
        /// Publishing player
        sender_id: String,
        /// Gold after the change
        gold: u32,
        /// When the sender published
        timestamp: DateTime<Utc>,
    },
}

impl WireMessage {
    /// Create an attack message.
    pub fn attack(
        sender_id: impl Into<String>,
        target_id: impl Into<String>,
        spell_name: impl Into<String>,
        damage: i32,
    ) -> Self {
        WireMessage::Attack {
            sender_id: sender_id.into(),
            target_id: target_id.into(),
            spell_name: spell_name.into(),
            damage,
            timestamp: Utc::now(),
        }
    }

    /// Create a join message. The player name doubles as the sender id.
    pub fn join(player_name: impl Into<String>) -> Self {
        let player_name = player_name.into();
        WireMessage::Join {
            sender_id: player_name.clone(),
            player_name,
            timestamp: Utc::now(),
        }
    }

    /// Create a leave message.
    pub fn leave(sender_id: impl Into<String>) -> Self {
        WireMessage::Leave {
            sender_id: sender_id.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a health report.
    pub fn health_changed(sender_id: impl Into<String>, current_health: i32, max_health: i32) -> Self {
        WireMessage::HealthChanged {
            sender_id: sender_id.into(),
            current_health,
            max_health,
            timestamp: Utc::now(),
        }
    }

    /// Create an equipment report.
    pub fn items_state(sender_id: impl Into<String>, equipped_items: Equipment) -> Self {
        WireMessage::ItemsState {
            sender_id: sender_id.into(),
            equipped_items,
            timestamp: Utc::now(),
        }
    }

    /// Create a gold report.
    pub fn gold_state(sender_id: impl Into<String>, gold: u32) -> Self {
        WireMessage::GoldState {
            sender_id: sender_id.into(),
            gold,
            timestamp: Utc::now(),
        }
    }

    /// Wire discriminator, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            WireMessage::Attack { .. } => "attack",
            WireMessage::Join { .. } => "join",
            WireMessage::Leave { .. } => "leave",
            WireMessage::HealthChanged { .. } => "health_changed",
            WireMessage::ItemsState { .. } => "items_state",
            WireMessage::GoldState { .. } => "gold_state",
        }
    }

    /// Publishing peer.
    pub fn sender_id(&self) -> &str {
        match self {
            WireMessage::Attack { sender_id, .. }
            | WireMessage::Join { sender_id, .. }
            | WireMessage::Leave { sender_id, .. }
            | WireMessage::HealthChanged { sender_id, .. }
            | WireMessage::ItemsState { sender_id, .. }
            | WireMessage::GoldState { sender_id, .. } => sender_id,
        }
    }

    /// Creation time at the sender.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            WireMessage::Attack { timestamp, .. }
            | WireMessage::Join { timestamp, .. }
            | WireMessage::Leave { timestamp, .. }
            | WireMessage::HealthChanged { timestamp, .. }
            | WireMessage::ItemsState { timestamp, .. }
            | WireMessage::GoldState { timestamp, .. } => *timestamp,
        }
    }

    /// Explicit target for attacks, [`GLOBAL_TARGET`] for everything else.
    pub fn target_id(&self) -> &str {
        match self {
            WireMessage::Attack { target_id, .. } => target_id,
            _ => GLOBAL_TARGET,
        }
    }

    /// True if `player` should act on this message: addressed to it or to
    /// everyone, and not sent by it.
    pub fn is_addressed_to(&self, player: &str) -> bool {
        let target = self.target_id();
        (target == player || target == GLOBAL_TARGET) && self.sender_id() != player
    }

    /// Translate to the event a receiving peer applies.
    pub fn to_event_data(&self) -> GameEventData {
        match self {
            WireMessage::Attack { sender_id, spell_name, damage, .. } => GameEventData::SpellReceived {
                attacker: sender_id.clone(),
                spell: spell_name.clone(),
                damage: *damage,
            },
            WireMessage::Join { player_name, .. } => GameEventData::OpponentJoined {
                name: player_name.clone(),
            },
            WireMessage::Leave { sender_id, .. } => GameEventData::OpponentLeft {
                name: sender_id.clone(),
            },
            WireMessage::HealthChanged { sender_id, current_health, max_health, .. } => {
                GameEventData::OpponentHealthChanged {
                    name: sender_id.clone(),
                    current_health: *current_health,
                    max_health: *max_health,
                }
            }
            WireMessage::ItemsState { sender_id, equipped_items, .. } => {
                GameEventData::OpponentEquipmentChanged {
                    name: sender_id.clone(),
                    equipment: equipped_items.clone(),
                }
            }
            WireMessage::GoldState { sender_id, gold, .. } => GameEventData::OpponentGoldChanged {
                name: sender_id.clone(),
                gold: *gold,
            },
        }
    }

    /// Translate to an event stamped with the wire timestamp.
    pub fn to_event(&self) -> GameEvent {
        GameEvent::new(self.timestamp(), self.to_event_data())
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
