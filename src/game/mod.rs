//! Game Logic Module
//!
//! All duel simulation code. 100% deterministic: no I/O, no clocks, no
//! randomness.
//!
//! ## Module Structure
//!
//! - `state`: Duel state, equipment slots
//! - `events`: Everything that can change a state
//! - `reducer`: `apply(state, event, catalog) -> state'`
//! - `combat`: Damage, armor and resistance formulas
//! - `catalog`: Read-only spell and item tables
//! - `log`: Bounded combat log

pub mod catalog;
pub mod combat;
pub mod events;
pub mod log;
pub mod reducer;
pub mod state;

// Re-export key types
pub use catalog::{Catalog, ItemDef, SpellCategory, SpellDef, SpellEffect};
pub use events::{EventOrigin, GameEvent, GameEventData};
pub use log::{CombatLog, MAX_COMBAT_LOGS};
pub use reducer::{apply, replay};
pub use state::{DuelState, Equipment, EquipmentSlot, BASE_MAX_HEALTH};
