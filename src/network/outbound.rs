//! Outbound Mapping
//!
//! Turns applied state transitions into wire messages. Works on the diff
//! between the state before and after an event, so rejected events (spell
//! not in hand, unaffordable purchase) publish nothing.

use std::sync::Arc;
use async_trait::async_trait;

use crate::engine::coordinator::Subscriber;
use crate::game::catalog::Catalog;
use crate::game::combat;
use crate::game::events::{GameEvent, GameEventData};
use crate::game::state::DuelState;
use crate::network::protocol::WireMessage;
use crate::network::sync::NetworkSync;

/// Wire messages announcing what `event` changed.
///
/// | Transition                     | Message          |
/// |--------------------------------|------------------|
/// | offensive cast applied         | `attack`         |
/// | health or max health changed   | `health_changed` |
/// | equipment changed              | `items_state`    |
/// | gold changed                   | `gold_state`     |
pub fn outbound_messages(
    event: &GameEvent,
    previous: &DuelState,
    current: &DuelState,
    catalog: &Catalog,
) -> Vec<WireMessage> {
    let me = current.player_name.as_str();
    let mut out = Vec::new();

    if let GameEventData::SpellCast { spell, target } = &event.data {
        let applied = previous.available_spells.contains(spell)
            && !current.available_spells.contains(spell);
        if applied {
            if let Some(base) = catalog.spell(spell).and_then(|def| def.base_damage()) {
                let damage = combat::outgoing_damage(base, &previous.equipped_items, catalog);
                out.push(WireMessage::attack(me, target.as_str(), spell.as_str(), damage));
            }
        }
    }

    if previous.health != current.health || previous.max_health != current.max_health {
        out.push(WireMessage::health_changed(me, current.health, current.max_health));
    }
    if previous.equipped_items != current.equipped_items {
        out.push(WireMessage::items_state(me, current.equipped_items.clone()));
    }
    if previous.gold != current.gold {
        out.push(WireMessage::gold_state(me, current.gold));
    }

    out
}

/// Subscriber that publishes [`outbound_messages`] after every event.
pub struct OutboundMapper {
    sync: Arc<NetworkSync>,
    catalog: Arc<Catalog>,
}

impl OutboundMapper {
    /// Publish through `sync`, computing damage with `catalog`.
    pub fn new(sync: Arc<NetworkSync>, catalog: Arc<Catalog>) -> Self {
        Self { sync, catalog }
    }
}

#[async_trait]
impl Subscriber for OutboundMapper {
    async fn on_message_processed(
        &mut self,
        event: &GameEvent,
        previous: &DuelState,
        current: &Arc<DuelState>,
    ) {
        for message in outbound_messages(event, previous, current, &self.catalog) {
            self.sync.publish(&message).await;
        }
    }
}
