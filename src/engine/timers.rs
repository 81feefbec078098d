//! Timer Producers
//!
//! Periodic spell/item draws, shop rotation and gold income. Each draw picks
//! from the catalog with a [`DeterministicRng`] seeded from the player name,
//! so a restarted session with the same salt deals the same sequence.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::core::rng::DeterministicRng;
use crate::engine::queue::DispatchQueue;
use crate::engine::shutdown::{stopped, ticker};
use crate::game::catalog::Catalog;
use crate::game::events::{GameEvent, GameEventData};

/// Timer schedule.
#[derive(Debug, Clone)]
pub struct TimerConfig {
    /// Interval between spell draws.
    pub spell_draw_interval: Duration,
    /// Interval between item draws.
    pub item_draw_interval: Duration,
    /// Interval between shop rotations.
    pub shop_refresh_interval: Duration,
    /// Interval between gold payouts.
    pub gold_interval: Duration,
    /// Gold per payout.
    pub gold_amount: u32,
    /// Spells and items offered per rotation.
    pub shop_size: usize,
    /// Salt mixed into the draw seed.
    pub seed_salt: u64,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            spell_draw_interval: Duration::from_secs(8),
            item_draw_interval: Duration::from_secs(20),
            shop_refresh_interval: Duration::from_secs(30),
            gold_interval: Duration::from_secs(5),
            gold_amount: 5,
            shop_size: 3,
            seed_salt: 0,
        }
    }
}

/// Builds timer events. Time-independent so draws can be tested directly.
pub struct TimerProducers {
    config: TimerConfig,
    catalog: Arc<Catalog>,
    rng: DeterministicRng,
    spell_names: Vec<String>,
    item_names: Vec<String>,
}

impl TimerProducers {
    /// Create producers for a player.
    pub fn new(player_name: &str, config: TimerConfig, catalog: Arc<Catalog>) -> Self {
        let rng = DeterministicRng::for_player(player_name, config.seed_salt);
        let spell_names = catalog.spell_names();
        let item_names = catalog.item_names();
        Self {
            config,
            catalog,
            rng,
            spell_names,
            item_names,
        }
    }

    /// Deal one spell. `None` when the catalog has no spells.
    pub fn draw_spell(&mut self) -> Option<GameEvent> {
        let spell = self.rng.choose(&self.spell_names)?.clone();
        Some(GameEvent::now(GameEventData::SpellDrawn { spell }))
    }

    /// Deal one item. `None` when the catalog has no items.
    pub fn draw_item(&mut self) -> Option<GameEvent> {
        let item = self.rng.choose(&self.item_names)?.clone();
        Some(GameEvent::now(GameEventData::ItemDrawn { item }))
    }

    /// New shop rotation of up to `shop_size` spells and items.
    pub fn refresh_shop(&mut self) -> GameEvent {
        let spells = self.rng.sample(&self.spell_names, self.config.shop_size);
        let items = self.rng.sample(&self.item_names, self.config.shop_size);
        GameEvent::now(GameEventData::ShopRefreshed { spells, items })
    }

    /// Gold payout.
    pub fn payout(&self) -> GameEvent {
        GameEvent::now(GameEventData::GoldEarned {
            amount: self.config.gold_amount,
        })
    }

    /// Catalog the draws come from.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Run every timer on one task until `shutdown` flips. The first tick of
    /// each timer fires immediately.
    pub fn spawn(mut self, queue: DispatchQueue, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut spell_tick = ticker(self.config.spell_draw_interval);
            let mut item_tick = ticker(self.config.item_draw_interval);
            let mut shop_tick = ticker(self.config.shop_refresh_interval);
            let mut gold_tick = ticker(self.config.gold_interval);

            info!("Timer producers started");

            loop {
                let event = tokio::select! {
                    _ = stopped(&mut shutdown) => break,
                    _ = spell_tick.tick() => self.draw_spell(),
                    _ = item_tick.tick() => self.draw_item(),
                    _ = shop_tick.tick() => Some(self.refresh_shop()),
                    _ = gold_tick.tick() => Some(self.payout()),
                };

                if let Some(event) = event {
                    debug!(kind = event.data.kind(), "Timer fired");
                    queue.enqueue(event);
                }
            }

            info!("Timer producers stopped");
        })
    }
}
