//! Spellsync Demo
//!
//! Two peers duelling over one in-process feed. Each peer runs a full
//! session (timers, sync, coordinator); a scripted player casts, heals,
//! equips and shops from its snapshots.

use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use spellsync::{
    VERSION,
    core::hash::short_hex,
    engine::{GameSession, SessionConfig, SessionHandle, Subscriber},
    game::{Catalog, DuelState, GameEvent, GameEventData},
    network::MemoryFeed,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let demo_secs = std::env::var("SPELLSYNC_DEMO_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(20u64);

    info!("Spellsync v{}", VERSION);
    info!("Demo duration: {}s", demo_secs);

    let catalog = Arc::new(Catalog::starter());
    let feed = Arc::new(MemoryFeed::new());

    let mut handles = Vec::new();
    let mut sessions = Vec::new();
    for name in ["alice", "bob"] {
        let mut config = SessionConfig::from_env();
        config.player_name = name.to_string();

        let mut session = GameSession::new(config, catalog.clone(), feed.clone());
        session.subscribe(Box::new(LogRenderer { player: name }));

        let handle = session.handle();
        tokio::spawn(scripted_player(handle.clone(), catalog.clone()));
        sessions.push((name, tokio::spawn(session.run())));
        handles.push(handle);
    }

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(demo_secs)) => {}
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
    }

    info!("=== Shutting Down ===");
    for handle in &handles {
        handle.shutdown();
    }

    info!("=== Results ===");
    for (name, task) in sessions {
        match task.await? {
            Ok(state) => info!(
                "{}: {}/{} hp, {} gold, {} spells, fingerprint {}",
                name,
                state.health,
                state.max_health,
                state.gold,
                state.available_spells.len(),
                short_hex(&state.fingerprint()),
            ),
            Err(e) => warn!("{} failed: {}", name, e),
        }
    }

    Ok(())
}

/// Prints combat log lines as they appear.
struct LogRenderer {
    player: &'static str,
}

#[async_trait]
impl Subscriber for LogRenderer {
    async fn on_message_processed(
        &mut self,
        _event: &GameEvent,
        previous: &DuelState,
        current: &Arc<DuelState>,
    ) {
        if previous.combat_logs == current.combat_logs {
            return;
        }
        let previous_last = previous.combat_logs.last();
        let entries: Vec<&str> = current.combat_logs.iter().collect();
        let start = previous_last
            .and_then(|last| entries.iter().rposition(|e| *e == last))
            .map_or(0, |i| i + 1);
        for line in &entries[start..] {
            info!("[{}] {}", self.player, line);
        }
    }
}

/// Stand-in for the filesystem collaborator: acts on the latest snapshot
/// every few seconds.
async fn scripted_player(handle: SessionHandle, catalog: Arc<Catalog>) {
    let mut tick = tokio::time::interval(Duration::from_millis(2500));

    loop {
        tick.tick().await;
        if handle.is_shutting_down() {
            break;
        }

        let state = handle.state();
        if state.is_game_over() {
            info!("{} is out of the fight", state.player_name);
            break;
        }

        // Heal when hurt.
        let heal = state
            .available_spells
            .iter()
            .find(|s| catalog.spell(s).and_then(|d| d.heal_amount()).is_some());
        if let Some(spell) = heal.filter(|_| state.health < state.max_health - 15) {
            handle.enqueue(GameEvent::self_cast(spell.as_str()));
            continue;
        }

        // Equip whatever is in the bag.
        if let Some((item, def)) = state
            .available_items
            .iter()
            .find_map(|name| catalog.item(name).map(|def| (name, def)))
        {
            handle.enqueue(GameEvent::item_equipped(def.slot, item.as_str()));
        }

        // Attack the first opponent.
        let attack = state
            .available_spells
            .iter()
            .find(|s| catalog.spell(s).and_then(|d| d.base_damage()).is_some());
        if let (Some(spell), Some(target)) = (attack, state.opponent_names().next()) {
            handle.enqueue(GameEvent::spell_cast(spell.as_str(), target));
            continue;
        }

        // Otherwise shop.
        if let Some((spell, cost)) = state
            .shop_spells
            .iter()
            .filter_map(|name| catalog.spell(name).map(|def| (name, def.cost)))
            .find(|(_, cost)| *cost <= state.gold)
        {
            handle.enqueue(GameEvent::now(GameEventData::SpellPurchased {
                spell: spell.clone(),
                cost,
            }));
        }
    }
}
