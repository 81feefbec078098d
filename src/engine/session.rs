//! Game Session
//!
//! Wires one player's pipeline together and owns its lifecycle: dispatch
//! queue, loop coordinator, network sync, outbound mapper and timers.
//!
//! Startup order: GameStarted is queued first, the shared feed is opened
//! (fatal on failure), timers and the coordinator are spawned. Shutdown
//! closes the queue, lets the coordinator finish its in-flight event,
//! stops the timers, announces departure and waits for the poll loop.

use std::env;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinError;
use tracing::{info, instrument};

use crate::engine::coordinator::{LoopCoordinator, Subscriber};
use crate::engine::queue::{DispatchQueue, EventReceiver};
use crate::engine::shutdown::stopped;
use crate::engine::timers::{TimerConfig, TimerProducers};
use crate::game::catalog::Catalog;
use crate::game::events::GameEvent;
use crate::game::state::DuelState;
use crate::network::feed::SharedFeed;
use crate::network::outbound::OutboundMapper;
use crate::network::sync::{NetworkSync, SyncConfig, SyncError};

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Local player name, also the sender id on the wire.
    pub player_name: String,
    /// Network sync settings.
    pub sync: SyncConfig,
    /// Timer schedule.
    pub timers: TimerConfig,
    /// Run the draw, shop and gold timers.
    pub enable_timers: bool,
}

impl SessionConfig {
    /// Defaults for a named player.
    pub fn new(player_name: impl Into<String>) -> Self {
        Self {
            player_name: player_name.into(),
            sync: SyncConfig::default(),
            timers: TimerConfig::default(),
            enable_timers: true,
        }
    }

    /// Create config from environment variables.
    ///
    /// | Variable               | Field                 |
    /// |------------------------|-----------------------|
    /// | `SPELLSYNC_PLAYER`     | `player_name`         |
    /// | `SPELLSYNC_POLL_MS`    | `sync.poll_interval`  |
    /// | `SPELLSYNC_TTL_SECS`   | `sync.message_ttl`    |
    /// | `SPELLSYNC_SEED`       | `timers.seed_salt`    |
    /// | `SPELLSYNC_TIMERS`     | `enable_timers`       |
    ///
    /// A zero poll interval is ignored and the default kept.
    pub fn from_env() -> Self {
        let player_name = env::var("SPELLSYNC_PLAYER").unwrap_or_else(|_| "player".to_string());
        let mut config = Self::new(player_name);

        if let Some(ms) = env_u64("SPELLSYNC_POLL_MS").filter(|ms| *ms > 0) {
            config.sync.poll_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = env_u64("SPELLSYNC_TTL_SECS") {
            config.sync.message_ttl = Duration::from_secs(secs);
        }
        if let Some(salt) = env_u64("SPELLSYNC_SEED") {
            config.timers.seed_salt = salt;
        }
        if let Ok(value) = env::var("SPELLSYNC_TIMERS") {
            config.enable_timers = !(value == "0" || value.eq_ignore_ascii_case("false"));
        }

        config
    }
}

fn env_u64(key: &str) -> Option<u64> {
    env::var(key).ok().and_then(|value| value.parse().ok())
}

/// Session errors.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Network sync failed to start.
    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    /// A session task panicked or was cancelled.
    #[error("Task failed: {0}")]
    Task(#[from] JoinError),
}

/// Cloneable handle for producers and renderers outside the session.
#[derive(Clone)]
pub struct SessionHandle {
    queue: DispatchQueue,
    shutdown: Arc<watch::Sender<bool>>,
    snapshots: watch::Receiver<Arc<DuelState>>,
}

impl SessionHandle {
    /// Enqueue an event (local input, purchases, ...).
    pub fn enqueue(&self, event: GameEvent) {
        self.queue.enqueue(event);
    }

    /// Ask the session to stop.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// False once the session has stopped taking new events.
    pub fn is_accepting(&self) -> bool {
        !self.queue.is_closed()
    }

    /// True once shutdown has been requested.
    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Receiver holding the latest state.
    pub fn snapshots(&self) -> watch::Receiver<Arc<DuelState>> {
        self.snapshots.clone()
    }

    /// Latest state.
    pub fn state(&self) -> Arc<DuelState> {
        self.snapshots.borrow().clone()
    }
}

/// One player's running game.
pub struct GameSession {
    config: SessionConfig,
    catalog: Arc<Catalog>,
    feed: Arc<dyn SharedFeed>,
    queue: DispatchQueue,
    events: EventReceiver,
    coordinator: LoopCoordinator,
    shutdown: Arc<watch::Sender<bool>>,
}

impl GameSession {
    /// Create a session; nothing runs until [`run`](Self::run).
    pub fn new(config: SessionConfig, catalog: Arc<Catalog>, feed: Arc<dyn SharedFeed>) -> Self {
        let (queue, events) = DispatchQueue::channel();
        let coordinator = LoopCoordinator::new(DuelState::new(&config.player_name), catalog.clone());
        let (shutdown, _) = watch::channel(false);

        Self {
            config,
            catalog,
            feed,
            queue,
            events,
            coordinator,
            shutdown: Arc::new(shutdown),
        }
    }

    /// Handle for enqueueing events, reading snapshots and stopping.
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            queue: self.queue.clone(),
            shutdown: self.shutdown.clone(),
            snapshots: self.coordinator.snapshots(),
        }
    }

    /// Add a subscriber (e.g. a renderer). Runs after earlier subscribers.
    pub fn subscribe(&mut self, subscriber: Box<dyn Subscriber>) {
        self.coordinator.subscribe(subscriber);
    }

    /// Run until shutdown is requested. Returns the final state.
    #[instrument(skip_all, fields(player = %self.config.player_name))]
    pub async fn run(self) -> Result<Arc<DuelState>, SessionError> {
        let GameSession {
            config,
            catalog,
            feed,
            queue,
            events,
            mut coordinator,
            shutdown,
        } = self;

        queue.enqueue(GameEvent::game_started(&config.player_name));

        let sync = Arc::new(NetworkSync::new(
            &config.player_name,
            config.sync.clone(),
            feed,
            queue.clone(),
        ));
        coordinator.subscribe(Box::new(OutboundMapper::new(sync.clone(), catalog.clone())));

        let poll_handle = sync
            .start(coordinator.snapshots(), shutdown.subscribe())
            .await?;

        let timer_handle = config.enable_timers.then(|| {
            TimerProducers::new(&config.player_name, config.timers.clone(), catalog.clone())
                .spawn(queue.clone(), shutdown.subscribe())
        });

        let mut stop = shutdown.subscribe();
        let mut coordinator_handle = tokio::spawn(coordinator.run(events, shutdown.subscribe()));
        info!("Session running");

        // Stop accepting events first, then let the coordinator finish its
        // in-flight event.
        let final_state = tokio::select! {
            _ = stopped(&mut stop) => {
                queue.close();
                coordinator_handle.await
            }
            result = &mut coordinator_handle => result,
        };
        // The coordinator may have died on its own; every task must still see it.
        shutdown.send_replace(true);
        queue.close();

        if let Some(handle) = timer_handle {
            handle.await?;
        }
        sync.leave().await;
        poll_handle.await?;

        let final_state = final_state?;
        info!(health = final_state.health, gold = final_state.gold, "Session ended");
        Ok(final_state)
    }
}
