//! Network Sync
//!
//! Bridges the shared feed and the dispatch queue. A poll loop peeks the
//! feed on a fixed interval, drops already-seen and foreign-addressed
//! messages, and enqueues the rest as events. Outbound messages go through
//! [`NetworkSync::publish`] with bounded retries.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

use crate::engine::queue::DispatchQueue;
use crate::engine::shutdown::{stopped, ticker};
use crate::game::events::GameEvent;
use crate::game::state::DuelState;
use crate::network::dedup::{DedupCache, DEFAULT_DEDUP_THRESHOLD};
use crate::network::feed::{FeedError, FeedMessage, SharedFeed};
use crate::network::protocol::WireMessage;

/// Sync protocol configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Interval between feed polls.
    pub poll_interval: Duration,
    /// Maximum messages peeked per poll.
    pub batch_size: usize,
    /// Time a published message stays visible.
    pub message_ttl: Duration,
    /// Back-off after a failed poll or send.
    pub retry_delay: Duration,
    /// Send attempts per outbound message.
    pub send_attempts: u32,
    /// Interval between presence re-announcements.
    pub presence_interval: Duration,
    /// Dedup cache size before it is cleared.
    pub dedup_threshold: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            batch_size: 32,
            message_ttl: Duration::from_secs(30),
            retry_delay: Duration::from_secs(2),
            send_attempts: 3,
            presence_interval: Duration::from_secs(10),
            dedup_threshold: DEFAULT_DEDUP_THRESHOLD,
        }
    }
}

/// Sync errors.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The shared feed could not be created or opened.
    #[error("Shared feed unavailable: {0}")]
    FeedUnavailable(#[source] FeedError),
}

/// Per-player sync protocol.
pub struct NetworkSync {
    player_name: String,
    config: SyncConfig,
    feed: Arc<dyn SharedFeed>,
    queue: DispatchQueue,
    dedup: Mutex<DedupCache>,
}

impl NetworkSync {
    /// Create the protocol for `player_name`, delivering events to `queue`.
    pub fn new(
        player_name: impl Into<String>,
        config: SyncConfig,
        feed: Arc<dyn SharedFeed>,
        queue: DispatchQueue,
    ) -> Self {
        let dedup = Mutex::new(DedupCache::new(config.dedup_threshold));
        Self {
            player_name: player_name.into(),
            config,
            feed,
            queue,
            dedup,
        }
    }

    /// Local player name (our sender id).
    pub fn player_name(&self) -> &str {
        &self.player_name
    }

    /// Configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Open the feed, spawn the poll loop and announce ourselves.
    ///
    /// Failing to open the feed is fatal and returned; everything after
    /// that is retried in the background until `shutdown` flips.
    #[instrument(skip_all, fields(player = %self.player_name))]
    pub async fn start(
        self: &Arc<Self>,
        snapshots: watch::Receiver<Arc<DuelState>>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<JoinHandle<()>, SyncError> {
        self.feed
            .create_if_not_exists()
            .await
            .map_err(SyncError::FeedUnavailable)?;
        info!("Shared feed ready");

        let sync = Arc::clone(self);
        let handle = tokio::spawn(async move { sync.poll_loop(snapshots, shutdown).await });

        self.publish(&WireMessage::join(&self.player_name)).await;
        Ok(handle)
    }

    #[instrument(skip_all, fields(player = %self.player_name))]
    async fn poll_loop(
        self: Arc<Self>,
        snapshots: watch::Receiver<Arc<DuelState>>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut poll_tick = ticker(self.config.poll_interval);

        // Join goes out at startup, so the first heartbeat waits a full period.
        let mut presence_tick = ticker(self.config.presence_interval);
        presence_tick.reset();

        info!("Poll loop started");

        loop {
            tokio::select! {
                biased;

                _ = stopped(&mut shutdown) => break,

                _ = poll_tick.tick() => {
                    if let Err(e) = self.poll_once().await {
                        warn!(error = %e, "Feed poll failed, backing off");
                        tokio::select! {
                            _ = stopped(&mut shutdown) => break,
                            _ = sleep(self.config.retry_delay) => {}
                        }
                    }
                }

                _ = presence_tick.tick() => {
                    let state = snapshots.borrow().clone();
                    self.announce_presence(&state).await;
                }
            }
        }

        info!("Poll loop stopped");
    }

    /// Peek one batch and enqueue every accepted message. Returns the number
    /// of events enqueued.
    pub async fn poll_once(&self) -> Result<usize, FeedError> {
        let batch = self.feed.peek_batch(self.config.batch_size).await?;

        let mut accepted = 0;
        for message in &batch {
            if let Some(event) = self.process_message(message).await {
                self.queue.enqueue(event);
                accepted += 1;
            }
        }

        if accepted > 0 {
            debug!(peeked = batch.len(), accepted, "Poll delivered events");
        }
        Ok(accepted)
    }

    /// Dedup, decode and filter one feed message.
    ///
    /// The id is marked processed before decoding, so a malformed message
    /// is reported once and never retried.
    pub async fn process_message(&self, message: &FeedMessage) -> Option<GameEvent> {
        if !self.dedup.lock().await.check_and_insert(&message.id) {
            return None;
        }

        let wire = match WireMessage::from_json(&message.body) {
            Ok(wire) => wire,
            Err(e) => {
                warn!(id = %message.id, error = %e, "Discarding malformed message");
                return None;
            }
        };

        if !wire.is_addressed_to(&self.player_name) {
            return None;
        }

        debug!(kind = wire.kind(), from = wire.sender_id(), "Accepted message");
        Some(wire.to_event())
    }

    /// Number of ids in the dedup cache.
    pub async fn seen_count(&self) -> usize {
        self.dedup.lock().await.len()
    }

    /// Publish a message, retrying transient failures. Returns `true` once
    /// the feed accepted it.
    pub async fn publish(&self, message: &WireMessage) -> bool {
        let body = match message.to_json() {
            Ok(body) => body,
            Err(e) => {
                error!(kind = message.kind(), error = %e, "Failed to encode message");
                return false;
            }
        };

        let attempts = self.config.send_attempts.max(1);
        for attempt in 1..=attempts {
            match self.feed.send(body.clone(), self.config.message_ttl).await {
                Ok(()) => {
                    debug!(kind = message.kind(), "Published");
                    return true;
                }
                Err(e @ FeedError::TooLarge { .. }) => {
                    warn!(kind = message.kind(), error = %e, "Message rejected");
                    return false;
                }
                Err(e) => {
                    warn!(kind = message.kind(), attempt, error = %e, "Publish failed");
                    if attempt < attempts {
                        sleep(self.config.retry_delay).await;
                    }
                }
            }
        }

        false
    }

    /// Re-announce presence and current status from a state snapshot.
    pub async fn announce_presence(&self, state: &DuelState) {
        let messages = [
            WireMessage::join(&self.player_name),
            WireMessage::health_changed(&self.player_name, state.health, state.max_health),
            WireMessage::items_state(&self.player_name, state.equipped_items.clone()),
            WireMessage::gold_state(&self.player_name, state.gold),
        ];
        for message in &messages {
            self.publish(message).await;
        }
        debug!("Presence announced");
    }

    /// Announce departure. Best effort.
    pub async fn leave(&self) {
        if self.publish(&WireMessage::leave(&self.player_name)).await {
            info!("Leave announced");
        } else {
            warn!("Could not announce leave");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use async_trait::async_trait;
    use crate::engine::queue::EventReceiver;
    use crate::game::events::GameEventData;
    use crate::network::feed::MemoryFeed;

    fn fast_config() -> SyncConfig {
        SyncConfig {
            poll_interval: Duration::from_millis(10),
            retry_delay: Duration::from_millis(5),
            presence_interval: Duration::from_millis(50),
            ..SyncConfig::default()
        }
    }

    async fn setup(name: &str) -> (Arc<MemoryFeed>, Arc<NetworkSync>, EventReceiver) {
        let feed = Arc::new(MemoryFeed::new());
        feed.create_if_not_exists().await.unwrap();
        let (queue, rx) = DispatchQueue::channel();
        let sync = Arc::new(NetworkSync::new(name, fast_config(), feed.clone(), queue));
        (feed, sync, rx)
    }

    async fn send(feed: &MemoryFeed, message: WireMessage) {
        feed.send(message.to_json().unwrap(), Duration::from_secs(30))
            .await
            .unwrap();
    }

    fn drain(rx: &mut EventReceiver) -> Vec<GameEventData> {
        let mut out = Vec::new();
        while let Some(event) = rx.try_recv() {
            out.push(event.data);
        }
        out
    }

    #[tokio::test]
    async fn test_duplicate_delivery_across_polls() {
        let (feed, sync, mut rx) = setup("alice").await;
        send(&feed, WireMessage::attack("bob", "alice", "Fireball", 15)).await;

        assert_eq!(sync.poll_once().await.unwrap(), 1);
        assert_eq!(sync.poll_once().await.unwrap(), 0);
        assert_eq!(sync.poll_once().await.unwrap(), 0);

        assert_eq!(
            drain(&mut rx),
            vec![GameEventData::SpellReceived {
                attacker: "bob".into(),
                spell: "Fireball".into(),
                damage: 15,
            }]
        );
    }

    #[tokio::test]
    async fn test_filters_by_address() {
        let (feed, sync, mut rx) = setup("alice").await;
        send(&feed, WireMessage::attack("bob", "carol", "Fireball", 15)).await;
        send(&feed, WireMessage::join("alice")).await;
        send(&feed, WireMessage::gold_state("bob", 7)).await;

        assert_eq!(sync.poll_once().await.unwrap(), 1);
        assert_eq!(
            drain(&mut rx),
            vec![GameEventData::OpponentGoldChanged { name: "bob".into(), gold: 7 }]
        );
        assert_eq!(sync.seen_count().await, 3);
    }

    #[tokio::test]
    async fn test_malformed_marked_processed() {
        let (feed, sync, mut rx) = setup("alice").await;
        feed.send("{not json".into(), Duration::from_secs(30)).await.unwrap();
        send(&feed, WireMessage::join("bob")).await;

        assert_eq!(sync.poll_once().await.unwrap(), 1);
        assert_eq!(sync.seen_count().await, 2);
        assert_eq!(sync.poll_once().await.unwrap(), 0);
        assert_eq!(drain(&mut rx), vec![GameEventData::OpponentJoined { name: "bob".into() }]);
    }

    #[tokio::test]
    async fn test_event_uses_wire_timestamp() {
        let (feed, sync, mut rx) = setup("alice").await;
        feed.send(
            r#"{"type":"leave","senderId":"bob","timestamp":"2024-03-04T05:06:07Z"}"#.into(),
            Duration::from_secs(30),
        )
        .await
        .unwrap();

        sync.poll_once().await.unwrap();
        let event = rx.try_recv().unwrap();
        assert_eq!(event.at.to_rfc3339(), "2024-03-04T05:06:07+00:00");
    }

    struct DownFeed;

    #[async_trait]
    impl SharedFeed for DownFeed {
        async fn create_if_not_exists(&self) -> Result<(), FeedError> {
            Err(FeedError::Unavailable("no route".into()))
        }
        async fn send(&self, _body: String, _ttl: Duration) -> Result<(), FeedError> {
            Err(FeedError::Unavailable("no route".into()))
        }
        async fn peek_batch(&self, _max: usize) -> Result<Vec<FeedMessage>, FeedError> {
            Err(FeedError::Unavailable("no route".into()))
        }
    }

    #[tokio::test]
    async fn test_start_fails_without_feed() {
        let (queue, _rx) = DispatchQueue::channel();
        let sync = Arc::new(NetworkSync::new("alice", fast_config(), Arc::new(DownFeed), queue));
        let (_snap_tx, snapshots) = watch::channel(Arc::new(DuelState::new("alice")));
        let (_stop_tx, shutdown) = watch::channel(false);

        let result = sync.start(snapshots, shutdown).await;
        assert!(matches!(result, Err(SyncError::FeedUnavailable(_))));
    }

    /// Fails the first `send_failures` sends and `peek_failures` peeks, then
    /// delegates.
    struct FlakyFeed {
        inner: MemoryFeed,
        send_failures: usize,
        peek_failures: usize,
        sends: AtomicUsize,
        peeks: AtomicUsize,
    }

    impl FlakyFeed {
        fn new(send_failures: usize, peek_failures: usize) -> Self {
            Self {
                inner: MemoryFeed::new(),
                send_failures,
                peek_failures,
                sends: AtomicUsize::new(0),
                peeks: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SharedFeed for FlakyFeed {
        async fn create_if_not_exists(&self) -> Result<(), FeedError> {
            self.inner.create_if_not_exists().await
        }
        async fn send(&self, body: String, ttl: Duration) -> Result<(), FeedError> {
            if self.sends.fetch_add(1, Ordering::SeqCst) < self.send_failures {
                return Err(FeedError::Transport("timeout".into()));
            }
            self.inner.send(body, ttl).await
        }
        async fn peek_batch(&self, max: usize) -> Result<Vec<FeedMessage>, FeedError> {
            if self.peeks.fetch_add(1, Ordering::SeqCst) < self.peek_failures {
                return Err(FeedError::Transport("connection reset".into()));
            }
            self.inner.peek_batch(max).await
        }
    }

    async fn flaky(send_failures: usize) -> (Arc<FlakyFeed>, NetworkSync) {
        let feed = Arc::new(FlakyFeed::new(send_failures, 0));
        feed.create_if_not_exists().await.unwrap();
        let (queue, _rx) = DispatchQueue::channel();
        let sync = NetworkSync::new("alice", fast_config(), feed.clone(), queue);
        (feed, sync)
    }

    #[tokio::test(start_paused = true)]
    async fn test_publish_retries_transient_failures() {
        let (feed, sync) = flaky(2).await;
        assert!(sync.publish(&WireMessage::join("alice")).await);
        assert_eq!(feed.sends.load(Ordering::SeqCst), 3);
        assert_eq!(feed.inner.len().await, 1);

        let (feed, sync) = flaky(3).await;
        assert!(!sync.publish(&WireMessage::join("alice")).await);
        assert_eq!(feed.sends.load(Ordering::SeqCst), 3);
        assert!(feed.inner.is_empty().await);
    }

    #[tokio::test]
    async fn test_start_announces_and_polls() {
        let (feed, sync, mut rx) = setup("alice").await;
        let (_snap_tx, snapshots) = watch::channel(Arc::new(DuelState::new("alice")));
        let (stop_tx, shutdown) = watch::channel(false);

        let handle = sync.start(snapshots, shutdown).await.unwrap();
        let published = feed.peek_batch(10).await.unwrap();
        assert_eq!(published.len(), 1);
        assert!(matches!(
            WireMessage::from_json(&published[0].body).unwrap(),
            WireMessage::Join { .. }
        ));

        send(&feed, WireMessage::join("bob")).await;
        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.data, GameEventData::OpponentJoined { name: "bob".into() });

        stop_tx.send_replace(true);
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_presence_heartbeat() {
        let (feed, sync, _rx) = setup("alice").await;
        let mut state = DuelState::new("alice");
        state.gold = 25;
        let (_snap_tx, snapshots) = watch::channel(Arc::new(state));
        let (stop_tx, shutdown) = watch::channel(false);

        let handle = sync.start(snapshots, shutdown).await.unwrap();
        tokio::time::sleep(Duration::from_millis(75)).await;
        stop_tx.send_replace(true);
        handle.await.unwrap();

        let kinds: Vec<_> = feed
            .peek_batch(100)
            .await
            .unwrap()
            .iter()
            .map(|m| WireMessage::from_json(&m.body).unwrap())
            .collect();
        assert_eq!(kinds.len(), 5);
        assert!(matches!(kinds[4], WireMessage::GoldState { gold: 25, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_failure_backs_off() {
        let feed = Arc::new(FlakyFeed::new(0, 2));
        feed.create_if_not_exists().await.unwrap();
        send(&feed.inner, WireMessage::join("bob")).await;

        let (queue, mut rx) = DispatchQueue::channel();
        let sync = Arc::new(NetworkSync::new("alice", fast_config(), feed.clone(), queue));
        let (_snap_tx, snapshots) = watch::channel(Arc::new(DuelState::new("alice")));
        let (stop_tx, shutdown) = watch::channel(false);

        let started = tokio::time::Instant::now();
        let handle = sync.start(snapshots, shutdown).await.unwrap();
        let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(event.data, GameEventData::OpponentJoined { name: "bob".into() });
        assert!(feed.peeks.load(Ordering::SeqCst) >= 3);
        assert!(started.elapsed() >= fast_config().retry_delay * 2);

        stop_tx.send_replace(true);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_id_within_one_batch() {
        let (_feed, sync, mut rx) = setup("alice").await;
        let message = FeedMessage {
            id: "m-1".into(),
            body: WireMessage::attack("bob", "alice", "Fireball", 15).to_json().unwrap(),
        };

        let first = sync.process_message(&message).await;
        let second = sync.process_message(&message).await;

        assert!(first.is_some());
        assert!(second.is_none());
        assert_eq!(sync.seen_count().await, 1);
        assert!(drain(&mut rx).is_empty());
    }
}
