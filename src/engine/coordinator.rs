//! Loop Coordinator
//!
//! Single consumer of the dispatch queue. Owns the only live [`DuelState`],
//! applies the reducer to each event in arrival order, swaps the state and
//! notifies subscribers inline before taking the next event.
//!
//! ```text
//! producers ──enqueue──▶ DispatchQueue ──recv──▶ LoopCoordinator
//!                                                   │ apply()
//!                                                   ├─▶ on_state_changed   (all subscribers)
//!                                                   ├─▶ on_message_processed (all subscribers)
//!                                                   └─▶ watch snapshot
//! ```

use std::sync::Arc;
use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::engine::queue::EventReceiver;
use crate::engine::shutdown::stopped;
use crate::game::catalog::Catalog;
use crate::game::events::GameEvent;
use crate::game::reducer;
use crate::game::state::DuelState;

/// Observer of state transitions. Callbacks are awaited on the coordinator
/// task, so a slow subscriber delays the next reduction.
#[async_trait]
pub trait Subscriber: Send {
    /// Called with the new state after every event.
    async fn on_state_changed(&mut self, _state: &Arc<DuelState>) {}

    /// Called after every subscriber has seen the new state, with the event
    /// and the state it was applied to.
    async fn on_message_processed(
        &mut self,
        _event: &GameEvent,
        _previous: &DuelState,
        _current: &Arc<DuelState>,
    ) {
    }
}

/// Drains events and owns the state.
pub struct LoopCoordinator {
    state: Arc<DuelState>,
    catalog: Arc<Catalog>,
    subscribers: Vec<Box<dyn Subscriber>>,
    snapshot_tx: watch::Sender<Arc<DuelState>>,
    processed: u64,
}

impl LoopCoordinator {
    /// Create a coordinator starting from `initial`.
    pub fn new(initial: DuelState, catalog: Arc<Catalog>) -> Self {
        let state = Arc::new(initial);
        let (snapshot_tx, _) = watch::channel(state.clone());
        Self {
            state,
            catalog,
            subscribers: Vec::new(),
            snapshot_tx,
            processed: 0,
        }
    }

    /// Append a subscriber. Subscribers are notified in registration order.
    pub fn subscribe(&mut self, subscriber: Box<dyn Subscriber>) {
        self.subscribers.push(subscriber);
    }

    /// Receiver that always holds the latest state.
    pub fn snapshots(&self) -> watch::Receiver<Arc<DuelState>> {
        self.snapshot_tx.subscribe()
    }

    /// Current state.
    pub fn state(&self) -> Arc<DuelState> {
        self.state.clone()
    }

    /// Number of events reduced so far.
    pub fn processed(&self) -> u64 {
        self.processed
    }

    /// Reduce one event and notify every subscriber.
    pub async fn process(&mut self, event: GameEvent) {
        let previous = self.state.clone();
        let current = Arc::new(reducer::apply(&previous, &event, &self.catalog));
        self.state = current.clone();
        self.processed += 1;
        self.snapshot_tx.send_replace(current.clone());

        debug!(
            kind = event.data.kind(),
            health = current.health,
            gold = current.gold,
            "Event applied"
        );

        for subscriber in self.subscribers.iter_mut() {
            subscriber.on_state_changed(&current).await;
        }
        for subscriber in self.subscribers.iter_mut() {
            subscriber.on_message_processed(&event, &previous, &current).await;
        }
    }

    /// Drain the queue until it is closed and empty, or until `shutdown`
    /// flips to `true` (or its sender is dropped). Pending events are
    /// discarded on shutdown. Returns the final state.
    pub async fn run(
        mut self,
        mut events: EventReceiver,
        mut shutdown: watch::Receiver<bool>,
    ) -> Arc<DuelState> {
        info!(player = %self.state.player_name, "Loop coordinator started");

        loop {
            tokio::select! {
                biased;

                _ = stopped(&mut shutdown) => {
                    info!("Shutdown signal received");
                    break;
                }

                next = events.recv() => match next {
                    Some(event) => self.process(event).await,
                    None => {
                        debug!("Dispatch queue drained");
                        break;
                    }
                },
            }
        }

        info!(processed = self.processed, "Loop coordinator stopped");
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use crate::engine::queue::DispatchQueue;
    use crate::game::events::GameEventData;

    struct Recorder {
        name: &'static str,
        seen: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Subscriber for Recorder {
        async fn on_state_changed(&mut self, state: &Arc<DuelState>) {
            self.seen
                .lock()
                .unwrap()
                .push(format!("{}:state:{}", self.name, state.gold));
        }

        async fn on_message_processed(
            &mut self,
            event: &GameEvent,
            previous: &DuelState,
            current: &Arc<DuelState>,
        ) {
            self.seen.lock().unwrap().push(format!(
                "{}:{}:{}->{}",
                self.name,
                event.data.kind(),
                previous.gold,
                current.gold
            ));
        }
    }

    fn gold(amount: u32) -> GameEvent {
        GameEvent::now(GameEventData::GoldEarned { amount })
    }

    #[tokio::test]
    async fn test_subscriber_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut coordinator = LoopCoordinator::new(DuelState::new("alice"), Arc::new(Catalog::new()));
        coordinator.subscribe(Box::new(Recorder { name: "a", seen: seen.clone() }));
        coordinator.subscribe(Box::new(Recorder { name: "b", seen: seen.clone() }));

        coordinator.process(gold(5)).await;
        coordinator.process(gold(3)).await;

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                "a:state:5",
                "b:state:5",
                "a:gold_earned:0->5",
                "b:gold_earned:0->5",
                "a:state:8",
                "b:state:8",
                "a:gold_earned:5->8",
                "b:gold_earned:5->8",
            ]
        );
        assert_eq!(coordinator.processed(), 2);
    }

    #[tokio::test]
    async fn test_run_drains_until_closed() {
        let (queue, rx) = DispatchQueue::channel();
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let coordinator = LoopCoordinator::new(DuelState::new("alice"), Arc::new(Catalog::new()));
        let mut snapshots = coordinator.snapshots();

        for amount in [1, 2, 3] {
            queue.enqueue(gold(amount));
        }
        queue.close();

        let final_state = coordinator.run(rx, shutdown_rx).await;
        assert_eq!(final_state.gold, 6);
        assert_eq!(snapshots.borrow_and_update().gold, 6);
    }

    #[tokio::test]
    async fn test_run_on_spawned_task() {
        let (queue, rx) = DispatchQueue::channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let coordinator = LoopCoordinator::new(DuelState::new("alice"), Arc::new(Catalog::new()));
        let mut snapshots = coordinator.snapshots();
        let task = tokio::spawn(coordinator.run(rx, shutdown_rx));

        queue.enqueue(gold(4));
        queue.enqueue(gold(6));
        snapshots.wait_for(|s| s.gold == 10).await.unwrap();

        shutdown_tx.send_replace(true);
        let final_state = task.await.unwrap();
        assert_eq!(final_state.gold, 10);
    }

    #[tokio::test]
    async fn test_dropped_shutdown_sender_stops() {
        let (_queue, rx) = DispatchQueue::channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let coordinator = LoopCoordinator::new(DuelState::new("alice"), Arc::new(Catalog::new()));
        let task = tokio::spawn(coordinator.run(rx, shutdown_rx));

        drop(shutdown_tx);
        let final_state = tokio::time::timeout(std::time::Duration::from_secs(2), task)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(final_state.gold, 0);
    }

    #[tokio::test]
    async fn test_shutdown_discards_pending() {
        let (queue, rx) = DispatchQueue::channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let coordinator = LoopCoordinator::new(DuelState::new("alice"), Arc::new(Catalog::new()));

        queue.enqueue(gold(10));
        shutdown_tx.send_replace(true);

        let final_state = coordinator.run(rx, shutdown_rx).await;
        assert_eq!(final_state.gold, 0);
    }

    #[tokio::test]
    async fn test_no_change_still_notifies() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut coordinator = LoopCoordinator::new(DuelState::new("alice"), Arc::new(Catalog::new()));
        coordinator.subscribe(Box::new(Recorder { name: "a", seen: seen.clone() }));

        coordinator
            .process(GameEvent::now(GameEventData::SpellPurchased { spell: "Heal".into(), cost: 50 }))
            .await;

        assert_eq!(seen.lock().unwrap().len(), 2);
        assert_eq!(coordinator.state().gold, 0);
    }
}
