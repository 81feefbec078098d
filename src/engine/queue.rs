//! Dispatch Queue
//!
//! Multi-producer, single-consumer FIFO of [`GameEvent`]s. Producers hold a
//! cloneable [`DispatchQueue`]; the loop coordinator owns the one
//! [`EventReceiver`].

use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::mpsc;
use tracing::debug;

use crate::game::events::GameEvent;

/// Producer handle. Cheap to clone; every clone feeds the same receiver.
#[derive(Clone, Debug)]
pub struct DispatchQueue {
    sender: Arc<RwLock<Option<mpsc::UnboundedSender<GameEvent>>>>,
}

/// Consumer half of the queue. Not cloneable.
#[derive(Debug)]
pub struct EventReceiver {
    receiver: mpsc::UnboundedReceiver<GameEvent>,
}

impl DispatchQueue {
    /// Create a queue and its single consumer.
    pub fn channel() -> (DispatchQueue, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            DispatchQueue {
                sender: Arc::new(RwLock::new(Some(tx))),
            },
            EventReceiver { receiver: rx },
        )
    }

    /// Enqueue an event. Never blocks; silently dropped once the queue is
    /// closed or the consumer is gone.
    pub fn enqueue(&self, event: GameEvent) {
        let guard = self.sender.read().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(tx) => {
                if tx.send(event).is_err() {
                    debug!("Consumer gone, dropping event");
                }
            }
            None => debug!(kind = event.data.kind(), "Queue closed, dropping event"),
        }
    }

    /// Stop accepting events. Events already enqueued are still delivered.
    pub fn close(&self) {
        let mut guard = self.sender.write().unwrap_or_else(PoisonError::into_inner);
        if guard.take().is_some() {
            debug!("Dispatch queue closed");
        }
    }

    /// True once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.sender
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

impl EventReceiver {
    /// Next event in arrival order. `None` once the queue is closed and drained.
    pub async fn recv(&mut self) -> Option<GameEvent> {
        self.receiver.recv().await
    }

    /// Next event if one is ready.
    pub fn try_recv(&mut self) -> Option<GameEvent> {
        self.receiver.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::events::GameEventData;

    fn gold(amount: u32) -> GameEvent {
        GameEvent::now(GameEventData::GoldEarned { amount })
    }

    fn amount(event: &GameEvent) -> u32 {
        match event.data {
            GameEventData::GoldEarned { amount } => amount,
            _ => panic!("unexpected event"),
        }
    }

    #[tokio::test]
    async fn test_fifo_single_producer() {
        let (queue, mut rx) = DispatchQueue::channel();
        for i in 0..5 {
            queue.enqueue(gold(i));
        }
        for i in 0..5 {
            assert_eq!(amount(&rx.recv().await.unwrap()), i);
        }
        assert!(rx.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_producers_deliver_everything() {
        let (queue, mut rx) = DispatchQueue::channel();

        let mut handles = Vec::new();
        for p in 0..4u32 {
            let producer = queue.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..25u32 {
                    producer.enqueue(gold(p * 100 + i));
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        queue.close();

        let mut per_producer: Vec<Vec<u32>> = vec![Vec::new(); 4];
        while let Some(event) = rx.recv().await {
            let value = amount(&event);
            per_producer[(value / 100) as usize].push(value % 100);
        }

        // Each producer's events arrive in the order it sent them.
        for seen in per_producer {
            assert_eq!(seen, (0..25).collect::<Vec<_>>());
        }
    }

    #[tokio::test]
    async fn test_close_drains_pending_then_ends() {
        let (queue, mut rx) = DispatchQueue::channel();
        queue.enqueue(gold(1));
        queue.enqueue(gold(2));
        queue.close();
        queue.enqueue(gold(3));

        assert!(queue.is_closed());
        assert_eq!(amount(&rx.recv().await.unwrap()), 1);
        assert_eq!(amount(&rx.recv().await.unwrap()), 2);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_enqueue_after_consumer_dropped() {
        let (queue, rx) = DispatchQueue::channel();
        drop(rx);
        queue.enqueue(gold(1));
        assert!(!queue.is_closed());
    }
}
