//! Shutdown Signal
//!
//! Every long-running task watches one `watch<bool>` flag. These helpers keep
//! the `select!` arms `Send` and give every interval the same floor.

use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, Interval, MissedTickBehavior};

/// Shortest period any loop will tick at.
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Resolves once the flag is `true` or its sender has been dropped.
///
/// The `watch::Ref` from `wait_for` is released here, so callers can await
/// other work in the same `select!` without holding the lock.
pub async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// Interval that skips missed ticks. Periods below [`MIN_PERIOD`] are raised
/// to it, since tokio rejects a zero period.
pub fn ticker(period: Duration) -> Interval {
    let mut tick = interval(period.max(MIN_PERIOD));
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tick
}
