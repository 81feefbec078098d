//! Engine Module
//!
//! Runtime around the deterministic reducer: the event queue, the single
//! consumer that owns state, timer producers, the shutdown signal and
//! session lifecycle.

pub mod coordinator;
pub mod queue;
pub mod session;
pub mod shutdown;
pub mod timers;

pub use coordinator::{LoopCoordinator, Subscriber};
pub use queue::{DispatchQueue, EventReceiver};
pub use session::{GameSession, SessionConfig, SessionError, SessionHandle};
pub use shutdown::{stopped, ticker};
pub use timers::{TimerConfig, TimerProducers};
