//! Network Layer
//!
//! Peer synchronisation over a shared message feed.
//! This layer is **non-deterministic** - all game logic runs through `game/`.

pub mod dedup;
pub mod feed;
pub mod outbound;
pub mod protocol;
pub mod sync;

pub use dedup::DedupCache;
pub use feed::{FeedError, FeedMessage, MemoryFeed, SharedFeed};
pub use outbound::{outbound_messages, OutboundMapper};
pub use protocol::{WireMessage, GLOBAL_TARGET};
pub use sync::{NetworkSync, SyncConfig, SyncError};
