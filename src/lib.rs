//! # Spellsync
//!
//! Event-driven duel engine: each player runs a deterministic state
//! machine fed by one event queue, and peers stay in sync by exchanging
//! JSON messages over a shared, TTL-expiring feed.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         SPELLSYNC                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/            - Deterministic primitives                 │
//! │  ├── rng.rs       - Seeded Xorshift128+ for draws            │
//! │  └── hash.rs      - State fingerprints                       │
//! │                                                              │
//! │  game/            - Duel logic (deterministic)               │
//! │  ├── state.rs     - Duel state, equipment                    │
//! │  ├── events.rs    - Event union                              │
//! │  ├── reducer.rs   - apply(state, event) -> state'            │
//! │  ├── combat.rs    - Damage / armor / resistance              │
//! │  ├── catalog.rs   - Spell and item tables                    │
//! │  └── log.rs       - Bounded combat log                       │
//! │                                                              │
//! │  engine/          - Runtime (async)                          │
//! │  ├── queue.rs     - Multi-producer dispatch queue            │
//! │  ├── coordinator.rs - Single consumer, subscribers           │
//! │  ├── timers.rs    - Draws, shop, gold income                 │
//! │  └── session.rs   - Lifecycle wiring                         │
//! │                                                              │
//! │  network/         - Peer sync (non-deterministic)            │
//! │  ├── protocol.rs  - Wire messages                            │
//! │  ├── feed.rs      - Shared feed trait + in-memory feed       │
//! │  ├── dedup.rs     - Processed-id cache                       │
//! │  ├── sync.rs      - Poll loop, publish, presence             │
//! │  └── outbound.rs  - State diff -> wire messages              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The `core/` and `game/` modules are deterministic:
//! - No HashMap (uses BTreeMap/BTreeSet for sorted iteration)
//! - No system time reads (events carry their own timestamps)
//! - All randomness from seeded Xorshift128+, outside the reducer
//!
//! Replaying the same events over the same starting state yields the same
//! state fingerprint on every peer.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod engine;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use core::rng::DeterministicRng;
pub use engine::{DispatchQueue, GameSession, SessionConfig, SessionHandle, Subscriber};
pub use game::{apply, Catalog, DuelState, GameEvent, GameEventData};
pub use network::{MemoryFeed, SharedFeed, WireMessage};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
