//! Core deterministic primitives.
//!
//! Seeded randomness for the timer producers and state fingerprints for
//! determinism checks. Nothing here performs I/O.

pub mod rng;
pub mod hash;

// Re-export core types
pub use rng::DeterministicRng;
pub use hash::{StateHash, StateHasher, compute_state_hash};
