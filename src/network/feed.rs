//! Shared Feed
//!
//! The transport peers publish to and peek from. A feed holds messages for a
//! TTL and never lets a reader delete them, so every peer sees every message
//! until it expires.

use std::collections::VecDeque;
use std::time::Duration;
use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;
use uuid::Uuid;

/// Maximum accepted message body size (bytes).
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// A message as seen by a reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedMessage {
    /// Feed-assigned unique id
    pub id: String,
    /// Raw body as published
    pub body: String,
}

/// Feed errors. All are transient except when raised by
/// [`SharedFeed::create_if_not_exists`] at startup.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FeedError {
    /// Feed does not exist or cannot be reached.
    #[error("Feed unavailable: {0}")]
    Unavailable(String),

    /// Request failed in transit.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Body exceeds the feed's size limit.
    #[error("Message too large: {size} bytes (max {max})")]
    TooLarge {
        /// Body size.
        size: usize,
        /// Limit.
        max: usize,
    },
}

/// Shared message feed with TTL expiry and non-destructive reads.
#[async_trait]
pub trait SharedFeed: Send + Sync {
    /// Create the feed, or open it if it already exists.
    async fn create_if_not_exists(&self) -> Result<(), FeedError>;

    /// Publish a body, visible immediately and removed after `ttl`.
    async fn send(&self, body: String, ttl: Duration) -> Result<(), FeedError>;

    /// Up to `max_count` visible messages, without removing them.
    async fn peek_batch(&self, max_count: usize) -> Result<Vec<FeedMessage>, FeedError>;
}

// =============================================================================
// IN-MEMORY FEED
// =============================================================================

struct Entry {
    id: String,
    body: String,
    expires_at: Instant,
}

struct Inner {
    created: bool,
    entries: VecDeque<Entry>,
}

/// In-process feed shared by any number of peers (wrap in an `Arc`).
pub struct MemoryFeed {
    inner: RwLock<Inner>,
}

impl Default for MemoryFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFeed {
    /// Create a feed that does not exist yet; peers create it on startup.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                created: false,
                entries: VecDeque::new(),
            }),
        }
    }

    /// Number of unexpired messages.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.inner
            .read()
            .await
            .entries
            .iter()
            .filter(|e| e.expires_at > now)
            .count()
    }

    /// True when no unexpired message is held.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl SharedFeed for MemoryFeed {
    async fn create_if_not_exists(&self) -> Result<(), FeedError> {
        self.inner.write().await.created = true;
        Ok(())
    }

    async fn send(&self, body: String, ttl: Duration) -> Result<(), FeedError> {
        if body.len() > MAX_MESSAGE_SIZE {
            return Err(FeedError::TooLarge {
                size: body.len(),
                max: MAX_MESSAGE_SIZE,
            });
        }

        let mut inner = self.inner.write().await;
        if !inner.created {
            return Err(FeedError::Unavailable("feed does not exist".into()));
        }
        inner.entries.push_back(Entry {
            id: Uuid::new_v4().to_string(),
            body,
            expires_at: Instant::now() + ttl,
        });
        Ok(())
    }

    async fn peek_batch(&self, max_count: usize) -> Result<Vec<FeedMessage>, FeedError> {
        let mut inner = self.inner.write().await;
        if !inner.created {
            return Err(FeedError::Unavailable("feed does not exist".into()));
        }

        let now = Instant::now();
        inner.entries.retain(|e| e.expires_at > now);

        // Newest messages win so a busy feed cannot starve recent traffic.
        let skip = inner.entries.len().saturating_sub(max_count);
        Ok(inner
            .entries
            .iter()
            .skip(skip)
            .map(|e| FeedMessage {
                id: e.id.clone(),
                body: e.body.clone(),
            })
            .collect())
    }
}
