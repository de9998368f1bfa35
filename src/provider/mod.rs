//! # Store Providers
//!
//! The certificate store certwatch reads from.
//!
//! - `redis`: Redis (as written by `caddy-storage-redis`), the production store
//! - `memory`: in-process store with keyspace-style notifications, used by
//!   tests (`test-util` feature outside this crate)

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod redis;

#[cfg(any(test, feature = "test-util"))]
pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// One message received on a pattern subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreMessage {
    pub channel: String,
    pub payload: String,
}

impl StoreMessage {
    pub fn new(channel: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            payload: payload.into(),
        }
    }
}

/// Messages of an active subscription; the stream ends when the connection drops
pub type MessageStream = BoxStream<'static, Result<StoreMessage, StoreError>>;

/// Read-only access to the certificate store
#[async_trait]
pub trait CertStore: Send + Sync {
    /// Fetch a raw value; `None` when the key does not exist
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Subscribe to channels matching `pattern`
    ///
    /// The subscription is active when this returns.
    async fn psubscribe(&self, pattern: &str) -> Result<MessageStream, StoreError>;
}
