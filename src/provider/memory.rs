//! # In-Memory Store
//!
//! A process-local store that behaves like Redis with keyspace notifications
//! enabled: writes publish `set`/`del`/`expired`/`evicted` on
//! `__keyspace@<db>__:<key>` to matching pattern subscribers.
//!
//! Patterns support a single trailing `*`, which is all certwatch subscribes
//! with. Faults can be injected to exercise retry paths.

use super::{CertStore, MessageStream, StoreError, StoreMessage};
use async_trait::async_trait;
use futures::channel::mpsc;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::Notify;

struct Subscriber {
    pattern: String,
    tx: mpsc::UnboundedSender<Result<StoreMessage, StoreError>>,
}

#[derive(Default)]
pub struct MemoryStore {
    db: i64,
    values: Mutex<HashMap<String, String>>,
    subscribers: Mutex<Vec<Subscriber>>,
    subscribed: Notify,
    unavailable: AtomicBool,
    gets: AtomicUsize,
    subscriptions: AtomicUsize,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("db", &self.db)
            .field("unavailable", &self.unavailable.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

fn pattern_matches(pattern: &str, channel: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => channel.starts_with(prefix),
        None => pattern == channel,
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store publishing notifications for database `db`
    #[must_use]
    pub fn with_db(db: i64) -> Self {
        Self {
            db,
            ..Self::default()
        }
    }

    /// Write a value and publish `set`
    pub fn set(&self, key: &str, value: impl Into<String>) {
        self.insert(key, value);
        self.notify_key(key, "set");
    }

    /// Write a value without publishing, as if the notification was missed
    pub fn insert(&self, key: &str, value: impl Into<String>) {
        self.lock_values().insert(key.to_string(), value.into());
    }

    /// Remove a value and publish `payload` (`del`, `expired` or `evicted`)
    pub fn remove(&self, key: &str, payload: &str) {
        self.lock_values().remove(key);
        self.notify_key(key, payload);
    }

    /// Publish a keyspace notification for `key` without touching the value
    pub fn notify_key(&self, key: &str, payload: &str) {
        let channel = format!("__keyspace@{}__:{key}", self.db);
        self.publish(&channel, payload);
    }

    /// Publish a raw message to matching subscribers
    pub fn publish(&self, channel: &str, payload: &str) {
        let mut subscribers = self.lock_subscribers();
        subscribers.retain(|sub| !sub.tx.is_closed());
        for sub in subscribers.iter() {
            if pattern_matches(&sub.pattern, channel) {
                let _ = sub.tx.unbounded_send(Ok(StoreMessage::new(channel, payload)));
            }
        }
    }

    /// Deliver an error to every subscriber
    pub fn fail_subscriptions(&self, reason: &str) {
        for sub in self.lock_subscribers().iter() {
            let _ = sub
                .tx
                .unbounded_send(Err(StoreError::Unavailable(reason.to_string())));
        }
    }

    /// End every active subscription, as a dropped connection would
    pub fn disconnect(&self) {
        self.lock_subscribers().clear();
    }

    /// Make reads and subscriptions fail until cleared
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
        if unavailable {
            self.disconnect();
        }
    }

    /// Number of `get` calls served, including failed ones
    #[must_use]
    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    /// Number of subscriptions opened so far
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.load(Ordering::SeqCst)
    }

    /// Wait until at least `count` subscriptions have been opened
    pub async fn wait_for_subscriptions(&self, count: usize) {
        loop {
            let notified = self.subscribed.notified();
            if self.subscription_count() >= count {
                return;
            }
            notified.await;
        }
    }

    fn lock_values(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.values
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn lock_subscribers(&self) -> std::sync::MutexGuard<'_, Vec<Subscriber>> {
        self.subscribers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CertStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(self.lock_values().get(key).cloned())
    }

    async fn psubscribe(&self, pattern: &str) -> Result<MessageStream, StoreError> {
        self.check_available()?;
        let (tx, rx) = mpsc::unbounded();
        self.lock_subscribers().push(Subscriber {
            pattern: pattern.to_string(),
            tx,
        });
        self.subscriptions.fetch_add(1, Ordering::SeqCst);
        self.subscribed.notify_waiters();
        Ok(rx.boxed())
    }
}
