//! # Redis Store
//!
//! Reads certificate values with `GET` and follows changes through keyspace
//! notifications (`PSUBSCRIBE __keyspace@<db>__:<namespace>*`).
//!
//! The command connection is established lazily and reconnects on its own
//! afterwards; each subscription opens a dedicated pub/sub connection.

use super::{CertStore, MessageStream, StoreError, StoreMessage};
use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

pub struct RedisStore {
    client: redis::Client,
    connection: OnceCell<ConnectionManager>,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Connection info may carry a password
        f.debug_struct("RedisStore")
            .field("db", &self.database_index())
            .finish_non_exhaustive()
    }
}

impl RedisStore {
    /// Parse the URL without connecting
    pub fn open(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        Ok(Self {
            client,
            connection: OnceCell::new(),
        })
    }

    /// Logical database selected by the URL (0 when the URL names none)
    #[must_use]
    pub fn database_index(&self) -> i64 {
        self.client.get_connection_info().redis.db
    }

    async fn connection(&self) -> Result<ConnectionManager, StoreError> {
        let manager = self
            .connection
            .get_or_try_init(|| async {
                debug!("Opening redis command connection");
                ConnectionManager::new(self.client.clone()).await
            })
            .await?;
        Ok(manager.clone())
    }

    /// Warn when the server is not configured to publish keyspace events
    ///
    /// Best effort: managed Redis offerings often disable `CONFIG`.
    async fn check_keyspace_events(&self) {
        let mut conn = match self.connection().await {
            Ok(conn) => conn,
            Err(e) => {
                debug!(error = %e, "Skipping notify-keyspace-events check");
                return;
            }
        };
        let reply: Result<Vec<String>, redis::RedisError> = redis::cmd("CONFIG")
            .arg("GET")
            .arg("notify-keyspace-events")
            .query_async(&mut conn)
            .await;
        match reply {
            Ok(values) => {
                let flags = values.get(1).map(String::as_str).unwrap_or_default();
                if !keyspace_events_enabled(flags) {
                    warn!(
                        notify_keyspace_events = flags,
                        "Redis does not publish keyspace events for generic and string commands; \
                         set notify-keyspace-events to include K, g, $, x and e (e.g. 'Kg$xe')"
                    );
                }
            }
            Err(e) => debug!(error = %e, "Could not read notify-keyspace-events"),
        }
    }
}

/// Whether `notify-keyspace-events` flags cover set/del/expired/evicted on the keyspace channel
fn keyspace_events_enabled(flags: &str) -> bool {
    let has = |c: char| flags.contains(c);
    has('K') && (has('A') || (has('g') && has('$') && has('x') && has('e')))
}

#[async_trait]
impl CertStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.connection().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn psubscribe(&self, pattern: &str) -> Result<MessageStream, StoreError> {
        self.check_keyspace_events().await;

        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.psubscribe(pattern).await?;
        debug!(pattern, "Subscribed to keyspace notifications");

        let stream = pubsub.into_on_message().map(|msg| {
            let payload: String = msg.get_payload()?;
            Ok(StoreMessage {
                channel: msg.get_channel_name().to_string(),
                payload,
            })
        });
        Ok(stream.boxed())
    }
}
