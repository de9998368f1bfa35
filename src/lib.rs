//! # certwatch
//!
//! Mirrors TLS certificates stored in Redis by `caddy-storage-redis` onto the
//! local filesystem and runs a reload command whenever they change.
//!
//! ## Overview
//!
//! 1. **Full pass** - every watched certificate's `.key` and `.crt` is fetched,
//!    decoded and compared with the local file by size and mtime
//! 2. **Keyspace notifications** - `set` events re-reconcile the certificate,
//!    `del`/`expired`/`evicted` remove the local file
//! 3. **Reload** - the configured command runs once per batch that changed files
//! 4. **Retry** - any store or filesystem failure restarts the cycle after a
//!    fixed delay
//!
//! Local files always carry the store's `Modified` time as their mtime, so an
//! unchanged certificate is never rewritten.

pub mod config;
pub mod constants;
pub mod controller;
pub mod observability;
pub mod provider;
pub mod runtime;

pub use config::WatchSettings;
pub use controller::{Notifier, Reconciler};
#[cfg(any(test, feature = "test-util"))]
pub use provider::MemoryStore;
pub use provider::{CertStore, RedisStore};
pub use runtime::Supervisor;
