//! Common test utilities
//!
//! A `Harness` wires a `Reconciler` to an in-process `MemoryStore`, a
//! temporary certificate directory and a command runner that records reload
//! invocations instead of spawning a shell.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use async_trait::async_trait;
use certwatch::config::{Component, WatchSettings};
use certwatch::controller::codec::encode_stored_value;
use certwatch::controller::mirror;
use certwatch::controller::{CommandOutput, CommandRunner, Notifier, Reconciler};
use certwatch::provider::MemoryStore;
use chrono::{DateTime, TimeZone, Utc};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

pub const RELOAD_CMD: &str = "reload-proxy";

/// Records every command instead of running it
#[derive(Debug, Default)]
pub struct RecordingRunner {
    calls: Mutex<Vec<String>>,
}

impl RecordingRunner {
    pub fn count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, command: &str) -> std::io::Result<CommandOutput> {
        self.calls.lock().unwrap().push(command.to_string());
        Ok(CommandOutput {
            status: Some(0),
            success: true,
            output: String::new(),
        })
    }
}

pub struct Harness {
    pub dir: TempDir,
    pub store: Arc<MemoryStore>,
    pub settings: Arc<WatchSettings>,
    pub reconciler: Reconciler,
    pub runner: Arc<RecordingRunner>,
    pub notifier: Notifier,
}

impl Harness {
    pub fn new(certs: &[&str]) -> Self {
        Self::with_settings(certs, |_| {})
    }

    pub fn with_settings(certs: &[&str], customize: impl FnOnce(&mut WatchSettings)) -> Self {
        let dir = TempDir::new().unwrap();
        let mut settings = WatchSettings::new(
            "redis://localhost:6379",
            certs.iter().map(ToString::to_string).collect(),
        );
        settings.cert_dir = dir.path().join("certs");
        settings.reload_cmd = Some(RELOAD_CMD.to_string());
        settings.sleep = Duration::from_millis(20);
        customize(&mut settings);
        mirror::ensure_cert_dir(&settings.cert_dir).unwrap();

        let settings = Arc::new(settings);
        let store = Arc::new(MemoryStore::with_db(settings.db));
        let reconciler = Reconciler::new(Arc::clone(&settings), store.clone());
        let runner = Arc::new(RecordingRunner::default());
        let notifier = Notifier::new(settings.reload_cmd.clone(), runner.clone());

        Self {
            dir,
            store,
            settings,
            reconciler,
            runner,
            notifier,
        }
    }

    pub fn key(&self, name: &str, component: Component) -> String {
        self.settings.store_key(name, component)
    }

    pub fn stored(&self, value: &[u8], modified: DateTime<Utc>) -> String {
        encode_stored_value(value, modified, &self.settings.value_prefix)
    }

    /// Write a value without a keyspace notification
    pub fn put(&self, name: &str, component: Component, value: &[u8], modified: DateTime<Utc>) {
        self.store
            .insert(&self.key(name, component), self.stored(value, modified));
    }

    /// Write a value and publish `set`
    pub fn set(&self, name: &str, component: Component, value: &[u8], modified: DateTime<Utc>) {
        self.store
            .set(&self.key(name, component), self.stored(value, modified));
    }

    pub fn path(&self, name: &str, component: Component) -> PathBuf {
        self.settings.mirror_path(name, component)
    }

    pub fn read(&self, name: &str, component: Component) -> Vec<u8> {
        std::fs::read(self.path(name, component)).unwrap()
    }

    pub fn mtime(&self, name: &str, component: Component) -> SystemTime {
        std::fs::metadata(self.path(name, component))
            .unwrap()
            .modified()
            .unwrap()
    }

    pub fn reloads(&self) -> usize {
        self.runner.count()
    }

    pub fn runner_commands(&self) -> Vec<String> {
        self.runner.calls()
    }
}

pub fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

pub fn system_time(t: DateTime<Utc>) -> SystemTime {
    SystemTime::from(t)
}

/// Poll `condition` until it holds, failing the test after five seconds
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not met within 5s");
}
