//! # Initialization
//!
//! Startup: rustls provider, tracing, settings, certificate directory,
//! metrics, optional HTTP server and shutdown signals. Every failure here is
//! fatal and ends the process with exit code 1.

use crate::config::{Cli, WatchSettings};
use crate::controller::mirror;
use crate::controller::notifier::Notifier;
use crate::controller::reconciler::Reconciler;
use crate::controller::server::start_server;
use crate::observability;
use crate::provider::RedisStore;
use crate::runtime::supervisor::Supervisor;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Everything `main` needs to run the supervisor
pub struct InitializationResult {
    pub settings: Arc<WatchSettings>,
    pub supervisor: Supervisor,
    /// Fired on SIGINT/SIGTERM
    pub cancel: CancellationToken,
    pub server: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("certs", &self.settings.certs)
            .field("server", &self.server.is_some())
            .finish_non_exhaustive()
    }
}

pub async fn initialize(cli: &Cli) -> Result<InitializationResult> {
    // Required for rediss:// before any connection is made
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        debug!("rustls crypto provider already installed");
    }

    observability::logging::init_logging(cli.log_format, cli.debug);

    info!("Starting certwatch v{}", env!("CARGO_PKG_VERSION"));

    let mut settings = cli.to_settings(0).context("Invalid configuration")?;
    let store = RedisStore::open(&settings.store_url).context("Failed to parse --redisurl")?;
    if cli.db.is_none() {
        settings.db = store.database_index();
    }
    debug!(
        key_prefix = %settings.key_prefix,
        value_prefix = %settings.value_prefix,
        acme_dir = %settings.acme_dir_name,
        cert_dir = %settings.cert_dir.display(),
        cmd = ?settings.reload_cmd,
        sleep = ?settings.sleep,
        db = settings.db,
        certs = ?settings.certs,
        "Settings"
    );

    mirror::ensure_cert_dir(settings.cert_dir())
        .context("Failed to prepare certificate directory")?;

    observability::metrics::register_metrics()?;

    let cancel = CancellationToken::new();
    spawn_shutdown_listener(cancel.clone());

    let server = cli.metrics_port.map(|port| {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = start_server(port, cancel).await {
                error!("HTTP server error: {:#}", e);
            }
        })
    });

    let settings = Arc::new(settings);
    let reconciler = Reconciler::new(settings.clone(), Arc::new(store));
    let notifier = Notifier::shell(settings.reload_cmd.clone());

    Ok(InitializationResult {
        supervisor: Supervisor::new(reconciler, notifier),
        settings,
        cancel,
        server,
    })
}

/// Wait for the HTTP server task, logging a panic or abort
///
/// Returns whether the task finished normally.
pub async fn join_server(server: JoinHandle<()>) -> bool {
    match server.await {
        Ok(()) => true,
        Err(e) => {
            error!("HTTP server task failed: {}", e);
            false
        }
    }
}

/// Cancel `cancel` on SIGINT or SIGTERM
pub fn spawn_shutdown_listener(cancel: CancellationToken) {
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("Received shutdown signal (SIGINT/SIGTERM), initiating graceful shutdown...");
        cancel.cancel();
    });
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            warn!("Failed to install SIGTERM handler: {}", e);
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
