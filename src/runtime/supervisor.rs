//! # Retry Supervisor
//!
//! Drives listen cycles forever: full reconciliation pass, reload if needed,
//! subscribe, listen. Any failure is logged and the cycle restarts after the
//! fixed `--sleep` delay. Cancellation ends the loop cleanly.

use crate::controller::listener::{self, ListenError, ListenOutcome};
use crate::controller::notifier::Notifier;
use crate::controller::reconciler::{PassError, Reconciler};
use crate::observability::metrics;
use crate::runtime::error_policy;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Why a listen cycle ended early
#[derive(Debug, Error)]
pub enum CycleError {
    #[error(transparent)]
    Pass(#[from] PassError),
    #[error(transparent)]
    Listen(#[from] ListenError),
}

#[derive(Debug, Clone)]
pub struct Supervisor {
    reconciler: Reconciler,
    notifier: Notifier,
}

impl Supervisor {
    pub fn new(reconciler: Reconciler, notifier: Notifier) -> Self {
        Self {
            reconciler,
            notifier,
        }
    }

    /// Run cycles until `cancel` fires
    pub async fn run(&self, cancel: CancellationToken) {
        let sleep = self.reconciler.settings().sleep;
        info!(
            certs = ?self.reconciler.settings().certs,
            "🚀 Watching certificates"
        );

        loop {
            if cancel.is_cancelled() {
                break;
            }

            match self.run_cycle(&cancel).await {
                Ok(ListenOutcome::Cancelled) => break,
                Err(e) => {
                    metrics::increment_listen_restarts();
                    error_policy::log_cycle_error(&e, sleep);
                }
            }

            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(sleep) => {}
            }
        }

        info!("🛑 Shutdown requested, stopping");
    }

    /// One pass followed by listening until failure or cancellation
    pub async fn run_cycle(&self, cancel: &CancellationToken) -> Result<ListenOutcome, CycleError> {
        let pass = tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(ListenOutcome::Cancelled),
            pass = self.reconciler.reconcile_all() => pass,
        };
        match pass {
            Ok(changed) => {
                self.notifier.notify_if_changed(changed).await;
            }
            Err(e) => {
                // files rewritten before the failure still need the reload
                self.notifier.notify_if_changed(e.changed).await;
                return Err(e.into());
            }
        }

        let stream = tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(ListenOutcome::Cancelled),
            stream = listener::subscribe(&self.reconciler) => stream?,
        };

        metrics::set_subscription_active(true);
        debug!("Listening for certificate changes");
        let result = listener::listen(&self.reconciler, &self.notifier, stream, cancel).await;
        metrics::set_subscription_active(false);

        Ok(result?)
    }
}
