//! # Subscription Listener
//!
//! Consumes keyspace notifications for the certificates namespace and applies
//! them to the local mirror, one message at a time and in arrival order.
//!
//! - `set` reconciles every watched certificate whose name prefixes the key
//! - `del`, `expired` and `evicted` remove `<certdir>/<name><ext>`, where
//!   `<ext>` is the extension of the notified key
//! - anything else is logged and ignored
//!
//! The reload command runs at most once per message.

use crate::controller::events::{ChangeEvent, EventKind};
use crate::controller::notifier::Notifier;
use crate::controller::reconciler::Reconciler;
use crate::observability::metrics;
use crate::provider::{MessageStream, StoreError, StoreMessage};
use futures::StreamExt;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// How a listen cycle ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenOutcome {
    Cancelled,
}

#[derive(Debug, Error)]
pub enum ListenError {
    #[error("failed to subscribe to {pattern}: {source}")]
    Subscribe {
        pattern: String,
        #[source]
        source: StoreError,
    },
    #[error("subscription failed: {0}")]
    Store(#[from] StoreError),
    #[error("subscription closed by the store")]
    SubscriptionClosed,
}

/// Subscribe to keyspace notifications for the certificates namespace
pub async fn subscribe(reconciler: &Reconciler) -> Result<MessageStream, ListenError> {
    let pattern = reconciler.settings().keyspace_pattern();
    let stream = reconciler
        .store()
        .psubscribe(&pattern)
        .await
        .map_err(|source| ListenError::Subscribe {
            pattern: pattern.clone(),
            source,
        })?;
    info!(pattern = %pattern, "Subscribed to keyspace notifications");
    Ok(stream)
}

/// Process messages until the stream fails or `cancel` fires
pub async fn listen(
    reconciler: &Reconciler,
    notifier: &Notifier,
    mut stream: MessageStream,
    cancel: &CancellationToken,
) -> Result<ListenOutcome, ListenError> {
    let channel_prefix = reconciler.settings().keyspace_channel_prefix();

    async {
        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!("Listener cancelled");
                    return Ok(ListenOutcome::Cancelled);
                }
                next = stream.next() => next,
            };

            let message = match next {
                Some(Ok(message)) => message,
                Some(Err(e)) => return Err(ListenError::Store(e)),
                None => return Err(ListenError::SubscriptionClosed),
            };

            let changed = handle_message(reconciler, &message, &channel_prefix).await;
            notifier.notify_if_changed(changed).await;
        }
    }
    .instrument(info_span!("certwatch.listen"))
    .await
}

async fn handle_message(
    reconciler: &Reconciler,
    message: &StoreMessage,
    channel_prefix: &str,
) -> bool {
    let event = ChangeEvent::from_message(message, channel_prefix);
    metrics::increment_events(event.kind.label());
    debug!(key = %event.key, event = %event.kind, "Keyspace notification");
    handle_event(reconciler, &event).await
}

/// Apply one event to every watched certificate it names
///
/// Returns whether any mirror file was rewritten. Failures are logged per
/// certificate and do not stop the remaining names.
pub async fn handle_event(reconciler: &Reconciler, event: &ChangeEvent) -> bool {
    let mut changed = false;
    for name in event.matching_names(&reconciler.settings().certs) {
        match &event.kind {
            EventKind::Set => {
                if let Err(e) = reconciler.reconcile_into(name, &mut changed).await {
                    error!(key = %event.key, cert = %name, error = %e, "Failed to reconcile certificate");
                }
            }
            EventKind::Delete(_) => {
                if let Err(e) = reconciler.delete_mirror(name, event.extension()) {
                    error!(key = %event.key, cert = %name, error = %e, "Failed to remove certificate file");
                }
            }
            EventKind::Unknown(kind) => {
                warn!(key = %event.key, event = %kind, "Ignoring unhandled keyspace event");
            }
        }
    }
    changed
}
