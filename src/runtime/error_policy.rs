//! # Error Policy
//!
//! Classifies listen-cycle failures so the restart log carries an actionable
//! hint. The retry delay itself is fixed; classification never changes it.

use crate::controller::listener::ListenError;
use crate::controller::reconciler::ReconcileError;
use crate::runtime::supervisor::CycleError;
use std::fmt;
use std::time::Duration;
use tracing::{error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Store unreachable or refused a command
    StoreUnavailable,
    /// A stored value could not be decoded
    BadStoredValue,
    /// Local mirror directory or file operation failed
    Filesystem,
    /// The store ended the notification subscription
    SubscriptionLost,
}

impl ErrorClass {
    #[must_use]
    pub fn hint(self) -> &'static str {
        match self {
            ErrorClass::StoreUnavailable => {
                "verify --redisurl and that the Redis server is reachable"
            }
            ErrorClass::BadStoredValue => {
                "verify --valueprefix matches the value prefix of the storage plugin"
            }
            ErrorClass::Filesystem => "verify --certdir exists and is writable by certwatch",
            ErrorClass::SubscriptionLost => {
                "connection to Redis dropped; notifications missed meanwhile are picked up by the next pass"
            }
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorClass::StoreUnavailable => "store-unavailable",
            ErrorClass::BadStoredValue => "bad-stored-value",
            ErrorClass::Filesystem => "filesystem",
            ErrorClass::SubscriptionLost => "subscription-lost",
        };
        f.write_str(label)
    }
}

#[must_use]
pub fn classify(err: &CycleError) -> ErrorClass {
    match err {
        CycleError::Pass(pass) => match &pass.source {
            ReconcileError::Store { .. } => ErrorClass::StoreUnavailable,
            ReconcileError::Decode { .. } => ErrorClass::BadStoredValue,
            ReconcileError::Mirror(_) => ErrorClass::Filesystem,
        },
        CycleError::Listen(ListenError::Subscribe { .. } | ListenError::Store(_)) => {
            ErrorClass::StoreUnavailable
        }
        CycleError::Listen(ListenError::SubscriptionClosed) => ErrorClass::SubscriptionLost,
    }
}

/// Log a failed cycle before the supervisor sleeps
pub fn log_cycle_error(err: &CycleError, retry_in: Duration) {
    let class = classify(err);
    let span = tracing::span!(
        tracing::Level::ERROR,
        "certwatch.cycle_error",
        class = %class,
        error = %err
    );
    let _guard = span.enter();

    match class {
        ErrorClass::SubscriptionLost => warn!("⚠️  {}", err),
        _ => error!("❌ {}", err),
    }
    warn!("🔍 {}", class.hint());
    warn!("⏳ Restarting in {:?}", retry_in);
}
