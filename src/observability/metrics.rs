//! # Metrics
//!
//! Prometheus metrics for monitoring certwatch.
//!
//! ## Metrics Exposed
//!
//! - `certwatch_reconciliations_total` - Certificates reconciled
//! - `certwatch_reconciliation_errors_total` - Failed certificate reconciliations
//! - `certwatch_reconcile_pass_duration_seconds` - Duration of full reconciliation passes
//! - `certwatch_files_written_total` - Mirror files written
//! - `certwatch_files_deleted_total` - Mirror files deleted
//! - `certwatch_events_total` - Keyspace notifications received, by kind
//! - `certwatch_reload_commands_total` - Reload command runs
//! - `certwatch_reload_command_failures_total` - Reload command runs that failed
//! - `certwatch_listen_restarts_total` - Listen cycles restarted after an error
//! - `certwatch_subscription_active` - 1 while the change subscription is active

use anyhow::Result;
use prometheus::{Histogram, IntCounter, IntCounterVec, IntGauge, Registry};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "certwatch_reconciliations_total",
        "Total number of certificate reconciliations",
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "certwatch_reconciliation_errors_total",
        "Total number of failed certificate reconciliations",
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static PASS_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "certwatch_reconcile_pass_duration_seconds",
            "Duration of full reconciliation passes in seconds",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
    )
    .expect("Failed to create PASS_DURATION metric - this should never happen")
});

static FILES_WRITTEN_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "certwatch_files_written_total",
        "Total number of mirror files written",
    )
    .expect("Failed to create FILES_WRITTEN_TOTAL metric - this should never happen")
});

static FILES_DELETED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "certwatch_files_deleted_total",
        "Total number of mirror files deleted",
    )
    .expect("Failed to create FILES_DELETED_TOTAL metric - this should never happen")
});

static EVENTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "certwatch_events_total",
            "Total number of keyspace notifications received",
        ),
        &["kind"],
    )
    .expect("Failed to create EVENTS_TOTAL metric - this should never happen")
});

static RELOAD_COMMANDS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "certwatch_reload_commands_total",
        "Total number of reload command runs",
    )
    .expect("Failed to create RELOAD_COMMANDS_TOTAL metric - this should never happen")
});

static RELOAD_COMMAND_FAILURES_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "certwatch_reload_command_failures_total",
        "Total number of failed reload command runs",
    )
    .expect("Failed to create RELOAD_COMMAND_FAILURES_TOTAL metric - this should never happen")
});

static LISTEN_RESTARTS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "certwatch_listen_restarts_total",
        "Total number of listen cycles restarted after an error",
    )
    .expect("Failed to create LISTEN_RESTARTS_TOTAL metric - this should never happen")
});

static SUBSCRIPTION_ACTIVE: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "certwatch_subscription_active",
        "1 while the change notification subscription is active",
    )
    .expect("Failed to create SUBSCRIPTION_ACTIVE metric - this should never happen")
});

/// Register all metrics with the registry
///
/// Metrics update fine without registration; registration only makes them
/// visible on `/metrics`.
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(PASS_DURATION.clone()))?;
    REGISTRY.register(Box::new(FILES_WRITTEN_TOTAL.clone()))?;
    REGISTRY.register(Box::new(FILES_DELETED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(EVENTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RELOAD_COMMANDS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RELOAD_COMMAND_FAILURES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(LISTEN_RESTARTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SUBSCRIPTION_ACTIVE.clone()))?;
    Ok(())
}

pub fn increment_reconciliations() {
    RECONCILIATIONS_TOTAL.inc();
}

pub fn increment_reconciliation_errors() {
    RECONCILIATION_ERRORS_TOTAL.inc();
}

pub fn observe_pass_duration(seconds: f64) {
    PASS_DURATION.observe(seconds);
}

pub fn increment_files_written() {
    FILES_WRITTEN_TOTAL.inc();
}

pub fn increment_files_deleted() {
    FILES_DELETED_TOTAL.inc();
}

pub fn increment_events(kind: &str) {
    EVENTS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn increment_reload_commands() {
    RELOAD_COMMANDS_TOTAL.inc();
}

pub fn increment_reload_command_failures() {
    RELOAD_COMMAND_FAILURES_TOTAL.inc();
}

pub fn increment_listen_restarts() {
    LISTEN_RESTARTS_TOTAL.inc();
}

pub fn set_subscription_active(active: bool) {
    SUBSCRIPTION_ACTIVE.set(i64::from(active));
}

#[must_use]
pub fn subscription_active() -> bool {
    SUBSCRIPTION_ACTIVE.get() > 0
}
