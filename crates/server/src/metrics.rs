//! Prometheus metrics for the sheetbase server.
//!
//! Exposes metrics for reconciliation, dataset creation, ingestion and
//! access checks.
//!
//! # Security Note
//!
//! The `/metrics` endpoint is unauthenticated to allow Prometheus scraping.
//! Metrics carry no dataset names or identifiers, only aggregate counts.
//! Restrict the endpoint at the network level in production deployments.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    self, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::{LazyLock, Once};

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// Reconciliation metrics
pub static DATASETS_LISTED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "sheetbase_datasets_listed_total",
        "Total number of dataset descriptors returned by reconciliation",
    )
    .expect("metric creation failed")
});

pub static FALLBACK_DESCRIPTORS: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "sheetbase_fallback_descriptors_total",
        "Total number of descriptors synthesized for tabs without metadata",
    )
    .expect("metric creation failed")
});

pub static ORPHANED_RECORDS: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "sheetbase_orphaned_records",
        "Metadata records matching no live tab at the last reconciliation",
    )
    .expect("metric creation failed")
});

pub static RECONCILE_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "sheetbase_reconcile_duration_seconds",
            "Time taken to reconcile provider tabs with metadata records",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
    )
    .expect("metric creation failed")
});

// Write metrics
pub static DATASETS_CREATED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "sheetbase_datasets_created_total",
        "Total number of datasets created",
    )
    .expect("metric creation failed")
});

pub static ROWS_APPENDED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "sheetbase_rows_appended_total",
        "Total number of rows appended to dataset tabs",
    )
    .expect("metric creation failed")
});

pub static INGESTION_FAILURES: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "sheetbase_ingestion_failures_total",
            "Total number of rejected or failed ingestions by kind",
        ),
        &["kind"],
    )
    .expect("metric creation failed")
});

pub static PARTIAL_FAILURES: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "sheetbase_partial_failures_total",
            "Total number of multi-step writes that stopped part way",
        ),
        &["operation"],
    )
    .expect("metric creation failed")
});

// Access metrics
pub static ACCESS_CHECKS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "sheetbase_access_checks_total",
            "Total number of dataset access checks by outcome",
        ),
        &["outcome"],
    )
    .expect("metric creation failed")
});

static REGISTER_ONCE: Once = Once::new();

/// Register all metrics with the global registry.
pub fn register_metrics() {
    REGISTER_ONCE.call_once(|| {
        REGISTRY
            .register(Box::new(DATASETS_LISTED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(FALLBACK_DESCRIPTORS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(ORPHANED_RECORDS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(RECONCILE_DURATION.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(DATASETS_CREATED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(ROWS_APPENDED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(INGESTION_FAILURES.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(PARTIAL_FAILURES.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(ACCESS_CHECKS.clone()))
            .expect("metric registration failed");
    });
}

/// Handler for the /metrics endpoint.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {e}").into_bytes(),
        ),
    }
}

/// Record a catalog returned to a client.
pub fn record_catalog_served(descriptors: usize, fallback: usize) {
    DATASETS_LISTED.inc_by(descriptors as u64);
    FALLBACK_DESCRIPTORS.inc_by(fallback as u64);
}

/// Record a rejected or failed ingestion.
pub fn record_ingestion_failure(kind: &str) {
    INGESTION_FAILURES.with_label_values(&[kind]).inc();
}

/// Record the outcome of an access check.
pub fn record_access_check(outcome: &str) {
    ACCESS_CHECKS.with_label_values(&[outcome]).inc();
}

/// Record a multi-step write that stopped part way.
pub fn record_partial_failure(operation: &str) {
    PARTIAL_FAILURES.with_label_values(&[operation]).inc();
}
