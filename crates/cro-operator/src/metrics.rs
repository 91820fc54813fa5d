//! Prometheus self-metrics for the cloud metrics controller
//!
//! These live on the default registry. The catalog gauges published for
//! managed resources live on their own registry (see `catalog`).

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge, register_histogram, CounterVec, Encoder, Gauge,
    Histogram, Registry, TextEncoder,
};

/// Completed reconcile passes by outcome (clean, degraded)
pub static RECONCILE_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "cro_cloudmetrics_reconcile_total",
        "Total cloud metrics reconcile passes by outcome",
        &["outcome"]
    )
    .unwrap()
});

/// Wall-clock duration of one pass
pub static RECONCILE_DURATION_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "cro_cloudmetrics_reconcile_duration_seconds",
        "Duration of a cloud metrics reconcile pass in seconds",
        vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]
    )
    .unwrap()
});

/// Failed listing calls by kind
pub static LIST_ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "cro_cloudmetrics_list_errors_total",
        "Failed resource listing calls by kind",
        &["kind"]
    )
    .unwrap()
});

/// Failed or timed out provider scrapes
pub static SCRAPE_ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "cro_cloudmetrics_scrape_errors_total",
        "Failed provider scrape calls by kind and provider",
        &["kind", "provider"]
    )
    .unwrap()
});

pub static SAMPLES_PUBLISHED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "cro_cloudmetrics_samples_published_total",
        "Samples written to a catalog gauge by kind",
        &["kind"]
    )
    .unwrap()
});

/// Samples with no catalog entry
pub static SAMPLES_DROPPED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "cro_cloudmetrics_samples_dropped_total",
        "Samples dropped because no catalog entry matched, by kind",
        &["kind"]
    )
    .unwrap()
});

pub static LAST_RECONCILE_TIMESTAMP_SECONDS: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "cro_cloudmetrics_last_reconcile_timestamp_seconds",
        "Unix time the last reconcile pass finished"
    )
    .unwrap()
});

/// Initialize all metrics
pub fn init_metrics() {
    // Touch all lazy statics to register them
    let _ = &*RECONCILE_TOTAL;
    let _ = &*RECONCILE_DURATION_SECONDS;
    let _ = &*LIST_ERRORS_TOTAL;
    let _ = &*SCRAPE_ERRORS_TOTAL;
    let _ = &*SAMPLES_PUBLISHED_TOTAL;
    let _ = &*SAMPLES_DROPPED_TOTAL;
    let _ = &*LAST_RECONCILE_TIMESTAMP_SECONDS;
}

/// Encode the catalog registry and the self-metrics as Prometheus text format
pub fn encode_metrics(catalog_registry: &Registry) -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut metric_families = catalog_registry.gather();
    metric_families.extend(prometheus::gather());

    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

pub fn record_pass(outcome: &str, duration_secs: f64) {
    RECONCILE_TOTAL.with_label_values(&[outcome]).inc();
    RECONCILE_DURATION_SECONDS.observe(duration_secs);
    LAST_RECONCILE_TIMESTAMP_SECONDS.set(chrono::Utc::now().timestamp() as f64);
}

pub fn record_list_error(kind: &str) {
    LIST_ERRORS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn record_scrape_error(kind: &str, provider: &str) {
    SCRAPE_ERRORS_TOTAL.with_label_values(&[kind, provider]).inc();
}

pub fn record_published(kind: &str, published: usize, dropped: usize) {
    SAMPLES_PUBLISHED_TOTAL
        .with_label_values(&[kind])
        .inc_by(published as f64);
    SAMPLES_DROPPED_TOTAL
        .with_label_values(&[kind])
        .inc_by(dropped as f64);
}
