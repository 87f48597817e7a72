//! Prometheus metrics for template rendering.
//!
//! - Render metrics (renders per channel, directive failures by kind, duration)
//! - Template cache metrics (hits, misses, evictions, store failures)

mod helpers;

pub use helpers::{encode_metrics, CacheMetrics, RenderMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Histogram, IntCounter,
    IntCounterVec,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "xnovu";

lazy_static! {
    // ============================================================================
    // Render Metrics
    // ============================================================================

    /// Total renders by channel
    pub static ref RENDERS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_renders_total", METRIC_PREFIX),
        "Total template renders",
        &["channel"]
    ).unwrap();

    /// Directive failures by kind
    pub static ref RENDER_ERRORS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_render_errors_total", METRIC_PREFIX),
        "Total directive failures during rendering",
        &["kind"]
    ).unwrap();

    /// Render duration
    pub static ref RENDER_DURATION: Histogram = register_histogram!(
        format!("{}_render_duration_seconds", METRIC_PREFIX),
        "Time to render a template, including nested loads",
        vec![0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    ).unwrap();

    // ============================================================================
    // Template Cache Metrics
    // ============================================================================

    pub static ref CACHE_HITS_TOTAL: IntCounter = register_int_counter!(
        format!("{}_template_cache_hits_total", METRIC_PREFIX),
        "Template loads served from cache"
    ).unwrap();

    pub static ref CACHE_MISSES_TOTAL: IntCounter = register_int_counter!(
        format!("{}_template_cache_misses_total", METRIC_PREFIX),
        "Template loads that went to the backing store"
    ).unwrap();

    pub static ref CACHE_EVICTED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_template_cache_evicted_total", METRIC_PREFIX),
        "Expired template cache entries removed"
    ).unwrap();

    /// Backing store failures (not including missing templates)
    pub static ref STORE_ERRORS_TOTAL: IntCounter = register_int_counter!(
        format!("{}_template_store_errors_total", METRIC_PREFIX),
        "Template store failures"
    ).unwrap();
}
