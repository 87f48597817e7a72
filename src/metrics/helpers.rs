use std::time::Duration;

use prometheus::{Encoder, TextEncoder};

use super::{
    CACHE_EVICTED_TOTAL, CACHE_HITS_TOTAL, CACHE_MISSES_TOTAL, RENDERS_TOTAL, RENDER_DURATION,
    RENDER_ERRORS_TOTAL, STORE_ERRORS_TOTAL,
};

/// Encode all registered metrics in the Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording render metrics
pub struct RenderMetrics;

impl RenderMetrics {
    /// Record a completed render call
    pub fn record_render(channel: &str, duration: Duration) {
        RENDERS_TOTAL.with_label_values(&[channel]).inc();
        RENDER_DURATION.observe(duration.as_secs_f64());
    }

    /// Record a failed directive
    pub fn record_error(kind: &str) {
        RENDER_ERRORS_TOTAL.with_label_values(&[kind]).inc();
    }
}

/// Helper struct for recording template cache metrics
pub struct CacheMetrics;

impl CacheMetrics {
    pub fn record_hit() {
        CACHE_HITS_TOTAL.inc();
    }

    pub fn record_miss() {
        CACHE_MISSES_TOTAL.inc();
    }

    pub fn record_evicted(count: u64) {
        CACHE_EVICTED_TOTAL.inc_by(count);
    }

    pub fn record_store_error() {
        STORE_ERRORS_TOTAL.inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_includes_render_metrics() {
        RenderMetrics::record_render("EMAIL", Duration::from_millis(3));
        RenderMetrics::record_error("not_found");
        CacheMetrics::record_hit();

        let output = encode_metrics().unwrap();
        assert!(output.contains("xnovu_renders_total"));
        assert!(output.contains("channel=\"EMAIL\""));
        assert!(output.contains("xnovu_render_errors_total"));
        assert!(output.contains("xnovu_template_cache_hits_total"));
    }
}
