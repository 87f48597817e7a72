use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::config::CacheConfig;
use crate::template::TemplateStore;

/// Background task that evicts expired template cache entries.
///
/// The host owns the task and its shutdown channel; nothing is scheduled implicitly.
pub struct CacheSweepTask {
    interval: Duration,
    store: Arc<dyn TemplateStore>,
    shutdown: broadcast::Receiver<()>,
}

impl CacheSweepTask {
    pub fn new(
        config: &CacheConfig,
        store: Arc<dyn TemplateStore>,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self::with_interval(
            Duration::from_secs(config.cleanup_interval_seconds.max(1)),
            store,
            shutdown,
        )
    }

    pub fn with_interval(
        interval: Duration,
        store: Arc<dyn TemplateStore>,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            interval,
            store,
            shutdown,
        }
    }

    /// Run until the shutdown signal is received
    pub async fn run(mut self) {
        let mut timer = tokio::time::interval(self.interval);

        // Skip immediate first tick
        timer.tick().await;

        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "Template cache sweep task started"
        );

        loop {
            tokio::select! {
                _ = self.shutdown.recv() => {
                    tracing::info!("Cache sweep task received shutdown signal");
                    break;
                }
                _ = timer.tick() => {
                    let removed = self.store.clear_expired_cache();
                    tracing::debug!(removed = removed, "Template cache sweep completed");
                }
            }
        }

        tracing::info!("Template cache sweep task stopped");
    }
}
