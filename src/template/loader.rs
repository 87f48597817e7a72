//! Template store interface and its caching implementation.
//!
//! The render engine only talks to [`TemplateStore`]. [`CachingTemplateLoader`]
//! implements it on top of any [`TemplateSource`], keeping loaded templates in a
//! TTL cache keyed by `tenant:key`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::future::join_all;
use serde::Serialize;
use tokio::time::Instant;

use crate::config::CacheConfig;
use crate::metrics::CacheMetrics;

use super::source::{scoped_key, TemplateSource};
use super::types::{
    LoadMetadata, LoadSource, LoadedTemplate, Template, TemplateFilter, TemplateStoreError,
};

/// Loader statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoaderStats {
    /// Templates fetched from the backing source
    pub total_loaded: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// Entries currently held, valid or not
    pub total_cached: usize,
    pub valid_cached: usize,
    pub expired_cached: usize,
}

/// Contract the render engine uses to resolve templates.
///
/// # Error Handling
///
/// `TemplateStoreError::NotFound` covers every reason a template is not resolvable
/// for the tenant. `TemplateStoreError::Load` is reserved for store failures.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// Load one template for a tenant (or global scope when `enterprise_id` is `None`)
    async fn load_template(
        &self,
        template_key: &str,
        enterprise_id: Option<&str>,
    ) -> Result<LoadedTemplate, TemplateStoreError>;

    /// Load several templates. Failures are logged and the key is left out.
    async fn load_templates(
        &self,
        template_keys: &[String],
        enterprise_id: Option<&str>,
    ) -> HashMap<String, LoadedTemplate>;

    /// Whether a resolvable template exists
    async fn template_exists(
        &self,
        template_key: &str,
        enterprise_id: Option<&str>,
    ) -> Result<bool, TemplateStoreError>;

    async fn list_templates(
        &self,
        filter: &TemplateFilter,
    ) -> Result<Vec<Template>, TemplateStoreError>;

    /// Drop every cached entry
    fn clear_cache(&self);

    /// Drop entries past their TTL, returning how many were removed
    fn clear_expired_cache(&self) -> usize;

    fn stats(&self) -> LoaderStats;
}

#[derive(Debug, Clone)]
struct CacheEntry {
    template: Template,
    loaded_at: Instant,
    loaded_at_utc: DateTime<Utc>,
}

impl CacheEntry {
    fn new(template: Template) -> Self {
        Self {
            template,
            loaded_at: Instant::now(),
            loaded_at_utc: Utc::now(),
        }
    }

    fn is_valid(&self, ttl: Duration) -> bool {
        self.loaded_at.elapsed() < ttl
    }
}

/// TTL-caching template loader.
///
/// Concurrent loads of the same key may both reach the source; the later write
/// wins, which only costs an extra fetch.
pub struct CachingTemplateLoader {
    source: Arc<dyn TemplateSource>,
    cache: DashMap<String, CacheEntry>,
    enabled: bool,
    ttl: Duration,
    total_loaded: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
}

impl CachingTemplateLoader {
    /// Create a loader using the cache configuration
    pub fn new(source: Arc<dyn TemplateSource>, config: &CacheConfig) -> Self {
        Self {
            source,
            cache: DashMap::new(),
            enabled: config.enabled,
            ttl: Duration::from_secs(config.ttl_seconds),
            total_loaded: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
        }
    }

    /// Create a loader with an explicit TTL
    pub fn with_ttl(source: Arc<dyn TemplateSource>, ttl: Duration) -> Self {
        let mut loader = Self::new(source, &CacheConfig::default());
        loader.enabled = true;
        loader.ttl = ttl;
        loader
    }

    /// Drop the cached entry for one key
    pub fn invalidate(&self, template_key: &str, enterprise_id: Option<&str>) -> bool {
        self.cache
            .remove(&scoped_key(template_key, enterprise_id))
            .is_some()
    }

    /// Configured time-to-live for cache entries
    pub fn cache_ttl(&self) -> Duration {
        self.ttl
    }

    fn cached(&self, key: &str) -> Option<LoadedTemplate> {
        let entry = self.cache.get(key)?;
        if !entry.is_valid(self.ttl) {
            return None;
        }

        Some(LoadedTemplate {
            template: entry.template.clone(),
            metadata: LoadMetadata {
                loaded_at: entry.loaded_at_utc,
                source: LoadSource::Cache,
            },
        })
    }
}

#[async_trait]
impl TemplateStore for CachingTemplateLoader {
    async fn load_template(
        &self,
        template_key: &str,
        enterprise_id: Option<&str>,
    ) -> Result<LoadedTemplate, TemplateStoreError> {
        let key = scoped_key(template_key, enterprise_id);

        if self.enabled {
            if let Some(loaded) = self.cached(&key) {
                self.cache_hits.fetch_add(1, Ordering::Relaxed);
                CacheMetrics::record_hit();
                tracing::debug!(template_key = %template_key, cache_key = %key, "Template cache hit");
                return Ok(loaded);
            }
        }

        self.cache_misses.fetch_add(1, Ordering::Relaxed);
        CacheMetrics::record_miss();

        let template = match self.source.fetch(template_key, enterprise_id).await {
            Ok(Some(template)) => template,
            Ok(None) => {
                tracing::debug!(
                    template_key = %template_key,
                    enterprise_id = ?enterprise_id,
                    "Template not found"
                );
                return Err(TemplateStoreError::not_found(template_key, enterprise_id));
            }
            Err(e) => {
                CacheMetrics::record_store_error();
                tracing::warn!(
                    template_key = %template_key,
                    backend = self.source.backend_name(),
                    error = %e,
                    "Template store failure"
                );
                return Err(e);
            }
        };

        self.total_loaded.fetch_add(1, Ordering::Relaxed);

        let entry = CacheEntry::new(template);
        let loaded = LoadedTemplate {
            template: entry.template.clone(),
            metadata: LoadMetadata {
                loaded_at: entry.loaded_at_utc,
                source: LoadSource::Store {
                    backend: self.source.backend_name().to_string(),
                },
            },
        };

        if self.enabled {
            self.cache.insert(key, entry);
        }

        Ok(loaded)
    }

    async fn load_templates(
        &self,
        template_keys: &[String],
        enterprise_id: Option<&str>,
    ) -> HashMap<String, LoadedTemplate> {
        let results = join_all(
            template_keys
                .iter()
                .map(|key| async move { (key, self.load_template(key, enterprise_id).await) }),
        )
        .await;

        let mut loaded = HashMap::with_capacity(results.len());
        for (key, result) in results {
            match result {
                Ok(template) => {
                    loaded.insert(key.clone(), template);
                }
                Err(e) => {
                    tracing::warn!(template_key = %key, error = %e, "Failed to load template");
                }
            }
        }

        loaded
    }

    async fn template_exists(
        &self,
        template_key: &str,
        enterprise_id: Option<&str>,
    ) -> Result<bool, TemplateStoreError> {
        match self.load_template(template_key, enterprise_id).await {
            Ok(_) => Ok(true),
            Err(TemplateStoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn list_templates(
        &self,
        filter: &TemplateFilter,
    ) -> Result<Vec<Template>, TemplateStoreError> {
        self.source.list(filter).await.map_err(|e| {
            CacheMetrics::record_store_error();
            tracing::warn!(
                backend = self.source.backend_name(),
                error = %e,
                "Template listing failed"
            );
            e
        })
    }

    fn clear_cache(&self) {
        let cleared = self.cache.len();
        self.cache.clear();
        tracing::info!(cleared = cleared, "Template cache cleared");
    }

    fn clear_expired_cache(&self) -> usize {
        let before = self.cache.len();
        let ttl = self.ttl;
        self.cache.retain(|_, entry| entry.is_valid(ttl));
        let removed = before.saturating_sub(self.cache.len());

        if removed > 0 {
            CacheMetrics::record_evicted(removed as u64);
            tracing::info!(
                removed = removed,
                remaining = self.cache.len(),
                "Evicted expired template cache entries"
            );
        }

        removed
    }

    fn stats(&self) -> LoaderStats {
        let total_cached = self.cache.len();
        let valid_cached = self
            .cache
            .iter()
            .filter(|entry| entry.is_valid(self.ttl))
            .count();

        LoaderStats {
            total_loaded: self.total_loaded.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            total_cached,
            valid_cached,
            expired_cached: total_cached.saturating_sub(valid_cached),
        }
    }
}
