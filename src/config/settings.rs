use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenderConfig {
    /// Maximum nesting of template inclusions
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Inline marker for failed directives; `{key}` is replaced by the template key
    #[serde(default = "default_error_placeholder")]
    pub error_placeholder: String,
    /// Fail the whole render on the first directive error
    #[serde(default)]
    pub throw_on_error: bool,
}

fn default_max_depth() -> usize {
    10
}

fn default_error_placeholder() -> String {
    "[Template Error: {key}]".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    /// Template cache TTL in seconds
    #[serde(default = "default_cache_ttl")]
    pub ttl_seconds: u64,
    /// Expired-entry sweep interval in seconds
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_seconds: u64,
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_ttl() -> u64 {
    300 // 5 minutes
}

fn default_cleanup_interval() -> u64 {
    60 // 1 minute
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// "memory" or "postgres"
    #[serde(default = "default_store_backend")]
    pub backend: String,
    /// JSON file of templates to seed the memory backend with
    #[serde(default)]
    pub fixtures_path: Option<String>,
    #[serde(default)]
    pub database: DatabaseConfig,
}

fn default_store_backend() -> String {
    "memory".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
}

fn default_database_url() -> String {
    "postgres://localhost:5432/xnovu".to_string()
}

fn default_pool_size() -> u32 {
    5
}

fn default_connect_timeout() -> u64 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .set_default("render.max_depth", 10)?
            .set_default("render.error_placeholder", default_error_placeholder())?
            .set_default("cache.ttl_seconds", 300)?
            .set_default("cache.cleanup_interval_seconds", 60)?
            .set_default("store.backend", "memory")?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // RENDER__MAX_DEPTH, CACHE__TTL_SECONDS, STORE__BACKEND, LOG__LEVEL, ...
            .add_source(
                Environment::default()
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            error_placeholder: default_error_placeholder(),
            throw_on_error: false,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            ttl_seconds: default_cache_ttl(),
            cleanup_interval_seconds: default_cleanup_interval(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            fixtures_path: None,
            database: DatabaseConfig::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            pool_size: default_pool_size(),
            connect_timeout_seconds: default_connect_timeout(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let settings = Settings::default();
        assert_eq!(settings.render.max_depth, 10);
        assert_eq!(settings.render.error_placeholder, "[Template Error: {key}]");
        assert!(!settings.render.throw_on_error);
        assert_eq!(settings.cache.ttl_seconds, 300);
        assert_eq!(settings.store.backend, "memory");
        assert_eq!(settings.log.level, "info");
    }

    #[test]
    fn test_deserialize_partial() {
        let settings: Settings = serde_json::from_value(serde_json::json!({
            "render": { "max_depth": 3 },
            "cache": { "enabled": false }
        }))
        .unwrap();

        assert_eq!(settings.render.max_depth, 3);
        assert_eq!(settings.render.error_placeholder, "[Template Error: {key}]");
        assert!(!settings.cache.enabled);
        assert_eq!(settings.cache.ttl_seconds, 300);
    }
}
