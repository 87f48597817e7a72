mod settings;

pub use settings::{CacheConfig, DatabaseConfig, LogConfig, RenderConfig, Settings, StoreConfig};
