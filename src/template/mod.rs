//! Notification template model and storage.
//!
//! This module provides:
//! - The tenant-scoped [`Template`] definition
//! - Backing sources ([`MemoryTemplateSource`], [`PostgresTemplateSource`])
//! - The [`TemplateStore`] contract used by the renderer, implemented with a
//!   TTL cache by [`CachingTemplateLoader`]
//!
//! # Example
//!
//! ```ignore
//! let source = Arc::new(MemoryTemplateSource::with_templates([
//!     Template::new("greet", "there, {{ name }}"),
//! ]));
//! let store = CachingTemplateLoader::new(source, &CacheConfig::default());
//!
//! let loaded = store.load_template("greet", Some("acme")).await?;
//! ```

mod loader;
mod postgres;
mod source;
mod types;

pub use loader::{CachingTemplateLoader, LoaderStats, TemplateStore};
pub use postgres::PostgresTemplateSource;
pub use source::{create_template_source, scoped_key, MemoryTemplateSource, TemplateSource};
pub use types::{
    validate_key, ChannelType, LoadMetadata, LoadSource, LoadedTemplate, PublishStatus, Template,
    TemplateFilter, TemplateSourceError, TemplateSourceResult, TemplateStoreError,
    UpdateTemplateRequest,
};
