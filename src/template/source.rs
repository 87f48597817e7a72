//! Backing sources the template store loads from.
//!
//! A source answers raw lookups; caching and statistics live in the loader.
//! Every source applies the same resolution rule: only published, active templates
//! are returned, and a tenant lookup prefers the tenant's own template before
//! falling back to a global one.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use crate::config::StoreConfig;

use super::postgres::PostgresTemplateSource;
use super::types::{
    Template, TemplateFilter, TemplateSourceError, TemplateSourceResult, TemplateStoreError,
    UpdateTemplateRequest,
};

/// Cache/storage key for a template: `tenant:key`, or the bare key for global scope.
pub fn scoped_key(template_key: &str, enterprise_id: Option<&str>) -> String {
    match enterprise_id {
        Some(tenant) if !tenant.is_empty() => format!("{}:{}", tenant, template_key),
        _ => template_key.to_string(),
    }
}

/// Raw template lookup against a backing store.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; one source is shared by every render.
#[async_trait]
pub trait TemplateSource: Send + Sync {
    /// Short backend identifier used in load metadata and logs
    fn backend_name(&self) -> &'static str;

    /// Fetch a resolvable template.
    ///
    /// Returns `Ok(None)` when nothing published and active matches. Errors are
    /// reserved for failures of the store itself.
    async fn fetch(
        &self,
        template_key: &str,
        enterprise_id: Option<&str>,
    ) -> Result<Option<Template>, TemplateStoreError>;

    /// List resolvable templates matching the filter
    async fn list(&self, filter: &TemplateFilter) -> Result<Vec<Template>, TemplateStoreError>;
}

/// In-memory template source with authoring operations
pub struct MemoryTemplateSource {
    templates: DashMap<String, Template>,
}

impl Default for MemoryTemplateSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTemplateSource {
    /// Create an empty source
    pub fn new() -> Self {
        Self {
            templates: DashMap::new(),
        }
    }

    /// Create a source pre-populated with templates, replacing duplicates
    pub fn with_templates(templates: impl IntoIterator<Item = Template>) -> Self {
        let source = Self::new();
        for template in templates {
            source.upsert(template);
        }
        source
    }

    /// Create a new template
    pub fn create(&self, template: Template) -> TemplateSourceResult<Template> {
        template.validate()?;

        let key = scoped_key(&template.template_key, template.enterprise_id.as_deref());
        if self.templates.contains_key(&key) {
            return Err(TemplateSourceError::AlreadyExists(key));
        }

        self.templates.insert(key, template.clone());
        Ok(template)
    }

    /// Insert or replace a template without validation
    pub fn upsert(&self, template: Template) {
        let key = scoped_key(&template.template_key, template.enterprise_id.as_deref());
        self.templates.insert(key, template);
    }

    /// Get a template in exactly the given scope, regardless of publish state
    pub fn get(&self, template_key: &str, enterprise_id: Option<&str>) -> TemplateSourceResult<Template> {
        let key = scoped_key(template_key, enterprise_id);
        self.templates
            .get(&key)
            .map(|t| t.clone())
            .ok_or(TemplateSourceError::NotFound(key))
    }

    /// Update an existing template
    pub fn update(
        &self,
        template_key: &str,
        enterprise_id: Option<&str>,
        updates: UpdateTemplateRequest,
    ) -> TemplateSourceResult<Template> {
        let mut template = self.get(template_key, enterprise_id)?;

        if let Some(name) = updates.name {
            template.name = name;
        }

        if let Some(body) = updates.body_template {
            template.body_template = body;
        }

        if let Some(subject) = updates.subject_template {
            template.subject_template = subject;
        }

        if let Some(defaults) = updates.variables_description {
            template.variables_description = defaults;
        }

        if let Some(channel) = updates.channel_type {
            template.channel_type = channel;
        }

        if let Some(status) = updates.publish_status {
            template.publish_status = status;
        }

        if let Some(deactivated) = updates.deactivated {
            template.deactivated = deactivated;
        }

        if let Some(description) = updates.description {
            template.description = description;
        }

        template.updated_at = Utc::now();
        template.validate()?;

        self.templates
            .insert(scoped_key(template_key, enterprise_id), template.clone());

        Ok(template)
    }

    /// Delete a template
    pub fn delete(&self, template_key: &str, enterprise_id: Option<&str>) -> TemplateSourceResult<()> {
        let key = scoped_key(template_key, enterprise_id);
        self.templates
            .remove(&key)
            .map(|_| ())
            .ok_or(TemplateSourceError::NotFound(key))
    }

    /// Get the number of stored templates, resolvable or not
    pub fn count(&self) -> usize {
        self.templates.len()
    }

    /// Load templates from a JSON file holding an array of templates.
    ///
    /// Returns the number of templates loaded.
    pub async fn load_fixtures(&self, path: impl AsRef<Path>) -> TemplateSourceResult<usize> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| TemplateSourceError::Fixtures(format!("{}: {}", path.display(), e)))?;

        let templates: Vec<Template> = serde_json::from_str(&raw)
            .map_err(|e| TemplateSourceError::Fixtures(format!("{}: {}", path.display(), e)))?;

        let count = templates.len();
        for template in templates {
            template.validate()?;
            self.upsert(template);
        }

        tracing::info!(path = %path.display(), count = count, "Loaded template fixtures");
        Ok(count)
    }

    fn resolvable(&self, key: &str) -> Option<Template> {
        self.templates
            .get(key)
            .filter(|t| t.is_resolvable())
            .map(|t| t.clone())
    }
}

#[async_trait]
impl TemplateSource for MemoryTemplateSource {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn fetch(
        &self,
        template_key: &str,
        enterprise_id: Option<&str>,
    ) -> Result<Option<Template>, TemplateStoreError> {
        if let Some(tenant) = enterprise_id.filter(|t| !t.is_empty()) {
            if let Some(template) = self.resolvable(&scoped_key(template_key, Some(tenant))) {
                return Ok(Some(template));
            }
        }

        Ok(self.resolvable(template_key))
    }

    async fn list(&self, filter: &TemplateFilter) -> Result<Vec<Template>, TemplateStoreError> {
        let mut templates: Vec<Template> = self
            .templates
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        templates.sort_by(|a, b| a.template_key.cmp(&b.template_key));
        Ok(templates)
    }
}

/// Create a template source based on configuration.
///
/// - `"postgres"`: connects a `PostgresTemplateSource`, falling back to memory if the
///   connection cannot be established
/// - `"memory"` (default): a `MemoryTemplateSource`, seeded from `fixtures_path` if set
pub async fn create_template_source(config: &StoreConfig) -> Arc<dyn TemplateSource> {
    if config.backend == "postgres" {
        match PostgresTemplateSource::connect(&config.database).await {
            Ok(source) => {
                tracing::info!(backend = "postgres", "Creating PostgreSQL template source");
                return Arc::new(source);
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "PostgreSQL template source unavailable, falling back to memory"
                );
            }
        }
    }

    let source = MemoryTemplateSource::new();
    if let Some(path) = &config.fixtures_path {
        if let Err(e) = source.load_fixtures(path).await {
            tracing::warn!(error = %e, "Failed to load template fixtures");
        }
    }

    tracing::info!(backend = "memory", templates = source.count(), "Creating memory template source");
    Arc::new(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::types::PublishStatus;

    #[test]
    fn test_scoped_key() {
        assert_eq!(scoped_key("greet", Some("acme")), "acme:greet");
        assert_eq!(scoped_key("greet", None), "greet");
        assert_eq!(scoped_key("greet", Some("")), "greet");
    }

    #[test]
    fn test_create_and_get() {
        let source = MemoryTemplateSource::new();
        let created = source
            .create(Template::new("welcome", "Hi").with_enterprise("acme"))
            .unwrap();
        assert_eq!(created.template_key, "welcome");

        let fetched = source.get("welcome", Some("acme")).unwrap();
        assert_eq!(fetched.body_template, "Hi");
        assert!(source.get("welcome", None).is_err());
    }

    #[test]
    fn test_create_duplicate() {
        let source = MemoryTemplateSource::new();
        source.create(Template::new("dup", "a")).unwrap();
        assert!(matches!(
            source.create(Template::new("dup", "b")),
            Err(TemplateSourceError::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_update_and_delete() {
        let source = MemoryTemplateSource::new();
        source.create(Template::new("upd", "old")).unwrap();

        let updated = source
            .update(
                "upd",
                None,
                UpdateTemplateRequest {
                    body_template: Some("new".to_string()),
                    deactivated: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.body_template, "new");
        assert!(updated.deactivated);

        source.delete("upd", None).unwrap();
        assert_eq!(source.count(), 0);
        assert!(matches!(
            source.delete("upd", None),
            Err(TemplateSourceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_prefers_tenant_then_global() {
        let source = MemoryTemplateSource::with_templates([
            Template::new("footer", "global footer"),
            Template::new("footer", "acme footer").with_enterprise("acme"),
        ]);

        let acme = source.fetch("footer", Some("acme")).await.unwrap().unwrap();
        assert_eq!(acme.body_template, "acme footer");

        let globex = source.fetch("footer", Some("globex")).await.unwrap().unwrap();
        assert_eq!(globex.body_template, "global footer");

        let global = source.fetch("footer", None).await.unwrap().unwrap();
        assert_eq!(global.body_template, "global footer");
    }

    #[tokio::test]
    async fn test_fetch_hides_unpublished_and_deactivated() {
        let source = MemoryTemplateSource::with_templates([
            Template::new("draft", "x").with_status(PublishStatus::Draft),
            Template::new("off", "x").deactivate(),
            Template::new("private", "x").with_enterprise("acme"),
        ]);

        assert!(source.fetch("draft", None).await.unwrap().is_none());
        assert!(source.fetch("off", None).await.unwrap().is_none());
        assert!(source.fetch("private", Some("globex")).await.unwrap().is_none());
        assert!(source.fetch("missing", None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_sorted_and_filtered() {
        let source = MemoryTemplateSource::with_templates([
            Template::new("b", "x"),
            Template::new("a", "x"),
            Template::new("c", "x").deactivate(),
        ]);

        let listed = source.list(&TemplateFilter::default()).await.unwrap();
        let keys: Vec<_> = listed.iter().map(|t| t.template_key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_load_fixtures() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("templates.json");
        std::fs::write(
            &path,
            r#"[{"template_key": "greet", "name": "Greet", "body_template": "there, {{ name }}", "publish_status": "PUBLISH"}]"#,
        )
        .unwrap();

        let source = MemoryTemplateSource::new();
        assert_eq!(source.load_fixtures(&path).await.unwrap(), 1);
        assert!(source.fetch("greet", None).await.unwrap().is_some());

        assert!(matches!(
            source.load_fixtures(dir.path().join("missing.json")).await,
            Err(TemplateSourceError::Fixtures(_))
        ));
    }
}
