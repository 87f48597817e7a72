//! Template types and error definitions

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Maximum length of a template key
const MAX_KEY_LEN: usize = 128;

/// Maximum length of a template name
const MAX_NAME_LEN: usize = 256;

/// Errors surfaced by the template store boundary.
///
/// The two kinds are deliberately distinct: `NotFound` means the content does not
/// exist for this tenant (absent, unpublished, deactivated, or another tenant's),
/// `Load` means the backing store itself failed.
#[derive(Debug, Clone, Error)]
pub enum TemplateStoreError {
    #[error("Template not found: {template_key}")]
    NotFound {
        template_key: String,
        enterprise_id: Option<String>,
    },

    #[error("Failed to load template {template_key}: {message}")]
    Load {
        template_key: String,
        message: String,
    },
}

impl TemplateStoreError {
    pub fn not_found(template_key: impl Into<String>, enterprise_id: Option<&str>) -> Self {
        Self::NotFound {
            template_key: template_key.into(),
            enterprise_id: enterprise_id.map(str::to_string),
        }
    }

    pub fn load(template_key: impl Into<String>, source: impl fmt::Display) -> Self {
        Self::Load {
            template_key: template_key.into(),
            message: source.to_string(),
        }
    }

    /// Key of the template the failure relates to
    pub fn template_key(&self) -> &str {
        match self {
            Self::NotFound { template_key, .. } | Self::Load { template_key, .. } => template_key,
        }
    }
}

/// Errors from template authoring operations on a writable source
#[derive(Debug, Error)]
pub enum TemplateSourceError {
    #[error("Template not found: {0}")]
    NotFound(String),

    #[error("Template already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid template key: {0}")]
    InvalidKey(String),

    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    #[error("Failed to read fixtures: {0}")]
    Fixtures(String),
}

/// Result type for template authoring operations
pub type TemplateSourceResult<T> = Result<T, TemplateSourceError>;

/// Delivery channel a template is authored for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChannelType {
    Email,
    Sms,
    Push,
    /// Default for unknown or unspecified channels: the in-app policy is the
    /// most conservative markup policy that still permits formatting.
    #[default]
    InApp,
    Chat,
}

impl ChannelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelType::Email => "EMAIL",
            ChannelType::Sms => "SMS",
            ChannelType::Push => "PUSH",
            ChannelType::InApp => "IN_APP",
            ChannelType::Chat => "CHAT",
        }
    }

    /// Parse a channel name, falling back to `IN_APP` for anything unrecognised.
    pub fn parse_or_default(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "EMAIL" => ChannelType::Email,
            "SMS" => ChannelType::Sms,
            "PUSH" => ChannelType::Push,
            "IN_APP" | "INAPP" => ChannelType::InApp,
            "CHAT" => ChannelType::Chat,
            other => {
                tracing::debug!(channel = %other, "Unknown channel type, using IN_APP");
                ChannelType::default()
            }
        }
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Publication state; only `Published` templates are resolvable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PublishStatus {
    #[default]
    #[serde(rename = "DRAFT")]
    Draft,
    #[serde(rename = "PUBLISH")]
    Published,
    #[serde(rename = "ARCHIVED")]
    Archived,
}

impl PublishStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublishStatus::Draft => "DRAFT",
            PublishStatus::Published => "PUBLISH",
            PublishStatus::Archived => "ARCHIVED",
        }
    }
}

/// A named, tenant-scoped notification template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    /// Opaque identifier
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,

    /// Lookup key, unique within tenant and publish scope
    pub template_key: String,

    /// Human-readable template name
    pub name: String,

    /// Raw body containing directives and placeholders
    pub body_template: String,

    /// Optional subject line, same syntax as the body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_template: Option<String>,

    /// Default variables applied when this template is included
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables_description: Option<serde_json::Value>,

    #[serde(default)]
    pub channel_type: ChannelType,

    /// Owning tenant; `None` for global templates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enterprise_id: Option<String>,

    #[serde(default)]
    pub publish_status: PublishStatus,

    #[serde(default)]
    pub deactivated: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Template {
    /// Create a published, active, global template
    pub fn new(template_key: impl Into<String>, body_template: impl Into<String>) -> Self {
        let template_key = template_key.into();
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: template_key.clone(),
            template_key,
            body_template: body_template.into(),
            subject_template: None,
            variables_description: None,
            channel_type: ChannelType::default(),
            enterprise_id: None,
            publish_status: PublishStatus::Published,
            deactivated: false,
            description: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject_template = Some(subject.into());
        self
    }

    pub fn with_enterprise(mut self, enterprise_id: impl Into<String>) -> Self {
        self.enterprise_id = Some(enterprise_id.into());
        self
    }

    pub fn with_defaults(mut self, defaults: serde_json::Value) -> Self {
        self.variables_description = Some(defaults);
        self
    }

    pub fn with_channel(mut self, channel_type: ChannelType) -> Self {
        self.channel_type = channel_type;
        self
    }

    pub fn with_status(mut self, status: PublishStatus) -> Self {
        self.publish_status = status;
        self
    }

    pub fn deactivate(mut self) -> Self {
        self.deactivated = true;
        self
    }

    /// Published and not deactivated
    pub fn is_resolvable(&self) -> bool {
        self.publish_status == PublishStatus::Published && !self.deactivated
    }

    /// Default variables as a map; non-object descriptions contribute nothing.
    pub fn default_variables(&self) -> serde_json::Map<String, serde_json::Value> {
        match &self.variables_description {
            Some(serde_json::Value::Object(map)) => map.clone(),
            _ => serde_json::Map::new(),
        }
    }

    /// Validate the template
    pub fn validate(&self) -> TemplateSourceResult<()> {
        validate_key(&self.template_key)?;

        if self.name.is_empty() || self.name.len() > MAX_NAME_LEN {
            return Err(TemplateSourceError::InvalidTemplate(format!(
                "Name must be 1-{} characters",
                MAX_NAME_LEN
            )));
        }

        if let Some(defaults) = &self.variables_description {
            if !defaults.is_object() && !defaults.is_null() {
                return Err(TemplateSourceError::InvalidTemplate(
                    "variables_description must be an object".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Check that a template key is well formed
pub fn validate_key(key: &str) -> TemplateSourceResult<()> {
    if key.is_empty() || key.len() > MAX_KEY_LEN {
        return Err(TemplateSourceError::InvalidKey(format!(
            "Key must be 1-{} characters",
            MAX_KEY_LEN
        )));
    }

    if !key
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | '/'))
    {
        return Err(TemplateSourceError::InvalidKey(
            "Key must contain only alphanumeric, dash, underscore, dot or slash".to_string(),
        ));
    }

    Ok(())
}

/// Request to update an existing template
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTemplateRequest {
    pub name: Option<String>,
    pub body_template: Option<String>,
    /// Use `Some(None)` to clear
    pub subject_template: Option<Option<String>>,
    pub variables_description: Option<Option<serde_json::Value>>,
    pub channel_type: Option<ChannelType>,
    pub publish_status: Option<PublishStatus>,
    pub deactivated: Option<bool>,
    pub description: Option<Option<String>>,
}

/// Criteria for listing templates
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplateFilter {
    /// Tenant whose templates (plus global ones) are listed
    pub enterprise_id: Option<String>,
    pub channel_type: Option<ChannelType>,
    pub key_prefix: Option<String>,
}

impl TemplateFilter {
    pub fn matches(&self, template: &Template) -> bool {
        if !template.is_resolvable() {
            return false;
        }

        let tenant_ok = match (&template.enterprise_id, &self.enterprise_id) {
            (None, _) => true,
            (Some(owner), Some(wanted)) => owner == wanted,
            (Some(_), None) => false,
        };

        tenant_ok
            && self
                .channel_type
                .map_or(true, |channel| channel == template.channel_type)
            && self
                .key_prefix
                .as_deref()
                .map_or(true, |prefix| template.template_key.starts_with(prefix))
    }
}

/// Where a loaded template came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadSource {
    Cache,
    Store { backend: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadMetadata {
    pub loaded_at: DateTime<Utc>,
    pub source: LoadSource,
}

/// A template returned from the store together with load metadata
#[derive(Debug, Clone, Serialize)]
pub struct LoadedTemplate {
    pub template: Template,
    pub metadata: LoadMetadata,
}

impl LoadedTemplate {
    pub fn from_cache(&self) -> bool {
        self.metadata.source == LoadSource::Cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_template_validation_valid() {
        let template = Template::new("order-shipped", "Hello");
        assert!(template.validate().is_ok());
    }

    #[test]
    fn test_template_validation_empty_key() {
        let template = Template::new("", "Hello");
        assert!(matches!(
            template.validate(),
            Err(TemplateSourceError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_template_validation_invalid_key_chars() {
        let template = Template::new("invalid key!", "Hello");
        assert!(matches!(
            template.validate(),
            Err(TemplateSourceError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_template_validation_defaults_must_be_object() {
        let template = Template::new("k", "body").with_defaults(json!(["a"]));
        assert!(matches!(
            template.validate(),
            Err(TemplateSourceError::InvalidTemplate(_))
        ));
    }

    #[test]
    fn test_resolvable_requires_published_and_active() {
        assert!(Template::new("a", "").is_resolvable());
        assert!(!Template::new("a", "")
            .with_status(PublishStatus::Draft)
            .is_resolvable());
        assert!(!Template::new("a", "").deactivate().is_resolvable());
    }

    #[test]
    fn test_channel_type_unknown_defaults_to_in_app() {
        assert_eq!(ChannelType::parse_or_default("email"), ChannelType::Email);
        assert_eq!(ChannelType::parse_or_default("in-app"), ChannelType::InApp);
        assert_eq!(ChannelType::parse_or_default("carrier-pigeon"), ChannelType::InApp);
    }

    #[test]
    fn test_channel_type_serialization() {
        let json = serde_json::to_string(&ChannelType::InApp).unwrap();
        assert_eq!(json, "\"IN_APP\"");
    }

    #[test]
    fn test_template_deserialize_with_defaults() {
        let template: Template = serde_json::from_value(json!({
            "template_key": "welcome",
            "name": "Welcome",
            "body_template": "Hi {{ name }}",
            "publish_status": "PUBLISH",
            "channel_type": "EMAIL"
        }))
        .unwrap();

        assert!(template.is_resolvable());
        assert_eq!(template.channel_type, ChannelType::Email);
        assert!(template.enterprise_id.is_none());
    }

    #[test]
    fn test_filter_tenant_scoping() {
        let global = Template::new("g", "");
        let acme = Template::new("a", "").with_enterprise("acme");

        let filter = TemplateFilter {
            enterprise_id: Some("acme".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&global));
        assert!(filter.matches(&acme));

        let other = TemplateFilter {
            enterprise_id: Some("globex".to_string()),
            ..Default::default()
        };
        assert!(!other.matches(&acme));
        assert!(!TemplateFilter::default().matches(&acme));
    }
}
