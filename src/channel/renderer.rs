use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::config::RenderConfig;
use crate::error::{RenderErrorEntry, Result};
use crate::render::{RenderContext, RenderMetadata, RenderOptions, RenderResult, TemplateRenderer};
use crate::template::{ChannelType, TemplateStore};

use super::html::strip_tags;
use super::policy::{
    policy_for, sanitize_variables, ChannelPolicy, ChannelValidation, ContentFormat,
};
use super::safety::{scan_all, SafetyReport};

#[derive(Debug, Clone, Serialize)]
pub struct ChannelRenderResult {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub channel_type: ChannelType,
    pub format: ContentFormat,
    pub errors: Vec<RenderErrorEntry>,
    pub metadata: RenderMetadata,
    pub safety_validation: SafetyReport,
    pub validation: ChannelValidation,
}

/// Renders templates for one delivery channel.
///
/// Variables are sanitized before rendering. The safety scan covers the raw output
/// and the caller's unsanitized variables, and markup the channel refuses is checked
/// on the raw output. The channel sanitizer and validator then run on the final content.
pub struct ChannelRenderer {
    renderer: TemplateRenderer,
    policy: Box<dyn ChannelPolicy>,
    options: RenderOptions,
}

impl ChannelRenderer {
    /// The channel's own error marker is used unless one was configured
    pub fn new(store: Arc<dyn TemplateStore>, config: &RenderConfig, channel: ChannelType) -> Self {
        let policy = policy_for(channel);
        let mut options = RenderOptions::from(config);
        if config.error_placeholder == RenderConfig::default().error_placeholder {
            options.error_placeholder = policy.error_placeholder().to_string();
        }

        Self {
            renderer: TemplateRenderer::new(store, config).for_channel(channel),
            policy,
            options,
        }
    }

    pub fn channel(&self) -> ChannelType {
        self.policy.channel()
    }

    pub fn renderer(&self) -> &TemplateRenderer {
        &self.renderer
    }

    pub async fn render(
        &self,
        template: &str,
        context: &RenderContext,
        options: Option<&RenderOptions>,
    ) -> Result<ChannelRenderResult> {
        let sanitized = self.sanitized_context(context);
        let result = self
            .renderer
            .render(template, &sanitized, Some(options.unwrap_or(&self.options)))
            .await?;
        Ok(self.finish(result, &context.variables))
    }

    pub async fn render_by_key(
        &self,
        template_key: &str,
        context: &RenderContext,
        options: Option<&RenderOptions>,
    ) -> Result<ChannelRenderResult> {
        let sanitized = self.sanitized_context(context);
        let result = self
            .renderer
            .render_by_key(template_key, &sanitized, Some(options.unwrap_or(&self.options)))
            .await?;
        Ok(self.finish(result, &context.variables))
    }

    fn sanitized_context(&self, context: &RenderContext) -> RenderContext {
        RenderContext {
            enterprise_id: context.enterprise_id.clone(),
            variables: sanitize_variables(&context.variables, self.policy.as_ref()),
        }
    }

    fn finish(&self, result: RenderResult, raw_variables: &Value) -> ChannelRenderResult {
        let mut scanned = vec![result.content.as_str()];
        if let Some(subject) = result.metadata.subject.as_deref() {
            scanned.push(subject);
        }
        collect_strings(raw_variables, &mut scanned);

        let safety = scan_all(scanned);
        if !safety.safe {
            tracing::warn!(
                channel = self.channel().as_str(),
                issues = safety.warnings.len(),
                "Rendered content failed safety scan"
            );
        }

        let content = self.policy.sanitize(&result.content);
        let mut validation = self.policy.validate(&content);
        for error in self.policy.reject_source(&result.content) {
            if !validation.errors.contains(&error) {
                validation.error(error);
            }
        }
        if !validation.valid {
            tracing::debug!(
                channel = self.channel().as_str(),
                errors = ?validation.errors,
                "Rendered content failed channel validation"
            );
        }

        let mut metadata = result.metadata;
        let subject = metadata.subject.as_deref().map(strip_tags);
        metadata.subject = subject.clone();
        metadata.safety_validation = Some(safety.clone());

        ChannelRenderResult {
            content,
            subject,
            channel_type: self.channel(),
            format: self.policy.format(),
            errors: result.errors,
            metadata,
            safety_validation: safety,
            validation,
        }
    }
}

fn collect_strings<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
    match value {
        Value::String(s) => out.push(s),
        Value::Array(items) => items.iter().for_each(|item| collect_strings(item, out)),
        Value::Object(map) => map.values().for_each(|item| collect_strings(item, out)),
        _ => {}
    }
}
