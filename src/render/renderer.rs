use std::sync::Arc;
use std::time::Instant;

use crate::config::RenderConfig;
use crate::error::Result;
use crate::metrics::RenderMetrics;
use crate::template::{
    ChannelType, LoaderStats, Template, TemplateFilter, TemplateStore, TemplateStoreError,
};

use super::engine::{RenderContext, RenderEngine, RenderOptions, RenderResult, ValidationReport};

/// Public rendering surface.
///
/// Owns the engine and the configured defaults; cache lifecycle goes through here
/// so the host controls when the template cache is cleared or swept.
#[derive(Clone)]
pub struct TemplateRenderer {
    engine: RenderEngine,
    options: RenderOptions,
    channel: Option<ChannelType>,
}

impl TemplateRenderer {
    pub fn new(store: Arc<dyn TemplateStore>, config: &RenderConfig) -> Self {
        Self {
            engine: RenderEngine::new(store),
            options: RenderOptions::from(config),
            channel: None,
        }
    }

    /// Label renders with a channel in metrics
    pub(crate) fn for_channel(mut self, channel: ChannelType) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn engine(&self) -> &RenderEngine {
        &self.engine
    }

    pub async fn render(
        &self,
        template: &str,
        context: &RenderContext,
        options: Option<&RenderOptions>,
    ) -> Result<RenderResult> {
        let started = Instant::now();
        let result = self
            .engine
            .render(template, context, options.unwrap_or(&self.options))
            .await;
        self.record(&result, started);
        result
    }

    pub async fn render_by_key(
        &self,
        template_key: &str,
        context: &RenderContext,
        options: Option<&RenderOptions>,
    ) -> Result<RenderResult> {
        let started = Instant::now();
        let result = self
            .engine
            .render_by_key(template_key, context, options.unwrap_or(&self.options))
            .await;
        self.record(&result, started);
        result
    }

    pub async fn validate(
        &self,
        template: &str,
        context: Option<&RenderContext>,
    ) -> ValidationReport {
        self.engine.validate(template, context).await
    }

    pub async fn extract_variables(
        &self,
        template: &str,
        context: Option<&RenderContext>,
    ) -> Vec<String> {
        self.engine.extract_variables(template, context).await
    }

    pub async fn list_templates(
        &self,
        filter: &TemplateFilter,
    ) -> std::result::Result<Vec<Template>, TemplateStoreError> {
        self.engine.store().list_templates(filter).await
    }

    pub fn clear_cache(&self) {
        self.engine.store().clear_cache();
    }

    pub fn clear_expired_cache(&self) -> usize {
        self.engine.store().clear_expired_cache()
    }

    pub fn cache_stats(&self) -> LoaderStats {
        self.engine.store().stats()
    }

    fn record(&self, result: &Result<RenderResult>, started: Instant) {
        let channel = self.channel.map_or("none", |channel| channel.as_str());
        RenderMetrics::record_render(channel, started.elapsed());

        match result {
            Ok(result) => tracing::debug!(
                channel = channel,
                duration_ms = result.metadata.duration_ms,
                templates_loaded = result.metadata.templates_loaded.len(),
                errors = result.errors.len(),
                "Render completed"
            ),
            Err(e) => tracing::warn!(channel = channel, error = %e, "Render failed"),
        }
    }
}
