use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::sync::broadcast;

use xnovu_render::channel::ChannelRenderer;
use xnovu_render::config::Settings;
use xnovu_render::metrics::encode_metrics;
use xnovu_render::render::RenderContext;
use xnovu_render::tasks::CacheSweepTask;
use xnovu_render::telemetry::init_tracing;
use xnovu_render::template::{create_template_source, CachingTemplateLoader, ChannelType, TemplateStore};

/// Render a notification template for a delivery channel
#[derive(Debug, Parser)]
#[command(name = "xnovu-render", version, about)]
struct Cli {
    /// Key of a stored template to render
    #[arg(long, conflicts_with = "template")]
    key: Option<String>,

    /// Inline template text to render
    #[arg(long)]
    template: Option<String>,

    /// Variables as a JSON object
    #[arg(long, default_value = "{}")]
    vars: String,

    /// Tenant (enterprise) id
    #[arg(long, env = "XNOVU_TENANT")]
    tenant: Option<String>,

    /// EMAIL, SMS, PUSH, IN_APP or CHAT; anything else renders as IN_APP
    #[arg(long, default_value = "IN_APP")]
    channel: String,

    /// JSON file of templates for the in-memory store
    #[arg(long)]
    fixtures: Option<String>,

    /// Print Prometheus metrics after rendering
    #[arg(long)]
    metrics: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::new().context("Failed to load configuration")?;
    if cli.fixtures.is_some() {
        settings.store.fixtures_path = cli.fixtures.clone();
    }

    init_tracing(&settings.log)?;

    let variables: serde_json::Value =
        serde_json::from_str(&cli.vars).context("--vars must be a JSON object")?;
    if !variables.is_object() {
        bail!("--vars must be a JSON object");
    }

    let source = create_template_source(&settings.store).await;
    let loader: Arc<dyn TemplateStore> =
        Arc::new(CachingTemplateLoader::new(source, &settings.cache));

    let (shutdown_tx, _) = broadcast::channel(1);
    let sweep_handle = if settings.cache.enabled {
        let sweep = CacheSweepTask::new(&settings.cache, loader.clone(), shutdown_tx.subscribe());
        Some(tokio::spawn(sweep.run()))
    } else {
        None
    };

    let channel = ChannelType::parse_or_default(&cli.channel);
    let renderer = ChannelRenderer::new(loader, &settings.render, channel);

    let mut context = RenderContext::new(variables);
    context.enterprise_id = cli.tenant.clone();

    let result = match (&cli.key, &cli.template) {
        (Some(key), _) => renderer.render_by_key(key, &context, None).await?,
        (None, Some(template)) => renderer.render(template, &context, None).await?,
        (None, None) => bail!("Either --key or --template is required"),
    };

    println!("{}", serde_json::to_string_pretty(&result)?);

    if cli.metrics {
        println!("{}", encode_metrics()?);
    }

    let _ = shutdown_tx.send(());
    if let Some(handle) = sweep_handle {
        handle.await?;
    }

    Ok(())
}
