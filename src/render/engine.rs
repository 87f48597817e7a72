//! Recursive expansion of `xnovu_render` directives.
//!
//! Each call is an independent traversal. The chain of templates being expanded is
//! threaded through the recursion as an explicit path, and per-call bookkeeping is
//! collected in a [`RenderTrace`] kept apart from the user variables.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Instant;

use futures::future::{BoxFuture, FutureExt};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::channel::SafetyReport;
use crate::config::RenderConfig;
use crate::error::{RenderError, RenderErrorEntry, Result};
use crate::metrics::RenderMetrics;
use crate::template::{LoadedTemplate, TemplateStore};

use super::interpolate::{interpolate, parse_path, PathSegment};
use super::parser::{extract_placeholders, parse_directives, validate_syntax, DirectiveMatch};

/// Tenant and variables a render runs against
#[derive(Debug, Clone, Default, Serialize)]
pub struct RenderContext {
    pub enterprise_id: Option<String>,
    pub variables: Value,
}

impl RenderContext {
    pub fn new(variables: Value) -> Self {
        Self {
            enterprise_id: None,
            variables,
        }
    }

    pub fn with_enterprise(mut self, enterprise_id: impl Into<String>) -> Self {
        self.enterprise_id = Some(enterprise_id.into());
        self
    }

    fn enterprise(&self) -> Option<&str> {
        self.enterprise_id.as_deref()
    }

    /// Caller variables as a map; anything but an object counts as empty
    fn caller_variables(&self) -> Map<String, Value> {
        match &self.variables {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub max_depth: usize,
    pub throw_on_error: bool,
    /// Marker substituted for failed directives; `{key}` becomes the template key
    pub error_placeholder: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::from(&RenderConfig::default())
    }
}

impl From<&RenderConfig> for RenderOptions {
    fn from(config: &RenderConfig) -> Self {
        Self {
            max_depth: config.max_depth,
            throw_on_error: config.throw_on_error,
            error_placeholder: config.error_placeholder.clone(),
        }
    }
}

impl RenderOptions {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_throw_on_error(mut self, throw_on_error: bool) -> Self {
        self.throw_on_error = throw_on_error;
        self
    }

    pub fn with_error_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.error_placeholder = placeholder.into();
        self
    }

    /// Inline marker for a failed directive
    pub fn error_marker(&self, template_key: &str) -> String {
        self.error_placeholder.replace("{key}", template_key)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RenderMetadata {
    /// Keys of every template loaded, in load order
    pub templates_loaded: Vec<String>,
    pub duration_ms: u64,
    /// Longest render path reached
    pub depth_reached: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Loads answered from the template cache
    pub cache_hits: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub safety_validation: Option<SafetyReport>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RenderResult {
    pub content: String,
    pub errors: Vec<RenderErrorEntry>,
    pub metadata: RenderMetadata,
}

impl RenderResult {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Outcome of [`RenderEngine::validate`]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

/// Bookkeeping for one render call
#[derive(Debug, Default)]
struct RenderTrace {
    templates_loaded: Vec<String>,
    errors: Vec<RenderErrorEntry>,
    depth_reached: usize,
    cache_hits: usize,
}

impl RenderTrace {
    fn record_load(&mut self, loaded: &LoadedTemplate, depth: usize) {
        self.templates_loaded
            .push(loaded.template.template_key.clone());
        if loaded.from_cache() {
            self.cache_hits += 1;
        }
        self.depth_reached = self.depth_reached.max(depth);
    }

    fn finish(self, content: String, started: Instant, subject: Option<String>) -> RenderResult {
        RenderResult {
            content,
            errors: self.errors,
            metadata: RenderMetadata {
                templates_loaded: self.templates_loaded,
                duration_ms: started.elapsed().as_millis() as u64,
                depth_reached: self.depth_reached,
                subject,
                cache_hits: self.cache_hits,
                safety_validation: None,
            },
        }
    }
}

/// Recursive directive evaluator over a [`TemplateStore`]
#[derive(Clone)]
pub struct RenderEngine {
    store: Arc<dyn TemplateStore>,
}

impl RenderEngine {
    pub fn new(store: Arc<dyn TemplateStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn TemplateStore> {
        &self.store
    }

    /// Render a template string.
    ///
    /// Directive failures are reported in the result unless `throw_on_error` is set.
    pub async fn render(
        &self,
        template: &str,
        context: &RenderContext,
        options: &RenderOptions,
    ) -> Result<RenderResult> {
        let started = Instant::now();
        let mut trace = RenderTrace::default();
        let scope = Value::Object(context.caller_variables());

        let content = self
            .expand(template, &scope, context, options, &[], &mut trace)
            .await?;

        Ok(trace.finish(content, started, None))
    }

    /// Render a stored template's body and subject with a shared scope
    pub async fn render_by_key(
        &self,
        template_key: &str,
        context: &RenderContext,
        options: &RenderOptions,
    ) -> Result<RenderResult> {
        let started = Instant::now();
        let mut trace = RenderTrace::default();

        let loaded = match self
            .store
            .load_template(template_key, context.enterprise())
            .await
        {
            Ok(loaded) => loaded,
            Err(e) => {
                self.contain(e.into(), template_key, None, 0, options, &mut trace)?;
                return Ok(trace.finish(options.error_marker(template_key), started, None));
            }
        };
        trace.record_load(&loaded, 1);

        let mut scope = loaded.template.default_variables();
        scope.extend(context.caller_variables());
        let scope = Value::Object(scope);
        let path = vec![template_key.to_string()];

        let content = self
            .expand(
                &loaded.template.body_template,
                &scope,
                context,
                options,
                &path,
                &mut trace,
            )
            .await?;

        let subject = match &loaded.template.subject_template {
            Some(subject) => Some(
                self.expand(subject, &scope, context, options, &path, &mut trace)
                    .await?,
            ),
            None => None,
        };

        Ok(trace.finish(content, started, subject))
    }

    /// Expand every directive in `text`, then interpolate the literal text around them.
    ///
    /// Spliced results are not interpolated again, so values from nested renders
    /// cannot introduce new placeholders.
    fn expand<'a>(
        &'a self,
        text: &'a str,
        scope: &'a Value,
        context: &'a RenderContext,
        options: &'a RenderOptions,
        path: &'a [String],
        trace: &'a mut RenderTrace,
    ) -> BoxFuture<'a, Result<String>> {
        async move {
            let directives = parse_directives(text);
            if directives.is_empty() {
                return Ok(interpolate(text, scope));
            }

            // Reverse document order; replacements are assembled front to back below
            let mut replacements = Vec::with_capacity(directives.len());
            for directive in directives.iter().rev() {
                let replacement = match self
                    .expand_directive(directive, scope, context, options, path, trace)
                    .await
                {
                    Ok(content) => content,
                    Err(error) => {
                        self.contain(
                            error,
                            &directive.template_key,
                            Some(directive.start),
                            path.len(),
                            options,
                            trace,
                        )?;
                        options.error_marker(&directive.template_key)
                    }
                };
                replacements.push(replacement);
            }
            replacements.reverse();

            let mut output = String::with_capacity(text.len());
            let mut cursor = 0;
            for (directive, replacement) in directives.iter().zip(replacements) {
                output.push_str(&interpolate(&text[cursor..directive.start], scope));
                output.push_str(&replacement);
                cursor = directive.end;
            }
            output.push_str(&interpolate(&text[cursor..], scope));

            Ok(output)
        }
        .boxed()
    }

    async fn expand_directive(
        &self,
        directive: &DirectiveMatch,
        scope: &Value,
        context: &RenderContext,
        options: &RenderOptions,
        path: &[String],
        trace: &mut RenderTrace,
    ) -> Result<String> {
        let key = &directive.template_key;

        if path.iter().any(|entry| entry == key) {
            return Err(RenderError::CircularDependency {
                template_key: key.clone(),
                path: path.join(" -> "),
            });
        }

        if path.len() >= options.max_depth {
            return Err(RenderError::DepthExceeded {
                template_key: key.clone(),
                max_depth: options.max_depth,
            });
        }

        let loaded = self.store.load_template(key, context.enterprise()).await?;

        let mut nested_path = path.to_vec();
        nested_path.push(key.clone());
        trace.record_load(&loaded, nested_path.len());

        // defaults < directive arguments < caller variables
        let mut merged = loaded.template.default_variables();
        merged.extend(directive.arguments.resolve(scope));
        merged.extend(context.caller_variables());
        let nested_scope = Value::Object(merged);

        self.expand(
            &loaded.template.body_template,
            &nested_scope,
            context,
            options,
            &nested_path,
            trace,
        )
        .await
    }

    /// Record a directive failure, or hand it back when the caller asked for strict mode
    fn contain(
        &self,
        error: RenderError,
        template_key: &str,
        position: Option<usize>,
        depth: usize,
        options: &RenderOptions,
        trace: &mut RenderTrace,
    ) -> Result<()> {
        let kind = error.kind();
        RenderMetrics::record_error(kind.as_str());

        if options.throw_on_error {
            return Err(error);
        }

        tracing::warn!(
            template_key = %template_key,
            kind = kind.as_str(),
            depth = depth,
            error = %error,
            "Template directive failed"
        );
        trace
            .errors
            .push(RenderErrorEntry::new(template_key, &error, position, depth));

        Ok(())
    }

    /// Check directive targets exist and the placeholder syntax is sound, without rendering
    pub async fn validate(
        &self,
        template: &str,
        context: Option<&RenderContext>,
    ) -> ValidationReport {
        let mut errors = validate_syntax(template).errors;
        let enterprise_id = context.and_then(RenderContext::enterprise);

        let mut checked = HashSet::new();
        for directive in parse_directives(template) {
            if !checked.insert(directive.template_key.clone()) {
                continue;
            }
            match self
                .store
                .template_exists(&directive.template_key, enterprise_id)
                .await
            {
                Ok(true) => {}
                Ok(false) => {
                    errors.push(format!("Template not found: {}", directive.template_key))
                }
                Err(e) => errors.push(RenderError::from(e).to_string()),
            }
        }

        ValidationReport {
            valid: errors.is_empty(),
            errors,
        }
    }

    /// Variable paths a template needs from its caller, sorted and deduplicated.
    ///
    /// With a context, referenced templates are loaded and their variables are
    /// included, minus those supplied by directive arguments or template defaults.
    pub async fn extract_variables(
        &self,
        template: &str,
        context: Option<&RenderContext>,
    ) -> Vec<String> {
        let variables = match context {
            Some(context) => {
                let mut visited = HashSet::new();
                self.collect_variables(template, context.enterprise(), &mut visited)
                    .await
            }
            None => local_variables(template),
        };

        variables.into_iter().collect()
    }

    fn collect_variables<'a>(
        &'a self,
        text: &'a str,
        enterprise_id: Option<&'a str>,
        visited: &'a mut HashSet<String>,
    ) -> BoxFuture<'a, BTreeSet<String>> {
        async move {
            let mut found = local_variables(text);

            for directive in parse_directives(text) {
                if !visited.insert(directive.template_key.clone()) {
                    continue;
                }

                let loaded = match self
                    .store
                    .load_template(&directive.template_key, enterprise_id)
                    .await
                {
                    Ok(loaded) => loaded,
                    Err(e) => {
                        tracing::debug!(
                            template_key = %directive.template_key,
                            error = %e,
                            "Skipping unresolvable template during variable extraction"
                        );
                        continue;
                    }
                };

                let mut supplied: HashSet<String> =
                    directive.arguments.keys().map(str::to_string).collect();
                supplied.extend(loaded.template.default_variables().keys().cloned());

                let nested = self
                    .collect_variables(&loaded.template.body_template, enterprise_id, visited)
                    .await;
                found.extend(
                    nested
                        .into_iter()
                        .filter(|path| root_key(path).map_or(true, |root| !supplied.contains(&root))),
                );
            }

            found
        }
        .boxed()
    }
}

/// Placeholders plus paths referenced from directive arguments
fn local_variables(text: &str) -> BTreeSet<String> {
    let mut found: BTreeSet<String> = extract_placeholders(text).into_iter().collect();
    for directive in parse_directives(text) {
        found.extend(directive.arguments.scope_paths());
    }
    found
}

fn root_key(path: &str) -> Option<String> {
    match parse_path(path)?.into_iter().next()? {
        PathSegment::Key(key) => Some(key),
        PathSegment::Index(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenderErrorKind;
    use crate::template::{
        CachingTemplateLoader, MemoryTemplateSource, Template, TemplateFilter, TemplateSource,
        TemplateStoreError,
    };
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Duration;

    fn engine_with(templates: Vec<Template>) -> RenderEngine {
        let source = Arc::new(MemoryTemplateSource::with_templates(templates));
        let loader = CachingTemplateLoader::with_ttl(source, Duration::from_secs(300));
        RenderEngine::new(Arc::new(loader))
    }

    fn ctx(variables: Value) -> RenderContext {
        RenderContext::new(variables)
    }

    #[tokio::test]
    async fn test_directive_with_literal_arguments() {
        let engine = engine_with(vec![Template::new("greet", "there, {{ name }}")]);

        let result = engine
            .render(
                "Hello {{ xnovu_render('greet', { name: 'Alice' }) }}!",
                &ctx(json!({})),
                &RenderOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(result.content, "Hello there, Alice!");
        assert!(result.errors.is_empty());
        assert_eq!(result.metadata.templates_loaded, vec!["greet"]);
        assert_eq!(result.metadata.depth_reached, 1);
    }

    #[tokio::test]
    async fn test_missing_template_becomes_marker() {
        let engine = engine_with(vec![]);

        let result = engine
            .render(
                "{{ xnovu_render('missing-key', {}) }}",
                &ctx(json!({})),
                &RenderOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(result.content, "[Template Error: missing-key]");
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, RenderErrorKind::NotFound);
        assert_eq!(result.errors[0].position, Some(0));
    }

    #[tokio::test]
    async fn test_cycle_is_contained() {
        let engine = engine_with(vec![
            Template::new("a", "A[{{ xnovu_render('b') }}]"),
            Template::new("b", "B[{{ xnovu_render('a') }}]"),
        ]);

        let result = engine
            .render_by_key("a", &ctx(json!({})), &RenderOptions::default())
            .await
            .unwrap();

        assert_eq!(result.content, "A[B[[Template Error: a]]]");
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, RenderErrorKind::CircularDependency);
        assert_eq!(result.errors[0].error, "Circular dependency: a -> b -> a");
    }

    #[tokio::test]
    async fn test_self_reference_from_inline_template() {
        let engine = engine_with(vec![Template::new("loop", "x{{ xnovu_render('loop') }}")]);

        let result = engine
            .render("{{ xnovu_render('loop') }}", &ctx(json!({})), &RenderOptions::default())
            .await
            .unwrap();

        assert_eq!(result.content, "x[Template Error: loop]");
        assert_eq!(result.errors[0].kind, RenderErrorKind::CircularDependency);
    }

    #[tokio::test]
    async fn test_depth_limit() {
        let engine = engine_with(vec![
            Template::new("t1", "1{{ xnovu_render('t2') }}"),
            Template::new("t2", "2{{ xnovu_render('t3') }}"),
            Template::new("t3", "3{{ xnovu_render('t4') }}"),
            Template::new("t4", "4"),
        ]);
        let options = RenderOptions::default().with_max_depth(2);

        let result = engine
            .render("{{ xnovu_render('t1') }}", &ctx(json!({})), &options)
            .await
            .unwrap();

        assert_eq!(result.content, "12[Template Error: t3]");
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, RenderErrorKind::DepthExceeded);
        assert_eq!(result.errors[0].depth, 2);
        assert_eq!(result.metadata.depth_reached, 2);
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_siblings() {
        let engine = engine_with(vec![Template::new("ok", "fine")]);

        let result = engine
            .render(
                "{{ xnovu_render('ok') }} / {{ xnovu_render('nope') }}",
                &ctx(json!({})),
                &RenderOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(result.content, "fine / [Template Error: nope]");
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].template_key, "nope");
    }

    #[tokio::test]
    async fn test_scope_precedence() {
        let engine = engine_with(vec![Template::new("card", "{{ a }}-{{ b }}-{{ c }}")
            .with_defaults(json!({"a": "default", "b": "default", "c": "default"}))]);

        let result = engine
            .render(
                "{{ xnovu_render('card', { b: 'arg', c: 'arg' }) }}",
                &ctx(json!({"c": "caller"})),
                &RenderOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(result.content, "default-arg-caller");
    }

    #[tokio::test]
    async fn test_path_arguments_and_nested_directives() {
        let engine = engine_with(vec![
            Template::new("outer", "<{{ xnovu_render('inner', { who: person.name }) }}>"),
            Template::new("inner", "hi {{ who }}"),
        ]);

        let result = engine
            .render(
                "{{ xnovu_render('outer') }}",
                &ctx(json!({"person": {"name": "Ann"}})),
                &RenderOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(result.content, "<hi Ann>");
        assert_eq!(result.metadata.templates_loaded, vec!["outer", "inner"]);
    }

    #[tokio::test]
    async fn test_injected_placeholders_not_reinterpolated() {
        let engine = engine_with(vec![Template::new("echo", "{{ text }}")]);

        let result = engine
            .render(
                "{{ xnovu_render('echo', { text: '{{ secret }}' }) }} {{ name }}",
                &ctx(json!({"name": "Ann", "secret": "s3cr3t"})),
                &RenderOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(result.content, "{{ secret }} Ann");
    }

    #[tokio::test]
    async fn test_throw_on_error() {
        let engine = engine_with(vec![]);
        let options = RenderOptions::default().with_throw_on_error(true);

        let err = engine
            .render("{{ xnovu_render('missing') }}", &ctx(json!({})), &options)
            .await
            .unwrap_err();

        assert!(matches!(err, RenderError::TemplateNotFound { .. }));
    }

    #[tokio::test]
    async fn test_custom_placeholder() {
        let engine = engine_with(vec![]);
        let options = RenderOptions::default().with_error_placeholder("<missing {key}>");

        let result = engine
            .render("{{ xnovu_render('x') }}", &ctx(json!({})), &options)
            .await
            .unwrap();

        assert_eq!(result.content, "<missing x>");
    }

    #[tokio::test]
    async fn test_render_by_key_subject_and_body() {
        let engine = engine_with(vec![
            Template::new("welcome", "Welcome {{ user }}! {{ xnovu_render('footer') }}")
                .with_subject("Hi {{ user }}")
                .with_defaults(json!({"user": "friend"})),
            Template::new("footer", "-- team"),
        ]);

        let result = engine
            .render_by_key("welcome", &ctx(json!({})), &RenderOptions::default())
            .await
            .unwrap();

        assert_eq!(result.content, "Welcome friend! -- team");
        assert_eq!(result.metadata.subject.as_deref(), Some("Hi friend"));
        assert_eq!(result.metadata.templates_loaded, vec!["welcome", "footer"]);

        let result = engine
            .render_by_key("welcome", &ctx(json!({"user": "Bob"})), &RenderOptions::default())
            .await
            .unwrap();
        assert_eq!(result.metadata.subject.as_deref(), Some("Hi Bob"));
        assert_eq!(result.metadata.cache_hits, 2);
    }

    #[tokio::test]
    async fn test_render_by_key_missing() {
        let engine = engine_with(vec![]);

        let result = engine
            .render_by_key("absent", &ctx(json!({})), &RenderOptions::default())
            .await
            .unwrap();

        assert_eq!(result.content, "[Template Error: absent]");
        assert_eq!(result.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_tenant_scoping() {
        let engine = engine_with(vec![
            Template::new("sig", "global"),
            Template::new("sig", "acme").with_enterprise("acme"),
            Template::new("private", "secret").with_enterprise("acme"),
        ]);

        let acme = ctx(json!({})).with_enterprise("acme");
        let other = ctx(json!({})).with_enterprise("other");
        let template = "{{ xnovu_render('sig') }}|{{ xnovu_render('private') }}";

        let result = engine.render(template, &acme, &RenderOptions::default()).await.unwrap();
        assert_eq!(result.content, "acme|secret");

        let result = engine.render(template, &other, &RenderOptions::default()).await.unwrap();
        assert_eq!(result.content, "global|[Template Error: private]");
    }

    struct BrokenSource;

    #[async_trait]
    impl TemplateSource for BrokenSource {
        fn backend_name(&self) -> &'static str {
            "broken"
        }

        async fn fetch(
            &self,
            template_key: &str,
            _enterprise_id: Option<&str>,
        ) -> std::result::Result<Option<Template>, TemplateStoreError> {
            Err(TemplateStoreError::load(template_key, "connection refused"))
        }

        async fn list(
            &self,
            _filter: &TemplateFilter,
        ) -> std::result::Result<Vec<Template>, TemplateStoreError> {
            Err(TemplateStoreError::load("*", "connection refused"))
        }
    }

    #[tokio::test]
    async fn test_store_failure_is_distinct_kind() {
        let loader = CachingTemplateLoader::with_ttl(Arc::new(BrokenSource), Duration::from_secs(1));
        let engine = RenderEngine::new(Arc::new(loader));

        let result = engine
            .render("a {{ xnovu_render('x') }} b", &ctx(json!({})), &RenderOptions::default())
            .await
            .unwrap();

        assert_eq!(result.content, "a [Template Error: x] b");
        assert_eq!(result.errors[0].kind, RenderErrorKind::StoreFailure);

        let report = engine.validate("{{ xnovu_render('x') }}", None).await;
        assert!(!report.valid);
        assert!(report.errors[0].contains("connection refused"));
    }

    #[tokio::test]
    async fn test_validate() {
        let engine = engine_with(vec![Template::new("ok", "fine")]);

        let report = engine
            .validate("{{ name }} {{ xnovu_render('ok') }}", None)
            .await;
        assert!(report.valid);

        let report = engine
            .validate("{{ }} {{ xnovu_render('gone') }} {{ xnovu_render('ok', { a: }) }}", None)
            .await;
        assert!(!report.valid);
        assert!(report.errors.iter().any(|e| e.contains("Empty placeholder")));
        assert!(report.errors.iter().any(|e| e == "Template not found: gone"));
        assert!(report.errors.iter().any(|e| e.contains("Invalid variables for 'ok'")));
    }

    #[tokio::test]
    async fn test_extract_variables() {
        let engine = engine_with(vec![
            Template::new("card", "{{ title }} {{ body.text }} {{ xnovu_render('card') }}")
                .with_defaults(json!({"title": "Untitled"})),
        ]);
        let template = "{{ user.name }} {{ xnovu_render('card', { body: post.body }) }} {{ user.name }}";

        let local = engine.extract_variables(template, None).await;
        assert_eq!(local, vec!["post.body", "user.name"]);

        let deep = engine.extract_variables(template, Some(&ctx(json!({})))).await;
        assert_eq!(deep, vec!["post.body", "user.name"]);

        let engine = engine_with(vec![Template::new("card", "{{ extra }}")]);
        let deep = engine
            .extract_variables("{{ xnovu_render('card') }}", Some(&ctx(json!({}))))
            .await;
        assert_eq!(deep, vec!["extra"]);
    }
}
