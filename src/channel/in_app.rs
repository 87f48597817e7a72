use lazy_static::lazy_static;
use regex::Regex;

use crate::template::ChannelType;

use super::html::{HtmlSanitizer, LinkTargetPolicy};
use super::policy::{ChannelPolicy, ChannelValidation, ContentFormat};

/// Maximum in-app message size in bytes
pub const MAX_IN_APP_BYTES: usize = 10 * 1024;

const IN_APP_TAGS: &[(&str, &[&str])] = &[
    ("p", &[]),
    ("br", &[]),
    ("div", &[]),
    ("span", &[]),
    ("h1", &[]),
    ("h2", &[]),
    ("h3", &[]),
    ("h4", &[]),
    ("strong", &[]),
    ("b", &[]),
    ("em", &[]),
    ("i", &[]),
    ("u", &[]),
    ("small", &[]),
    ("code", &[]),
    ("blockquote", &[]),
    ("ul", &[]),
    ("ol", &[]),
    ("li", &[]),
    ("a", &["href"]),
];

lazy_static! {
    static ref SCRIPT_TAG: Regex = Regex::new(r"(?i)<\s*script\b").expect("script regex");
    static ref UNSUPPORTED_TAG: Regex =
        Regex::new(r"(?i)<\s*(table|img|form|iframe|input|button|video|audio)\b")
            .expect("unsupported tag regex");
    static ref EXTERNAL_RESOURCE: Regex = Regex::new(
        r#"(?i)(?:\bsrc\s*=\s*["']?\s*|\burl\s*\(\s*["']?\s*)(?:https?:)?//"#
    )
    .expect("external resource regex");
}

/// Compact HTML policy for in-app notifications
#[derive(Debug, Clone)]
pub struct InAppPolicy {
    sanitizer: HtmlSanitizer,
}

impl InAppPolicy {
    pub fn new() -> Self {
        Self {
            sanitizer: HtmlSanitizer::new(IN_APP_TAGS, false, LinkTargetPolicy::All),
        }
    }
}

impl Default for InAppPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelPolicy for InAppPolicy {
    fn channel(&self) -> ChannelType {
        ChannelType::InApp
    }

    fn format(&self) -> ContentFormat {
        ContentFormat::Html
    }

    fn sanitize(&self, content: &str) -> String {
        self.sanitizer.sanitize(content)
    }

    fn validate(&self, content: &str) -> ChannelValidation {
        let mut validation = ChannelValidation::new(content.len());

        if content.len() > MAX_IN_APP_BYTES {
            validation.error(format!(
                "In-app content is {} bytes, exceeding the limit of {} bytes",
                content.len(),
                MAX_IN_APP_BYTES
            ));
        }

        for error in self.reject_source(content) {
            validation.error(error);
        }

        for caps in UNSUPPORTED_TAG.captures_iter(content) {
            let tag = caps[1].to_ascii_lowercase();
            let message = format!("<{}> is not supported in in-app messages", tag);
            if !validation.warnings.contains(&message) {
                validation.warn(message);
            }
        }

        let external = EXTERNAL_RESOURCE.find_iter(content).count();
        if external > 0 {
            validation.warn(format!("{} external resource reference(s)", external));
        }

        validation
    }

    fn reject_source(&self, content: &str) -> Vec<String> {
        if SCRIPT_TAG.is_match(content) {
            vec!["Script tags are not allowed in in-app content".to_string()]
        } else {
            Vec::new()
        }
    }
}
