use lazy_static::lazy_static;
use regex::Regex;

use crate::template::ChannelType;

use super::html::{HtmlSanitizer, LinkTargetPolicy};
use super::policy::{ChannelPolicy, ChannelValidation, ContentFormat};

/// Maximum email body size in bytes
pub const MAX_EMAIL_BYTES: usize = 100 * 1024;

const TABLE_CELL: &[&str] = &["colspan", "rowspan", "align", "valign", "width", "height", "bgcolor"];

const EMAIL_TAGS: &[(&str, &[&str])] = &[
    ("p", &["align"]),
    ("br", &[]),
    ("hr", &[]),
    ("div", &["align"]),
    ("span", &[]),
    ("h1", &["align"]),
    ("h2", &["align"]),
    ("h3", &["align"]),
    ("h4", &["align"]),
    ("h5", &["align"]),
    ("h6", &["align"]),
    ("strong", &[]),
    ("b", &[]),
    ("em", &[]),
    ("i", &[]),
    ("u", &[]),
    ("s", &[]),
    ("small", &[]),
    ("sub", &[]),
    ("sup", &[]),
    ("center", &[]),
    ("font", &["color", "face", "size"]),
    ("blockquote", &["cite"]),
    ("pre", &[]),
    ("code", &[]),
    ("ul", &[]),
    ("ol", &["start", "type"]),
    ("li", &[]),
    (
        "table",
        &["border", "cellpadding", "cellspacing", "width", "align", "bgcolor", "role"],
    ),
    ("thead", &[]),
    ("tbody", &[]),
    ("tfoot", &[]),
    ("tr", &["align", "valign", "bgcolor"]),
    ("th", TABLE_CELL),
    ("td", TABLE_CELL),
    ("a", &["href", "name"]),
    ("img", &["src", "alt", "width", "height", "align", "border"]),
];

lazy_static! {
    static ref SCRIPT_TAG: Regex = Regex::new(r"(?i)<\s*script\b").expect("script regex");
    static ref IMG_TAG: Regex = Regex::new(r"(?i)<img\b[^>]*>").expect("img regex");
    static ref ALT_ATTRIBUTE: Regex = Regex::new(r"(?i)\salt\s*=").expect("alt regex");
}

/// Rich HTML policy for email bodies
#[derive(Debug, Clone)]
pub struct EmailPolicy {
    sanitizer: HtmlSanitizer,
}

impl EmailPolicy {
    pub fn new() -> Self {
        Self {
            sanitizer: HtmlSanitizer::new(EMAIL_TAGS, true, LinkTargetPolicy::ExternalOnly),
        }
    }
}

impl Default for EmailPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelPolicy for EmailPolicy {
    fn channel(&self) -> ChannelType {
        ChannelType::Email
    }

    fn format(&self) -> ContentFormat {
        ContentFormat::Html
    }

    fn sanitize(&self, content: &str) -> String {
        self.sanitizer.sanitize(content)
    }

    fn validate(&self, content: &str) -> ChannelValidation {
        let mut validation = ChannelValidation::new(content.len());

        if content.len() > MAX_EMAIL_BYTES {
            validation.error(format!(
                "Email content is {} bytes, exceeding the limit of {} bytes",
                content.len(),
                MAX_EMAIL_BYTES
            ));
        }

        for error in self.reject_source(content) {
            validation.error(error);
        }

        let missing_alt = IMG_TAG
            .find_iter(content)
            .filter(|img| !ALT_ATTRIBUTE.is_match(img.as_str()))
            .count();
        if missing_alt > 0 {
            validation.warn(format!("{} image(s) without alt text", missing_alt));
        }

        validation
    }

    fn reject_source(&self, content: &str) -> Vec<String> {
        if SCRIPT_TAG.is_match(content) {
            vec!["Script tags are not allowed in email content".to_string()]
        } else {
            Vec::new()
        }
    }
}
