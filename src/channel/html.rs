//! Allow-list HTML sanitizer shared by the markup channels.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::{Captures, Regex};

/// Elements removed together with their content
const BLOCKED_ELEMENTS: &[&str] = &[
    "script", "style", "iframe", "object", "embed", "noscript", "template",
];

/// Attributes allowed on every permitted element
const GLOBAL_ATTRIBUTES: &[&str] = &["class", "id", "title", "dir", "lang"];

lazy_static! {
    static ref BLOCKED_BLOCKS: Vec<Regex> = BLOCKED_ELEMENTS
        .iter()
        .map(|tag| {
            Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>"))
                .expect("blocked element regex")
        })
        .collect();
    static ref COMMENT: Regex = Regex::new(r"(?s)<!--.*?-->").expect("comment regex");
    static ref TAG: Regex =
        Regex::new(r"(?s)<(/?)([a-zA-Z][a-zA-Z0-9]*)\b([^>]*)>").expect("tag regex");
    static ref ATTRIBUTE: Regex = Regex::new(
        r#"([a-zA-Z_:][-a-zA-Z0-9_:.]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#
    )
    .expect("attribute regex");
    static ref ANY_TAG: Regex =
        Regex::new(r"</?[a-zA-Z][^>]*>|<[!?][^>]*>").expect("any tag regex");
    static ref LINE_BREAK: Regex =
        Regex::new(r"(?i)<br\s*/?>|</(p|div|h[1-6]|li|tr)\s*>").expect("line break regex");
    static ref EXCESS_NEWLINES: Regex = Regex::new(r"\n{3,}").expect("newline regex");
    static ref INLINE_WHITESPACE: Regex = Regex::new(r"[ \t]+").expect("whitespace regex");
    static ref UNSAFE_CSS: Regex = Regex::new(
        r"(?i)expression\s*\(|javascript\s*:|vbscript\s*:|@import|behavior\s*:|-moz-binding"
    )
    .expect("css regex");
}

/// Which links are forced to open in a new browsing context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkTargetPolicy {
    /// Only absolute `http(s)` links
    ExternalOnly,
    /// Every link
    All,
}

#[derive(Debug, Clone)]
pub struct HtmlSanitizer {
    allowed: HashMap<&'static str, Vec<&'static str>>,
    allow_style: bool,
    link_targets: LinkTargetPolicy,
}

impl HtmlSanitizer {
    /// Build a sanitizer from `(tag, extra attributes)` pairs
    pub fn new(
        tags: &[(&'static str, &'static [&'static str])],
        allow_style: bool,
        link_targets: LinkTargetPolicy,
    ) -> Self {
        let allowed = tags
            .iter()
            .map(|(tag, attributes)| (*tag, attributes.to_vec()))
            .collect();

        Self {
            allowed,
            allow_style,
            link_targets,
        }
    }

    pub fn allows_tag(&self, tag: &str) -> bool {
        self.allowed.contains_key(tag.to_ascii_lowercase().as_str())
    }

    /// Remove everything not on the allow-list
    pub fn sanitize(&self, html: &str) -> String {
        let stripped = remove_blocked(html);

        TAG.replace_all(&stripped, |caps: &Captures| {
            let closing = !caps[1].is_empty();
            let tag = caps[2].to_ascii_lowercase();

            let Some(extra) = self.allowed.get(tag.as_str()) else {
                return String::new();
            };
            if closing {
                return format!("</{}>", tag);
            }

            let attributes = self.filter_attributes(&tag, extra, &caps[3]);
            if attributes.is_empty() {
                format!("<{}>", tag)
            } else {
                format!("<{} {}>", tag, attributes.join(" "))
            }
        })
        .into_owned()
    }

    fn filter_attributes(&self, tag: &str, extra: &[&str], source: &str) -> Vec<String> {
        let mut kept: Vec<(String, String)> = Vec::new();
        let mut external_link = false;

        for caps in ATTRIBUTE.captures_iter(source) {
            let name = caps[1].to_ascii_lowercase();
            let raw = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map_or("", |m| m.as_str());
            let value = html_escape::decode_html_entities(raw).into_owned();

            if name.starts_with("on") {
                continue;
            }
            let style = name == "style";
            if style && !self.allow_style {
                continue;
            }
            if !style
                && !GLOBAL_ATTRIBUTES.contains(&name.as_str())
                && !extra.contains(&name.as_str())
            {
                continue;
            }
            if tag == "a" && matches!(name.as_str(), "target" | "rel") {
                continue;
            }

            let value = match name.as_str() {
                "href" | "src" | "action" | "background" => {
                    match safe_url(&value, tag == "img" && name == "src") {
                        Some(url) => url,
                        None => continue,
                    }
                }
                "style" => match clean_css(&value) {
                    Some(css) => css,
                    None => continue,
                },
                _ => value,
            };

            if tag == "a" && name == "href" {
                external_link = is_external(&value);
            }
            kept.push((name, value));
        }

        let force_target = tag == "a"
            && kept.iter().any(|(name, _)| name == "href")
            && (external_link || self.link_targets == LinkTargetPolicy::All);
        if force_target {
            kept.push(("target".to_string(), "_blank".to_string()));
            kept.push(("rel".to_string(), "noopener noreferrer".to_string()));
        }

        kept.into_iter()
            .map(|(name, value)| {
                format!(
                    "{}=\"{}\"",
                    name,
                    html_escape::encode_double_quoted_attribute(&value)
                )
            })
            .collect()
    }
}

fn remove_blocked(html: &str) -> String {
    let mut output = COMMENT.replace_all(html, "").into_owned();
    for block in BLOCKED_BLOCKS.iter() {
        output = block.replace_all(&output, "").into_owned();
    }
    output
}

/// URL with dangerous schemes rejected. `data:` survives only as an image source.
fn safe_url(value: &str, image_source: bool) -> Option<String> {
    let normalized: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();

    if normalized.starts_with("javascript:") || normalized.starts_with("vbscript:") {
        return None;
    }
    if normalized.starts_with("data:") && !(image_source && normalized.starts_with("data:image/")) {
        return None;
    }

    Some(value.trim().to_string())
}

fn is_external(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("//")
}

/// Drop unsafe declarations; `None` if nothing is left
fn clean_css(css: &str) -> Option<String> {
    let declarations: Vec<&str> = css
        .split(';')
        .map(str::trim)
        .filter(|declaration| !declaration.is_empty() && !UNSAFE_CSS.is_match(declaration))
        .filter(|declaration| declaration.contains(':'))
        .collect();

    if declarations.is_empty() {
        None
    } else {
        Some(declarations.join("; "))
    }
}

/// Convert markup to plain text: block ends become newlines, entities are decoded
pub fn strip_tags(html: &str) -> String {
    let without_blocks = remove_blocked(html);
    let with_breaks = LINE_BREAK.replace_all(&without_blocks, "\n");
    let text = ANY_TAG.replace_all(&with_breaks, "");
    let decoded = html_escape::decode_html_entities(&text);

    let lines: Vec<String> = decoded
        .lines()
        .map(|line| INLINE_WHITESPACE.replace_all(line.trim(), " ").into_owned())
        .collect();
    EXCESS_NEWLINES
        .replace_all(&lines.join("\n"), "\n\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TAGS: &[(&str, &[&str])] = &[
        ("p", &[]),
        ("b", &[]),
        ("a", &["href"]),
        ("img", &["src", "alt", "width"]),
        ("table", &["border"]),
    ];
    const LINKS_ONLY: &[(&str, &[&str])] = &[("a", &["href"]), ("p", &[])];

    fn email_like() -> HtmlSanitizer {
        HtmlSanitizer::new(TAGS, true, LinkTargetPolicy::ExternalOnly)
    }

    #[test]
    fn test_blocked_elements_removed_with_content() {
        let clean = email_like().sanitize("<p>Hi</p><script>alert(1)</script><style>p{}</style><!-- x -->");
        assert_eq!(clean, "<p>Hi</p>");
    }

    #[test]
    fn test_unknown_tags_dropped_text_kept() {
        let clean = email_like().sanitize("<div><b>bold</b> <marquee>text</marquee></div>");
        assert_eq!(clean, "<b>bold</b> text");
    }

    #[test]
    fn test_event_handlers_and_unknown_attributes_removed() {
        let clean = email_like().sanitize(r#"<p onclick="steal()" data-x="1" class="lead">x</p>"#);
        assert_eq!(clean, r#"<p class="lead">x</p>"#);
    }

    #[test]
    fn test_script_urls_removed() {
        let sanitizer = email_like();
        assert_eq!(
            sanitizer.sanitize(r#"<a href="javascript:alert(1)">x</a>"#),
            "<a>x</a>"
        );
        assert_eq!(
            sanitizer.sanitize(r#"<a href=" JaVaScRiPt:alert(1)">x</a>"#),
            "<a>x</a>"
        );
        assert_eq!(
            sanitizer.sanitize(r#"<a href="data:text/html;base64,xx">x</a>"#),
            "<a>x</a>"
        );
        assert_eq!(
            sanitizer.sanitize(r#"<img src="data:image/png;base64,AAAA" alt="dot">"#),
            r#"<img src="data:image/png;base64,AAAA" alt="dot">"#
        );
    }

    #[test]
    fn test_external_links_open_safely() {
        let sanitizer = email_like();
        assert_eq!(
            sanitizer.sanitize(r#"<a href="https://example.com" target="_self">x</a>"#),
            r#"<a href="https://example.com" target="_blank" rel="noopener noreferrer">x</a>"#
        );
        assert_eq!(
            sanitizer.sanitize(r#"<a href="/account">x</a>"#),
            r#"<a href="/account">x</a>"#
        );

        let all = HtmlSanitizer::new(LINKS_ONLY, false, LinkTargetPolicy::All);
        assert_eq!(
            all.sanitize(r#"<a href="/account">x</a>"#),
            r#"<a href="/account" target="_blank" rel="noopener noreferrer">x</a>"#
        );
    }

    #[test]
    fn test_css_expressions_removed() {
        let clean = email_like()
            .sanitize(r#"<p style="color: red; width: expression(alert(1)); background: url(javascript:x)">x</p>"#);
        assert_eq!(clean, r#"<p style="color: red">x</p>"#);

        let no_style = HtmlSanitizer::new(LINKS_ONLY, false, LinkTargetPolicy::All);
        assert_eq!(no_style.sanitize(r#"<p style="color: red">x</p>"#), "<p>x</p>");
    }

    #[test]
    fn test_attribute_values_escaped() {
        let clean = email_like().sanitize(r#"<img alt='say "hi"' src="a.png">"#);
        assert_eq!(clean, r#"<img alt="say &quot;hi&quot;" src="a.png">"#);
    }

    #[test]
    fn test_strip_tags_keeps_comparison_signs() {
        assert_eq!(
            strip_tags("Orders < 5 items ship free, orders > 5 items ship fast"),
            "Orders < 5 items ship free, orders > 5 items ship fast"
        );
        assert_eq!(strip_tags("1 <2> 3 <!DOCTYPE html><p>x</p>"), "1 <2> 3 x");
        assert_eq!(strip_tags("<3 you"), "<3 you");
    }

    #[test]
    fn test_strip_tags() {
        let text = strip_tags("<p>Hello&nbsp;<b>World</b></p><p>a &amp; b</p>line<br/>next<script>x()</script>");
        assert_eq!(text, "Hello\u{a0}World\na & b\nline\nnext");
    }
}
