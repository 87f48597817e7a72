use serde::Serialize;
use serde_json::Value;

use crate::template::ChannelType;

use super::email::EmailPolicy;
use super::in_app::InAppPolicy;
use super::sms::{SmsEncoding, TextPolicy};

/// Output format of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentFormat {
    Html,
    Text,
}

/// Result of checking sanitized content against a channel's rules
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChannelValidation {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Bytes for markup channels, characters for text channels
    pub size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segments: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<SmsEncoding>,
}

impl ChannelValidation {
    pub(crate) fn new(size: usize) -> Self {
        Self {
            valid: true,
            size,
            ..Self::default()
        }
    }

    pub(crate) fn error(&mut self, message: impl Into<String>) {
        self.valid = false;
        self.errors.push(message.into());
    }

    pub(crate) fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

/// Sanitization and validation rules for one delivery channel
pub trait ChannelPolicy: Send + Sync {
    fn channel(&self) -> ChannelType;

    fn format(&self) -> ContentFormat;

    /// Default inline marker for failed directives
    fn error_placeholder(&self) -> &'static str {
        "[Template Error: {key}]"
    }

    /// Make content safe for the channel
    fn sanitize(&self, content: &str) -> String;

    /// Check already sanitized content
    fn validate(&self, content: &str) -> ChannelValidation;

    /// Errors for markup the channel refuses outright, checked before sanitizing
    fn reject_source(&self, _content: &str) -> Vec<String> {
        Vec::new()
    }
}

/// Policy for a channel. PUSH and CHAT share the text-only rules.
pub fn policy_for(channel: ChannelType) -> Box<dyn ChannelPolicy> {
    match channel {
        ChannelType::Email => Box::new(EmailPolicy::new()),
        ChannelType::InApp => Box::new(InAppPolicy::new()),
        ChannelType::Sms | ChannelType::Push | ChannelType::Chat => {
            Box::new(TextPolicy::new(channel))
        }
    }
}

/// Run every string in a variable tree through the channel sanitizer
pub fn sanitize_variables(variables: &Value, policy: &dyn ChannelPolicy) -> Value {
    match variables {
        Value::String(s) => Value::String(policy.sanitize(s)),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| sanitize_variables(item, policy))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), sanitize_variables(value, policy)))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_policy_selection() {
        assert_eq!(policy_for(ChannelType::Email).format(), ContentFormat::Html);
        assert_eq!(policy_for(ChannelType::InApp).format(), ContentFormat::Html);
        for channel in [ChannelType::Sms, ChannelType::Push, ChannelType::Chat] {
            let policy = policy_for(channel);
            assert_eq!(policy.format(), ContentFormat::Text);
            assert_eq!(policy.channel(), channel);
        }
    }

    #[test]
    fn test_sanitize_variables_recursively() {
        let policy = policy_for(ChannelType::Email);
        let variables = json!({
            "name": "<b>Ann</b><script>x()</script>",
            "items": [{"label": "<img src=x onerror=y()>"}],
            "count": 3
        });

        let clean = sanitize_variables(&variables, policy.as_ref());
        assert_eq!(clean["name"], "<b>Ann</b>");
        assert_eq!(clean["items"][0]["label"], "<img src=\"x\">");
        assert_eq!(clean["count"], 3);
    }

    #[test]
    fn test_text_channel_strips_variable_markup() {
        let policy = policy_for(ChannelType::Sms);
        let clean = sanitize_variables(&json!({"name": "<i>Ann</i> &amp; co"}), policy.as_ref());
        assert_eq!(clean["name"], "Ann & co");
    }
}
