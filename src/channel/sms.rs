//! Text-only policy for SMS, push and chat.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::template::ChannelType;

use super::html::strip_tags;
use super::policy::{ChannelPolicy, ChannelValidation, ContentFormat};

/// Maximum length of a concatenated message, in characters
pub const MAX_TEXT_CHARS: usize = 1600;

const GSM7_SINGLE: usize = 160;
const GSM7_MULTIPART: usize = 153;
const UCS2_SINGLE: usize = 70;
const UCS2_MULTIPART: usize = 67;

/// GSM 03.38 default alphabet
const GSM7_BASIC: &str = "@£$¥èéùìòÇ\nØø\rÅåΔ_ΦΓΛΩΠΨΣΘΞÆæßÉ !\"#¤%&'()*+,-./0123456789:;<=>?¡ABCDEFGHIJKLMNOPQRSTUVWXYZÄÖÑÜ§¿abcdefghijklmnopqrstuvwxyzäöñüà";
/// Extension table; each costs two septets
const GSM7_EXTENDED: &str = "\u{0c}^{}\\[~]|€";

lazy_static! {
    static ref OPT_OUT: Regex = Regex::new(
        r#"(?i)\b(?:(?:reply|text|txt|send)\s+["']?(?:stop|end|quit|cancel|unsubscribe)\b|unsubscribe\b|opt[\s-]?out\b)"#
    )
    .expect("opt-out regex");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SmsEncoding {
    Gsm7,
    Ucs2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SegmentInfo {
    pub encoding: SmsEncoding,
    /// Septets for GSM-7, UTF-16 code units for UCS-2
    pub units: usize,
    pub segments: usize,
}

/// Encoding and segment count of a text message
pub fn segment_info(text: &str) -> SegmentInfo {
    let gsm_units = text.chars().try_fold(0usize, |units, c| {
        if GSM7_BASIC.contains(c) {
            Some(units + 1)
        } else if GSM7_EXTENDED.contains(c) {
            Some(units + 2)
        } else {
            None
        }
    });

    let (encoding, units, single, multipart) = match gsm_units {
        Some(units) => (SmsEncoding::Gsm7, units, GSM7_SINGLE, GSM7_MULTIPART),
        None => (
            SmsEncoding::Ucs2,
            text.encode_utf16().count(),
            UCS2_SINGLE,
            UCS2_MULTIPART,
        ),
    };

    let segments = match units {
        0 => 0,
        n if n <= single => 1,
        n => n.div_ceil(multipart),
    };

    SegmentInfo {
        encoding,
        units,
        segments,
    }
}

/// Plain-text policy. Opt-out language is only required for SMS.
#[derive(Debug, Clone)]
pub struct TextPolicy {
    channel: ChannelType,
}

impl TextPolicy {
    pub fn new(channel: ChannelType) -> Self {
        Self { channel }
    }

    pub fn sms() -> Self {
        Self::new(ChannelType::Sms)
    }
}

impl ChannelPolicy for TextPolicy {
    fn channel(&self) -> ChannelType {
        self.channel
    }

    fn format(&self) -> ContentFormat {
        ContentFormat::Text
    }

    fn error_placeholder(&self) -> &'static str {
        "[Error: {key}]"
    }

    fn sanitize(&self, content: &str) -> String {
        strip_tags(content)
    }

    fn validate(&self, content: &str) -> ChannelValidation {
        let length = content.chars().count();
        let info = segment_info(content);

        let mut validation = ChannelValidation::new(length);
        validation.segments = Some(info.segments);
        validation.encoding = Some(info.encoding);

        if length > MAX_TEXT_CHARS {
            validation.error(format!(
                "Message is {} characters, exceeding the limit of {}",
                length, MAX_TEXT_CHARS
            ));
        }

        if info.encoding == SmsEncoding::Ucs2 {
            validation.warn(format!(
                "Message contains non-GSM characters; sent as UCS-2 with {} characters per segment",
                UCS2_SINGLE
            ));
        }

        if info.segments > 1 {
            validation.warn(format!("Message will be sent as {} segments", info.segments));
        }

        if self.channel == ChannelType::Sms && !content.is_empty() && !OPT_OUT.is_match(content) {
            validation.warn("Message has no opt-out language (e.g. \"Reply STOP to unsubscribe\")");
        }

        validation
    }
}
