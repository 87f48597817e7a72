//! Per-channel sanitization, validation and content-safety scanning.

mod email;
mod html;
mod in_app;
mod policy;
mod renderer;
mod safety;
mod sms;

pub use email::{EmailPolicy, MAX_EMAIL_BYTES};
pub use html::{strip_tags, HtmlSanitizer, LinkTargetPolicy};
pub use in_app::{InAppPolicy, MAX_IN_APP_BYTES};
pub use policy::{policy_for, sanitize_variables, ChannelPolicy, ChannelValidation, ContentFormat};
pub use renderer::{ChannelRenderResult, ChannelRenderer};
pub use safety::{scan, scan_all, SafetyIssue, SafetyReport, SafetyWarning};
pub use sms::{segment_info, SegmentInfo, SmsEncoding, TextPolicy, MAX_TEXT_CHARS};
