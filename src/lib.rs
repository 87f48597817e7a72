//! Recursive, multi-tenant template rendering for notifications.

pub mod channel;
pub mod config;
pub mod error;
pub mod metrics;
pub mod render;
pub mod tasks;
pub mod telemetry;
pub mod template;

pub use channel::{ChannelRenderResult, ChannelRenderer};
pub use error::{RenderError, Result};
pub use render::{RenderContext, RenderOptions, RenderResult, TemplateRenderer};
pub use template::{CachingTemplateLoader, ChannelType, Template, TemplateStore};
