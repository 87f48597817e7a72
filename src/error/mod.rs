use serde::Serialize;
use thiserror::Error;

use crate::template::TemplateStoreError;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Template not found: {template_key}")]
    TemplateNotFound {
        template_key: String,
        enterprise_id: Option<String>,
    },

    #[error("Template store failure for {template_key}: {message}")]
    TemplateLoad {
        template_key: String,
        message: String,
    },

    #[error("Circular dependency: {path} -> {template_key}")]
    CircularDependency { template_key: String, path: String },

    #[error("Maximum render depth of {max_depth} exceeded at {template_key}")]
    DepthExceeded {
        template_key: String,
        max_depth: usize,
    },
}

impl RenderError {
    /// Classification used in per-directive error entries and metrics
    pub fn kind(&self) -> RenderErrorKind {
        match self {
            RenderError::Config(_) => RenderErrorKind::Configuration,
            RenderError::TemplateNotFound { .. } => RenderErrorKind::NotFound,
            RenderError::TemplateLoad { .. } => RenderErrorKind::StoreFailure,
            RenderError::CircularDependency { .. } => RenderErrorKind::CircularDependency,
            RenderError::DepthExceeded { .. } => RenderErrorKind::DepthExceeded,
        }
    }
}

impl From<TemplateStoreError> for RenderError {
    fn from(err: TemplateStoreError) -> Self {
        match err {
            TemplateStoreError::NotFound {
                template_key,
                enterprise_id,
            } => RenderError::TemplateNotFound {
                template_key,
                enterprise_id,
            },
            TemplateStoreError::Load {
                template_key,
                message,
            } => RenderError::TemplateLoad {
                template_key,
                message,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderErrorKind {
    NotFound,
    StoreFailure,
    CircularDependency,
    DepthExceeded,
    Configuration,
}

impl RenderErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderErrorKind::NotFound => "not_found",
            RenderErrorKind::StoreFailure => "store_failure",
            RenderErrorKind::CircularDependency => "circular_dependency",
            RenderErrorKind::DepthExceeded => "depth_exceeded",
            RenderErrorKind::Configuration => "configuration",
        }
    }
}

/// A contained failure of one directive, reported in the render result
#[derive(Debug, Clone, Serialize)]
pub struct RenderErrorEntry {
    pub template_key: String,
    pub kind: RenderErrorKind,
    pub error: String,
    /// Byte offset of the directive in the text it appeared in
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
    /// Nesting level the directive was evaluated at
    pub depth: usize,
}

impl RenderErrorEntry {
    pub fn new(
        template_key: impl Into<String>,
        error: &RenderError,
        position: Option<usize>,
        depth: usize,
    ) -> Self {
        Self {
            template_key: template_key.into(),
            kind: error.kind(),
            error: error.to_string(),
            position,
            depth,
        }
    }
}

pub type Result<T> = std::result::Result<T, RenderError>;
