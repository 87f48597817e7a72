//! Template rendering: directive parsing, interpolation and recursive expansion.

mod engine;
pub mod interpolate;
mod literal;
mod parser;
mod renderer;

pub use engine::{
    RenderContext, RenderEngine, RenderMetadata, RenderOptions, RenderResult, ValidationReport,
};
pub use interpolate::{
    extract_value, get_all_paths, interpolate, is_variable_path, set_nested_value, PathError,
};
pub use literal::{parse_arguments, ArgValue, DirectiveArgs, LiteralError};
pub use parser::{
    extract_placeholders, parse_directives, validate_syntax, DirectiveMatch, SyntaxReport,
    DIRECTIVE_NAME,
};
pub use renderer::TemplateRenderer;
