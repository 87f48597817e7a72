//! Directive and placeholder parsing.
//!
//! Directive syntax:
//!
//! ```text
//! {{ xnovu_render("template-key", { var1: "value", nested: { x: 1 } }) }}
//! ```
//!
//! The key may be quoted with `"`, `'` or `` ` ``; the variables argument is optional
//! and may nest braces to any depth.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use super::interpolate::{is_variable_path, PLACEHOLDER};
use super::literal::{parse_arguments, DirectiveArgs};

/// Name of the inclusion directive
pub const DIRECTIVE_NAME: &str = "xnovu_render";

lazy_static! {
    static ref DIRECTIVE_HEAD: Regex =
        Regex::new(r"\{\{\s*xnovu_render\s*\(\s*").expect("directive regex");
    static ref EMPTY_PLACEHOLDER: Regex = Regex::new(r"\{\{\s*\}\}").expect("empty placeholder regex");
}

/// One located `xnovu_render` directive
#[derive(Debug, Clone, PartialEq)]
pub struct DirectiveMatch {
    /// Exact source text of the directive
    pub full_match: String,
    pub template_key: String,
    /// Parsed variables argument; empty if absent or malformed
    pub arguments: DirectiveArgs,
    /// Parse failure of the variables argument, if any
    pub argument_error: Option<String>,
    /// Byte offset of the opening `{{`
    pub start: usize,
    /// Byte offset one past the closing `}}`
    pub end: usize,
}

/// Outcome of a syntax check
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyntaxReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

/// Find every directive in document order
pub fn parse_directives(template: &str) -> Vec<DirectiveMatch> {
    let mut matches = Vec::new();
    let mut cursor = 0;

    while let Some(head) = DIRECTIVE_HEAD.find_at(template, cursor) {
        match scan_directive(template, head.start(), head.end()) {
            Some(directive) => {
                cursor = directive.end;
                matches.push(directive);
            }
            None => cursor = head.end(),
        }
    }

    matches
}

/// Scan the remainder of a directive after `{{ xnovu_render(`
fn scan_directive(template: &str, start: usize, args_start: usize) -> Option<DirectiveMatch> {
    let bytes = template.as_bytes();
    let mut pos = args_start;

    let quote = *bytes.get(pos)?;
    if !matches!(quote, b'"' | b'\'' | b'`') {
        return None;
    }
    let key_start = pos + 1;
    let key_end = find_closing_quote(bytes, key_start, quote)?;
    let template_key = template[key_start..key_end].trim().to_string();
    if template_key.is_empty() {
        return None;
    }
    pos = skip_whitespace(bytes, key_end + 1);

    let mut arguments_source = None;
    if bytes.get(pos) == Some(&b',') {
        let value_start = skip_whitespace(bytes, pos + 1);
        let value_end = find_call_end(bytes, value_start)?;
        arguments_source = Some(template[value_start..value_end].trim_end());
        pos = value_end;
    }

    if bytes.get(pos) != Some(&b')') {
        return None;
    }
    pos = skip_whitespace(bytes, pos + 1);
    if !template[pos..].starts_with("}}") {
        return None;
    }
    let end = pos + 2;

    let (arguments, argument_error) = match arguments_source {
        None | Some("") => (DirectiveArgs::default(), None),
        Some(source) => match parse_arguments(source) {
            Ok(arguments) => (arguments, None),
            Err(e) => {
                tracing::debug!(
                    template_key = %template_key,
                    error = %e,
                    "Malformed directive variables, using empty map"
                );
                (DirectiveArgs::default(), Some(e.to_string()))
            }
        },
    };

    Some(DirectiveMatch {
        full_match: template[start..end].to_string(),
        template_key,
        arguments,
        argument_error,
        start,
        end,
    })
}

fn skip_whitespace(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
        pos += 1;
    }
    pos
}

fn find_closing_quote(bytes: &[u8], mut pos: usize, quote: u8) -> Option<usize> {
    while pos < bytes.len() {
        match bytes[pos] {
            b'\\' => pos += 2,
            b if b == quote => return Some(pos),
            _ => pos += 1,
        }
    }
    None
}

/// Position of the `)` closing the directive call, skipping nested brackets and strings
fn find_call_end(bytes: &[u8], mut pos: usize) -> Option<usize> {
    let mut depth = 0usize;
    while pos < bytes.len() {
        match bytes[pos] {
            q @ (b'"' | b'\'' | b'`') => {
                pos = find_closing_quote(bytes, pos + 1, q)? + 1;
                continue;
            }
            b'{' | b'[' | b'(' => depth += 1,
            b'}' | b']' => {
                if depth == 0 {
                    return None;
                }
                depth -= 1;
            }
            b')' => {
                if depth == 0 {
                    return Some(pos);
                }
                depth -= 1;
            }
            _ => {}
        }
        pos += 1;
    }
    None
}

/// Plain placeholder paths in first-appearance order, without duplicates.
///
/// Anything inside a directive is skipped.
pub fn extract_placeholders(template: &str) -> Vec<String> {
    let directives = parse_directives(template);
    let inside_directive = |start: usize, end: usize| {
        directives
            .iter()
            .any(|d| start < d.end && end > d.start)
    };

    let mut seen = HashSet::new();
    let mut paths = Vec::new();
    for caps in PLACEHOLDER.captures_iter(template) {
        let Some(whole) = caps.get(0) else { continue };
        if inside_directive(whole.start(), whole.end()) {
            continue;
        }
        let expression = caps[1].trim();
        if is_variable_path(expression) && seen.insert(expression.to_string()) {
            paths.push(expression.to_string());
        }
    }

    paths
}

/// Check marker balance, empty placeholders and directive well-formedness
pub fn validate_syntax(template: &str) -> SyntaxReport {
    let mut errors = Vec::new();

    for m in EMPTY_PLACEHOLDER.find_iter(template) {
        errors.push(format!("Empty placeholder at position {}", m.start()));
    }

    let opening = template.matches("{{").count();
    let closing = template.matches("}}").count();
    if opening != closing {
        errors.push(format!(
            "Unbalanced template markers: {} opening, {} closing",
            opening, closing
        ));
    }

    let directives = parse_directives(template);
    for head in DIRECTIVE_HEAD.find_iter(template) {
        if !directives.iter().any(|d| d.start == head.start()) {
            errors.push(format!(
                "Malformed {} directive at position {}",
                DIRECTIVE_NAME,
                head.start()
            ));
        }
    }

    for directive in &directives {
        if let Some(error) = &directive.argument_error {
            errors.push(format!(
                "Invalid variables for '{}' at position {}: {}",
                directive.template_key, directive.start, error
            ));
        }
    }

    SyntaxReport {
        valid: errors.is_empty(),
        errors,
    }
}
