//! Variable interpolation for `{{ path }}` placeholders.
//!
//! Paths are dot-separated keys with optional numeric indexes (`a.items[2].name`).
//! A placeholder whose path does not resolve is left in the output verbatim.

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use thiserror::Error;

lazy_static! {
    /// `{{ expression }}` with no braces inside the expression
    pub(crate) static ref PLACEHOLDER: Regex =
        Regex::new(r"\{\{\s*([^{}]*?)\s*\}\}").expect("placeholder regex");
}

/// One step of a variable path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PathError {
    #[error("Invalid variable path: {0}")]
    InvalidPath(String),
}

/// Parse a variable path, returning `None` if it is not a plain path expression
pub fn parse_path(expression: &str) -> Option<Vec<PathSegment>> {
    let chars: Vec<char> = expression.trim().chars().collect();
    let mut segments = Vec::new();
    let mut pos = 0;
    let mut expect_key = true;

    while pos < chars.len() {
        let c = chars[pos];
        if expect_key {
            if !(c.is_alphabetic() || c == '_' || c == '$') {
                return None;
            }
            let start = pos;
            while pos < chars.len()
                && (chars[pos].is_alphanumeric() || matches!(chars[pos], '_' | '$' | '-'))
            {
                pos += 1;
            }
            segments.push(PathSegment::Key(chars[start..pos].iter().collect()));
            expect_key = false;
            continue;
        }

        match c {
            '.' => {
                expect_key = true;
                pos += 1;
            }
            '[' => {
                let start = pos + 1;
                let mut end = start;
                while end < chars.len() && chars[end].is_ascii_digit() {
                    end += 1;
                }
                if end == start || chars.get(end) != Some(&']') {
                    return None;
                }
                let index: String = chars[start..end].iter().collect();
                segments.push(PathSegment::Index(index.parse().ok()?));
                pos = end + 1;
            }
            _ => return None,
        }
    }

    if expect_key || segments.is_empty() {
        return None;
    }

    Some(segments)
}

/// Whether an expression is a plain variable path
pub fn is_variable_path(expression: &str) -> bool {
    parse_path(expression).is_some()
}

/// Resolve a path against a scope without converting the result.
///
/// Returns `None` as soon as a segment is missing or an intermediate value is null.
pub fn extract_value<'a>(scope: &'a Value, path: &str) -> Option<&'a Value> {
    let segments = parse_path(path)?;
    resolve_segments(scope, &segments)
}

fn resolve_segments<'a>(scope: &'a Value, segments: &[PathSegment]) -> Option<&'a Value> {
    let mut current = scope;
    for segment in segments {
        current = match (segment, current) {
            (PathSegment::Key(key), Value::Object(map)) => map.get(key)?,
            (PathSegment::Index(index), Value::Array(items)) => items.get(*index)?,
            _ => return None,
        };
    }
    Some(current)
}

/// String form used when a value is substituted into text
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        // Arrays and objects use their JSON representation
        _ => value.to_string(),
    }
}

/// Replace every resolvable placeholder in `template` with its value
pub fn interpolate(template: &str, variables: &Value) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            let expression = &caps[1];
            match extract_value(variables, expression) {
                Some(value) => value_to_string(value),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Write `value` at `path`, creating intermediate objects and arrays as needed
pub fn set_nested_value(target: &mut Value, path: &str, value: Value) -> Result<(), PathError> {
    let segments = parse_path(path).ok_or_else(|| PathError::InvalidPath(path.to_string()))?;

    let mut current = target;
    for (i, segment) in segments.iter().enumerate() {
        let container_for_next = match segments.get(i + 1) {
            Some(PathSegment::Index(_)) => Value::Array(Vec::new()),
            Some(PathSegment::Key(_)) => Value::Object(Map::new()),
            None => Value::Null,
        };
        let is_last = i + 1 == segments.len();

        current = match segment {
            PathSegment::Key(key) => {
                if !current.is_object() {
                    *current = Value::Object(Map::new());
                }
                let map = current
                    .as_object_mut()
                    .ok_or_else(|| PathError::InvalidPath(path.to_string()))?;
                if is_last {
                    map.insert(key.clone(), value);
                    return Ok(());
                }
                let slot = map.entry(key.clone()).or_insert(Value::Null);
                if !is_container(slot) {
                    *slot = container_for_next;
                }
                slot
            }
            PathSegment::Index(index) => {
                if !current.is_array() {
                    *current = Value::Array(Vec::new());
                }
                let items = current
                    .as_array_mut()
                    .ok_or_else(|| PathError::InvalidPath(path.to_string()))?;
                if items.len() <= *index {
                    items.resize(*index + 1, Value::Null);
                }
                if is_last {
                    items[*index] = value;
                    return Ok(());
                }
                let slot = &mut items[*index];
                if !is_container(slot) {
                    *slot = container_for_next;
                }
                slot
            }
        };
    }

    Ok(())
}

fn is_container(value: &Value) -> bool {
    value.is_object() || value.is_array()
}

/// Every reachable path in a value, parents before children
pub fn get_all_paths(value: &Value) -> Vec<String> {
    let mut paths = Vec::new();
    collect_paths(value, "", &mut paths);
    paths
}

fn collect_paths(value: &Value, prefix: &str, paths: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                paths.push(path.clone());
                collect_paths(child, &path, paths);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                let path = format!("{}[{}]", prefix, index);
                paths.push(path.clone());
                collect_paths(child, &path, paths);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_interpolate_nested_path() {
        let scope = json!({"user": {"profile": {"name": "Bob"}}});
        assert_eq!(interpolate("{{ user.profile.name }}", &scope), "Bob");
    }

    #[test]
    fn test_unresolved_placeholder_left_verbatim() {
        assert_eq!(
            interpolate("{{ user.profile.name }}", &json!({})),
            "{{ user.profile.name }}"
        );
        assert_eq!(
            interpolate("Hi {{name}}, {{ missing }}", &json!({"name": "Ann"})),
            "Hi Ann, {{ missing }}"
        );
    }

    #[test]
    fn test_indexed_paths() {
        let scope = json!({"items": [{"name": "first"}, {"name": "second"}], "a": {"items": [0, 1, {"name": "deep"}]}});
        assert_eq!(interpolate("{{ items[0].name }}", &scope), "first");
        assert_eq!(interpolate("{{ a.items[2].name }}", &scope), "deep");
        assert_eq!(interpolate("{{ items[5].name }}", &scope), "{{ items[5].name }}");
    }

    #[test]
    fn test_null_intermediate_short_circuits() {
        let scope = json!({"user": null});
        assert_eq!(interpolate("{{ user.name }}", &scope), "{{ user.name }}");
        assert!(extract_value(&scope, "user.name").is_none());
    }

    #[test]
    fn test_value_formatting() {
        let scope = json!({"n": 42, "b": true, "z": null, "list": [1, 2]});
        assert_eq!(interpolate("{{n}}|{{b}}|{{z}}|{{list}}", &scope), "42|true||[1,2]");
    }

    #[test]
    fn test_non_path_expressions_untouched() {
        let scope = json!({"a": 1});
        let template = "{{ xnovu_render('k') }} {{ a + 1 }} {{ }}";
        assert_eq!(interpolate(template, &scope), template);
    }

    #[test]
    fn test_interpolation_is_idempotent() {
        let scope = json!({"name": "Ann", "count": 3});
        let template = "{{ name }} has {{ count }} items, {{ unknown }}";
        let once = interpolate(template, &scope);
        assert_eq!(interpolate(&once, &scope), once);
    }

    #[test]
    fn test_parse_path() {
        assert_eq!(
            parse_path("a.items[2].name"),
            Some(vec![
                PathSegment::Key("a".to_string()),
                PathSegment::Key("items".to_string()),
                PathSegment::Index(2),
                PathSegment::Key("name".to_string()),
            ])
        );
        assert!(parse_path("a.").is_none());
        assert!(parse_path("a[x]").is_none());
        assert!(parse_path("1abc").is_none());
        assert!(parse_path("").is_none());
    }

    #[test]
    fn test_extract_value_keeps_type() {
        let scope = json!({"order": {"lines": [{"qty": 2}]}});
        assert_eq!(extract_value(&scope, "order.lines"), Some(&json!([{"qty": 2}])));
        assert_eq!(extract_value(&scope, "order.lines[0].qty"), Some(&json!(2)));
    }

    #[test]
    fn test_set_nested_value_creates_containers() {
        let mut target = json!({});
        set_nested_value(&mut target, "user.tags[1]", json!("vip")).unwrap();
        set_nested_value(&mut target, "user.name", json!("Ann")).unwrap();
        assert_eq!(target, json!({"user": {"tags": [null, "vip"], "name": "Ann"}}));

        set_nested_value(&mut target, "user.name", json!("Bea")).unwrap();
        assert_eq!(target["user"]["name"], "Bea");

        assert!(set_nested_value(&mut target, "bad..path", json!(1)).is_err());
    }

    #[test]
    fn test_get_all_paths() {
        let value = json!({"a": {"b": 1}, "list": [{"c": 2}]});
        let paths = get_all_paths(&value);
        assert_eq!(paths, vec!["a", "a.b", "list", "list[0]", "list[0].c"]);
    }
}
