//! Parser for the variables argument of `xnovu_render`.
//!
//! Accepts a JSON5-like subset and never evaluates anything:
//!
//! - keys: bare identifiers or quoted strings
//! - strings: `"..."`, `'...'` or `` `...` `` with backslash escapes
//! - numbers, `true`, `false`, `null`
//! - nested objects and arrays, trailing commas allowed
//! - bare paths (`user.name`, `items[0]`) that are resolved against the current
//!   render scope when the directive is expanded

use serde_json::{Map, Number, Value};
use thiserror::Error;

use super::interpolate::extract_value;

/// Deepest object/array nesting accepted in an argument literal
pub const MAX_NESTING: usize = 64;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} at offset {position}")]
pub struct LiteralError {
    pub position: usize,
    pub message: String,
}

/// A parsed argument value, possibly referring to the render scope
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Literal(Value),
    Path(String),
    Object(Vec<(String, ArgValue)>),
    Array(Vec<ArgValue>),
}

impl ArgValue {
    /// Resolve against a scope. Paths that do not resolve yield `None`.
    pub fn resolve(&self, scope: &Value) -> Option<Value> {
        match self {
            ArgValue::Literal(value) => Some(value.clone()),
            ArgValue::Path(path) => extract_value(scope, path).cloned(),
            ArgValue::Object(members) => Some(Value::Object(resolve_members(members, scope))),
            ArgValue::Array(items) => Some(Value::Array(
                items
                    .iter()
                    .map(|item| item.resolve(scope).unwrap_or(Value::Null))
                    .collect(),
            )),
        }
    }
}

fn resolve_members(members: &[(String, ArgValue)], scope: &Value) -> Map<String, Value> {
    let mut map = Map::new();
    for (key, value) in members {
        if let Some(resolved) = value.resolve(scope) {
            map.insert(key.clone(), resolved);
        }
    }
    map
}

/// Ordered key → value arguments of one directive
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectiveArgs(Vec<(String, ArgValue)>);

impl DirectiveArgs {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, key: &str) -> Option<&ArgValue> {
        self.0.iter().rev().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    /// Resolve every argument against the scope; later duplicates win
    pub fn resolve(&self, scope: &Value) -> Map<String, Value> {
        resolve_members(&self.0, scope)
    }

    /// Scope paths referenced by the arguments, in order of appearance
    pub fn scope_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        for (_, value) in &self.0 {
            collect_scope_paths(value, &mut paths);
        }
        paths
    }
}

fn collect_scope_paths(value: &ArgValue, paths: &mut Vec<String>) {
    match value {
        ArgValue::Literal(_) => {}
        ArgValue::Path(path) => paths.push(path.clone()),
        ArgValue::Object(members) => {
            for (_, member) in members {
                collect_scope_paths(member, paths);
            }
        }
        ArgValue::Array(items) => {
            for item in items {
                collect_scope_paths(item, paths);
            }
        }
    }
}

/// Parse a brace-delimited object literal
pub fn parse_arguments(source: &str) -> Result<DirectiveArgs, LiteralError> {
    let mut parser = LiteralParser::new(source);
    parser.skip_whitespace();
    let members = parser.parse_object()?;
    parser.skip_whitespace();
    if let Some(c) = parser.peek() {
        return Err(parser.error(format!("unexpected trailing character '{}'", c)));
    }
    Ok(DirectiveArgs(members))
}

struct LiteralParser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl LiteralParser {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn error(&self, message: impl Into<String>) -> LiteralError {
        LiteralError {
            position: self.pos,
            message: message.into(),
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), LiteralError> {
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            Some(c) => {
                self.pos -= 1;
                Err(self.error(format!("expected '{}', found '{}'", expected, c)))
            }
            None => Err(self.error(format!("expected '{}', found end of input", expected))),
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    /// Open one object/array level, failing past `MAX_NESTING`
    fn enter(&mut self) -> Result<(), LiteralError> {
        if self.depth >= MAX_NESTING {
            return Err(self.error(format!("nesting deeper than {} levels", MAX_NESTING)));
        }
        self.depth += 1;
        Ok(())
    }

    fn parse_object(&mut self) -> Result<Vec<(String, ArgValue)>, LiteralError> {
        self.enter()?;
        let members = self.parse_object_members();
        self.depth -= 1;
        members
    }

    fn parse_object_members(&mut self) -> Result<Vec<(String, ArgValue)>, LiteralError> {
        self.expect('{')?;
        let mut members = Vec::new();

        loop {
            self.skip_whitespace();
            if self.peek() == Some('}') {
                self.pos += 1;
                return Ok(members);
            }

            let key = self.parse_key()?;
            self.skip_whitespace();
            self.expect(':')?;
            self.skip_whitespace();
            let value = self.parse_value()?;
            members.push((key, value));

            self.skip_whitespace();
            match self.bump() {
                Some(',') => continue,
                Some('}') => return Ok(members),
                Some(c) => {
                    self.pos -= 1;
                    return Err(self.error(format!("expected ',' or '}}', found '{}'", c)));
                }
                None => return Err(self.error("unterminated object")),
            }
        }
    }

    fn parse_array(&mut self) -> Result<Vec<ArgValue>, LiteralError> {
        self.enter()?;
        let items = self.parse_array_items();
        self.depth -= 1;
        items
    }

    fn parse_array_items(&mut self) -> Result<Vec<ArgValue>, LiteralError> {
        self.expect('[')?;
        let mut items = Vec::new();

        loop {
            self.skip_whitespace();
            if self.peek() == Some(']') {
                self.pos += 1;
                return Ok(items);
            }

            items.push(self.parse_value()?);

            self.skip_whitespace();
            match self.bump() {
                Some(',') => continue,
                Some(']') => return Ok(items),
                Some(c) => {
                    self.pos -= 1;
                    return Err(self.error(format!("expected ',' or ']', found '{}'", c)));
                }
                None => return Err(self.error("unterminated array")),
            }
        }
    }

    fn parse_key(&mut self) -> Result<String, LiteralError> {
        match self.peek() {
            Some('"') | Some('\'') | Some('`') => self.parse_string(),
            Some(c) if is_ident_start(c) => Ok(self.parse_identifier()),
            Some(c) if c.is_ascii_digit() => {
                let start = self.pos;
                while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                    self.pos += 1;
                }
                Ok(self.chars[start..self.pos].iter().collect())
            }
            Some(c) => Err(self.error(format!("invalid key start '{}'", c))),
            None => Err(self.error("expected key, found end of input")),
        }
    }

    fn parse_value(&mut self) -> Result<ArgValue, LiteralError> {
        match self.peek() {
            Some('{') => Ok(ArgValue::Object(self.parse_object()?)),
            Some('[') => Ok(ArgValue::Array(self.parse_array()?)),
            Some('"') | Some('\'') | Some('`') => {
                Ok(ArgValue::Literal(Value::String(self.parse_string()?)))
            }
            Some(c) if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => {
                Ok(ArgValue::Literal(self.parse_number()?))
            }
            Some(c) if is_ident_start(c) => self.parse_word(),
            Some(c) => Err(self.error(format!("unexpected character '{}'", c))),
            None => Err(self.error("expected value, found end of input")),
        }
    }

    fn parse_identifier(&mut self) -> String {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if is_ident_continue(c)) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    /// Keyword or scope path
    fn parse_word(&mut self) -> Result<ArgValue, LiteralError> {
        let start = self.pos;
        let head = self.parse_identifier();

        match head.as_str() {
            "true" => return Ok(ArgValue::Literal(Value::Bool(true))),
            "false" => return Ok(ArgValue::Literal(Value::Bool(false))),
            "null" | "undefined" => return Ok(ArgValue::Literal(Value::Null)),
            _ => {}
        }

        loop {
            match self.peek() {
                Some('.') => {
                    self.pos += 1;
                    if !matches!(self.peek(), Some(c) if is_ident_start(c)) {
                        return Err(self.error("expected identifier after '.'"));
                    }
                    self.parse_identifier();
                }
                Some('[') => {
                    self.pos += 1;
                    let digits_start = self.pos;
                    while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                        self.pos += 1;
                    }
                    if self.pos == digits_start {
                        return Err(self.error("expected array index"));
                    }
                    self.expect(']')?;
                }
                _ => break,
            }
        }

        Ok(ArgValue::Path(self.chars[start..self.pos].iter().collect()))
    }

    fn parse_string(&mut self) -> Result<String, LiteralError> {
        let quote = match self.bump() {
            Some(q @ ('"' | '\'' | '`')) => q,
            _ => return Err(self.error("expected string")),
        };

        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some('b') => out.push('\u{0008}'),
                    Some('f') => out.push('\u{000C}'),
                    Some('0') => out.push('\0'),
                    Some('u') => out.push(self.parse_unicode_escape()?),
                    Some(c) => out.push(c),
                    None => return Err(self.error("unterminated escape")),
                },
                Some(c) => out.push(c),
            }
        }
    }

    fn parse_unicode_escape(&mut self) -> Result<char, LiteralError> {
        let start = self.pos;
        let end = start + 4;
        if end > self.chars.len() {
            return Err(self.error("truncated unicode escape"));
        }
        let hex: String = self.chars[start..end].iter().collect();
        let code = u32::from_str_radix(&hex, 16)
            .map_err(|_| self.error(format!("invalid unicode escape '{}'", hex)))?;
        self.pos = end;
        Ok(char::from_u32(code).unwrap_or('\u{FFFD}'))
    }

    fn parse_number(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        if matches!(self.peek(), Some('-') | Some('+')) {
            self.pos += 1;
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E'))
            || (matches!(self.peek(), Some('-') | Some('+'))
                && matches!(self.chars.get(self.pos.wrapping_sub(1)), Some('e') | Some('E')))
        {
            self.pos += 1;
        }

        let text: String = self.chars[start..self.pos].iter().collect();
        let trimmed = text.trim_start_matches('+');

        if let Ok(int) = trimmed.parse::<i64>() {
            return Ok(Value::Number(int.into()));
        }

        trimmed
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| LiteralError {
                position: start,
                message: format!("invalid number '{}'", text),
            })
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn literal_map(source: &str) -> Map<String, Value> {
        parse_arguments(source).unwrap().resolve(&json!({}))
    }

    #[test]
    fn test_unquoted_keys_and_mixed_quotes() {
        let map = literal_map(r#"{ a: "double", 'b': 'single', c: `back` }"#);
        assert_eq!(map["a"], "double");
        assert_eq!(map["b"], "single");
        assert_eq!(map["c"], "back");
    }

    #[test]
    fn test_numbers_booleans_null() {
        let map = literal_map("{ n: 42, neg: -3, f: 2.5, e: 1e3, t: true, no: false, z: null }");
        assert_eq!(map["n"], 42);
        assert_eq!(map["neg"], -3);
        assert_eq!(map["f"], 2.5);
        assert_eq!(map["e"], 1000.0);
        assert_eq!(map["t"], true);
        assert_eq!(map["no"], false);
        assert!(map["z"].is_null());
    }

    #[test]
    fn test_nested_objects_and_arrays() {
        let map = literal_map("{ nested: { x: 1, deeper: { y: 'z' } }, list: [1, 'two', { three: 3 },], }");
        assert_eq!(map["nested"]["x"], 1);
        assert_eq!(map["nested"]["deeper"]["y"], "z");
        assert_eq!(map["list"], json!([1, "two", {"three": 3}]));
    }

    #[test]
    fn test_string_escapes() {
        let map = literal_map(r#"{ s: 'it\'s', n: "line\nbreak", u: "é" }"#);
        assert_eq!(map["s"], "it's");
        assert_eq!(map["n"], "line\nbreak");
        assert_eq!(map["u"], "é");
    }

    #[test]
    fn test_empty_object() {
        assert!(parse_arguments("{}").unwrap().is_empty());
        assert!(parse_arguments("  {  }  ").unwrap().is_empty());
    }

    #[test]
    fn test_paths_resolve_against_scope() {
        let args = parse_arguments("{ name: user.name, first: items[0], missing: nope.x }").unwrap();
        let scope = json!({"user": {"name": "Alice"}, "items": ["a", "b"]});
        let map = args.resolve(&scope);

        assert_eq!(map["name"], "Alice");
        assert_eq!(map["first"], "a");
        assert!(!map.contains_key("missing"));
        assert_eq!(args.scope_paths(), vec!["user.name", "items[0]", "nope.x"]);
    }

    #[test]
    fn test_code_is_never_executed() {
        assert!(parse_arguments("{ a: alert(1) }").is_err());
        assert!(parse_arguments("{ a: 1 }; process.exit()").is_err());
        assert!(parse_arguments("{ a: (() => 1)() }").is_err());
    }

    #[test]
    fn test_malformed_inputs() {
        assert!(parse_arguments("{ a: 'unterminated }").is_err());
        assert!(parse_arguments("{ a 1 }").is_err());
        assert!(parse_arguments("{ a: 1").is_err());
        assert!(parse_arguments("not an object").is_err());
    }

    #[test]
    fn test_nesting_limit() {
        let nested = |levels: usize| {
            format!("{{ a: {}1{} }}", "[".repeat(levels), "]".repeat(levels))
        };

        // The outer object counts as one level
        assert!(parse_arguments(&nested(MAX_NESTING - 1)).is_ok());

        let err = parse_arguments(&nested(MAX_NESTING)).unwrap_err();
        assert!(err.message.contains("nesting deeper than"));

        assert!(parse_arguments(&nested(50_000)).is_err());
        let objects = format!("{}{}", "{ a: ".repeat(10_000), "}".repeat(10_000));
        assert!(parse_arguments(&objects).is_err());
    }

    #[test]
    fn test_duplicate_keys_last_wins() {
        let args = parse_arguments("{ a: 1, a: 2 }").unwrap();
        assert_eq!(args.len(), 2);
        assert_eq!(args.get("a"), Some(&ArgValue::Literal(json!(2))));
        assert_eq!(args.resolve(&json!({}))["a"], 2);
    }
}
