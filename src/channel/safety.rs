//! Content-safety scan over rendered output.
//!
//! Findings are warnings only. The scan looks at content before any sanitizer runs,
//! so problems the sanitizer would silently remove are still reported.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyIssue {
    ScriptTag,
    ScriptProtocol,
    EventHandler,
    CssExpression,
    CssImport,
    BrowserGlobal,
}

impl SafetyIssue {
    fn description(&self) -> &'static str {
        match self {
            SafetyIssue::ScriptTag => "Script tag detected",
            SafetyIssue::ScriptProtocol => "Script protocol URL detected",
            SafetyIssue::EventHandler => "Inline event handler detected",
            SafetyIssue::CssExpression => "CSS expression detected",
            SafetyIssue::CssImport => "CSS @import detected",
            SafetyIssue::BrowserGlobal => "Access to sensitive browser state detected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SafetyWarning {
    pub issue: SafetyIssue,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SafetyReport {
    pub safe: bool,
    pub warnings: Vec<SafetyWarning>,
}

impl SafetyReport {
    pub fn has(&self, issue: SafetyIssue) -> bool {
        self.warnings.iter().any(|warning| warning.issue == issue)
    }
}

lazy_static! {
    static ref CHECKS: Vec<(SafetyIssue, Regex)> = vec![
        (SafetyIssue::ScriptTag, r"(?i)<\s*script\b"),
        (SafetyIssue::ScriptProtocol, r"(?i)\b(?:javascript|vbscript)\s*:"),
        (SafetyIssue::EventHandler, r"(?i)<[^>]*\son[a-z]+\s*="),
        (SafetyIssue::CssExpression, r"(?i)\bexpression\s*\("),
        (SafetyIssue::CssImport, r"(?i)@import\b"),
        (
            SafetyIssue::BrowserGlobal,
            r"(?i)\b(?:document\.cookie|document\.write|window\.location|localStorage|sessionStorage|eval\s*\()",
        ),
    ]
    .into_iter()
    .map(|(issue, pattern)| (issue, Regex::new(pattern).expect("safety regex")))
    .collect();
}

/// Scan content for dangerous patterns
pub fn scan(content: &str) -> SafetyReport {
    scan_all([content])
}

/// Scan several pieces of content as one report; occurrences are summed per issue
pub fn scan_all<'a>(contents: impl IntoIterator<Item = &'a str>) -> SafetyReport {
    let contents: Vec<&str> = contents.into_iter().collect();
    let mut warnings = Vec::new();

    for (issue, pattern) in CHECKS.iter() {
        let found: usize = contents
            .iter()
            .map(|content| pattern.find_iter(content).count())
            .sum();
        if found > 0 {
            warnings.push(SafetyWarning {
                issue: *issue,
                message: format!("{} ({} occurrence(s))", issue.description(), found),
            });
        }
    }

    SafetyReport {
        safe: warnings.is_empty(),
        warnings,
    }
}
