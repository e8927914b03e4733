//! Static checks run before a snippet is ever executed.

use crate::engine::{ENTRY_POINT, build_engine};
use crate::limits::SandboxLimits;
use regex::{Regex, RegexSet};
use serde::Serialize;
use thiserror::Error;

/// Capabilities a snippet may not reference, as `(pattern, reason)`.
pub const FORBIDDEN_PATTERNS: &[(&str, &str)] = &[
    (r"\beval\b", "dynamic code evaluation is not allowed"),
    (r"\b(?:import|export)\b", "modules are not allowed"),
    (r"\bFn\s*\(|\.call\s*\(|\bcurry\b", "function pointers are not allowed"),
    (r"\b(?:timestamp|sleep|elapsed)\b", "timers are not allowed"),
    (r"(?i)\b(?:https?|fetch|socket|url)\b", "network access is not allowed"),
    (
        r"\b(?:file|storage|localStorage)\b|\bopen\s*\(",
        "persistent storage is not allowed",
    ),
    (
        r"\b(?:post_message|channel)\b|\bsend\s*\(",
        "cross-context messaging is not allowed",
    ),
    (
        r"\b(?:get_fn_metadata_list|is_def_fn|is_def_var|engine)\b",
        "runtime reflection is not allowed",
    ),
];

const SUSPICIOUS_PATTERNS: &[(&str, &str)] = &[
    (r"\bloop\s*\{", "unconditional `loop` may never terminate"),
    (r"\bwhile\s+true\b", "`while true` may never terminate"),
];

const COMMENTS: &str = r"(?s)/\*.*?\*/|//[^\n]*";
const BRANCHES: &str = r"\b(?:if|else|switch|for|while|loop|do)\b";

/// The snippet was refused; every failed check is listed.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
#[error("snippet rejected: {}", .errors.join("; "))]
pub struct SnippetRejected {
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub warnings: Vec<String>,
    pub complexity: usize,
    pub lines: usize,
}

#[derive(Debug, Clone)]
pub struct SnippetValidator {
    limits: SandboxLimits,
    forbidden: RegexSet,
    reasons: Vec<&'static str>,
    suspicious: RegexSet,
    suspicious_reasons: Vec<&'static str>,
    comments: Regex,
    branches: Regex,
}

impl SnippetValidator {
    pub fn new(limits: SandboxLimits) -> Result<Self, regex::Error> {
        Ok(Self {
            limits,
            forbidden: RegexSet::new(FORBIDDEN_PATTERNS.iter().map(|(pattern, _)| *pattern))?,
            reasons: FORBIDDEN_PATTERNS.iter().map(|(_, reason)| *reason).collect(),
            suspicious: RegexSet::new(SUSPICIOUS_PATTERNS.iter().map(|(pattern, _)| *pattern))?,
            suspicious_reasons: SUSPICIOUS_PATTERNS.iter().map(|(_, reason)| *reason).collect(),
            comments: Regex::new(COMMENTS)?,
            branches: Regex::new(BRANCHES)?,
        })
    }

    pub fn limits(&self) -> &SandboxLimits {
        &self.limits
    }

    pub fn validate(&self, code: &str) -> Result<ValidationReport, SnippetRejected> {
        let mut errors = Vec::new();
        let lines = code.lines().count();
        if code.trim().is_empty() {
            errors.push("snippet is empty".to_string());
        }
        if code.len() > self.limits.max_code_length {
            errors.push(format!(
                "snippet is {} bytes; the limit is {}",
                code.len(),
                self.limits.max_code_length
            ));
        }
        if lines > self.limits.max_lines {
            errors.push(format!(
                "snippet has {lines} lines; the limit is {}",
                self.limits.max_lines
            ));
        }

        // Raw text: a comment marker inside a string literal must not hide code.
        for index in self.forbidden.matches(code).iter() {
            errors.push(self.reasons[index].to_string());
        }
        if !errors.is_empty() {
            return Err(SnippetRejected { errors });
        }

        let engine = build_engine(&self.limits, None);
        let ast = engine.compile(code).map_err(|err| SnippetRejected {
            errors: vec![format!("syntax error: {err}")],
        })?;
        let entry: Vec<usize> = ast
            .iter_functions()
            .filter(|function| function.name == ENTRY_POINT)
            .map(|function| function.params.len())
            .collect();
        if entry.is_empty() {
            errors.push(format!("missing entry point `fn {ENTRY_POINT}(state)`"));
        } else if !entry.contains(&1) {
            errors.push(format!("`{ENTRY_POINT}` must take exactly one parameter"));
        }
        if !errors.is_empty() {
            return Err(SnippetRejected { errors });
        }

        let stripped = self.comments.replace_all(code, "");
        let mut warnings: Vec<String> = self
            .suspicious
            .matches(&stripped)
            .iter()
            .map(|index| self.suspicious_reasons[index].to_string())
            .collect();
        let complexity = 1 + self.branches.find_iter(&stripped).count();
        if complexity > self.limits.complexity_warning {
            warnings.push(format!("high branching complexity ({complexity})"));
        }
        Ok(ValidationReport {
            warnings,
            complexity,
            lines,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> SnippetValidator {
        SnippetValidator::new(SandboxLimits::default()).unwrap()
    }

    #[test]
    fn accepts_plain_snippet() {
        let report = validator()
            .validate("fn make_guess(state) {\n  if state.answer_count > 0 { [0, 1, 2] } else { [] }\n}")
            .unwrap();
        assert!(report.warnings.is_empty());
        assert_eq!(report.complexity, 3);
    }

    #[test]
    fn rejects_forbidden_capabilities_before_parsing() {
        let err = validator()
            .validate("fn make_guess(state) { eval(\"1\"); let t = timestamp(); [0] }")
            .unwrap_err();
        assert!(err.errors.contains(&"dynamic code evaluation is not allowed".to_string()));
        assert!(err.errors.contains(&"timers are not allowed".to_string()));
    }

    #[test]
    fn forbidden_words_are_rejected_even_in_comments() {
        let code = "// no eval here\nfn make_guess(state) { /* sleep */ [0, 1] }";
        let err = validator().validate(code).unwrap_err();
        assert!(err.errors.contains(&"dynamic code evaluation is not allowed".to_string()));
        assert!(err.errors.contains(&"timers are not allowed".to_string()));
    }

    #[test]
    fn comment_markers_in_strings_do_not_hide_calls() {
        for marker in ["//", "/*"] {
            let code = format!(
                "fn make_guess(state) {{ let s = \"{marker}\"; let t = timestamp(); [0, 2, 4] }}"
            );
            let err = validator().validate(&code).unwrap_err();
            assert_eq!(err.errors, vec!["timers are not allowed".to_string()]);
        }
    }

    #[test]
    fn comments_do_not_count_towards_complexity() {
        let code = "fn make_guess(state) {\n  // if else while\n  [0, 1]\n}";
        assert_eq!(validator().validate(code).unwrap().complexity, 1);
    }

    #[test]
    fn identifiers_containing_forbidden_words_pass() {
        let code = "fn make_guess(state) { let profile = 1; let urls_seen = 0; [profile] }";
        assert!(validator().validate(code).is_ok());
    }

    #[test]
    fn rejects_missing_or_malformed_entry_point() {
        let missing = validator().validate("fn guess(state) { [0] }").unwrap_err();
        assert!(missing.errors[0].contains("missing entry point"));
        let arity = validator().validate("fn make_guess() { [0] }").unwrap_err();
        assert!(arity.errors[0].contains("exactly one parameter"));
        let syntax = validator().validate("fn make_guess(state) { [0, }").unwrap_err();
        assert!(syntax.errors[0].starts_with("syntax error"));
    }

    #[test]
    fn rejects_oversized_snippets() {
        let limits = SandboxLimits {
            max_lines: 2,
            ..SandboxLimits::default()
        };
        let validator = SnippetValidator::new(limits).unwrap();
        let err = validator
            .validate("fn make_guess(state) {\n let a = 1;\n [a]\n}")
            .unwrap_err();
        assert_eq!(err.errors.len(), 1);
        assert!(err.errors[0].contains("4 lines"));
    }

    #[test]
    fn warns_on_unbounded_loops() {
        let code = "fn make_guess(state) {\n  let i = 0;\n  loop { i += 1; if i > 3 { break; } }\n  [i]\n}";
        let report = validator().validate(code).unwrap();
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("loop"));
    }
}
