//! Free-text parsing rules for the quality agent's response (spec.md §4.5
//! "Parsing rules for model issues").
//!
//! Grounded on the teacher's `verifier/report.rs` `ValidatorFeedback`
//! pattern of turning reviewer prose into structured, bounded deltas — the
//! rule set here is new (spec.md's keyword/context-request filters have no
//! teacher equivalent), but the "structure subjective text before trusting
//! it" idiom is the same.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

const MAX_ISSUE_LEN: usize = 320;
const MAX_ISSUES: usize = 12;

static BULLET_PREFIX_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:[-*\u{2022}]\s+|\d+[.)]\s+)").unwrap());
static PASS_INDICATOR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(quality_passed|all checks passed|no issues found|looks good to me)").unwrap()
});
static CONTEXT_REQUEST_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(share (the|your) (repo|repository|code)|cannot access your code|i do not have access|i don't have access|no access to the repository)")
        .unwrap()
});
static EVIDENCE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\.[jt]sx?\b|\.json\b|\.css\b|\bE\d{4}\b|\b(npm|eslint|vite)\b)").unwrap()
});
static ISSUE_KEYWORD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(error|failed|issue|missing|cannot|invalid|broken|unresolved|empty|not found|mismatch|crash|warning)")
        .unwrap()
});

/// Whether the quality agent's response claims the gate passes (spec.md
/// §4.5 step 1's requested `QUALITY_PASSED` token).
pub fn model_reported_pass(text: &str) -> bool {
    text.contains("QUALITY_PASSED")
}

/// Apply spec.md §4.5's parsing rules to turn the quality agent's free-text
/// response into a bounded, de-duplicated list of actionable issue lines.
pub fn parse_model_issues(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut issues = Vec::new();

    for raw_line in text.lines() {
        let mut line = BULLET_PREFIX_PATTERN.replace(raw_line, "").trim().to_string();
        if line.is_empty() {
            continue;
        }
        if line.chars().count() > MAX_ISSUE_LEN {
            line = line.chars().take(MAX_ISSUE_LEN).collect();
        }

        if PASS_INDICATOR_PATTERN.is_match(&line) {
            continue;
        }
        if CONTEXT_REQUEST_PATTERN.is_match(&line) && !EVIDENCE_PATTERN.is_match(&line) {
            continue;
        }
        if !ISSUE_KEYWORD_PATTERN.is_match(&line) {
            continue;
        }
        if seen.insert(line.clone()) {
            issues.push(line);
        }
        if issues.len() >= MAX_ISSUES {
            break;
        }
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pass_token_detected() {
        assert!(model_reported_pass("Everything looks correct. QUALITY_PASSED"));
        assert!(!model_reported_pass("still broken"));
    }

    #[test]
    fn strips_bullets_and_filters_non_issue_lines() {
        let text = "- src/App.tsx has a missing import\n* this line is fine, no issue here at all about anything broken\nJust a status update";
        let issues = parse_model_issues(text);
        assert_eq!(issues, vec!["src/App.tsx has a missing import".to_string()]);
    }

    #[test]
    fn context_request_without_evidence_is_dropped() {
        let text = "I cannot access your code, please share the repository";
        assert!(parse_model_issues(text).is_empty());
    }

    #[test]
    fn context_request_with_evidence_survives() {
        let text = "I do not have access but src/App.tsx reports error E0308 missing export";
        let issues = parse_model_issues(text);
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn pass_indicator_line_filtered_even_with_keyword() {
        let text = "all checks passed, no issues found, no errors";
        assert!(parse_model_issues(text).is_empty());
    }

    #[test]
    fn caps_at_twelve_and_dedupes() {
        let mut text = String::new();
        for i in 0..20 {
            text.push_str(&format!("- issue number {i} is broken\n"));
        }
        text.push_str("- issue number 0 is broken\n");
        let issues = parse_model_issues(&text);
        assert_eq!(issues.len(), 12);
    }
}
