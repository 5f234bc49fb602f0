//! Sentence-level clause detection and per-clause risk scoring.

use std::collections::HashMap;
use std::sync::{LazyLock, Mutex};

use regex::Regex;

use crate::models::{Clause, RiskLevel};

/// Sentences with fewer words than this are never classified.
const MIN_CLAUSE_WORDS: usize = 5;

/// Category keyword lists. Multi-word keywords are more specific and score
/// their word count.
pub const CLAUSE_CATEGORIES: &[(&str, &[&str])] = &[
    (
        "confidentiality",
        &["confidential", "non-disclosure", "proprietary", "secret"],
    ),
    (
        "liability",
        &["liability", "indemnify", "indemnification", "damages", "liable"],
    ),
    (
        "termination",
        &["termination", "terminate", "cancel", "cancellation", "end"],
    ),
    (
        "payment",
        &["payment", "fee", "compensation", "remuneration", "invoice"],
    ),
    (
        "intellectual_property",
        &["intellectual property", "ip", "copyright", "patent", "trademark"],
    ),
    (
        "dispute_resolution",
        &["arbitration", "mediation", "dispute", "litigation", "jurisdiction"],
    ),
    (
        "force_majeure",
        &["force majeure", "act of god", "unavoidable"],
    ),
    (
        "warranty",
        &["warranty", "guarantee", "representation", "warranted"],
    ),
    ("assignment", &["assignment", "transfer", "assign"]),
    (
        "governing_law",
        &["governing law", "applicable law", "jurisdiction"],
    ),
];

const HIGH_RISK_TERMS: &[&str] = &[
    "unlimited",
    "perpetual",
    "irrevocable",
    "sole discretion",
    "without limitation",
    "in no event",
    "waive",
    "forfeit",
    "exclusive",
    "non-refundable",
    "no liability",
];

const MEDIUM_RISK_TERMS: &[&str] = &[
    "may",
    "at our discretion",
    "reserve the right",
    "subject to",
    "notwithstanding",
    "except as",
];

const VAGUE_TERMS: &[&str] = &["reasonable", "appropriate", "sufficient", "adequate", "material"];
const ONE_SIDED_TERMS: &[&str] = &["sole discretion", "at our option", "we may", "without limitation"];

pub const ISSUE_VAGUE: &str = "Contains vague or ambiguous language";
pub const ISSUE_ONE_SIDED: &str = "Contains potentially one-sided terms";
pub const ISSUE_UNLIMITED: &str = "Contains unlimited obligations or liability";
pub const ISSUE_PERPETUAL: &str = "Contains perpetual or indefinite terms";
pub const ISSUE_LIABILITY_WAIVER: &str = "Complete liability waiver detected";
pub const ISSUE_NO_NOTICE: &str = "Allows termination without notice";

/// Whether `term` occurs in `haystack` starting at a word boundary.
///
/// Both sides must already be lowercase. Matching only at word starts keeps
/// short keywords such as "ip" or "end" from firing inside other words,
/// while still matching inflections ("terminate" in "terminated").
pub(crate) fn contains_term(haystack: &str, term: &str) -> bool {
    term_pattern(term).is_match(haystack)
}

/// Compiled `\b{term}` patterns, built on first use.
static TERM_PATTERNS: LazyLock<Mutex<HashMap<String, Regex>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

fn term_pattern(term: &str) -> Regex {
    let mut patterns = TERM_PATTERNS
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    patterns
        .entry(term.to_string())
        .or_insert_with(|| Regex::new(&format!(r"\b{}", regex::escape(term))).unwrap())
        .clone()
}

/// Split text into trimmed sentences with their byte offsets.
///
/// A sentence ends at `.`, `!` or `?` followed by whitespace, or at a blank
/// line.
pub(crate) fn split_sentences(text: &str) -> Vec<(usize, usize, &str)> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        let next = chars.peek().map(|&(_, n)| n);
        let boundary = match c {
            '.' | '!' | '?' => next.map(char::is_whitespace).unwrap_or(true),
            '\n' => next == Some('\n'),
            _ => false,
        };
        if boundary {
            let end = idx + c.len_utf8();
            push_trimmed(text, start, end, &mut sentences);
            start = end;
        }
    }
    push_trimmed(text, start, text.len(), &mut sentences);
    sentences
}

fn push_trimmed<'a>(text: &'a str, start: usize, end: usize, out: &mut Vec<(usize, usize, &'a str)>) {
    let raw = &text[start..end];
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return;
    }
    let lead = raw.len() - raw.trim_start().len();
    let s = start + lead;
    out.push((s, s + trimmed.len(), trimmed));
}

/// Pick the best-scoring category for a sentence.
///
/// Returns `(category, confidence)` or `None` when no keyword matches.
/// Ties go to the category listed first.
pub fn classify(sentence: &str) -> Option<(&'static str, f64)> {
    let lower = sentence.to_lowercase();
    let mut best: Option<(&'static str, usize)> = None;

    for &(category, keywords) in CLAUSE_CATEGORIES {
        let score: usize = keywords
            .iter()
            .filter(|kw| contains_term(&lower, kw))
            .map(|kw| kw.split_whitespace().count())
            .sum();
        if score > best.map(|(_, s)| s).unwrap_or(0) {
            best = Some((category, score));
        }
    }

    best.map(|(category, score)| (category, (0.5 + score as f64 * 0.1).min(1.0)))
}

/// Score a clause's risk from its wording and category, capped at 100.
pub fn clause_risk(text: &str, category: &str) -> (RiskLevel, f64) {
    let lower = text.to_lowercase();
    let mut score = 0.0;

    score += 25.0 * HIGH_RISK_TERMS.iter().filter(|t| contains_term(&lower, t)).count() as f64;
    score += 10.0 * MEDIUM_RISK_TERMS.iter().filter(|t| contains_term(&lower, t)).count() as f64;

    score += match category {
        "liability" => 15.0,
        "termination" | "intellectual_property" => 10.0,
        _ => 0.0,
    };

    let score = f64::min(score, 100.0);
    (RiskLevel::from_score(score), score)
}

pub fn identify_issues(text: &str, category: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let any = |terms: &[&str]| terms.iter().any(|t| contains_term(&lower, t));
    let mut issues = Vec::new();

    if any(VAGUE_TERMS) {
        issues.push(ISSUE_VAGUE);
    }
    if any(ONE_SIDED_TERMS) {
        issues.push(ISSUE_ONE_SIDED);
    }
    if any(&["unlimited", "without limit"][..]) {
        issues.push(ISSUE_UNLIMITED);
    }
    if any(&["perpetual", "indefinite"][..]) {
        issues.push(ISSUE_PERPETUAL);
    }
    if category == "liability" && contains_term(&lower, "no liability") {
        issues.push(ISSUE_LIABILITY_WAIVER);
    }
    if category == "termination" && contains_term(&lower, "without notice") {
        issues.push(ISSUE_NO_NOTICE);
    }

    issues.into_iter().map(String::from).collect()
}

pub fn recommendations_for(issues: &[String], category: &str) -> Vec<String> {
    let mut recs: Vec<&str> = issues
        .iter()
        .filter_map(|issue| match issue.as_str() {
            ISSUE_VAGUE => Some("Request clarification or specific definitions for ambiguous terms"),
            ISSUE_ONE_SIDED => Some("Negotiate for mutual obligations or reciprocal terms"),
            ISSUE_UNLIMITED => Some("Propose reasonable caps or limitations"),
            ISSUE_PERPETUAL => Some("Suggest a defined term with renewal options"),
            ISSUE_LIABILITY_WAIVER => Some("Seek to limit the scope of liability waiver"),
            ISSUE_NO_NOTICE => Some("Request minimum notice period for termination"),
            _ => None,
        })
        .collect();

    if recs.is_empty() {
        match category {
            "confidentiality" => recs.push("Ensure mutual confidentiality obligations"),
            "intellectual_property" => recs.push("Clarify ownership and usage rights"),
            _ => {}
        }
    }

    recs.into_iter().map(String::from).collect()
}

/// Detect and score every classifiable sentence in `text`.
pub fn detect_clauses(text: &str) -> Vec<Clause> {
    split_sentences(text)
        .into_iter()
        .filter(|(_, _, sentence)| sentence.split_whitespace().count() >= MIN_CLAUSE_WORDS)
        .filter_map(|(start, end, sentence)| {
            let (category, confidence) = classify(sentence)?;
            let (risk_level, risk_score) = clause_risk(sentence, category);
            let issues = identify_issues(sentence, category);

            let mut clause = Clause::new(sentence, category);
            clause.start_position = start;
            clause.end_position = end;
            clause.confidence = confidence;
            clause.risk_level = risk_level;
            clause.risk_score = risk_score;
            clause.recommendations = recommendations_for(&issues, category);
            clause.issues = issues;
            Some(clause)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_term_respects_word_start() {
        assert!(contains_term("the ip rights", "ip"));
        assert!(!contains_term("our relationship", "ip"));
        assert!(contains_term("either party may terminate", "terminate"));
        assert!(contains_term("it was terminated.", "terminate"));
        assert!(contains_term("(ip) rights", "ip"));
        assert!(!contains_term("relationship ip-free", "ship"));
        assert!(contains_term("a non-refundable fee", "non-refundable"));
    }

    #[test]
    fn test_split_sentences_offsets() {
        let text = "First sentence here. Second one!\n\nThird";
        let sentences = split_sentences(text);
        assert_eq!(sentences.len(), 3);
        let (start, end, s) = sentences[1];
        assert_eq!(s, "Second one!");
        assert_eq!(&text[start..end], s);
    }

    #[test]
    fn test_split_keeps_decimal_numbers() {
        let sentences = split_sentences("The fee is 10.50 dollars per hour. Done.");
        assert_eq!(sentences[0].2, "The fee is 10.50 dollars per hour.");
    }

    #[test]
    fn test_classify_prefers_multiword_keywords() {
        let (category, confidence) =
            classify("This agreement is subject to the governing law of Delaware").unwrap();
        assert_eq!(category, "governing_law");
        assert!((confidence - 0.7).abs() < 1e-9);
        assert!(classify("Nothing relevant appears in this sentence").is_none());
    }

    #[test]
    fn test_clause_risk_scoring() {
        let (level, score) = clause_risk(
            "The Supplier shall have unlimited and irrevocable liability",
            "liability",
        );
        assert_eq!(score, 65.0);
        assert_eq!(level, RiskLevel::High);

        let (_, capped) = clause_risk(
            "unlimited perpetual irrevocable exclusive waive forfeit",
            "liability",
        );
        assert_eq!(capped, 100.0);
    }

    #[test]
    fn test_issues_and_recommendations() {
        let issues = identify_issues(
            "Company may terminate this agreement without notice at its sole discretion",
            "termination",
        );
        assert!(issues.contains(&ISSUE_ONE_SIDED.to_string()));
        assert!(issues.contains(&ISSUE_NO_NOTICE.to_string()));

        let recs = recommendations_for(&issues, "termination");
        assert_eq!(recs.len(), 2);

        let fallback = recommendations_for(&[], "confidentiality");
        assert_eq!(fallback, vec!["Ensure mutual confidentiality obligations"]);
    }

    #[test]
    fn test_detect_clauses_skips_short_sentences() {
        let text = "Payment due. The Client shall pay each invoice within thirty days.";
        let clauses = detect_clauses(text);
        assert_eq!(clauses.len(), 1);
        assert_eq!(clauses[0].category, "payment");
        assert_eq!(&text[clauses[0].start_position..clauses[0].end_position], clauses[0].text);
    }
}
