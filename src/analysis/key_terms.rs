//! Key term extraction: parties, dates, and monetary amounts.

use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use super::clauses::split_sentences;
use crate::models::{KeyTerm, TermCategory};

pub const MAX_KEY_TERMS: usize = 20;
const MAX_MONEY_TERMS: usize = 5;
const MAX_DATE_TERMS: usize = 5;
const MAX_PARTY_TERMS: usize = 10;
const MAX_CONTEXTS: usize = 3;
/// Bytes of surrounding text kept as context for a monetary amount.
const MONEY_CONTEXT_BYTES: usize = 100;

static MONEY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\$[\d,]+(?:\.\d{2})?|\b\d+(?:,\d{3})*(?:\.\d{2})?\s*(?:dollars|USD|EUR|GBP)\b",
    )
    .unwrap()
});

static DATE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        // January 15, 2024 / Jan. 15 2024
        Regex::new(r"\b(?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Sept|Oct|Nov|Dec)[a-z]*\.?\s+\d{1,2}(?:st|nd|rd|th)?,?\s+\d{4}\b").unwrap(),
        // 15 January 2024
        Regex::new(r"\b\d{1,2}(?:st|nd|rd|th)?\s+(?:January|February|March|April|May|June|July|August|September|October|November|December)\s+\d{4}\b").unwrap(),
        // 2024-01-15
        Regex::new(r"\b\d{4}-\d{2}-\d{2}\b").unwrap(),
        // 01/15/2024
        Regex::new(r"\b\d{1,2}/\d{1,2}/\d{4}\b").unwrap(),
    ]
});

/// Capitalized names ending in a corporate suffix, e.g. "Acme Widgets, Inc."
static PARTY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:[A-Z][A-Za-z&'\-]*\s+){1,4}(?:Inc|LLC|L\.L\.C|Ltd|Limited|Corp|Corporation|Company|LLP|GmbH|PLC|LP)\b\.?",
    )
    .unwrap()
});

/// Shift `idx` down to the nearest char boundary.
fn floor_boundary(text: &str, mut idx: usize) -> usize {
    while idx > 0 && !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn ceil_boundary(text: &str, mut idx: usize) -> usize {
    while idx < text.len() && !text.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

/// The sentence containing byte offset `pos`.
fn sentence_at<'a>(sentences: &[(usize, usize, &'a str)], pos: usize) -> Option<&'a str> {
    sentences
        .iter()
        .find(|(start, end, _)| *start <= pos && pos < *end)
        .map(|(_, _, s)| *s)
}

fn monetary_values(text: &str) -> Vec<KeyTerm> {
    let mut seen = HashSet::new();
    MONEY_PATTERN
        .find_iter(text)
        .filter(|m| seen.insert(m.as_str().to_string()))
        .take(MAX_MONEY_TERMS)
        .map(|m| {
            let start = floor_boundary(text, m.start().saturating_sub(MONEY_CONTEXT_BYTES));
            let end = ceil_boundary(text, (m.end() + MONEY_CONTEXT_BYTES).min(text.len()));
            KeyTerm {
                text: m.as_str().to_string(),
                category: TermCategory::Money,
                frequency: 1,
                importance_score: 80.0,
                context: vec![text[start..end].trim().to_string()],
            }
        })
        .collect()
}

fn dates(text: &str, sentences: &[(usize, usize, &str)]) -> Vec<KeyTerm> {
    let mut matches: Vec<(usize, &str)> = DATE_PATTERNS
        .iter()
        .flat_map(|re| re.find_iter(text).map(|m| (m.start(), m.as_str())))
        .collect();
    matches.sort_by_key(|(start, _)| *start);

    let mut seen = HashSet::new();
    matches
        .into_iter()
        .filter(|(_, value)| seen.insert(*value))
        .take(MAX_DATE_TERMS)
        .map(|(start, value)| KeyTerm {
            text: value.to_string(),
            category: TermCategory::Date,
            frequency: 1,
            importance_score: 70.0,
            context: sentence_at(sentences, start)
                .map(|s| vec![s.to_string()])
                .unwrap_or_default(),
        })
        .collect()
}

fn parties(text: &str, sentences: &[(usize, usize, &str)]) -> Vec<KeyTerm> {
    // name -> (frequency, contexts, first offset)
    let mut found: BTreeMap<String, (usize, Vec<String>, usize)> = BTreeMap::new();

    for m in PARTY_PATTERN.find_iter(text) {
        let name = m.as_str().trim_end_matches('.').trim().to_string();
        let entry = found.entry(name).or_insert((0, Vec::new(), m.start()));
        entry.0 += 1;
        if let Some(sentence) = sentence_at(sentences, m.start()) {
            if entry.1.len() < MAX_CONTEXTS && !entry.1.iter().any(|c| c == sentence) {
                entry.1.push(sentence.to_string());
            }
        }
    }

    let mut ranked: Vec<(String, (usize, Vec<String>, usize))> = found.into_iter().collect();
    ranked.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .2.cmp(&b.1 .2)));

    ranked
        .into_iter()
        .take(MAX_PARTY_TERMS)
        .map(|(name, (frequency, context, _))| KeyTerm {
            text: name,
            category: TermCategory::Party,
            frequency,
            importance_score: (frequency as f64 * 10.0).min(100.0),
            context,
        })
        .collect()
}

/// Extract key terms, most important first.
pub fn extract(text: &str) -> Vec<KeyTerm> {
    let sentences = split_sentences(text);

    let mut terms = parties(text, &sentences);
    terms.extend(monetary_values(text));
    terms.extend(dates(text, &sentences));

    // Stable sort keeps extraction order among equal scores.
    terms.sort_by(|a, b| b.importance_score.total_cmp(&a.importance_score));
    terms.truncate(MAX_KEY_TERMS);
    terms
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "This Agreement is made between Acme Widgets Inc. and Globex Corporation. \
        Acme Widgets Inc. shall pay $12,500.00 on January 15, 2024. \
        A late fee of 250 USD applies after 2024-02-01.";

    #[test]
    fn test_money_terms() {
        let terms = monetary_values(SAMPLE);
        let values: Vec<&str> = terms.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(values, vec!["$12,500.00", "250 USD"]);
        assert!(terms[0].context[0].contains("shall pay"));
    }

    #[test]
    fn test_date_terms_in_text_order() {
        let sentences = split_sentences(SAMPLE);
        let terms = dates(SAMPLE, &sentences);
        let values: Vec<&str> = terms.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(values, vec!["January 15, 2024", "2024-02-01"]);
        assert!(terms[1].context[0].starts_with("A late fee"));
    }

    #[test]
    fn test_party_frequency_and_importance() {
        let sentences = split_sentences(SAMPLE);
        let terms = parties(SAMPLE, &sentences);
        assert_eq!(terms[0].text, "Acme Widgets Inc");
        assert_eq!(terms[0].frequency, 2);
        assert_eq!(terms[0].importance_score, 20.0);
        assert!(terms.iter().any(|t| t.text.ends_with("Globex Corporation")));
    }

    #[test]
    fn test_extract_sorted_and_capped() {
        let terms = extract(SAMPLE);
        assert!(terms.len() <= MAX_KEY_TERMS);
        assert!(terms
            .windows(2)
            .all(|w| w[0].importance_score >= w[1].importance_score));
        assert_eq!(terms[0].category, TermCategory::Money);
    }
}
