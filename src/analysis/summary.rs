//! Rule-based document summary.

use super::clauses::contains_term;
use super::risk::excerpt;
use crate::models::{Clause, DocumentSummary, KeyTerm, TermCategory, TermMention};

const MAX_LISTED: usize = 5;
const EXCERPT_CHARS: usize = 150;
const DEFAULT_TYPE: &str = "Legal Contract";
const DEFAULT_PURPOSE: &str = "To establish legal obligations and rights between parties";

/// Document type, its indicator keywords, and its stated purpose.
/// The first type with any matching keyword wins.
const DOCUMENT_TYPES: &[(&str, &[&str], &str)] = &[
    (
        "Non-Disclosure Agreement (NDA)",
        &["non-disclosure", "nda", "confidential information"],
        "To protect confidential information shared between parties",
    ),
    (
        "Service Agreement",
        &["service agreement", "services", "provider", "client"],
        "To define terms for provision of services",
    ),
    (
        "Employment Contract",
        &["employment", "employee", "employer", "position", "salary"],
        "To establish employment relationship and terms",
    ),
    (
        "License Agreement",
        &["license", "licensor", "licensee", "intellectual property"],
        "To grant rights to use intellectual property",
    ),
    (
        "Lease Agreement",
        &["lease", "landlord", "tenant", "premises", "rent"],
        "To establish rental terms for property",
    ),
    (
        "Purchase Agreement",
        &["purchase", "buyer", "seller", "goods", "merchandise"],
        "To facilitate the purchase and sale of goods",
    ),
    (
        "Partnership Agreement",
        &["partnership", "partners", "profit sharing"],
        "To establish partnership terms and profit sharing",
    ),
    (
        "Consulting Agreement",
        &["consulting", "consultant", "professional services"],
        "To engage consulting services",
    ),
    (
        "Terms of Service",
        &["terms of service", "terms and conditions", "user agreement"],
        "To govern use of services or platform",
    ),
    (
        "Privacy Policy",
        &["privacy policy", "personal data", "data protection"],
        "To explain data collection and usage practices",
    ),
];

const OBLIGATION_KEYWORDS: &[&str] = &[
    "shall",
    "must",
    "required to",
    "obligated to",
    "agrees to",
    "undertakes to",
    "responsible for",
];

const RIGHTS_KEYWORDS: &[&str] = &[
    "entitled to",
    "right to",
    "may",
    "permitted to",
    "authorized to",
    "privilege",
];

/// Returns `(document_type, purpose)`.
pub fn detect_document_type(text: &str) -> (&'static str, &'static str) {
    let lower = text.to_lowercase();
    DOCUMENT_TYPES
        .iter()
        .find(|(_, keywords, _)| keywords.iter().any(|k| contains_term(&lower, k)))
        .map(|&(name, _, purpose)| (name, purpose))
        .unwrap_or((DEFAULT_TYPE, DEFAULT_PURPOSE))
}

fn clauses_matching(clauses: &[Clause], keywords: &[&str]) -> Vec<String> {
    clauses
        .iter()
        .filter(|c| {
            let lower = c.text.to_lowercase();
            keywords.iter().any(|k| contains_term(&lower, k))
        })
        .take(MAX_LISTED)
        .map(|c| excerpt(&c.text, EXCERPT_CHARS))
        .collect()
}

fn mentions(key_terms: &[KeyTerm], category: TermCategory) -> Vec<TermMention> {
    key_terms
        .iter()
        .filter(|t| t.category == category)
        .take(MAX_LISTED)
        .map(|t| TermMention {
            value: t.text.clone(),
            context: t.context.first().cloned().unwrap_or_default(),
        })
        .collect()
}

fn executive_summary(summary: &DocumentSummary, clauses: &[Clause]) -> String {
    let mut parts = vec![format!(
        "This is a {}. {}.",
        summary.document_type, summary.purpose
    )];

    match summary.parties.as_slice() {
        [] | [_] => {}
        [a, b] => parts.push(format!("The agreement is between {} and {}.", a, b)),
        many => parts.push(format!(
            "The parties involved include {}.",
            many[..3].join(", ")
        )),
    }

    if let Some(money) = summary.monetary_values.first() {
        parts.push(format!("Key financial terms include {}.", money.value));
    }
    if let Some(date) = summary.important_dates.first() {
        parts.push(format!("Important dates: {}.", date.value));
    }

    let elevated = clauses.iter().filter(|c| c.risk_level.is_elevated()).count();
    if elevated > 0 {
        parts.push(format!(
            "The document contains {} high-risk clauses requiring careful review.",
            elevated
        ));
    } else {
        parts.push(
            "The document appears to have standard terms with no critical risk factors.".into(),
        );
    }

    parts.join(" ")
}

pub fn summarize(text: &str, clauses: &[Clause], key_terms: &[KeyTerm]) -> DocumentSummary {
    let (document_type, purpose) = detect_document_type(text);

    let mut parties: Vec<String> = Vec::new();
    for term in key_terms.iter().filter(|t| t.category == TermCategory::Party) {
        if !parties.contains(&term.text) {
            parties.push(term.text.clone());
        }
    }
    parties.truncate(MAX_LISTED);

    let mut summary = DocumentSummary {
        document_type: document_type.to_string(),
        purpose: purpose.to_string(),
        parties,
        key_obligations: clauses_matching(clauses, OBLIGATION_KEYWORDS),
        key_rights: clauses_matching(clauses, RIGHTS_KEYWORDS),
        important_dates: mentions(key_terms, TermCategory::Date),
        monetary_values: mentions(key_terms, TermCategory::Money),
        executive_summary: String::new(),
    };
    summary.executive_summary = executive_summary(&summary, clauses);
    summary
}
