//! Document-level risk assessment from detected clauses.

use std::collections::BTreeSet;

use crate::models::{Clause, RiskAssessment, RiskFactor, RiskLevel, UnfavorableTerm};

/// Weights of the four risk factors; they sum to 1.
pub const WEIGHT_UNFAVORABLE: f64 = 0.4;
pub const WEIGHT_MISSING: f64 = 0.3;
pub const WEIGHT_AMBIGUITY: f64 = 0.2;
pub const WEIGHT_UNUSUAL: f64 = 0.1;

/// Categories every contract is expected to carry, with display names.
pub const ESSENTIAL_CLAUSES: &[(&str, &str)] = &[
    ("confidentiality", "Confidentiality/Non-Disclosure"),
    ("liability", "Limitation of Liability"),
    ("termination", "Termination Conditions"),
    ("payment", "Payment Terms"),
    ("dispute_resolution", "Dispute Resolution/Arbitration"),
    ("governing_law", "Governing Law and Jurisdiction"),
];

const UNFAVORABLE_EXCERPT_CHARS: usize = 200;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Percentage of clauses matching `pred`, 0 when there are none.
fn share(clauses: &[Clause], pred: impl Fn(&Clause) -> bool) -> f64 {
    if clauses.is_empty() {
        return 0.0;
    }
    clauses.iter().filter(|&c| pred(c)).count() as f64 / clauses.len() as f64 * 100.0
}

fn has_issue(clause: &Clause, needles: &[&str]) -> bool {
    clause.issues.iter().any(|issue| {
        let lower = issue.to_lowercase();
        needles.iter().any(|n| lower.contains(n))
    })
}

pub(crate) fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

fn missing_clauses(clauses: &[Clause]) -> Vec<String> {
    let present: BTreeSet<&str> = clauses.iter().map(|c| c.category.as_str()).collect();
    ESSENTIAL_CLAUSES
        .iter()
        .filter(|(category, _)| !present.contains(category))
        .map(|(_, name)| name.to_string())
        .collect()
}

fn factor(name: &str, score: f64, what: &str) -> Option<RiskFactor> {
    (score > 0.0).then(|| RiskFactor {
        factor: name.to_string(),
        score: round2(score),
        severity: RiskLevel::from_score(score),
        description: format!("{:.1}% of {}", score, what),
    })
}

/// Assess overall document risk.
pub fn assess(clauses: &[Clause]) -> RiskAssessment {
    let unfavorable = share(clauses, |c| c.risk_level.is_elevated());
    let missing_names = missing_clauses(clauses);
    let missing = missing_names.len() as f64 / ESSENTIAL_CLAUSES.len() as f64 * 100.0;
    let ambiguity = share(clauses, |c| has_issue(c, &["vague", "ambiguous"]));
    let unusual = share(clauses, |c| has_issue(c, &["unlimited", "perpetual"]));

    let overall = unfavorable * WEIGHT_UNFAVORABLE
        + missing * WEIGHT_MISSING
        + ambiguity * WEIGHT_AMBIGUITY
        + unusual * WEIGHT_UNUSUAL;

    let unfavorable_terms: Vec<UnfavorableTerm> = clauses
        .iter()
        .filter(|c| c.risk_level.is_elevated())
        .map(|c| UnfavorableTerm {
            clause_id: c.id.clone(),
            category: c.category.clone(),
            text: excerpt(&c.text, UNFAVORABLE_EXCERPT_CHARS),
            risk_level: c.risk_level,
            issues: c.issues.clone(),
        })
        .collect();

    let risk_factors = [
        factor("Unfavorable Terms", unfavorable, "clauses contain potentially unfavorable terms"),
        factor("Missing Clauses", missing, "essential clauses are missing"),
        factor("Ambiguous Language", ambiguity, "clauses contain vague or ambiguous language"),
        factor("Unusual Obligations", unusual, "clauses contain unusual or extreme obligations"),
    ]
    .into_iter()
    .flatten()
    .collect();

    let mut assessment = RiskAssessment {
        overall_risk_level: RiskLevel::from_score(overall),
        overall_risk_score: round2(overall),
        risk_factors,
        missing_clauses: missing_names,
        unfavorable_terms,
        recommendations: Vec::new(),
    };
    assessment.recommendations = recommendations(&assessment);
    assessment
}

fn recommendations(assessment: &RiskAssessment) -> Vec<String> {
    let mut recs = vec![match assessment.overall_risk_level {
        RiskLevel::Critical => "CRITICAL: This document contains significant risks. Legal review is strongly recommended before signing.".to_string(),
        RiskLevel::High => "HIGH RISK: Multiple concerning clauses detected. Consider negotiating key terms.".to_string(),
        RiskLevel::Medium => "MODERATE RISK: Some areas of concern. Review highlighted clauses carefully.".to_string(),
        RiskLevel::Low => "LOW RISK: Document appears relatively balanced. Standard review recommended.".to_string(),
    }];

    if !assessment.missing_clauses.is_empty() {
        let first: Vec<&str> = assessment
            .missing_clauses
            .iter()
            .take(3)
            .map(String::as_str)
            .collect();
        recs.push(format!("Add missing essential clauses: {}", first.join(", ")));
    }

    if assessment.unfavorable_terms.len() > 3 {
        recs.push(format!(
            "Negotiate or clarify {} high-risk clauses",
            assessment.unfavorable_terms.len()
        ));
    }

    if assessment
        .unfavorable_terms
        .iter()
        .any(|t| t.category == "liability")
    {
        recs.push(
            "Review liability limitations carefully - consider adding caps or exclusions".into(),
        );
    }

    let missing = |name: &str| assessment.missing_clauses.iter().any(|m| m == name);
    if missing("Termination Conditions") {
        recs.push("Add clear termination clause with notice periods and conditions".into());
    }
    if missing("Dispute Resolution/Arbitration") {
        recs.push("Include dispute resolution mechanism to avoid costly litigation".into());
    }

    recs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clause(category: &str, level: RiskLevel, issues: &[&str]) -> Clause {
        let mut c = Clause::new(format!("A {} clause text", category), category);
        c.risk_level = level;
        c.issues = issues.iter().map(|s| s.to_string()).collect();
        c
    }

    #[test]
    fn test_empty_document_is_missing_everything() {
        let assessment = assess(&[]);
        assert_eq!(assessment.missing_clauses.len(), ESSENTIAL_CLAUSES.len());
        // Only the missing-clause factor contributes: 100 * 0.3.
        assert_eq!(assessment.overall_risk_score, 30.0);
        assert_eq!(assessment.overall_risk_level, RiskLevel::Medium);
        assert_eq!(assessment.risk_factors.len(), 1);
    }

    #[test]
    fn test_weighted_score() {
        let clauses: Vec<Clause> = ESSENTIAL_CLAUSES
            .iter()
            .map(|(cat, _)| clause(cat, RiskLevel::Low, &[]))
            .chain([clause(
                "warranty",
                RiskLevel::High,
                &["Contains vague or ambiguous language"],
            )])
            .collect();

        let assessment = assess(&clauses);
        // 1/7 unfavorable and 1/7 ambiguous: (14.2857 * 0.4) + (14.2857 * 0.2).
        assert_eq!(assessment.overall_risk_score, 8.57);
        assert!(assessment.missing_clauses.is_empty());
        assert_eq!(assessment.unfavorable_terms.len(), 1);
        assert_eq!(assessment.overall_risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_liability_recommendation() {
        let assessment = assess(&[clause("liability", RiskLevel::Critical, &[])]);
        assert!(assessment
            .recommendations
            .iter()
            .any(|r| r.starts_with("Review liability limitations")));
        assert!(assessment
            .recommendations
            .iter()
            .any(|r| r.starts_with("Add clear termination clause")));
    }

    #[test]
    fn test_excerpt_truncates_on_char_boundary() {
        assert_eq!(excerpt("short", 10), "short");
        assert_eq!(excerpt("ééééé", 2), "éé...");
    }
}
