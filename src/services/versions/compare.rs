//! Clause comparison strategies.

use std::collections::{BTreeMap, BTreeSet};

use crate::models::{Clause, ClauseChanges, ModifiedClause};

/// Category-level differences between two clause lists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClauseDelta {
    /// Categories present only in the newer list, sorted.
    pub added: Vec<String>,
    /// Categories present only in the older list, sorted.
    pub removed: Vec<String>,
    pub modified: usize,
}

/// How clauses of two documents are matched against each other.
pub trait ClauseComparison: Send + Sync {
    /// Summary counts used in a version's change record.
    fn delta(&self, previous: &[Clause], current: &[Clause]) -> ClauseDelta;

    /// Detailed clause pairs used by version comparison.
    fn compare(&self, old: &[Clause], new: &[Clause]) -> ClauseChanges;
}

/// Matches clauses by category alone.
///
/// When several clauses share a category, `delta` counts every older clause
/// that has a differently worded newer clause of the same category, so the
/// modified count can exceed the number of categories. `compare` keeps only
/// the last clause of each category on either side.
#[derive(Debug, Clone, Copy, Default)]
pub struct CategoryComparison;

fn categories(clauses: &[Clause]) -> BTreeSet<&str> {
    clauses.iter().map(|c| c.category.as_str()).collect()
}

fn last_by_category(clauses: &[Clause]) -> BTreeMap<&str, &Clause> {
    clauses.iter().map(|c| (c.category.as_str(), c)).collect()
}

impl ClauseComparison for CategoryComparison {
    fn delta(&self, previous: &[Clause], current: &[Clause]) -> ClauseDelta {
        let before = categories(previous);
        let after = categories(current);

        let modified = previous
            .iter()
            .filter(|old| {
                current
                    .iter()
                    .any(|new| new.category == old.category && new.text != old.text)
            })
            .count();

        ClauseDelta {
            added: after.difference(&before).map(|c| c.to_string()).collect(),
            removed: before.difference(&after).map(|c| c.to_string()).collect(),
            modified,
        }
    }

    fn compare(&self, old: &[Clause], new: &[Clause]) -> ClauseChanges {
        let old_map = last_by_category(old);
        let new_map = last_by_category(new);

        let added = new_map
            .iter()
            .filter(|(cat, _)| !old_map.contains_key(*cat))
            .map(|(_, clause)| (*clause).clone())
            .collect();
        let removed = old_map
            .iter()
            .filter(|(cat, _)| !new_map.contains_key(*cat))
            .map(|(_, clause)| (*clause).clone())
            .collect();
        let modified = old_map
            .iter()
            .filter_map(|(cat, before)| {
                let after = new_map.get(cat)?;
                (before.text != after.text).then(|| ModifiedClause {
                    category: cat.to_string(),
                    old: (*before).clone(),
                    new: (*after).clone(),
                })
            })
            .collect();

        ClauseChanges {
            added,
            removed,
            modified,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clause(category: &str, text: &str) -> Clause {
        Clause::new(text, category)
    }

    #[test]
    fn test_disjoint_categories() {
        let old = vec![clause("warranty", "w"), clause("liability", "l")];
        let new = vec![clause("payment", "p")];
        let delta = CategoryComparison.delta(&old, &new);
        assert_eq!(delta.added, vec!["payment"]);
        assert_eq!(delta.removed, vec!["liability", "warranty"]);
        assert_eq!(delta.modified, 0);
    }

    #[test]
    fn test_modified_count_overcounts_shared_categories() {
        let old = vec![clause("payment", "a"), clause("payment", "b")];
        let new = vec![clause("payment", "c")];
        assert_eq!(CategoryComparison.delta(&old, &new).modified, 2);

        // An identical clause alongside a changed one still counts as modified.
        let new = vec![clause("payment", "a"), clause("payment", "z")];
        assert_eq!(CategoryComparison.delta(&old, &new).modified, 2);
    }

    #[test]
    fn test_compare_uses_last_clause_per_category() {
        let old = vec![clause("payment", "first"), clause("payment", "second")];
        let new = vec![clause("payment", "second"), clause("assignment", "assign")];
        let changes = CategoryComparison.compare(&old, &new);

        assert!(changes.modified.is_empty());
        assert_eq!(changes.added.len(), 1);
        assert_eq!(changes.added[0].category, "assignment");
        assert!(changes.removed.is_empty());
    }

    #[test]
    fn test_compare_reports_modified_pair() {
        let old = vec![clause("termination", "30 days notice")];
        let new = vec![clause("termination", "without notice")];
        let changes = CategoryComparison.compare(&old, &new);
        assert_eq!(changes.modified.len(), 1);
        assert_eq!(changes.modified[0].old.text, "30 days notice");
        assert_eq!(changes.modified[0].new.text, "without notice");
    }
}
