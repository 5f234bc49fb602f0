//! Line diff between two texts.

use crate::models::{ChangeKind, ChangeMagnitude, TextChange, TextStats};

/// Result of diffing two windows of lines.
#[derive(Debug, Clone, PartialEq)]
pub struct LineDiff {
    pub changes: Vec<TextChange>,
    pub stats: TextStats,
}

enum Op<'a> {
    Equal,
    Delete(&'a str),
    Insert(&'a str),
}

/// Longest-common-subsequence edit script from `a` to `b`.
fn edit_script<'a>(a: &[&'a str], b: &[&'a str]) -> Vec<Op<'a>> {
    let (n, m) = (a.len(), b.len());
    // lcs[i][j] = LCS length of a[i..] and b[j..]
    let mut lcs = vec![vec![0u32; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i][j] = if a[i] == b[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut ops = Vec::with_capacity(n + m);
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if a[i] == b[j] {
            ops.push(Op::Equal);
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            ops.push(Op::Delete(a[i]));
            i += 1;
        } else {
            ops.push(Op::Insert(b[j]));
            j += 1;
        }
    }
    ops.extend(a[i..].iter().map(|&line| Op::Delete(line)));
    ops.extend(b[j..].iter().map(|&line| Op::Insert(line)));
    ops
}

/// Move a pending changed region into `changes`, removals first.
fn flush(removed: &mut Vec<&str>, added: &mut Vec<&str>, changes: &mut Vec<TextChange>) {
    let removals = removed.drain(..).map(|line| TextChange {
        kind: ChangeKind::Removed,
        text: line.to_string(),
    });
    changes.extend(removals);
    let additions = added.drain(..).map(|line| TextChange {
        kind: ChangeKind::Added,
        text: line.to_string(),
    });
    changes.extend(additions);
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Diff the first `line_limit` lines of each text.
///
/// Within each changed region, removed lines are listed before added ones.
/// At most `change_limit` changes are returned; the stats cover the whole
/// window.
pub fn diff_lines(old: &str, new: &str, line_limit: usize, change_limit: usize) -> LineDiff {
    let a: Vec<&str> = old.lines().take(line_limit).collect();
    let b: Vec<&str> = new.lines().take(line_limit).collect();

    let mut changes = Vec::new();
    let mut removed: Vec<&str> = Vec::new();
    let mut added: Vec<&str> = Vec::new();
    let mut matched = 0usize;

    for op in edit_script(&a, &b) {
        match op {
            Op::Equal => {
                matched += 1;
                flush(&mut removed, &mut added, &mut changes);
            }
            Op::Delete(line) => removed.push(line),
            Op::Insert(line) => added.push(line),
        }
    }
    flush(&mut removed, &mut added, &mut changes);

    let total_lines = a.len() + b.len();
    let similarity = if total_lines == 0 {
        100.0
    } else {
        round2(2.0 * matched as f64 / total_lines as f64 * 100.0)
    };
    let lines_added = b.len() - matched;
    let lines_deleted = a.len() - matched;

    changes.truncate(change_limit);

    LineDiff {
        changes,
        stats: TextStats {
            similarity_percentage: similarity,
            lines_added,
            lines_deleted,
            total_changes: lines_added + lines_deleted,
            change_type: ChangeMagnitude::from_similarity(similarity),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(diff: &LineDiff) -> Vec<(ChangeKind, &str)> {
        diff.changes
            .iter()
            .map(|c| (c.kind, c.text.as_str()))
            .collect()
    }

    #[test]
    fn test_identical_texts() {
        let diff = diff_lines("a\nb\nc", "a\nb\nc", 100, 50);
        assert!(diff.changes.is_empty());
        assert_eq!(diff.stats.similarity_percentage, 100.0);
        assert_eq!(diff.stats.change_type, ChangeMagnitude::Minor);
    }

    #[test]
    fn test_replacement_lists_removals_first() {
        let diff = diff_lines("a\nold\nc", "a\nnew\nc", 100, 50);
        assert_eq!(
            kinds(&diff),
            vec![(ChangeKind::Removed, "old"), (ChangeKind::Added, "new")]
        );
        assert_eq!(diff.stats.lines_added, 1);
        assert_eq!(diff.stats.lines_deleted, 1);
        assert_eq!(diff.stats.total_changes, 2);
        // 2 * 2 matched / 6 lines
        assert_eq!(diff.stats.similarity_percentage, 66.67);
        assert_eq!(diff.stats.change_type, ChangeMagnitude::Major);
    }

    #[test]
    fn test_line_and_change_limits() {
        let old: String = (0..10).map(|i| format!("old {}\n", i)).collect();
        let new: String = (0..10).map(|i| format!("new {}\n", i)).collect();

        let diff = diff_lines(&old, &new, 4, 3);
        assert_eq!(diff.changes.len(), 3);
        assert_eq!(diff.stats.lines_deleted, 4);
        assert_eq!(diff.stats.lines_added, 4);
        assert_eq!(diff.stats.change_type, ChangeMagnitude::Substantial);
    }

    #[test]
    fn test_empty_texts() {
        let diff = diff_lines("", "", 100, 50);
        assert!(diff.changes.is_empty());
        assert_eq!(diff.stats.similarity_percentage, 100.0);

        let diff = diff_lines("", "added", 100, 50);
        assert_eq!(kinds(&diff), vec![(ChangeKind::Added, "added")]);
        assert_eq!(diff.stats.similarity_percentage, 0.0);
    }
}
