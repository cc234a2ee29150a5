//! Diff Engine
//!
//! Renders two normalized values as YAML documents and compares them line by
//! line. Output keeps every line: `' '` for common lines, `'-'` for lines
//! only in the remote view and `'+'` for lines only in the local snapshot.
//! Memory stays linear in the number of lines.

use crate::error::Result;
use crate::engine::snapshot::SnapshotFormat;
use serde_json::Value;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Line<'a> {
    Same(&'a str),
    Removed(&'a str),
    Added(&'a str),
}

/// Structural diff of `remote` against `local`; empty when they are equal.
pub fn diff_values(remote: &Value, local: &Value) -> Result<String> {
    let remote_text = yaml_document(remote)?;
    let local_text = yaml_document(local)?;
    Ok(diff_text(&remote_text, &local_text))
}

fn yaml_document(value: &Value) -> Result<String> {
    let body = SnapshotFormat::Yaml.render(value)?;
    Ok(format!("---\n{body}"))
}

/// Full-context line diff of two texts; empty when they are equal.
pub fn diff_text(old: &str, new: &str) -> String {
    if old == new {
        return String::new();
    }
    let old_lines: Vec<&str> = old.lines().collect();
    let new_lines: Vec<&str> = new.lines().collect();

    diff_lines(&old_lines, &new_lines)
        .into_iter()
        .map(|line| match line {
            Line::Same(l) => format!(" {l}"),
            Line::Removed(l) => format!("-{l}"),
            Line::Added(l) => format!("+{l}"),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn diff_lines<'a>(old: &[&'a str], new: &[&'a str]) -> Vec<Line<'a>> {
    let prefix = old
        .iter()
        .zip(new.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let suffix = old[prefix..]
        .iter()
        .rev()
        .zip(new[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let old_mid = &old[prefix..old.len() - suffix];
    let new_mid = &new[prefix..new.len() - suffix];

    let mut out: Vec<Line<'a>> = old[..prefix].iter().map(|l| Line::Same(*l)).collect();
    let seen: HashSet<&str> = new_mid.iter().copied().collect();
    if old_mid.iter().any(|l| seen.contains(l)) {
        let mut changed = Vec::with_capacity(old_mid.len() + new_mid.len());
        lcs_diff(old_mid, new_mid, &mut changed);
        out.extend(removals_first(changed));
    } else {
        // Nothing in common: a full replacement
        out.extend(old_mid.iter().map(|l| Line::Removed(*l)));
        out.extend(new_mid.iter().map(|l| Line::Added(*l)));
    }
    out.extend(old[old.len() - suffix..].iter().map(|l| Line::Same(*l)));
    out
}

/// Longest-common-subsequence diff in linear space (Hirschberg): split
/// `old` in half and find where `new` splits so both halves stay optimal.
fn lcs_diff<'a>(old: &[&'a str], new: &[&'a str], out: &mut Vec<Line<'a>>) {
    if old.is_empty() {
        out.extend(new.iter().map(|l| Line::Added(*l)));
        return;
    }
    if new.is_empty() {
        out.extend(old.iter().map(|l| Line::Removed(*l)));
        return;
    }
    if old.len() == 1 {
        match new.iter().position(|l| *l == old[0]) {
            Some(j) => {
                out.extend(new[..j].iter().map(|l| Line::Added(*l)));
                out.push(Line::Same(old[0]));
                out.extend(new[j + 1..].iter().map(|l| Line::Added(*l)));
            }
            None => {
                out.push(Line::Removed(old[0]));
                out.extend(new.iter().map(|l| Line::Added(*l)));
            }
        }
        return;
    }

    let mid = old.len() / 2;
    let head = lcs_prefix_lengths(&old[..mid], new);
    let tail = lcs_suffix_lengths(&old[mid..], new);

    let mut split = 0;
    for j in 1..=new.len() {
        if head[j] + tail[j] > head[split] + tail[split] {
            split = j;
        }
    }

    lcs_diff(&old[..mid], &new[..split], out);
    lcs_diff(&old[mid..], &new[split..], out);
}

/// `lengths[j]` = LCS length of `old` and `new[..j]`
fn lcs_prefix_lengths(old: &[&str], new: &[&str]) -> Vec<usize> {
    let mut prev = vec![0usize; new.len() + 1];
    let mut cur = vec![0usize; new.len() + 1];
    for line in old {
        for j in 1..=new.len() {
            cur[j] = if *line == new[j - 1] {
                prev[j - 1] + 1
            } else {
                prev[j].max(cur[j - 1])
            };
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev
}

/// `lengths[j]` = LCS length of `old` and `new[j..]`
fn lcs_suffix_lengths(old: &[&str], new: &[&str]) -> Vec<usize> {
    let m = new.len();
    let mut prev = vec![0usize; m + 1];
    let mut cur = vec![0usize; m + 1];
    for line in old.iter().rev() {
        for j in (0..m).rev() {
            cur[j] = if *line == new[j] {
                prev[j + 1] + 1
            } else {
                prev[j].max(cur[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev
}

/// Reorder every run of changed lines so its removals precede its additions
fn removals_first(lines: Vec<Line<'_>>) -> Vec<Line<'_>> {
    let mut out = Vec::with_capacity(lines.len());
    let mut added = Vec::new();
    for line in lines {
        match line {
            Line::Same(_) => {
                out.append(&mut added);
                out.push(line);
            }
            Line::Removed(_) => out.push(line),
            Line::Added(_) => added.push(line),
        }
    }
    out.append(&mut added);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_equal_values_have_no_diff() {
        let value = json!({"name": "cpu", "tags": ["a"]});
        assert_eq!(diff_values(&value, &value).unwrap(), "");
    }

    #[test]
    fn test_changed_scalar() {
        let remote = json!({"name": "cpu", "threshold": 80});
        let local = json!({"name": "cpu", "threshold": 90});
        assert_eq!(
            diff_values(&remote, &local).unwrap(),
            " ---\n name: cpu\n-threshold: 80\n+threshold: 90"
        );
    }

    #[test]
    fn test_text_diff_keeps_context_and_orders_removals_first() {
        let diff = diff_text("a\nb\nc\nd", "a\nx\nc\nd\ne");
        assert_eq!(diff, " a\n-b\n+x\n c\n d\n+e");
    }

    #[test]
    fn test_full_replacement() {
        let remote = json!({
            "data": {
                "attributes": {"name": "Test Workflow"},
                "id": "abc-123-def",
                "type": "workflows"
            }
        });
        let local = json!({"a": "b"});
        assert_eq!(
            diff_values(&remote, &local).unwrap(),
            " ---\n-data:\n-  attributes:\n-    name: Test Workflow\n-  id: abc-123-def\n-  type: workflows\n+a: b"
        );
    }

    #[test]
    fn test_large_disjoint_texts_are_a_full_replacement() {
        let old: Vec<String> = (0..8000).map(|i| format!("old_{i}: {i}")).collect();
        let new: Vec<String> = (0..8000).map(|i| format!("new_{i}: {i}")).collect();
        let diff = diff_text(&old.join("\n"), &new.join("\n"));

        let lines: Vec<&str> = diff.lines().collect();
        assert_eq!(lines.len(), 16000);
        assert!(lines[..8000].iter().all(|l| l.starts_with("-old_")));
        assert!(lines[8000..].iter().all(|l| l.starts_with("+new_")));
    }

    #[test]
    fn test_large_interleaved_edit_keeps_common_lines() {
        let old: Vec<String> = (0..3000).map(|i| format!("line {i}")).collect();
        let new: Vec<String> = (0..3000)
            .map(|i| {
                if i % 3 == 0 {
                    format!("changed {i}")
                } else {
                    format!("line {i}")
                }
            })
            .collect();
        let diff = diff_text(&old.join("\n"), &new.join("\n"));

        let count = |prefix: char| diff.lines().filter(|l| l.starts_with(prefix)).count();
        assert_eq!(count(' '), 2000);
        assert_eq!(count('-'), 1000);
        assert_eq!(count('+'), 1000);
        assert!(diff.starts_with("-line 0\n+changed 0\n line 1\n line 2\n-line 3\n+changed 3"));
    }
}
