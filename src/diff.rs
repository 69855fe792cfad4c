//! Line diffs for presenting a candidate fix
//!
//! LCS over the lines between the common prefix and suffix, grouped into
//! unified-format hunks.

use colored::Colorize;
use std::fmt::Write;

/// A single line in a diff
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffLine {
    Context(String),
    Add(String),
    Remove(String),
}

impl DiffLine {
    pub fn content(&self) -> &str {
        match self {
            DiffLine::Context(s) | DiffLine::Add(s) | DiffLine::Remove(s) => s,
        }
    }

    fn prefix(&self) -> char {
        match self {
            DiffLine::Context(_) => ' ',
            DiffLine::Add(_) => '+',
            DiffLine::Remove(_) => '-',
        }
    }

    fn in_old(&self) -> bool {
        !matches!(self, DiffLine::Add(_))
    }

    fn in_new(&self) -> bool {
        !matches!(self, DiffLine::Remove(_))
    }
}

/// A hunk in a unified diff
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffHunk {
    pub old_start: usize,
    pub old_count: usize,
    pub new_start: usize,
    pub new_count: usize,
    pub lines: Vec<DiffLine>,
}

impl DiffHunk {
    pub fn header(&self) -> String {
        format!(
            "@@ -{},{} +{},{} @@",
            self.old_start, self.old_count, self.new_start, self.new_count
        )
    }
}

/// Largest LCS table built for the differing middle of two inputs. Past
/// this the middle is reported as removed then added.
pub const MAX_LCS_CELLS: usize = 4_000_000;

/// Full line-by-line edit script from `old` to `new`.
pub fn diff_lines(old: &str, new: &str) -> Vec<DiffLine> {
    let a: Vec<&str> = old.lines().collect();
    let b: Vec<&str> = new.lines().collect();

    let prefix = a.iter().zip(&b).take_while(|(x, y)| x == y).count();
    let suffix = a[prefix..]
        .iter()
        .rev()
        .zip(b[prefix..].iter().rev())
        .take_while(|(x, y)| x == y)
        .count();

    let mut out = Vec::with_capacity(a.len().max(b.len()));
    out.extend(a[..prefix].iter().map(|l| DiffLine::Context(l.to_string())));
    diff_middle(&a[prefix..a.len() - suffix], &b[prefix..b.len() - suffix], &mut out);
    out.extend(a[a.len() - suffix..].iter().map(|l| DiffLine::Context(l.to_string())));
    out
}

fn diff_middle(a: &[&str], b: &[&str], out: &mut Vec<DiffLine>) {
    let (n, m) = (a.len(), b.len());
    if (n + 1).saturating_mul(m + 1) > MAX_LCS_CELLS {
        log::debug!("Diff of {}x{} lines exceeds LCS limit, replacing block", n, m);
        out.extend(a.iter().map(|l| DiffLine::Remove(l.to_string())));
        out.extend(b.iter().map(|l| DiffLine::Add(l.to_string())));
        return;
    }

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

    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if a[i] == b[j] {
            out.push(DiffLine::Context(a[i].to_string()));
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            out.push(DiffLine::Remove(a[i].to_string()));
            i += 1;
        } else {
            out.push(DiffLine::Add(b[j].to_string()));
            j += 1;
        }
    }
    out.extend(a[i..].iter().map(|l| DiffLine::Remove(l.to_string())));
    out.extend(b[j..].iter().map(|l| DiffLine::Add(l.to_string())));
}

/// Group an edit script into hunks with `context` unchanged lines around
/// each change.
pub fn hunks(lines: &[DiffLine], context: usize) -> Vec<DiffHunk> {
    let changes: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| !matches!(l, DiffLine::Context(_)))
        .map(|(i, _)| i)
        .collect();

    let mut ranges: Vec<(usize, usize)> = Vec::new();
    for idx in changes {
        let start = idx.saturating_sub(context);
        let end = (idx + context + 1).min(lines.len());
        match ranges.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => ranges.push((start, end)),
        }
    }

    ranges
        .into_iter()
        .map(|(start, end)| {
            let old_before = lines[..start].iter().filter(|l| l.in_old()).count();
            let new_before = lines[..start].iter().filter(|l| l.in_new()).count();
            let slice = &lines[start..end];
            let old_count = slice.iter().filter(|l| l.in_old()).count();
            let new_count = slice.iter().filter(|l| l.in_new()).count();
            DiffHunk {
                old_start: if old_count == 0 { old_before } else { old_before + 1 },
                old_count,
                new_start: if new_count == 0 { new_before } else { new_before + 1 },
                new_count,
                lines: slice.to_vec(),
            }
        })
        .collect()
}

/// Unified diff text; empty when the inputs have identical lines.
pub fn unified(old: &str, new: &str, old_label: &str, new_label: &str) -> String {
    let script = diff_lines(old, new);
    let hunks = hunks(&script, 3);
    if hunks.is_empty() {
        return String::new();
    }

    let mut out = String::new();
    let _ = writeln!(out, "--- {}", old_label);
    let _ = writeln!(out, "+++ {}", new_label);
    for hunk in &hunks {
        let _ = writeln!(out, "{}", hunk.header());
        for line in &hunk.lines {
            let _ = writeln!(out, "{}{}", line.prefix(), line.content());
        }
    }
    out
}

/// Color a unified diff for the terminal.
pub fn colorize(unified: &str) -> String {
    unified
        .lines()
        .map(|line| {
            if line.starts_with("+++") || line.starts_with("---") {
                line.bold().to_string()
            } else if line.starts_with("@@") {
                line.cyan().to_string()
            } else if line.starts_with('+') {
                line.green().to_string()
            } else if line.starts_with('-') {
                line.red().to_string()
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
