//! Line-level diff engine.
//!
//! Computes a longest-common-subsequence alignment between two line
//! sequences and renders it as deleted / added / unchanged lines in document
//! order. Line equality is whole-line string equality.
//!
//! Time and space are O(m·n), which is fine for source files and not meant
//! for very large inputs.

use std::fmt;

use crossterm::style::Stylize;

/// One line common to both sequences: `original[self.original] == modified[self.modified]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alignment {
    pub original: usize,
    pub modified: usize,
}

/// Compute the LCS alignment of two sequences.
///
/// The returned entries are strictly increasing in both coordinates. When
/// several alignments of maximal length exist, backtracking prefers to step
/// back through `modified` on ties, which decides how runs of additions and
/// deletions are grouped. Rendered output depends on this, so keep it stable.
pub fn align<T: PartialEq>(original: &[T], modified: &[T]) -> Vec<Alignment> {
    let (m, n) = (original.len(), modified.len());
    let width = n + 1;
    let mut dp = vec![0usize; (m + 1) * width];

    for i in 1..=m {
        for j in 1..=n {
            dp[i * width + j] = if original[i - 1] == modified[j - 1] {
                dp[(i - 1) * width + (j - 1)] + 1
            } else {
                dp[(i - 1) * width + j].max(dp[i * width + (j - 1)])
            };
        }
    }

    let mut result = Vec::with_capacity(dp[m * width + n]);
    let (mut i, mut j) = (m, n);
    while i > 0 && j > 0 {
        if original[i - 1] == modified[j - 1] {
            result.push(Alignment {
                original: i - 1,
                modified: j - 1,
            });
            i -= 1;
            j -= 1;
        } else if dp[(i - 1) * width + j] > dp[i * width + (j - 1)] {
            i -= 1;
        } else {
            j -= 1;
        }
    }
    result.reverse();
    result
}

/// A rendered diff line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffLine {
    /// Present only in the original.
    Deleted(String),
    /// Present only in the modified sequence.
    Added(String),
    /// Present in both.
    Unchanged(String),
}

impl DiffLine {
    pub fn text(&self) -> &str {
        match self {
            Self::Deleted(s) | Self::Added(s) | Self::Unchanged(s) => s,
        }
    }

    fn marker(&self) -> &'static str {
        match self {
            Self::Deleted(_) => "-",
            Self::Added(_) => "+",
            Self::Unchanged(_) => " ",
        }
    }
}

impl fmt::Display for DiffLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.marker(), self.text())
    }
}

/// An ordered diff rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    lines: Vec<DiffLine>,
}

impl Diff {
    pub fn lines(&self) -> &[DiffLine] {
        &self.lines
    }

    pub fn additions(&self) -> usize {
        self.count(|l| matches!(l, DiffLine::Added(_)))
    }

    pub fn deletions(&self) -> usize {
        self.count(|l| matches!(l, DiffLine::Deleted(_)))
    }

    pub fn has_changes(&self) -> bool {
        self.lines
            .iter()
            .any(|l| !matches!(l, DiffLine::Unchanged(_)))
    }

    fn count(&self, pred: impl Fn(&DiffLine) -> bool) -> usize {
        self.lines.iter().filter(|l| pred(l)).count()
    }

    /// Render with terminal colors: green additions, red deletions, dim context.
    pub fn render_ansi(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            let plain = line.to_string();
            let styled = match line {
                DiffLine::Deleted(_) => plain.red(),
                DiffLine::Added(_) => plain.green(),
                DiffLine::Unchanged(_) => plain.dark_grey(),
            };
            out.push_str(&styled.to_string());
            out.push('\n');
        }
        out
    }
}

impl fmt::Display for Diff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

/// Diff two line sequences.
pub fn diff_lines(original: &[&str], modified: &[&str]) -> Diff {
    let alignment = align(original, modified);
    let mut lines = Vec::with_capacity(original.len() + modified.len());
    let (mut i, mut j) = (0, 0);

    for entry in &alignment {
        while i < entry.original {
            lines.push(DiffLine::Deleted(original[i].to_string()));
            i += 1;
        }
        while j < entry.modified {
            lines.push(DiffLine::Added(modified[j].to_string()));
            j += 1;
        }
        lines.push(DiffLine::Unchanged(original[i].to_string()));
        i += 1;
        j += 1;
    }

    lines.extend(original[i..].iter().map(|l| DiffLine::Deleted(l.to_string())));
    lines.extend(modified[j..].iter().map(|l| DiffLine::Added(l.to_string())));

    Diff { lines }
}

/// Diff two texts split on `'\n'`.
///
/// An empty text is a single empty line and a trailing newline yields a
/// trailing empty line. Pass an empty slice to `diff_lines` directly when the
/// original should count as having no lines at all (a new file).
pub fn diff_text(original: &str, modified: &str) -> Diff {
    let original: Vec<&str> = original.split('\n').collect();
    let modified: Vec<&str> = modified.split('\n').collect();
    diff_lines(&original, &modified)
}
