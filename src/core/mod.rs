pub mod ast;
pub mod errors;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use ast::SourceUnit;
pub use errors::{Error, Result};

/// 1-based, inclusive range of physical lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LineSpan {
    pub start: usize,
    pub end: usize,
}

impl LineSpan {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "line span must not be inverted");
        Self { start, end }
    }

    pub fn single(line: usize) -> Self {
        Self::new(line, line)
    }

    pub fn overlaps(&self, other: &LineSpan) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    pub fn contains(&self, line: usize) -> bool {
        self.start <= line && line <= self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl fmt::Display for LineSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        };
        f.write_str(name)
    }
}

/// Total/blank/comment line counts for a file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeStats {
    pub total_lines: usize,
    pub blank_lines: usize,
    pub comment_lines: usize,
}

impl CodeStats {
    pub fn from_source(source: &str) -> Self {
        source.lines().fold(Self::default(), |mut stats, line| {
            let trimmed = line.trim();
            stats.total_lines += 1;
            if trimmed.is_empty() {
                stats.blank_lines += 1;
            } else if trimmed.starts_with('#') {
                stats.comment_lines += 1;
            }
            stats
        })
    }

    pub fn code_lines(&self) -> usize {
        self.total_lines - self.blank_lines - self.comment_lines
    }
}
