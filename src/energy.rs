//! Per-line qualitative energy labels derived from the walker's category map.

use crate::analyzers::{LineCategory, LineCategoryMap};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnergy {
    Low,
    Medium,
    High,
}

impl fmt::Display for LineEnergy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LineEnergy::Low => "low",
            LineEnergy::Medium => "medium",
            LineEnergy::High => "high",
        };
        f.write_str(name)
    }
}

impl LineEnergy {
    fn of(category: LineCategory) -> Self {
        match category {
            LineCategory::LoopHeader
            | LineCategory::StringOpInLoop
            | LineCategory::SortCall
            | LineCategory::CollectionOpInLoop => LineEnergy::High,
            LineCategory::Comment | LineCategory::Blank | LineCategory::Assignment => {
                LineEnergy::Low
            }
            LineCategory::Branch
            | LineCategory::Call
            | LineCategory::StringOp
            | LineCategory::CollectionOp
            | LineCategory::RegexCall
            | LineCategory::ExceptionHandler => LineEnergy::Medium,
        }
    }
}

/// Total mapping from 1-based line number to its energy label.
///
/// Serializes as `{"1": "low", "2": "high", ...}`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineEnergyMap(BTreeMap<usize, LineEnergy>);

impl LineEnergyMap {
    pub fn get(&self, line: usize) -> Option<LineEnergy> {
        self.0.get(&line).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, LineEnergy)> + '_ {
        self.0.iter().map(|(line, energy)| (*line, *energy))
    }

    pub fn count(&self, energy: LineEnergy) -> usize {
        self.0.values().filter(|e| **e == energy).count()
    }
}

/// Lines without any category (continuations, closing brackets) are low.
pub fn classify_lines(categories: &LineCategoryMap) -> LineEnergyMap {
    let lines = (1..=categories.line_count())
        .map(|line| {
            let energy = categories
                .categories(line)
                .map(LineEnergy::of)
                .max()
                .unwrap_or(LineEnergy::Low);
            (line, energy)
        })
        .collect();
    LineEnergyMap(lines)
}
