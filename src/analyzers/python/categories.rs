use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Syntactic category of a visited node, recorded against its first line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineCategory {
    LoopHeader,
    Branch,
    Call,
    StringOp,
    StringOpInLoop,
    CollectionOp,
    CollectionOpInLoop,
    SortCall,
    RegexCall,
    ExceptionHandler,
    Assignment,
    Comment,
    Blank,
}

impl LineCategory {
    pub fn string_op(in_loop: bool) -> Self {
        if in_loop {
            LineCategory::StringOpInLoop
        } else {
            LineCategory::StringOp
        }
    }

    pub fn collection_op(in_loop: bool) -> Self {
        if in_loop {
            LineCategory::CollectionOpInLoop
        } else {
            LineCategory::CollectionOp
        }
    }
}

/// Categories seen on each physical line of one file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LineCategoryMap {
    line_count: usize,
    lines: BTreeMap<usize, BTreeSet<LineCategory>>,
}

impl LineCategoryMap {
    pub fn new(line_count: usize) -> Self {
        Self {
            line_count,
            lines: BTreeMap::new(),
        }
    }

    /// Lines outside the file are ignored.
    pub fn record(&mut self, line: usize, category: LineCategory) {
        if line == 0 || line > self.line_count {
            return;
        }
        self.lines.entry(line).or_default().insert(category);
    }

    pub fn line_count(&self) -> usize {
        self.line_count
    }

    pub fn categories(&self, line: usize) -> impl Iterator<Item = LineCategory> + '_ {
        self.lines.get(&line).into_iter().flatten().copied()
    }

    pub fn has(&self, line: usize, category: LineCategory) -> bool {
        self.lines
            .get(&line)
            .is_some_and(|set| set.contains(&category))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_ignores_out_of_range_lines() {
        let mut map = LineCategoryMap::new(2);
        map.record(0, LineCategory::Call);
        map.record(3, LineCategory::Call);
        map.record(2, LineCategory::Call);
        map.record(2, LineCategory::Call);
        assert_eq!(map.categories(2).count(), 1);
        assert_eq!(map.categories(1).count(), 0);
        assert!(map.has(2, LineCategory::Call));
    }
}
