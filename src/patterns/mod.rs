//! Catalog of known inefficiency patterns and the matcher that finds them.

pub mod catalog;
pub mod matcher;

pub use catalog::{definition, PatternDefinition, CATALOG};
pub use matcher::{find_matches, PatternMatcher};

use crate::analyzers::NodeRef;
use crate::core::{LineSpan, Severity};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternId {
    ExponentialRecursion,
    BubbleSort,
    NestedDuplicateCheck,
    SortInLoop,
    NestedLoops,
    StringConcatInLoop,
    RegexCallInLoop,
    IoInLoop,
    DictManualCountInLoop,
    ListAppendInLoop,
}

impl PatternId {
    pub const ALL: [PatternId; 10] = [
        PatternId::ExponentialRecursion,
        PatternId::BubbleSort,
        PatternId::NestedDuplicateCheck,
        PatternId::SortInLoop,
        PatternId::NestedLoops,
        PatternId::StringConcatInLoop,
        PatternId::RegexCallInLoop,
        PatternId::IoInLoop,
        PatternId::DictManualCountInLoop,
        PatternId::ListAppendInLoop,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PatternId::ExponentialRecursion => "exponential_recursion",
            PatternId::BubbleSort => "bubble_sort",
            PatternId::NestedDuplicateCheck => "nested_duplicate_check",
            PatternId::SortInLoop => "sort_in_loop",
            PatternId::NestedLoops => "nested_loops",
            PatternId::StringConcatInLoop => "string_concat_in_loop",
            PatternId::RegexCallInLoop => "regex_call_in_loop",
            PatternId::IoInLoop => "io_in_loop",
            PatternId::DictManualCountInLoop => "dict_manual_count_in_loop",
            PatternId::ListAppendInLoop => "list_append_in_loop",
        }
    }
}

impl fmt::Display for PatternId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatternId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PatternId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| format!("unknown pattern id `{s}`"))
    }
}

/// Registered rewrite templates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateId {
    Memoize,
    BuiltinSort,
    Join,
    Comprehension,
    Counter,
    PrecompileRegex,
}

/// One occurrence of a catalog pattern.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PatternMatch {
    pub pattern_id: PatternId,
    pub line_range: LineSpan,
    pub severity: Severity,
    pub estimated_speedup_factor: f64,
    pub has_auto_rewrite: bool,
    /// Construct the match reports on (loop, function definition).
    #[serde(skip)]
    pub anchor: NodeRef,
    /// Expression or statement that triggered the match.
    #[serde(skip)]
    pub focus: NodeRef,
}

impl PatternMatch {
    pub fn first_line(&self) -> usize {
        self.line_range.start
    }

    pub fn definition(&self) -> &'static PatternDefinition {
        definition(self.pattern_id)
    }
}
