use crate::core::{LineSpan, SourceUnit};
use serde::Serialize;
use std::ops::Range;
use tree_sitter::Node;

/// Detached handle to a tree node, stable for the lifetime of its `SourceUnit`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NodeRef {
    pub span: LineSpan,
    pub start_byte: usize,
    pub end_byte: usize,
    pub kind: &'static str,
}

impl NodeRef {
    pub fn of(node: Node<'_>) -> Self {
        Self {
            span: LineSpan::of(node),
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
            kind: node.kind(),
        }
    }

    pub fn byte_range(&self) -> Range<usize> {
        self.start_byte..self.end_byte
    }

    pub fn resolve<'u>(&self, unit: &'u SourceUnit) -> Option<Node<'u>> {
        unit.node_at(self.byte_range(), self.kind)
    }
}

/// Structural signals the walker reports with a location.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    StringConcatInLoop,
    ListAppendInLoop,
    DictManualCountInLoop,
    RegexCallInLoop,
    NestedDuplicateCheck,
    NestedLoop,
    SwapInNestedLoop,
    SortInLoop,
    IoInLoop,
    BranchingRecursion,
}

/// Where a signal fired.
///
/// `anchor` is the construct a match reports (usually the enclosing loop);
/// `focus` is the expression or statement that triggered it.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SignalSite {
    pub signal: Signal,
    pub anchor: NodeRef,
    pub focus: NodeRef,
}

impl SignalSite {
    pub fn new(signal: Signal, anchor: NodeRef, focus: NodeRef) -> Self {
        Self {
            signal,
            anchor,
            focus,
        }
    }
}
