use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// How a recursive function re-enters its own call-graph cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecursionShape {
    /// Results are cached (`@lru_cache`, `@cache`); behaves like linear recursion.
    Memoized,
    /// A single, non-looping call site back into the cycle.
    Linear,
    /// Several call sites, or one inside a loop: the call tree fans out.
    Branching,
}

/// Aggregate shape metrics of one source file. Pure function of the parse tree.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralSummary {
    pub loop_count: usize,
    pub max_loop_nest_depth: usize,
    pub recursive_function_names: BTreeSet<String>,
    pub recursion_shapes: BTreeMap<String, RecursionShape>,
    pub function_call_count: usize,
    pub io_op_count: usize,
    pub exception_handler_count: usize,
    pub comprehension_count: usize,
    pub sort_call_count: usize,
    pub list_op_count: usize,
    pub string_concat_in_loop: bool,
    pub list_append_in_loop: bool,
    pub dict_manual_count_in_loop: bool,
    pub regex_call_in_loop: bool,
    pub nested_duplicate_check: bool,
}

impl StructuralSummary {
    pub fn has_recursion(&self) -> bool {
        !self.recursive_function_names.is_empty()
    }

    /// Any recursive function whose call tree fans out.
    pub fn has_branching_recursion(&self) -> bool {
        self.recursion_shapes
            .values()
            .any(|shape| *shape == RecursionShape::Branching)
    }

    pub fn has_nested_loops(&self) -> bool {
        self.max_loop_nest_depth >= 2
    }

    pub fn has_sort(&self) -> bool {
        self.sort_call_count > 0
    }

    /// Number of flags that carry a score penalty.
    pub fn penalized_flag_count(&self) -> usize {
        [
            self.string_concat_in_loop,
            self.nested_duplicate_check,
            self.dict_manual_count_in_loop,
        ]
        .into_iter()
        .filter(|flag| *flag)
        .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_penalized_flags() {
        let summary = StructuralSummary {
            string_concat_in_loop: true,
            dict_manual_count_in_loop: true,
            regex_call_in_loop: true,
            ..Default::default()
        };
        assert_eq!(summary.penalized_flag_count(), 2);
    }

    #[test]
    fn test_branching_recursion() {
        let mut summary = StructuralSummary::default();
        summary
            .recursion_shapes
            .insert("fact".into(), RecursionShape::Linear);
        assert!(!summary.has_branching_recursion());
        summary
            .recursion_shapes
            .insert("fib".into(), RecursionShape::Branching);
        assert!(summary.has_branching_recursion());
    }
}
