//! Static pattern registry. Adding a pattern means adding one entry here.

use super::{PatternId, TemplateId};
use crate::analyzers::{Signal, SignalSite, StructuralWalk};
use crate::complexity::ComplexityLabel;
use crate::core::Severity;

pub struct PatternDefinition {
    pub id: PatternId,
    pub severity: Severity,
    pub estimated_speedup_factor: f64,
    pub template: Option<TemplateId>,
    pub complexity_before: ComplexityLabel,
    pub complexity_after: ComplexityLabel,
    pub message: &'static str,
    pub example: &'static str,
    /// Sites that make the pattern fire; empty when it does not.
    pub detect: fn(&StructuralWalk) -> Vec<&SignalSite>,
}

impl PatternDefinition {
    /// `round(100 * (1 - 1/speedup))`
    pub fn estimated_savings_percent(&self) -> u32 {
        savings_percent(self.estimated_speedup_factor)
    }
}

pub fn savings_percent(speedup: f64) -> u32 {
    if speedup <= 1.0 {
        return 0;
    }
    (100.0 * (1.0 - 1.0 / speedup)).round() as u32
}

/// Entries are kept in `PatternId` declaration order.
pub static CATALOG: [PatternDefinition; 10] = [
    PatternDefinition {
        id: PatternId::ExponentialRecursion,
        severity: Severity::Critical,
        estimated_speedup_factor: 100.0,
        template: Some(TemplateId::Memoize),
        complexity_before: ComplexityLabel::Exponential,
        complexity_after: ComplexityLabel::Linear,
        message: "Recursive function recomputes overlapping subproblems; cache its results",
        example: "@functools.lru_cache(maxsize=None)\ndef fib(n): ...",
        detect: exponential_recursion,
    },
    PatternDefinition {
        id: PatternId::BubbleSort,
        severity: Severity::High,
        estimated_speedup_factor: 50.0,
        template: Some(TemplateId::BuiltinSort),
        complexity_before: ComplexityLabel::Quadratic,
        complexity_after: ComplexityLabel::Linearithmic,
        message: "Hand-written compare-and-swap sort; use the built-in sort",
        example: "items.sort()",
        detect: bubble_sort,
    },
    PatternDefinition {
        id: PatternId::NestedDuplicateCheck,
        severity: Severity::High,
        estimated_speedup_factor: 20.0,
        template: None,
        complexity_before: ComplexityLabel::Quadratic,
        complexity_after: ComplexityLabel::Linear,
        message: "Membership test against a list inside a loop; track seen items in a set",
        example: "seen = set()\nfor x in items:\n    if x not in seen:\n        seen.add(x)",
        detect: nested_duplicate_check,
    },
    PatternDefinition {
        id: PatternId::SortInLoop,
        severity: Severity::High,
        estimated_speedup_factor: 8.0,
        template: None,
        complexity_before: ComplexityLabel::Quadratic,
        complexity_after: ComplexityLabel::Linearithmic,
        message: "Sorting inside a loop; sort once outside the loop or keep a heap",
        example: "items.sort()\nfor x in items: ...",
        detect: sort_in_loop,
    },
    PatternDefinition {
        id: PatternId::NestedLoops,
        severity: Severity::Medium,
        estimated_speedup_factor: 10.0,
        template: None,
        complexity_before: ComplexityLabel::Quadratic,
        complexity_after: ComplexityLabel::Quadratic,
        message: "Nested loops; use hashing for lookups or vectorized operations",
        example: "index = {x.key: x for x in right}\nfor y in left:\n    match = index.get(y.key)",
        detect: nested_loops,
    },
    PatternDefinition {
        id: PatternId::StringConcatInLoop,
        severity: Severity::Medium,
        estimated_speedup_factor: 10.0,
        template: Some(TemplateId::Join),
        complexity_before: ComplexityLabel::Linear,
        complexity_after: ComplexityLabel::Linear,
        message: "String concatenation in a loop copies the string each time; use ''.join()",
        example: "result += \"\".join(str(x) for x in items)",
        detect: string_concat_in_loop,
    },
    PatternDefinition {
        id: PatternId::RegexCallInLoop,
        severity: Severity::Medium,
        estimated_speedup_factor: 5.0,
        template: Some(TemplateId::PrecompileRegex),
        complexity_before: ComplexityLabel::Linear,
        complexity_after: ComplexityLabel::Linear,
        message: "Regular expression looked up on every iteration; compile it once before the loop",
        example: "pattern = re.compile(r\"\\d+\")\nfor line in lines:\n    pattern.search(line)",
        detect: regex_call_in_loop,
    },
    PatternDefinition {
        id: PatternId::IoInLoop,
        severity: Severity::Medium,
        estimated_speedup_factor: 3.0,
        template: None,
        complexity_before: ComplexityLabel::Linear,
        complexity_after: ComplexityLabel::Linear,
        message: "I/O call inside a loop; batch the data and write it once",
        example: "print(\"\\n\".join(lines))",
        detect: io_in_loop,
    },
    PatternDefinition {
        id: PatternId::DictManualCountInLoop,
        severity: Severity::Low,
        estimated_speedup_factor: 4.0,
        template: Some(TemplateId::Counter),
        complexity_before: ComplexityLabel::Linear,
        complexity_after: ComplexityLabel::Linear,
        message: "Manual counting with a dict; use collections.Counter",
        example: "counts = collections.Counter(words)",
        detect: dict_manual_count_in_loop,
    },
    PatternDefinition {
        id: PatternId::ListAppendInLoop,
        severity: Severity::Low,
        estimated_speedup_factor: 2.5,
        template: Some(TemplateId::Comprehension),
        complexity_before: ComplexityLabel::Linear,
        complexity_after: ComplexityLabel::Linear,
        message: "Building a list with append in a loop; use a list comprehension",
        example: "result.extend([x * 2 for x in items])",
        detect: list_append_in_loop,
    },
];

pub fn definition(id: PatternId) -> &'static PatternDefinition {
    &CATALOG[id as usize]
}

fn sites(walk: &StructuralWalk, signal: Signal) -> Vec<&SignalSite> {
    walk.sites_of(signal).collect()
}

fn exponential_recursion(walk: &StructuralWalk) -> Vec<&SignalSite> {
    if !walk.summary.has_branching_recursion() {
        return Vec::new();
    }
    sites(walk, Signal::BranchingRecursion)
}

fn bubble_sort(walk: &StructuralWalk) -> Vec<&SignalSite> {
    if !walk.summary.has_nested_loops() {
        return Vec::new();
    }
    sites(walk, Signal::SwapInNestedLoop)
}

fn nested_duplicate_check(walk: &StructuralWalk) -> Vec<&SignalSite> {
    sites(walk, Signal::NestedDuplicateCheck)
}

fn sort_in_loop(walk: &StructuralWalk) -> Vec<&SignalSite> {
    sites(walk, Signal::SortInLoop)
}

fn nested_loops(walk: &StructuralWalk) -> Vec<&SignalSite> {
    sites(walk, Signal::NestedLoop)
}

fn string_concat_in_loop(walk: &StructuralWalk) -> Vec<&SignalSite> {
    sites(walk, Signal::StringConcatInLoop)
}

fn regex_call_in_loop(walk: &StructuralWalk) -> Vec<&SignalSite> {
    sites(walk, Signal::RegexCallInLoop)
}

fn io_in_loop(walk: &StructuralWalk) -> Vec<&SignalSite> {
    sites(walk, Signal::IoInLoop)
}

fn dict_manual_count_in_loop(walk: &StructuralWalk) -> Vec<&SignalSite> {
    sites(walk, Signal::DictManualCountInLoop)
}

fn list_append_in_loop(walk: &StructuralWalk) -> Vec<&SignalSite> {
    sites(walk, Signal::ListAppendInLoop)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_follows_id_order() {
        for (index, id) in PatternId::ALL.into_iter().enumerate() {
            assert_eq!(CATALOG[index].id, id);
            assert_eq!(definition(id).id, id);
        }
    }

    #[test]
    fn test_savings_percent() {
        assert_eq!(savings_percent(100.0), 99);
        assert_eq!(savings_percent(50.0), 98);
        assert_eq!(savings_percent(2.5), 60);
        assert_eq!(savings_percent(3.0), 67);
        assert_eq!(savings_percent(1.0), 0);
        assert_eq!(definition(PatternId::SortInLoop).estimated_savings_percent(), 88);
    }

    #[test]
    fn test_templates_improve_or_keep_complexity() {
        for entry in &CATALOG {
            assert!(entry.complexity_after <= entry.complexity_before, "{}", entry.id);
        }
    }
}
