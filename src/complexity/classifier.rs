//! Fixed-priority mapping from structural signals to a Big-O label.
//!
//! When several signals coexist the most expensive one wins: branching
//! recursion dominates everything, linear recursion is an O(n) floor, and
//! loop nesting or sorting can still raise the label above that floor.

use super::{score_band, ComplexityLabel, ScoreBand};
use crate::analyzers::StructuralSummary;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_FLAG_PENALTY: u32 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub label: ComplexityLabel,
    pub score: u32,
    pub band: ScoreBand,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ComplexityClassifier {
    flag_penalty: u32,
}

impl Default for ComplexityClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_FLAG_PENALTY)
    }
}

impl ComplexityClassifier {
    pub fn new(flag_penalty: u32) -> Self {
        Self { flag_penalty }
    }

    pub fn classify(&self, summary: &StructuralSummary) -> Classification {
        let label = classify(summary);
        let score = complexity_score(label, summary, self.flag_penalty);
        debug!(%label, score, "classified");
        Classification {
            label,
            score,
            band: score_band(score),
        }
    }
}

/// Branching recursion is O(2^n) outright. Linear recursion is only an O(n)
/// floor: loop nesting and sort rules still apply and the costlier label wins,
/// so a singly recursive function with a double loop is O(n²).
pub fn classify(summary: &StructuralSummary) -> ComplexityLabel {
    if summary.has_branching_recursion() {
        return ComplexityLabel::Exponential;
    }

    let floor = if summary.has_recursion() {
        ComplexityLabel::Linear
    } else {
        ComplexityLabel::Constant
    };

    let structural = match summary.max_loop_nest_depth {
        depth if depth >= 3 => ComplexityLabel::Cubic,
        2 => ComplexityLabel::Quadratic,
        _ if summary.has_sort() => ComplexityLabel::Linearithmic,
        1 => ComplexityLabel::Linear,
        // No loops: calls alone do not raise the label.
        _ => ComplexityLabel::Constant,
    };

    floor.max(structural)
}

/// `round(100 * rank / max_rank)` plus `flag_penalty` per penalized flag, clamped to 100.
pub fn complexity_score(
    label: ComplexityLabel,
    summary: &StructuralSummary,
    flag_penalty: u32,
) -> u32 {
    let base = (100.0 * f64::from(label.rank()) / f64::from(ComplexityLabel::MAX_RANK)).round() as u32;
    let flags = summary.penalized_flag_count() as u32;
    base.saturating_add(flags.saturating_mul(flag_penalty)).min(100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::RecursionShape;

    fn with_depth(depth: usize) -> StructuralSummary {
        StructuralSummary {
            loop_count: depth,
            max_loop_nest_depth: depth,
            ..Default::default()
        }
    }

    fn recursive(shape: RecursionShape) -> StructuralSummary {
        let mut summary = StructuralSummary::default();
        summary.recursive_function_names.insert("f".into());
        summary.recursion_shapes.insert("f".into(), shape);
        summary
    }

    #[test]
    fn test_loop_depth_rules() {
        assert_eq!(classify(&with_depth(0)), ComplexityLabel::Constant);
        assert_eq!(classify(&with_depth(1)), ComplexityLabel::Linear);
        assert_eq!(classify(&with_depth(2)), ComplexityLabel::Quadratic);
        assert_eq!(classify(&with_depth(3)), ComplexityLabel::Cubic);
        assert_eq!(classify(&with_depth(7)), ComplexityLabel::Cubic);
    }

    #[test]
    fn test_sort_outside_nested_loops() {
        let mut summary = with_depth(1);
        summary.sort_call_count = 1;
        assert_eq!(classify(&summary), ComplexityLabel::Linearithmic);
        summary.max_loop_nest_depth = 0;
        assert_eq!(classify(&summary), ComplexityLabel::Linearithmic);
        summary.max_loop_nest_depth = 2;
        assert_eq!(classify(&summary), ComplexityLabel::Quadratic);
    }

    #[test]
    fn test_calls_without_loops_are_constant() {
        let summary = StructuralSummary {
            function_call_count: 12,
            ..Default::default()
        };
        assert_eq!(classify(&summary), ComplexityLabel::Constant);
    }

    #[test]
    fn test_recursion_shapes() {
        assert_eq!(
            classify(&recursive(RecursionShape::Linear)),
            ComplexityLabel::Linear
        );
        assert_eq!(
            classify(&recursive(RecursionShape::Memoized)),
            ComplexityLabel::Linear
        );
        assert_eq!(
            classify(&recursive(RecursionShape::Branching)),
            ComplexityLabel::Exponential
        );
    }

    #[test]
    fn test_most_expensive_signal_wins() {
        let mut summary = recursive(RecursionShape::Linear);
        summary.max_loop_nest_depth = 2;
        assert_eq!(classify(&summary), ComplexityLabel::Quadratic);

        let mut summary = recursive(RecursionShape::Branching);
        summary.max_loop_nest_depth = 3;
        assert_eq!(classify(&summary), ComplexityLabel::Exponential);
    }

    #[test]
    fn test_score_from_rank_and_flags() {
        let summary = with_depth(2);
        assert_eq!(complexity_score(ComplexityLabel::Quadratic, &summary, 10), 57);
        assert_eq!(complexity_score(ComplexityLabel::Constant, &summary, 10), 0);
        assert_eq!(complexity_score(ComplexityLabel::Factorial, &summary, 10), 100);

        let flagged = StructuralSummary {
            string_concat_in_loop: true,
            nested_duplicate_check: true,
            dict_manual_count_in_loop: true,
            ..with_depth(1)
        };
        assert_eq!(complexity_score(ComplexityLabel::Linear, &flagged, 10), 59);
        assert_eq!(complexity_score(ComplexityLabel::Exponential, &flagged, 10), 100);
    }

    #[test]
    fn test_classifier_reports_band() {
        let classification = ComplexityClassifier::default().classify(&with_depth(2));
        assert_eq!(classification.label, ComplexityLabel::Quadratic);
        assert_eq!(classification.score, 57);
        assert_eq!(classification.band, ScoreBand::Moderate);
    }
}
