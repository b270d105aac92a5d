//! Ranked, human-readable suggestions built from the match list.

use crate::core::Severity;
use crate::patterns::{definition, PatternId, PatternMatch};
use crate::refactoring::RewriteOutcome;
use serde::Serialize;
use std::fmt;

/// What happened to the match a suggestion came from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Disposition {
    /// A template exists but no rewrite was attempted.
    RewriteAvailable,
    Applied,
    Superseded { by: PatternId },
    Unsupported { reason: String },
    SuggestionOnly,
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Disposition::RewriteAvailable => f.write_str("auto-rewrite available"),
            Disposition::Applied => f.write_str("applied"),
            Disposition::Superseded { by } => write!(f, "skipped, superseded by {by}"),
            Disposition::Unsupported { reason } => write!(f, "not rewritten: {reason}"),
            Disposition::SuggestionOnly => f.write_str("manual change"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Suggestion {
    pub pattern_id: PatternId,
    pub line: usize,
    pub severity: Severity,
    pub message: String,
    pub example: String,
    pub estimated_savings_percent: u32,
    pub disposition: Disposition,
}

fn disposition_of(pattern_match: &PatternMatch, outcome: Option<&RewriteOutcome>) -> Disposition {
    if !pattern_match.has_auto_rewrite {
        return Disposition::SuggestionOnly;
    }
    let Some(outcome) = outcome else {
        return Disposition::RewriteAvailable;
    };
    if let Some(skipped) = outcome
        .superseded
        .iter()
        .find(|s| &s.pattern_match == pattern_match)
    {
        return Disposition::Superseded { by: skipped.by };
    }
    if let Some(refused) = outcome
        .unsupported
        .iter()
        .find(|u| &u.pattern_match == pattern_match)
    {
        return Disposition::Unsupported {
            reason: refused.reason.clone(),
        };
    }
    Disposition::Applied
}

/// Suggestions sorted by estimated savings (desc), then line, then pattern id.
///
/// `outcome` is the rewrite run over the same matches, when there was one.
pub fn rank(
    matches: &[PatternMatch],
    outcome: Option<&RewriteOutcome>,
    top: Option<usize>,
) -> Vec<Suggestion> {
    let mut suggestions: Vec<Suggestion> = matches
        .iter()
        .map(|pattern_match| {
            let entry = definition(pattern_match.pattern_id);
            Suggestion {
                pattern_id: pattern_match.pattern_id,
                line: pattern_match.first_line(),
                severity: pattern_match.severity,
                message: entry.message.to_string(),
                example: entry.example.to_string(),
                estimated_savings_percent: entry.estimated_savings_percent(),
                disposition: disposition_of(pattern_match, outcome),
            }
        })
        .collect();

    suggestions.sort_by(|a, b| {
        b.estimated_savings_percent
            .cmp(&a.estimated_savings_percent)
            .then(a.line.cmp(&b.line))
            .then(a.pattern_id.as_str().cmp(b.pattern_id.as_str()))
    });
    if let Some(limit) = top {
        suggestions.truncate(limit);
    }
    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::walk;
    use crate::core::SourceUnit;
    use crate::patterns::find_matches;
    use crate::refactoring::RewriteEngine;
    use indoc::indoc;

    const SOURCE: &str = indoc! {"
        def fib(n):
            return n if n < 2 else fib(n - 1) + fib(n - 2)

        out = ''
        for x in items:
            out += str(x)
            print(x)
        for a in items:
            for b in items:
                pass
    "};

    fn matches() -> (SourceUnit, Vec<PatternMatch>) {
        let unit = SourceUnit::parse(SOURCE).unwrap();
        let matches = find_matches(&walk(&unit));
        (unit, matches)
    }

    #[test]
    fn test_sorted_by_savings_then_line() {
        let (_, matches) = matches();
        let ranked = rank(&matches, None, None);
        let order: Vec<_> = ranked
            .iter()
            .map(|s| (s.pattern_id, s.estimated_savings_percent))
            .collect();
        assert_eq!(
            order,
            vec![
                (PatternId::ExponentialRecursion, 99),
                (PatternId::StringConcatInLoop, 90),
                (PatternId::NestedLoops, 90),
                (PatternId::IoInLoop, 67),
            ]
        );
        assert_eq!(ranked[0].disposition, Disposition::RewriteAvailable);
        assert_eq!(ranked[2].disposition, Disposition::SuggestionOnly);
    }

    #[test]
    fn test_top_n_truncates() {
        let (_, matches) = matches();
        assert_eq!(rank(&matches, None, Some(2)).len(), 2);
        assert!(rank(&[], None, Some(3)).is_empty());
    }

    #[test]
    fn test_dispositions_follow_rewrite_outcome() {
        let (unit, matches) = matches();
        let outcome = RewriteEngine::default().rewrite(&unit, &matches).unwrap();
        let ranked = rank(&matches, Some(&outcome), None);
        let by_id = |id| ranked.iter().find(|s| s.pattern_id == id).unwrap();

        assert_eq!(by_id(PatternId::ExponentialRecursion).disposition, Disposition::Applied);
        assert!(matches!(
            by_id(PatternId::StringConcatInLoop).disposition,
            Disposition::Unsupported { .. }
        ));
        assert_eq!(by_id(PatternId::IoInLoop).disposition, Disposition::SuggestionOnly);
    }

    #[test]
    fn test_ranking_is_deterministic() {
        let (_, matches) = matches();
        assert_eq!(rank(&matches, None, None), rank(&matches, None, None));
    }
}
