//! Rewrite engine: turns template-backed matches into a conflict-free plan
//! and applies it to the source text.
//!
//! Edits are synthesized against the original tree, resolved for overlap
//! (larger estimated speedup wins), then applied from the bottom of the file
//! upwards so earlier line numbers stay valid. Every application is
//! re-parsed; an edit whose result does not parse is reverted and the match
//! is downgraded to suggestion-only.

pub mod imports;
pub mod templates;

use crate::complexity::ComplexityLabel;
use crate::core::{Error, LineSpan, Result, SourceUnit};
use crate::patterns::{definition, PatternId, PatternMatch};
use imports::{ensure_imports, join_lines};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use templates::{synthesize, Edit, TemplateContext};
use tracing::{debug, debug_span, warn};

/// One applied rewrite.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RewriteEntry {
    pub pattern_id: PatternId,
    pub original_span: LineSpan,
    pub replacement_text: String,
    pub rationale: String,
    pub complexity_before: ComplexityLabel,
    pub complexity_after: ComplexityLabel,
}

/// Applied rewrites in top-to-bottom order; spans never overlap.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RewritePlan {
    pub entries: Vec<RewriteEntry>,
}

impl RewritePlan {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn applied_ids(&self) -> Vec<PatternId> {
        self.entries.iter().map(|entry| entry.pattern_id).collect()
    }
}

/// A candidate dropped because an overlapping one promised more.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Superseded {
    pub pattern_match: PatternMatch,
    pub by: PatternId,
}

/// A match whose observed shape has no safe template.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Unsupported {
    pub pattern_match: PatternMatch,
    pub reason: String,
}

#[derive(Clone, Debug)]
pub struct RewriteOutcome {
    pub plan: RewritePlan,
    pub rewritten: SourceUnit,
    pub superseded: Vec<Superseded>,
    pub unsupported: Vec<Unsupported>,
}

impl RewriteOutcome {
    pub fn text(&self) -> &str {
        self.rewritten.source()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RewriteEngine {
    annotate: bool,
}

impl Default for RewriteEngine {
    fn default() -> Self {
        Self { annotate: true }
    }
}

struct Candidate<'m> {
    pattern_match: &'m PatternMatch,
    edit: Edit,
}

impl RewriteEngine {
    pub fn new(annotate: bool) -> Self {
        Self { annotate }
    }

    pub fn rewrite(&self, unit: &SourceUnit, matches: &[PatternMatch]) -> Result<RewriteOutcome> {
        let _span = debug_span!("rewrite", path = %unit.path().display()).entered();
        let mut unsupported = Vec::new();
        let mut candidates = Vec::new();
        let mut context = TemplateContext::default();

        for pattern_match in matches {
            let Some(template) = definition(pattern_match.pattern_id).template else {
                continue;
            };
            match synthesize(template, pattern_match, unit, &mut context) {
                Ok(edit) => candidates.push(Candidate {
                    pattern_match,
                    edit,
                }),
                Err(Error::UnsupportedRewrite { reason, .. }) => {
                    debug!(pattern = %pattern_match.pattern_id, %reason, "no template for shape");
                    unsupported.push(Unsupported {
                        pattern_match: pattern_match.clone(),
                        reason,
                    });
                }
                Err(other) => return Err(other),
            }
        }

        let (accepted, superseded) = resolve_conflicts(candidates);
        let (mut applied, mut rewritten) = self.apply(unit, accepted, &mut unsupported);
        applied.sort_by_key(|candidate| candidate.edit.span);

        let required: BTreeSet<&'static str> = applied
            .iter()
            .flat_map(|candidate| candidate.edit.imports.iter().copied())
            .collect();
        if let Some(text) = ensure_imports(&rewritten, &required) {
            rewritten = SourceUnit::parse_with_path(text, unit.path())?;
        }

        let entries = applied
            .into_iter()
            .map(|candidate| {
                let definition = definition(candidate.pattern_match.pattern_id);
                RewriteEntry {
                    pattern_id: definition.id,
                    original_span: candidate.edit.span,
                    replacement_text: self.replacement_lines(&candidate).join("\n"),
                    rationale: candidate.edit.rationale.to_string(),
                    complexity_before: definition.complexity_before,
                    complexity_after: definition.complexity_after,
                }
            })
            .collect();

        unsupported.sort_by(|a, b| a.pattern_match.first_line().cmp(&b.pattern_match.first_line()));
        Ok(RewriteOutcome {
            plan: RewritePlan { entries },
            rewritten,
            superseded,
            unsupported,
        })
    }

    /// Apply edits bottom-up; returns the kept edits and the final unit.
    fn apply<'m>(
        &self,
        unit: &SourceUnit,
        mut accepted: Vec<Candidate<'m>>,
        unsupported: &mut Vec<Unsupported>,
    ) -> (Vec<Candidate<'m>>, SourceUnit) {
        accepted.sort_by(|a, b| b.edit.span.start.cmp(&a.edit.span.start));
        let trailing_newline = unit.source().ends_with('\n');
        let newline = unit.line_ending();
        let mut lines: Vec<String> = unit.source().lines().map(str::to_string).collect();
        let mut current = unit.clone();
        let mut applied = Vec::new();

        for candidate in accepted {
            let span = candidate.edit.span;
            if span.end > lines.len() {
                unsupported.push(Unsupported {
                    pattern_match: candidate.pattern_match.clone(),
                    reason: "edit reaches past the end of the file".to_string(),
                });
                continue;
            }
            let replacement = self.replacement_lines(&candidate);
            let inserted = replacement.len();
            let removed: Vec<String> = lines
                .splice(span.start - 1..span.end, replacement)
                .collect();

            match SourceUnit::parse_with_path(join_lines(&lines, trailing_newline, newline), unit.path()) {
                Ok(reparsed) => {
                    debug!(pattern = %candidate.pattern_match.pattern_id, %span, "applied rewrite");
                    current = reparsed;
                    applied.push(candidate);
                }
                Err(err) => {
                    warn!(pattern = %candidate.pattern_match.pattern_id, %span, error = %err, "reverting rewrite");
                    drop(lines.splice(span.start - 1..span.start - 1 + inserted, removed));
                    unsupported.push(Unsupported {
                        pattern_match: candidate.pattern_match.clone(),
                        reason: "rewritten text does not parse".to_string(),
                    });
                }
            }
        }
        (applied, current)
    }

    fn replacement_lines(&self, candidate: &Candidate<'_>) -> Vec<String> {
        let mut lines = Vec::with_capacity(candidate.edit.lines.len() + 1);
        if self.annotate {
            let definition = definition(candidate.pattern_match.pattern_id);
            lines.push(format!(
                "{}# energylens: {} {} -> {}: {}",
                candidate.edit.indent,
                definition.id,
                definition.complexity_before,
                definition.complexity_after,
                candidate.edit.rationale
            ));
        }
        lines.extend(candidate.edit.lines.iter().cloned());
        lines
    }
}

fn by_priority(a: &Candidate<'_>, b: &Candidate<'_>) -> Ordering {
    b.pattern_match
        .estimated_speedup_factor
        .total_cmp(&a.pattern_match.estimated_speedup_factor)
        .then(a.edit.span.start.cmp(&b.edit.span.start))
        .then(
            a.pattern_match
                .pattern_id
                .as_str()
                .cmp(b.pattern_match.pattern_id.as_str()),
        )
}

/// Greedily keep the highest-priority edits whose spans do not overlap.
fn resolve_conflicts(mut candidates: Vec<Candidate<'_>>) -> (Vec<Candidate<'_>>, Vec<Superseded>) {
    candidates.sort_by(by_priority);
    let mut accepted: Vec<Candidate<'_>> = Vec::new();
    let mut superseded = Vec::new();
    for candidate in candidates {
        let winner = accepted
            .iter()
            .find(|kept| kept.edit.span.overlaps(&candidate.edit.span))
            .map(|kept| kept.pattern_match.pattern_id);
        match winner {
            Some(by) => {
                debug!(pattern = %candidate.pattern_match.pattern_id, %by, "superseded");
                superseded.push(Superseded {
                    pattern_match: candidate.pattern_match.clone(),
                    by,
                });
            }
            None => accepted.push(candidate),
        }
    }
    (accepted, superseded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::walk;
    use crate::patterns::find_matches;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn rewrite(source: &str, annotate: bool) -> RewriteOutcome {
        let unit = SourceUnit::parse(source).unwrap();
        let matches = find_matches(&walk(&unit));
        RewriteEngine::new(annotate).rewrite(&unit, &matches).unwrap()
    }

    #[test]
    fn test_no_matches_leaves_text_untouched() {
        let source = "x = 1\n";
        let outcome = rewrite(source, true);
        assert!(outcome.plan.is_empty());
        assert_eq!(outcome.text(), source);
    }

    #[test]
    fn test_annotated_join_rewrite() {
        let outcome = rewrite(
            indoc! {"
                result = ''
                for x in items:
                    result += str(x)
                print(result)
            "},
            true,
        );
        assert_eq!(
            outcome.text(),
            indoc! {r#"
                result = ''
                # energylens: string_concat_in_loop O(n) -> O(n): builds the string once instead of copying it on every iteration
                result += "".join(str(x) for x in items)
                print(result)
            "#}
        );
        assert_eq!(outcome.plan.applied_ids(), vec![PatternId::StringConcatInLoop]);
        assert_eq!(outcome.plan.entries[0].original_span, LineSpan::new(2, 3));
    }

    #[test]
    fn test_crlf_terminators_survive_rewrite() {
        let source = "x = 1\r\nresult = ''\r\nfor x in items:\r\n    result += str(x)\r\nprint(result)\r\n";
        let outcome = rewrite(source, true);
        assert_eq!(outcome.plan.applied_ids(), vec![PatternId::StringConcatInLoop]);
        assert_eq!(
            outcome.text(),
            "x = 1\r\n\
             result = ''\r\n\
             # energylens: string_concat_in_loop O(n) -> O(n): builds the string once instead of copying it on every iteration\r\n\
             result += \"\".join(str(x) for x in items)\r\n\
             print(result)\r\n"
        );
    }

    #[test]
    fn test_crlf_import_insertion() {
        let source = "def tally(words):\r\n    counts = {}\r\n    for w in words:\r\n        counts[w] = counts.get(w, 0) + 1\r\n    return counts\r\n";
        let outcome = rewrite(source, false);
        assert_eq!(
            outcome.text(),
            "import collections\r\n\
             def tally(words):\r\n\
             \x20   counts = collections.Counter(words)\r\n\
             \x20   return counts\r\n"
        );
        assert!(!outcome.text().replace("\r\n", "").contains('\n'));
    }

    #[test]
    fn test_multiple_edits_applied_bottom_up_with_imports() {
        let outcome = rewrite(
            indoc! {"
                def fib(n):
                    if n < 2:
                        return n
                    return fib(n - 1) + fib(n - 2)

                def tally(words):
                    counts = {}
                    for w in words:
                        counts[w] = counts.get(w, 0) + 1
                    return counts
            "},
            false,
        );
        assert_eq!(
            outcome.text(),
            indoc! {"
                import collections
                import functools
                @functools.lru_cache(maxsize=None)
                def fib(n):
                    if n < 2:
                        return n
                    return fib(n - 1) + fib(n - 2)

                def tally(words):
                    counts = collections.Counter(words)
                    return counts
            "}
        );
        assert_eq!(
            outcome.plan.applied_ids(),
            vec![PatternId::ExponentialRecursion, PatternId::DictManualCountInLoop]
        );
    }

    #[test]
    fn test_independent_loops_are_both_rewritten() {
        let outcome = rewrite(
            indoc! {"
                counts = {}
                for w in words:
                    counts[w] = counts.get(w, 0) + 1
                for w in words:
                    if w.isupper():
                        found.append(w)
            "},
            false,
        );
        assert_eq!(outcome.plan.len(), 2);
        assert!(outcome.superseded.is_empty());
    }

    #[test]
    fn test_template_mismatch_is_unsupported() {
        let unit = SourceUnit::parse(indoc! {"
            out = ''
            for x in items:
                out += str(x)
        "})
        .unwrap();
        let mut matches = find_matches(&walk(&unit));
        let mut twin = matches[0].clone();
        twin.pattern_id = PatternId::ListAppendInLoop;
        twin.estimated_speedup_factor = 2.5;
        matches.push(twin);

        let outcome = RewriteEngine::new(false).rewrite(&unit, &matches).unwrap();
        assert_eq!(outcome.plan.applied_ids(), vec![PatternId::StringConcatInLoop]);
        assert_eq!(outcome.unsupported.len(), 1);
        assert_eq!(outcome.unsupported[0].pattern_match.pattern_id, PatternId::ListAppendInLoop);
    }

    #[test]
    fn test_unsupported_shape_leaves_code_alone() {
        let source = indoc! {"
            out = ''
            for x in items:
                out += str(x)
                log(x)
        "};
        let outcome = rewrite(source, true);
        assert!(outcome.plan.is_empty());
        assert_eq!(outcome.unsupported.len(), 1);
        assert_eq!(outcome.text(), source);
    }

    #[test]
    fn test_conflict_resolution_prefers_speedup() {
        let unit = SourceUnit::parse(indoc! {"
            out = ''
            for x in items:
                out += str(x)
        "})
        .unwrap();
        let matches = find_matches(&walk(&unit));
        let edit = synthesize(
            crate::patterns::TemplateId::Join,
            &matches[0],
            &unit,
            &mut TemplateContext::default(),
        )
        .unwrap();
        let mut slow = matches[0].clone();
        slow.estimated_speedup_factor = 1.5;
        slow.pattern_id = PatternId::ListAppendInLoop;
        let candidates = vec![
            Candidate {
                pattern_match: &slow,
                edit: edit.clone(),
            },
            Candidate {
                pattern_match: &matches[0],
                edit,
            },
        ];
        let (accepted, superseded) = resolve_conflicts(candidates);
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].pattern_match.pattern_id, PatternId::StringConcatInLoop);
        assert_eq!(superseded.len(), 1);
        assert_eq!(superseded[0].by, PatternId::StringConcatInLoop);
    }
}
