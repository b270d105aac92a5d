use super::catalog::CATALOG;
use super::{PatternId, PatternMatch};
use crate::analyzers::StructuralWalk;
use std::collections::BTreeSet;
use tracing::{debug, debug_span};

/// Evaluates every enabled catalog entry once against a walk.
#[derive(Clone, Debug, Default)]
pub struct PatternMatcher {
    disabled: BTreeSet<PatternId>,
}

impl PatternMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_disabled(disabled: impl IntoIterator<Item = PatternId>) -> Self {
        Self {
            disabled: disabled.into_iter().collect(),
        }
    }

    pub fn is_enabled(&self, id: PatternId) -> bool {
        !self.disabled.contains(&id)
    }

    /// Matches ordered by severity (desc), first line, then pattern id.
    ///
    /// A pattern reports at most one match per anchor construct.
    pub fn find(&self, walk: &StructuralWalk) -> Vec<PatternMatch> {
        let _span = debug_span!("match_patterns").entered();
        let mut matches = Vec::new();

        for entry in CATALOG.iter().filter(|entry| self.is_enabled(entry.id)) {
            let mut anchors = BTreeSet::new();
            for site in (entry.detect)(walk) {
                if !anchors.insert(site.anchor.clone()) {
                    continue;
                }
                matches.push(PatternMatch {
                    pattern_id: entry.id,
                    line_range: site.anchor.span,
                    severity: entry.severity,
                    estimated_speedup_factor: entry.estimated_speedup_factor,
                    has_auto_rewrite: entry.template.is_some(),
                    anchor: site.anchor.clone(),
                    focus: site.focus.clone(),
                });
            }
        }

        matches.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then(a.first_line().cmp(&b.first_line()))
                .then(a.pattern_id.as_str().cmp(b.pattern_id.as_str()))
                .then(a.anchor.cmp(&b.anchor))
        });
        debug!(count = matches.len(), "patterns matched");
        matches
    }
}

pub fn find_matches(walk: &StructuralWalk) -> Vec<PatternMatch> {
    PatternMatcher::new().find(walk)
}
