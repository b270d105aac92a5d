//! Walker → classifier / vectorizer / matcher / line classifier → rewrite + ranking.

use crate::analyzers::{walk, StructuralSummary, StructuralWalk};
use crate::complexity::{Classification, ComplexityClassifier};
use crate::config::AnalysisConfig;
use crate::core::{CodeStats, Result, SourceUnit};
use crate::energy::{classify_lines, LineEnergy, LineEnergyMap};
use crate::patterns::{PatternMatch, PatternMatcher};
use crate::predictor::{vectorize, EnergyEstimate, EnergyPredictor, FeatureVector, FEATURE_SCHEMA_VERSION};
use crate::refactoring::{RewriteEngine, RewritePlan, Superseded, Unsupported};
use crate::suggestions::{rank, Suggestion};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, debug_span, info};

#[derive(Clone, Debug, Serialize)]
pub struct AnalysisReport {
    pub path: PathBuf,
    pub summary: StructuralSummary,
    pub classification: Classification,
    pub estimated_runtime_ms: f64,
    pub feature_schema_version: u32,
    pub features: FeatureVector,
    pub matches: Vec<PatternMatch>,
    pub line_energy: LineEnergyMap,
    pub suggestions: Vec<Suggestion>,
    pub code_stats: CodeStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy_estimate: Option<EnergyEstimate>,
}

impl AnalysisReport {
    pub fn high_energy_lines(&self) -> usize {
        self.line_energy.count(LineEnergy::High)
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct RefactorOutcome {
    pub path: PathBuf,
    pub before: Classification,
    pub after: Classification,
    pub plan: RewritePlan,
    pub rewritten_text: String,
    pub superseded: Vec<Superseded>,
    pub unsupported: Vec<Unsupported>,
    pub suggestions: Vec<Suggestion>,
}

impl RefactorOutcome {
    pub fn changed(&self) -> bool {
        !self.plan.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FeatureDelta {
    pub name: &'static str,
    pub delta: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct ComparisonReport {
    pub original: PathBuf,
    pub optimized: PathBuf,
    pub before: Classification,
    pub after: Classification,
    /// `after - before`; negative means the score dropped.
    pub score_delta: i64,
    pub rank_delta: i64,
    pub feature_deltas: Vec<FeatureDelta>,
    pub high_energy_lines_before: usize,
    pub high_energy_lines_after: usize,
}

impl ComparisonReport {
    pub fn improved(&self) -> bool {
        self.rank_delta < 0 || (self.rank_delta == 0 && self.score_delta < 0)
    }
}

struct Stages {
    walk: StructuralWalk,
    classification: Classification,
    features: FeatureVector,
    matches: Vec<PatternMatch>,
}

fn run_stages(unit: &SourceUnit, config: &AnalysisConfig) -> Result<Stages> {
    let walk = walk(unit);
    let classification = ComplexityClassifier::new(config.scoring.flag_penalty).classify(&walk.summary);
    let features = vectorize(&walk.summary)?;
    let matches = PatternMatcher::with_disabled(config.patterns.disabled.iter().copied()).find(&walk);
    Ok(Stages {
        walk,
        classification,
        features,
        matches,
    })
}

pub fn analyze(unit: &SourceUnit, config: &AnalysisConfig) -> Result<AnalysisReport> {
    let _span = debug_span!("analyze", path = %unit.path().display()).entered();
    let stages = run_stages(unit, config)?;
    let suggestions = rank(&stages.matches, None, config.report.top);
    let report = AnalysisReport {
        path: unit.path().to_path_buf(),
        estimated_runtime_ms: stages
            .classification
            .label
            .estimated_runtime_ms(config.report.input_size),
        classification: stages.classification,
        feature_schema_version: FEATURE_SCHEMA_VERSION,
        features: stages.features,
        line_energy: classify_lines(&stages.walk.categories),
        summary: stages.walk.summary,
        matches: stages.matches,
        suggestions,
        code_stats: CodeStats::from_source(unit.source()),
        energy_estimate: None,
    };
    debug!(
        label = %report.classification.label,
        score = report.classification.score,
        matches = report.matches.len(),
        "analysis complete"
    );
    Ok(report)
}

/// Analysis plus an estimate from an external energy model.
pub fn analyze_with_predictor(
    unit: &SourceUnit,
    config: &AnalysisConfig,
    predictor: &dyn EnergyPredictor,
) -> Result<AnalysisReport> {
    let mut report = analyze(unit, config)?;
    report.energy_estimate = Some(predictor.predict(&report.features)?);
    Ok(report)
}

pub fn refactor(unit: &SourceUnit, config: &AnalysisConfig) -> Result<RefactorOutcome> {
    let _span = debug_span!("refactor", path = %unit.path().display()).entered();
    let stages = run_stages(unit, config)?;
    let outcome = RewriteEngine::new(config.rewrite.annotate).rewrite(unit, &stages.matches)?;
    let after = run_stages(&outcome.rewritten, config)?.classification;
    let suggestions = rank(&stages.matches, Some(&outcome), config.report.top);

    info!(
        applied = outcome.plan.len(),
        unsupported = outcome.unsupported.len(),
        before = %stages.classification.label,
        after = %after.label,
        "refactor complete"
    );
    Ok(RefactorOutcome {
        path: unit.path().to_path_buf(),
        before: stages.classification,
        after,
        rewritten_text: outcome.text().to_string(),
        plan: outcome.plan,
        superseded: outcome.superseded,
        unsupported: outcome.unsupported,
        suggestions,
    })
}

pub fn compare(
    original: &SourceUnit,
    optimized: &SourceUnit,
    config: &AnalysisConfig,
) -> Result<ComparisonReport> {
    let before = analyze(original, config)?;
    let after = analyze(optimized, config)?;
    let feature_deltas = before
        .features
        .delta(&after.features)
        .into_iter()
        .map(|(name, delta)| FeatureDelta { name, delta })
        .collect();
    Ok(ComparisonReport {
        original: before.path.clone(),
        optimized: after.path.clone(),
        score_delta: i64::from(after.classification.score) - i64::from(before.classification.score),
        rank_delta: i64::from(after.classification.label.rank())
            - i64::from(before.classification.label.rank()),
        feature_deltas,
        high_energy_lines_before: before.high_energy_lines(),
        high_energy_lines_after: after.high_energy_lines(),
        before: before.classification,
        after: after.classification,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::complexity::ComplexityLabel;
    use crate::core::Error;
    use crate::patterns::PatternId;
    use indoc::indoc;

    const CONCAT: &str = indoc! {"
        def render(items):
            result = ''
            for x in items:
                result += str(x)
            return result
    "};

    #[test]
    fn test_analyze_report_fields() {
        let unit = SourceUnit::parse(CONCAT).unwrap();
        let report = analyze(&unit, &AnalysisConfig::default()).unwrap();
        assert_eq!(report.classification.label, ComplexityLabel::Linear);
        assert_eq!(report.classification.score, 39);
        assert_eq!(report.line_energy.len(), 5);
        assert_eq!(report.code_stats.total_lines, 5);
        assert_eq!(report.suggestions.len(), 1);
        assert_eq!(report.features.string_concat_in_loop, 1);
        assert!(report.energy_estimate.is_none());
    }

    #[test]
    fn test_report_serializes_line_map_with_string_keys() {
        let unit = SourceUnit::parse("x = 1\n").unwrap();
        let report = analyze(&unit, &AnalysisConfig::default()).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["line_energy"]["1"], "low");
        assert_eq!(json["classification"]["label"], "O(1)");
    }

    #[test]
    fn test_refactor_lowers_score() {
        let unit = SourceUnit::parse(CONCAT).unwrap();
        let outcome = refactor(&unit, &AnalysisConfig::default()).unwrap();
        assert!(outcome.changed());
        assert_eq!(outcome.before.label, ComplexityLabel::Linear);
        assert_eq!(outcome.after.label, ComplexityLabel::Linear);
        assert!(outcome.after.score < outcome.before.score);
        assert!(SourceUnit::parse(outcome.rewritten_text.as_str()).is_ok());
    }

    #[test]
    fn test_disabled_pattern_is_not_reported() {
        let unit = SourceUnit::parse(CONCAT).unwrap();
        let mut config = AnalysisConfig::default();
        config.patterns.disabled.push(PatternId::StringConcatInLoop);
        let report = analyze(&unit, &config).unwrap();
        assert!(report.matches.is_empty());
        // The flag still counts toward the score.
        assert_eq!(report.classification.score, 39);
    }

    #[test]
    fn test_compare_reports_improvement() {
        let original = SourceUnit::parse_with_path(
            indoc! {"
                for a in xs:
                    for b in xs:
                        print(a, b)
            "},
            "slow.py",
        )
        .unwrap();
        let optimized = SourceUnit::parse_with_path("for a in xs:\n    print(a)\n", "fast.py").unwrap();
        let comparison = compare(&original, &optimized, &AnalysisConfig::default()).unwrap();
        assert!(comparison.improved());
        assert_eq!(comparison.rank_delta, -2);
        assert_eq!(comparison.feature_deltas[1].name, "max_loop_depth");
        assert_eq!(comparison.feature_deltas[1].delta, -1.0);
        assert_eq!(comparison.high_energy_lines_before, 2);
        assert_eq!(comparison.high_energy_lines_after, 1);
    }

    struct Failing;

    impl EnergyPredictor for Failing {
        fn predict(&self, _features: &FeatureVector) -> Result<EnergyEstimate> {
            Err(Error::Configuration("no model loaded".to_string()))
        }
    }

    #[test]
    fn test_predictor_errors_propagate() {
        let unit = SourceUnit::parse("x = 1\n").unwrap();
        let err = analyze_with_predictor(&unit, &AnalysisConfig::default(), &Failing).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }
}
