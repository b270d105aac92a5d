// Export modules for library usage
pub mod analyzers;
pub mod batch;
pub mod cli;
pub mod complexity;
pub mod config;
pub mod core;
pub mod energy;
pub mod output;
pub mod patterns;
pub mod pipeline;
pub mod predictor;
pub mod refactoring;
pub mod suggestions;

// Re-export commonly used types
pub use crate::core::{CodeStats, Error, LineSpan, Result, Severity, SourceUnit};

pub use crate::analyzers::{walk, LineCategory, LineCategoryMap, StructuralSummary, StructuralWalk};

pub use crate::complexity::{classify, complexity_score, Classification, ComplexityLabel, ScoreBand};

pub use crate::predictor::{vectorize, EnergyEstimate, EnergyPredictor, FeatureVector};

pub use crate::patterns::{find_matches, PatternId, PatternMatch, PatternMatcher};

pub use crate::energy::{classify_lines, LineEnergy, LineEnergyMap};

pub use crate::refactoring::{RewriteEngine, RewriteOutcome, RewritePlan};

pub use crate::suggestions::{rank, Disposition, Suggestion};

pub use crate::config::AnalysisConfig;

pub use crate::pipeline::{analyze, compare, refactor, AnalysisReport, ComparisonReport, RefactorOutcome};
