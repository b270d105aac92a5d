pub mod classifier;

pub use classifier::{classify, complexity_score, Classification, ComplexityClassifier};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Asymptotic running-time class, ordered by rank.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ComplexityLabel {
    #[serde(rename = "O(1)")]
    Constant,
    #[serde(rename = "O(log n)")]
    Logarithmic,
    #[serde(rename = "O(n)")]
    Linear,
    #[serde(rename = "O(n log n)")]
    Linearithmic,
    #[serde(rename = "O(n²)")]
    Quadratic,
    #[serde(rename = "O(n³)")]
    Cubic,
    #[serde(rename = "O(2^n)")]
    Exponential,
    #[serde(rename = "O(n!)")]
    Factorial,
}

impl ComplexityLabel {
    pub const MAX_RANK: u32 = 7;

    pub const ALL: [ComplexityLabel; 8] = [
        ComplexityLabel::Constant,
        ComplexityLabel::Logarithmic,
        ComplexityLabel::Linear,
        ComplexityLabel::Linearithmic,
        ComplexityLabel::Quadratic,
        ComplexityLabel::Cubic,
        ComplexityLabel::Exponential,
        ComplexityLabel::Factorial,
    ];

    pub fn rank(self) -> u32 {
        match self {
            ComplexityLabel::Constant => 0,
            ComplexityLabel::Logarithmic => 1,
            ComplexityLabel::Linear => 2,
            ComplexityLabel::Linearithmic => 3,
            ComplexityLabel::Quadratic => 4,
            ComplexityLabel::Cubic => 5,
            ComplexityLabel::Exponential => 6,
            ComplexityLabel::Factorial => 7,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ComplexityLabel::Constant => "O(1)",
            ComplexityLabel::Logarithmic => "O(log n)",
            ComplexityLabel::Linear => "O(n)",
            ComplexityLabel::Linearithmic => "O(n log n)",
            ComplexityLabel::Quadratic => "O(n²)",
            ComplexityLabel::Cubic => "O(n³)",
            ComplexityLabel::Exponential => "O(2^n)",
            ComplexityLabel::Factorial => "O(n!)",
        }
    }

    /// Rough wall-clock estimate for `n` elements at ~1µs per basic step.
    ///
    /// Exponential and factorial growth saturate instead of overflowing.
    pub fn estimated_runtime_ms(self, n: u64) -> f64 {
        let n = n as f64;
        let steps = match self {
            ComplexityLabel::Constant => 1.0,
            ComplexityLabel::Logarithmic => n.max(1.0).log2().max(1.0),
            ComplexityLabel::Linear => n,
            ComplexityLabel::Linearithmic => n * n.max(2.0).log2(),
            ComplexityLabel::Quadratic => n.powi(2),
            ComplexityLabel::Cubic => n.powi(3),
            ComplexityLabel::Exponential => 2f64.powf(n.min(1000.0)),
            ComplexityLabel::Factorial => (1..=(n.min(170.0) as u64)).map(|k| k as f64).product(),
        };
        steps / 1000.0
    }
}

impl fmt::Display for ComplexityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse bucket of a complexity score for reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreBand {
    Low,
    Moderate,
    High,
}

impl fmt::Display for ScoreBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScoreBand::Low => "low",
            ScoreBand::Moderate => "moderate",
            ScoreBand::High => "high",
        };
        f.write_str(name)
    }
}

pub fn score_band(score: u32) -> ScoreBand {
    match score {
        0..=29 => ScoreBand::Low,
        30..=69 => ScoreBand::Moderate,
        _ => ScoreBand::High,
    }
}
