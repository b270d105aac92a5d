//! Fixed-schema feature vector handed to an external energy predictor.
//!
//! Field order and count are a contract with trained models: bump
//! [`FEATURE_SCHEMA_VERSION`] on any change.

use crate::analyzers::StructuralSummary;
use crate::core::{Error, Result};
use serde::{Deserialize, Serialize};

pub const FEATURE_SCHEMA_VERSION: u32 = 1;

pub const FEATURE_NAMES: [&str; 8] = [
    "num_loops",
    "max_loop_depth",
    "num_function_calls",
    "string_concat_in_loop",
    "num_list_ops",
    "has_recursion",
    "nested_loops",
    "has_sort",
];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub num_loops: u32,
    pub max_loop_depth: u32,
    pub num_function_calls: u32,
    pub string_concat_in_loop: u32,
    pub num_list_ops: u32,
    pub has_recursion: u32,
    pub nested_loops: u32,
    pub has_sort: u32,
}

impl FeatureVector {
    /// Values in [`FEATURE_NAMES`] order.
    pub fn values(&self) -> [f64; 8] {
        [
            self.num_loops,
            self.max_loop_depth,
            self.num_function_calls,
            self.string_concat_in_loop,
            self.num_list_ops,
            self.has_recursion,
            self.nested_loops,
            self.has_sort,
        ]
        .map(f64::from)
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES
            .iter()
            .position(|field| *field == name)
            .map(|index| self.values()[index])
    }

    /// `(name, other - self)` for every field.
    pub fn delta(&self, other: &FeatureVector) -> Vec<(&'static str, f64)> {
        FEATURE_NAMES
            .iter()
            .zip(self.values().iter().zip(other.values()))
            .map(|(name, (before, after))| (*name, after - before))
            .collect()
    }
}

fn count(field: &'static str, value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::schema(field, format!("{value} does not fit the feature range")))
}

fn flag(value: bool) -> u32 {
    u32::from(value)
}

pub fn vectorize(summary: &StructuralSummary) -> Result<FeatureVector> {
    Ok(FeatureVector {
        num_loops: count("num_loops", summary.loop_count)?,
        max_loop_depth: count("max_loop_depth", summary.max_loop_nest_depth)?,
        num_function_calls: count("num_function_calls", summary.function_call_count)?,
        string_concat_in_loop: flag(summary.string_concat_in_loop),
        num_list_ops: count("num_list_ops", summary.list_op_count)?,
        has_recursion: flag(summary.has_recursion()),
        nested_loops: flag(summary.has_nested_loops()),
        has_sort: flag(summary.has_sort()),
    })
}

/// Opaque result of an energy model.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnergyEstimate {
    pub energy_joules: f64,
    pub confidence_percent: f64,
}

/// An external model turning features into an energy estimate.
pub trait EnergyPredictor: Send + Sync {
    fn predict(&self, features: &FeatureVector) -> Result<EnergyEstimate>;
}

/// Confidence of an ensemble from its members' predictions: `1 - std / mean`, clamped to [0, 1].
pub fn ensemble_confidence(predictions: &[f64]) -> f64 {
    if predictions.is_empty() {
        return 0.0;
    }
    let n = predictions.len() as f64;
    let mean = predictions.iter().sum::<f64>() / n;
    let variance = predictions.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / n;
    (1.0 - variance.sqrt() / (mean + 1e-6)).clamp(0.0, 1.0)
}
