//! Analysis settings, read from `.energylens.toml`.

pub mod loader;

pub use loader::{
    load_config, load_config_file, load_config_from, parse_and_validate_config, CONFIG_FILE_NAME,
};

use crate::complexity::classifier::DEFAULT_FLAG_PENALTY;
use crate::patterns::PatternId;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub scoring: ScoringConfig,
    pub patterns: PatternsConfig,
    pub rewrite: RewriteConfig,
    pub report: ReportConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Points added to the complexity score per penalized flag.
    pub flag_penalty: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            flag_penalty: DEFAULT_FLAG_PENALTY,
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.flag_penalty > 100 {
            return Err(format!(
                "flag_penalty must be between 0 and 100, got {}",
                self.flag_penalty
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternsConfig {
    pub disabled: Vec<PatternId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewriteConfig {
    /// Emit an explanatory comment above each rewritten block.
    pub annotate: bool,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self { annotate: true }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Keep only the first N suggestions.
    pub top: Option<usize>,
    /// Input size used for runtime estimates.
    pub input_size: u64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top: None,
            input_size: 1000,
        }
    }
}

impl ReportConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.input_size == 0 {
            return Err("input_size must be positive".to_string());
        }
        Ok(())
    }
}
