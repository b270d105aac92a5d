//! Shared error types for the analysis pipeline

use crate::patterns::PatternId;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for energylens operations
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed source; fatal for the unit being analyzed
    #[error("Parse error in {}:{line}:{column}: {message}", .file.display())]
    Parse {
        file: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },

    /// Feature vector could not be populated (internal invariant violation)
    #[error("Schema error: feature `{field}` could not be populated: {message}")]
    Schema {
        field: &'static str,
        message: String,
    },

    /// A matched pattern has no safe template for the observed shape
    #[error("Unsupported rewrite for {pattern}: {reason}")]
    UnsupportedRewrite { pattern: PatternId, reason: String },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO errors
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a parse error with location
    pub fn parse(
        file: impl Into<PathBuf>,
        line: usize,
        column: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::Parse {
            file: file.into(),
            line,
            column,
            message: message.into(),
        }
    }

    pub fn schema(field: &'static str, message: impl Into<String>) -> Self {
        Self::Schema {
            field,
            message: message.into(),
        }
    }

    pub fn unsupported(pattern: PatternId, reason: impl Into<String>) -> Self {
        Self::UnsupportedRewrite {
            pattern,
            reason: reason.into(),
        }
    }

    /// Only unsupported rewrites are recoverable; everything else aborts the unit.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::UnsupportedRewrite { .. })
    }
}

/// Result type alias using our error type
pub type Result<T> = std::result::Result<T, Error>;
