//! Error types for the store-forecast library.

use chrono::NaiveDate;
use std::fmt;
use thiserror::Error;

/// Result type alias for forecast operations.
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Pipeline stage in which a data integrity problem was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Loading,
    DateReconciliation,
    GapDetection,
    Imputation,
    Decomposition,
    FeatureEngineering,
    Personalization,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Loading => "loading",
            Stage::DateReconciliation => "date-reconciliation",
            Stage::GapDetection => "gap-detection",
            Stage::Imputation => "imputation",
            Stage::Decomposition => "decomposition",
            Stage::FeatureEngineering => "feature-engineering",
            Stage::Personalization => "personalization",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while preparing data, fitting or validating models.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    /// The input data violates a structural invariant.
    #[error("data integrity violation during {stage}{}: {message}", location(.entity, .date))]
    DataIntegrity {
        stage: Stage,
        entity: Option<u32>,
        date: Option<NaiveDate>,
        message: String,
    },

    /// No prior-year analogue row exists for a record that must be synthesized.
    #[error("no prior-year analogue for entity {entity} on {date}")]
    ImputationLookup { entity: u32, date: NaiveDate },

    /// Every actual value of an RMSPE comparison was zero.
    #[error("rmspe undefined: every actual value is zero (no signal)")]
    UndefinedMetric,

    /// Input data is empty.
    #[error("empty input data")]
    EmptyData,

    /// Insufficient data points for the operation.
    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Dimension mismatch between data structures.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Computation error (e.g., numerical issues).
    #[error("computation error: {0}")]
    ComputationError(String),
}

impl ForecastError {
    /// Shorthand for a [`ForecastError::DataIntegrity`] error.
    pub fn integrity(
        stage: Stage,
        entity: Option<u32>,
        date: Option<NaiveDate>,
        message: impl Into<String>,
    ) -> Self {
        ForecastError::DataIntegrity {
            stage,
            entity,
            date,
            message: message.into(),
        }
    }
}

fn location(entity: &Option<u32>, date: &Option<NaiveDate>) -> String {
    match (entity, date) {
        (Some(e), Some(d)) => format!(" (entity {}, {})", e, d),
        (Some(e), None) => format!(" (entity {})", e),
        (None, Some(d)) => format!(" ({})", d),
        (None, None) => String::new(),
    }
}
