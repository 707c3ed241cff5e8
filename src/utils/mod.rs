//! Numerical utilities: OLS fitting, metrics and summary statistics.

pub mod metrics;
pub mod ols;
pub mod stats;

pub use metrics::{percentage_errors, rmspe};
pub use ols::{ols_fit, OLSResult};
pub use stats::{majority, mean, median};
