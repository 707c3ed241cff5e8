//! Zero-safe percentage error metrics.
//!
//! Rows whose actual value is exactly zero have no defined percentage error.
//! They are excluded from the aggregate instead of being counted as 0% or
//! 100%: a closed store contributes nothing to the score.

use crate::error::{ForecastError, Result};

/// Elementwise percentage error `(actual - predicted) / actual`.
///
/// `None` marks the undefined entries where `actual == 0`.
pub fn percentage_errors(actual: &[f64], predicted: &[f64]) -> Result<Vec<Option<f64>>> {
    if actual.len() != predicted.len() {
        return Err(ForecastError::DimensionMismatch {
            expected: actual.len(),
            got: predicted.len(),
        });
    }

    Ok(actual
        .iter()
        .zip(predicted.iter())
        .map(|(&a, &p)| if a == 0.0 { None } else { Some((a - p) / a) })
        .collect())
}

/// Root mean squared percentage error, in percent.
///
/// Averages the squared percentage errors over the defined entries only.
///
/// # Errors
/// * [`ForecastError::EmptyData`] for empty input
/// * [`ForecastError::DimensionMismatch`] when lengths differ
/// * [`ForecastError::UndefinedMetric`] when every actual value is zero
///
/// # Example
/// ```
/// use store_forecast::utils::metrics::rmspe;
///
/// // The zero entry is skipped; the other two are 10% off.
/// let score = rmspe(&[100.0, 0.0, 50.0], &[110.0, 7.0, 45.0]).unwrap();
/// assert!((score - 10.0).abs() < 1e-9);
/// ```
pub fn rmspe(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    if actual.is_empty() || predicted.is_empty() {
        return Err(ForecastError::EmptyData);
    }

    let errors = percentage_errors(actual, predicted)?;

    let (sum_sq, count) = errors
        .iter()
        .flatten()
        .fold((0.0, 0usize), |(sum, n), e| (sum + e * e, n + 1));

    if count == 0 {
        return Err(ForecastError::UndefinedMetric);
    }

    Ok(100.0 * (sum_sq / count as f64).sqrt())
}
