//! Ordinary Least Squares (OLS) regression.
//!
//! This is the fitting capability behind the trend decomposition, the
//! feature-subset search and the personalized per-store models.

use crate::error::{ForecastError, Result};

/// OLS regression coefficients, intercept and in-sample fit.
#[derive(Debug, Clone, PartialEq)]
pub struct OLSResult {
    /// Regression coefficients (one per regressor, in input order).
    pub coefficients: Vec<f64>,
    /// Intercept term.
    pub intercept: f64,
    /// Names of regressors in order.
    pub regressor_names: Vec<String>,
    /// Fitted values on the training observations.
    pub fitted: Vec<f64>,
}

impl OLSResult {
    /// Predict values using the fitted OLS model.
    ///
    /// # Arguments
    /// * `regressors` - `(name, values)` pairs; every fitted regressor must be present
    ///
    /// # Returns
    /// Predicted values for each observation.
    pub fn predict(&self, regressors: &[(&str, &[f64])]) -> Result<Vec<f64>> {
        let columns = self
            .regressor_names
            .iter()
            .map(|name| {
                regressors
                    .iter()
                    .find(|(n, _)| n == name)
                    .map(|(_, values)| *values)
                    .ok_or_else(|| {
                        ForecastError::InvalidParameter(format!(
                            "Missing regressor '{}' in prediction data",
                            name
                        ))
                    })
            })
            .collect::<Result<Vec<&[f64]>>>()?;

        self.predict_columns(&columns)
    }

    /// Predict from columns given in the same order as `regressor_names`.
    pub fn predict_columns(&self, columns: &[&[f64]]) -> Result<Vec<f64>> {
        if columns.len() != self.coefficients.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: self.coefficients.len(),
                got: columns.len(),
            });
        }

        let n = columns.first().map(|c| c.len()).unwrap_or(0);
        for column in columns {
            if column.len() != n {
                return Err(ForecastError::DimensionMismatch {
                    expected: n,
                    got: column.len(),
                });
            }
        }

        // intercept + sum(coef_i * x_i)
        let mut predictions = vec![self.intercept; n];
        for (coef, values) in self.coefficients.iter().zip(columns) {
            for (pred, x) in predictions.iter_mut().zip(values.iter()) {
                *pred += coef * x;
            }
        }

        Ok(predictions)
    }

    /// Coefficient of a named regressor.
    pub fn coefficient(&self, name: &str) -> Option<f64> {
        self.regressor_names
            .iter()
            .position(|n| n == name)
            .map(|i| self.coefficients[i])
    }

    /// Get the number of regressors.
    pub fn num_regressors(&self) -> usize {
        self.coefficients.len()
    }
}

/// Fit OLS regression: y = intercept + X @ coefficients
///
/// Uses Cholesky decomposition to solve the normal equations. Regressor order
/// is preserved in the result.
///
/// # Arguments
/// * `y` - Target values (length n)
/// * `regressors` - `(name, values)` pairs (each length n)
///
/// # Returns
/// OLS result with coefficients, intercept and fitted values.
pub fn ols_fit(y: &[f64], regressors: &[(&str, &[f64])]) -> Result<OLSResult> {
    let n = y.len();

    if n == 0 {
        return Err(ForecastError::InsufficientData { needed: 1, got: 0 });
    }

    if regressors.is_empty() {
        // No regressors - just return the mean as intercept
        let intercept = y.iter().sum::<f64>() / n as f64;
        return Ok(OLSResult {
            coefficients: vec![],
            intercept,
            regressor_names: vec![],
            fitted: vec![intercept; n],
        });
    }

    let k = regressors.len();

    // Validate dimensions
    for (_, values) in regressors {
        if values.len() != n {
            return Err(ForecastError::DimensionMismatch {
                expected: n,
                got: values.len(),
            });
        }
    }

    // Design matrix has k+1 columns: [1, x1, x2, ...]
    let num_params = k + 1;

    let mut xtx = vec![vec![0.0; num_params]; num_params];
    let mut xty = vec![0.0; num_params];

    let x_cols: Vec<&[f64]> = regressors.iter().map(|(_, values)| *values).collect();

    for obs in 0..n {
        let y_obs = y[obs];

        xtx[0][0] += 1.0;
        for j in 0..k {
            let xj = x_cols[j][obs];
            xtx[0][j + 1] += xj;
            xtx[j + 1][0] += xj;
        }
        for i in 0..k {
            let xi = x_cols[i][obs];
            for j in 0..k {
                xtx[i + 1][j + 1] += xi * x_cols[j][obs];
            }
        }

        xty[0] += y_obs;
        for i in 0..k {
            xty[i + 1] += x_cols[i][obs] * y_obs;
        }
    }

    // Add small regularization to diagonal for numerical stability
    for i in 0..num_params {
        xtx[i][i] += 1e-8;
    }

    let beta = solve_symmetric(&xtx, &xty).ok_or_else(|| {
        ForecastError::ComputationError(
            "OLS regression failed: matrix not positive definite".into(),
        )
    })?;

    if beta.iter().any(|b| !b.is_finite()) {
        return Err(ForecastError::ComputationError(
            "OLS regression produced non-finite coefficients".into(),
        ));
    }

    let mut result = OLSResult {
        intercept: beta[0],
        coefficients: beta[1..].to_vec(),
        regressor_names: regressors.iter().map(|(name, _)| name.to_string()).collect(),
        fitted: Vec::new(),
    };
    result.fitted = result.predict_columns(&x_cols)?;

    Ok(result)
}

/// Solve symmetric positive definite system using Cholesky decomposition.
///
/// Solves A @ x = b where A is symmetric positive definite.
fn solve_symmetric(a: &[Vec<f64>], b: &[f64]) -> Option<Vec<f64>> {
    let n = b.len();
    if n == 0 || a.len() != n {
        return None;
    }

    // Cholesky decomposition A = L @ L'
    let mut l = vec![vec![0.0; n]; n];

    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[i][j];
            for k in 0..j {
                sum -= l[i][k] * l[j][k];
            }

            if i == j {
                if sum <= 0.0 {
                    return None; // Not positive definite
                }
                l[i][j] = sum.sqrt();
            } else {
                l[i][j] = sum / l[j][j];
            }
        }
    }

    // Forward substitution: L @ y = b
    let mut y = vec![0.0; n];
    for i in 0..n {
        let mut sum = b[i];
        for j in 0..i {
            sum -= l[i][j] * y[j];
        }
        y[i] = sum / l[i][i];
    }

    // Backward substitution: L' @ x = y
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = y[i];
        for j in (i + 1)..n {
            sum -= l[j][i] * x[j];
        }
        x[i] = sum / l[i][i];
    }

    Some(x)
}
