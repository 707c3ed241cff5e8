//! Exhaustive best-subset search over feature columns.
//!
//! For every subset size `s` in `1..=k`, each `s`-combination of the table's
//! columns is fit by OLS and scored by in-sample RMSPE. The lowest score wins;
//! ties go to the combination enumerated first (lexicographic in column
//! order). The cost is combinatorial in the number of columns, so callers
//! keep the universe small.

use crate::error::{ForecastError, Result};
use crate::features::FeatureTable;
use crate::selection::results::ResultsTable;
use crate::utils::metrics::rmspe;
use crate::utils::ols::{ols_fit, OLSResult};
use rayon::prelude::*;
use tracing::{debug, trace};

/// Best subset of one size.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSubsetResult {
    /// Number of features in the subset.
    pub size: usize,
    /// Feature names, in column order.
    pub features: Vec<String>,
    /// Fitted model; `model.fitted` holds the in-sample fit on the fitting rows.
    pub model: OLSResult,
    pub in_sample_rmspe: f64,
    pub validation_rmspe: Option<f64>,
}

impl FeatureSubsetResult {
    /// Apply the model row-wise. Closed rows are predicted as zero.
    pub fn predict(&self, table: &FeatureTable) -> Result<Vec<f64>> {
        let columns = self
            .features
            .iter()
            .map(|name| {
                table.column(name).ok_or_else(|| {
                    ForecastError::InvalidParameter(format!(
                        "feature '{}' missing from table",
                        name
                    ))
                })
            })
            .collect::<Result<Vec<&[f64]>>>()?;

        let mut predictions = if columns.is_empty() {
            vec![self.model.intercept; table.len()]
        } else {
            self.model.predict_columns(&columns)?
        };
        for (prediction, open) in predictions.iter_mut().zip(table.open()) {
            if !open {
                *prediction = 0.0;
            }
        }
        Ok(predictions)
    }

    /// RMSPE of the model on the fitting rows of `table`.
    pub fn score(&self, table: &FeatureTable) -> Result<f64> {
        let rows = table.fitting_rows();
        let predictions = self.predict(table)?;
        let actual = table.targets_at(&rows);
        let predicted: Vec<f64> = rows.iter().map(|&i| predictions[i]).collect();
        rmspe(&actual, &predicted)
    }
}

/// Best subsets for every searched size.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionResult {
    /// Columns the search ran over, in order.
    pub universe: Vec<String>,
    /// One entry per size that had at least one usable subset, ascending.
    pub by_size: Vec<FeatureSubsetResult>,
}

impl SelectionResult {
    pub fn best(&self, size: usize) -> Option<&FeatureSubsetResult> {
        self.by_size.iter().find(|r| r.size == size)
    }

    /// Lowest in-sample score across sizes; ties favor the smaller subset.
    pub fn best_in_sample(&self) -> Option<&FeatureSubsetResult> {
        self.by_size
            .iter()
            .min_by(|a, b| a.in_sample_rmspe.total_cmp(&b.in_sample_rmspe))
    }

    /// Lowest validation score across sizes, if validation was run.
    pub fn best_validation(&self) -> Option<&FeatureSubsetResult> {
        self.by_size
            .iter()
            .filter(|r| r.validation_rmspe.is_some())
            .min_by(|a, b| {
                let a = a.validation_rmspe.unwrap_or(f64::INFINITY);
                let b = b.validation_rmspe.unwrap_or(f64::INFINITY);
                a.total_cmp(&b)
            })
    }

    /// Tabular form handed to report renderers.
    pub fn results_table(&self) -> ResultsTable {
        ResultsTable::from_selection(self)
    }
}

/// Exhaustive subset search up to `max_size` features.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureSelector {
    max_size: usize,
}

struct Candidate {
    index: usize,
    score: f64,
    subset: Vec<usize>,
    model: OLSResult,
}

impl FeatureSelector {
    pub fn new(max_size: usize) -> Self {
        Self { max_size }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Search every subset of `train`'s columns up to `max_size` features.
    ///
    /// Sizes larger than the number of columns, and sizes where every subset
    /// is numerically unusable, are skipped. When `validation` is given, each
    /// size's winner is also scored on it.
    pub fn select(
        &self,
        train: &FeatureTable,
        validation: Option<&FeatureTable>,
    ) -> Result<SelectionResult> {
        if self.max_size == 0 {
            return Err(ForecastError::InvalidParameter(
                "maximum subset size must be at least 1".into(),
            ));
        }

        let rows = train.fitting_rows();
        let y = train.targets_at(&rows);
        if y.is_empty() {
            return Err(ForecastError::EmptyData);
        }
        if y.iter().all(|v| *v == 0.0) {
            return Err(ForecastError::UndefinedMetric);
        }

        let universe = train.names().to_vec();
        let mut by_size = Vec::new();

        for size in 1..=self.max_size {
            if size > universe.len() {
                debug!(size, available = universe.len(), "skipping subset size");
                continue;
            }

            let subsets = combinations(universe.len(), size);
            let best = subsets
                .into_par_iter()
                .enumerate()
                .filter_map(|(index, subset)| {
                    let (score, model) = evaluate(train, &rows, &y, &subset)?;
                    Some(Candidate {
                        index,
                        score,
                        subset,
                        model,
                    })
                })
                .min_by(|a, b| a.score.total_cmp(&b.score).then(a.index.cmp(&b.index)));

            let Some(best) = best else {
                debug!(size, "no usable subset of this size");
                continue;
            };

            let mut result = FeatureSubsetResult {
                size,
                features: best.subset.iter().map(|&j| universe[j].clone()).collect(),
                model: best.model,
                in_sample_rmspe: best.score,
                validation_rmspe: None,
            };
            if let Some(validation) = validation {
                result.validation_rmspe = Some(result.score(validation)?);
            }

            debug!(
                size,
                features = ?result.features,
                score = result.in_sample_rmspe,
                validation = ?result.validation_rmspe,
                "best subset"
            );
            by_size.push(result);
        }

        Ok(SelectionResult { universe, by_size })
    }
}

/// Fit and score one subset. `None` when the fit or the score is unusable.
fn evaluate(
    train: &FeatureTable,
    rows: &[usize],
    y: &[f64],
    subset: &[usize],
) -> Option<(f64, OLSResult)> {
    let columns: Vec<Vec<f64>> = subset.iter().map(|&j| train.values_at(j, rows)).collect();
    let regressors: Vec<(&str, &[f64])> = subset
        .iter()
        .zip(columns.iter())
        .map(|(&j, values)| (train.names()[j].as_str(), values.as_slice()))
        .collect();

    let model = match ols_fit(y, &regressors) {
        Ok(model) => model,
        Err(e) => {
            trace!(?subset, error = %e, "subset fit failed");
            return None;
        }
    };

    match rmspe(y, &model.fitted) {
        Ok(score) if score.is_finite() => Some((score, model)),
        _ => None,
    }
}

/// All `k`-combinations of `0..n` in lexicographic order.
pub fn combinations(n: usize, k: usize) -> Vec<Vec<usize>> {
    if k == 0 || k > n {
        return Vec::new();
    }

    let mut result = Vec::new();
    let mut current: Vec<usize> = (0..k).collect();
    loop {
        result.push(current.clone());

        // Rightmost position that can still advance.
        let Some(i) = (0..k).rev().find(|&i| current[i] < n - k + i) else {
            break;
        };
        current[i] += 1;
        for j in (i + 1)..k {
            current[j] = current[j - 1] + 1;
        }
    }
    result
}
