//! Results table of a feature-subset search.
//!
//! One row per subset size: intercept, one coefficient per universe feature
//! (`None` when the feature is not in that size's subset), in-sample and
//! validation RMSPE. This is the handoff to report renderers.

use crate::selection::subset::SelectionResult;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultsRow {
    pub subset_size: usize,
    pub intercept: f64,
    /// Aligned with [`ResultsTable::features`].
    pub coefficients: Vec<Option<f64>>,
    pub in_sample_rmspe: f64,
    pub validation_rmspe: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultsTable {
    pub features: Vec<String>,
    pub rows: Vec<ResultsRow>,
}

impl ResultsTable {
    pub fn from_selection(selection: &SelectionResult) -> Self {
        let rows = selection
            .by_size
            .iter()
            .map(|result| ResultsRow {
                subset_size: result.size,
                intercept: result.model.intercept,
                coefficients: selection
                    .universe
                    .iter()
                    .map(|name| result.model.coefficient(name))
                    .collect(),
                in_sample_rmspe: result.in_sample_rmspe,
                validation_rmspe: result.validation_rmspe,
            })
            .collect();

        Self {
            features: selection.universe.clone(),
            rows,
        }
    }

    /// Coefficient of `feature` in the row for `subset_size`.
    pub fn coefficient(&self, subset_size: usize, feature: &str) -> Option<f64> {
        let column = self.features.iter().position(|f| f == feature)?;
        self.rows
            .iter()
            .find(|row| row.subset_size == subset_size)
            .and_then(|row| row.coefficients[column])
    }
}
