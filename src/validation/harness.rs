//! Out-of-sample evaluation on calendar windows.
//!
//! Every model artifact of a run (trend, seasonal profile, MTD mapping,
//! subset models, store models) is fit on the training window only. The
//! validation table reuses those artifacts: trends are extrapolated and the
//! seasonal mapping is looked up, never refit.

use crate::config::PipelineConfig;
use crate::core::{Dataset, EntityId, Observation, TimeWindow, WindowPair};
use crate::error::{ForecastError, Result};
use crate::features::{FeatureBuilder, FeatureTable};
use crate::seasonality::Decomposition;
use crate::selection::{
    FeatureSelector, PersonalizationHierarchy, PersonalizationOutcome, ResultsTable,
    SelectionResult,
};
use crate::utils::stats::mean;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};

/// Outcome of one train/validate run.
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub pair: WindowPair,
    /// Subset search over the global universe.
    pub selection: SelectionResult,
    /// Store models plus the shared model over global and meta-features.
    pub personalization: PersonalizationOutcome,
}

impl ValidationReport {
    pub fn results_table(&self) -> ResultsTable {
        self.selection.results_table()
    }

    pub fn personalized_results_table(&self) -> ResultsTable {
        self.personalization.global.results_table()
    }

    /// Lowest validation RMSPE of the plain subset search.
    pub fn best_validation_rmspe(&self) -> Option<f64> {
        self.selection
            .best_validation()
            .and_then(|r| r.validation_rmspe)
    }

    /// Lowest validation RMSPE of the personalized shared model.
    pub fn best_personalized_rmspe(&self) -> Option<f64> {
        self.personalization
            .global
            .best_validation()
            .and_then(|r| r.validation_rmspe)
    }
}

/// Reports of successive window pairs.
#[derive(Debug, Clone)]
pub struct RollingReport {
    pub folds: Vec<ValidationReport>,
}

impl RollingReport {
    pub fn len(&self) -> usize {
        self.folds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.folds.is_empty()
    }

    /// Mean over folds of the best plain validation RMSPE.
    pub fn mean_validation_rmspe(&self) -> f64 {
        let scores: Vec<f64> = self
            .folds
            .iter()
            .filter_map(|f| f.best_validation_rmspe())
            .collect();
        mean(&scores)
    }

    /// Mean over folds of the best personalized validation RMSPE.
    pub fn mean_personalized_rmspe(&self) -> f64 {
        let scores: Vec<f64> = self
            .folds
            .iter()
            .filter_map(|f| f.best_personalized_rmspe())
            .collect();
        mean(&scores)
    }
}

/// Predicted target for one store-day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    pub entity: EntityId,
    pub date: NaiveDate,
    pub value: f64,
}

/// Runs subset search and personalization on train/validate windows.
#[derive(Debug, Clone, Default)]
pub struct ValidationHarness {
    config: PipelineConfig,
}

impl ValidationHarness {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn global_names(&self) -> Vec<String> {
        self.config.global_features.iter().map(|f| f.name()).collect()
    }

    /// Feature table over `rows` with every configured feature.
    fn table(
        &self,
        dataset: &Dataset,
        decomposition: &Decomposition,
        rows: &[&Observation],
    ) -> Result<FeatureTable> {
        FeatureBuilder::new(dataset.registry(), decomposition)
            .build(rows, &self.config.all_features())
    }

    /// Train on `pair.train`, score on `pair.validate`.
    pub fn run(&self, dataset: &Dataset, pair: &WindowPair) -> Result<ValidationReport> {
        let decomposition = Decomposition::fit(dataset, &pair.train)?;

        let train = self.table(dataset, &decomposition, &dataset.in_window(&pair.train))?;
        let validation = self.table(dataset, &decomposition, &dataset.in_window(&pair.validate))?;
        if validation.fitting_rows().is_empty() {
            return Err(ForecastError::InsufficientData { needed: 1, got: 0 });
        }
        debug!(
            train_rows = train.len(),
            validation_rows = validation.len(),
            "feature tables built"
        );

        let global = self.global_names();
        let selection = FeatureSelector::new(self.config.max_subset_size).select(
            &train.project(&global)?,
            Some(&validation.project(&global)?),
        )?;

        let personalization =
            PersonalizationHierarchy::from_config(&self.config).run(&train, Some(&validation))?;

        let report = ValidationReport {
            pair: *pair,
            selection,
            personalization,
        };
        info!(
            train_start = %pair.train.start,
            validate_start = %pair.validate.start,
            validate_end = %pair.validate.end,
            rmspe = ?report.best_validation_rmspe(),
            personalized = ?report.best_personalized_rmspe(),
            "validation run complete"
        );
        Ok(report)
    }

    /// Run `iterations` times, moving both windows by `shift_days` each time.
    pub fn rolling(
        &self,
        dataset: &Dataset,
        first: &WindowPair,
        shift_days: i64,
        iterations: usize,
    ) -> Result<RollingReport> {
        let folds = (0..iterations)
            .map(|i| {
                let pair = first.shifted(shift_days.saturating_mul(i as i64))?;
                self.run(dataset, &pair)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(RollingReport { folds })
    }

    /// Rolling runs with the configured iteration count and shift.
    pub fn rolling_from_config(&self, dataset: &Dataset, first: &WindowPair) -> Result<RollingReport> {
        self.rolling(
            dataset,
            first,
            self.config.rolling_shift_days,
            self.config.rolling_iterations,
        )
    }

    /// Predict targets for rows outside the dataset (typically with no
    /// target), training on `train`.
    ///
    /// Uses the personalized shared model with the lowest in-sample RMSPE.
    /// Closed rows are predicted as zero and predictions never go negative.
    pub fn forecast(
        &self,
        dataset: &Dataset,
        train: &TimeWindow,
        rows: &[Observation],
    ) -> Result<Vec<Prediction>> {
        let decomposition = Decomposition::fit(dataset, train)?;
        let train_table = self.table(dataset, &decomposition, &dataset.in_window(train))?;
        let outcome = PersonalizationHierarchy::from_config(&self.config).run(&train_table, None)?;
        let model = outcome
            .global
            .best_in_sample()
            .ok_or_else(|| ForecastError::ComputationError("no usable shared model".into()))?;

        let refs: Vec<&Observation> = rows.iter().collect();
        let table = outcome.augment(&self.table(dataset, &decomposition, &refs)?)?;
        let values = model.predict(&table)?;

        Ok(table
            .keys()
            .iter()
            .zip(values)
            .map(|(key, value)| Prediction {
                entity: key.entity,
                date: key.date,
                value: value.max(0.0),
            })
            .collect())
    }
}
