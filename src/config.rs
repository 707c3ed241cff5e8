//! Pipeline configuration.

use crate::features::Feature;
use serde::{Deserialize, Serialize};

/// Which first-pass model predicts the target of synthesized rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImputationModelChoice {
    /// Best single-feature model.
    #[default]
    SingleFeature,
    /// Best two-feature model.
    DoubleFeature,
}

impl ImputationModelChoice {
    pub fn subset_size(&self) -> usize {
        match self {
            ImputationModelChoice::SingleFeature => 1,
            ImputationModelChoice::DoubleFeature => 2,
        }
    }
}

/// Settings for missing-block detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GapConfig {
    /// How many stores must share the short date count for it to count as a
    /// missing block rather than scattered gaps.
    pub min_short_entities: usize,
}

impl Default for GapConfig {
    fn default() -> Self {
        Self {
            min_short_entities: 2,
        }
    }
}

/// Configuration of a full preparation and validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Largest subset size searched by the shared model.
    pub max_subset_size: usize,
    /// Minimum in-sample RMSPE gain (percentage points) for a store's
    /// two-feature model to enter the feature tally.
    pub personalization_threshold: f64,
    pub imputation_model: ImputationModelChoice,
    pub gap: GapConfig,
    /// Universe of the shared model.
    pub global_features: Vec<Feature>,
    /// Universe of each store's personalized models.
    pub local_features: Vec<Feature>,
    /// Number of rolling train/validate runs.
    pub rolling_iterations: usize,
    /// Days between successive rolling windows; negative steps back in time.
    pub rolling_shift_days: i64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_subset_size: 3,
            personalization_threshold: 0.5,
            imputation_model: ImputationModelChoice::SingleFeature,
            gap: GapConfig::default(),
            global_features: Feature::global_default(),
            local_features: Feature::local_default(),
            rolling_iterations: 3,
            rolling_shift_days: -42,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_subset_size(mut self, k: usize) -> Self {
        self.max_subset_size = k;
        self
    }

    pub fn with_personalization_threshold(mut self, threshold: f64) -> Self {
        self.personalization_threshold = threshold;
        self
    }

    pub fn with_imputation_model(mut self, choice: ImputationModelChoice) -> Self {
        self.imputation_model = choice;
        self
    }

    pub fn with_min_short_entities(mut self, n: usize) -> Self {
        self.gap.min_short_entities = n;
        self
    }

    pub fn with_global_features(mut self, features: Vec<Feature>) -> Self {
        self.global_features = features;
        self
    }

    pub fn with_local_features(mut self, features: Vec<Feature>) -> Self {
        self.local_features = features;
        self
    }

    pub fn with_rolling(mut self, iterations: usize, shift_days: i64) -> Self {
        self.rolling_iterations = iterations;
        self.rolling_shift_days = shift_days;
        self
    }

    /// Global features followed by local-only ones, without duplicates.
    pub fn all_features(&self) -> Vec<Feature> {
        let mut all = self.global_features.clone();
        for feature in &self.local_features {
            if !all.contains(feature) {
                all.push(*feature);
            }
        }
        all
    }
}
