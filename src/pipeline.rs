//! Data preparation: date reconciliation, gap detection and imputation.

use crate::config::PipelineConfig;
use crate::core::{Dataset, EntityId};
use crate::detection::{detect_gaps, GapReport};
use crate::error::Result;
use crate::transform::{reconcile_dataset, GapImputer, ImputationModel, ReconcileSummary};
use std::collections::BTreeMap;
use tracing::info;

/// A dataset ready for modeling, with what was done to it.
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub dataset: Dataset,
    pub reconciliation: ReconcileSummary,
    pub gaps: GapReport,
    /// Synthesized rows per store; empty when there was no block.
    pub synthesized: BTreeMap<EntityId, usize>,
}

/// Reconcile dates, then detect and fill the missing block.
pub fn prepare(mut dataset: Dataset, config: &PipelineConfig) -> Result<PreparedData> {
    let reconciliation = reconcile_dataset(&mut dataset)?;
    let gaps = detect_gaps(&dataset, &config.gap)?;

    let (dataset, synthesized) = if gaps.is_empty() {
        (dataset, BTreeMap::new())
    } else {
        let model =
            ImputationModel::fit(&dataset, &config.global_features, config.imputation_model)?;
        let outcome = GapImputer::impute(&dataset, &gaps, &model)?;
        (outcome.dataset, outcome.synthesized)
    };

    info!(
        rows = dataset.len(),
        muddled = reconciliation.muddled.len(),
        imputed = synthesized.values().sum::<usize>(),
        "dataset prepared"
    );

    Ok(PreparedData {
        dataset,
        reconciliation,
        gaps,
        synthesized,
    })
}
