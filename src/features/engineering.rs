//! Turning observations into feature tables.

use crate::core::{EntityRegistry, Observation};
use crate::error::{ForecastError, Result, Stage};
use crate::features::table::{FeatureTable, RowKey};
use crate::features::Feature;
use crate::seasonality::Decomposition;

/// Builds feature tables from observations using one training-window
/// decomposition.
///
/// Rows outside the decomposition's window get trend values by extrapolation
/// and seasonal averages from the training mapping.
#[derive(Debug, Clone, Copy)]
pub struct FeatureBuilder<'a> {
    registry: &'a EntityRegistry,
    decomposition: &'a Decomposition,
}

impl<'a> FeatureBuilder<'a> {
    pub fn new(registry: &'a EntityRegistry, decomposition: &'a Decomposition) -> Self {
        Self {
            registry,
            decomposition,
        }
    }

    /// Build a table over `rows` with one column per feature, in order.
    ///
    /// Meta-features are rejected here; the personalization pass adds them.
    pub fn build(&self, rows: &[&Observation], features: &[Feature]) -> Result<FeatureTable> {
        if let Some(meta) = features.iter().find(|f| f.is_meta()) {
            return Err(ForecastError::InvalidParameter(format!(
                "'{}' is produced by the personalization pass",
                meta.name()
            )));
        }

        let keys = rows
            .iter()
            .map(|o| RowKey {
                entity: o.entity,
                date: o.date,
            })
            .collect();
        let open = rows.iter().map(|o| o.open).collect();
        let targets = rows.iter().map(|o| o.effective_target()).collect();
        let mut table = FeatureTable::new(keys, open, targets)?;

        for feature in features {
            let values = rows
                .iter()
                .map(|o| self.value(feature, o))
                .collect::<Result<Vec<f64>>>()?;
            table.push_column(feature.name(), values)?;
        }

        Ok(table)
    }

    fn value(&self, feature: &Feature, obs: &Observation) -> Result<f64> {
        let flag = |b: bool| if b { 1.0 } else { 0.0 };

        let entity = self.registry.get(obs.entity).ok_or_else(|| {
            ForecastError::integrity(
                Stage::FeatureEngineering,
                Some(obs.entity),
                Some(obs.date),
                "unknown entity",
            )
        })?;

        let value = match feature {
            Feature::Mtd => {
                if !obs.open {
                    0.0
                } else {
                    let decomposition = self.decomposition.get(obs.entity).ok_or_else(|| {
                        ForecastError::integrity(
                            Stage::FeatureEngineering,
                            Some(obs.entity),
                            Some(obs.date),
                            "no trend/seasonal decomposition for entity",
                        )
                    })?;
                    decomposition.mtd(obs.date)
                }
            }
            Feature::Promo => flag(obs.promo),
            Feature::Promo2 => flag(entity.promo2_active(obs.date)),
            Feature::SchoolHoliday => flag(obs.school_holiday),
            Feature::Holiday(class) => flag(obs.state_holiday == *class),
            Feature::CompetitionOpen => flag(entity.competition_open(obs.date)),
            Feature::StoreType(t) => flag(entity.store_type == *t),
            Feature::Assortment(a) => flag(entity.assortment == *a),
            Feature::IndividualModel1 | Feature::IndividualModel2 => {
                return Err(ForecastError::InvalidParameter(format!(
                    "'{}' cannot be computed from an observation",
                    feature.name()
                )))
            }
        };

        Ok(value)
    }
}
