//! Two-level personalization: per-store models fed to a shared model.
//!
//! Pass 1 fits, for every store on its own rows, the best one- and
//! two-feature models over a small local universe. Their predictions become
//! the `IndividualModel1` / `IndividualModel2` columns. Pass 2 reruns the
//! subset search over all stores with the global universe plus those two
//! columns.

use crate::config::PipelineConfig;
use crate::core::EntityId;
use crate::error::{ForecastError, Result, Stage};
use crate::features::{FeatureTable, INDIVIDUAL_MODEL_1, INDIVIDUAL_MODEL_2};
use crate::selection::subset::{FeatureSelector, FeatureSubsetResult, SelectionResult};
use crate::utils::stats::is_constant;
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::{debug, info};

const CONSTANT_TOLERANCE: f64 = 1e-12;

/// A store's own best one- and two-feature models.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonalizedModel {
    pub entity: EntityId,
    pub single: FeatureSubsetResult,
    /// `None` when only one local feature varies for this store.
    pub double: Option<FeatureSubsetResult>,
}

impl PersonalizedModel {
    /// In-sample RMSPE gain of the two-feature model over the one-feature
    /// model, in percentage points.
    pub fn improvement(&self) -> Option<f64> {
        self.double
            .as_ref()
            .map(|double| self.single.in_sample_rmspe - double.in_sample_rmspe)
    }

    /// Model behind `IndividualModel2`; the single-feature model stands in
    /// when there is no two-feature model.
    pub fn second(&self) -> &FeatureSubsetResult {
        self.double.as_ref().unwrap_or(&self.single)
    }
}

/// How often each local feature won across stores.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureTally {
    /// Features of one-feature winners.
    pub single: BTreeMap<String, usize>,
    /// Features of two-feature winners that cleared the threshold.
    pub double: BTreeMap<String, usize>,
    /// Stores whose two-feature model was left out of the tally.
    pub excluded: usize,
}

impl FeatureTally {
    pub fn from_models<'a>(
        models: impl IntoIterator<Item = &'a PersonalizedModel>,
        threshold: f64,
    ) -> Self {
        let mut tally = FeatureTally::default();
        for model in models {
            for feature in &model.single.features {
                *tally.single.entry(feature.clone()).or_insert(0) += 1;
            }
            match (&model.double, model.improvement()) {
                (Some(double), Some(gain)) if gain >= threshold => {
                    for feature in &double.features {
                        *tally.double.entry(feature.clone()).or_insert(0) += 1;
                    }
                }
                _ => tally.excluded += 1,
            }
        }
        tally
    }
}

/// Result of both personalization passes.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonalizationOutcome {
    pub models: BTreeMap<EntityId, PersonalizedModel>,
    /// Shared model searched over the global universe plus meta-features.
    pub global: SelectionResult,
    pub tally: FeatureTally,
}

impl PersonalizationOutcome {
    /// Copy of `table` with the two meta-feature columns appended.
    ///
    /// Every row is predicted by its own store's models.
    pub fn augment(&self, table: &FeatureTable) -> Result<FeatureTable> {
        augment(&self.models, table)
    }
}

fn augment(
    models: &BTreeMap<EntityId, PersonalizedModel>,
    table: &FeatureTable,
) -> Result<FeatureTable> {
    let mut first = vec![0.0; table.len()];
    let mut second = vec![0.0; table.len()];

    for (entity, rows) in table.entity_rows() {
        let model = models.get(&entity).ok_or_else(|| {
            ForecastError::integrity(
                Stage::Personalization,
                Some(entity),
                None,
                "no personalized model for store",
            )
        })?;
        let sub = table.select_rows(&rows);
        let single = model.single.predict(&sub)?;
        let double = model.second().predict(&sub)?;
        for (j, &row) in rows.iter().enumerate() {
            first[row] = single[j];
            second[row] = double[j];
        }
    }

    let mut augmented = table.clone();
    augmented.push_column(INDIVIDUAL_MODEL_1, first)?;
    augmented.push_column(INDIVIDUAL_MODEL_2, second)?;
    Ok(augmented)
}

/// Runs both personalization passes.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonalizationHierarchy {
    local_features: Vec<String>,
    global_features: Vec<String>,
    max_subset_size: usize,
    threshold: f64,
}

impl PersonalizationHierarchy {
    pub fn new(
        local_features: Vec<String>,
        global_features: Vec<String>,
        max_subset_size: usize,
        threshold: f64,
    ) -> Self {
        Self {
            local_features,
            global_features,
            max_subset_size,
            threshold,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            config.local_features.iter().map(|f| f.name()).collect(),
            config.global_features.iter().map(|f| f.name()).collect(),
            config.max_subset_size,
            config.personalization_threshold,
        )
    }

    /// Pass 1 for one store. `table` holds only that store's rows.
    ///
    /// Columns constant over the store's fitting rows are dropped first.
    pub fn fit_entity(&self, entity: EntityId, table: &FeatureTable) -> Result<PersonalizedModel> {
        let local = table.project(&self.local_features)?;
        let rows = local.fitting_rows();

        let varying: Vec<String> = local
            .names()
            .iter()
            .enumerate()
            .filter(|(j, _)| !is_constant(&local.values_at(*j, &rows), CONSTANT_TOLERANCE))
            .map(|(_, name)| name.clone())
            .collect();
        if varying.is_empty() {
            return Err(ForecastError::integrity(
                Stage::Personalization,
                Some(entity),
                None,
                "no local feature varies over the store's training rows",
            ));
        }

        let search = local.project(&varying)?;
        let selection = FeatureSelector::new(2).select(&search, None).map_err(|e| {
            ForecastError::integrity(
                Stage::Personalization,
                Some(entity),
                None,
                format!("store-level subset search failed: {}", e),
            )
        })?;

        let single = selection.best(1).cloned().ok_or_else(|| {
            ForecastError::integrity(
                Stage::Personalization,
                Some(entity),
                None,
                "no usable single-feature model",
            )
        })?;
        let double = selection.best(2).cloned();

        debug!(
            entity,
            single = ?single.features,
            double = ?double.as_ref().map(|d| &d.features),
            "personalized models"
        );

        Ok(PersonalizedModel {
            entity,
            single,
            double,
        })
    }

    /// Run both passes. Tables must carry every local and global column.
    pub fn run(
        &self,
        train: &FeatureTable,
        validation: Option<&FeatureTable>,
    ) -> Result<PersonalizationOutcome> {
        let groups: Vec<(EntityId, Vec<usize>)> = train.entity_rows().into_iter().collect();

        let models = groups
            .into_par_iter()
            .map(|(entity, rows)| -> Result<(EntityId, PersonalizedModel)> {
                let model = self.fit_entity(entity, &train.select_rows(&rows))?;
                Ok((entity, model))
            })
            .collect::<Result<BTreeMap<EntityId, PersonalizedModel>>>()?;
        info!(stores = models.len(), "store-level models fitted");

        let mut universe = self.global_features.clone();
        universe.push(INDIVIDUAL_MODEL_1.to_string());
        universe.push(INDIVIDUAL_MODEL_2.to_string());

        let global_train = augment(&models, train)?.project(&universe)?;
        let global_validation = validation
            .map(|v| augment(&models, v).and_then(|t| t.project(&universe)))
            .transpose()?;

        let global = FeatureSelector::new(self.max_subset_size)
            .select(&global_train, global_validation.as_ref())?;

        let tally = FeatureTally::from_models(models.values(), self.threshold);
        info!(
            excluded = tally.excluded,
            best = ?global.best_in_sample().map(|r| &r.features),
            "shared model fitted"
        );

        Ok(PersonalizationOutcome {
            models,
            global,
            tally,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::RowKey;
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDate};

    const ROWS: usize = 60;

    /// Store `e`: y = 100e * MTD + 20e * Promo + 5; Promo2 never runs.
    fn table(entities: &[EntityId]) -> FeatureTable {
        let start = NaiveDate::from_ymd_opt(2014, 3, 1).unwrap();
        let mut keys = Vec::new();
        let mut open = Vec::new();
        let mut targets = Vec::new();
        let (mut mtd, mut promo, mut promo2, mut competition) =
            (Vec::new(), Vec::new(), Vec::new(), Vec::new());

        for &e in entities {
            for i in 0..ROWS {
                let m = 1.0 + (i % 7) as f64 / 7.0 + (i % 5) as f64 / 50.0;
                let p = if i % 3 == 0 { 1.0 } else { 0.0 };
                let is_open = !(e == 1 && i == 13);
                keys.push(RowKey {
                    entity: e,
                    date: start + Duration::days(i as i64),
                });
                open.push(is_open);
                targets.push(Some(if is_open {
                    100.0 * e as f64 * m + 20.0 * e as f64 * p + 5.0
                } else {
                    0.0
                }));
                mtd.push(if is_open { m } else { 0.0 });
                promo.push(p);
                promo2.push(0.0);
                competition.push(if i > 30 { 1.0 } else { 0.0 });
            }
        }

        let mut t = FeatureTable::new(keys, open, targets).unwrap();
        t.push_column("MTD", mtd).unwrap();
        t.push_column("Promo", promo).unwrap();
        t.push_column("Promo2", promo2).unwrap();
        t.push_column("CompetitionOpen", competition).unwrap();
        t
    }

    fn hierarchy(threshold: f64) -> PersonalizationHierarchy {
        PersonalizationHierarchy::new(
            vec!["MTD".into(), "Promo".into(), "Promo2".into()],
            vec!["MTD".into(), "Promo".into(), "CompetitionOpen".into()],
            2,
            threshold,
        )
    }

    #[test]
    fn store_models_use_own_rows() {
        let t = table(&[1, 2, 3]);
        let outcome = hierarchy(0.5).run(&t, None).unwrap();

        assert_eq!(outcome.models.len(), 3);
        for (entity, model) in &outcome.models {
            assert_eq!(model.entity, *entity);
            assert_eq!(model.single.features, vec!["MTD"]);
            let double = model.double.as_ref().unwrap();
            assert_eq!(double.features, vec!["MTD", "Promo"]);
            assert_relative_eq!(
                double.model.coefficient("Promo").unwrap(),
                20.0 * *entity as f64,
                epsilon = 1e-3
            );
            assert!(model.improvement().unwrap() > 0.5);
        }
    }

    #[test]
    fn meta_features_track_each_store() {
        let t = table(&[1, 2]);
        let outcome = hierarchy(0.5).run(&t, None).unwrap();
        let augmented = outcome.augment(&t).unwrap();

        let second = augmented.column(INDIVIDUAL_MODEL_2).unwrap();
        for (i, target) in augmented.targets().iter().enumerate() {
            assert_relative_eq!(second[i], target.unwrap(), epsilon = 1e-3);
        }
        // closed row of store 1
        assert_eq!(augmented.column(INDIVIDUAL_MODEL_1).unwrap()[13], 0.0);

        let best = outcome.global.best(1).unwrap();
        assert_eq!(best.features, vec![INDIVIDUAL_MODEL_2]);
        assert_relative_eq!(best.in_sample_rmspe, 0.0, epsilon = 1e-3);
    }

    #[test]
    fn validation_rows_use_training_coefficients() {
        let t = table(&[1, 2]);
        let train_rows: Vec<usize> = t
            .keys()
            .iter()
            .enumerate()
            .filter(|(_, k)| k.date < NaiveDate::from_ymd_opt(2014, 4, 15).unwrap())
            .map(|(i, _)| i)
            .collect();
        let validation_rows: Vec<usize> =
            (0..t.len()).filter(|i| !train_rows.contains(i)).collect();
        let train = t.select_rows(&train_rows);
        let validation = t.select_rows(&validation_rows);

        let outcome = hierarchy(0.5).run(&train, Some(&validation)).unwrap();
        let best = outcome.global.best(1).unwrap();
        assert_relative_eq!(best.validation_rmspe.unwrap(), 0.0, epsilon = 1e-2);
    }

    #[test]
    fn tally_respects_threshold() {
        let t = table(&[1, 2, 3]);
        let outcome = hierarchy(0.5).run(&t, None).unwrap();
        assert_eq!(outcome.tally.single.get("MTD"), Some(&3));
        assert_eq!(outcome.tally.double.get("Promo"), Some(&3));
        assert_eq!(outcome.tally.excluded, 0);

        let strict = FeatureTally::from_models(outcome.models.values(), 1e9);
        assert_eq!(strict.single.get("MTD"), Some(&3));
        assert!(strict.double.is_empty());
        assert_eq!(strict.excluded, 3);
    }

    #[test]
    fn constant_columns_are_dropped() {
        let t = table(&[2]);
        let model = hierarchy(0.5).fit_entity(2, &t).unwrap();
        assert!(!model.single.features.contains(&"Promo2".to_string()));
        assert!(!model.second().features.contains(&"Promo2".to_string()));

        let only_constant = PersonalizationHierarchy::new(vec!["Promo2".into()], vec![], 1, 0.5);
        assert!(matches!(
            only_constant.fit_entity(2, &t),
            Err(ForecastError::DataIntegrity { entity: Some(2), .. })
        ));
    }

    #[test]
    fn unknown_store_cannot_be_augmented() {
        let outcome = hierarchy(0.5).run(&table(&[1]), None).unwrap();
        assert!(outcome.augment(&table(&[4])).is_err());
    }
}
