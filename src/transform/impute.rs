//! Synthesis of rows for a detected missing block.
//!
//! Shared day attributes come from the stores that were observed on each
//! missing date. Store-specific flags come from the same ISO week and weekday
//! one year earlier. The target is predicted by a first-pass model fit on the
//! data that is present.

use crate::config::ImputationModelChoice;
use crate::core::calendar::{iso_key, prior_year_key};
use crate::core::{Dataset, EntityId, HolidayClass, Observation, Provenance};
use crate::detection::GapReport;
use crate::error::{ForecastError, Result, Stage};
use crate::features::{Feature, FeatureBuilder};
use crate::seasonality::Decomposition;
use crate::selection::{FeatureSelector, FeatureSubsetResult, SelectionResult};
use crate::utils::stats::{majority, median};
use chrono::{NaiveDate, Weekday};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/// First-pass model used to predict the target of synthesized rows.
#[derive(Debug, Clone)]
pub struct ImputationModel {
    decomposition: Decomposition,
    features: Vec<Feature>,
    selection: SelectionResult,
    chosen: FeatureSubsetResult,
}

impl ImputationModel {
    /// Fit the decomposition over the dataset's whole span, then search
    /// subsets of `features` up to the size `choice` asks for.
    pub fn fit(
        dataset: &Dataset,
        features: &[Feature],
        choice: ImputationModelChoice,
    ) -> Result<Self> {
        let window = dataset.span().ok_or(ForecastError::EmptyData)?;
        let decomposition = Decomposition::fit(dataset, &window)?;

        let rows: Vec<&Observation> = dataset.observations().iter().collect();
        let table = FeatureBuilder::new(dataset.registry(), &decomposition).build(&rows, features)?;

        let size = choice.subset_size();
        let selection = FeatureSelector::new(size).select(&table, None)?;
        let chosen = selection.best(size).cloned().ok_or_else(|| {
            ForecastError::integrity(
                Stage::Imputation,
                None,
                None,
                format!("no usable {}-feature imputation model", size),
            )
        })?;

        info!(
            features = ?chosen.features,
            score = chosen.in_sample_rmspe,
            "imputation model fitted"
        );

        Ok(Self {
            decomposition,
            features: features.to_vec(),
            selection,
            chosen,
        })
    }

    /// The subset model that predicts synthesized targets.
    pub fn chosen(&self) -> &FeatureSubsetResult {
        &self.chosen
    }

    pub fn selection(&self) -> &SelectionResult {
        &self.selection
    }

    pub fn decomposition(&self) -> &Decomposition {
        &self.decomposition
    }
}

/// Completed dataset and how many rows were added per store.
#[derive(Debug, Clone)]
pub struct ImputationOutcome {
    pub dataset: Dataset,
    pub synthesized: BTreeMap<EntityId, usize>,
}

/// Attributes shared by every store on one date.
#[derive(Debug, Clone, Copy, PartialEq)]
struct DayAttributes {
    holiday: HolidayClass,
    school_holiday: bool,
}

/// Fills a detected missing block with synthetic rows.
pub struct GapImputer;

impl GapImputer {
    pub fn impute(
        dataset: &Dataset,
        report: &GapReport,
        model: &ImputationModel,
    ) -> Result<ImputationOutcome> {
        if report.is_empty() {
            debug!("no missing block; nothing to impute");
            return Ok(ImputationOutcome {
                dataset: dataset.clone(),
                synthesized: BTreeMap::new(),
            });
        }

        let attributes = day_attributes(dataset, &report.missing)?;

        let analogues: HashMap<(EntityId, i32, u32, Weekday), &Observation> = dataset
            .observations()
            .iter()
            .map(|o| {
                let (year, week, weekday) = iso_key(o.date);
                ((o.entity, year, week, weekday), o)
            })
            .collect();

        let mut rows = Vec::with_capacity(report.affected.len() * report.missing.len());
        for &entity in &report.affected {
            for &date in &report.missing {
                let (year, week, weekday) = prior_year_key(date);
                let analogue = analogues
                    .get(&(entity, year, week, weekday))
                    .ok_or(ForecastError::ImputationLookup { entity, date })?;
                let day = attributes[&date];

                let mut row = Observation::new(entity, date, None)
                    .with_open(analogue.open)
                    .with_promo(analogue.promo)
                    .with_state_holiday(day.holiday)
                    .with_school_holiday(day.school_holiday);
                row.provenance = Provenance::Imputed;
                rows.push(row);
            }
        }

        let refs: Vec<&Observation> = rows.iter().collect();
        let table = FeatureBuilder::new(dataset.registry(), &model.decomposition)
            .build(&refs, &model.features)?;
        let predictions = model.chosen.predict(&table)?;

        let mut synthesized: BTreeMap<EntityId, usize> = BTreeMap::new();
        for (row, prediction) in rows.iter_mut().zip(predictions) {
            row.target = Some(if row.open { prediction.max(0.0) } else { 0.0 });
            *synthesized.entry(row.entity).or_insert(0) += 1;
        }

        let mut completed = dataset.clone();
        completed.extend(rows, Stage::Imputation)?;

        info!(
            rows = synthesized.values().sum::<usize>(),
            stores = synthesized.len(),
            "missing block imputed"
        );

        Ok(ImputationOutcome {
            dataset: completed,
            synthesized,
        })
    }
}

/// Holiday class by majority and school holiday by median over the stores
/// observed on each date.
fn day_attributes(
    dataset: &Dataset,
    dates: &[NaiveDate],
) -> Result<BTreeMap<NaiveDate, DayAttributes>> {
    let mut observed: BTreeMap<NaiveDate, Vec<&Observation>> =
        dates.iter().map(|&d| (d, Vec::new())).collect();
    for obs in dataset.observations() {
        if let Some(rows) = observed.get_mut(&obs.date) {
            rows.push(obs);
        }
    }

    observed
        .into_iter()
        .map(|(date, rows)| {
            let holiday = majority(rows.iter().map(|o| o.state_holiday)).ok_or_else(|| {
                ForecastError::integrity(
                    Stage::Imputation,
                    None,
                    Some(date),
                    "no store observed on a missing date",
                )
            })?;
            let school: Vec<f64> = rows
                .iter()
                .map(|o| if o.school_holiday { 1.0 } else { 0.0 })
                .collect();
            // an even split yields 0.5 and counts as no school holiday
            let school_holiday = median(&school) > 0.5;
            Ok((
                date,
                DayAttributes {
                    holiday,
                    school_holiday,
                },
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GapConfig;
    use crate::core::calendar::date_range;
    use crate::core::{Assortment, Entity, EntityRegistry, StoreType};
    use crate::detection::detect_gaps;
    use chrono::Datelike;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Four stores over 2013-2014: level 100 * id, promo on even ISO weeks,
    /// closed on Sundays. Stores 2 and 3 lack `block`.
    fn dataset(block: &[NaiveDate]) -> Dataset {
        let registry = EntityRegistry::new(
            (1..=4)
                .map(|id| Entity::new(id, StoreType::A, Assortment::Basic))
                .collect(),
        )
        .unwrap();

        let mut rows = Vec::new();
        for id in 1..=4u32 {
            for d in date_range(date(2013, 1, 1), date(2014, 12, 31)) {
                if (id == 2 || id == 3) && block.contains(&d) {
                    continue;
                }
                let sunday = d.weekday() == Weekday::Sun;
                let promo = d.iso_week().week() % 2 == 0 && d.weekday().number_from_monday() <= 5;
                let target = if sunday {
                    0.0
                } else {
                    100.0 * id as f64 + if promo { 30.0 } else { 0.0 }
                };
                let holiday = if d == date(2014, 7, 15) {
                    HolidayClass::Public
                } else {
                    HolidayClass::None
                };
                rows.push(
                    Observation::new(id, d, Some(target))
                        .with_open(!sunday)
                        .with_promo(promo)
                        .with_state_holiday(holiday)
                        .with_school_holiday(d.month() == 7),
                );
            }
        }
        Dataset::new(registry, rows).unwrap()
    }

    #[test]
    fn fills_block_from_analogues_and_neighbours() {
        let block = date_range(date(2014, 7, 10), date(2014, 7, 20));
        let ds = dataset(&block);
        let report = detect_gaps(&ds, &GapConfig::default()).unwrap();
        let model =
            ImputationModel::fit(&ds, &Feature::global_default(), ImputationModelChoice::SingleFeature)
                .unwrap();
        assert_eq!(model.chosen().size, 1);

        let outcome = GapImputer::impute(&ds, &report, &model).unwrap();
        assert_eq!(outcome.synthesized.get(&2), Some(&11));
        assert_eq!(outcome.synthesized.get(&3), Some(&11));
        assert_eq!(outcome.dataset.len(), ds.len() + 22);
        assert!(outcome.dataset.validate(Stage::Imputation).is_ok());

        let imputed: Vec<&Observation> = outcome
            .dataset
            .observations()
            .iter()
            .filter(|o| o.is_imputed())
            .collect();
        assert_eq!(imputed.len(), 22);

        for row in imputed {
            assert!(row.school_holiday);
            if row.date.weekday() == Weekday::Sun {
                assert!(!row.open);
                assert_eq!(row.target, Some(0.0));
                continue;
            }
            assert!(row.open);
            let target = row.target.unwrap();
            let level = 100.0 * row.entity as f64;
            assert!(target > 0.0);
            assert!((target - level).abs() / level < 0.4, "target {}", target);
            if row.date == date(2014, 7, 15) {
                assert_eq!(row.state_holiday, HolidayClass::Public);
            } else {
                assert_eq!(row.state_holiday, HolidayClass::None);
            }
        }
    }

    #[test]
    fn promo_flag_comes_from_prior_year() {
        let block = date_range(date(2014, 7, 10), date(2014, 7, 20));
        let ds = dataset(&block);
        let report = detect_gaps(&ds, &GapConfig::default()).unwrap();
        let model =
            ImputationModel::fit(&ds, &Feature::global_default(), ImputationModelChoice::DoubleFeature)
                .unwrap();
        let outcome = GapImputer::impute(&ds, &report, &model).unwrap();

        for row in outcome.dataset.observations().iter().filter(|o| o.is_imputed()) {
            let (year, week, weekday) = prior_year_key(row.date);
            let analogue = NaiveDate::from_isoywd_opt(year, week, weekday).unwrap();
            let expected = analogue.iso_week().week() % 2 == 0
                && analogue.weekday().number_from_monday() <= 5;
            assert_eq!(row.promo, expected);
        }
    }

    #[test]
    fn missing_analogue_is_reported() {
        let block = date_range(date(2013, 3, 1), date(2013, 3, 5));
        let ds = dataset(&block);
        let report = detect_gaps(&ds, &GapConfig::default()).unwrap();
        let model =
            ImputationModel::fit(&ds, &Feature::global_default(), ImputationModelChoice::SingleFeature)
                .unwrap();

        let err = GapImputer::impute(&ds, &report, &model).unwrap_err();
        assert_eq!(
            err,
            ForecastError::ImputationLookup {
                entity: 2,
                date: date(2013, 3, 1)
            }
        );
    }

    #[test]
    fn empty_report_leaves_data_unchanged() {
        let ds = dataset(&[]);
        let report = detect_gaps(&ds, &GapConfig::default()).unwrap();
        let model =
            ImputationModel::fit(&ds, &Feature::global_default(), ImputationModelChoice::SingleFeature)
                .unwrap();
        let outcome = GapImputer::impute(&ds, &report, &model).unwrap();
        assert_eq!(outcome.dataset.len(), ds.len());
        assert!(outcome.synthesized.is_empty());
    }
}
