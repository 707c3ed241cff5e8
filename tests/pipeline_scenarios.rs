//! End-to-end scenarios on synthetic store panels.

use chrono::{Datelike, NaiveDate, Weekday};
use store_forecast::core::calendar::{date_range, transpose_day_month};
use store_forecast::core::{Assortment, Entity, EntityRegistry, StoreType};
use store_forecast::error::Stage;
use store_forecast::features::FeatureBuilder;
use store_forecast::prelude::*;
use store_forecast::seasonality::Decomposition;
use store_forecast::utils::ols_fit;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn registry(n: u32) -> EntityRegistry {
    EntityRegistry::new(
        (1..=n)
            .map(|id| Entity::new(id, StoreType::A, Assortment::Basic))
            .collect(),
    )
    .unwrap()
}

/// Weekdays sell 100 * level, Saturdays half that, Sundays are closed.
fn weekly_row(entity: EntityId, d: NaiveDate, level: f64) -> Observation {
    match d.weekday() {
        Weekday::Sun => Observation::new(entity, d, Some(0.0)).with_open(false),
        Weekday::Sat => Observation::new(entity, d, Some(50.0 * level)),
        _ => Observation::new(entity, d, Some(100.0 * level)),
    }
}

#[test]
fn mtd_explains_weekly_pattern() {
    let rows = date_range(date(2013, 1, 1), date(2015, 12, 31))
        .into_iter()
        .map(|d| weekly_row(1, d, 1.0))
        .collect();
    let dataset = Dataset::new(registry(1), rows).unwrap();

    let window = dataset.span().unwrap();
    let decomposition = Decomposition::fit(&dataset, &window).unwrap();
    let all: Vec<&Observation> = dataset.observations().iter().collect();
    let table = FeatureBuilder::new(dataset.registry(), &decomposition)
        .build(&all, &[Feature::Mtd])
        .unwrap();

    let selection = FeatureSelector::new(1).select(&table, None).unwrap();
    let mtd = selection.best(1).unwrap();
    assert_eq!(mtd.features, vec!["MTD"]);
    assert!(mtd.in_sample_rmspe < 2.0, "MTD rmspe {}", mtd.in_sample_rmspe);

    let rows = table.fitting_rows();
    let y = table.targets_at(&rows);
    let intercept_only = ols_fit(&y, &[]).unwrap();
    let baseline = rmspe(&y, &intercept_only.fitted).unwrap();
    assert!(baseline > mtd.in_sample_rmspe);
}

/// Three stores over 2013-01-01..2014-06-30 in newest-first row order.
/// Two dates carry day and month swapped; stores 2 and 3 lack `block`.
fn raw_panel(block: &[NaiveDate]) -> Dataset {
    let muddled = [date(2014, 1, 8), date(2014, 2, 9)];
    let mut rows = Vec::new();
    for d in date_range(date(2013, 1, 1), date(2014, 6, 30)).into_iter().rev() {
        for id in 1..=3 {
            if id > 1 && block.contains(&d) {
                continue;
            }
            let mut row = weekly_row(id, d, id as f64).with_promo(d.iso_week().week() % 2 == 0);
            if muddled.contains(&d) {
                let swapped = transpose_day_month(d).unwrap();
                row.raw_date = swapped;
                row.date = swapped;
            }
            rows.push(row);
        }
    }
    Dataset::new(registry(3), rows).unwrap()
}

#[test]
fn prepare_repairs_dates_and_fills_block() {
    let block = date_range(date(2014, 5, 1), date(2014, 5, 10));
    let raw = raw_panel(&block);
    let prepared = prepare(raw, &PipelineConfig::default()).unwrap();

    assert_eq!(
        prepared.reconciliation.muddled,
        vec![date(2014, 8, 1), date(2014, 9, 2)]
    );
    assert_eq!(prepared.reconciliation.rows_changed, 6);
    let repaired = prepared
        .dataset
        .observations()
        .iter()
        .find(|o| o.entity == 1 && o.date == date(2014, 1, 8))
        .unwrap();
    assert_eq!(repaired.raw_date, date(2014, 8, 1));

    assert_eq!(prepared.gaps.missing, block);
    assert_eq!(prepared.gaps.affected, vec![2, 3]);
    assert_eq!(prepared.synthesized.get(&2), Some(&10));
    assert_eq!(prepared.synthesized.get(&3), Some(&10));

    let days = date_range(date(2013, 1, 1), date(2014, 6, 30)).len();
    assert_eq!(prepared.dataset.len(), 3 * days);
    for d in &block {
        let row = prepared
            .dataset
            .observations()
            .iter()
            .find(|o| o.entity == 2 && o.date == *d)
            .unwrap();
        assert!(row.is_imputed());
        assert_eq!(row.open, d.weekday() != Weekday::Sun);
    }
}

#[test]
fn prepared_panel_validates_out_of_sample() {
    let block = date_range(date(2014, 5, 1), date(2014, 5, 10));
    let config = PipelineConfig::default().with_max_subset_size(2);
    let prepared = prepare(raw_panel(&block), &config).unwrap();

    let pair = WindowPair::new(
        TimeWindow::new(date(2013, 1, 1), date(2014, 4, 30)).unwrap(),
        TimeWindow::new(date(2014, 5, 11), date(2014, 6, 21)).unwrap(),
    )
    .unwrap();
    let report = ValidationHarness::new(config)
        .run(&prepared.dataset, &pair)
        .unwrap();

    let best = report.best_validation_rmspe().unwrap();
    assert!(best < 10.0, "validation rmspe {}", best);
    assert_eq!(report.personalization.models.len(), 3);

    let table = report.results_table();
    assert_eq!(table.rows.len(), 2);
    assert_eq!(table.features, config_global_names());
}

fn config_global_names() -> Vec<String> {
    PipelineConfig::default()
        .global_features
        .iter()
        .map(|f| f.name())
        .collect()
}

#[test]
fn oldest_first_rows_fail_reconciliation() {
    let mut rows = Vec::new();
    for id in 1..=2 {
        for d in date_range(date(2014, 1, 1), date(2014, 1, 20)) {
            rows.push(weekly_row(id, d, 1.0));
        }
    }
    let dataset = Dataset::new(registry(2), rows).unwrap();
    let prepared = prepare(dataset, &PipelineConfig::default());
    assert!(matches!(
        prepared,
        Err(ForecastError::DataIntegrity {
            stage: Stage::DateReconciliation,
            ..
        })
    ));
}
