//! Repair of day/month-transposed dates.
//!
//! Upstream rows are ordered newest first, one calendar day after another.
//! Some dates with a day-of-month of at most 12 arrive with day and month
//! swapped. Walking the distinct dates in row order, each value must either be
//! the day before the previously accepted one or fall in the previous year.
//! A value that fails both checks but passes them once transposed is
//! "muddled"; one that fails either way is disordered and reported.

use crate::core::calendar::transpose_day_month;
use crate::core::Dataset;
use crate::error::{ForecastError, Result, Stage};
use chrono::{Datelike, NaiveDate};
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, info, warn};

/// Format of upstream date strings.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A distinct date that could not be placed in the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisorderedDate {
    /// Row position of its first occurrence.
    pub position: usize,
    pub value: NaiveDate,
    /// Value accepted just before it.
    pub previous: NaiveDate,
}

/// Outcome of scanning a date column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Original (swapped) values to transpose back.
    pub muddled: BTreeSet<NaiveDate>,
    pub disordered: Vec<DisorderedDate>,
}

impl Reconciliation {
    pub fn is_clean(&self) -> bool {
        self.disordered.is_empty()
    }

    /// Corrected value of `date`: transposed if muddled, unchanged otherwise.
    pub fn apply(&self, date: NaiveDate) -> NaiveDate {
        if self.muddled.contains(&date) {
            transpose_day_month(date).unwrap_or(date)
        } else {
            date
        }
    }
}

/// Summary of an in-place dataset reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub muddled: Vec<NaiveDate>,
    pub rows_changed: usize,
}

/// Parse upstream `YYYY-MM-DD` strings.
pub fn parse_dates(raw: &[&str]) -> Result<Vec<NaiveDate>> {
    raw.iter()
        .enumerate()
        .map(|(row, text)| {
            NaiveDate::parse_from_str(text.trim(), DATE_FORMAT).map_err(|e| {
                ForecastError::integrity(
                    Stage::Loading,
                    None,
                    None,
                    format!("row {}: cannot parse date '{}': {}", row, text, e),
                )
            })
        })
        .collect()
}

fn follows(candidate: NaiveDate, previous: NaiveDate) -> bool {
    candidate.ordinal() as i64 == previous.ordinal() as i64 - 1
        || candidate.year() == previous.year() - 1
}

/// Scan a newest-first date column and classify its distinct values.
pub fn find_muddled(dates: &[NaiveDate]) -> Reconciliation {
    let mut result = Reconciliation::default();
    let mut seen = HashSet::new();
    let mut previous: Option<NaiveDate> = None;

    for (position, &date) in dates.iter().enumerate() {
        if !seen.insert(date) {
            continue;
        }

        let Some(prev) = previous else {
            previous = Some(date);
            continue;
        };

        let accepted = if follows(date, prev) {
            date
        } else {
            match transpose_day_month(date) {
                Some(swapped) if follows(swapped, prev) => {
                    debug!(%date, corrected = %swapped, "muddled date");
                    result.muddled.insert(date);
                    swapped
                }
                _ => {
                    warn!(%date, previous = %prev, position, "date out of sequence");
                    result.disordered.push(DisorderedDate {
                        position,
                        value: date,
                        previous: prev,
                    });
                    date
                }
            }
        };

        previous = Some(accepted);
    }

    result
}

/// Return the corrected date column.
///
/// Fails if any date is out of sequence and cannot be repaired by swapping
/// day and month.
///
/// # Example
/// ```
/// use chrono::NaiveDate;
/// use store_forecast::transform::dates::reconcile;
///
/// let d = |m, day| NaiveDate::from_ymd_opt(2013, m, day).unwrap();
/// let fixed = reconcile(&[d(1, 3), d(2, 1), d(1, 1)]).unwrap();
/// assert_eq!(fixed, vec![d(1, 3), d(1, 2), d(1, 1)]);
/// ```
pub fn reconcile(dates: &[NaiveDate]) -> Result<Vec<NaiveDate>> {
    let scan = find_muddled(dates);
    corrected(&scan, dates)
}

/// Apply a clean scan to the column it came from.
fn corrected(scan: &Reconciliation, dates: &[NaiveDate]) -> Result<Vec<NaiveDate>> {
    if let Some(first) = scan.disordered.first() {
        return Err(ForecastError::integrity(
            Stage::DateReconciliation,
            None,
            Some(first.value),
            format!(
                "{} date(s) out of sequence; first at row {} after {}",
                scan.disordered.len(),
                first.position,
                first.previous
            ),
        ));
    }

    Ok(dates.iter().map(|&d| scan.apply(d)).collect())
}

/// Correct the `date` column of a dataset in place, in row order.
pub fn reconcile_dataset(dataset: &mut Dataset) -> Result<ReconcileSummary> {
    let dates: Vec<NaiveDate> = dataset.observations().iter().map(|o| o.date).collect();
    let scan = find_muddled(&dates);
    let fixed = corrected(&scan, &dates)?;

    let mut rows_changed = 0;
    for (obs, date) in dataset.observations_mut().iter_mut().zip(fixed) {
        if obs.date != date {
            obs.date = date;
            rows_changed += 1;
        }
    }
    dataset.validate(Stage::DateReconciliation)?;

    info!(
        muddled = scan.muddled.len(),
        rows_changed, "reconciled observation dates"
    );

    Ok(ReconcileSummary {
        muddled: scan.muddled.into_iter().collect(),
        rows_changed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Assortment, Entity, EntityRegistry, Observation, StoreType};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn descending(start: NaiveDate, days: usize) -> Vec<NaiveDate> {
        (0..days)
            .map(|i| start - chrono::Duration::days(i as i64))
            .collect()
    }

    #[test]
    fn repairs_single_transposed_entry() {
        let dates = vec![d(2013, 1, 3), d(2013, 2, 1), d(2013, 1, 1)];
        let scan = find_muddled(&dates);
        assert!(scan.is_clean());
        assert_eq!(scan.muddled.iter().copied().collect::<Vec<_>>(), vec![d(2013, 2, 1)]);
        assert_eq!(
            reconcile(&dates).unwrap(),
            vec![d(2013, 1, 3), d(2013, 1, 2), d(2013, 1, 1)]
        );
    }

    #[test]
    fn accepts_year_rollover() {
        let dates = vec![d(2014, 1, 2), d(2014, 1, 1), d(2013, 12, 31), d(2013, 12, 30)];
        let scan = find_muddled(&dates);
        assert!(scan.muddled.is_empty());
        assert!(scan.is_clean());
    }

    #[test]
    fn repeated_rows_per_date_follow_first_occurrence() {
        // Several stores per day, the middle day transposed everywhere.
        let mut dates = Vec::new();
        for day in [d(2015, 3, 5), d(2015, 4, 3), d(2015, 3, 3)] {
            dates.extend(std::iter::repeat(day).take(3));
        }
        let fixed = reconcile(&dates).unwrap();
        assert_eq!(&fixed[3..6], &[d(2015, 3, 4); 3]);
        assert_eq!(fixed[8], d(2015, 3, 3));
    }

    #[test]
    fn reports_disordered_dates() {
        let dates = vec![d(2013, 1, 20), d(2013, 1, 19), d(2013, 1, 25)];
        let scan = find_muddled(&dates);
        assert_eq!(scan.disordered.len(), 1);
        assert_eq!(scan.disordered[0].value, d(2013, 1, 25));
        assert_eq!(scan.disordered[0].position, 2);

        let err = reconcile(&dates).unwrap_err();
        assert!(matches!(
            err,
            ForecastError::DataIntegrity {
                stage: Stage::DateReconciliation,
                ..
            }
        ));
    }

    #[test]
    fn reconcile_is_idempotent() {
        let mut dates = descending(d(2014, 2, 10), 60);
        dates[3] = d(2014, 7, 2); // 2014-02-07 swapped
        let once = reconcile(&dates).unwrap();
        let twice = reconcile(&once).unwrap();
        assert_eq!(once, twice);
        assert_eq!(once, descending(d(2014, 2, 10), 60));
    }

    #[test]
    fn parse_dates_reports_row() {
        let parsed = parse_dates(&["2015-07-31", " 2015-07-30"]).unwrap();
        assert_eq!(parsed, vec![d(2015, 7, 31), d(2015, 7, 30)]);

        let err = parse_dates(&["2015-07-31", "31/07/2015"]).unwrap_err();
        assert!(err.to_string().contains("row 1"));
    }

    #[test]
    fn reconcile_dataset_updates_in_place() {
        let registry = EntityRegistry::new(vec![
            Entity::new(1, StoreType::A, Assortment::Basic),
            Entity::new(2, StoreType::B, Assortment::Extra),
        ])
        .unwrap();
        let mut rows = Vec::new();
        for date in [d(2013, 1, 3), d(2013, 2, 1), d(2013, 1, 1)] {
            for entity in [1, 2] {
                rows.push(Observation::new(entity, date, Some(10.0)));
            }
        }
        let mut dataset = Dataset::new(registry, rows).unwrap();

        let summary = reconcile_dataset(&mut dataset).unwrap();
        assert_eq!(summary.muddled, vec![d(2013, 2, 1)]);
        assert_eq!(summary.rows_changed, 2);

        let fixed: Vec<_> = dataset.observations().iter().map(|o| o.date).collect();
        assert_eq!(fixed[2], d(2013, 1, 2));
        assert_eq!(dataset.observations()[2].raw_date, d(2013, 2, 1));

        let again = reconcile_dataset(&mut dataset).unwrap();
        assert_eq!(again.rows_changed, 0);
    }

    #[test]
    fn reconcile_dataset_matches_column_reconcile() {
        let registry =
            EntityRegistry::new(vec![Entity::new(1, StoreType::A, Assortment::Basic)]).unwrap();
        let mut column = descending(d(2014, 2, 10), 20);
        column[3] = d(2014, 7, 2);
        let rows = column
            .iter()
            .map(|&date| Observation::new(1, date, Some(10.0)))
            .collect();
        let mut dataset = Dataset::new(registry.clone(), rows).unwrap();

        reconcile_dataset(&mut dataset).unwrap();
        let fixed: Vec<_> = dataset.observations().iter().map(|o| o.date).collect();
        assert_eq!(fixed, reconcile(&column).unwrap());

        let disordered = vec![d(2013, 1, 20), d(2013, 1, 19), d(2013, 1, 25)];
        let rows = disordered
            .iter()
            .map(|&date| Observation::new(1, date, Some(10.0)))
            .collect();
        let mut dataset = Dataset::new(registry, rows).unwrap();
        let err = reconcile_dataset(&mut dataset).unwrap_err();
        assert!(matches!(
            err,
            ForecastError::DataIntegrity {
                stage: Stage::DateReconciliation,
                ..
            }
        ));
        let untouched: Vec<_> = dataset.observations().iter().map(|o| o.date).collect();
        assert_eq!(untouched, disordered);
    }
}
