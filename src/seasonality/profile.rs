//! Monthly and weekday cyclic averages, and the composite MTD index.
//!
//! `MTD = monthly_average(month) * trend(date) / mean_trend
//!        * weekday_average(weekday) / mean_weekday_average`
//!
//! All averages come from the training window. Dates outside it, including
//! the validation window, reuse the training mapping keyed by month number
//! and weekday number; nothing is recomputed from the window being predicted.

use crate::core::calendar::weekday_number;
use crate::core::{EntityId, Observation};
use crate::error::{ForecastError, Result, Stage};
use crate::seasonality::trend::TrendModel;
use crate::utils::stats::mean;
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;

/// Per-store seasonal averages over one training window.
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonalProfile {
    /// Month (1-12) to mean target.
    monthly: BTreeMap<u32, f64>,
    /// Weekday (1 = Monday .. 7 = Sunday) to mean target.
    weekday: BTreeMap<u32, f64>,
    /// Mean trend value over the fitting rows.
    mean_trend: f64,
    /// Mean over the fitting rows of each row's weekday average.
    mean_weekday_average: f64,
    /// Mean target over the fitting rows.
    mean_target: f64,
}

impl SeasonalProfile {
    /// Fit on open rows with a known target. `rows` must already be restricted
    /// to the training window.
    pub fn fit(entity: EntityId, rows: &[&Observation], trend: &TrendModel) -> Result<Self> {
        let fittable: Vec<(NaiveDate, f64)> = rows
            .iter()
            .filter(|o| o.is_fittable())
            .filter_map(|o| o.target.map(|y| (o.date, y)))
            .collect();

        if fittable.is_empty() {
            return Err(ForecastError::integrity(
                Stage::Decomposition,
                Some(entity),
                None,
                "no open days with sales in the training window",
            ));
        }

        let monthly = group_means(fittable.iter().map(|(d, y)| (d.month(), *y)));
        let weekday = group_means(fittable.iter().map(|(d, y)| (weekday_number(*d), *y)));

        let trend_values: Vec<f64> = fittable.iter().map(|(d, _)| trend.value_at(*d)).collect();
        let weekday_values: Vec<f64> = fittable
            .iter()
            .map(|(d, _)| weekday[&weekday_number(*d)])
            .collect();
        let targets: Vec<f64> = fittable.iter().map(|(_, y)| *y).collect();

        let mean_trend = mean(&trend_values);
        let mean_weekday_average = mean(&weekday_values);

        if mean_trend.abs() < 1e-12 || mean_weekday_average.abs() < 1e-12 {
            return Err(ForecastError::integrity(
                Stage::Decomposition,
                Some(entity),
                None,
                "mean trend or weekday average is zero; cannot normalize",
            ));
        }

        Ok(Self {
            monthly,
            weekday,
            mean_trend,
            mean_weekday_average,
            mean_target: mean(&targets),
        })
    }

    /// Training-window mean for `month`; the overall training mean when the
    /// window never saw that month open.
    pub fn monthly_average(&self, month: u32) -> f64 {
        self.monthly.get(&month).copied().unwrap_or(self.mean_target)
    }

    /// Training-window mean for a weekday number; neutral (the normalizer
    /// itself) when the store was never open on that weekday.
    pub fn weekday_average(&self, weekday: u32) -> f64 {
        self.weekday
            .get(&weekday)
            .copied()
            .unwrap_or(self.mean_weekday_average)
    }

    pub fn monthly(&self) -> &BTreeMap<u32, f64> {
        &self.monthly
    }

    pub fn weekday(&self) -> &BTreeMap<u32, f64> {
        &self.weekday
    }

    pub fn mean_trend(&self) -> f64 {
        self.mean_trend
    }

    pub fn mean_weekday_average(&self) -> f64 {
        self.mean_weekday_average
    }

    /// Trend at `date` divided by the training-window mean trend.
    pub fn normalized_trend(&self, date: NaiveDate, trend: &TrendModel) -> f64 {
        trend.value_at(date) / self.mean_trend
    }

    /// Weekday average of `date` divided by its training-window mean.
    pub fn normalized_weekday(&self, date: NaiveDate) -> f64 {
        self.weekday_average(weekday_number(date)) / self.mean_weekday_average
    }

    /// Composite seasonality-trend index for `date`.
    pub fn mtd(&self, date: NaiveDate, trend: &TrendModel) -> f64 {
        self.monthly_average(date.month())
            * self.normalized_trend(date, trend)
            * self.normalized_weekday(date)
    }
}

fn group_means(pairs: impl Iterator<Item = (u32, f64)>) -> BTreeMap<u32, f64> {
    let mut sums: BTreeMap<u32, (f64, usize)> = BTreeMap::new();
    for (key, value) in pairs {
        let slot = sums.entry(key).or_insert((0.0, 0));
        slot.0 += value;
        slot.1 += 1;
    }
    sums.into_iter()
        .map(|(key, (sum, count))| (key, sum / count as f64))
        .collect()
}
