//! Per-store linear trend over the day index.

use crate::core::calendar::day_index;
use crate::core::{EntityId, Observation};
use crate::error::{ForecastError, Result, Stage};
use chrono::NaiveDate;

/// Linear trend `intercept + slope * day_index(date)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendModel {
    /// Intercept of the fitted line
    pub intercept: f64,
    /// Slope of the fitted line, per day
    pub slope: f64,
    /// R-squared (coefficient of determination)
    pub r_squared: f64,
}

impl TrendModel {
    /// Fit the trend on open rows with a known target.
    ///
    /// Rows that are closed or have no target are ignored; the caller is
    /// responsible for restricting `rows` to the training window.
    pub fn fit(entity: EntityId, rows: &[&Observation]) -> Result<Self> {
        let points: Vec<(f64, f64)> = rows
            .iter()
            .filter(|o| o.is_fittable())
            .filter_map(|o| o.target.map(|y| (day_index(o.date) as f64, y)))
            .collect();

        if points.len() < 2 {
            return Err(ForecastError::integrity(
                Stage::Decomposition,
                Some(entity),
                None,
                format!(
                    "trend needs at least 2 open days with sales in the training window, got {}",
                    points.len()
                ),
            ));
        }

        Ok(linear_regression(&points))
    }

    /// Trend value at any date, extrapolating outside the fitting window.
    pub fn value_at(&self, date: NaiveDate) -> f64 {
        self.intercept + self.slope * day_index(date) as f64
    }
}

/// Least-squares line through `(x, y)` points.
fn linear_regression(points: &[(f64, f64)]) -> TrendModel {
    let n = points.len() as f64;

    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;

    let ss_xx: f64 = points.iter().map(|(x, _)| (x - mean_x).powi(2)).sum();
    let ss_xy: f64 = points
        .iter()
        .map(|(x, y)| (x - mean_x) * (y - mean_y))
        .sum();

    if ss_xx.abs() < 1e-10 {
        return TrendModel {
            slope: 0.0,
            intercept: mean_y,
            r_squared: 0.0,
        };
    }

    let slope = ss_xy / ss_xx;
    let intercept = mean_y - slope * mean_x;

    let ss_yy: f64 = points.iter().map(|(_, y)| (y - mean_y).powi(2)).sum();
    let ss_res: f64 = points
        .iter()
        .map(|(x, y)| (y - (intercept + slope * x)).powi(2))
        .sum();

    let r_squared = if ss_yy.abs() < 1e-10 {
        1.0 // Perfect fit for constant y
    } else {
        1.0 - ss_res / ss_yy
    };

    TrendModel {
        slope,
        intercept,
        r_squared,
    }
}
