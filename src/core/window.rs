//! Calendar windows for training and validation.

use crate::error::{ForecastError, Result};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Inclusive calendar range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl TimeWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(ForecastError::InvalidParameter(format!(
                "window end {} precedes start {}",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    /// Window covering every date.
    pub fn unbounded() -> Self {
        Self {
            start: NaiveDate::MIN,
            end: NaiveDate::MAX,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of days covered.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Same-length window moved by `days` (negative moves back in time).
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` when either bound would leave the
    /// representable calendar.
    pub fn shifted(&self, days: i64) -> Result<Self> {
        let step = Duration::try_days(days).ok_or_else(|| out_of_range(days))?;
        let start = self
            .start
            .checked_add_signed(step)
            .ok_or_else(|| out_of_range(days))?;
        let end = self
            .end
            .checked_add_signed(step)
            .ok_or_else(|| out_of_range(days))?;
        Ok(Self { start, end })
    }
}

/// A training window followed by a disjoint, later validation window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowPair {
    pub train: TimeWindow,
    pub validate: TimeWindow,
}

impl WindowPair {
    pub fn new(train: TimeWindow, validate: TimeWindow) -> Result<Self> {
        if train.end >= validate.start {
            return Err(ForecastError::InvalidParameter(format!(
                "training window must end before validation starts ({} >= {})",
                train.end, validate.start
            )));
        }
        Ok(Self { train, validate })
    }

    pub fn shifted(&self, days: i64) -> Result<Self> {
        Ok(Self {
            train: self.train.shifted(days)?,
            validate: self.validate.shifted(days)?,
        })
    }
}

fn out_of_range(days: i64) -> ForecastError {
    ForecastError::InvalidParameter(format!(
        "shifting window by {} days leaves the calendar range",
        days
    ))
}
