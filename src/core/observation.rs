//! Daily per-store observations.

use crate::core::entity::EntityId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// State holiday classification of a day.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub enum HolidayClass {
    #[default]
    None,
    Public,
    Easter,
    Christmas,
}

impl HolidayClass {
    /// Parse the raw code (`0`, `a`, `b`, `c`).
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "0" => Some(HolidayClass::None),
            "a" => Some(HolidayClass::Public),
            "b" => Some(HolidayClass::Easter),
            "c" => Some(HolidayClass::Christmas),
            _ => None,
        }
    }

    pub const ALL: [HolidayClass; 4] = [
        HolidayClass::None,
        HolidayClass::Public,
        HolidayClass::Easter,
        HolidayClass::Christmas,
    ];
}

/// Where a row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Provenance {
    #[default]
    Observed,
    /// Synthesized by the gap imputer.
    Imputed,
}

/// One store-day. Unique per `(entity, date)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub entity: EntityId,
    /// Date as supplied upstream, possibly with day and month swapped.
    pub raw_date: NaiveDate,
    /// Corrected date; equals `raw_date` until reconciliation runs.
    pub date: NaiveDate,
    /// Sales. `None` for rows to be predicted.
    pub target: Option<f64>,
    pub open: bool,
    pub promo: bool,
    pub state_holiday: HolidayClass,
    pub school_holiday: bool,
    pub provenance: Provenance,
}

impl Observation {
    /// Create an open, non-promotional, non-holiday observation.
    pub fn new(entity: EntityId, date: NaiveDate, target: Option<f64>) -> Self {
        Self {
            entity,
            raw_date: date,
            date,
            target,
            open: true,
            promo: false,
            state_holiday: HolidayClass::None,
            school_holiday: false,
            provenance: Provenance::Observed,
        }
    }

    pub fn with_open(mut self, open: bool) -> Self {
        self.open = open;
        self
    }

    pub fn with_promo(mut self, promo: bool) -> Self {
        self.promo = promo;
        self
    }

    pub fn with_state_holiday(mut self, holiday: HolidayClass) -> Self {
        self.state_holiday = holiday;
        self
    }

    pub fn with_school_holiday(mut self, school_holiday: bool) -> Self {
        self.school_holiday = school_holiday;
        self
    }

    /// Target with the closed-day convention applied: a closed store sells nothing.
    pub fn effective_target(&self) -> Option<f64> {
        if self.open {
            self.target
        } else {
            Some(0.0)
        }
    }

    /// Open rows with a known target; the only rows any model is fit on.
    pub fn is_fittable(&self) -> bool {
        self.open && self.target.is_some()
    }

    pub fn is_imputed(&self) -> bool {
        self.provenance == Provenance::Imputed
    }
}
