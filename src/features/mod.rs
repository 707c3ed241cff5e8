//! Engineered regressors for the linear models.
//!
//! # Example
//!
//! ```
//! use store_forecast::features::Feature;
//! use store_forecast::core::HolidayClass;
//!
//! assert_eq!(Feature::Mtd.name(), "MTD");
//! assert_eq!(Feature::Holiday(HolidayClass::Easter).name(), "StateHoliday_b");
//! ```

mod engineering;
mod table;

pub use engineering::FeatureBuilder;
pub use table::{FeatureTable, RowKey};

use crate::core::{Assortment, HolidayClass, StoreType};
use serde::{Deserialize, Serialize};

/// Name of the first personalized meta-feature column.
pub const INDIVIDUAL_MODEL_1: &str = "IndividualModel1";
/// Name of the second personalized meta-feature column.
pub const INDIVIDUAL_MODEL_2: &str = "IndividualModel2";

/// A candidate regressor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Feature {
    /// Composite seasonality-trend index.
    Mtd,
    Promo,
    /// Secondary promotion running.
    Promo2,
    SchoolHoliday,
    /// Indicator for one state holiday class.
    Holiday(HolidayClass),
    /// A competitor was open on the date.
    CompetitionOpen,
    StoreType(StoreType),
    Assortment(Assortment),
    /// Prediction of the store's best one-feature model.
    IndividualModel1,
    /// Prediction of the store's best two-feature model.
    IndividualModel2,
}

impl Feature {
    /// Column name used in feature tables and result tables.
    pub fn name(&self) -> String {
        match self {
            Feature::Mtd => "MTD".to_string(),
            Feature::Promo => "Promo".to_string(),
            Feature::Promo2 => "Promo2".to_string(),
            Feature::SchoolHoliday => "SchoolHoliday".to_string(),
            Feature::Holiday(class) => {
                let code = match class {
                    HolidayClass::None => '0',
                    HolidayClass::Public => 'a',
                    HolidayClass::Easter => 'b',
                    HolidayClass::Christmas => 'c',
                };
                format!("StateHoliday_{}", code)
            }
            Feature::CompetitionOpen => "CompetitionOpen".to_string(),
            Feature::StoreType(t) => format!("StoreType_{}", t.code()),
            Feature::Assortment(a) => format!("Assortment_{}", a.code()),
            Feature::IndividualModel1 => INDIVIDUAL_MODEL_1.to_string(),
            Feature::IndividualModel2 => INDIVIDUAL_MODEL_2.to_string(),
        }
    }

    /// Whether the column is produced by the personalization pass rather
    /// than from observations.
    pub fn is_meta(&self) -> bool {
        matches!(self, Feature::IndividualModel1 | Feature::IndividualModel2)
    }

    /// Universe searched by the shared model.
    pub fn global_default() -> Vec<Feature> {
        vec![
            Feature::Mtd,
            Feature::Promo,
            Feature::Promo2,
            Feature::SchoolHoliday,
            Feature::Holiday(HolidayClass::Public),
            Feature::Holiday(HolidayClass::Easter),
            Feature::Holiday(HolidayClass::Christmas),
            Feature::CompetitionOpen,
        ]
    }

    /// Universe searched by each store's personalized models.
    pub fn local_default() -> Vec<Feature> {
        vec![
            Feature::Mtd,
            Feature::Promo,
            Feature::Promo2,
            Feature::Holiday(HolidayClass::Public),
            Feature::Holiday(HolidayClass::Easter),
            Feature::Holiday(HolidayClass::Christmas),
        ]
    }
}
