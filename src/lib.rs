//! # store-forecast
//!
//! Daily per-store sales forecasting with interpretable linear models.
//!
//! Repairs the observation panel (day/month-transposed dates, a date block
//! missing for a group of stores), decomposes each store's history into a
//! linear trend and monthly/weekday seasonality combined into the MTD index,
//! searches feature subsets exhaustively by RMSPE, personalizes per store,
//! and validates on held-out future windows.

// Allow some clippy warnings for cleaner code in specific cases
#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]
#![allow(clippy::needless_range_loop)]

pub mod config;
pub mod core;
pub mod detection;
pub mod error;
pub mod features;
pub mod pipeline;
pub mod seasonality;
pub mod selection;
pub mod transform;
pub mod utils;
pub mod validation;

pub use error::{ForecastError, Result};

pub mod prelude {
    pub use crate::config::{GapConfig, ImputationModelChoice, PipelineConfig};
    pub use crate::core::{
        Dataset, Entity, EntityId, EntityRegistry, HolidayClass, Observation, TimeWindow,
        WindowPair,
    };
    pub use crate::error::{ForecastError, Result};
    pub use crate::features::Feature;
    pub use crate::pipeline::{prepare, PreparedData};
    pub use crate::selection::{FeatureSelector, ResultsTable};
    pub use crate::utils::rmspe;
    pub use crate::validation::{ValidationHarness, ValidationReport};
}
