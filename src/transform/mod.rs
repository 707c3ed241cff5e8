//! Data repairs applied before modeling.
//!
//! Provides date reconciliation and missing-block imputation.
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use store_forecast::transform::reconcile;
//!
//! let d = |m, day| NaiveDate::from_ymd_opt(2013, m, day).unwrap();
//!
//! // Rows run backwards in time; 2013-02-01 is 2013-01-02 with day and month swapped.
//! let fixed = reconcile(&[d(1, 3), d(2, 1), d(1, 1)]).unwrap();
//! assert_eq!(fixed, vec![d(1, 3), d(1, 2), d(1, 1)]);
//! ```

pub mod dates;
pub mod impute;

pub use dates::{
    find_muddled, parse_dates, reconcile, reconcile_dataset, DisorderedDate, Reconciliation,
    ReconcileSummary,
};
pub use impute::{GapImputer, ImputationModel, ImputationOutcome};
