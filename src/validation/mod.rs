//! Held-out evaluation on future calendar windows.
//!
//! # Example
//!
//! ```no_run
//! use chrono::NaiveDate;
//! use store_forecast::prelude::*;
//!
//! # fn demo(dataset: &Dataset) -> store_forecast::Result<()> {
//! let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
//! let pair = WindowPair::new(
//!     TimeWindow::new(d(2013, 1, 1), d(2015, 6, 19))?,
//!     TimeWindow::new(d(2015, 6, 20), d(2015, 7, 31))?,
//! )?;
//!
//! let harness = ValidationHarness::new(PipelineConfig::default());
//! let report = harness.rolling_from_config(dataset, &pair)?;
//! println!("mean RMSPE: {:.2}", report.mean_validation_rmspe());
//! # Ok(())
//! # }
//! ```

mod harness;

pub use harness::{Prediction, RollingReport, ValidationHarness, ValidationReport};
