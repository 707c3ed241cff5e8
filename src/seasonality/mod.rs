//! Per-store trend and seasonality decomposition.
//!
//! This module provides:
//! - [`TrendModel`]: linear trend over the day index
//! - [`SeasonalProfile`]: monthly and weekday averages, and the MTD index
//! - [`Decomposition`]: both, fit for every store over one training window

mod profile;
mod trend;

pub use profile::SeasonalProfile;
pub use trend::TrendModel;

use crate::core::{Dataset, EntityId, Observation, TimeWindow};
use crate::error::Result;
use chrono::NaiveDate;
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::debug;

/// Trend and seasonal profile of one store.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDecomposition {
    pub trend: TrendModel,
    pub profile: SeasonalProfile,
}

impl EntityDecomposition {
    /// Fit both components on rows already restricted to the training window.
    pub fn fit(entity: EntityId, rows: &[&Observation]) -> Result<Self> {
        let trend = TrendModel::fit(entity, rows)?;
        let profile = SeasonalProfile::fit(entity, rows, &trend)?;
        Ok(Self { trend, profile })
    }

    /// Composite seasonality-trend index at `date`.
    pub fn mtd(&self, date: NaiveDate) -> f64 {
        self.profile.mtd(date, &self.trend)
    }
}

/// Decomposition of every store, fit on one training window.
///
/// Built fresh for each train/validate run and owned by it.
#[derive(Debug, Clone)]
pub struct Decomposition {
    window: TimeWindow,
    entities: BTreeMap<EntityId, EntityDecomposition>,
}

impl Decomposition {
    /// Fit every registered store on its rows inside `window`.
    ///
    /// Stores are independent and fit in parallel.
    pub fn fit(dataset: &Dataset, window: &TimeWindow) -> Result<Self> {
        let groups: Vec<(EntityId, Vec<&Observation>)> = dataset
            .by_entity()
            .into_iter()
            .map(|(id, rows)| {
                let in_window = rows
                    .into_iter()
                    .filter(|o| window.contains(o.date))
                    .collect();
                (id, in_window)
            })
            .collect();

        let entities = groups
            .par_iter()
            .map(|(id, rows)| EntityDecomposition::fit(*id, rows).map(|d| (*id, d)))
            .collect::<Result<BTreeMap<_, _>>>()?;

        debug!(
            entities = entities.len(),
            start = %window.start,
            end = %window.end,
            "fitted trend and seasonal profiles"
        );

        Ok(Self {
            window: *window,
            entities,
        })
    }

    pub fn window(&self) -> &TimeWindow {
        &self.window
    }

    pub fn get(&self, entity: EntityId) -> Option<&EntityDecomposition> {
        self.entities.get(&entity)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
