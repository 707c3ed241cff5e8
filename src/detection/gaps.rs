//! Detection of a date block missing for a group of stores.
//!
//! A store is short when it has fewer distinct dates than the dataset as a
//! whole. The most common short count, when enough stores share it, marks a
//! block: the dates every one of those stores lacks. The block must be a
//! single contiguous calendar range. Stores short by some other amount are
//! reported as sparse and left alone, and so are stores sharing a short count
//! without sharing any missing date.

use crate::config::GapConfig;
use crate::core::calendar::is_contiguous;
use crate::core::{Dataset, EntityId, TimeWindow};
use crate::error::{ForecastError, Result, Stage};
use crate::utils::stats::majority;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Result of gap detection.
#[derive(Debug, Clone, PartialEq)]
pub struct GapReport {
    /// Dates of the missing block, ascending. Empty when there is no block.
    pub missing: Vec<NaiveDate>,
    /// Stores lacking exactly the block dates.
    pub affected: Vec<EntityId>,
    /// Other short stores and how many dates each lacks.
    pub sparse: BTreeMap<EntityId, usize>,
    /// Distinct date count of the affected stores.
    pub short_count: usize,
    /// Distinct date count of the whole dataset.
    pub global_count: usize,
}

impl GapReport {
    /// Whether there is no block to fill.
    pub fn is_empty(&self) -> bool {
        self.missing.is_empty()
    }

    /// Calendar range of the block.
    pub fn block(&self) -> Option<TimeWindow> {
        Some(TimeWindow {
            start: *self.missing.first()?,
            end: *self.missing.last()?,
        })
    }

    pub fn is_affected(&self, entity: EntityId) -> bool {
        self.affected.binary_search(&entity).is_ok()
    }
}

/// Find the missing block and the stores it affects.
pub fn detect_gaps(dataset: &Dataset, config: &GapConfig) -> Result<GapReport> {
    let global = dataset.distinct_dates();
    let global_count = global.len();
    let by_entity = dataset.dates_by_entity();

    let short: BTreeMap<EntityId, usize> = by_entity
        .iter()
        .map(|(&entity, dates)| (entity, dates.len()))
        .filter(|&(_, count)| count < global_count)
        .collect();

    let mut report = GapReport {
        missing: Vec::new(),
        affected: Vec::new(),
        sparse: BTreeMap::new(),
        short_count: global_count,
        global_count,
    };

    let Some(short_count) = majority(short.values().copied()) else {
        debug!(dates = global_count, "every store covers every date");
        return Ok(report);
    };

    let affected: Vec<EntityId> = short
        .iter()
        .filter(|&(_, &count)| count == short_count)
        .map(|(&entity, _)| entity)
        .collect();

    if affected.len() < config.min_short_entities {
        debug!(
            short_count,
            stores = affected.len(),
            required = config.min_short_entities,
            "short count not shared widely enough to form a block"
        );
        return Ok(all_sparse(report, &short));
    }

    let covered: BTreeSet<NaiveDate> = affected
        .iter()
        .flat_map(|entity| by_entity[entity].iter().copied())
        .collect();
    let missing: Vec<NaiveDate> = global.difference(&covered).copied().collect();

    if missing.is_empty() {
        debug!(
            short_count,
            stores = affected.len(),
            "short stores share no missing date"
        );
        return Ok(all_sparse(report, &short));
    }

    let expected = global_count - short_count;
    if missing.len() != expected {
        return Err(ForecastError::integrity(
            Stage::GapDetection,
            None,
            missing.first().copied(),
            format!(
                "short stores lack different dates: block has {} dates, expected {}",
                missing.len(),
                expected
            ),
        ));
    }
    if !is_contiguous(&missing) {
        return Err(ForecastError::integrity(
            Stage::GapDetection,
            None,
            missing.first().copied(),
            "missing dates do not form one contiguous range",
        ));
    }

    report.sparse = short
        .iter()
        .filter(|&(_, &count)| count != short_count)
        .map(|(&entity, &count)| (entity, global_count - count))
        .collect();
    log_sparse(&report.sparse);

    info!(
        start = ?missing.first(),
        end = ?missing.last(),
        days = missing.len(),
        stores = affected.len(),
        "missing block detected"
    );

    report.missing = missing;
    report.affected = affected;
    report.short_count = short_count;
    Ok(report)
}

/// Report every short store as sparse, with no block.
fn all_sparse(mut report: GapReport, short: &BTreeMap<EntityId, usize>) -> GapReport {
    report.sparse = short
        .iter()
        .map(|(&entity, &count)| (entity, report.global_count - count))
        .collect();
    log_sparse(&report.sparse);
    report
}

fn log_sparse(sparse: &BTreeMap<EntityId, usize>) {
    for (entity, missing) in sparse {
        info!(entity, missing, "store has scattered missing dates; left as is");
    }
}
