//! The persistent state of a run: entities plus their observations.

use crate::core::entity::{EntityId, EntityRegistry};
use crate::core::observation::Observation;
use crate::core::window::TimeWindow;
use crate::error::{ForecastError, Result, Stage};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Entities and observations, with `(entity, date)` uniqueness enforced.
#[derive(Debug, Clone)]
pub struct Dataset {
    registry: EntityRegistry,
    /// Rows in load order; reconciliation relies on this order.
    observations: Vec<Observation>,
}

impl Dataset {
    pub fn new(registry: EntityRegistry, observations: Vec<Observation>) -> Result<Self> {
        let dataset = Self {
            registry,
            observations,
        };
        dataset.validate(Stage::Loading)?;
        Ok(dataset)
    }

    /// Check that every row belongs to a known entity and no `(entity, date)`
    /// pair repeats.
    pub fn validate(&self, stage: Stage) -> Result<()> {
        let mut seen = HashSet::with_capacity(self.observations.len());
        for obs in &self.observations {
            if !self.registry.contains(obs.entity) {
                return Err(ForecastError::integrity(
                    stage,
                    Some(obs.entity),
                    Some(obs.date),
                    "observation references an unknown entity",
                ));
            }
            if !seen.insert((obs.entity, obs.date)) {
                return Err(ForecastError::integrity(
                    stage,
                    Some(obs.entity),
                    Some(obs.date),
                    "duplicate observation for entity and date",
                ));
            }
        }
        Ok(())
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub(crate) fn observations_mut(&mut self) -> &mut [Observation] {
        &mut self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Append rows, re-checking uniqueness.
    pub fn extend(&mut self, rows: Vec<Observation>, stage: Stage) -> Result<()> {
        self.observations.extend(rows);
        self.validate(stage)
    }

    /// Rows of one entity, in load order.
    pub fn entity_observations(&self, entity: EntityId) -> Vec<&Observation> {
        self.observations
            .iter()
            .filter(|o| o.entity == entity)
            .collect()
    }

    /// Rows grouped by entity. Every registered entity has a (possibly empty) slot.
    pub fn by_entity(&self) -> BTreeMap<EntityId, Vec<&Observation>> {
        let mut groups: BTreeMap<EntityId, Vec<&Observation>> =
            self.registry.ids().map(|id| (id, Vec::new())).collect();
        for obs in &self.observations {
            groups.entry(obs.entity).or_default().push(obs);
        }
        groups
    }

    /// Rows whose corrected date falls in `window`.
    pub fn in_window(&self, window: &TimeWindow) -> Vec<&Observation> {
        self.observations
            .iter()
            .filter(|o| window.contains(o.date))
            .collect()
    }

    /// Distinct corrected dates across all entities.
    pub fn distinct_dates(&self) -> BTreeSet<NaiveDate> {
        self.observations.iter().map(|o| o.date).collect()
    }

    /// Distinct corrected dates per entity.
    pub fn dates_by_entity(&self) -> BTreeMap<EntityId, BTreeSet<NaiveDate>> {
        let mut dates: BTreeMap<EntityId, BTreeSet<NaiveDate>> =
            self.registry.ids().map(|id| (id, BTreeSet::new())).collect();
        for obs in &self.observations {
            dates.entry(obs.entity).or_default().insert(obs.date);
        }
        dates
    }

    /// First and last corrected date, if any rows exist.
    pub fn span(&self) -> Option<TimeWindow> {
        let dates = self.distinct_dates();
        let start = *dates.iter().next()?;
        let end = *dates.iter().next_back()?;
        Some(TimeWindow { start, end })
    }
}
