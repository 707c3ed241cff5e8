//! Entities (stores) and their static attributes.

use crate::error::{ForecastError, Result, Stage};
use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Dense store identifier, `1..=N`.
pub type EntityId = u32;

/// Categorical store group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StoreType {
    A,
    B,
    C,
    D,
}

impl StoreType {
    /// Parse the single-letter code used by the raw store table.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "a" => Some(StoreType::A),
            "b" => Some(StoreType::B),
            "c" => Some(StoreType::C),
            "d" => Some(StoreType::D),
            _ => None,
        }
    }

    pub fn code(&self) -> char {
        match self {
            StoreType::A => 'a',
            StoreType::B => 'b',
            StoreType::C => 'c',
            StoreType::D => 'd',
        }
    }
}

/// Categorical store sub-group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Assortment {
    Basic,
    Extra,
    Extended,
}

impl Assortment {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "a" => Some(Assortment::Basic),
            "b" => Some(Assortment::Extra),
            "c" => Some(Assortment::Extended),
            _ => None,
        }
    }

    pub fn code(&self) -> char {
        match self {
            Assortment::Basic => 'a',
            Assortment::Extra => 'b',
            Assortment::Extended => 'c',
        }
    }
}

/// Secondary, recurring promotion a store takes part in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Promo2 {
    /// Monday of the ISO week in which participation started.
    pub since: NaiveDate,
    /// Months (1-12) in which a new promotion round starts. Empty means
    /// every month counts once participation has started.
    pub months: Vec<u32>,
}

impl Promo2 {
    /// Build from the ISO (year, week) onset used by the raw store table.
    pub fn from_iso_week(year: i32, week: u32, months: Vec<u32>) -> Option<Self> {
        let since = NaiveDate::from_isoywd_opt(year, week, Weekday::Mon)?;
        Some(Self { since, months })
    }

    /// Whether the promotion is running on `date`.
    pub fn is_active(&self, date: NaiveDate) -> bool {
        date >= self.since && (self.months.is_empty() || self.months.contains(&date.month()))
    }
}

/// A store with its static attributes. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub store_type: StoreType,
    pub assortment: Assortment,
    /// First day of the month in which the nearest competitor opened.
    pub competition_open_since: Option<NaiveDate>,
    pub promo2: Option<Promo2>,
}

impl Entity {
    pub fn new(id: EntityId, store_type: StoreType, assortment: Assortment) -> Self {
        Self {
            id,
            store_type,
            assortment,
            competition_open_since: None,
            promo2: None,
        }
    }

    /// Set the competition onset from the raw (year, month) pair.
    pub fn with_competition_since(mut self, year: i32, month: u32) -> Self {
        self.competition_open_since = NaiveDate::from_ymd_opt(year, month, 1);
        self
    }

    pub fn with_promo2(mut self, promo2: Promo2) -> Self {
        self.promo2 = Some(promo2);
        self
    }

    /// Whether a competitor was open on `date`.
    pub fn competition_open(&self, date: NaiveDate) -> bool {
        self.competition_open_since.is_some_and(|since| date >= since)
    }

    /// Whether the secondary promotion runs on `date`.
    pub fn promo2_active(&self, date: NaiveDate) -> bool {
        self.promo2.as_ref().is_some_and(|p| p.is_active(date))
    }
}

/// The closed set of entities, indexed densely by id.
#[derive(Debug, Clone)]
pub struct EntityRegistry {
    /// `entities[i].id == i + 1`.
    entities: Vec<Entity>,
}

impl EntityRegistry {
    /// Build a registry, requiring ids to form exactly `1..=N`.
    pub fn new(mut entities: Vec<Entity>) -> Result<Self> {
        if entities.is_empty() {
            return Err(ForecastError::EmptyData);
        }
        entities.sort_by_key(|e| e.id);
        for (i, entity) in entities.iter().enumerate() {
            let expected = i as EntityId + 1;
            if entity.id != expected {
                return Err(ForecastError::integrity(
                    Stage::Loading,
                    Some(entity.id),
                    None,
                    format!(
                        "entity ids must be dense 1..={}; expected {} here",
                        entities.len(),
                        expected
                    ),
                ));
            }
        }
        Ok(Self { entities })
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        let index = (id as usize).checked_sub(1)?;
        self.entities.get(index)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.get(id).is_some()
    }

    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.iter().map(|e| e.id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(id: EntityId) -> Entity {
        Entity::new(id, StoreType::A, Assortment::Basic)
    }

    #[test]
    fn registry_accepts_dense_ids_in_any_order() {
        let registry = EntityRegistry::new(vec![store(2), store(1), store(3)]).unwrap();
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.get(2).map(|e| e.id), Some(2));
        assert!(registry.get(0).is_none());
        assert!(registry.get(4).is_none());
        assert_eq!(registry.ids().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn registry_rejects_gaps_and_duplicates() {
        let err = EntityRegistry::new(vec![store(1), store(3)]).unwrap_err();
        assert!(matches!(
            err,
            ForecastError::DataIntegrity {
                stage: Stage::Loading,
                entity: Some(3),
                ..
            }
        ));
        assert!(EntityRegistry::new(vec![store(1), store(1)]).is_err());
        assert!(EntityRegistry::new(vec![]).is_err());
    }

    #[test]
    fn competition_and_promo2_windows() {
        let promo2 = Promo2::from_iso_week(2014, 10, vec![1, 4, 7, 10]).unwrap();
        let entity = store(1)
            .with_competition_since(2013, 6)
            .with_promo2(promo2);

        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
        assert!(!entity.competition_open(d(2013, 5, 31)));
        assert!(entity.competition_open(d(2013, 6, 1)));

        // ISO week 10 of 2014 starts on Monday 2014-03-03.
        assert!(!entity.promo2_active(d(2014, 1, 15)));
        assert!(!entity.promo2_active(d(2014, 3, 10)));
        assert!(entity.promo2_active(d(2014, 4, 2)));
        assert!(!store(2).promo2_active(d(2014, 4, 2)));
    }

    #[test]
    fn codes_round_trip() {
        assert_eq!(StoreType::from_code("c").map(|s| s.code()), Some('c'));
        assert_eq!(Assortment::from_code("b"), Some(Assortment::Extra));
        assert_eq!(Assortment::from_code("z"), None);
    }
}
