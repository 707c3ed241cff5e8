//! Core data structures: entities, observations, calendar helpers and windows.

pub mod calendar;
mod dataset;
mod entity;
mod observation;
mod window;

pub use dataset::Dataset;
pub use entity::{Assortment, Entity, EntityId, EntityRegistry, Promo2, StoreType};
pub use observation::{HolidayClass, Observation, Provenance};
pub use window::{TimeWindow, WindowPair};
