//! Model selection: exhaustive subset search and store personalization.

pub mod personalization;
pub mod results;
pub mod subset;

pub use personalization::{
    FeatureTally, PersonalizationHierarchy, PersonalizationOutcome, PersonalizedModel,
};
pub use results::{ResultsRow, ResultsTable};
pub use subset::{combinations, FeatureSelector, FeatureSubsetResult, SelectionResult};
