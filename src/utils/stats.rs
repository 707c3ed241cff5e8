//! Statistical utility functions.

use statrs::statistics::{Data, Median};
use std::collections::BTreeMap;

/// Calculate the mean of a slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Calculate the median of a slice.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    Data::new(values.to_vec()).median()
}

/// Most frequent value; ties go to the smallest value.
pub fn majority<T: Ord + Copy>(values: impl IntoIterator<Item = T>) -> Option<T> {
    let mut counts: BTreeMap<T, usize> = BTreeMap::new();
    for value in values {
        *counts.entry(value).or_insert(0) += 1;
    }
    // max_by_key keeps the last maximum; iterate in reverse so ties resolve low.
    counts
        .into_iter()
        .rev()
        .max_by_key(|(_, count)| *count)
        .map(|(value, _)| value)
}

/// Whether all values are equal within `tol`.
pub fn is_constant(values: &[f64], tol: f64) -> bool {
    match values.first() {
        Some(first) => values.iter().all(|v| (v - first).abs() <= tol),
        None => true,
    }
}
