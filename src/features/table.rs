//! Column-major feature table with target and row keys.

use crate::core::EntityId;
use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Identity of a table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowKey {
    pub entity: EntityId,
    pub date: NaiveDate,
}

/// Named feature columns aligned with per-row keys, open flags and targets.
#[derive(Debug, Clone, Default)]
pub struct FeatureTable {
    keys: Vec<RowKey>,
    open: Vec<bool>,
    targets: Vec<Option<f64>>,
    names: Vec<String>,
    /// Values stored in column-major format: columns[feature][row]
    columns: Vec<Vec<f64>>,
}

impl FeatureTable {
    pub fn new(keys: Vec<RowKey>, open: Vec<bool>, targets: Vec<Option<f64>>) -> Result<Self> {
        if open.len() != keys.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: keys.len(),
                got: open.len(),
            });
        }
        if targets.len() != keys.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: keys.len(),
                got: targets.len(),
            });
        }
        Ok(Self {
            keys,
            open,
            targets,
            names: Vec::new(),
            columns: Vec::new(),
        })
    }

    /// Append a feature column.
    pub fn push_column(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<()> {
        let name = name.into();
        if values.len() != self.keys.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: self.keys.len(),
                got: values.len(),
            });
        }
        if self.names.contains(&name) {
            return Err(ForecastError::InvalidParameter(format!(
                "duplicate feature column '{}'",
                name
            )));
        }
        self.names.push(name);
        self.columns.push(values);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn num_features(&self) -> usize {
        self.names.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn keys(&self) -> &[RowKey] {
        &self.keys
    }

    pub fn open(&self) -> &[bool] {
        &self.open
    }

    pub fn targets(&self) -> &[Option<f64>] {
        &self.targets
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.columns[i].as_slice())
    }

    pub fn column_at(&self, index: usize) -> &[f64] {
        &self.columns[index]
    }

    /// Rows a model may be fit on: open, with a known target.
    pub fn fitting_rows(&self) -> Vec<usize> {
        (0..self.len())
            .filter(|&i| self.open[i] && self.targets[i].is_some())
            .collect()
    }

    /// Targets of the given rows; rows without a target are skipped.
    pub fn targets_at(&self, rows: &[usize]) -> Vec<f64> {
        rows.iter().filter_map(|&i| self.targets[i]).collect()
    }

    /// Values of column `index` at the given rows.
    pub fn values_at(&self, index: usize, rows: &[usize]) -> Vec<f64> {
        rows.iter().map(|&i| self.columns[index][i]).collect()
    }

    /// New table with only the given rows, in the given order.
    pub fn select_rows(&self, rows: &[usize]) -> FeatureTable {
        FeatureTable {
            keys: rows.iter().map(|&i| self.keys[i]).collect(),
            open: rows.iter().map(|&i| self.open[i]).collect(),
            targets: rows.iter().map(|&i| self.targets[i]).collect(),
            names: self.names.clone(),
            columns: self
                .columns
                .iter()
                .map(|col| rows.iter().map(|&i| col[i]).collect())
                .collect(),
        }
    }

    /// New table with only the named columns, in the given order.
    pub fn project<S: AsRef<str>>(&self, names: &[S]) -> Result<FeatureTable> {
        let mut projected = FeatureTable {
            keys: self.keys.clone(),
            open: self.open.clone(),
            targets: self.targets.clone(),
            names: Vec::with_capacity(names.len()),
            columns: Vec::with_capacity(names.len()),
        };
        for name in names {
            let name = name.as_ref();
            let values = self.column(name).ok_or_else(|| {
                ForecastError::InvalidParameter(format!("unknown feature column '{}'", name))
            })?;
            projected.push_column(name, values.to_vec())?;
        }
        Ok(projected)
    }

    /// Row indices grouped by entity.
    pub fn entity_rows(&self) -> BTreeMap<EntityId, Vec<usize>> {
        let mut groups: BTreeMap<EntityId, Vec<usize>> = BTreeMap::new();
        for (i, key) in self.keys.iter().enumerate() {
            groups.entry(key.entity).or_default().push(i);
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> FeatureTable {
        let date = |d| NaiveDate::from_ymd_opt(2014, 5, d).unwrap();
        let keys = vec![
            RowKey { entity: 1, date: date(1) },
            RowKey { entity: 2, date: date(1) },
            RowKey { entity: 1, date: date(2) },
        ];
        let mut t = FeatureTable::new(
            keys,
            vec![true, true, false],
            vec![Some(10.0), None, Some(0.0)],
        )
        .unwrap();
        t.push_column("a", vec![1.0, 2.0, 3.0]).unwrap();
        t.push_column("b", vec![4.0, 5.0, 6.0]).unwrap();
        t
    }

    #[test]
    fn fitting_rows_need_open_and_target() {
        let t = table();
        assert_eq!(t.fitting_rows(), vec![0]);
        assert_eq!(t.targets_at(&[0, 1, 2]), vec![10.0, 0.0]);
    }

    #[test]
    fn rejects_bad_columns() {
        let mut t = table();
        assert!(t.push_column("c", vec![1.0]).is_err());
        assert!(t.push_column("a", vec![1.0, 2.0, 3.0]).is_err());
    }

    #[test]
    fn project_and_select() {
        let t = table();
        let p = t.project(&["b"]).unwrap();
        assert_eq!(p.names(), &["b".to_string()]);
        assert_eq!(p.column("b"), Some(&[4.0, 5.0, 6.0][..]));
        assert!(t.project(&["zzz"]).is_err());

        let s = t.select_rows(&[2, 0]);
        assert_eq!(s.len(), 2);
        assert_eq!(s.column("a"), Some(&[3.0, 1.0][..]));
        assert_eq!(s.keys()[0].entity, 1);

        let groups = t.entity_rows();
        assert_eq!(groups[&1], vec![0, 2]);
        assert_eq!(groups[&2], vec![1]);
    }
}
