//! Running result table built up across windows.
//!
//! One row per resolved time step, one column per `component_port`. Each
//! solved window overwrites the tentative tail the previous window left
//! behind; rows at or before the clock are settled and never change again.

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTable {
    time: Vec<f64>,
    columns: BTreeMap<String, Vec<f64>>,
}

impl ResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Column names in sorted order, without the time column.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.keys().map(String::as_str).collect()
    }

    /// Number of settled rows, i.e. rows whose time is at or before `clock`.
    pub fn settled_len(&self, clock: f64) -> usize {
        self.time.partition_point(|&t| t <= clock)
    }

    /// Commits one window: rows from the window's first time onward replace
    /// whatever tentative tail was there, earlier rows are kept untouched.
    /// Every window must carry the same column set.
    pub fn stitch(&mut self, times: &[f64], columns: &BTreeMap<String, Vec<f64>>) {
        let cut = self.time.partition_point(|&t| t < times[0]);
        self.time.truncate(cut);
        self.time.extend_from_slice(times);
        for (name, values) in columns {
            debug_assert_eq!(values.len(), times.len(), "window column length mismatch");
            let column = self.columns.entry(name.clone()).or_default();
            column.truncate(cut);
            column.extend_from_slice(values);
        }
        debug_assert!(
            self.columns.values().all(|c| c.len() == self.time.len()),
            "window introduced or dropped a column"
        );
    }

    /// Mutable view of one column, for post-processing hooks.
    pub fn column_mut(&mut self, name: &str) -> Option<&mut [f64]> {
        self.columns.get_mut(name).map(Vec::as_mut_slice)
    }

    /// Replaces or adds a column. Post-processing hooks that change the
    /// column set this way are rejected by the orchestrator's guard.
    pub fn set_column(&mut self, name: impl Into<String>, values: Vec<f64>) {
        self.columns.insert(name.into(), values);
    }

    pub fn remove_column(&mut self, name: &str) -> Option<Vec<f64>> {
        self.columns.remove(name)
    }

    pub fn truncate_rows(&mut self, len: usize) {
        self.time.truncate(len);
        for column in self.columns.values_mut() {
            column.truncate(len);
        }
    }

    /// Writes the whole table as CSV, time column first.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        let mut header = vec!["time".to_string()];
        header.extend(self.columns.keys().cloned());
        writer.write_record(&header)?;
        for row in 0..self.time.len() {
            let mut record = vec![self.time[row].to_string()];
            record.extend(self.columns.values().map(|c| c[row].to_string()));
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(times: &[f64], values: &[f64]) -> (Vec<f64>, BTreeMap<String, Vec<f64>>) {
        let mut columns = BTreeMap::new();
        columns.insert("a_out".to_string(), values.to_vec());
        (times.to_vec(), columns)
    }

    #[test]
    fn stitch_overwrites_the_tentative_tail() {
        let mut table = ResultTable::new();
        let (t, c) = window(&[1.0, 2.0, 3.0], &[10.0, 20.0, 30.0]);
        table.stitch(&t, &c);
        let (t, c) = window(&[2.0, 3.0, 4.0], &[21.0, 31.0, 41.0]);
        table.stitch(&t, &c);
        assert_eq!(table.time(), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(table.column("a_out").unwrap(), &[10.0, 21.0, 31.0, 41.0]);
    }

    #[test]
    fn settled_rows_never_change() {
        let mut table = ResultTable::new();
        let (t, c) = window(&[1.0, 2.0, 3.0], &[10.0, 20.0, 30.0]);
        table.stitch(&t, &c);
        let settled = table.settled_len(1.0);
        let frozen: Vec<f64> = table.column("a_out").unwrap()[..settled].to_vec();
        let (t, c) = window(&[2.0, 3.0, 4.0], &[99.0, 99.0, 99.0]);
        table.stitch(&t, &c);
        assert_eq!(&table.column("a_out").unwrap()[..settled], frozen.as_slice());
    }

    #[test]
    fn settled_len_is_inclusive_of_the_clock_row() {
        let mut table = ResultTable::new();
        let (t, c) = window(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]);
        table.stitch(&t, &c);
        assert_eq!(table.settled_len(2.0), 2);
        assert_eq!(table.settled_len(0.5), 0);
        assert_eq!(table.settled_len(9.0), 3);
    }
}
