//! Wide-table resampler for raw signals.
//!
//! All registered series are merged onto the union of their sample times,
//! interpolated once, then extracted onto arbitrary window grids through a
//! cumulative-integral transform. Differencing an interpolated integral
//! conserves the integrated quantity under non-uniform resampling, which
//! direct point sampling would not.

use std::collections::{BTreeMap, BTreeSet};

use itertools::Itertools;
use ordered_float::OrderedFloat;

use crate::error::{ModelError, Result};
use crate::series::{TimeSeries, TimeSeriesKind};

#[derive(Debug, Clone)]
struct Column {
    kind: TimeSeriesKind,
    values: Vec<f64>,
}

#[derive(Debug, Default)]
pub struct TimeSeriesManager {
    times: Vec<f64>,
    columns: BTreeMap<String, Column>,
    integrals: BTreeMap<String, Vec<f64>>,
    interpolated: bool,
}

impl TimeSeriesManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges a raw series into the wide table, aligned on the union of all
    /// sample times. Cells a series does not cover become `NaN` until
    /// [`finalize`](Self::finalize) fills them.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        series: &TimeSeries,
        kind: TimeSeriesKind,
    ) -> Result<()> {
        let name = name.into();
        if self.columns.contains_key(&name) {
            return Err(ModelError::InvalidSeries {
                name,
                reason: "already registered".into(),
            });
        }
        self.merge(name, series.times(), series.values(), kind);
        Ok(())
    }

    /// Internal registration path for already-resolved rows, used for the
    /// future-preview table whose axis does not start at zero.
    pub(crate) fn register_raw(
        &mut self,
        name: impl Into<String>,
        times: &[f64],
        values: &[f64],
        kind: TimeSeriesKind,
    ) {
        self.merge(name.into(), times, values, kind);
    }

    fn merge(&mut self, name: String, times: &[f64], values: &[f64], kind: TimeSeriesKind) {
        self.integrals.clear();
        self.interpolated = false;

        let axis: BTreeSet<OrderedFloat<f64>> = self
            .times
            .iter()
            .chain(times.iter())
            .copied()
            .map(OrderedFloat)
            .collect();
        let axis: Vec<f64> = axis.into_iter().map(OrderedFloat::into_inner).collect();

        if axis.len() != self.times.len() {
            for column in self.columns.values_mut() {
                column.values = remap(&self.times, &column.values, &axis);
            }
        }
        let values = remap(times, values, &axis);
        self.times = axis;
        self.columns.insert(name, Column { kind, values });
    }

    /// Fills the gaps the merge left behind: interior `NaN` runs are linearly
    /// interpolated between their known neighbours, runs touching an edge
    /// hold the nearest known value. Call once, after all registrations.
    pub fn finalize(&mut self) {
        if self.interpolated {
            return;
        }
        for column in self.columns.values_mut() {
            interpolate_gaps(&self.times, &mut column.values);
        }
        self.interpolated = true;
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn kind(&self, name: &str) -> Option<TimeSeriesKind> {
        self.columns.get(name).map(|c| c.kind)
    }

    /// Last time covered by the table, if any series was registered.
    pub fn extent(&self) -> Option<f64> {
        self.times.last().copied()
    }

    /// Returns one value per consecutive pair of `query_times`.
    ///
    /// The column's cumulative trapezoidal integral is interpolated at the
    /// query times and differenced; intensive columns divide each difference
    /// by the elapsed time to recover an average rate. With
    /// `extrapolate_with_nan`, query times beyond the table's extent yield
    /// `NaN` instead of the clamped end value.
    pub fn extract(
        &mut self,
        query_times: &[f64],
        column: &str,
        extrapolate_with_nan: bool,
    ) -> Result<Vec<f64>> {
        if !self.columns.contains_key(column) {
            return Err(ModelError::MissingColumn(column.to_string()));
        }
        self.ensure_integral(column);
        let col = &self.columns[column];
        let integral = &self.integrals[column];

        let at: Vec<f64> = query_times
            .iter()
            .map(|&t| interp(&self.times, integral, t, extrapolate_with_nan))
            .collect();

        let out = at
            .iter()
            .zip(query_times.iter())
            .tuple_windows()
            .map(|((&i0, &t0), (&i1, &t1))| {
                let delta = i1 - i0;
                if col.kind.is_intensive() {
                    delta / (t1 - t0)
                } else {
                    delta
                }
            })
            .collect();
        Ok(out)
    }

    fn ensure_integral(&mut self, column: &str) {
        if self.integrals.contains_key(column) {
            return;
        }
        let values = &self.columns[column].values;
        let mut acc = Vec::with_capacity(values.len());
        let mut total = 0.0;
        acc.push(0.0);
        for i in 1..values.len() {
            let dt = self.times[i] - self.times[i - 1];
            total += 0.5 * (values[i] + values[i - 1]) * dt;
            acc.push(total);
        }
        self.integrals.insert(column.to_string(), acc);
    }
}

/// Places `values` sampled at `times` onto `axis`, leaving `NaN` where the
/// series has no sample. Both inputs are sorted.
fn remap(times: &[f64], values: &[f64], axis: &[f64]) -> Vec<f64> {
    let mut out = vec![f64::NAN; axis.len()];
    let mut src = 0;
    for (i, &t) in axis.iter().enumerate() {
        if src < times.len() && times[src] == t {
            out[i] = values[src];
            src += 1;
        }
    }
    out
}

fn interpolate_gaps(times: &[f64], values: &mut [f64]) {
    let known: Vec<usize> = (0..values.len()).filter(|&i| !values[i].is_nan()).collect();
    if known.is_empty() {
        return;
    }
    for i in 0..values.len() {
        if !values[i].is_nan() {
            continue;
        }
        let next = known.partition_point(|&k| k < i);
        values[i] = match (next.checked_sub(1).map(|p| known[p]), known.get(next)) {
            (Some(lo), Some(&hi)) => {
                let w = (times[i] - times[lo]) / (times[hi] - times[lo]);
                values[lo] + w * (values[hi] - values[lo])
            }
            (Some(lo), None) => values[lo],
            (None, Some(&hi)) => values[hi],
            (None, None) => unreachable!(),
        };
    }
}

/// Piecewise-linear interpolation, clamping below the first sample. Beyond
/// the last sample it clamps, or yields `NaN` when `nan_beyond` is set.
fn interp(times: &[f64], values: &[f64], t: f64, nan_beyond: bool) -> f64 {
    let last = times.len() - 1;
    if t <= times[0] {
        return values[0];
    }
    if t >= times[last] {
        return if t > times[last] && nan_beyond {
            f64::NAN
        } else {
            values[last]
        };
    }
    let hi = times.partition_point(|&x| x < t);
    let lo = hi - 1;
    let w = (t - times[lo]) / (times[hi] - times[lo]);
    values[lo] + w * (values[hi] - values[lo])
}
