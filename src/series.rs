//! Raw time series records and their aggregation semantics.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// How a time series or port value aggregates across time steps of
/// different lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeSeriesKind {
    /// Rate-like quantity, averaged when resampled (e.g. power).
    Intensive,
    /// Quantity-like value, integrated/summed when resampled (e.g. energy).
    Extensive,
}

impl TimeSeriesKind {
    pub fn is_intensive(self) -> bool {
        matches!(self, TimeSeriesKind::Intensive)
    }
}

/// A raw, possibly irregularly sampled time series.
///
/// Sample times must be strictly increasing and start at time 0 so that
/// every registered series covers the beginning of the simulated range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    times: Vec<f64>,
    values: Vec<f64>,
}

impl TimeSeries {
    pub fn new(name: &str, times: Vec<f64>, values: Vec<f64>) -> Result<Self> {
        if times.is_empty() {
            return Err(ModelError::InvalidSeries {
                name: name.to_string(),
                reason: "series is empty".to_string(),
            });
        }
        if times.len() != values.len() {
            return Err(ModelError::InvalidSeries {
                name: name.to_string(),
                reason: format!(
                    "time column has {} samples, value column has {}",
                    times.len(),
                    values.len()
                ),
            });
        }
        if times[0] != 0.0 {
            return Err(ModelError::InvalidSeries {
                name: name.to_string(),
                reason: format!("time column starts at {}, expected 0", times[0]),
            });
        }
        if times.windows(2).any(|w| w[1] <= w[0]) {
            return Err(ModelError::InvalidSeries {
                name: name.to_string(),
                reason: "time column is not strictly increasing".to_string(),
            });
        }
        Ok(Self { times, values })
    }

    /// Builds a series from `(time, value)` pairs.
    pub fn from_pairs(name: &str, pairs: &[(f64, f64)]) -> Result<Self> {
        let (times, values) = pairs.iter().copied().unzip();
        Self::new(name, times, values)
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

/// A named series together with its aggregation kind, as declared by a
/// component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub kind: TimeSeriesKind,
    pub series: TimeSeries,
}

impl Signal {
    pub fn new(kind: TimeSeriesKind, series: TimeSeries) -> Self {
        Self { kind, series }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn series_must_start_at_zero() {
        let err = TimeSeries::new("flow", vec![1.0, 2.0], vec![0.0, 1.0]).unwrap_err();
        assert!(matches!(err, ModelError::InvalidSeries { .. }));
    }

    #[test]
    fn series_rejects_length_mismatch() {
        assert!(TimeSeries::new("flow", vec![0.0, 1.0], vec![1.0]).is_err());
    }

    #[test]
    fn series_rejects_unsorted_times() {
        assert!(TimeSeries::new("flow", vec![0.0, 2.0, 1.0], vec![0.0, 1.0, 2.0]).is_err());
    }

    #[test]
    fn from_pairs_builds_valid_series() {
        let ts = TimeSeries::from_pairs("flow", &[(0.0, 1.0), (1.0, 2.0)]).unwrap();
        assert_eq!(ts.times(), &[0.0, 1.0]);
        assert_eq!(ts.values(), &[1.0, 2.0]);
    }
}
