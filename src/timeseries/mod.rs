//! Time-series continuity layer.

mod manager;

pub use manager::TimeSeriesManager;
