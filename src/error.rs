use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by model registration, configuration and solving.
///
/// Everything propagates synchronously to the caller; there is no retry
/// anywhere in the crate. A failed window leaves the model in a state that
/// is not safely resumable, so callers are expected to treat `solve`
/// failures as fatal.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("no component named '{0}'")]
    ComponentName(String),

    #[error("no bus named '{0}'")]
    BusName(String),

    #[error("a component or bus named '{0}' already exists")]
    DuplicateName(String),

    #[error("component '{component}' has no input/output named '{port}'")]
    ComponentIo { component: String, port: String },

    #[error("component '{component}' has no time series named '{series}'")]
    TimeSeries { component: String, series: String },

    #[error("time series '{name}': {reason}")]
    InvalidSeries { name: String, reason: String },

    #[error("column '{0}' is not in the time series table")]
    MissingColumn(String),

    #[error("time range already defined")]
    TimeRangeAlreadyDefined,

    #[error("invalid time range: {0}")]
    InvalidTimeRange(String),

    #[error("model time range undefined, call define_time_range first")]
    UndefinedTimeRange,

    #[error("custom steps must contain {expected} values, got {got}")]
    CustomStepCount { expected: usize, got: usize },

    #[error("component '{component}' build output is malformed: {reason}")]
    ComponentBuild { component: String, reason: String },

    #[error("the given problem is not solvable")]
    Unsolvable,

    #[error("solve option '{option}' is not supported by the '{backend}' backend")]
    UnsupportedOption { backend: String, option: String },

    #[error("a solver backend named '{0}' is already registered")]
    BackendExists(String),

    #[error("no solver backend registered under '{0}'")]
    UnknownBackend(String),

    #[error("backend conformance check failed: {0}")]
    Conformance(String),

    #[error("post-processing failed: {0}")]
    PostProcessing(String),

    #[error("intermediate results folder {} does not exist", .0.display())]
    IntermediateResultsDir(PathBuf),

    #[error("no result produced yet, run solve before")]
    NoResults,

    #[error("a post-processing hook is already defined")]
    PostProcessingAlreadySet,

    #[error("result table io error: {0}")]
    ResultIo(#[from] std::io::Error),

    #[error("result table csv error: {0}")]
    ResultCsv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, ModelError>;
