//! Built-in component catalog.
//!
//! Every component here speaks only through [`crate::component::Component`];
//! the orchestrator has no knowledge of any of them.

mod converter;
mod dam;
mod sink_source;
mod storage;
mod tool;

pub use converter::{Cluster, Converter};
pub use dam::Dam;
pub use sink_source::{FatalSink, FatalSource, Sink, Source};
pub use storage::Storage;
pub use tool::{Delayer, GreaterThan, Integral, LowerThan};

use crate::solver::{LinearExpr, SolverBackend};

/// Creates `count` continuous variables named `{component}_{port}_{i}` and
/// wraps them as expressions.
pub(crate) fn continuous_port(
    backend: &mut dyn SolverBackend,
    component: &str,
    port: &str,
    count: usize,
    min: Option<f64>,
    max: Option<f64>,
) -> Vec<LinearExpr> {
    backend
        .continuous_list(&format!("{component}_{port}_"), count, min, max)
        .into_iter()
        .map(LinearExpr::variable)
        .collect()
}

pub(crate) fn discrete_port(
    backend: &mut dyn SolverBackend,
    component: &str,
    port: &str,
    count: usize,
    min: Option<f64>,
    max: Option<f64>,
) -> Vec<LinearExpr> {
    backend
        .discrete_list(&format!("{component}_{port}_"), count, min, max)
        .into_iter()
        .map(LinearExpr::variable)
        .collect()
}
