//! The algebraic model interface implemented by solver backends.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::solver::expr::{LinearExpr, VarId};

/// Direction of the objective optimization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ObjectiveDirection {
    #[default]
    Minimize,
    Maximize,
}

/// Solver algorithm selection, where the backend supports choosing one.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum Method {
    #[default]
    Automatic,
    Primal,
    Dual,
    Barrier,
    Concurrent,
}

/// Options forwarded to the backend `solve` call.
///
/// Every field is optional; a backend that does not support an explicitly
/// set option must refuse to solve rather than silently ignore it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SolveOptions {
    /// Relative MILP gap under which a solution is accepted.
    pub gap: Option<f64>,
    /// Solver thread count; backends that support it default to 8.
    pub threads: Option<u32>,
    /// Wall-clock limit for one solve call, in seconds.
    pub time_limit: Option<f64>,
    /// Forward the solver log to the process output.
    pub print_log: bool,
    /// Dump the assembled problem to this path before solving.
    pub write_problem: Option<PathBuf>,
    /// Algorithm selection for backends that expose one.
    pub method: Option<Method>,
    /// Write the running result table to this path after every window.
    /// Consumed by the orchestrator, never forwarded to a backend.
    pub intermediate_results_path: Option<PathBuf>,
}

impl SolveOptions {
    pub const DEFAULT_THREADS: u32 = 8;
}

/// One interchangeable algebraic model backend.
///
/// A fresh instance models exactly one optimization window: variables and
/// constraints accumulate, `solve` runs once, then values are read back.
/// The trait is object safe so the orchestrator can hold any backend behind
/// a `Box<dyn SolverBackend>`.
pub trait SolverBackend {
    /// Short identifier used in error messages.
    fn name(&self) -> &'static str;

    /// Creates a continuous variable; `None` bounds leave the variable
    /// unbounded on that side.
    fn continuous(&mut self, name: &str, min: Option<f64>, max: Option<f64>) -> VarId;

    /// Creates an integer variable; `None` bounds leave the variable
    /// unbounded on that side.
    fn discrete(&mut self, name: &str, min: Option<f64>, max: Option<f64>) -> VarId;

    fn continuous_list(
        &mut self,
        base_name: &str,
        count: usize,
        min: Option<f64>,
        max: Option<f64>,
    ) -> Vec<VarId> {
        (0..count)
            .map(|i| self.continuous(&format!("{base_name}{i}"), min, max))
            .collect()
    }

    fn discrete_list(
        &mut self,
        base_name: &str,
        count: usize,
        min: Option<f64>,
        max: Option<f64>,
    ) -> Vec<VarId> {
        (0..count)
            .map(|i| self.discrete(&format!("{base_name}{i}"), min, max))
            .collect()
    }

    /// Constrains `lhs == rhs`.
    fn add_equality(&mut self, lhs: LinearExpr, rhs: LinearExpr);

    /// Constrains `lhs <= rhs`.
    fn add_lower_than(&mut self, lhs: LinearExpr, rhs: LinearExpr);

    /// Constrains `lhs >= rhs`.
    fn add_greater_than(&mut self, lhs: LinearExpr, rhs: LinearExpr);

    fn set_objective(&mut self, objective: LinearExpr, direction: ObjectiveDirection);

    /// Runs the solver. Fails with [`crate::ModelError::Unsolvable`] when no
    /// feasible solution exists and with
    /// [`crate::ModelError::UnsupportedOption`] when an explicitly set
    /// option is beyond the backend's capabilities.
    fn solve(&mut self, options: &SolveOptions) -> Result<()>;

    /// Solved value of one variable.
    fn value(&self, var: VarId) -> Result<f64>;

    /// Achieved objective value.
    fn objective_value(&self) -> Result<f64>;

    /// Evaluates an expression under the current solution.
    fn eval(&self, expr: &LinearExpr) -> Result<f64> {
        let mut total = expr.constant_part();
        for (var, coeff) in expr.terms() {
            total += coeff * self.value(*var)?;
        }
        Ok(total)
    }
}

/// Builds one fresh backend instance per optimization window.
pub type BackendFactory = Box<dyn Fn() -> Box<dyn SolverBackend>>;
