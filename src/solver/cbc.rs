//! CBC MILP backend built on `good_lp` (CoinOR Cbc).
//!
//! Gated behind the `cbc` cargo feature because it links the native Cbc
//! library. Unlike the default backend it supports the relative gap,
//! thread count, time limit and solver log options.

use good_lp::{constraint, variable, Expression, ProblemVariables, Solution, SolverModel, Variable};
use tracing::debug;

use crate::error::{ModelError, Result};
use crate::solver::backend::{ObjectiveDirection, SolverBackend, SolveOptions};
use crate::solver::expr::{LinearExpr, VarId};

pub struct CbcBackend {
    vars: ProblemVariables,
    handles: Vec<Variable>,
    constraints: Vec<good_lp::Constraint>,
    objective: LinearExpr,
    direction: ObjectiveDirection,
    values: Option<Vec<f64>>,
    objective_result: Option<f64>,
}

impl Default for CbcBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CbcBackend {
    pub const NAME: &'static str = "cbc";

    pub fn new() -> Self {
        Self {
            vars: ProblemVariables::new(),
            handles: Vec::new(),
            constraints: Vec::new(),
            objective: LinearExpr::default(),
            direction: ObjectiveDirection::default(),
            values: None,
            objective_result: None,
        }
    }

    fn add_var(&mut self, name: &str, min: Option<f64>, max: Option<f64>, integer: bool) -> VarId {
        let mut def = variable().name(name);
        if let Some(min) = min {
            def = def.min(min);
        }
        if let Some(max) = max {
            def = def.max(max);
        }
        if integer {
            def = def.integer();
        }
        let handle = self.vars.add(def);
        let id = VarId(self.handles.len());
        self.handles.push(handle);
        id
    }

    fn to_expression(&self, expr: &LinearExpr) -> Expression {
        let mut out = Expression::from_other_affine(expr.constant_part());
        for (var, coeff) in expr.terms() {
            out += *coeff * self.handles[var.index()];
        }
        out
    }

    fn refuse(&self, option: &str) -> ModelError {
        ModelError::UnsupportedOption {
            backend: self.name().to_string(),
            option: option.to_string(),
        }
    }
}

impl SolverBackend for CbcBackend {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn continuous(&mut self, name: &str, min: Option<f64>, max: Option<f64>) -> VarId {
        self.add_var(name, min, max, false)
    }

    fn discrete(&mut self, name: &str, min: Option<f64>, max: Option<f64>) -> VarId {
        self.add_var(name, min, max, true)
    }

    fn add_equality(&mut self, lhs: LinearExpr, rhs: LinearExpr) {
        let c = constraint::eq(self.to_expression(&lhs), self.to_expression(&rhs));
        self.constraints.push(c);
    }

    fn add_lower_than(&mut self, lhs: LinearExpr, rhs: LinearExpr) {
        let c = constraint::leq(self.to_expression(&lhs), self.to_expression(&rhs));
        self.constraints.push(c);
    }

    fn add_greater_than(&mut self, lhs: LinearExpr, rhs: LinearExpr) {
        let c = constraint::geq(self.to_expression(&lhs), self.to_expression(&rhs));
        self.constraints.push(c);
    }

    fn set_objective(&mut self, objective: LinearExpr, direction: ObjectiveDirection) {
        self.objective = objective;
        self.direction = direction;
    }

    fn solve(&mut self, options: &SolveOptions) -> Result<()> {
        if options.write_problem.is_some() {
            return Err(self.refuse("write_problem"));
        }
        if let Some(method) = options.method {
            if method != crate::solver::backend::Method::Automatic {
                return Err(self.refuse("method"));
            }
        }

        // Consumes the variable set; the orchestrator builds a fresh backend
        // for every window, so `solve` runs at most once per instance.
        let vars = std::mem::replace(&mut self.vars, ProblemVariables::new());
        let objective_expr = self.to_expression(&self.objective);
        let unsolved = match self.direction {
            ObjectiveDirection::Minimize => vars.minimise(objective_expr),
            ObjectiveDirection::Maximize => vars.maximise(objective_expr),
        };

        let mut model = unsolved.using(good_lp::coin_cbc);
        model.set_parameter(
            "threads",
            &options.threads.unwrap_or(SolveOptions::DEFAULT_THREADS).to_string(),
        );
        if let Some(gap) = options.gap {
            model.set_parameter("ratio", &gap.to_string());
        }
        if let Some(limit) = options.time_limit {
            model.set_parameter("sec", &limit.to_string());
        }
        model.set_parameter("logLevel", if options.print_log { "1" } else { "0" });

        for c in self.constraints.drain(..) {
            model = model.with(c);
        }

        let solution = model.solve().map_err(|e| {
            debug!(error = %e, "cbc resolution failed");
            ModelError::Unsolvable
        })?;

        self.values = Some(self.handles.iter().map(|h| solution.value(*h)).collect());
        self.objective_result = Some(self.eval(&self.objective)?);
        Ok(())
    }

    fn value(&self, var: VarId) -> Result<f64> {
        self.values
            .as_ref()
            .map(|v| v[var.index()])
            .ok_or(ModelError::NoResults)
    }

    fn objective_value(&self) -> Result<f64> {
        self.objective_result.ok_or(ModelError::NoResults)
    }
}
