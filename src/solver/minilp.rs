//! Pure-Rust default backend built on the `minilp` simplex solver.
//!
//! `minilp` only solves continuous problems, so discrete variables are
//! handled by a bounds-tightening branch-and-bound layer on top of the LP
//! relaxation. The model is stored declaratively and only handed to the
//! solver when `solve` runs, which lets the branching loop re-solve the
//! relaxation with tightened bounds.

use minilp::{ComparisonOp, OptimizationDirection, Problem};
use tracing::{debug, warn};

use crate::error::{ModelError, Result};
use crate::solver::backend::{ObjectiveDirection, SolverBackend, SolveOptions};
use crate::solver::expr::{LinearExpr, VarId};

const FRACTIONAL_TOL: f64 = 1e-6;
const BOUND_TOL: f64 = 1e-9;
const MAX_NODES: usize = 100_000;

#[derive(Debug, Clone)]
struct VarDef {
    name: String,
    min: f64,
    max: f64,
    integer: bool,
}

#[derive(Debug, Clone, Copy)]
enum Relation {
    Eq,
    Leq,
    Geq,
}

#[derive(Debug, Default)]
pub struct MiniLpBackend {
    vars: Vec<VarDef>,
    // Constraints normalized to `expr (rel) 0`.
    constraints: Vec<(LinearExpr, Relation)>,
    objective: LinearExpr,
    direction: ObjectiveDirection,
    values: Option<Vec<f64>>,
    objective_result: Option<f64>,
}

impl MiniLpBackend {
    pub const NAME: &'static str = "minilp";

    pub fn new() -> Self {
        Self::default()
    }

    fn add_var(&mut self, name: &str, min: Option<f64>, max: Option<f64>, integer: bool) -> VarId {
        let id = VarId(self.vars.len());
        self.vars.push(VarDef {
            name: name.to_string(),
            min: min.unwrap_or(f64::NEG_INFINITY),
            max: max.unwrap_or(f64::INFINITY),
            integer,
        });
        id
    }

    fn push_constraint(&mut self, lhs: LinearExpr, rhs: LinearExpr, relation: Relation) {
        self.constraints.push(((lhs - rhs).coalesced(), relation));
    }

    fn check_unsupported(&self, options: &SolveOptions) -> Result<()> {
        let refuse = |option: &str| -> Result<()> {
            Err(ModelError::UnsupportedOption {
                backend: self.name().to_string(),
                option: option.to_string(),
            })
        };
        if options.threads.is_some() {
            return refuse("threads");
        }
        if options.time_limit.is_some() {
            return refuse("time_limit");
        }
        if options.write_problem.is_some() {
            return refuse("write_problem");
        }
        if let Some(method) = options.method {
            if method != crate::solver::backend::Method::Automatic {
                return refuse("method");
            }
        }
        Ok(())
    }

    /// Solves the LP relaxation under the given variable bounds.
    fn solve_relaxation(
        &self,
        bounds: &[(f64, f64)],
    ) -> std::result::Result<(Vec<f64>, f64), minilp::Error> {
        let direction = match self.direction {
            ObjectiveDirection::Minimize => OptimizationDirection::Minimize,
            ObjectiveDirection::Maximize => OptimizationDirection::Maximize,
        };
        let mut problem = Problem::new(direction);

        let objective = self.objective.coalesced();
        let mut obj_coeffs = vec![0.0; self.vars.len()];
        for (var, coeff) in objective.terms() {
            obj_coeffs[var.index()] += coeff;
        }

        let handles: Vec<minilp::Variable> = self
            .vars
            .iter()
            .enumerate()
            .map(|(i, _)| problem.add_var(obj_coeffs[i], bounds[i]))
            .collect();

        for (expr, relation) in &self.constraints {
            // The constant moved to the right-hand side; a fully constant
            // row is checked directly since the solver rejects empty rows.
            let rhs = -expr.constant_part();
            if expr.terms().is_empty() {
                let ok = match relation {
                    Relation::Eq => rhs.abs() <= BOUND_TOL,
                    Relation::Leq => -rhs <= BOUND_TOL,
                    Relation::Geq => rhs <= BOUND_TOL,
                };
                if !ok {
                    return Err(minilp::Error::Infeasible);
                }
                continue;
            }
            let mut row = minilp::LinearExpr::empty();
            for (var, coeff) in expr.terms() {
                row.add(handles[var.index()], *coeff);
            }
            let op = match relation {
                Relation::Eq => ComparisonOp::Eq,
                Relation::Leq => ComparisonOp::Le,
                Relation::Geq => ComparisonOp::Ge,
            };
            problem.add_constraint(row, op, rhs);
        }

        let solution = problem.solve()?;
        let values = handles.iter().map(|h| solution[*h]).collect();
        Ok((values, solution.objective() + objective.constant_part()))
    }

    /// Index of the integer variable farthest from integrality, if any.
    fn most_fractional(&self, values: &[f64]) -> Option<usize> {
        let mut pick = None;
        let mut worst = FRACTIONAL_TOL;
        for (i, def) in self.vars.iter().enumerate() {
            if !def.integer {
                continue;
            }
            let frac = (values[i] - values[i].round()).abs();
            if frac > worst {
                worst = frac;
                pick = Some(i);
            }
        }
        pick
    }

    fn branch_and_bound(&self, options: &SolveOptions) -> Result<(Vec<f64>, f64)> {
        let root_bounds: Vec<(f64, f64)> = self.vars.iter().map(|v| (v.min, v.max)).collect();

        // Root relaxation failure means the whole problem has no solution.
        let root = self
            .solve_relaxation(&root_bounds)
            .map_err(|_| ModelError::Unsolvable)?;

        if self.most_fractional(&root.0).is_none() {
            return Ok(root);
        }

        let sign = match self.direction {
            ObjectiveDirection::Minimize => 1.0,
            ObjectiveDirection::Maximize => -1.0,
        };
        let gap = options.gap.unwrap_or(0.0);

        let mut best: Option<(Vec<f64>, f64)> = None;
        let mut stack = vec![(root_bounds, root)];
        let mut nodes = 0usize;

        while let Some((bounds, (values, objective))) = stack.pop() {
            nodes += 1;
            if nodes > MAX_NODES {
                warn!(nodes, "branch and bound node limit reached, keeping incumbent");
                break;
            }

            if let Some((_, incumbent)) = &best {
                let cutoff = incumbent - sign * gap * incumbent.abs().max(1.0);
                if sign * objective >= sign * cutoff - BOUND_TOL {
                    continue;
                }
            }

            match self.most_fractional(&values) {
                None => {
                    let better = match &best {
                        None => true,
                        Some((_, incumbent)) => sign * objective < sign * incumbent - BOUND_TOL,
                    };
                    if better {
                        best = Some((values, objective));
                    }
                }
                Some(var) => {
                    let floor = values[var].floor();
                    for (lo, hi) in [
                        (bounds[var].0, floor),
                        (floor + 1.0, bounds[var].1),
                    ] {
                        if lo > hi + BOUND_TOL {
                            continue;
                        }
                        let mut child = bounds.clone();
                        child[var] = (lo, hi);
                        if let Ok(solved) = self.solve_relaxation(&child) {
                            stack.push((child, solved));
                        }
                    }
                }
            }
        }

        best.ok_or(ModelError::Unsolvable)
    }
}

impl SolverBackend for MiniLpBackend {
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
        self.push_constraint(lhs, rhs, Relation::Eq);
    }

    fn add_lower_than(&mut self, lhs: LinearExpr, rhs: LinearExpr) {
        self.push_constraint(lhs, rhs, Relation::Leq);
    }

    fn add_greater_than(&mut self, lhs: LinearExpr, rhs: LinearExpr) {
        self.push_constraint(lhs, rhs, Relation::Geq);
    }

    fn set_objective(&mut self, objective: LinearExpr, direction: ObjectiveDirection) {
        self.objective = objective;
        self.direction = direction;
    }

    fn solve(&mut self, options: &SolveOptions) -> Result<()> {
        self.check_unsupported(options)?;

        if self.vars.is_empty() {
            // Degenerate model: nothing to optimize, constant rows only.
            for (expr, relation) in &self.constraints {
                let lhs = expr.constant_part();
                let ok = match relation {
                    Relation::Eq => lhs.abs() <= BOUND_TOL,
                    Relation::Leq => lhs <= BOUND_TOL,
                    Relation::Geq => lhs >= -BOUND_TOL,
                };
                if !ok {
                    return Err(ModelError::Unsolvable);
                }
            }
            self.values = Some(Vec::new());
            self.objective_result = Some(self.objective.constant_part());
            return Ok(());
        }

        let (values, objective) = self.branch_and_bound(options)?;
        if options.print_log {
            debug!(
                vars = self.vars.len(),
                constraints = self.constraints.len(),
                objective,
                "minilp solve finished"
            );
        }
        self.values = Some(values);
        self.objective_result = Some(objective);
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
