//! Backend acceptance suite.
//!
//! Every solver backend must pass this suite before the orchestrator will
//! use it: it exercises variable creation (bounded and unbounded, singleton
//! and list, continuous and discrete), the three constraint forms, the
//! objective, infeasibility detection and discrete-vs-continuous rounding.
//! Custom backends are checked at registration time.

use crate::error::{ModelError, Result};
use crate::solver::backend::{ObjectiveDirection, SolverBackend, SolveOptions};
use crate::solver::expr::LinearExpr;

const TOL: f64 = 1e-5;

fn fail(test: &str, detail: &str) -> ModelError {
    ModelError::Conformance(format!("{test}: {detail}"))
}

fn near(a: f64, b: f64) -> bool {
    (a - b).abs() < TOL
}

/// Runs the full suite against fresh instances built by `factory`.
pub fn check<F>(factory: F) -> Result<()>
where
    F: Fn() -> Box<dyn SolverBackend>,
{
    variable_lists(&factory)?;
    open_bounds(&factory)?;
    equality(&factory)?;
    sum(&factory)?;
    objective(&factory)?;
    greater_than(&factory)?;
    lower_than(&factory)?;
    unsolvable(&factory)?;
    discrete_vs_continuous(&factory)?;
    Ok(())
}

fn variable_lists<F: Fn() -> Box<dyn SolverBackend>>(factory: &F) -> Result<()> {
    let mut backend = factory();
    let continuous = backend.continuous_list("c", 10, Some(0.0), Some(1.0));
    if continuous.len() != 10 {
        return Err(fail("variable_lists", "continuous list has wrong length"));
    }
    let discrete = backend.discrete_list("d", 10, Some(0.0), Some(1.0));
    if discrete.len() != 10 {
        return Err(fail("variable_lists", "discrete list has wrong length"));
    }
    Ok(())
}

fn open_bounds<F: Fn() -> Box<dyn SolverBackend>>(factory: &F) -> Result<()> {
    // Open bounds on either or both sides must be accepted for every
    // variable form; a feasibility solve proves they were not mangled.
    let mut backend = factory();
    let lower_open = backend.continuous("lo", None, Some(1.0));
    let upper_open = backend.continuous("hi", Some(0.0), None);
    let both_open = backend.discrete("free", None, None);
    backend.continuous_list("lol", 3, None, Some(1.0));
    backend.discrete_list("dl", 3, Some(0.0), None);
    backend.add_equality(LinearExpr::variable(lower_open), LinearExpr::constant(-2.0));
    backend.add_equality(LinearExpr::variable(upper_open), LinearExpr::constant(7.5));
    backend.add_equality(LinearExpr::variable(both_open), LinearExpr::constant(-3.0));
    backend
        .solve(&SolveOptions::default())
        .map_err(|e| fail("open_bounds", &e.to_string()))?;
    if !near(backend.value(lower_open).map_err(|e| fail("open_bounds", &e.to_string()))?, -2.0) {
        return Err(fail("open_bounds", "open lower bound was clamped"));
    }
    Ok(())
}

fn equality<F: Fn() -> Box<dyn SolverBackend>>(factory: &F) -> Result<()> {
    let mut backend = factory();
    let var = backend.continuous("x", Some(0.0), Some(1.0));
    backend.add_equality(LinearExpr::variable(var), LinearExpr::constant(0.5));
    backend
        .solve(&SolveOptions::default())
        .map_err(|e| fail("equality", &e.to_string()))?;
    let value = backend.value(var).map_err(|e| fail("equality", &e.to_string()))?;
    if !near(value, 0.5) {
        return Err(fail("equality", &format!("expected 0.5, got {value}")));
    }
    Ok(())
}

fn sum<F: Fn() -> Box<dyn SolverBackend>>(factory: &F) -> Result<()> {
    let mut backend = factory();
    let a = backend.continuous("a", Some(0.0), Some(1.0));
    let b = backend.continuous("b", Some(0.0), Some(1.0));
    let total = LinearExpr::sum([LinearExpr::variable(a), LinearExpr::variable(b)]);
    backend.add_equality(total.clone(), LinearExpr::constant(0.5));
    backend
        .solve(&SolveOptions::default())
        .map_err(|e| fail("sum", &e.to_string()))?;
    let achieved = backend.eval(&total).map_err(|e| fail("sum", &e.to_string()))?;
    if !near(achieved, 0.5) {
        return Err(fail("sum", &format!("expected 0.5, got {achieved}")));
    }
    Ok(())
}

fn objective<F: Fn() -> Box<dyn SolverBackend>>(factory: &F) -> Result<()> {
    let mut backend = factory();
    let a = backend.continuous("a", Some(0.0), Some(1.0));
    let b = backend.continuous("b", Some(0.0), Some(1.0));
    backend.add_equality(
        LinearExpr::variable(a) + LinearExpr::variable(b),
        LinearExpr::constant(0.5),
    );
    backend.set_objective(LinearExpr::variable(a), ObjectiveDirection::Minimize);
    backend
        .solve(&SolveOptions::default())
        .map_err(|e| fail("objective", &e.to_string()))?;
    let a_val = backend.value(a).map_err(|e| fail("objective", &e.to_string()))?;
    let b_val = backend.value(b).map_err(|e| fail("objective", &e.to_string()))?;
    if !near(a_val, 0.0) || !near(b_val, 0.5) {
        return Err(fail(
            "objective",
            &format!("expected (0, 0.5), got ({a_val}, {b_val})"),
        ));
    }
    Ok(())
}

fn greater_than<F: Fn() -> Box<dyn SolverBackend>>(factory: &F) -> Result<()> {
    let mut backend = factory();
    let var = backend.continuous("x", Some(0.0), Some(1.0));
    backend.add_greater_than(LinearExpr::variable(var), LinearExpr::constant(0.5));
    backend.set_objective(LinearExpr::variable(var), ObjectiveDirection::Minimize);
    backend
        .solve(&SolveOptions::default())
        .map_err(|e| fail("greater_than", &e.to_string()))?;
    let value = backend.value(var).map_err(|e| fail("greater_than", &e.to_string()))?;
    if !near(value, 0.5) {
        return Err(fail("greater_than", &format!("expected 0.5, got {value}")));
    }
    Ok(())
}

fn lower_than<F: Fn() -> Box<dyn SolverBackend>>(factory: &F) -> Result<()> {
    let mut backend = factory();
    let var = backend.continuous("x", Some(0.0), Some(1.0));
    backend.add_lower_than(LinearExpr::variable(var), LinearExpr::constant(0.5));
    backend.set_objective(
        LinearExpr::constant(0.0) - LinearExpr::variable(var),
        ObjectiveDirection::Minimize,
    );
    backend
        .solve(&SolveOptions::default())
        .map_err(|e| fail("lower_than", &e.to_string()))?;
    let value = backend.value(var).map_err(|e| fail("lower_than", &e.to_string()))?;
    if !near(value, 0.5) {
        return Err(fail("lower_than", &format!("expected 0.5, got {value}")));
    }
    Ok(())
}

fn unsolvable<F: Fn() -> Box<dyn SolverBackend>>(factory: &F) -> Result<()> {
    let mut backend = factory();
    let var = backend.continuous("x", Some(0.0), Some(1.0));
    backend.add_equality(LinearExpr::variable(var), LinearExpr::constant(5.0));
    match backend.solve(&SolveOptions::default()) {
        Err(ModelError::Unsolvable) => Ok(()),
        Err(e) => Err(fail("unsolvable", &format!("wrong error kind: {e}"))),
        Ok(()) => Err(fail("unsolvable", "infeasible problem reported as solved")),
    }
}

fn discrete_vs_continuous<F: Fn() -> Box<dyn SolverBackend>>(factory: &F) -> Result<()> {
    let mut backend = factory();
    let x = backend.continuous("x", Some(0.0), Some(10.0));
    let n = backend.discrete("n", Some(0.0), Some(10.0));
    backend.add_equality(
        LinearExpr::variable(x) + LinearExpr::variable(n),
        LinearExpr::constant(5.1),
    );
    backend.set_objective(LinearExpr::variable(x), ObjectiveDirection::Minimize);
    backend
        .solve(&SolveOptions::default())
        .map_err(|e| fail("discrete_vs_continuous", &e.to_string()))?;
    let x_val = backend.value(x).map_err(|e| fail("discrete_vs_continuous", &e.to_string()))?;
    let n_val = backend.value(n).map_err(|e| fail("discrete_vs_continuous", &e.to_string()))?;
    if !near(x_val, 0.1) || !near(n_val, 5.0) {
        return Err(fail(
            "discrete_vs_continuous",
            &format!("expected (0.1, 5), got ({x_val}, {n_val})"),
        ));
    }
    Ok(())
}
