//! Component contract.
//!
//! A component declares its ports and time-series inputs up front, then gets
//! asked once per window to emit variables and constraints into the backend.
//! The orchestrator never inspects component internals: everything it needs
//! travels through [`ComponentModel`].

use std::collections::BTreeMap;

use crate::error::Result;
use crate::ports::PortRef;
use crate::series::Signal;
use crate::solver::{LinearExpr, SolverBackend};

/// Column-oriented table of `f64` rows, used for window inputs, settled
/// history and the tentative future preview. Missing cells are `NaN`.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    len: usize,
    columns: BTreeMap<String, Vec<f64>>,
}

impl Frame {
    pub fn new(len: usize) -> Self {
        Self {
            len,
            columns: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Inserts a column; its length must match the frame's row count.
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) {
        debug_assert_eq!(values.len(), self.len, "column length mismatch");
        self.columns.insert(name.into(), values);
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Cell value, or `None` when the column or row is missing or the cell
    /// holds `NaN`.
    pub fn value(&self, name: &str, row: usize) -> Option<f64> {
        let v = *self.columns.get(name)?.get(row)?;
        (!v.is_nan()).then_some(v)
    }

    /// Value `back` rows from the end (`back = 1` is the last row). `None`
    /// when the frame is too short or the cell holds `NaN`.
    pub fn lookback(&self, name: &str, back: usize) -> Option<f64> {
        if back == 0 || back > self.len {
            return None;
        }
        self.value(name, self.len - back)
    }
}

/// Per-window view handed to [`Component::build`].
///
/// `steps` holds the absolute duration of each step in the window, already
/// scaled by the base time step. `inputs` carries the component's registered
/// time series resampled onto the window, one row per step.
pub struct BuildContext<'a> {
    pub name: &'a str,
    pub steps: &'a [f64],
    pub inputs: &'a Frame,
    pub history: &'a Frame,
    pub future: &'a Frame,
}

impl BuildContext<'_> {
    /// Number of steps in the window.
    pub fn n(&self) -> usize {
        self.steps.len()
    }
}

/// What a component contributes to one window's problem: an expression per
/// step for every declared port, plus an optional objective contribution.
#[derive(Debug, Clone, Default)]
pub struct ComponentModel {
    pub variables: BTreeMap<String, Vec<LinearExpr>>,
    pub objective: LinearExpr,
}

impl ComponentModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_port(&mut self, port: impl Into<String>, values: Vec<LinearExpr>) {
        self.variables.insert(port.into(), values);
    }

    pub fn add_objective(&mut self, expr: LinearExpr) {
        self.objective += expr;
    }
}

pub trait Component {
    fn name(&self) -> &str;

    /// Declared ports, keyed by port name. Every declared port must appear
    /// in the build output with one expression per step.
    fn ports(&self) -> BTreeMap<String, PortRef>;

    /// Registered time-series inputs, keyed by series name.
    fn signals(&self) -> &BTreeMap<String, Signal> {
        static EMPTY: BTreeMap<String, Signal> = BTreeMap::new();
        &EMPTY
    }

    /// Emits this component's variables and constraints for one window.
    fn build(
        &self,
        ctx: &BuildContext<'_>,
        backend: &mut dyn SolverBackend,
    ) -> Result<ComponentModel>;
}
