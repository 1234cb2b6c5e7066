//! Plumbing components.

use std::collections::BTreeMap;

use crate::component::{BuildContext, Component, ComponentModel};
use crate::error::Result;
use crate::ports::PortRef;
use crate::series::{Signal, TimeSeries, TimeSeriesKind};
use crate::solver::{LinearExpr, SolverBackend};

use super::continuous_port;

/// `output(t) = input(t - delay)`.
///
/// The input is a continuity port so the delayed value can reach across
/// window boundaries; before the simulation start the declared default is
/// used instead.
#[derive(Debug, Clone)]
pub struct Delayer {
    name: String,
    delay_time: usize,
    default_value: f64,
}

impl Delayer {
    pub fn new(name: &str, delay_time: usize, default_value: f64) -> Self {
        Self {
            name: name.to_string(),
            delay_time,
            default_value,
        }
    }

    pub fn power_in(&self) -> PortRef {
        PortRef::new(&self.name, "power_in", TimeSeriesKind::Intensive, true)
    }

    pub fn power_out(&self) -> PortRef {
        PortRef::new(&self.name, "power_out", TimeSeriesKind::Intensive, false)
    }
}

impl Component for Delayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn ports(&self) -> BTreeMap<String, PortRef> {
        BTreeMap::from([
            ("power_in".to_string(), self.power_in()),
            ("power_out".to_string(), self.power_out()),
        ])
    }

    fn build(
        &self,
        ctx: &BuildContext<'_>,
        backend: &mut dyn SolverBackend,
    ) -> Result<ComponentModel> {
        let n = ctx.n();
        let power_in = continuous_port(backend, ctx.name, "power_in", n, None, None);
        let power_out = continuous_port(backend, ctx.name, "power_out", n, None, None);

        for i in 0..n {
            let delayed = if i >= self.delay_time {
                power_in[i - self.delay_time].clone()
            } else {
                let back = self.delay_time - i;
                LinearExpr::constant(
                    ctx.history
                        .lookback("power_in", back)
                        .unwrap_or(self.default_value),
                )
            };
            backend.add_equality(power_out[i].clone(), delayed);
        }

        let mut model = ComponentModel::new();
        model.set_port("power_in", power_in);
        model.set_port("power_out", power_out);
        Ok(model)
    }
}

/// Rolling sum: `output(t) = sum(input(t - j) for j in 0..integration_time)`.
///
/// Terms reaching before the simulation start count as zero; terms landing
/// in an earlier window are read back from the history.
#[derive(Debug, Clone)]
pub struct Integral {
    name: String,
    integration_time: usize,
}

impl Integral {
    pub fn new(name: &str, integration_time: usize) -> Self {
        Self {
            name: name.to_string(),
            integration_time,
        }
    }

    pub fn power_in(&self) -> PortRef {
        PortRef::new(&self.name, "power_in", TimeSeriesKind::Intensive, true)
    }

    pub fn power_out(&self) -> PortRef {
        PortRef::new(&self.name, "power_out", TimeSeriesKind::Intensive, false)
    }
}

impl Component for Integral {
    fn name(&self) -> &str {
        &self.name
    }

    fn ports(&self) -> BTreeMap<String, PortRef> {
        BTreeMap::from([
            ("power_in".to_string(), self.power_in()),
            ("power_out".to_string(), self.power_out()),
        ])
    }

    fn build(
        &self,
        ctx: &BuildContext<'_>,
        backend: &mut dyn SolverBackend,
    ) -> Result<ComponentModel> {
        let n = ctx.n();
        let power_in = continuous_port(backend, ctx.name, "power_in", n, None, None);
        let power_out = continuous_port(backend, ctx.name, "power_out", n, None, None);

        for i in 0..n {
            let mut sum = LinearExpr::default();
            for j in 0..self.integration_time {
                if j <= i {
                    sum += power_in[i - j].clone();
                } else if let Some(past) = ctx.history.lookback("power_in", j - i) {
                    sum += LinearExpr::constant(past);
                }
            }
            backend.add_equality(power_out[i].clone(), sum);
        }

        let mut model = ComponentModel::new();
        model.set_port("power_in", power_in);
        model.set_port("power_out", power_out);
        Ok(model)
    }
}

fn bound_series(ctx: &BuildContext<'_>, fallback: f64, i: usize) -> f64 {
    ctx.inputs.column("bound").map_or(fallback, |v| v[i])
}

/// Caps its input per step, either at a constant or at an intensive series.
#[derive(Debug, Clone)]
pub struct LowerThan {
    name: String,
    value: f64,
    signals: BTreeMap<String, Signal>,
}

impl LowerThan {
    pub fn new(name: &str, value: f64) -> Self {
        Self {
            name: name.to_string(),
            value,
            signals: BTreeMap::new(),
        }
    }

    /// Registers a per-step bound replacing the constant value.
    pub fn with_bound_series(mut self, series: TimeSeries) -> Self {
        self.signals.insert(
            "bound".to_string(),
            Signal::new(TimeSeriesKind::Intensive, series),
        );
        self
    }

    pub fn power_in(&self) -> PortRef {
        PortRef::new(&self.name, "power_in", TimeSeriesKind::Intensive, true)
    }
}

impl Component for LowerThan {
    fn name(&self) -> &str {
        &self.name
    }

    fn ports(&self) -> BTreeMap<String, PortRef> {
        BTreeMap::from([("power_in".to_string(), self.power_in())])
    }

    fn signals(&self) -> &BTreeMap<String, Signal> {
        &self.signals
    }

    fn build(
        &self,
        ctx: &BuildContext<'_>,
        backend: &mut dyn SolverBackend,
    ) -> Result<ComponentModel> {
        let n = ctx.n();
        let power_in = continuous_port(backend, ctx.name, "power_in", n, None, None);
        for (i, expr) in power_in.iter().enumerate() {
            let bound = bound_series(ctx, self.value, i);
            backend.add_lower_than(expr.clone(), LinearExpr::constant(bound));
        }

        let mut model = ComponentModel::new();
        model.set_port("power_in", power_in);
        Ok(model)
    }
}

/// Floors its input per step; mirror of [`LowerThan`].
#[derive(Debug, Clone)]
pub struct GreaterThan {
    name: String,
    value: f64,
    signals: BTreeMap<String, Signal>,
}

impl GreaterThan {
    pub fn new(name: &str, value: f64) -> Self {
        Self {
            name: name.to_string(),
            value,
            signals: BTreeMap::new(),
        }
    }

    pub fn with_bound_series(mut self, series: TimeSeries) -> Self {
        self.signals.insert(
            "bound".to_string(),
            Signal::new(TimeSeriesKind::Intensive, series),
        );
        self
    }

    pub fn power_in(&self) -> PortRef {
        PortRef::new(&self.name, "power_in", TimeSeriesKind::Intensive, true)
    }
}

impl Component for GreaterThan {
    fn name(&self) -> &str {
        &self.name
    }

    fn ports(&self) -> BTreeMap<String, PortRef> {
        BTreeMap::from([("power_in".to_string(), self.power_in())])
    }

    fn signals(&self) -> &BTreeMap<String, Signal> {
        &self.signals
    }

    fn build(
        &self,
        ctx: &BuildContext<'_>,
        backend: &mut dyn SolverBackend,
    ) -> Result<ComponentModel> {
        let n = ctx.n();
        let power_in = continuous_port(backend, ctx.name, "power_in", n, None, None);
        for (i, expr) in power_in.iter().enumerate() {
            let bound = bound_series(ctx, self.value, i);
            backend.add_greater_than(expr.clone(), LinearExpr::constant(bound));
        }

        let mut model = ComponentModel::new();
        model.set_port("power_in", power_in);
        Ok(model)
    }
}
