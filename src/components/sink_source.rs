//! Sources and sinks.
//!
//! `Source` and `Sink` trade an optimized amount of energy at a price, with
//! an optional intensive series multiplying that price. `FatalSource` and
//! `FatalSink` force a flow given by a series; their port carries no
//! decision variable at all, only the resampled values as constants.

use std::collections::BTreeMap;

use crate::component::{BuildContext, Component, ComponentModel};
use crate::error::{ModelError, Result};
use crate::ports::PortRef;
use crate::series::{Signal, TimeSeries, TimeSeriesKind};
use crate::solver::{LinearExpr, SolverBackend};

use super::continuous_port;

fn priced_flow(
    ctx: &BuildContext<'_>,
    flow: &[LinearExpr],
    price: f64,
) -> LinearExpr {
    let variation = ctx.inputs.column("price_variation");
    LinearExpr::sum(flow.iter().enumerate().map(|(i, expr)| {
        let scale = variation.map_or(1.0, |v| v[i]);
        expr.clone() * (price * scale)
    }))
}

#[derive(Debug, Clone)]
pub struct Source {
    name: String,
    p_min: Option<f64>,
    p_max: Option<f64>,
    price: f64,
    signals: BTreeMap<String, Signal>,
}

impl Source {
    pub fn new(name: &str, p_min: Option<f64>, p_max: Option<f64>, price: f64) -> Self {
        Self {
            name: name.to_string(),
            p_min,
            p_max,
            price,
            signals: BTreeMap::new(),
        }
    }

    /// Registers an intensive series multiplying the price per step.
    pub fn with_price_variation(mut self, series: TimeSeries) -> Self {
        self.signals.insert(
            "price_variation".to_string(),
            Signal::new(TimeSeriesKind::Intensive, series),
        );
        self
    }

    pub fn power_out(&self) -> PortRef {
        PortRef::new(&self.name, "power_out", TimeSeriesKind::Intensive, false)
    }
}

impl Component for Source {
    fn name(&self) -> &str {
        &self.name
    }

    fn ports(&self) -> BTreeMap<String, PortRef> {
        BTreeMap::from([("power_out".to_string(), self.power_out())])
    }

    fn signals(&self) -> &BTreeMap<String, Signal> {
        &self.signals
    }

    fn build(
        &self,
        ctx: &BuildContext<'_>,
        backend: &mut dyn SolverBackend,
    ) -> Result<ComponentModel> {
        let mut model = ComponentModel::new();
        let flow = continuous_port(backend, ctx.name, "power_out", ctx.n(), self.p_min, self.p_max);
        model.add_objective(priced_flow(ctx, &flow, self.price));
        model.set_port("power_out", flow);
        Ok(model)
    }
}

#[derive(Debug, Clone)]
pub struct Sink {
    name: String,
    p_min: Option<f64>,
    p_max: Option<f64>,
    price: f64,
    signals: BTreeMap<String, Signal>,
}

impl Sink {
    pub fn new(name: &str, p_min: Option<f64>, p_max: Option<f64>, price: f64) -> Self {
        Self {
            name: name.to_string(),
            p_min,
            p_max,
            price,
            signals: BTreeMap::new(),
        }
    }

    pub fn with_price_variation(mut self, series: TimeSeries) -> Self {
        self.signals.insert(
            "price_variation".to_string(),
            Signal::new(TimeSeriesKind::Intensive, series),
        );
        self
    }

    pub fn power_in(&self) -> PortRef {
        PortRef::new(&self.name, "power_in", TimeSeriesKind::Intensive, false)
    }
}

impl Component for Sink {
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
        let mut model = ComponentModel::new();
        let flow = continuous_port(backend, ctx.name, "power_in", ctx.n(), self.p_min, self.p_max);
        model.add_objective(priced_flow(ctx, &flow, self.price));
        model.set_port("power_in", flow);
        Ok(model)
    }
}

/// Forced energy input; the flow series is not a decision variable.
#[derive(Debug, Clone)]
pub struct FatalSource {
    name: String,
    signals: BTreeMap<String, Signal>,
}

impl FatalSource {
    pub fn new(name: &str, source_flow: TimeSeries) -> Self {
        Self {
            name: name.to_string(),
            signals: BTreeMap::from([(
                "source_flow".to_string(),
                Signal::new(TimeSeriesKind::Intensive, source_flow),
            )]),
        }
    }

    pub fn power_out(&self) -> PortRef {
        PortRef::new(&self.name, "power_out", TimeSeriesKind::Intensive, false)
    }
}

impl Component for FatalSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn ports(&self) -> BTreeMap<String, PortRef> {
        BTreeMap::from([("power_out".to_string(), self.power_out())])
    }

    fn signals(&self) -> &BTreeMap<String, Signal> {
        &self.signals
    }

    fn build(
        &self,
        ctx: &BuildContext<'_>,
        _backend: &mut dyn SolverBackend,
    ) -> Result<ComponentModel> {
        let flow = ctx
            .inputs
            .column("source_flow")
            .ok_or_else(|| ModelError::TimeSeries {
                component: ctx.name.to_string(),
                series: "source_flow".to_string(),
            })?;
        let mut model = ComponentModel::new();
        model.set_port(
            "power_out",
            flow.iter().map(|&v| LinearExpr::constant(v)).collect(),
        );
        Ok(model)
    }
}

/// Forced energy output; mirror of [`FatalSource`].
#[derive(Debug, Clone)]
pub struct FatalSink {
    name: String,
    signals: BTreeMap<String, Signal>,
}

impl FatalSink {
    pub fn new(name: &str, sink_flow: TimeSeries) -> Self {
        Self {
            name: name.to_string(),
            signals: BTreeMap::from([(
                "sink_flow".to_string(),
                Signal::new(TimeSeriesKind::Intensive, sink_flow),
            )]),
        }
    }

    pub fn power_in(&self) -> PortRef {
        PortRef::new(&self.name, "power_in", TimeSeriesKind::Intensive, false)
    }
}

impl Component for FatalSink {
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
        _backend: &mut dyn SolverBackend,
    ) -> Result<ComponentModel> {
        let flow = ctx
            .inputs
            .column("sink_flow")
            .ok_or_else(|| ModelError::TimeSeries {
                component: ctx.name.to_string(),
                series: "sink_flow".to_string(),
            })?;
        let mut model = ComponentModel::new();
        model.set_port(
            "power_in",
            flow.iter().map(|&v| LinearExpr::constant(v)).collect(),
        );
        Ok(model)
    }
}
