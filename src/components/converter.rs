//! Energy converters.

use std::collections::BTreeMap;

use crate::component::{BuildContext, Component, ComponentModel};
use crate::error::Result;
use crate::ports::PortRef;
use crate::series::TimeSeriesKind;
use crate::solver::{LinearExpr, SolverBackend};

use super::{continuous_port, discrete_port};

/// Converts its input into `input * efficiency` on the output side.
#[derive(Debug, Clone)]
pub struct Converter {
    name: String,
    efficiency: f64,
    p_min: Option<f64>,
    p_max: Option<f64>,
}

impl Converter {
    pub fn new(name: &str, efficiency: f64, p_min: Option<f64>, p_max: Option<f64>) -> Self {
        Self {
            name: name.to_string(),
            efficiency,
            p_min,
            p_max,
        }
    }

    pub fn power_in(&self) -> PortRef {
        PortRef::new(&self.name, "power_in", TimeSeriesKind::Intensive, false)
    }

    pub fn power_out(&self) -> PortRef {
        PortRef::new(&self.name, "power_out", TimeSeriesKind::Intensive, false)
    }
}

impl Component for Converter {
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
        let power_out = continuous_port(backend, ctx.name, "power_out", n, self.p_min, self.p_max);

        for i in 0..n {
            backend.add_equality(
                power_out[i].clone() - power_in[i].clone() * self.efficiency,
                LinearExpr::constant(0.0),
            );
        }

        let mut model = ComponentModel::new();
        model.set_port("power_in", power_in);
        model.set_port("power_out", power_out);
        Ok(model)
    }
}

/// A fleet of `n_machine_max` identical machines that can be switched on and
/// off, with minimum up and down durations.
///
/// The machine count is a discrete variable fed back through history; the
/// `turn_on_count` / `turn_off_count` ports are rolling sums over the
/// duration windows, so they come back as expressions rather than fresh
/// variables.
#[derive(Debug, Clone)]
pub struct Cluster {
    name: String,
    efficiency: f64,
    p_min: f64,
    p_max: f64,
    n_machine_max: u32,
    duration_on: usize,
    duration_off: usize,
    turn_on_price: f64,
}

impl Cluster {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: &str,
        efficiency: f64,
        p_min: f64,
        p_max: f64,
        n_machine_max: u32,
        duration_on: usize,
        duration_off: usize,
        turn_on_price: f64,
    ) -> Self {
        Self {
            name: name.to_string(),
            efficiency,
            p_min,
            p_max,
            n_machine_max,
            duration_on,
            duration_off,
            turn_on_price,
        }
    }

    pub fn power_in(&self) -> PortRef {
        PortRef::new(&self.name, "power_in", TimeSeriesKind::Intensive, false)
    }

    pub fn power_out(&self) -> PortRef {
        PortRef::new(&self.name, "power_out", TimeSeriesKind::Intensive, false)
    }

    pub fn n_machine(&self) -> PortRef {
        PortRef::new(&self.name, "n_machine", TimeSeriesKind::Intensive, true)
    }

    /// Rolling sum of turn-ons over the last `duration_on - 1` steps.
    fn rolling_count(
        ctx: &BuildContext<'_>,
        per_step: &[LinearExpr],
        history_port: &str,
        window: usize,
        i: usize,
    ) -> LinearExpr {
        let mut terms = Vec::new();
        for j in 0..window.saturating_sub(1) {
            if i >= j {
                terms.push(per_step[i - j].clone());
            } else if let Some(past) = ctx.history.lookback(history_port, j - i) {
                terms.push(LinearExpr::constant(past));
            }
        }
        LinearExpr::sum(terms)
    }
}

impl Component for Cluster {
    fn name(&self) -> &str {
        &self.name
    }

    fn ports(&self) -> BTreeMap<String, PortRef> {
        let mut ports = BTreeMap::from([
            ("power_in".to_string(), self.power_in()),
            ("power_out".to_string(), self.power_out()),
            ("n_machine".to_string(), self.n_machine()),
        ]);
        for name in ["turn_on", "turn_off", "turn_on_count", "turn_off_count"] {
            ports.insert(
                name.to_string(),
                PortRef::new(&self.name, name, TimeSeriesKind::Intensive, true),
            );
        }
        ports
    }

    fn build(
        &self,
        ctx: &BuildContext<'_>,
        backend: &mut dyn SolverBackend,
    ) -> Result<ComponentModel> {
        let n = ctx.n();
        let power_in = continuous_port(backend, ctx.name, "power_in", n, None, None);
        let power_out = continuous_port(backend, ctx.name, "power_out", n, None, None);
        let turn_on = continuous_port(backend, ctx.name, "turn_on", n, Some(0.0), None);
        let turn_off = continuous_port(backend, ctx.name, "turn_off", n, Some(0.0), None);
        let n_machine = discrete_port(
            backend,
            ctx.name,
            "n_machine",
            n,
            Some(0.0),
            Some(f64::from(self.n_machine_max)),
        );

        let mut turn_on_count = Vec::with_capacity(n);
        let mut turn_off_count = Vec::with_capacity(n);
        let n_max = f64::from(self.n_machine_max);

        for i in 0..n {
            backend.add_equality(
                power_out[i].clone() - power_in[i].clone() * self.efficiency,
                LinearExpr::constant(0.0),
            );
            backend.add_lower_than(
                power_out[i].clone() - n_machine[i].clone() * self.p_max,
                LinearExpr::constant(0.0),
            );
            backend.add_greater_than(
                power_out[i].clone() - n_machine[i].clone() * self.p_min,
                LinearExpr::constant(0.0),
            );

            turn_on_count.push(Self::rolling_count(ctx, &turn_on, "turn_on", self.duration_on, i));
            turn_off_count.push(Self::rolling_count(
                ctx,
                &turn_off,
                "turn_off",
                self.duration_off,
                i,
            ));

            if i == 0 {
                match ctx.history.lookback("n_machine", 1) {
                    None => {
                        backend.add_equality(
                            n_machine[0].clone() + turn_off[0].clone() - turn_on[0].clone(),
                            LinearExpr::constant(0.0),
                        );
                    }
                    Some(prev) => {
                        let prev_on = ctx.history.lookback("turn_on_count", 1).unwrap_or(0.0);
                        let prev_off = ctx.history.lookback("turn_off_count", 1).unwrap_or(0.0);
                        backend.add_equality(
                            n_machine[0].clone() + turn_off[0].clone() - turn_on[0].clone(),
                            LinearExpr::constant(prev),
                        );
                        backend.add_lower_than(
                            turn_off[0].clone(),
                            LinearExpr::constant(prev - prev_on),
                        );
                        backend.add_lower_than(
                            turn_on[0].clone(),
                            LinearExpr::constant(n_max - prev - prev_off),
                        );
                    }
                }
            } else {
                backend.add_equality(
                    n_machine[i].clone() - n_machine[i - 1].clone() + turn_off[i].clone()
                        - turn_on[i].clone(),
                    LinearExpr::constant(0.0),
                );
                backend.add_lower_than(
                    turn_off[i].clone() - n_machine[i - 1].clone() + turn_on_count[i - 1].clone(),
                    LinearExpr::constant(0.0),
                );
                backend.add_lower_than(
                    turn_on[i].clone() + n_machine[i - 1].clone() + turn_off_count[i - 1].clone(),
                    LinearExpr::constant(n_max),
                );
            }
        }

        let mut model = ComponentModel::new();
        model.add_objective(LinearExpr::sum(
            turn_on.iter().map(|v| v.clone() * self.turn_on_price),
        ));
        model.set_port("power_in", power_in);
        model.set_port("power_out", power_out);
        model.set_port("turn_on", turn_on);
        model.set_port("turn_off", turn_off);
        model.set_port("turn_on_count", turn_on_count);
        model.set_port("turn_off_count", turn_off_count);
        model.set_port("n_machine", n_machine);
        Ok(model)
    }
}
