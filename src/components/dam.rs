//! Hydro dam with optional pumping, free spill and storage guide bands.

use std::collections::BTreeMap;

use crate::component::{BuildContext, Component, ComponentModel};
use crate::error::Result;
use crate::ports::PortRef;
use crate::series::{Signal, TimeSeries, TimeSeriesKind};
use crate::solver::{LinearExpr, SolverBackend};

use super::continuous_port;

/// Basic dam behavior; all flows share one unit.
///
/// Beyond the mandatory turbined output and storage, the dam can carry a
/// chained upstream input, a pump, a free (spilled) output, a run-of-river
/// floor on the total outflow, and soft storage guide bands whose violation
/// is priced instead of forbidden. Dam chains are built by linking one dam's
/// `power_out` to the next one's `power_in`.
#[derive(Debug, Clone)]
pub struct Dam {
    name: String,
    efficiency: f64,
    p_min: f64,
    p_max: f64,
    max_storage: f64,
    init_storage: f64,
    pump_max: f64,
    pump_efficiency: f64,
    free_output: bool,
    power_input: bool,
    limit_price: f64,
    average_price: f64,
    signals: BTreeMap<String, Signal>,
}

impl Dam {
    pub fn new(
        name: &str,
        efficiency: f64,
        p_min: f64,
        p_max: f64,
        max_storage: f64,
        init_storage: f64,
    ) -> Self {
        Self {
            name: name.to_string(),
            efficiency,
            p_min,
            p_max,
            max_storage,
            init_storage,
            pump_max: 0.0,
            pump_efficiency: 1.0,
            free_output: false,
            power_input: false,
            limit_price: 0.0,
            average_price: 0.0,
            signals: BTreeMap::new(),
        }
    }

    pub fn with_pump(mut self, pump_max: f64, pump_efficiency: f64) -> Self {
        self.pump_max = pump_max;
        self.pump_efficiency = pump_efficiency;
        self
    }

    pub fn with_free_output(mut self) -> Self {
        self.free_output = true;
        self
    }

    /// Adds a secondary optimized input besides the chained `power_in`.
    pub fn with_power_input(mut self) -> Self {
        self.power_input = true;
        self
    }

    pub fn with_water_inflow(mut self, series: TimeSeries) -> Self {
        self.insert_signal("water_inflow", series);
        self
    }

    /// Variable floor on the total outflow (turbined + spilled).
    pub fn with_run_of_river(mut self, series: TimeSeries) -> Self {
        self.insert_signal("run_of_river", series);
        self
    }

    /// Storage guide band, normalised against `max_storage`. With a positive
    /// `price` the band is soft: exceedances enter the objective instead of
    /// constraining the model.
    pub fn with_storage_band(
        mut self,
        min: Option<TimeSeries>,
        max: Option<TimeSeries>,
        price: f64,
    ) -> Self {
        if let Some(series) = min {
            self.insert_signal("variable_storage_min", series);
        }
        if let Some(series) = max {
            self.insert_signal("variable_storage_max", series);
        }
        self.limit_price = price;
        self
    }

    /// Prices the end-of-window distance between the storage and a guide
    /// average, normalised against `max_storage`.
    pub fn with_average_target(mut self, series: TimeSeries, price: f64) -> Self {
        self.insert_signal("variable_storage_average", series);
        self.average_price = price;
        self
    }

    fn insert_signal(&mut self, name: &str, series: TimeSeries) {
        self.signals
            .insert(name.to_string(), Signal::new(TimeSeriesKind::Intensive, series));
    }

    pub fn power_in(&self) -> PortRef {
        PortRef::new(&self.name, "power_in", TimeSeriesKind::Intensive, false)
    }

    pub fn power_out(&self) -> PortRef {
        PortRef::new(&self.name, "power_out", TimeSeriesKind::Intensive, false)
    }

    pub fn storage(&self) -> PortRef {
        PortRef::new(&self.name, "storage", TimeSeriesKind::Extensive, true)
    }

    pub fn power_pump(&self) -> PortRef {
        PortRef::new(&self.name, "power_pump", TimeSeriesKind::Intensive, false)
    }

    pub fn power_free(&self) -> PortRef {
        PortRef::new(&self.name, "power_free", TimeSeriesKind::Intensive, false)
    }
}

impl Component for Dam {
    fn name(&self) -> &str {
        &self.name
    }

    fn ports(&self) -> BTreeMap<String, PortRef> {
        let mut ports = BTreeMap::from([
            ("power_in".to_string(), self.power_in()),
            ("power_out".to_string(), self.power_out()),
            ("storage".to_string(), self.storage()),
        ]);
        if self.pump_max > 0.0 {
            ports.insert("power_pump".to_string(), self.power_pump());
        }
        if self.free_output {
            ports.insert("power_free".to_string(), self.power_free());
        }
        ports
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
        let mut model = ComponentModel::new();

        let power_in = if self.power_input {
            continuous_port(backend, ctx.name, "power_in", n, Some(0.0), None)
        } else {
            vec![LinearExpr::constant(0.0); n]
        };
        let power_out = continuous_port(backend, ctx.name, "power_out", n, Some(self.p_min), Some(self.p_max));
        let storage = continuous_port(backend, ctx.name, "storage", n, Some(0.0), Some(self.max_storage));
        let power_free = self
            .free_output
            .then(|| continuous_port(backend, ctx.name, "power_free", n, Some(0.0), None));
        let power_pump = (self.pump_max > 0.0)
            .then(|| continuous_port(backend, ctx.name, "power_pump", n, Some(0.0), Some(self.pump_max)));

        let band_min = ctx.inputs.column("variable_storage_min");
        let band_max = ctx.inputs.column("variable_storage_max");
        let soft_top = self.limit_price > 0.0 && band_max.is_some();
        let soft_bottom = self.limit_price > 0.0 && band_min.is_some();

        // Slack pairs when a guide band is soft.
        let top_slack = soft_top.then(|| {
            (
                continuous_port(backend, ctx.name, "difference_to_top_plus", n, Some(0.0), None),
                continuous_port(backend, ctx.name, "difference_to_top_minus", n, Some(0.0), None),
            )
        });
        let bottom_slack = soft_bottom.then(|| {
            (
                continuous_port(backend, ctx.name, "difference_to_bottom_plus", n, Some(0.0), None),
                continuous_port(backend, ctx.name, "difference_to_bottom_minus", n, Some(0.0), None),
            )
        });

        let initial = ctx
            .history
            .lookback("storage", 1)
            .unwrap_or(self.max_storage * self.init_storage);

        for i in 0..n {
            let step = ctx.steps[i];
            let min_storage = band_min.map_or(0.0, |b| self.max_storage * b[i]);
            let max_storage = band_max.map_or(self.max_storage, |b| self.max_storage * b[i]);

            if let Some((plus, minus)) = &top_slack {
                backend.add_equality(
                    storage[i].clone() - plus[i].clone() + minus[i].clone(),
                    LinearExpr::constant(max_storage),
                );
                model.add_objective(plus[i].clone() * self.limit_price);
            } else {
                backend.add_lower_than(storage[i].clone(), LinearExpr::constant(max_storage));
            }

            if let Some((plus, minus)) = &bottom_slack {
                backend.add_equality(
                    storage[i].clone() - plus[i].clone() + minus[i].clone(),
                    LinearExpr::constant(min_storage),
                );
                model.add_objective(minus[i].clone() * self.limit_price);
            } else {
                backend.add_greater_than(storage[i].clone(), LinearExpr::constant(min_storage));
            }

            let pump_term = power_pump
                .as_ref()
                .map_or_else(|| LinearExpr::constant(0.0), |p| p[i].clone() * self.pump_efficiency);
            let free_term = power_free
                .as_ref()
                .map_or_else(|| LinearExpr::constant(0.0), |f| f[i].clone());
            let inflow = ctx.inputs.column("water_inflow").map_or(0.0, |w| w[i]);

            let past = if i == 0 {
                LinearExpr::constant(initial)
            } else {
                storage[i - 1].clone()
            };

            // Mass conservation over the step.
            backend.add_equality(
                storage[i].clone() - power_in[i].clone() * step
                    + power_out[i].clone() * (step / self.efficiency)
                    + free_term.clone() * step
                    - pump_term * step,
                past + LinearExpr::constant(inflow * step),
            );

            if let Some(floor) = ctx.inputs.column("run_of_river") {
                backend.add_greater_than(
                    power_out[i].clone() + free_term,
                    LinearExpr::constant(floor[i]),
                );
            }
        }

        if self.average_price > 0.0 {
            if let Some(average) = ctx.inputs.column("variable_storage_average") {
                let plus = LinearExpr::variable(backend.continuous(
                    &format!("{}_final_difference_to_average_plus_0", ctx.name),
                    Some(0.0),
                    None,
                ));
                let minus = LinearExpr::variable(backend.continuous(
                    &format!("{}_final_difference_to_average_minus_0", ctx.name),
                    Some(0.0),
                    None,
                ));
                backend.add_equality(
                    storage[n - 1].clone() - plus.clone() + minus.clone(),
                    LinearExpr::constant(average[n - 1] * self.max_storage),
                );
                model.add_objective((plus + minus) * self.average_price);
            }
        }

        model.set_port("power_in", power_in);
        model.set_port("power_out", power_out);
        model.set_port("storage", storage);
        if let Some(free) = power_free {
            model.set_port("power_free", free);
        }
        if let Some(pump) = power_pump {
            model.set_port("power_pump", pump);
        }
        Ok(model)
    }
}
