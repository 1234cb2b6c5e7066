//! Generic storage.

use std::collections::BTreeMap;

use crate::component::{BuildContext, Component, ComponentModel};
use crate::error::Result;
use crate::ports::PortRef;
use crate::series::TimeSeriesKind;
use crate::solver::{LinearExpr, SolverBackend};

use super::continuous_port;

/// Charge/discharge storage with a symmetric power limit.
///
/// The efficiency is split as a square root on the flow so a full
/// charge-discharge cycle loses `1 - efficiency`. The stored amount is a
/// continuity port: later windows pick the last settled level up as their
/// initial state, falling back to `s_init * storage_max` on the first
/// window.
#[derive(Debug, Clone)]
pub struct Storage {
    name: String,
    p_max: f64,
    storage_max: f64,
    efficiency: f64,
    s_init: f64,
}

impl Storage {
    pub fn new(name: &str, p_max: f64, storage_max: f64, efficiency: f64, s_init: f64) -> Self {
        Self {
            name: name.to_string(),
            p_max,
            storage_max,
            efficiency,
            s_init,
        }
    }

    pub fn flow(&self) -> PortRef {
        PortRef::new(&self.name, "flow", TimeSeriesKind::Intensive, false)
    }

    pub fn storage(&self) -> PortRef {
        PortRef::new(&self.name, "storage", TimeSeriesKind::Extensive, true)
    }
}

impl Component for Storage {
    fn name(&self) -> &str {
        &self.name
    }

    fn ports(&self) -> BTreeMap<String, PortRef> {
        BTreeMap::from([
            ("flow".to_string(), self.flow()),
            ("storage".to_string(), self.storage()),
        ])
    }

    fn build(
        &self,
        ctx: &BuildContext<'_>,
        backend: &mut dyn SolverBackend,
    ) -> Result<ComponentModel> {
        let n = ctx.n();
        let flow = continuous_port(backend, ctx.name, "flow", n, Some(-self.p_max), Some(self.p_max));
        let storage = continuous_port(backend, ctx.name, "storage", n, Some(0.0), Some(self.storage_max));

        let initial = ctx
            .history
            .lookback("storage", 1)
            .unwrap_or(self.s_init * self.storage_max);
        let charge_rate = self.efficiency.sqrt();

        backend.add_equality(
            storage[0].clone() - flow[0].clone() * (charge_rate * ctx.steps[0]),
            LinearExpr::constant(initial),
        );
        for i in 1..n {
            backend.add_equality(
                storage[i].clone()
                    - storage[i - 1].clone()
                    - flow[i].clone() * (charge_rate * ctx.steps[i]),
                LinearExpr::constant(0.0),
            );
        }

        let mut model = ComponentModel::new();
        model.set_port("flow", flow);
        model.set_port("storage", storage);
        Ok(model)
    }
}
