//! Bus balance nodes.
//!
//! A bus carries no variables of its own. Per time step it enforces that the
//! scaled sum of everything plugged into its input side equals the scaled sum
//! of its output side; the orchestrator builds that constraint after all
//! component variables exist.

use crate::ports::PortRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusSide {
    Input,
    Output,
}

/// One port plugged into a bus, with its affine transform. The factor is
/// step-scaled for intensive ports; the offset never is.
#[derive(Debug, Clone)]
pub struct BusPlug {
    pub port: PortRef,
    pub factor: f64,
    pub offset: f64,
}

#[derive(Debug, Clone)]
pub struct Bus {
    name: String,
    inputs: Vec<BusPlug>,
    outputs: Vec<BusPlug>,
}

impl Bus {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn plug(&mut self, side: BusSide, plug: BusPlug) {
        match side {
            BusSide::Input => self.inputs.push(plug),
            BusSide::Output => self.outputs.push(plug),
        }
    }

    pub fn inputs(&self) -> &[BusPlug] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[BusPlug] {
        &self.outputs
    }
}
