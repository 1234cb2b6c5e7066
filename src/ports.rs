//! Component input/output port references.

use serde::{Deserialize, Serialize};

use crate::series::TimeSeriesKind;

/// Reference to one named input/output of a component.
///
/// The `continuity` flag marks ports whose solved values must be replayed
/// to later windows as history (and previewed as tentative future).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRef {
    pub component: String,
    pub port: String,
    pub kind: TimeSeriesKind,
    pub continuity: bool,
}

impl PortRef {
    pub fn new(component: &str, port: &str, kind: TimeSeriesKind, continuity: bool) -> Self {
        Self {
            component: component.to_string(),
            port: port.to_string(),
            kind,
            continuity,
        }
    }

    /// Column name of this port in the result table.
    pub fn column(&self) -> String {
        format!("{}_{}", self.component, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_joins_component_and_port() {
        let p = PortRef::new("battery", "flow", TimeSeriesKind::Intensive, false);
        assert_eq!(p.column(), "battery_flow");
    }
}
