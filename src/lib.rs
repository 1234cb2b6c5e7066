//! Rolling-horizon energy-system modeling.
//!
//! Assemble a model from reusable components (sources, sinks, storages,
//! converters, dams) wired together through buses and links, then solve it
//! as a sequence of overlapping optimization windows. Each window is an
//! independent linear program, but continuity-flagged ports feed their
//! solved values back into later windows, producing one continuous result
//! table across the whole horizon.
//!
//! ```no_run
//! use open_energy_modeler::{
//!     BusSide, EnergyModel, FatalSink, SolveOptions, Source, TimeSeries,
//! };
//!
//! # fn main() -> open_energy_modeler::Result<()> {
//! let demand = TimeSeries::from_pairs(
//!     "demand",
//!     &[(0.0, 0.5), (1.0, 1.5), (2.0, 2.5), (3.0, 3.5), (4.0, 4.5), (5.0, 5.5)],
//! )?;
//!
//! let source = Source::new("grid", None, None, 1.0);
//! let sink = FatalSink::new("load", demand);
//! let source_out = source.power_out();
//! let sink_in = sink.power_in();
//!
//! let mut model = EnergyModel::new();
//! model.add_component(source)?;
//! model.add_component(sink)?;
//! model.create_bus("node")?;
//! model.plug_to_bus(&source_out, "node", BusSide::Input, 1.0, 0.0)?;
//! model.plug_to_bus(&sink_in, "node", BusSide::Output, 1.0, 0.0)?;
//!
//! model.define_time_range(1.0, 1, 1, 5)?;
//! model.solve(&SolveOptions::default())?;
//! println!("cost: {}", model.objective_value()?);
//! # Ok(())
//! # }
//! ```

pub mod bus;
pub mod component;
pub mod components;
pub mod error;
pub mod model;
pub mod ports;
pub mod results;
pub mod series;
pub mod solver;
pub mod timeseries;

pub use bus::{Bus, BusPlug, BusSide};
pub use component::{BuildContext, Component, ComponentModel, Frame};
pub use components::{
    Cluster, Converter, Dam, Delayer, FatalSink, FatalSource, GreaterThan, Integral, LowerThan,
    Sink, Source, Storage,
};
pub use error::{ModelError, Result};
pub use model::EnergyModel;
pub use ports::PortRef;
pub use results::ResultTable;
pub use series::{Signal, TimeSeries, TimeSeriesKind};
pub use solver::{
    BackendFactory, LinearExpr, Method, MiniLpBackend, ObjectiveDirection, SolveOptions,
    SolverBackend, VarId,
};
pub use timeseries::TimeSeriesManager;
