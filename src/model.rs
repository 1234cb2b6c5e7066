//! Rolling-horizon orchestrator.
//!
//! [`EnergyModel`] owns the registered components, buses and links, advances
//! the clock across overlapping optimization windows and stitches each
//! window's solution into one continuous result table. Components only ever
//! see their own inputs, history and future preview; everything crossing a
//! component boundary goes through a bus or a link.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::bus::{Bus, BusPlug, BusSide};
use crate::component::{BuildContext, Component, Frame};
use crate::error::{ModelError, Result};
use crate::ports::PortRef;
use crate::results::ResultTable;
use crate::solver::{
    conformance, BackendFactory, LinearExpr, MiniLpBackend, ObjectiveDirection, SolveOptions,
    SolverBackend,
};
use crate::timeseries::TimeSeriesManager;

/// Affine equality between two ports, enforced per time step.
#[derive(Debug, Clone)]
struct Link {
    from: PortRef,
    to: PortRef,
    factor: f64,
    offset: f64,
}

#[derive(Debug, Clone)]
struct TimeSettings {
    time_step: f64,
    shift: usize,
    window_size: usize,
    horizon_count: usize,
    custom_steps: Vec<f64>,
}

type PostProcessing = Box<dyn FnMut(&mut ResultTable) -> anyhow::Result<()>>;

pub struct EnergyModel {
    direction: ObjectiveDirection,
    backends: BTreeMap<String, BackendFactory>,
    active_backend: String,
    components: Vec<Box<dyn Component>>,
    component_index: BTreeMap<String, usize>,
    buses: Vec<Bus>,
    bus_index: BTreeMap<String, usize>,
    links: Vec<Link>,
    priced_ports: Vec<(PortRef, f64)>,
    series: TimeSeriesManager,
    time: Option<TimeSettings>,
    results: ResultTable,
    clock: f64,
    windows_solved: usize,
    cumulated_objective: f64,
    post_processing: Option<PostProcessing>,
}

impl Default for EnergyModel {
    fn default() -> Self {
        Self::new()
    }
}

impl EnergyModel {
    /// Model minimizing its objective with the built-in pure-Rust backend.
    pub fn new() -> Self {
        let mut backends: BTreeMap<String, BackendFactory> = BTreeMap::new();
        backends.insert(
            MiniLpBackend::NAME.to_string(),
            Box::new(|| Box::new(MiniLpBackend::new()) as Box<dyn SolverBackend>),
        );
        #[cfg(feature = "cbc")]
        backends.insert(
            crate::solver::cbc::CbcBackend::NAME.to_string(),
            Box::new(|| Box::new(crate::solver::cbc::CbcBackend::new()) as Box<dyn SolverBackend>),
        );
        Self {
            direction: ObjectiveDirection::Minimize,
            backends,
            active_backend: MiniLpBackend::NAME.to_string(),
            components: Vec::new(),
            component_index: BTreeMap::new(),
            buses: Vec::new(),
            bus_index: BTreeMap::new(),
            links: Vec::new(),
            priced_ports: Vec::new(),
            series: TimeSeriesManager::new(),
            time: None,
            results: ResultTable::new(),
            clock: 0.0,
            windows_solved: 0,
            cumulated_objective: 0.0,
            post_processing: None,
        }
    }

    pub fn with_direction(mut self, direction: ObjectiveDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Registers a custom backend after running the conformance suite on it.
    pub fn register_backend(&mut self, name: &str, factory: BackendFactory) -> Result<()> {
        if self.backends.contains_key(name) {
            return Err(ModelError::BackendExists(name.to_string()));
        }
        conformance::check(|| factory())?;
        self.backends.insert(name.to_string(), factory);
        Ok(())
    }

    pub fn use_backend(&mut self, name: &str) -> Result<()> {
        if !self.backends.contains_key(name) {
            return Err(ModelError::UnknownBackend(name.to_string()));
        }
        self.active_backend = name.to_string();
        Ok(())
    }

    pub fn backend_names(&self) -> Vec<&str> {
        self.backends.keys().map(String::as_str).collect()
    }

    /// Registers a component, validating its declarations and merging its
    /// signals into the time-series table.
    pub fn add_component(&mut self, component: impl Component + 'static) -> Result<()> {
        let name = component.name().to_string();
        if self.component_index.contains_key(&name) || self.bus_index.contains_key(&name) {
            return Err(ModelError::DuplicateName(name));
        }
        if name.contains('_') {
            // Result columns are "{component}_{port}", so underscored names
            // can collide with other component/port combinations.
            warn!(component = %name, "component name contains '_', column names may be ambiguous");
        }
        for (port_name, port) in component.ports() {
            if port.component != name || port.port != port_name {
                return Err(ModelError::ComponentIo {
                    component: name,
                    port: port_name,
                });
            }
        }
        for (series_name, signal) in component.signals() {
            self.series.register(
                format!("{name}_{series_name}"),
                &signal.series,
                signal.kind,
            )?;
        }
        self.component_index.insert(name, self.components.len());
        self.components.push(Box::new(component));
        Ok(())
    }

    /// Creates a named bus; its name shares the component namespace.
    pub fn create_bus(&mut self, name: &str) -> Result<()> {
        if self.component_index.contains_key(name) || self.bus_index.contains_key(name) {
            return Err(ModelError::DuplicateName(name.to_string()));
        }
        self.bus_index.insert(name.to_string(), self.buses.len());
        self.buses.push(Bus::new(name));
        Ok(())
    }

    /// Links two ports with `(from*factor + offset) == to`, step-scaled on
    /// each side when the port is intensive.
    pub fn add_link(&mut self, from: &PortRef, to: &PortRef, factor: f64, offset: f64) -> Result<()> {
        self.check_port(from)?;
        self.check_port(to)?;
        self.links.push(Link {
            from: from.clone(),
            to: to.clone(),
            factor,
            offset,
        });
        Ok(())
    }

    pub fn plug_to_bus(
        &mut self,
        port: &PortRef,
        bus_name: &str,
        side: BusSide,
        factor: f64,
        offset: f64,
    ) -> Result<()> {
        let bus = *self
            .bus_index
            .get(bus_name)
            .ok_or_else(|| ModelError::BusName(bus_name.to_string()))?;
        self.check_port(port)?;
        self.buses[bus].plug(
            side,
            BusPlug {
                port: port.clone(),
                factor,
                offset,
            },
        );
        Ok(())
    }

    /// Prices a port in the objective: `price × value`, summed over the
    /// window.
    pub fn add_io_to_objective(&mut self, port: &PortRef, price: f64) -> Result<()> {
        self.check_port(port)?;
        self.priced_ports.push((port.clone(), price));
        Ok(())
    }

    fn check_port(&self, port: &PortRef) -> Result<()> {
        let idx = self
            .component_index
            .get(&port.component)
            .ok_or_else(|| ModelError::ComponentName(port.component.clone()))?;
        // The whole ref must match the declaration: a wrong kind or
        // continuity flag would silently change step scaling or history.
        match self.components[*idx].ports().get(&port.port) {
            Some(declared) if declared == port => Ok(()),
            _ => Err(ModelError::ComponentIo {
                component: port.component.clone(),
                port: port.port.clone(),
            }),
        }
    }

    /// Defines the rolling horizon: base step length, number of steps the
    /// clock advances between windows, steps per window and window count.
    /// Callable exactly once.
    pub fn define_time_range(
        &mut self,
        time_step: f64,
        shift: usize,
        window_size: usize,
        horizon_count: usize,
    ) -> Result<()> {
        if self.time.is_some() {
            return Err(ModelError::TimeRangeAlreadyDefined);
        }
        if time_step <= 0.0 {
            return Err(ModelError::InvalidTimeRange(format!(
                "time step must be positive, got {time_step}"
            )));
        }
        if window_size == 0 {
            return Err(ModelError::InvalidTimeRange(
                "window size must be at least 1".to_string(),
            ));
        }
        if horizon_count == 0 {
            return Err(ModelError::InvalidTimeRange(
                "horizon count must be at least 1".to_string(),
            ));
        }
        if shift == 0 || shift > window_size {
            return Err(ModelError::InvalidTimeRange(format!(
                "shift must be between 1 and the window size, got {shift} for {window_size} steps"
            )));
        }
        self.time = Some(TimeSettings {
            time_step,
            shift,
            window_size,
            horizon_count,
            custom_steps: vec![1.0; window_size],
        });
        Ok(())
    }

    /// Overrides the per-step length multipliers inside a window; a value of
    /// 1 equals `time_step`.
    pub fn set_custom_steps(&mut self, custom_steps: Vec<f64>) -> Result<()> {
        let time = self.time.as_mut().ok_or(ModelError::UndefinedTimeRange)?;
        if custom_steps.len() != time.window_size {
            return Err(ModelError::CustomStepCount {
                expected: time.window_size,
                got: custom_steps.len(),
            });
        }
        time.custom_steps = custom_steps;
        Ok(())
    }

    /// Registers a hook run on the result table after every window. The hook
    /// may rewrite values but must keep the row count and column set intact.
    pub fn set_post_processing(
        &mut self,
        hook: impl FnMut(&mut ResultTable) -> anyhow::Result<()> + 'static,
    ) -> Result<()> {
        if self.post_processing.is_some() {
            return Err(ModelError::PostProcessingAlreadySet);
        }
        self.post_processing = Some(Box::new(hook));
        Ok(())
    }

    /// Solves `horizon_count` windows, stitching each into the result table.
    /// A repeated call continues from the current clock.
    pub fn solve(&mut self, options: &SolveOptions) -> Result<()> {
        let time = self.time.clone().ok_or(ModelError::UndefinedTimeRange)?;

        if let Some(path) = &options.intermediate_results_path {
            let dir = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            if !dir.is_dir() {
                return Err(ModelError::IntermediateResultsDir(dir.to_path_buf()));
            }
        }

        if self.windows_solved == 0 {
            self.series.finalize();
            if time.shift < time.window_size {
                warn!(
                    shift = time.shift,
                    window_size = time.window_size,
                    "windows overlap, the cumulated objective counts overlapping steps twice"
                );
            }
        }

        let mut grid = self.window_grid(&time);
        for iteration in 0..time.horizon_count {
            if iteration > 0 {
                self.clock = grid[time.shift];
                grid = self.window_grid(&time);
            }
            info!(window = self.windows_solved + 1, clock = self.clock, "solving window");
            self.advance(&time, &grid, options)?;
        }
        Ok(())
    }

    /// Absolute step-boundary times of the current window, `window_size + 1`
    /// points starting at the clock.
    fn window_grid(&self, time: &TimeSettings) -> Vec<f64> {
        let mut grid = Vec::with_capacity(time.window_size + 1);
        let mut t = self.clock;
        grid.push(t);
        for step in &time.custom_steps {
            t += step * time.time_step;
            grid.push(t);
        }
        grid
    }

    fn advance(&mut self, time: &TimeSettings, grid: &[f64], options: &SolveOptions) -> Result<()> {
        let n = time.window_size;
        let steps: Vec<f64> = time.custom_steps.iter().map(|c| c * time.time_step).collect();
        let factory = &self.backends[&self.active_backend];
        let mut backend = factory();
        let mut objective = LinearExpr::constant(0.0);

        // Tentative tail of the previous window, re-sampled on demand. The
        // slice starts at the clock row so the preview axis begins at the
        // clock itself.
        let mut future_manager = if self.windows_solved > 0 {
            let settled = self.results.settled_len(self.clock);
            let start = settled.saturating_sub(1);
            let times = &self.results.time()[start..];
            let mut manager = TimeSeriesManager::new();
            for component in &self.components {
                for port in component.ports().values() {
                    let column = port.column();
                    if let Some(values) = self.results.column(&column) {
                        manager.register_raw(column, times, &values[start..], port.kind);
                    }
                }
            }
            manager.finalize();
            Some(manager)
        } else {
            None
        };

        let mut variables: Vec<BTreeMap<String, Vec<LinearExpr>>> =
            Vec::with_capacity(self.components.len());

        for component in &self.components {
            let name = component.name().to_string();
            let ports = component.ports();
            let continuity: Vec<&PortRef> = ports.values().filter(|p| p.continuity).collect();

            let mut inputs = Frame::new(n);
            for series_name in component.signals().keys() {
                let values = self
                    .series
                    .extract(grid, &format!("{name}_{series_name}"), false)?;
                inputs.insert(series_name.clone(), values);
            }

            let (history, future) = if self.windows_solved > 0 && !continuity.is_empty() {
                let settled = self.results.settled_len(self.clock);
                let mut history = Frame::new(settled);
                for port in &continuity {
                    if let Some(values) = self.results.column(&port.column()) {
                        history.insert(port.port.clone(), values[..settled].to_vec());
                    }
                }
                let manager = future_manager
                    .as_mut()
                    .filter(|_| n > 1);
                let mut future = Frame::new(n.saturating_sub(1));
                if let Some(manager) = manager {
                    let preview_grid = &grid[..n];
                    for port in &continuity {
                        let values = manager.extract(preview_grid, &port.column(), true)?;
                        future.insert(port.port.clone(), values);
                    }
                }
                (history, future)
            } else {
                (Frame::new(0), Frame::new(0))
            };

            let ctx = BuildContext {
                name: &name,
                steps: &steps,
                inputs: &inputs,
                history: &history,
                future: &future,
            };
            let built = component.build(&ctx, backend.as_mut())?;

            for (port_name, values) in &built.variables {
                if !ports.contains_key(port_name) {
                    return Err(ModelError::ComponentBuild {
                        component: name.clone(),
                        reason: format!("undeclared port '{port_name}' in build output"),
                    });
                }
                if values.len() != n {
                    return Err(ModelError::ComponentBuild {
                        component: name.clone(),
                        reason: format!(
                            "port '{port_name}' has {} values for {n} steps",
                            values.len()
                        ),
                    });
                }
            }
            for port_name in ports.keys() {
                if !built.variables.contains_key(port_name) {
                    return Err(ModelError::ComponentBuild {
                        component: name.clone(),
                        reason: format!("declared port '{port_name}' missing from build output"),
                    });
                }
            }

            objective += built.objective.clone();
            variables.push(built.variables);
        }

        for (port, price) in &self.priced_ports {
            let idx = self.component_index[&port.component];
            let values = &variables[idx][&port.port];
            objective += LinearExpr::sum(values.iter().map(|v| v.clone() * *price));
        }

        for link in &self.links {
            let from = &variables[self.component_index[&link.from.component]][&link.from.port];
            let to = &variables[self.component_index[&link.to.component]][&link.to.port];
            for i in 0..n {
                let scale_from = if link.from.kind.is_intensive() { steps[i] } else { 1.0 };
                let scale_to = if link.to.kind.is_intensive() { steps[i] } else { 1.0 };
                backend.add_equality(
                    (from[i].clone() * link.factor + LinearExpr::constant(link.offset))
                        * scale_from,
                    to[i].clone() * scale_to,
                );
            }
        }

        for bus in &self.buses {
            for i in 0..n {
                // The step scale applies to the factor only, never the
                // flat per-plug offset.
                let side_sum = |plugs: &[BusPlug]| {
                    LinearExpr::sum(plugs.iter().map(|plug| {
                        let scale = if plug.port.kind.is_intensive() { steps[i] } else { 1.0 };
                        let idx = self.component_index[&plug.port.component];
                        let value = variables[idx][&plug.port.port][i].clone();
                        value * (plug.factor * scale) + LinearExpr::constant(plug.offset)
                    }))
                };
                backend.add_equality(side_sum(bus.inputs()), side_sum(bus.outputs()));
            }
        }

        backend.set_objective(objective, self.direction);
        backend.solve(options)?;

        let mut window_columns: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for (component, ports) in self.components.iter().zip(&variables) {
            for (port_name, values) in ports {
                let column = format!("{}_{}", component.name(), port_name);
                let resolved = values
                    .iter()
                    .map(|expr| backend.eval(expr))
                    .collect::<Result<Vec<f64>>>()?;
                window_columns.insert(column, resolved);
            }
        }
        debug!(
            columns = window_columns.len(),
            rows = n,
            "committing window results"
        );
        self.results.stitch(&grid[1..], &window_columns);
        self.windows_solved += 1;

        if let Some(hook) = self.post_processing.as_mut() {
            let snapshot = self.results.clone();
            let rows = snapshot.len();
            let columns: Vec<String> =
                snapshot.column_names().iter().map(|s| s.to_string()).collect();
            let verdict = hook(&mut self.results);
            let violation = match verdict {
                Err(e) => Some(format!("post-processing hook failed: {e}")),
                Ok(()) if self.results.len() != rows => Some(format!(
                    "row count changed from {rows} to {}",
                    self.results.len()
                )),
                Ok(()) if self.results.column_names() != columns => {
                    Some("column set changed".to_string())
                }
                Ok(()) => None,
            };
            if let Some(reason) = violation {
                self.results = snapshot;
                return Err(ModelError::PostProcessing(reason));
            }
        }

        self.cumulated_objective += backend.objective_value()?;

        if let Some(path) = &options.intermediate_results_path {
            debug!(path = %path.display(), "writing intermediate results");
            self.results.write_csv(path)?;
        }
        Ok(())
    }

    /// Full stitched result table; rejected before the first window solved.
    pub fn results_table(&self) -> Result<&ResultTable> {
        if self.windows_solved == 0 {
            return Err(ModelError::NoResults);
        }
        Ok(&self.results)
    }

    /// Results as `{component: {port: series}}` plus the shared time column.
    pub fn results_map(&self) -> Result<(Vec<f64>, BTreeMap<String, BTreeMap<String, Vec<f64>>>)> {
        let table = self.results_table()?;
        let mut nested: BTreeMap<String, BTreeMap<String, Vec<f64>>> = BTreeMap::new();
        for component in &self.components {
            let per_component = nested.entry(component.name().to_string()).or_default();
            for port in component.ports().values() {
                if let Some(values) = table.column(&port.column()) {
                    per_component.insert(port.port.clone(), values.to_vec());
                }
            }
        }
        Ok((table.time().to_vec(), nested))
    }

    /// Objective cumulated over all solved windows.
    pub fn objective_value(&self) -> Result<f64> {
        if self.windows_solved == 0 {
            return Err(ModelError::NoResults);
        }
        Ok(self.cumulated_objective)
    }

    /// Clock at the start of the next window.
    pub fn current_time(&self) -> f64 {
        self.clock
    }
}
