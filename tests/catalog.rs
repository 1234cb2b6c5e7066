//! Component catalog behavior inside full rolling-horizon solves.

use open_energy_modeler::{
    BusSide, Cluster, Converter, Dam, Delayer, EnergyModel, FatalSink, FatalSource, GreaterThan,
    Integral, LowerThan, SolveOptions, Source, Storage, TimeSeries,
};

fn constant_series(name: &str, value: f64, until: f64) -> TimeSeries {
    TimeSeries::from_pairs(name, &[(0.0, value), (until, value)]).unwrap()
}

#[test]
fn storage_discharges_and_carries_its_level_across_windows() {
    let demand = constant_series("demand", 1.0, 10.0);
    let storage = Storage::new("battery", 10.0, 10.0, 1.0, 0.5);
    let sink = FatalSink::new("load", demand);
    let flow = storage.flow();
    let sink_in = sink.power_in();

    let mut model = EnergyModel::new();
    model.add_component(storage).unwrap();
    model.add_component(sink).unwrap();
    model.create_bus("node").unwrap();
    // Discharge (negative flow) feeds the bus.
    model.plug_to_bus(&flow, "node", BusSide::Input, -1.0, 0.0).unwrap();
    model.plug_to_bus(&sink_in, "node", BusSide::Output, 1.0, 0.0).unwrap();
    model.define_time_range(1.0, 1, 1, 2).unwrap();
    model.solve(&SolveOptions::default()).unwrap();

    let table = model.results_table().unwrap();
    let level = table.column("battery_storage").unwrap();
    assert!((level[0] - 4.0).abs() < 1e-6);
    assert!((level[1] - 3.0).abs() < 1e-6);
    let flow = table.column("battery_flow").unwrap();
    assert!((flow[0] + 1.0).abs() < 1e-6);
}

#[test]
fn converter_scales_input_by_its_efficiency() {
    let demand = constant_series("demand", 1.0, 5.0);
    let source = Source::new("grid", Some(0.0), None, 1.0);
    let converter = Converter::new("boiler", 0.5, None, None);
    let sink = FatalSink::new("load", demand);
    let source_out = source.power_out();
    let conv_in = converter.power_in();
    let conv_out = converter.power_out();
    let sink_in = sink.power_in();

    let mut model = EnergyModel::new();
    model.add_component(source).unwrap();
    model.add_component(converter).unwrap();
    model.add_component(sink).unwrap();
    model.add_link(&source_out, &conv_in, 1.0, 0.0).unwrap();
    model.add_link(&conv_out, &sink_in, 1.0, 0.0).unwrap();
    model.define_time_range(1.0, 1, 1, 1).unwrap();
    model.solve(&SolveOptions::default()).unwrap();

    let table = model.results_table().unwrap();
    assert!((table.column("grid_power_out").unwrap()[0] - 2.0).abs() < 1e-6);
    assert!((table.column("boiler_power_out").unwrap()[0] - 1.0).abs() < 1e-6);
}

#[test]
fn cluster_turns_on_just_enough_machines() {
    let demand = constant_series("demand", 5.0, 5.0);
    let cluster = Cluster::new("plant", 1.0, 1.0, 3.0, 3, 1, 1, 1.0);
    let sink = FatalSink::new("load", demand);
    let out = cluster.power_out();
    let sink_in = sink.power_in();

    let mut model = EnergyModel::new();
    model.add_component(cluster).unwrap();
    model.add_component(sink).unwrap();
    model.add_link(&out, &sink_in, 1.0, 0.0).unwrap();
    model.define_time_range(1.0, 1, 1, 1).unwrap();
    model.solve(&SolveOptions::default()).unwrap();

    let table = model.results_table().unwrap();
    // 5 units of demand at 3 per machine needs two machines on.
    assert!((table.column("plant_n_machine").unwrap()[0] - 2.0).abs() < 1e-6);
    assert!((table.column("plant_turn_on").unwrap()[0] - 2.0).abs() < 1e-6);
    assert!((model.objective_value().unwrap() - 2.0).abs() < 1e-6);
}

#[test]
fn cluster_keeps_running_machines_across_windows() {
    let demand = constant_series("demand", 5.0, 5.0);
    let cluster = Cluster::new("plant", 1.0, 1.0, 3.0, 3, 2, 2, 1.0);
    let sink = FatalSink::new("load", demand);
    let out = cluster.power_out();
    let sink_in = sink.power_in();

    let mut model = EnergyModel::new();
    model.add_component(cluster).unwrap();
    model.add_component(sink).unwrap();
    model.add_link(&out, &sink_in, 1.0, 0.0).unwrap();
    model.define_time_range(1.0, 1, 1, 2).unwrap();
    model.solve(&SolveOptions::default()).unwrap();

    let table = model.results_table().unwrap();
    // Two machines start in the first window; the second window inherits
    // them through history and pays no further turn-on price.
    for n in table.column("plant_n_machine").unwrap() {
        assert!((n - 2.0).abs() < 1e-5);
    }
    assert!((table.column("plant_turn_on").unwrap()[1]).abs() < 1e-5);
    assert!((model.objective_value().unwrap() - 2.0).abs() < 1e-6);
}

#[test]
fn dam_accumulates_inflow_minus_turbined_output() {
    let demand = constant_series("demand", 1.0, 5.0);
    let inflow = constant_series("inflow", 2.0, 5.0);
    let dam = Dam::new("dam", 1.0, 0.0, 10.0, 100.0, 0.5).with_water_inflow(inflow);
    let sink = FatalSink::new("load", demand);
    let dam_out = dam.power_out();
    let sink_in = sink.power_in();

    let mut model = EnergyModel::new();
    model.add_component(dam).unwrap();
    model.add_component(sink).unwrap();
    model.add_link(&dam_out, &sink_in, 1.0, 0.0).unwrap();
    model.define_time_range(1.0, 2, 2, 1).unwrap();
    model.solve(&SolveOptions::default()).unwrap();

    let table = model.results_table().unwrap();
    let level = table.column("dam_storage").unwrap();
    assert!((level[0] - 51.0).abs() < 1e-6);
    assert!((level[1] - 52.0).abs() < 1e-6);
}

#[test]
fn delayer_replays_its_input_one_window_later() {
    let flow = constant_series("flow", 2.0, 5.0);
    let source = FatalSource::new("feed", flow);
    let delayer = Delayer::new("lag", 1, 9.0);
    let source_out = source.power_out();
    let lag_in = delayer.power_in();

    let mut model = EnergyModel::new();
    model.add_component(source).unwrap();
    model.add_component(delayer).unwrap();
    model.add_link(&source_out, &lag_in, 1.0, 0.0).unwrap();
    model.define_time_range(1.0, 1, 1, 3).unwrap();
    model.solve(&SolveOptions::default()).unwrap();

    let table = model.results_table().unwrap();
    let out = table.column("lag_power_out").unwrap();
    // Before the simulation start the declared default fills in.
    assert!((out[0] - 9.0).abs() < 1e-6);
    assert!((out[1] - 2.0).abs() < 1e-6);
    assert!((out[2] - 2.0).abs() < 1e-6);
}

#[test]
fn integral_sums_its_input_over_a_rolling_span() {
    // Per-step averages of the ramp are 1, 2, 3.
    let flow = TimeSeries::from_pairs(
        "flow",
        &[(0.0, 0.5), (1.0, 1.5), (2.0, 2.5), (3.0, 3.5)],
    )
    .unwrap();
    let source = FatalSource::new("feed", flow);
    let integral = Integral::new("window", 2);
    let source_out = source.power_out();
    let integral_in = integral.power_in();

    let mut model = EnergyModel::new();
    model.add_component(source).unwrap();
    model.add_component(integral).unwrap();
    model.add_link(&source_out, &integral_in, 1.0, 0.0).unwrap();
    model.define_time_range(1.0, 1, 1, 3).unwrap();
    model.solve(&SolveOptions::default()).unwrap();

    let table = model.results_table().unwrap();
    let out = table.column("window_power_out").unwrap();
    // First step has no past, so the missing term counts as zero. Later
    // steps read the previous window back from the history.
    for (got, want) in out.iter().zip([1.0, 3.0, 5.0]) {
        assert!((got - want).abs() < 1e-6, "got {got}, want {want}");
    }
}

#[test]
fn lower_than_caps_a_profitable_source() {
    let source = Source::new("gen", Some(0.0), None, -1.0);
    let cap = LowerThan::new("cap", 4.0);
    let source_out = source.power_out();
    let cap_in = cap.power_in();

    let mut model = EnergyModel::new();
    model.add_component(source).unwrap();
    model.add_component(cap).unwrap();
    model.add_link(&source_out, &cap_in, 1.0, 0.0).unwrap();
    model.define_time_range(1.0, 1, 2, 1).unwrap();
    model.solve(&SolveOptions::default()).unwrap();

    let table = model.results_table().unwrap();
    let out = table.column("gen_power_out").unwrap();
    assert!((out[0] - 4.0).abs() < 1e-6);
    assert!((out[1] - 4.0).abs() < 1e-6);
    assert!((model.objective_value().unwrap() + 8.0).abs() < 1e-6);
}

#[test]
fn greater_than_follows_its_bound_series() {
    // Per-step averages of the floor are 2 then 3.
    let floor_series =
        TimeSeries::from_pairs("floor", &[(0.0, 1.5), (1.0, 2.5), (2.0, 3.5)]).unwrap();
    let source = Source::new("gen", Some(0.0), None, 1.0);
    let floor = GreaterThan::new("floor", 0.0).with_bound_series(floor_series);
    let source_out = source.power_out();
    let floor_in = floor.power_in();

    let mut model = EnergyModel::new();
    model.add_component(source).unwrap();
    model.add_component(floor).unwrap();
    model.add_link(&source_out, &floor_in, 1.0, 0.0).unwrap();
    model.define_time_range(1.0, 1, 2, 1).unwrap();
    model.solve(&SolveOptions::default()).unwrap();

    let table = model.results_table().unwrap();
    let out = table.column("gen_power_out").unwrap();
    assert!((out[0] - 2.0).abs() < 1e-6);
    assert!((out[1] - 3.0).abs() < 1e-6);
}

#[test]
fn fatal_flows_are_constants_not_variables() {
    let flow = constant_series("flow", 3.0, 5.0);
    let source = FatalSource::new("feed", flow.clone());
    let sink = FatalSink::new("drain", flow);
    let source_out = source.power_out();
    let sink_in = sink.power_in();

    let mut model = EnergyModel::new();
    model.add_component(source).unwrap();
    model.add_component(sink).unwrap();
    model.add_link(&source_out, &sink_in, 1.0, 0.0).unwrap();
    model.define_time_range(1.0, 1, 2, 1).unwrap();
    model.solve(&SolveOptions::default()).unwrap();

    let table = model.results_table().unwrap();
    assert_eq!(table.column("feed_power_out").unwrap(), &[3.0, 3.0]);
    assert_eq!(table.column("drain_power_in").unwrap(), &[3.0, 3.0]);
}
