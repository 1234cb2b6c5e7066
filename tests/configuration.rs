//! Registration and configuration errors are raised eagerly, before any
//! window is solved.

use std::path::PathBuf;

use open_energy_modeler::{
    EnergyModel, ModelError, PortRef, Sink, SolveOptions, Source, TimeSeriesKind,
};

fn model_with_source() -> (EnergyModel, PortRef) {
    let source = Source::new("grid", None, None, 1.0);
    let port = source.power_out();
    let mut model = EnergyModel::new();
    model.add_component(source).unwrap();
    (model, port)
}

#[test]
fn duplicate_names_are_rejected_across_components_and_buses() {
    let (mut model, _) = model_with_source();
    let err = model
        .add_component(Sink::new("grid", None, None, 0.0))
        .unwrap_err();
    assert!(matches!(err, ModelError::DuplicateName(_)));

    let err = model.create_bus("grid").unwrap_err();
    assert!(matches!(err, ModelError::DuplicateName(_)));

    model.create_bus("node").unwrap();
    let err = model.create_bus("node").unwrap_err();
    assert!(matches!(err, ModelError::DuplicateName(_)));
}

#[test]
fn time_range_is_defined_exactly_once() {
    let (mut model, _) = model_with_source();
    model.define_time_range(1.0, 1, 2, 3).unwrap();
    assert!(matches!(
        model.define_time_range(1.0, 1, 2, 3),
        Err(ModelError::TimeRangeAlreadyDefined)
    ));
}

#[test]
fn degenerate_time_ranges_are_rejected() {
    let cases: [(f64, usize, usize, usize); 5] = [
        (0.0, 1, 2, 3),
        (-1.0, 1, 2, 3),
        (1.0, 1, 0, 3),
        (1.0, 1, 2, 0),
        (1.0, 0, 2, 3),
    ];
    for (time_step, shift, window_size, horizon_count) in cases {
        let (mut model, _) = model_with_source();
        assert!(
            matches!(
                model.define_time_range(time_step, shift, window_size, horizon_count),
                Err(ModelError::InvalidTimeRange(_))
            ),
            "accepted time range ({time_step}, {shift}, {window_size}, {horizon_count})"
        );
    }
}

#[test]
fn shift_may_not_exceed_the_window() {
    // The clock advances by `shift` steps per window, so a larger shift
    // would point past the solved grid.
    let (mut model, _) = model_with_source();
    assert!(matches!(
        model.define_time_range(1.0, 3, 2, 2),
        Err(ModelError::InvalidTimeRange(_))
    ));
    model.define_time_range(1.0, 2, 2, 2).unwrap();
}

#[test]
fn custom_steps_need_the_time_range_and_the_right_length() {
    let (mut model, _) = model_with_source();
    assert!(matches!(
        model.set_custom_steps(vec![1.0, 1.0]),
        Err(ModelError::UndefinedTimeRange)
    ));

    model.define_time_range(1.0, 1, 2, 3).unwrap();
    assert!(matches!(
        model.set_custom_steps(vec![1.0, 1.0, 1.0]),
        Err(ModelError::CustomStepCount { expected: 2, got: 3 })
    ));
    model.set_custom_steps(vec![0.5, 2.0]).unwrap();
}

#[test]
fn solve_requires_a_time_range() {
    let (mut model, _) = model_with_source();
    assert!(matches!(
        model.solve(&SolveOptions::default()),
        Err(ModelError::UndefinedTimeRange)
    ));
}

#[test]
fn links_and_plugs_check_their_references() {
    let (mut model, port) = model_with_source();
    let ghost = PortRef::new("nobody", "power_out", TimeSeriesKind::Intensive, false);
    let wrong_port = PortRef::new("grid", "flow", TimeSeriesKind::Intensive, false);

    assert!(matches!(
        model.add_link(&port, &ghost, 1.0, 0.0),
        Err(ModelError::ComponentName(_))
    ));
    assert!(matches!(
        model.add_link(&port, &wrong_port, 1.0, 0.0),
        Err(ModelError::ComponentIo { .. })
    ));
    assert!(matches!(
        model.plug_to_bus(&port, "node", open_energy_modeler::BusSide::Input, 1.0, 0.0),
        Err(ModelError::BusName(_))
    ));
    assert!(matches!(
        model.add_io_to_objective(&ghost, 1.0),
        Err(ModelError::ComponentName(_))
    ));
}

#[test]
fn port_references_must_match_the_declaration() {
    // A ref naming a real port but with the wrong kind or continuity flag
    // would change step scaling or history handling; the whole ref has to
    // match what the component declares.
    let (mut model, port) = model_with_source();
    let sink = Sink::new("load", None, None, 0.0);
    let sink_in = sink.power_in();
    model.add_component(sink).unwrap();

    let wrong_kind = PortRef::new("grid", "power_out", TimeSeriesKind::Extensive, false);
    assert!(matches!(
        model.add_link(&wrong_kind, &sink_in, 1.0, 0.0),
        Err(ModelError::ComponentIo { .. })
    ));

    let wrong_continuity = PortRef::new("grid", "power_out", TimeSeriesKind::Intensive, true);
    assert!(matches!(
        model.add_link(&wrong_continuity, &sink_in, 1.0, 0.0),
        Err(ModelError::ComponentIo { .. })
    ));

    model.add_link(&port, &sink_in, 1.0, 0.0).unwrap();
}

#[test]
fn results_are_rejected_before_the_first_window() {
    let (model, _) = model_with_source();
    assert!(matches!(model.results_table(), Err(ModelError::NoResults)));
    assert!(matches!(model.results_map(), Err(ModelError::NoResults)));
    assert!(matches!(model.objective_value(), Err(ModelError::NoResults)));
}

#[test]
fn unknown_backend_selection_fails() {
    let (mut model, _) = model_with_source();
    assert!(matches!(
        model.use_backend("gurobi"),
        Err(ModelError::UnknownBackend(_))
    ));
    assert!(model.backend_names().contains(&"minilp"));
}

#[test]
fn custom_backends_pass_the_conformance_gate_once() {
    use open_energy_modeler::{MiniLpBackend, SolverBackend};

    let (mut model, _) = model_with_source();
    assert!(matches!(
        model.register_backend(
            "minilp",
            Box::new(|| Box::new(MiniLpBackend::new()) as Box<dyn SolverBackend>),
        ),
        Err(ModelError::BackendExists(_))
    ));
    model
        .register_backend(
            "minilp2",
            Box::new(|| Box::new(MiniLpBackend::new()) as Box<dyn SolverBackend>),
        )
        .unwrap();
    model.use_backend("minilp2").unwrap();
}

#[test]
fn post_processing_hook_is_set_at_most_once() {
    let (mut model, _) = model_with_source();
    model.set_post_processing(|_| Ok(())).unwrap();
    assert!(matches!(
        model.set_post_processing(|_| Ok(())),
        Err(ModelError::PostProcessingAlreadySet)
    ));
}

#[test]
fn intermediate_results_need_an_existing_directory() {
    let (mut model, _) = model_with_source();
    model.define_time_range(1.0, 1, 1, 1).unwrap();
    let options = SolveOptions {
        intermediate_results_path: Some(PathBuf::from("/no/such/dir/results.csv")),
        ..SolveOptions::default()
    };
    assert!(matches!(
        model.solve(&options),
        Err(ModelError::IntermediateResultsDir(_))
    ));
}

#[test]
fn unsupported_solver_options_fail_loudly() {
    let (mut model, port) = model_with_source();
    model.add_io_to_objective(&port, 1.0).unwrap();
    model.define_time_range(1.0, 1, 1, 1).unwrap();
    let options = SolveOptions {
        threads: Some(4),
        ..SolveOptions::default()
    };
    assert!(matches!(
        model.solve(&options),
        Err(ModelError::UnsupportedOption { .. })
    ));
}
