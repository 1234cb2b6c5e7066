//! Conservation properties of the time-series resampler.

use proptest::prelude::*;
use rstest::rstest;

use open_energy_modeler::{TimeSeries, TimeSeriesKind, TimeSeriesManager};

fn manager_with(times: &[f64], values: &[f64], kind: TimeSeriesKind) -> TimeSeriesManager {
    let mut manager = TimeSeriesManager::new();
    let series = TimeSeries::new("s", times.to_vec(), values.to_vec()).unwrap();
    manager.register("s", &series, kind).unwrap();
    manager.finalize();
    manager
}

/// Turns random fractions into a strictly increasing grid over [0, span].
fn grid_from_fractions(mut fractions: Vec<f64>, span: f64) -> Vec<f64> {
    fractions.sort_by(f64::total_cmp);
    fractions.dedup();
    let mut grid = vec![0.0];
    grid.extend(fractions.iter().map(|f| f * span));
    grid.push(span);
    grid.dedup();
    grid
}

proptest! {
    #[test]
    fn intensive_constant_is_preserved_on_any_grid(
        value in -100.0f64..100.0,
        span in 1.0f64..50.0,
        fractions in prop::collection::vec(0.01f64..0.99, 1..12),
    ) {
        let mut manager = manager_with(&[0.0, span], &[value, value], TimeSeriesKind::Intensive);
        let grid = grid_from_fractions(fractions, span);
        let out = manager.extract(&grid, "s", false).unwrap();
        for v in out {
            prop_assert!((v - value).abs() < 1e-9);
        }
    }

    #[test]
    fn extensive_partition_sums_to_the_total_integral(
        raw in prop::collection::vec(-50.0f64..50.0, 2..8),
        fractions in prop::collection::vec(0.01f64..0.99, 1..12),
    ) {
        let span = (raw.len() - 1) as f64;
        let times: Vec<f64> = (0..raw.len()).map(|i| i as f64).collect();
        let mut manager = manager_with(&times, &raw, TimeSeriesKind::Extensive);

        // Trapezoid integral of the raw samples over the full range.
        let total: f64 = raw.windows(2).map(|w| 0.5 * (w[0] + w[1])).sum();

        let grid = grid_from_fractions(fractions, span);
        let out = manager.extract(&grid, "s", false).unwrap();
        let sum: f64 = out.iter().sum();
        prop_assert!((sum - total).abs() < 1e-9, "sum {sum}, integral {total}");
    }
}

#[rstest]
#[case::halves(&[0.0, 2.0, 4.0], &[1.0, 3.0])]
#[case::uneven(&[0.0, 1.0, 4.0], &[0.5, 2.5])]
#[case::whole_range(&[0.0, 4.0], &[2.0])]
fn intensive_extraction_averages_a_ramp(#[case] grid: &[f64], #[case] expected: &[f64]) {
    // The ramp v(t) = t is sampled at every unit boundary; with only the
    // two endpoints the interpolated integral would flatten every query
    // to the global average.
    let mut manager = manager_with(
        &[0.0, 1.0, 2.0, 3.0, 4.0],
        &[0.0, 1.0, 2.0, 3.0, 4.0],
        TimeSeriesKind::Intensive,
    );
    let out = manager.extract(grid, "s", false).unwrap();
    assert_eq!(out.len(), expected.len());
    for (got, want) in out.iter().zip(expected) {
        assert!((got - want).abs() < 1e-12, "got {got}, want {want}");
    }
}

#[test]
fn extraction_beyond_extent_clamps_unless_nan_requested() {
    let mut manager = manager_with(&[0.0, 2.0], &[1.0, 1.0], TimeSeriesKind::Extensive);
    let clamped = manager.extract(&[0.0, 2.0, 4.0], "s", false).unwrap();
    assert!((clamped[0] - 2.0).abs() < 1e-12);
    assert!((clamped[1]).abs() < 1e-12);

    let with_nan = manager.extract(&[0.0, 2.0, 4.0], "s", true).unwrap();
    assert!((with_nan[0] - 2.0).abs() < 1e-12);
    assert!(with_nan[1].is_nan());
}
