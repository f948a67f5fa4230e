//! End-to-end pipeline runs on built-in and hand-made problems.

use pcbtherm::diag::load_system;
use pcbtherm::{
    AssemblyOptions, BackendKind, BackendSelection, BoundaryStrategy, DiagnosticsConfig,
    GridField, LayerRegistry, MaterialSet, OutcomeResult, Pipeline, PipelineConfig,
    PipelineWarning, ProblemSpec, ThermalLayers,
};

fn select(names: &str) -> BackendSelection {
    BackendSelection::from_names(names).unwrap()
}

fn max_rel_diff(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len());
    let scale = b.iter().fold(0.0f64, |m, v| m.max(v.abs()));
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
        / scale
}

fn temps(run: &pcbtherm::ProblemRun, kind: BackendKind) -> Vec<f64> {
    run.report
        .outcome(kind)
        .and_then(|o| o.solution())
        .map(|s| s.temperatures().to_vec())
        .unwrap()
}

#[test]
fn unheated_board_sits_at_boundary_temperature() {
    let registry = LayerRegistry::standard();
    let layers = ThermalLayers::resolve(&registry).unwrap();
    let mut grid = GridField::new(4, 3, &registry).unwrap();
    grid.fill_double(layers.resis, 0..4, 0..3, 2.0);
    grid.fill_int(layers.isoflag, 0..1, 0..3, 1);
    grid.fill_double(layers.isodeg, 0..1, 0..3, 25.0);
    grid.set_int(2, 1, layers.holeflag, -1);

    let config = PipelineConfig::default().with_backends(select("direct,dense"));
    let report = Pipeline::new(config).run(&mut grid, &layers, 1000.0).unwrap();

    assert_eq!(report.node_count, 11);
    assert_eq!(report.boundary_count, 3);
    assert_eq!(report.primary, Some(BackendKind::Direct));
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);

    for x in 0..4 {
        for y in 0..3 {
            if (x, y) == (2, 1) {
                assert_eq!(grid.int(x, y, layers.holeflag), -1);
                assert_eq!(grid.double(x, y, layers.deg), 0.0);
                continue;
            }
            assert!((grid.double(x, y, layers.deg) - 25.0).abs() < 1e-9);
            assert!((grid.double(x, y, layers.npdeg.unwrap()) - 25.0).abs() < 1e-9);
        }
    }
    let stats = report.temperature_stats.unwrap();
    assert_eq!(stats.count, 11);
    assert!((stats.mean - 25.0).abs() < 1e-9);
}

#[test]
fn tiny_direct_and_dense_agree() {
    let config = PipelineConfig::default().with_backends(select("direct,dense"));
    let run = Pipeline::new(config)
        .run_problem(&ProblemSpec::Tiny, &LayerRegistry::standard(), &MaterialSet::default())
        .unwrap();

    let direct = temps(&run, BackendKind::Direct);
    let dense = temps(&run, BackendKind::DenseReference);
    assert_eq!(direct.len(), 9);
    assert!(max_rel_diff(&dense, &direct) < 1e-9);

    // The heated center is the hottest cell; the far row is hotter than the
    // boundary row.
    let center = run.grid.double(1, 1, run.layers.deg);
    let stats = run.report.temperature_stats.unwrap();
    assert_eq!(stats.max, center);
    assert!(run.grid.double(1, 2, run.layers.deg) > run.grid.double(1, 0, run.layers.deg));
    assert!(run.grid.double(1, 0, run.layers.deg) > 25.0);

    let dense_outcome = run.report.outcome(BackendKind::DenseReference).unwrap();
    match &dense_outcome.result {
        OutcomeResult::Temperatures {
            layer,
            max_deviation,
            ..
        } => {
            assert_eq!(layer.as_deref(), Some("npdeg"));
            assert!(max_deviation.unwrap() < 1e-9 * center);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[test]
fn scalable_board_balances_energy() {
    let config = PipelineConfig::default().with_backends(select("direct,iterative"));
    let run = Pipeline::new(config)
        .run_problem(
            &ProblemSpec::Scalable { xsize: 24, ysize: 16 },
            &LayerRegistry::standard(),
            &MaterialSet::default(),
        )
        .unwrap();

    let energy = run.report.energy().unwrap();
    assert!(energy.balanced);
    assert!(energy.relative_mismatch < 1e-3);
    assert!(energy.injected > 0.0);

    let iterative = run.report.outcome(BackendKind::Iterative).unwrap();
    assert!(iterative.solution().unwrap().converged);
    assert!(
        max_rel_diff(
            &temps(&run, BackendKind::Iterative),
            &temps(&run, BackendKind::Direct)
        ) < 1e-4
    );
    let itdeg = run.layers.itdeg.unwrap();
    let deg = run.grid.double(12, 8, run.layers.deg);
    assert!((run.grid.double(12, 8, itdeg) - deg).abs() < 1e-3 * deg);
}

#[test]
fn saddle_point_matches_norton() {
    let run_with = |boundary| {
        let config = PipelineConfig::default()
            .with_backends(select("direct"))
            .with_assembly(AssemblyOptions::default().with_boundary(boundary));
        Pipeline::new(config)
            .run_problem(&ProblemSpec::Tiny, &LayerRegistry::standard(), &MaterialSet::default())
            .unwrap()
    };
    let norton = run_with(BoundaryStrategy::Norton);
    let saddle = run_with(BoundaryStrategy::SaddlePoint);

    assert_eq!(norton.report.system_size, 9);
    assert_eq!(saddle.report.system_size, 9 + 2 * 3);
    assert!(max_rel_diff(&temps(&saddle, BackendKind::Direct), &temps(&norton, BackendKind::Direct)) < 1e-9);
    assert!(saddle.report.energy().unwrap().balanced);
}

#[test]
fn failing_backend_does_not_stop_the_run() {
    let mut config = PipelineConfig::default().with_backends(select("direct,spice"));
    config.spice.program = "pcbtherm-no-such-simulator".to_string();
    let run = Pipeline::new(config)
        .run_problem(&ProblemSpec::Tiny, &LayerRegistry::standard(), &MaterialSet::default())
        .unwrap();

    assert_eq!(run.report.primary, Some(BackendKind::Direct));
    assert!(run.report.outcome(BackendKind::ExternalCircuit).unwrap().is_failed());
    assert!(run.report.warnings.iter().any(|w| matches!(
        w,
        PipelineWarning::BackendFailed {
            backend: BackendKind::ExternalCircuit,
            ..
        }
    )));
    assert!(run.grid.double(1, 1, run.layers.deg) > 25.0);
}

#[test]
fn eigen_only_reports_spectrum_without_temperatures() {
    let config = PipelineConfig::default().with_backends(select("eigen"));
    let run = Pipeline::new(config)
        .run_problem(&ProblemSpec::Tiny, &LayerRegistry::standard(), &MaterialSet::default())
        .unwrap();

    assert_eq!(run.report.primary, None);
    assert!(run.report.temperature_stats.is_none());
    assert!(run.report.warnings.contains(&PipelineWarning::NoPrimarySolution));

    let spectrum = run.report.outcome(BackendKind::Eigen).unwrap().spectrum().unwrap();
    assert!(spectrum.smallest > 0.0);
    assert!(spectrum.largest >= spectrum.smallest);
    assert!(spectrum.condition_number >= 1.0);
}

#[test]
fn diagnostics_round_trip_through_files() {
    let dir = tempfile::tempdir().unwrap();
    let diagnostics = DiagnosticsConfig {
        dump_matrix_market: true,
        dump_dense_shadow: true,
        output_dir: dir.path().to_path_buf(),
        ..DiagnosticsConfig::default()
    };
    let config = PipelineConfig::default()
        .with_backends(select("direct"))
        .with_diagnostics(diagnostics);
    let run = Pipeline::new(config)
        .run_problem(&ProblemSpec::Tiny, &LayerRegistry::standard(), &MaterialSet::default())
        .unwrap();

    let written = &run.report.diagnostics.as_ref().unwrap().files;
    for name in ["mmA.mtx", "mmRHS.mtx", "mmx.mtx", "result.html", "mmA.html"] {
        assert!(written.contains(&dir.path().join(name)), "{name} missing");
        assert!(dir.path().join(name).exists());
    }

    let loaded = load_system(dir.path(), "mm").unwrap();
    assert_eq!(loaded.matrix.rows(), 9);
    let solution = loaded.solution.unwrap();
    let x = solution.values().unwrap();
    assert!(max_rel_diff(x, &temps(&run, BackendKind::Direct)) < 1e-12);
}

#[test]
fn report_serializes_to_json() {
    let config = PipelineConfig::default().with_backends(select("direct,eigen"));
    let run = Pipeline::new(config)
        .run_problem(&ProblemSpec::Tiny, &LayerRegistry::standard(), &MaterialSet::default())
        .unwrap();

    let json = serde_json::to_value(&run.report).unwrap();
    assert_eq!(json["node_count"], 9);
    assert_eq!(json["primary"], "direct");
    assert_eq!(json["outcomes"][0]["result"]["status"], "temperatures");
    assert_eq!(json["outcomes"][1]["result"]["status"], "spectrum");
    assert!(json["outcomes"][0]["result"].get("solution").is_none());
}

#[test]
fn named_krylov_method_is_used() {
    for (names, expected) in [("iterative", "cg"), ("cg", "cg"), ("gmres", "gmres")] {
        let config = PipelineConfig::default().with_backends(select(&format!("direct,{names}")));
        let run = Pipeline::new(config)
            .run_problem(&ProblemSpec::Tiny, &LayerRegistry::standard(), &MaterialSet::default())
            .unwrap();

        let outcome = run.report.outcome(BackendKind::Iterative).unwrap();
        if names != "iterative" {
            assert!(outcome.description.contains(expected), "{}", outcome.description);
        }
        let solution = outcome.solution().unwrap();
        assert_eq!(solution.method, expected, "{names}");
        assert!(solution.converged);
        assert!(
            max_rel_diff(
                &temps(&run, BackendKind::Iterative),
                &temps(&run, BackendKind::Direct)
            ) < 1e-6
        );
    }
}
