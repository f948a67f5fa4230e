//! Diagnostic files written for assembled systems.

use pcbtherm_core::{
    Assembler, AssemblyOptions, LayerRegistry, MaterialSet, NodeIndexer, ProblemSpec,
    ThermalLayers, ThermalSystem,
};
use pcbtherm_diag::{DiagnosticsConfig, MatrixMarket, load_system, save_system, write_diagnostics};

fn build(spec: ProblemSpec) -> ThermalSystem {
    let registry = LayerRegistry::standard();
    let layers = ThermalLayers::resolve(&registry).unwrap();
    let materials = MaterialSet::default();
    let mut grid = spec.build(&registry, &layers, &materials).unwrap();
    let indexer = NodeIndexer::build(&mut grid, layers.holeflag).unwrap();
    Assembler::new(AssemblyOptions::default())
        .assemble(&grid, &indexer, &layers, materials.bound_cond)
        .unwrap()
}

#[test]
fn matrix_market_round_trip_is_exact() {
    let system = build(ProblemSpec::Scalable { xsize: 9, ysize: 7 });
    let x: Vec<f64> = (0..system.size()).map(|i| 25.0 + (i as f64) / 7.0).collect();
    let dir = tempfile::tempdir().unwrap();

    let files = save_system(dir.path(), "mm", &system.system, Some(&x)).unwrap();
    assert!(files.matrix.ends_with("mmA.mtx"));
    assert!(files.rhs.ends_with("mmRHS.mtx"));
    assert!(files.solution.ends_with("mmx.mtx"));

    let loaded = load_system(dir.path(), "mm").unwrap();
    assert_eq!(loaded.matrix.to_csr().unwrap(), system.system.to_csr());
    assert_eq!(loaded.rhs.values().unwrap(), system.system.rhs.as_slice());
    assert_eq!(loaded.solution.unwrap().values().unwrap(), x.as_slice());

    // Writing what was read reproduces the files byte for byte.
    let text = std::fs::read_to_string(&files.matrix).unwrap();
    assert_eq!(MatrixMarket::parse(&text).unwrap().render(), text);
}

#[test]
fn diagnostics_for_small_system() {
    let system = build(ProblemSpec::Tiny);
    let dir = tempfile::tempdir().unwrap();
    let config = DiagnosticsConfig {
        dump_matrix_market: true,
        dump_dense_shadow: true,
        output_dir: dir.path().to_path_buf(),
        ..DiagnosticsConfig::default()
    };
    let x = vec![30.0; system.size()];
    let output = write_diagnostics(&config, &system, Some(&x)).unwrap();

    assert!(output.skipped.is_empty());
    for name in ["mmA.mtx", "mmRHS.mtx", "mmx.mtx", "result.html", "mmA.html"] {
        let path = dir.path().join(name);
        assert!(path.exists(), "{name} missing");
        assert!(output.files.contains(&path));
    }
    let html = std::fs::read_to_string(dir.path().join("result.html")).unwrap();
    assert!(html.contains("<h1>Ax = b</h1>"));
    assert!(html.contains("<tr><td>Node count</td><td>9</td></tr>"));
}

#[test]
fn oversized_page_skipped() {
    let system = build(ProblemSpec::Scalable { xsize: 12, ysize: 12 });
    let dir = tempfile::tempdir().unwrap();
    let config = DiagnosticsConfig {
        dump_dense_shadow: true,
        output_dir: dir.path().to_path_buf(),
        ..DiagnosticsConfig::default()
    };
    let output = write_diagnostics(&config, &system, None).unwrap();
    assert!(output.files.is_empty());
    assert_eq!(output.skipped.len(), 1);
    assert!(!dir.path().join("result.html").exists());
}

#[test]
fn disabled_writes_nothing() {
    let system = build(ProblemSpec::Tiny);
    let dir = tempfile::tempdir().unwrap();
    let config = DiagnosticsConfig {
        output_dir: dir.path().join("never"),
        ..DiagnosticsConfig::default()
    };
    let output = write_diagnostics(&config, &system, None).unwrap();
    assert!(output.files.is_empty());
    assert!(!dir.path().join("never").exists());
}
