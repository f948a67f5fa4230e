//! Report formatting.

use pcbtherm::{OutcomeResult, PipelineReport};

/// Print a run report in human-readable form.
pub fn print_report(report: &PipelineReport) {
    print!("{}", format_report(report));
}

pub fn format_report(report: &PipelineReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "System: {} nodes, {} boundary cells, {} unknowns ({:?})\n\n",
        report.node_count, report.boundary_count, report.system_size, report.strategy
    ));

    out.push_str("Backends:\n");
    for outcome in &report.outcomes {
        let primary = if Some(outcome.kind) == report.primary { " *" } else { "" };
        out.push_str(&format!(
            "  {:<17} {:>9.3} s{}\n",
            outcome.kind.to_string(),
            outcome.elapsed_secs,
            primary
        ));
        match &outcome.result {
            OutcomeResult::Temperatures {
                method,
                converged,
                iterations,
                residual,
                energy,
                max_deviation,
                layer,
                ..
            } => {
                out.push_str(&format!("    method: {method}\n"));
                if let Some(it) = iterations {
                    out.push_str(&format!(
                        "    iterations: {it} ({})\n",
                        if *converged { "converged" } else { "not converged" }
                    ));
                }
                if let Some(r) = residual {
                    out.push_str(&format!("    residual: {r:.3e}\n"));
                }
                out.push_str(&format!(
                    "    energy: injected {:.6} W, absorbed {:.6} W, mismatch {:.3e}{}\n",
                    energy.injected,
                    energy.absorbed(),
                    energy.relative_mismatch,
                    if energy.balanced { "" } else { " (imbalanced)" }
                ));
                if let Some(d) = max_deviation {
                    out.push_str(&format!("    max deviation from primary: {d:.3e} C\n"));
                }
                if let Some(layer) = layer {
                    out.push_str(&format!("    written to layer: {layer}\n"));
                }
            }
            OutcomeResult::Spectrum { spectrum } => {
                out.push_str(&format!(
                    "    eigenvalues: smallest {:.6e}, largest {:.6e}, condition {:.3e} ({})\n",
                    spectrum.smallest, spectrum.largest, spectrum.condition_number, spectrum.method
                ));
            }
            OutcomeResult::Failed { error } => {
                out.push_str(&format!("    failed: {error}\n"));
            }
        }
    }

    if let Some(stats) = &report.temperature_stats {
        out.push_str(&format!(
            "\nTemperatures over {} cells: min {:.4} C, max {:.4} C, mean {:.4} C\n",
            stats.count, stats.min, stats.max, stats.mean
        ));
    }

    if let Some(diag) = &report.diagnostics {
        if !diag.files.is_empty() {
            out.push_str("\nDiagnostics written:\n");
            for file in &diag.files {
                out.push_str(&format!("  {}\n", file.display()));
            }
        }
    }

    if !report.warnings.is_empty() {
        out.push_str("\nWarnings:\n");
        for warning in &report.warnings {
            out.push_str(&format!("  {warning}\n"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcbtherm::{
        BackendSelection, LayerRegistry, MaterialSet, Pipeline, PipelineConfig, ProblemSpec,
    };

    #[test]
    fn report_lists_every_backend() {
        let config = PipelineConfig::default()
            .with_backends(BackendSelection::from_names("direct,eigen").unwrap());
        let run = Pipeline::new(config)
            .run_problem(&ProblemSpec::Tiny, &LayerRegistry::standard(), &MaterialSet::default())
            .unwrap();

        let text = format_report(&run.report);
        assert!(text.starts_with("System: 9 nodes, 3 boundary cells, 9 unknowns (Norton)"));
        assert!(text.contains("  direct"));
        assert!(text.contains(" s *\n"));
        assert!(text.contains("eigenvalues: smallest"));
        assert!(text.contains("Temperatures over 9 cells"));
        assert!(!text.contains("Warnings:"));
    }
}
