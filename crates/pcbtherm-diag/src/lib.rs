//! Diagnostics for pcbtherm.
//!
//! This crate provides:
//! - Matrix-Market writer and reader ([`MatrixMarket`], [`save_system`], [`load_system`])
//! - Nonzeros-per-row histogram ([`NonzeroHistogram`])
//! - HTML and plain-text dumps of the dense shadow ([`render_system_page`], [`render_text`])
//! - A driver writing whatever a [`DiagnosticsConfig`] asks for ([`write_diagnostics`])

pub mod error;
pub mod histogram;
pub mod html;
pub mod matrix_market;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use pcbtherm_core::ThermalSystem;

pub use error::{DiagError, Result};
pub use histogram::{NonzeroHistogram, most_common_nonzero_count};
pub use html::{format_entry, render_matrix_market_page, render_system_page, render_text, write_page};
pub use matrix_market::{LoadedSystem, MatrixMarket, SystemFiles, load_system, save_system};

/// Which diagnostic artifacts to write, and where.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub dump_matrix_market: bool,
    pub dump_dense_shadow: bool,
    /// HTML pages are skipped above this many unknowns.
    pub max_diagnostic_mesh_size: usize,
    pub output_dir: PathBuf,
    pub mm_prefix: String,
    pub html_name: String,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            dump_matrix_market: false,
            dump_dense_shadow: false,
            max_diagnostic_mesh_size: 100,
            output_dir: PathBuf::from("."),
            mm_prefix: "mm".to_string(),
            html_name: "result.html".to_string(),
        }
    }
}

impl DiagnosticsConfig {
    pub fn is_enabled(&self) -> bool {
        self.dump_matrix_market || self.dump_dense_shadow
    }
}

/// Files written by one [`write_diagnostics`] call and what was skipped.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiagnosticsOutput {
    pub files: Vec<PathBuf>,
    pub skipped: Vec<String>,
}

/// Write the configured artifacts for `system` and its primary solution.
///
/// Size limits are not errors: an oversized page is listed in `skipped`.
pub fn write_diagnostics(
    config: &DiagnosticsConfig,
    system: &ThermalSystem,
    x: Option<&[f64]>,
) -> Result<DiagnosticsOutput> {
    let mut output = DiagnosticsOutput::default();
    if !config.is_enabled() {
        return Ok(output);
    }
    std::fs::create_dir_all(&config.output_dir)
        .map_err(|e| DiagError::io(&config.output_dir, e))?;

    // Matrix-Market x must cover every unknown, so a temperatures-only
    // vector from a saddle-point system is left out.
    let full_x = x.filter(|x| x.len() == system.size());

    if config.dump_matrix_market {
        let files = save_system(&config.output_dir, &config.mm_prefix, &system.system, full_x)?;
        output.files.push(files.matrix.clone());
        output.files.push(files.rhs.clone());
        if full_x.is_some() {
            output.files.push(files.solution.clone());
        }
    }

    if config.dump_dense_shadow {
        let size = system.size();
        if size > config.max_diagnostic_mesh_size {
            let reason = format!(
                "HTML page skipped: system size {size} exceeds limit {}",
                config.max_diagnostic_mesh_size
            );
            log::warn!("{reason}");
            output.skipped.push(reason);
        } else if system.shadow.is_none() {
            let reason = format!("HTML page skipped: no dense shadow for system size {size}");
            log::warn!("{reason}");
            output.skipped.push(reason);
        } else {
            let path = config.output_dir.join(&config.html_name);
            write_page(&path, &render_system_page(system, full_x)?)?;
            log::info!("Wrote {}", path.display());
            output.files.push(path);

            if config.dump_matrix_market {
                let loaded = load_system(&config.output_dir, &config.mm_prefix)?;
                let mm_path = config
                    .output_dir
                    .join(format!("{}A.html", config.mm_prefix));
                write_page(&mm_path, &render_matrix_market_page(&loaded))?;
                output.files.push(mm_path);
            }
            if log::log_enabled!(log::Level::Debug) {
                log::debug!("System dump:\n{}", render_text(system, full_x)?);
            }
        }
    }

    Ok(output)
}
