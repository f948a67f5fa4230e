//! HTML and plain-text dumps of small systems.

use std::fs;
use std::path::Path;

use nalgebra::DMatrix;

use pcbtherm_core::ThermalSystem;

use crate::error::{DiagError, Result};
use crate::histogram::NonzeroHistogram;
use crate::matrix_market::LoadedSystem;

const TABLE_STYLE: &str = "<style>
table { margin-left: 10px; border-right: 1px solid #000; border-left: 1px solid #000; }
td, th { padding: 5px; }
td.diag { background-color: #AAEEAA; }
</style>";

/// Matrix entry as shown in the tables: three decimals, zero as `.`.
pub fn format_entry(v: f64) -> String {
    if v == 0.0 {
        ".".to_string()
    } else {
        format!("{v:.3}")
    }
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<html><head><title>{title}</title>{TABLE_STYLE}</head><body>{body}</body></html>\n"
    )
}

fn shadow_of(system: &ThermalSystem) -> Result<&DMatrix<f64>> {
    system
        .shadow
        .as_ref()
        .map(|s| s.matrix())
        .ok_or(DiagError::ShadowUnavailable {
            size: system.size(),
        })
}

fn check_solution(system: &ThermalSystem, x: Option<&[f64]>) -> Result<()> {
    match x {
        Some(x) if x.len() != system.size() => Err(DiagError::DimensionMismatch {
            expected: system.size(),
            actual: x.len(),
        }),
        _ => Ok(()),
    }
}

fn matrix_table(m: &DMatrix<f64>, highlight_diagonal: bool) -> String {
    let mut out = String::from("<table>");
    for r in 0..m.nrows() {
        out.push_str("<tr>");
        for c in 0..m.ncols() {
            let class = if highlight_diagonal && r == c { " class=\"diag\"" } else { "" };
            out.push_str(&format!("<td{class}>{}</td>", format_entry(m[(r, c)])));
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</table>");
    out
}

/// The `A x = b` page built from the dense shadow.
///
/// Shows `A`, a vector table (column, cell coordinates, row type, `b` and
/// `x` when given) and summary counts.
pub fn render_system_page(system: &ThermalSystem, x: Option<&[f64]>) -> Result<String> {
    let a = shadow_of(system)?;
    check_solution(system, x)?;
    let size = system.size();

    let mut rows = [
        String::from("<tr><td><b>col</b></td>"),
        String::from("<tr><td><b>X</b></td>"),
        String::from("<tr><td><b>Y</b></td>"),
        String::from("<tr><td><b>Type</b></td>"),
        String::from("<tr><td><b>rhs</b></td>"),
        String::from("<tr><td><b>x</b></td>"),
    ];
    for i in 0..size {
        let (cx, cy) = system
            .row_location(i)
            .map_or((String::from("-"), String::from("-")), |(x, y)| {
                (x.to_string(), y.to_string())
            });
        rows[0].push_str(&format!("<td>{i}</td>"));
        rows[1].push_str(&format!("<td>{cx}</td>"));
        rows[2].push_str(&format!("<td>{cy}</td>"));
        rows[3].push_str(&format!("<td>{}</td>", system.row_kind(i).label()));
        rows[4].push_str(&format!("<td>{:.3}</td>", system.system.rhs[i]));
        if let Some(x) = x {
            rows[5].push_str(&format!("<td>{:.3}</td>", x[i]));
        }
    }
    let mut vectors = String::from("<table>");
    for row in &rows {
        vectors.push_str(row);
        vectors.push_str("</tr>\n");
    }
    vectors.push_str("</table>");

    let most_common = NonzeroHistogram::from_dense(a).most_common();
    let mut counts = String::from("<table>");
    for (label, value) in [
        ("Node count", system.node_count()),
        ("Boundary node count", system.boundaries.len()),
        ("Matrix size", size),
        ("Most common nonzeros per row", most_common),
    ] {
        counts.push_str(&format!("<tr><td>{label}</td><td>{value}</td></tr>\n"));
    }
    counts.push_str("</table>");

    let body = format!(
        "<h1>Ax = b</h1><h3>A Matrix</h3><pre>{}</pre><h3>Vectors</h3><pre>{vectors}</pre><h3>Counts</h3><pre>{counts}</pre>",
        matrix_table(a, false)
    );
    Ok(page("Matrix output", &body))
}

/// Side-by-side `A`, `x` and `b` as re-read from Matrix-Market files, with
/// the diagonal of `A` highlighted.
pub fn render_matrix_market_page(loaded: &LoadedSystem) -> String {
    let mut body = String::from("<table><tr>");
    body.push_str(&format!("<td>{}</td>", matrix_table(&loaded.matrix.to_dense(), true)));
    if let Some(x) = &loaded.solution {
        body.push_str(&format!("<td>{}</td>", matrix_table(&x.to_dense(), false)));
    }
    body.push_str(&format!("<td>{}</td>", matrix_table(&loaded.rhs.to_dense(), false)));
    body.push_str("</tr></table>");
    page("Matrix data", &body)
}

/// Plain-text table of `A | b | x`, one row per unknown.
pub fn render_text(system: &ThermalSystem, x: Option<&[f64]>) -> Result<String> {
    let a = shadow_of(system)?;
    check_solution(system, x)?;

    let mut out = String::new();
    for r in 0..system.size() {
        out.push_str(&format!("{r:>4} {:>8} |", system.row_kind(r).label()));
        for c in 0..system.size() {
            out.push_str(&format!(" {:>9}", format_entry(a[(r, c)])));
        }
        out.push_str(&format!(" | {:>10.3}", system.system.rhs[r]));
        if let Some(x) = x {
            out.push_str(&format!(" | {:>10.3}", x[r]));
        }
        out.push('\n');
    }
    Ok(out)
}

pub fn write_page(path: &Path, html: &str) -> Result<()> {
    fs::write(path, html).map_err(|e| DiagError::io(path, e))
}
