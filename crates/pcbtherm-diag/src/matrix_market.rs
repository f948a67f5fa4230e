//! Matrix-Market text files.
//!
//! ```text
//! %%MatrixMarket matrix coordinate real general
//! 16 16 32
//! 1 1 4.5e0
//! ...
//! ```
//!
//! Vectors use the `array` shape with a single size line. Values are written
//! in shortest round-trip form, so reading a file back reproduces the exact
//! `f64` values.

use std::fs;
use std::path::{Path, PathBuf};

use nalgebra::DMatrix;

use pcbtherm_core::{CsrMatrix, LinearSystem};

use crate::error::{DiagError, Result};

const BANNER: &str = "%%MatrixMarket";

/// Contents of one Matrix-Market file.
#[derive(Debug, Clone, PartialEq)]
pub enum MatrixMarket {
    /// Sparse matrix with 0-based `(row, col, value)` entries.
    Coordinate {
        rows: usize,
        cols: usize,
        entries: Vec<(usize, usize, f64)>,
    },
    /// Dense column vector.
    Array { values: Vec<f64> },
}

impl MatrixMarket {
    /// Entries of `matrix` in row-major order.
    pub fn from_csr(matrix: &CsrMatrix) -> Self {
        MatrixMarket::Coordinate {
            rows: matrix.nrows(),
            cols: matrix.ncols(),
            entries: matrix.iter().collect(),
        }
    }

    pub fn from_vector(values: &[f64]) -> Self {
        MatrixMarket::Array {
            values: values.to_vec(),
        }
    }

    pub fn shape(&self) -> &'static str {
        match self {
            MatrixMarket::Coordinate { .. } => "coordinate",
            MatrixMarket::Array { .. } => "array",
        }
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        match self {
            MatrixMarket::Coordinate { rows, .. } => *rows,
            MatrixMarket::Array { values } => values.len(),
        }
    }

    pub fn values(&self) -> Option<&[f64]> {
        match self {
            MatrixMarket::Array { values } => Some(values),
            MatrixMarket::Coordinate { .. } => None,
        }
    }

    pub fn to_csr(&self) -> Option<CsrMatrix> {
        match self {
            MatrixMarket::Coordinate {
                rows,
                cols,
                entries,
            } => Some(CsrMatrix::from_triplets(*rows, *cols, entries)),
            MatrixMarket::Array { .. } => None,
        }
    }

    /// Dense form; a vector becomes a single column.
    pub fn to_dense(&self) -> DMatrix<f64> {
        match self {
            MatrixMarket::Coordinate {
                rows,
                cols,
                entries,
            } => {
                let mut m = DMatrix::zeros(*rows, *cols);
                for &(r, c, v) in entries {
                    m[(r, c)] += v;
                }
                m
            }
            MatrixMarket::Array { values } => DMatrix::from_column_slice(values.len(), 1, values),
        }
    }

    /// File text.
    pub fn render(&self) -> String {
        let mut lines = vec![format!("{BANNER} matrix {} real general", self.shape())];
        match self {
            MatrixMarket::Coordinate {
                rows,
                cols,
                entries,
            } => {
                lines.push(format!("{rows} {cols} {}", entries.len()));
                lines.extend(
                    entries
                        .iter()
                        .map(|&(r, c, v)| format!("{} {} {v:e}", r + 1, c + 1)),
                );
            }
            MatrixMarket::Array { values } => {
                lines.push(values.len().to_string());
                lines.extend(values.iter().map(|v| format!("{v:e}")));
            }
        }
        let mut out = lines.join("\n");
        out.push('\n');
        out
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        fs::write(path, self.render()).map_err(|e| DiagError::io(path, e))
    }

    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| DiagError::io(path, e))?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l.trim()))
            .filter(|(_, l)| !l.is_empty());

        let (_, header) = lines
            .next()
            .ok_or_else(|| DiagError::parse(1, "empty file"))?;
        let tokens: Vec<String> = header.split_whitespace().map(str::to_lowercase).collect();
        if tokens.len() < 4 || tokens[0] != BANNER.to_lowercase() || tokens[1] != "matrix" {
            return Err(DiagError::parse(1, format!("not a Matrix-Market header: '{header}'")));
        }
        if tokens[3] != "real" && tokens[3] != "integer" {
            return Err(DiagError::parse(1, format!("unsupported field '{}'", tokens[3])));
        }
        if tokens.get(4).is_some_and(|s| s != "general") {
            return Err(DiagError::parse(1, format!("unsupported symmetry '{}'", tokens[4])));
        }
        let coordinate = match tokens[2].as_str() {
            "coordinate" => true,
            "array" => false,
            other => return Err(DiagError::parse(1, format!("unknown shape '{other}'"))),
        };

        let mut data = lines.filter(|(_, l)| !l.starts_with('%'));
        let (size_line, size) = data
            .next()
            .ok_or_else(|| DiagError::parse(2, "missing size line"))?;
        let dims = parse_fields::<usize>(size, size_line)?;

        if coordinate {
            let [rows, cols, nnz] = dims[..] else {
                return Err(DiagError::parse(size_line, "expected 'rows cols nnz'"));
            };
            let mut entries = Vec::with_capacity(nnz);
            for (lineno, line) in data.by_ref().take(nnz) {
                let mut parts = line.split_whitespace();
                let (Some(r), Some(c), Some(v), None) =
                    (parts.next(), parts.next(), parts.next(), parts.next())
                else {
                    return Err(DiagError::parse(lineno, "expected 'row col value'"));
                };
                let r = parse_index(r, rows, lineno)?;
                let c = parse_index(c, cols, lineno)?;
                let v = parse_value(v, lineno)?;
                entries.push((r, c, v));
            }
            if entries.len() != nnz {
                return Err(DiagError::parse(
                    size_line,
                    format!("declared {nnz} entries, found {}", entries.len()),
                ));
            }
            Ok(MatrixMarket::Coordinate {
                rows,
                cols,
                entries,
            })
        } else {
            let rows = match dims[..] {
                [rows] | [rows, 1] => rows,
                _ => {
                    return Err(DiagError::parse(
                        size_line,
                        "expected 'rows' or 'rows 1' for a vector",
                    ));
                }
            };
            let mut values = Vec::with_capacity(rows);
            for (lineno, line) in data.by_ref().take(rows) {
                values.push(parse_value(line, lineno)?);
            }
            if values.len() != rows {
                return Err(DiagError::parse(
                    size_line,
                    format!("declared {rows} values, found {}", values.len()),
                ));
            }
            Ok(MatrixMarket::Array { values })
        }
    }
}

fn parse_fields<T: std::str::FromStr>(line: &str, lineno: usize) -> Result<Vec<T>> {
    line.split_whitespace()
        .map(|t| {
            t.parse()
                .map_err(|_| DiagError::parse(lineno, format!("invalid integer '{t}'")))
        })
        .collect()
}

fn parse_index(token: &str, bound: usize, lineno: usize) -> Result<usize> {
    match token.parse::<usize>() {
        Ok(i) if (1..=bound).contains(&i) => Ok(i - 1),
        _ => Err(DiagError::parse(
            lineno,
            format!("index '{token}' outside 1..={bound}"),
        )),
    }
}

fn parse_value(token: &str, lineno: usize) -> Result<f64> {
    token
        .trim()
        .parse()
        .map_err(|_| DiagError::parse(lineno, format!("invalid value '{token}'")))
}

/// Paths written by [`save_system`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemFiles {
    pub matrix: PathBuf,
    pub rhs: PathBuf,
    pub solution: PathBuf,
}

impl SystemFiles {
    /// `{prefix}A.mtx`, `{prefix}RHS.mtx` and `{prefix}x.mtx` inside `dir`.
    pub fn new(dir: &Path, prefix: &str) -> Self {
        Self {
            matrix: dir.join(format!("{prefix}A.mtx")),
            rhs: dir.join(format!("{prefix}RHS.mtx")),
            solution: dir.join(format!("{prefix}x.mtx")),
        }
    }
}

/// A system re-read from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedSystem {
    pub matrix: MatrixMarket,
    pub rhs: MatrixMarket,
    pub solution: Option<MatrixMarket>,
}

/// Write `A`, `b` and, when given, `x`.
pub fn save_system(
    dir: &Path,
    prefix: &str,
    system: &LinearSystem,
    x: Option<&[f64]>,
) -> Result<SystemFiles> {
    let files = SystemFiles::new(dir, prefix);
    fs::create_dir_all(dir).map_err(|e| DiagError::io(dir, e))?;

    MatrixMarket::from_csr(&system.to_csr()).write(&files.matrix)?;
    MatrixMarket::from_vector(system.rhs.as_slice()).write(&files.rhs)?;
    if let Some(x) = x {
        if x.len() != system.size() {
            return Err(DiagError::DimensionMismatch {
                expected: system.size(),
                actual: x.len(),
            });
        }
        MatrixMarket::from_vector(x).write(&files.solution)?;
    }

    log::info!(
        "Wrote Matrix-Market files {}, {}{}",
        files.matrix.display(),
        files.rhs.display(),
        if x.is_some() {
            format!(", {}", files.solution.display())
        } else {
            String::new()
        }
    );
    Ok(files)
}

/// Read the files written by [`save_system`]; the solution is optional.
pub fn load_system(dir: &Path, prefix: &str) -> Result<LoadedSystem> {
    let files = SystemFiles::new(dir, prefix);
    let solution = if files.solution.exists() {
        Some(MatrixMarket::read(&files.solution)?)
    } else {
        None
    };
    Ok(LoadedSystem {
        matrix: MatrixMarket::read(&files.matrix)?,
        rhs: MatrixMarket::read(&files.rhs)?,
        solution,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinate_text() {
        let csr = CsrMatrix::from_triplets(2, 2, &[(0, 0, 2.0), (1, 0, -0.5), (1, 1, 1.25)]);
        let text = MatrixMarket::from_csr(&csr).render();
        assert_eq!(
            text,
            "%%MatrixMarket matrix coordinate real general\n2 2 3\n1 1 2e0\n2 1 -5e-1\n2 2 1.25e0\n"
        );
    }

    #[test]
    fn array_text() {
        let text = MatrixMarket::from_vector(&[25.0, 0.0]).render();
        assert_eq!(text, "%%MatrixMarket matrix array real general\n2\n2.5e1\n0e0\n");
    }

    #[test]
    fn reads_array_with_column_count_and_comments() {
        let text = "%%MatrixMarket matrix array real general\n% written elsewhere\n3 1\n1.0\n-2.5\n3e2\n";
        let mm = MatrixMarket::parse(text).unwrap();
        assert_eq!(mm.values().unwrap(), &[1.0, -2.5, 300.0]);
    }

    #[test]
    fn awkward_values_round_trip() {
        let values = [0.1 + 0.2, -1.0 / 3.0, 6.02214076e23, f64::MIN_POSITIVE, 25.0];
        let mm = MatrixMarket::from_vector(&values);
        let back = MatrixMarket::parse(&mm.render()).unwrap();
        assert_eq!(back, mm);
    }

    #[test]
    fn to_dense_sums_duplicates() {
        let mm = MatrixMarket::Coordinate {
            rows: 2,
            cols: 2,
            entries: vec![(0, 1, 1.0), (0, 1, 2.0)],
        };
        assert_eq!(mm.to_dense()[(0, 1)], 3.0);
        assert_eq!(mm.to_csr().unwrap().get(0, 1), 3.0);
    }

    #[test]
    fn malformed_files_rejected() {
        let cases = [
            "",
            "%%NotMarket matrix array real general\n1\n1.0\n",
            "%%MatrixMarket matrix array complex general\n1\n1.0\n",
            "%%MatrixMarket matrix coordinate real symmetric\n1 1 1\n1 1 1.0\n",
            "%%MatrixMarket matrix coordinate real general\n2 2\n",
            "%%MatrixMarket matrix coordinate real general\n2 2 1\n3 1 1.0\n",
            "%%MatrixMarket matrix coordinate real general\n2 2 2\n1 1 1.0\n",
            "%%MatrixMarket matrix array real general\n2 2\n1\n2\n3\n4\n",
            "%%MatrixMarket matrix array real general\n2\n1.0\nabc\n",
        ];
        for text in cases {
            assert!(
                matches!(MatrixMarket::parse(text), Err(DiagError::Parse { .. })),
                "accepted: {text:?}"
            );
        }
    }
}
