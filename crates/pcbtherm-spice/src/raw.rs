//! ASCII raw file parser.
//!
//! ```text
//! Title: * Thermal network
//! No. Variables: 3
//! No. Points: 2
//! Variables:
//!     0   time    time
//!     1   V(N0U0) voltage
//!     2   V(N1U0) voltage
//! Values:
//! 0   0.0
//!     25.0
//!     26.0
//! 1   0.1
//!     25.0
//!     26.0
//! ```

use indexmap::IndexMap;

use crate::error::{Result, SpiceError};
use crate::netlist::Netlist;

/// One declared output variable.
#[derive(Debug, Clone, PartialEq)]
pub struct RawVariable {
    pub index: usize,
    pub name: String,
    pub kind: String,
}

impl RawVariable {
    fn is_time(&self) -> bool {
        self.kind.eq_ignore_ascii_case("time") || self.name.eq_ignore_ascii_case("time")
    }
}

/// Contents of an ASCII raw file.
#[derive(Debug, Clone, Default)]
pub struct RawData {
    /// `Key: value` header lines.
    pub header: IndexMap<String, String>,
    pub variables: Vec<RawVariable>,
    /// One vector of values per point, indexed like `variables`.
    pub points: Vec<Vec<f64>>,
}

#[derive(PartialEq)]
enum Section {
    Header,
    Variables,
    Values,
}

impl RawData {
    pub fn parse(text: &str) -> Result<Self> {
        let mut data = RawData::default();
        let mut section = Section::Header;
        let mut values: Vec<(usize, f64)> = Vec::new();

        for (i, line) in text.lines().enumerate() {
            let lineno = i + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            match section {
                Section::Header => {
                    let (key, value) = trimmed.split_once(':').ok_or_else(|| {
                        SpiceError::malformed(lineno, format!("expected 'Key: value', got '{trimmed}'"))
                    })?;
                    let value = value.trim();
                    match key.trim() {
                        "Variables" => {
                            section = Section::Variables;
                            if !value.is_empty() {
                                data.variables.push(parse_variable(value, lineno)?);
                            }
                        }
                        "Values" => section = Section::Values,
                        "Binary" => {
                            return Err(SpiceError::malformed(
                                lineno,
                                "binary raw files are not supported; run the simulator with ASCII output",
                            ));
                        }
                        key => {
                            data.header.insert(key.to_string(), value.to_string());
                        }
                    }
                }
                Section::Variables => {
                    if trimmed.starts_with("Values:") {
                        section = Section::Values;
                    } else {
                        data.variables.push(parse_variable(trimmed, lineno)?);
                    }
                }
                Section::Values => {
                    for token in trimmed.split_whitespace() {
                        // Complex values are written as "re,im"; keep the real part.
                        let real = token.split(',').next().unwrap_or(token);
                        let value = real.parse::<f64>().map_err(|_| {
                            SpiceError::malformed(lineno, format!("invalid number '{token}'"))
                        })?;
                        values.push((lineno, value));
                    }
                }
            }
        }

        if section != Section::Values {
            return Err(SpiceError::malformed(
                text.lines().count(),
                "no 'Values:' section",
            ));
        }
        if data.variables.is_empty() {
            return Err(SpiceError::malformed(0, "no variables declared"));
        }

        // Each point is its index followed by one value per variable.
        let stride = data.variables.len() + 1;
        if values.len() % stride != 0 {
            let line = values.last().map(|&(l, _)| l).unwrap_or(0);
            return Err(SpiceError::malformed(
                line,
                format!(
                    "{} values do not form whole points of {} variables",
                    values.len(),
                    data.variables.len()
                ),
            ));
        }
        data.points = values
            .chunks(stride)
            .map(|chunk| chunk[1..].iter().map(|&(_, v)| v).collect())
            .collect();

        if let Some(declared) = data
            .header
            .get("No. Points")
            .and_then(|v| v.parse::<usize>().ok())
        {
            if declared != data.points.len() {
                log::warn!(
                    "raw file declares {declared} points but contains {}",
                    data.points.len()
                );
            }
        }
        Ok(data)
    }

    /// The final point, which holds the settled solution.
    pub fn last_point(&self) -> Option<&[f64]> {
        self.points.last().map(Vec::as_slice)
    }

    /// Temperatures per node id, read from the last point.
    ///
    /// Variables that do not name a mesh node are ignored. Every mesh node of
    /// `netlist` must be present.
    pub fn temperatures(&self, netlist: &Netlist) -> Result<Vec<f64>> {
        let point = self
            .last_point()
            .ok_or_else(|| SpiceError::malformed(0, "raw file contains no points"))?;

        let mut temps: Vec<Option<f64>> = vec![None; netlist.nodes().len()];
        for (col, var) in self.variables.iter().enumerate() {
            if var.is_time() {
                continue;
            }
            if let Some(node) = netlist.lookup(&var.name) {
                temps[node] = Some(point[col]);
            }
        }

        temps
            .into_iter()
            .zip(netlist.nodes().keys())
            .map(|(t, name)| t.ok_or_else(|| SpiceError::MissingNode(name.clone())))
            .collect()
    }
}

fn parse_variable(line: &str, lineno: usize) -> Result<RawVariable> {
    let mut parts = line.split_whitespace();
    let (Some(index), Some(name), Some(kind)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(SpiceError::malformed(
            lineno,
            format!("expected 'index name type', got '{line}'"),
        ));
    };
    let index = index
        .parse()
        .map_err(|_| SpiceError::malformed(lineno, format!("invalid variable index '{index}'")))?;
    Ok(RawVariable {
        index,
        name: name.to_string(),
        kind: kind.to_string(),
    })
}
