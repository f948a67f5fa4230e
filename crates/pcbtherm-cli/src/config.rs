//! Run files: problem, materials, layer table and pipeline settings.

use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use pcbtherm::{LayerRegistry, LayerSpec, MaterialSet, PipelineConfig, ProblemSpec};

/// Contents of a `pcbtherm run` configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub problem: ProblemSpec,
    pub materials: MaterialSet,
    /// Layer table; the standard layers when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layers: Option<Vec<LayerSpec>>,
    pub pipeline: PipelineConfig,
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading run configuration {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn registry(&self) -> Result<LayerRegistry> {
        match &self.layers {
            Some(specs) => LayerRegistry::from_specs(specs).context("invalid layer table"),
            None => Ok(LayerRegistry::standard()),
        }
    }

    /// Replace the problem with `name`, keeping the current size when the
    /// problem is already scalable.
    pub fn set_problem(&mut self, name: &str) -> Result<()> {
        self.problem = match name.to_lowercase().as_str() {
            "tiny" => ProblemSpec::Tiny,
            "scalable" => match self.problem {
                ProblemSpec::Scalable { .. } => self.problem.clone(),
                ProblemSpec::Tiny => ProblemSpec::default(),
            },
            other => bail!("unknown problem '{other}' (expected tiny or scalable)"),
        };
        Ok(())
    }

    /// Apply a `WxH` size; only the scalable problem has one.
    pub fn set_size(&mut self, size: &str) -> Result<()> {
        let (xsize, ysize) = parse_size(size)?;
        match self.problem {
            ProblemSpec::Scalable { .. } => {
                self.problem = ProblemSpec::Scalable { xsize, ysize };
                Ok(())
            }
            ProblemSpec::Tiny => bail!("--size applies only to the scalable problem"),
        }
    }
}

/// Parse `WxH`, e.g. `40x30`.
pub fn parse_size(s: &str) -> Result<(usize, usize)> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .with_context(|| format!("size '{s}' is not of the form WxH"))?;
    let w: usize = w.trim().parse().with_context(|| format!("bad width in '{s}'"))?;
    let h: usize = h.trim().parse().with_context(|| format!("bad height in '{s}'"))?;
    Ok((w, h))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcbtherm::{BackendKind, BoundaryStrategy, LayerKind};

    #[test]
    fn empty_file_gives_defaults() {
        let config = RunConfig::parse("{}").unwrap();
        assert_eq!(config, RunConfig::default());
        assert_eq!(config.problem, ProblemSpec::Scalable { xsize: 20, ysize: 20 });
        assert_eq!(config.materials.bound_cond, 1000.0);
    }

    #[test]
    fn full_file() {
        let config = RunConfig::parse(
            r#"{
                "problem": {"type": "tiny"},
                "layers": [
                    {"index": 0, "type": "double", "name": "resis"},
                    {"index": 1, "type": "double", "name": "heat"},
                    {"index": 2, "type": "double", "name": "isodeg"},
                    {"index": 3, "type": "double", "name": "deg"},
                    {"index": 0, "type": "int", "name": "holeflag"},
                    {"index": 1, "type": "int", "name": "isoflag"}
                ],
                "pipeline": {
                    "backends": {"direct": true, "dense_reference": true},
                    "assembly": {"boundary": "saddle_point"},
                    "energy_tolerance": 1e-6
                }
            }"#,
        )
        .unwrap();
        assert_eq!(config.problem, ProblemSpec::Tiny);
        assert_eq!(
            config.pipeline.backends.enabled(),
            vec![BackendKind::Direct, BackendKind::DenseReference]
        );
        assert_eq!(config.pipeline.assembly.boundary, BoundaryStrategy::SaddlePoint);
        assert_eq!(config.pipeline.energy_tolerance, 1e-6);

        let registry = config.registry().unwrap();
        assert_eq!(registry.num_double(), 4);
        assert_eq!(registry.num_int(), 2);
        assert!(registry.iter().any(|(n, k, _)| n == "isoflag" && k == LayerKind::Int));
    }

    #[test]
    fn bad_layer_table_rejected() {
        let config = RunConfig::parse(
            r#"{"layers": [{"index": 1, "type": "double", "name": "resis"}]}"#,
        )
        .unwrap();
        assert!(config.registry().is_err());
    }

    #[test]
    fn problem_and_size_overrides() {
        let mut config = RunConfig::default();
        config.set_size("40x30").unwrap();
        assert_eq!(config.problem, ProblemSpec::Scalable { xsize: 40, ysize: 30 });
        config.set_problem("scalable").unwrap();
        assert_eq!(config.problem, ProblemSpec::Scalable { xsize: 40, ysize: 30 });

        config.set_problem("TINY").unwrap();
        assert_eq!(config.problem, ProblemSpec::Tiny);
        assert!(config.set_size("5x5").is_err());
        assert!(config.set_problem("png").is_err());
    }

    #[test]
    fn size_parsing() {
        assert_eq!(parse_size("12x9").unwrap(), (12, 9));
        assert_eq!(parse_size("12X 9").unwrap(), (12, 9));
        assert!(parse_size("12").is_err());
        assert!(parse_size("ax9").is_err());
    }
}
